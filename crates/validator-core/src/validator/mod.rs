use crate::chain::{GroundTruthOracle, LedgerClient, MinerClient, WorkerDirectory};
use crate::constants::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_ITERATION_INTERVAL_SECS, DEFAULT_MAX_ALLOWED_WEIGHTS,
    DEFAULT_POLL_CONCURRENCY, DEFAULT_SAMPLE_SIZE, MAX_WINDOW_HOPS_PER_ROUND,
};
use crate::crypto::ValidatorIdentity;
use crate::error::ValidatorError;
use crate::ledger::TaskLedger;
use crate::policy::ScoringPolicy;
use crate::storage::ResultArchive;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

mod consensus;
mod dispatch;
mod pacing;
mod round;
mod scoring;
mod verifier;

pub use consensus::{Consensus, majority_fingerprint, select_majority};
pub use dispatch::poll_workers;
pub use pacing::pacing_delay;
pub use scoring::{build_vote, cut_to_max_allowed_weights, normalize_weights};
pub use verifier::{sample_indices, verify_sample};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    pub call_timeout: Duration,
    pub poll_concurrency: usize,
    pub sample_size: usize,
    pub max_allowed_weights: usize,
    pub iteration_interval: Duration,
    /// Skip the validator's own identity when polling workers.
    pub exclude_self: bool,
    pub max_window_hops: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            poll_concurrency: DEFAULT_POLL_CONCURRENCY,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_allowed_weights: DEFAULT_MAX_ALLOWED_WEIGHTS,
            iteration_interval: Duration::from_secs(DEFAULT_ITERATION_INTERVAL_SECS),
            exclude_self: true,
            max_window_hops: MAX_WINDOW_HOPS_PER_ROUND,
        }
    }
}

/// Collaborators a [`Validator`] is assembled from.
pub struct ValidatorParts {
    pub identity: ValidatorIdentity,
    pub subnet_id: u16,
    pub ledger: Arc<dyn TaskLedger>,
    pub archive: Arc<dyn ResultArchive>,
    pub chain: Arc<dyn LedgerClient>,
    pub miners: Arc<dyn MinerClient>,
    pub oracle: Arc<dyn GroundTruthOracle>,
    pub policy: Arc<dyn ScoringPolicy>,
}

pub struct Validator {
    identity: ValidatorIdentity,
    subnet_id: u16,
    config: ValidatorConfig,
    ledger: Arc<dyn TaskLedger>,
    archive: Arc<dyn ResultArchive>,
    chain: Arc<dyn LedgerClient>,
    directory: WorkerDirectory,
    miners: Arc<dyn MinerClient>,
    oracle: Arc<dyn GroundTruthOracle>,
    policy: Arc<dyn ScoringPolicy>,
    clock: fn() -> NaiveDateTime,
}

fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl Validator {
    pub fn new(parts: ValidatorParts, config: ValidatorConfig) -> Self {
        let directory = WorkerDirectory::new(Arc::clone(&parts.chain), parts.subnet_id);
        Self {
            identity: parts.identity,
            subnet_id: parts.subnet_id,
            config,
            ledger: parts.ledger,
            archive: parts.archive,
            chain: parts.chain,
            directory,
            miners: parts.miners,
            oracle: parts.oracle,
            policy: parts.policy,
            clock: utc_now,
        }
    }

    /// Replace the wall clock used to decide whether a window has closed.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> &ValidatorIdentity {
        &self.identity
    }

    pub fn subnet_id(&self) -> u16 {
        self.subnet_id
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    async fn with_ledger<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TaskLedger) -> Result<T> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || op(ledger.as_ref()))
            .await
            .context("task ledger worker panicked")?
    }

    async fn with_archive<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ResultArchive) -> Result<T> + Send + 'static,
    {
        let archive = Arc::clone(&self.archive);
        tokio::task::spawn_blocking(move || op(archive.as_ref()))
            .await
            .context("result archive worker panicked")?
    }
}

/// Errors after which the loop must stop instead of moving on to the next round.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ValidatorError>(),
        Some(ValidatorError::NotRegistered(_) | ValidatorError::Config(_))
    )
}
