pub mod crypto {
    pub use poolwatch_crypto::*;
}

pub mod types {
    pub use poolwatch_protocol::types::*;
}

use crate::crypto::sha256_hex;
use crate::types::MinerAnswer;
use anyhow::{Result, anyhow};
use poolwatch_protocol::constants::FLAT_AGREEMENT_SCORE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const FLAT_AGREEMENT_V1: &str = "flat_agreement.v1";
pub const EXACT_MATCH_V1: &str = "exact_match.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub policy_id: String,
    pub policy_version: String,
    pub description: String,
    pub max_score: f64,
}

/// Maps one worker's answer to a score in `[0, 1]` relative to the accepted answer.
///
/// Callers only pass answers whose fingerprint already matches the accepted one,
/// plus `None` for workers that failed to answer.
pub trait ScoringPolicy: Send + Sync {
    fn id(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn spec(&self) -> PolicySpec;
    fn score(&self, answer: Option<&MinerAnswer>, accepted: &MinerAnswer) -> f64;

    fn hash(&self) -> String {
        let bytes = serde_json::to_vec(&self.spec()).unwrap_or_default();
        sha256_hex(&bytes)
    }
}

/// `score` clamped into `[0, 1]`; NaN counts as zero.
pub fn bounded_score(
    policy: &dyn ScoringPolicy,
    answer: Option<&MinerAnswer>,
    accepted: &MinerAnswer,
) -> f64 {
    let raw = policy.score(answer, accepted);
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
}

pub struct ScoringPolicyRegistry {
    policies: BTreeMap<String, Arc<dyn ScoringPolicy>>,
}

impl ScoringPolicyRegistry {
    pub fn empty() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(FlatAgreementV1));
        reg.register(Arc::new(ExactMatchV1));
        reg
    }

    pub fn register(&mut self, policy: Arc<dyn ScoringPolicy>) {
        self.policies.insert(policy.id().to_owned(), policy);
    }

    pub fn get(&self, policy_id: &str) -> Option<Arc<dyn ScoringPolicy>> {
        self.policies.get(policy_id).cloned()
    }

    pub fn require(&self, policy_id: &str) -> Result<Arc<dyn ScoringPolicy>> {
        self.get(policy_id)
            .ok_or_else(|| anyhow!("scoring policy {policy_id} missing in registry"))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }
}

impl Default for ScoringPolicyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Any agreeing answer earns the same constant; a missing answer earns nothing.
pub struct FlatAgreementV1;

impl ScoringPolicy for FlatAgreementV1 {
    fn id(&self) -> &'static str {
        FLAT_AGREEMENT_V1
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn spec(&self) -> PolicySpec {
        PolicySpec {
            policy_id: self.id().to_owned(),
            policy_version: self.version().to_owned(),
            description: "constant score for every answer in the accepted group".to_owned(),
            max_score: FLAT_AGREEMENT_SCORE,
        }
    }

    fn score(&self, answer: Option<&MinerAnswer>, _accepted: &MinerAnswer) -> f64 {
        match answer {
            Some(_) => FLAT_AGREEMENT_SCORE,
            None => 0.0,
        }
    }
}

/// Full credit only when the fingerprint and record count both equal the accepted answer.
pub struct ExactMatchV1;

impl ScoringPolicy for ExactMatchV1 {
    fn id(&self) -> &'static str {
        EXACT_MATCH_V1
    }

    fn version(&self) -> &'static str {
        "1"
    }

    fn spec(&self) -> PolicySpec {
        PolicySpec {
            policy_id: self.id().to_owned(),
            policy_version: self.version().to_owned(),
            description: "1.0 for answers identical in fingerprint and size".to_owned(),
            max_score: 1.0,
        }
    }

    fn score(&self, answer: Option<&MinerAnswer>, accepted: &MinerAnswer) -> f64 {
        match answer {
            Some(a)
                if a.overall_hash == accepted.overall_hash
                    && a.data.len() == accepted.data.len() =>
            {
                1.0
            }
            _ => 0.0,
        }
    }
}
