use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::error::ValidatorError;
use crate::ledger::LedgerClient;
use crate::types::WorkerRecord;

static IPV4_PORT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}:\d+").ok());

/// First `a.b.c.d:port` inside `raw` that also parses as a socket address.
pub fn extract_address(raw: &str) -> Option<SocketAddr> {
    IPV4_PORT
        .as_ref()?
        .find_iter(raw)
        .find_map(|m| m.as_str().parse::<SocketAddr>().ok())
}

/// One read of the subnet's address and identity tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    pub subnet_id: u16,
    pub addresses: BTreeMap<u64, String>,
    pub identities: BTreeMap<u64, String>,
}

impl DirectorySnapshot {
    pub fn uid_of(&self, identity_key: &str) -> Option<u64> {
        self.identities
            .iter()
            .find_map(|(uid, key)| (key == identity_key).then_some(*uid))
    }

    pub fn require_registered(&self, identity_key: &str) -> Result<u64, ValidatorError> {
        self.uid_of(identity_key)
            .ok_or_else(|| ValidatorError::NotRegistered(identity_key.to_owned()))
    }

    /// Workers holding both a parseable address and an identity key, in uid order.
    pub fn eligible_workers(&self, exclude_key: Option<&str>) -> Vec<WorkerRecord> {
        let mut workers = Vec::with_capacity(self.identities.len());
        for (uid, identity_key) in &self.identities {
            if exclude_key == Some(identity_key.as_str()) {
                continue;
            }
            let Some(raw) = self.addresses.get(uid) else {
                debug!(worker_id = uid, "worker has no advertised address");
                continue;
            };
            let Some(address) = extract_address(raw) else {
                debug!(worker_id = uid, raw = %raw, "worker address has no ip:port");
                continue;
            };
            workers.push(WorkerRecord {
                id: *uid,
                address,
                identity_key: identity_key.clone(),
            });
        }
        workers
    }
}

/// Resolves the eligible worker set of one subnet, fresh on every call.
#[derive(Clone)]
pub struct WorkerDirectory {
    ledger: Arc<dyn LedgerClient>,
    subnet_id: u16,
}

impl WorkerDirectory {
    pub fn new(ledger: Arc<dyn LedgerClient>, subnet_id: u16) -> Self {
        Self { ledger, subnet_id }
    }

    pub async fn snapshot(&self) -> Result<DirectorySnapshot> {
        let addresses = self.ledger.resolve_worker_addresses(self.subnet_id).await?;
        let identities = self.ledger.resolve_worker_identities(self.subnet_id).await?;
        Ok(DirectorySnapshot {
            subnet_id: self.subnet_id,
            addresses,
            identities,
        })
    }
}
