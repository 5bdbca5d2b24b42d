use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::ValidatorIdentity;
use crate::error::ValidatorError;
use crate::types::WeightVote;

/// Chain-of-record the validator reads its worker set from and votes into.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fails with [`ValidatorError::NotFound`] when no subnet carries `name`.
    async fn resolve_subnet_id(&self, name: &str) -> Result<u16>;
    /// Raw advertised addresses; entries may embed text around the `ip:port`.
    async fn resolve_worker_addresses(&self, subnet_id: u16) -> Result<BTreeMap<u64, String>>;
    async fn resolve_worker_identities(&self, subnet_id: u16) -> Result<BTreeMap<u64, String>>;
    async fn submit_vote(
        &self,
        identity: &ValidatorIdentity,
        vote: &WeightVote,
        subnet_id: u16,
    ) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVote {
    pub netuid: u16,
    pub uids: Vec<u64>,
    pub weights: Vec<u16>,
    pub validator_key: String,
    pub signature: String,
}

impl SignedVote {
    pub fn sign(identity: &ValidatorIdentity, vote: &WeightVote, subnet_id: u16) -> Result<Self> {
        Ok(Self {
            netuid: subnet_id,
            uids: vote.uids.clone(),
            weights: vote.weights.clone(),
            validator_key: identity.identity_key(),
            signature: identity.sign_vote(subnet_id, vote)?,
        })
    }

    pub fn vote(&self) -> WeightVote {
        WeightVote {
            uids: self.uids.clone(),
            weights: self.weights.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubnetResponse {
    netuid: u16,
}

#[derive(Debug, Deserialize)]
struct AddressesResponse {
    addresses: BTreeMap<u64, String>,
}

#[derive(Debug, Deserialize)]
struct IdentitiesResponse {
    identities: BTreeMap<u64, String>,
}

#[derive(Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    client: Client,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn resolve_subnet_id(&self, name: &str) -> Result<u16> {
        let response = self
            .client
            .get(self.url(&format!("/subnets/by-name/{name}")))
            .send()
            .await
            .context("ledger /subnets/by-name request")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ValidatorError::NotFound(format!("subnet {name}")).into());
        }
        let subnet: SubnetResponse = response
            .error_for_status()
            .context("ledger /subnets/by-name status")?
            .json()
            .await
            .context("ledger /subnets/by-name decode")?;
        Ok(subnet.netuid)
    }

    async fn resolve_worker_addresses(&self, subnet_id: u16) -> Result<BTreeMap<u64, String>> {
        let body: AddressesResponse = self
            .client
            .get(self.url(&format!("/subnets/{subnet_id}/addresses")))
            .send()
            .await
            .context("ledger /addresses request")?
            .error_for_status()
            .context("ledger /addresses status")?
            .json()
            .await
            .context("ledger /addresses decode")?;
        Ok(body.addresses)
    }

    async fn resolve_worker_identities(&self, subnet_id: u16) -> Result<BTreeMap<u64, String>> {
        let body: IdentitiesResponse = self
            .client
            .get(self.url(&format!("/subnets/{subnet_id}/identities")))
            .send()
            .await
            .context("ledger /identities request")?
            .error_for_status()
            .context("ledger /identities status")?
            .json()
            .await
            .context("ledger /identities decode")?;
        Ok(body.identities)
    }

    async fn submit_vote(
        &self,
        identity: &ValidatorIdentity,
        vote: &WeightVote,
        subnet_id: u16,
    ) -> Result<()> {
        let signed = SignedVote::sign(identity, vote, subnet_id)?;
        self.client
            .post(self.url(&format!("/subnets/{subnet_id}/weights")))
            .json(&signed)
            .send()
            .await
            .context("ledger /weights request")?
            .error_for_status()
            .context("ledger /weights status")?;
        Ok(())
    }
}
