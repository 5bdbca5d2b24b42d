use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;

use crate::crypto::{ValidatorIdentity, request_digest};
use crate::types::{JobDescription, WorkerRecord};

pub const HEADER_VALIDATOR_KEY: &str = "x-validator-key";
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_SIGNATURE: &str = "x-signature";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchParams {
    pub query: JobDescription,
}

/// Body of the `fetch` call a worker serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub target_key: String,
    pub params: FetchParams,
}

/// One RPC to one worker. Returns the raw payload; decoding happens in the orchestrator.
#[async_trait]
pub trait MinerClient: Send + Sync {
    async fn fetch(
        &self,
        worker: &WorkerRecord,
        job: &JobDescription,
        timeout: Duration,
    ) -> Result<Value>;
}

#[derive(Clone)]
pub struct HttpMinerClient {
    identity: ValidatorIdentity,
    client: Client,
}

impl HttpMinerClient {
    pub fn new(identity: ValidatorIdentity) -> Self {
        Self {
            identity,
            client: Client::new(),
        }
    }

    fn url(address: &SocketAddr) -> String {
        format!("http://{address}/method/fetch")
    }
}

#[async_trait]
impl MinerClient for HttpMinerClient {
    async fn fetch(
        &self,
        worker: &WorkerRecord,
        job: &JobDescription,
        timeout: Duration,
    ) -> Result<Value> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let digest = request_digest(&worker.identity_key, job, timestamp_ms)?;
        let body = FetchRequest {
            target_key: worker.identity_key.clone(),
            params: FetchParams { query: job.clone() },
        };
        self.client
            .post(Self::url(&worker.address))
            .timeout(timeout)
            .header(HEADER_VALIDATOR_KEY, self.identity.identity_key())
            .header(HEADER_TIMESTAMP, timestamp_ms.to_string())
            .header(HEADER_SIGNATURE, self.identity.sign_bytes(digest.as_bytes()))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("worker {} /method/fetch request", worker.id))?
            .error_for_status()
            .with_context(|| format!("worker {} /method/fetch status", worker.id))?
            .json()
            .await
            .with_context(|| format!("worker {} /method/fetch decode", worker.id))
    }
}
