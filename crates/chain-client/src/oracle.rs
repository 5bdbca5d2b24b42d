use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{BlockData, BlockRange, TokenPair};
use poolwatch_protocol::constants::JOB_DATETIME_FORMAT;

/// Independent chain-data source used to spot-check worker answers.
#[async_trait]
pub trait GroundTruthOracle: Send + Sync {
    async fn fetch_block_range(
        &self,
        token_a: &str,
        token_b: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<BlockRange>;

    async fn fetch_block_data_by_block_number(&self, block_number: u64) -> Result<BlockData>;

    /// Pools with activity inside `[start, end)`.
    async fn fetch_token_pairs(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<TokenPair>>;
}

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    pairs: Vec<TokenPair>,
}

#[derive(Clone)]
pub struct HttpOracleClient {
    base_url: String,
    client: Client,
}

impl HttpOracleClient {
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

fn fmt_time(at: NaiveDateTime) -> String {
    at.format(JOB_DATETIME_FORMAT).to_string()
}

#[async_trait]
impl GroundTruthOracle for HttpOracleClient {
    async fn fetch_block_range(
        &self,
        token_a: &str,
        token_b: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<BlockRange> {
        self.client
            .get(self.url("/block-range"))
            .query(&[
                ("token_a", token_a.to_owned()),
                ("token_b", token_b.to_owned()),
                ("start_datetime", fmt_time(start)),
                ("end_datetime", fmt_time(end)),
            ])
            .send()
            .await
            .context("oracle /block-range request")?
            .error_for_status()
            .context("oracle /block-range status")?
            .json()
            .await
            .context("oracle /block-range decode")
    }

    async fn fetch_block_data_by_block_number(&self, block_number: u64) -> Result<BlockData> {
        self.client
            .get(self.url(&format!("/blocks/{block_number}")))
            .send()
            .await
            .context("oracle /blocks request")?
            .error_for_status()
            .context("oracle /blocks status")?
            .json()
            .await
            .context("oracle /blocks decode")
    }

    async fn fetch_token_pairs(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<TokenPair>> {
        let body: TokenPairsResponse = self
            .client
            .get(self.url("/token-pairs"))
            .query(&[
                ("start_datetime", fmt_time(start)),
                ("end_datetime", fmt_time(end)),
            ])
            .send()
            .await
            .context("oracle /token-pairs request")?
            .error_for_status()
            .context("oracle /token-pairs status")?
            .json()
            .await
            .context("oracle /token-pairs decode")?;
        Ok(body.pairs)
    }
}
