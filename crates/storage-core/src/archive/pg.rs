use anyhow::{Context, Result, anyhow};
use poolwatch_task_ledger::{redact_url, use_schema};
use postgres::{Client, NoTls, Row};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::ResultArchive;
use super::columns::EventColumns;
use super::schema::materialize_archive_schema;
use crate::types::{EventKind, PoolEventRecord, TimeWindow, TokenPair};

#[derive(Debug, Clone)]
pub struct PgResultArchive {
    database_url: String,
    schema: Option<String>,
    materialized: Arc<AtomicBool>,
}

impl PgResultArchive {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            schema: None,
            materialized: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn init_schema(&self) -> Result<()> {
        let mut client = self.connect()?;
        materialize_archive_schema(&mut client)?;
        Ok(())
    }

    fn connect(&self) -> Result<Client> {
        let mut client = Client::connect(&self.database_url, NoTls).map_err(|err| {
            anyhow!("connect postgres {}: {err}", redact_url(&self.database_url))
        })?;
        if let Some(schema) = &self.schema {
            use_schema(&mut client, schema)?;
        }
        if !self.materialized.load(Ordering::Acquire) {
            materialize_archive_schema(&mut client)?;
            self.materialized.store(true, Ordering::Release);
        }
        Ok(client)
    }
}

fn fee_param(fee: u32) -> Result<i32> {
    i32::try_from(fee).map_err(|_| anyhow!("fee tier {fee} exceeds INTEGER range"))
}

fn record_from_row(row: &Row) -> Result<PoolEventRecord> {
    let kind: EventKind = row.get::<_, String>("event_kind").parse()?;
    let block_number: i64 = row.get("block_number");
    let columns = EventColumns {
        sender: row.get("sender"),
        recipient: row.get("recipient"),
        owner: row.get("owner"),
        tick: row.get("tick"),
        tick_lower: row.get("tick_lower"),
        tick_upper: row.get("tick_upper"),
        amount: row.get("amount"),
        amount0: row.get("amount0"),
        amount1: row.get("amount1"),
        sqrt_price_x96: row.get("sqrt_price_x96"),
        liquidity: row.get("liquidity"),
    };
    Ok(PoolEventRecord {
        block_number: u64::try_from(block_number)
            .map_err(|_| anyhow!("negative block number {block_number} in archive"))?,
        transaction_hash: row.get("transaction_hash"),
        hash: row.get("block_hash"),
        event: columns.into_event(kind)?,
    })
}

impl ResultArchive for PgResultArchive {
    fn append_events(
        &self,
        window: &TimeWindow,
        pair: &TokenPair,
        records: &[PoolEventRecord],
    ) -> Result<usize> {
        let fee = fee_param(pair.fee)?;
        let mut client = self.connect()?;
        let mut tx = client.transaction()?;
        let job_key = format!("{window}|{pair}");
        tx.execute("SELECT pg_advisory_xact_lock(hashtext($1))", &[&job_key])
            .context("lock archive job")?;
        let already: bool = tx
            .query_one(
                "SELECT EXISTS(
                   SELECT 1 FROM pool_events
                   WHERE window_start = $1 AND window_end = $2
                     AND token_a = $3 AND token_b = $4 AND fee = $5)",
                &[&window.start, &window.end, &pair.token_a, &pair.token_b, &fee],
            )?
            .get(0);
        if already {
            tx.commit()?;
            debug!(pool = %pair, window = %window, "job already archived, skipping");
            return Ok(0);
        }
        let stmt = tx.prepare(
            "INSERT INTO pool_events(
               window_start, window_end, token_a, token_b, fee, event_kind,
               block_number, transaction_hash, block_hash,
               sender, recipient, owner, tick, tick_lower, tick_upper,
               amount, amount0, amount1, sqrt_price_x96, liquidity)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )?;
        for record in records {
            let kind = record.event.kind().as_str();
            let block_number = i64::try_from(record.block_number)
                .map_err(|_| anyhow!("block number {} exceeds BIGINT", record.block_number))?;
            let cols = EventColumns::from(&record.event);
            tx.execute(
                &stmt,
                &[
                    &window.start,
                    &window.end,
                    &pair.token_a,
                    &pair.token_b,
                    &fee,
                    &kind,
                    &block_number,
                    &record.transaction_hash,
                    &record.hash,
                    &cols.sender,
                    &cols.recipient,
                    &cols.owner,
                    &cols.tick,
                    &cols.tick_lower,
                    &cols.tick_upper,
                    &cols.amount,
                    &cols.amount0,
                    &cols.amount1,
                    &cols.sqrt_price_x96,
                    &cols.liquidity,
                ],
            )
            .with_context(|| format!("archive {kind} event in block {}", record.block_number))?;
        }
        tx.commit()?;
        debug!(pool = %pair, window = %window, count = records.len(), "archived pool events");
        Ok(records.len())
    }

    fn count_events(&self, pair: &TokenPair, kind: Option<EventKind>) -> Result<u64> {
        let mut client = self.connect()?;
        let kind = kind.map(|k| k.as_str().to_owned());
        let row = client.query_one(
            "SELECT COUNT(*)
             FROM pool_events
             WHERE token_a = $1 AND token_b = $2 AND fee = $3
               AND ($4::TEXT IS NULL OR event_kind = $4)",
            &[&pair.token_a, &pair.token_b, &fee_param(pair.fee)?, &kind],
        )?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    fn events_for_pool(&self, pair: &TokenPair) -> Result<Vec<PoolEventRecord>> {
        let mut client = self.connect()?;
        let rows = client.query(
            "SELECT event_kind, block_number, transaction_hash, block_hash,
                    sender, recipient, owner, tick, tick_lower, tick_upper,
                    amount, amount0, amount1, sqrt_price_x96, liquidity
             FROM pool_events
             WHERE token_a = $1 AND token_b = $2 AND fee = $3
             ORDER BY seq ASC",
            &[&pair.token_a, &pair.token_b, &fee_param(pair.fee)?],
        )?;
        rows.iter().map(record_from_row).collect()
    }
}
