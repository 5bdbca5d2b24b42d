use anyhow::Result;
use poolwatch_task_ledger::materialize;
use postgres::Client;

pub(crate) const POOL_EVENTS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS pool_events (
  seq BIGSERIAL PRIMARY KEY,
  window_start DATE NOT NULL,
  window_end DATE NOT NULL,
  token_a TEXT NOT NULL,
  token_b TEXT NOT NULL,
  fee INTEGER NOT NULL,
  event_kind TEXT NOT NULL,
  block_number BIGINT NOT NULL,
  transaction_hash TEXT NOT NULL,
  block_hash TEXT NOT NULL,
  sender TEXT,
  recipient TEXT,
  owner TEXT,
  tick INTEGER,
  tick_lower INTEGER,
  tick_upper INTEGER,
  amount TEXT,
  amount0 TEXT,
  amount1 TEXT,
  sqrt_price_x96 TEXT,
  liquidity TEXT,
  archived_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  CHECK (event_kind IN ('swap', 'mint', 'burn', 'collect'))
);

CREATE INDEX IF NOT EXISTS idx_pool_events_pool
  ON pool_events(token_a, token_b, fee, event_kind, seq);
CREATE INDEX IF NOT EXISTS idx_pool_events_window
  ON pool_events(window_start, window_end, token_a, token_b, fee);
"#;

pub(crate) fn materialize_archive_schema(client: &mut Client) -> Result<()> {
    materialize(client, "pool_events", POOL_EVENTS_DDL)
}
