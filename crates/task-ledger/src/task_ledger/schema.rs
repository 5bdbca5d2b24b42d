use anyhow::Result;
use postgres::Client;

use super::utils::materialize;

pub(crate) const TIME_WINDOWS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS time_windows (
  start_date DATE PRIMARY KEY,
  end_date DATE NOT NULL,
  completed BOOLEAN NOT NULL DEFAULT FALSE,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  completed_at TIMESTAMPTZ,
  CHECK (end_date > start_date)
);

CREATE INDEX IF NOT EXISTS idx_time_windows_open ON time_windows(completed, start_date);
"#;

pub(crate) const TOKEN_PAIR_TASKS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS token_pair_tasks (
  window_start DATE NOT NULL,
  window_end DATE NOT NULL,
  token_a TEXT NOT NULL,
  token_b TEXT NOT NULL,
  fee INTEGER NOT NULL,
  completed BOOLEAN NOT NULL DEFAULT FALSE,
  seq BIGSERIAL,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
  completed_at TIMESTAMPTZ,
  PRIMARY KEY (window_start, window_end, token_a, token_b, fee)
);

CREATE INDEX IF NOT EXISTS idx_token_pair_tasks_open
  ON token_pair_tasks(window_start, window_end, completed, seq);
"#;

pub(crate) fn materialize_ledger_schema(client: &mut Client) -> Result<()> {
    materialize(client, "time_windows", TIME_WINDOWS_DDL)?;
    materialize(client, "token_pair_tasks", TOKEN_PAIR_TASKS_DDL)?;
    Ok(())
}
