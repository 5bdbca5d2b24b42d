use chrono::NaiveDate;
use poolwatch_protocol::constants::{DEFAULT_GENESIS_DATE, DEFAULT_WINDOW_DAYS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOptions {
    /// Start of the first window on an empty ledger.
    #[serde(default = "default_genesis")]
    pub genesis: NaiveDate,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            genesis: default_genesis(),
            window_days: default_window_days(),
        }
    }
}

pub(crate) fn default_genesis() -> NaiveDate {
    NaiveDate::parse_from_str(DEFAULT_GENESIS_DATE, "%Y-%m-%d").unwrap_or(NaiveDate::MIN)
}

pub(crate) fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
