mod memory;
mod queue;
mod schema;
mod types;
mod utils;

pub use memory::MemoryTaskLedger;
pub use queue::PgTaskLedger;
pub use types::LedgerOptions;
pub use utils::{is_duplicate_object, materialize, redact_url, sanitize_ident, use_schema};

use crate::types::{TimeWindow, TimeWindowTask, TokenPair, TokenPairTask};
use anyhow::Result;
use chrono::NaiveDate;

/// Durable schedule of time windows and the token-pair tasks inside each window.
///
/// Records are only ever created or flipped to `completed = true`; nothing is deleted.
/// Every completion call is idempotent: repeating it returns `true` and changes nothing.
pub trait TaskLedger: Send + Sync {
    /// Oldest incomplete window. When none exists a new window starting at the latest
    /// window's `end` (or at genesis on an empty ledger) is created and persisted first.
    fn next_time_window(&self) -> Result<TimeWindow>;

    /// `false` when no window matches `(start, end)`.
    fn mark_window_complete(&self, start: NaiveDate, end: NaiveDate) -> Result<bool>;

    /// All windows in ascending start order.
    fn windows(&self) -> Result<Vec<TimeWindowTask>>;

    /// Insert pairs not yet known for `window`; returns how many were new.
    fn ensure_token_pairs(&self, window: &TimeWindow, pairs: &[TokenPair]) -> Result<usize>;

    /// All pairs of `window` in insertion order.
    fn token_pairs(&self, window: &TimeWindow) -> Result<Vec<TokenPairTask>>;

    fn next_incomplete_token_pairs(&self, window: &TimeWindow) -> Result<Vec<TokenPairTask>>;

    fn mark_token_pair_complete(
        &self,
        window: &TimeWindow,
        token_a: &str,
        token_b: &str,
        fee: u32,
    ) -> Result<bool>;
}
