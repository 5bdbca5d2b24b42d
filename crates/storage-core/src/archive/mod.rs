mod columns;
mod memory;
mod pg;
mod schema;

pub use memory::MemoryResultArchive;
pub use pg::PgResultArchive;

use crate::types::{EventKind, PoolEventRecord, TimeWindow, TokenPair};
use anyhow::Result;

/// Append-only sink for verified pool events, keyed by the window and pool that produced them.
pub trait ResultArchive: Send + Sync {
    /// Append `records` in order; returns how many were written.
    ///
    /// A `(window, pool)` job is archived at most once. When rows for the job already
    /// exist nothing is written and `0` is returned, so a commit can be retried.
    fn append_events(
        &self,
        window: &TimeWindow,
        pair: &TokenPair,
        records: &[PoolEventRecord],
    ) -> Result<usize>;

    fn count_events(&self, pair: &TokenPair, kind: Option<EventKind>) -> Result<u64>;

    /// Every archived record of one pool in insertion order.
    fn events_for_pool(&self, pair: &TokenPair) -> Result<Vec<PoolEventRecord>>;
}
