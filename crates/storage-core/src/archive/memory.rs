use anyhow::Result;
use std::sync::{Mutex, MutexGuard};

use super::ResultArchive;
use crate::error::ValidatorError;
use crate::types::{EventKind, PoolEventRecord, TimeWindow, TokenPair};

#[derive(Debug, Clone)]
struct ArchivedEvent {
    window: TimeWindow,
    pair: TokenPair,
    record: PoolEventRecord,
}

#[derive(Debug, Default)]
pub struct MemoryResultArchive {
    events: Mutex<Vec<ArchivedEvent>>,
}

impl MemoryResultArchive {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ArchivedEvent>>> {
        self.events
            .lock()
            .map_err(|_| ValidatorError::Storage("mutex poisoned".into()).into())
    }

    /// Records archived for one `(window, pool)` job.
    pub fn events_for_job(
        &self,
        window: &TimeWindow,
        pair: &TokenPair,
    ) -> Result<Vec<PoolEventRecord>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| e.window == *window && e.pair == *pair)
            .map(|e| e.record.clone())
            .collect())
    }
}

impl ResultArchive for MemoryResultArchive {
    fn append_events(
        &self,
        window: &TimeWindow,
        pair: &TokenPair,
        records: &[PoolEventRecord],
    ) -> Result<usize> {
        let mut events = self.lock()?;
        if events.iter().any(|e| e.window == *window && e.pair == *pair) {
            return Ok(0);
        }
        events.extend(records.iter().map(|record| ArchivedEvent {
            window: *window,
            pair: pair.clone(),
            record: record.clone(),
        }));
        Ok(records.len())
    }

    fn count_events(&self, pair: &TokenPair, kind: Option<EventKind>) -> Result<u64> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| e.pair == *pair)
            .filter(|e| kind.is_none_or(|k| e.record.event.kind() == k))
            .count() as u64)
    }

    fn events_for_pool(&self, pair: &TokenPair) -> Result<Vec<PoolEventRecord>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|e| e.pair == *pair)
            .map(|e| e.record.clone())
            .collect())
    }
}
