use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use super::TaskLedger;
use super::types::LedgerOptions;
use crate::error::ValidatorError;
use crate::types::{TimeWindow, TimeWindowTask, TokenPair, TokenPairTask};

#[derive(Debug, Default)]
struct LedgerState {
    windows: BTreeMap<NaiveDate, TimeWindowTask>,
    pairs: HashMap<TimeWindow, Vec<TokenPairTask>>,
}

/// Process-local ledger. All check-then-act sequences run under one mutex.
#[derive(Debug)]
pub struct MemoryTaskLedger {
    options: LedgerOptions,
    state: Mutex<LedgerState>,
}

impl MemoryTaskLedger {
    pub fn new(options: LedgerOptions) -> Self {
        Self {
            options,
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| ValidatorError::Storage("mutex poisoned".into()).into())
    }
}

impl Default for MemoryTaskLedger {
    fn default() -> Self {
        Self::new(LedgerOptions::default())
    }
}

impl TaskLedger for MemoryTaskLedger {
    fn next_time_window(&self) -> Result<TimeWindow> {
        let mut state = self.lock()?;
        if let Some(open) = state.windows.values().find(|task| !task.completed) {
            return Ok(open.window());
        }
        let window = match state.windows.values().next_back() {
            Some(last) => last.window().next(self.options.window_days),
            None => TimeWindow::starting_at(self.options.genesis, self.options.window_days),
        }
        .ok_or_else(|| anyhow!("window end overflows the calendar"))?;
        state.windows.insert(
            window.start,
            TimeWindowTask {
                start: window.start,
                end: window.end,
                completed: false,
            },
        );
        info!(window = %window, "created time window");
        Ok(window)
    }

    fn mark_window_complete(&self, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        let mut state = self.lock()?;
        match state.windows.get_mut(&start) {
            Some(task) if task.end == end => {
                task.completed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn windows(&self) -> Result<Vec<TimeWindowTask>> {
        Ok(self.lock()?.windows.values().copied().collect())
    }

    fn ensure_token_pairs(&self, window: &TimeWindow, pairs: &[TokenPair]) -> Result<usize> {
        let mut state = self.lock()?;
        let tasks = state.pairs.entry(*window).or_default();
        let mut inserted = 0;
        for pair in pairs {
            if tasks.iter().any(|task| &task.pair == pair) {
                continue;
            }
            tasks.push(TokenPairTask {
                pair: pair.clone(),
                completed: false,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    fn token_pairs(&self, window: &TimeWindow) -> Result<Vec<TokenPairTask>> {
        Ok(self
            .lock()?
            .pairs
            .get(window)
            .cloned()
            .unwrap_or_default())
    }

    fn next_incomplete_token_pairs(&self, window: &TimeWindow) -> Result<Vec<TokenPairTask>> {
        Ok(self
            .token_pairs(window)?
            .into_iter()
            .filter(|task| !task.completed)
            .collect())
    }

    fn mark_token_pair_complete(
        &self,
        window: &TimeWindow,
        token_a: &str,
        token_b: &str,
        fee: u32,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(tasks) = state.pairs.get_mut(window) else {
            return Ok(false);
        };
        match tasks.iter_mut().find(|task| {
            task.pair.token_a == token_a && task.pair.token_b == token_b && task.pair.fee == fee
        }) {
            Some(task) => {
                task.completed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
