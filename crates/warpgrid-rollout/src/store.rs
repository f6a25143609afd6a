//! Concurrent result store — one terminal outcome per workload.
//!
//! Every poller holds a clone and writes its own key exactly once. The
//! orchestrator reads a snapshot only after all pollers have been joined.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;
use crate::poller::PollOutcome;

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Arc<Mutex<BTreeMap<String, PollOutcome>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the terminal outcome for `workload`.
    ///
    /// Entries are never overwritten, and `Pending` is never stored.
    pub fn record(&self, workload: &str, outcome: PollOutcome) -> Result<(), StoreError> {
        if !outcome.is_terminal() {
            return Err(StoreError::NotTerminal(workload.to_string()));
        }
        let mut results = self.lock();
        if results.contains_key(workload) {
            return Err(StoreError::Duplicate(workload.to_string()));
        }
        results.insert(workload.to_string(), outcome);
        Ok(())
    }

    pub fn get(&self, workload: &str) -> Option<PollOutcome> {
        self.lock().get(workload).cloned()
    }

    pub fn contains(&self, workload: &str) -> bool {
        self.lock().contains_key(workload)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every recorded outcome, sorted by workload name.
    pub fn snapshot(&self) -> BTreeMap<String, PollOutcome> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PollOutcome>> {
        // Writers never leave the map half-updated, so a poisoned lock is still usable.
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
