//! Per-item failure bookkeeping shared by the item-based limiters.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock-guarded map from item to the number of failures in its current
/// rate-limiting period.
///
/// A key present in the map always has a count of at least 1; forgotten and
/// never-seen items are absent and read as 0.
pub(crate) struct FailureCounts<K> {
    failures: Mutex<HashMap<K, usize>>,
}

impl<K: Eq + Hash + Clone> FailureCounts<K> {
    pub(crate) fn new() -> Self {
        FailureCounts {
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records one more failure for `item` and returns the count it had
    /// before this call.
    pub(crate) fn record(&self, item: &K) -> usize {
        let mut failures = self.lock();
        match failures.get_mut(item) {
            Some(count) => {
                let previous = *count;
                *count = previous.saturating_add(1);
                previous
            }
            None => {
                failures.insert(item.clone(), 1);
                0
            }
        }
    }

    pub(crate) fn get(&self, item: &K) -> usize {
        self.lock().get(item).copied().unwrap_or(0)
    }

    pub(crate) fn forget(&self, item: &K) {
        self.lock().remove(item);
    }

    /// Number of items currently tracked.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    // A panic while holding the lock cannot leave a count half-written, so a
    // poisoned map is still valid.
    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, HashMap<K, usize>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
