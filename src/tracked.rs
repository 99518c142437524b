//! Ids of users whose presence the client is showing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use mm_client::UserId;

/// Shared set of tracked user ids.
///
/// Held by exactly two parties: the interactive loop, which adds and
/// removes ids as users scroll into view, and the presence refresher,
/// which reads a [`TrackedUsers::snapshot`] each cycle. The lock is only
/// held for the copy, never across a server request.
#[derive(Debug, Clone, Default)]
pub struct TrackedUsers {
    inner: Arc<Mutex<HashSet<UserId>>>,
}

impl TrackedUsers {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<UserId>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts tracking `id`. Returns `false` if it was already tracked.
    pub fn insert(&self, id: UserId) -> bool {
        self.lock().insert(id)
    }

    /// Stops tracking `id`. Returns `false` if it was not tracked.
    pub fn remove(&self, id: &UserId) -> bool {
        self.lock().remove(id)
    }

    /// Sorted copy of the current ids.
    pub fn snapshot(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
