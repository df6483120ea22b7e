//! Striped per-id write locks
//!
//! Used by `put` when `serialize_writes` is on. An id always maps to the same
//! stripe, so two writers of one id never interleave their read-merge-write.
//! Unrelated ids may share a stripe.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub(crate) struct WriteLocks {
    stripes: Vec<Mutex<()>>,
}

impl WriteLocks {
    pub(crate) fn new(stripes: usize) -> Self {
        Self {
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe_of(&self, id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Blocks until the stripe of `id` is free
    pub(crate) fn lock(&self, id: &str) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned stripe carries no broken state.
        self.stripes[self.stripe_of(id)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
