use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

use crate::models::PairKey;

/// Default number of lock stripes
pub const DEFAULT_STRIPES: usize = 256;

/// Striped async locks keyed by unordered user pair
///
/// Both directions of a pair hash to the same stripe, so two opposite swipes
/// between the same users never run their record-then-check steps at once.
/// Unrelated pairs may share a stripe; that only costs throughput.
pub struct PairLocks {
    stripes: Vec<Mutex<()>>,
}

impl PairLocks {
    pub fn new(stripes: usize) -> Self {
        let count = stripes.max(1);
        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    pub async fn lock(&self, pair: &PairKey) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_for(pair)].lock().await
    }

    fn stripe_for(&self, pair: &PairKey) -> usize {
        let mut hasher = DefaultHasher::new();
        pair.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }
}

impl Default for PairLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
