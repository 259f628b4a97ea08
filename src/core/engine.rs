use std::sync::Arc;
use std::time::Duration;

use crate::core::feed::{DiscoveryFeed, DEFAULT_SCORING_BUDGET};
use crate::core::filters::CandidateFilter;
use crate::core::lifecycle::MatchLifecycle;
use crate::core::location::LocationService;
use crate::core::locks::{PairLocks, DEFAULT_STRIPES};
use crate::core::swipe::SwipeProcessor;
use crate::services::{InteractionLog, MatchStore, ProfileStore};

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub scoring_budget: Duration,
    pub lock_stripes: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            scoring_budget: DEFAULT_SCORING_BUDGET,
            lock_stripes: DEFAULT_STRIPES,
        }
    }
}

/// The matching core wired to its stores
///
/// Swipes and lifecycle transitions share one set of pair locks, so a block
/// or unmatch never interleaves with a match being created for the same pair.
#[derive(Clone)]
pub struct Engine {
    pub feed: DiscoveryFeed,
    pub swipes: SwipeProcessor,
    pub lifecycle: MatchLifecycle,
    pub location: LocationService,
    pub profiles: Arc<dyn ProfileStore>,
    pub interactions: Arc<dyn InteractionLog>,
}

impl Engine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        interactions: Arc<dyn InteractionLog>,
        matches: Arc<dyn MatchStore>,
        options: EngineOptions,
    ) -> Self {
        let locks = Arc::new(PairLocks::new(options.lock_stripes));
        let filter = CandidateFilter::new(profiles.clone(), interactions.clone());

        Self {
            feed: DiscoveryFeed::new(profiles.clone(), filter, options.scoring_budget),
            swipes: SwipeProcessor::new(
                profiles.clone(),
                interactions.clone(),
                matches.clone(),
                locks.clone(),
            ),
            lifecycle: MatchLifecycle::new(profiles.clone(), matches, locks),
            location: LocationService::new(profiles.clone()),
            profiles,
            interactions,
        }
    }
}
