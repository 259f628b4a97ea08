use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::error::{MatchError, MatchResult};
use crate::core::filters::CandidateFilter;
use crate::core::scoring;
use crate::models::{Compatibility, UserProfile};
use crate::services::ProfileStore;

/// Default time allowed for scoring one page
pub const DEFAULT_SCORING_BUDGET: Duration = Duration::from_millis(200);

/// A candidate with its compatibility as seen by the requester
#[derive(Debug, Clone)]
pub struct DiscoveryEntry {
    pub profile: UserProfile,
    pub compatibility: Compatibility,
}

/// Discovery feed: candidate filter followed by compatibility scoring
///
/// # Pipeline Stages
/// 1. Exclusion rules (self, blocked, swiped, inactive, age, gender, radius)
/// 2. Compatibility scoring under a time budget
/// 3. Ranking within the page
#[derive(Clone)]
pub struct DiscoveryFeed {
    profiles: Arc<dyn ProfileStore>,
    filter: CandidateFilter,
    scoring_budget: Duration,
}

impl DiscoveryFeed {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        filter: CandidateFilter,
        scoring_budget: Duration,
    ) -> Self {
        Self {
            profiles,
            filter,
            scoring_budget,
        }
    }

    /// Discovery page for the user with id `requester_id`
    ///
    /// An empty list means the feed is exhausted.
    pub async fn discover(
        &self,
        requester_id: &str,
        page: u32,
        page_size: u32,
    ) -> MatchResult<Vec<DiscoveryEntry>> {
        let requester = self
            .profiles
            .get_profile(requester_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("User {} not found", requester_id)))?;

        self.discover_for(&requester, page, page_size).await
    }

    pub async fn discover_for(
        &self,
        requester: &UserProfile,
        page: u32,
        page_size: u32,
    ) -> MatchResult<Vec<DiscoveryEntry>> {
        let candidates = self
            .filter
            .filter_candidates(requester, page, page_size)
            .await?;
        let total_candidates = candidates.len();

        let entries = score_within_budget(requester, candidates, self.scoring_budget);
        if entries.len() < total_candidates {
            tracing::warn!(
                "Scoring budget of {:?} exhausted for {}: returning {} of {} candidates",
                self.scoring_budget,
                requester.id,
                entries.len(),
                total_candidates
            );
        }

        tracing::info!(
            "Returning {} profiles for user {} (page {})",
            entries.len(),
            requester.id,
            page
        );

        Ok(entries)
    }
}

/// Score candidates until the budget runs out, then rank what was scored
///
/// Page membership is fixed by the store; ranking only reorders within the
/// page, so sequential pages never skip or repeat a candidate.
pub fn score_within_budget(
    requester: &UserProfile,
    candidates: Vec<UserProfile>,
    budget: Duration,
) -> Vec<DiscoveryEntry> {
    let deadline = Instant::now() + budget;
    let mut entries = Vec::with_capacity(candidates.len());

    for profile in candidates {
        // An empty page means end of feed, so at least one candidate is scored
        if !entries.is_empty() && Instant::now() >= deadline {
            break;
        }
        let compatibility = scoring::score(requester, &profile);
        entries.push(DiscoveryEntry {
            profile,
            compatibility,
        });
    }

    // Stable: equal scores keep store order
    entries.sort_by(|a, b| b.compatibility.score.cmp(&a.compatibility.score));
    entries
}
