use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::core::error::{MatchError, MatchResult};
use crate::core::locks::PairLocks;
use crate::core::scoring;
use crate::models::{
    InteractionRecord, Match, MatchType, PairKey, Stat, SwipeAction, UserProfile,
};
use crate::services::{InteractionLog, MatchStore, ProfileStore, StoreError};

/// Result of a swipe: always a definite yes or no
#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    pub matched: bool,
    #[serde(rename = "match")]
    pub new_match: Option<Match>,
}

impl SwipeOutcome {
    fn no_match() -> Self {
        Self {
            matched: false,
            new_match: None,
        }
    }

    fn matched(new_match: Match) -> Self {
        Self {
            matched: true,
            new_match: Some(new_match),
        }
    }
}

/// Records swipes and turns reciprocal likes into matches
#[derive(Clone)]
pub struct SwipeProcessor {
    profiles: Arc<dyn ProfileStore>,
    interactions: Arc<dyn InteractionLog>,
    matches: Arc<dyn MatchStore>,
    locks: Arc<PairLocks>,
}

impl SwipeProcessor {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        interactions: Arc<dyn InteractionLog>,
        matches: Arc<dyn MatchStore>,
        locks: Arc<PairLocks>,
    ) -> Self {
        Self {
            profiles,
            interactions,
            matches,
            locks,
        }
    }

    /// Record `actor`'s decision on `target` and report whether it completed a match
    pub async fn swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> MatchResult<SwipeOutcome> {
        if actor_id == target_id {
            return Err(MatchError::InvalidArgument(
                "Cannot swipe on yourself".to_string(),
            ));
        }

        let outcome = {
            // Profiles are read under the pair lock so a concurrent block is seen
            let _guard = self.locks.lock(&PairKey::new(actor_id, target_id)).await;

            let target = self
                .profiles
                .get_profile(target_id)
                .await?
                .filter(UserProfile::is_active)
                .ok_or_else(|| MatchError::NotFound("User not found".to_string()))?;

            let actor = self
                .profiles
                .get_profile(actor_id)
                .await?
                .ok_or_else(|| MatchError::NotFound(format!("User {} not found", actor_id)))?;

            // A block in either direction hides the target
            if target.has_blocked(actor_id) || actor.has_blocked(target_id) {
                tracing::debug!("Swipe {} -> {} rejected: pair is blocked", actor_id, target_id);
                return Err(MatchError::NotFound("User not found".to_string()));
            }

            let record = self
                .interactions
                .upsert_swipe(actor_id, target_id, action, Utc::now())
                .await?;

            tracing::debug!("Recorded swipe: {} -> {} ({})", actor_id, target_id, action);

            if action.is_positive() {
                self.resolve_reciprocity(&actor, &target, &record).await?
            } else {
                SwipeOutcome::no_match()
            }
        };

        self.record_stats(actor_id, target_id, action, outcome.matched)
            .await;

        if outcome.matched {
            tracing::info!("New match between {} and {}", actor_id, target_id);
        }

        Ok(outcome)
    }

    /// Runs under the pair lock, after the actor's record is stored
    async fn resolve_reciprocity(
        &self,
        actor: &UserProfile,
        target: &UserProfile,
        record: &InteractionRecord,
    ) -> MatchResult<SwipeOutcome> {
        let reciprocal = match self.interactions.find_swipe(&target.id, &actor.id).await? {
            Some(reciprocal) if reciprocal.action.is_positive() => reciprocal,
            _ => return Ok(SwipeOutcome::no_match()),
        };

        if let Some(existing) = self.matches.find_active_match(&actor.id, &target.id).await? {
            tracing::warn!(
                "Reciprocal like between {} and {} but match {} is already active",
                actor.id,
                target.id,
                existing.id
            );
            return Ok(SwipeOutcome::no_match());
        }

        // Ended matches are final: an unmatched or blocked pair never re-matches
        if let Some(ended) = self.matches.find_ended_match(&actor.id, &target.id).await? {
            tracing::info!(
                "Not re-matching {} and {}: match {} ended as {}",
                actor.id,
                target.id,
                ended.id,
                ended.status
            );
            return Ok(SwipeOutcome::no_match());
        }

        let match_type = if record.action == SwipeAction::Superlike
            || reciprocal.action == SwipeAction::Superlike
        {
            MatchType::SuperlikeMatch
        } else {
            MatchType::Match
        };

        // First to like; ties go to the earlier-stored reciprocal record
        let initiator = if reciprocal.created_at <= record.created_at {
            target.id.clone()
        } else {
            actor.id.clone()
        };

        let compatibility = scoring::score(actor, target);
        let new_match = Match::new(
            [actor.id.clone(), target.id.clone()],
            initiator,
            match_type,
            compatibility,
            Utc::now(),
        );

        match self.matches.create_match(new_match).await {
            Ok(created) => Ok(SwipeOutcome::matched(created)),
            // Another instance won the race for this pair; its swipe reports the match
            Err(StoreError::Conflict(msg)) => {
                tracing::error!(
                    "Duplicate active match for {} and {} despite pair lock: {}",
                    actor.id,
                    target.id,
                    msg
                );
                match self.matches.find_active_match(&actor.id, &target.id).await? {
                    Some(existing) => tracing::info!(
                        "Match {} between {} and {} was created concurrently",
                        existing.id,
                        actor.id,
                        target.id
                    ),
                    None => tracing::warn!(
                        "No active match between {} and {} after conflict",
                        actor.id,
                        target.id
                    ),
                }
                Ok(SwipeOutcome::no_match())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Best-effort counter updates; failures are logged, never returned
    async fn record_stats(&self, actor_id: &str, target_id: &str, action: SwipeAction, matched: bool) {
        let mut bumps: Vec<(&str, Stat)> = Vec::new();
        match action {
            SwipeAction::Like => bumps.push((target_id, Stat::Likes)),
            SwipeAction::Superlike => {
                bumps.push((target_id, Stat::Likes));
                bumps.push((target_id, Stat::SuperLikes));
            }
            SwipeAction::Dislike => {}
        }
        if matched {
            bumps.push((actor_id, Stat::Matches));
            bumps.push((target_id, Stat::Matches));
        }

        for (user_id, stat) in bumps {
            if let Err(e) = self.profiles.increment_stat(user_id, stat).await {
                tracing::warn!("Failed to increment {:?} for {}: {}", stat, user_id, e);
            }
        }
    }

    /// Likes and superlikes received by `user_id` that are still waiting for
    /// an answer, newest first
    pub async fn likes_received(&self, user_id: &str) -> MatchResult<Vec<InteractionRecord>> {
        let user = self
            .profiles
            .get_profile(user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("User {} not found", user_id)))?;

        let answered = self.interactions.list_swiped_targets(user_id).await?;
        let likes = self.interactions.list_likes_received(user_id).await?;

        Ok(likes
            .into_iter()
            .filter(|record| !answered.contains(&record.from) && !user.has_blocked(&record.from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Gender, Location, LookingFor, MatchStatus, ProfileStats, ProfileStatus,
    };
    use crate::services::{MemoryStore, StoreResult};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn create_test_profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: format!("User {}", id),
            age: 25,
            gender: Gender::Female,
            bio: None,
            interests: vec![],
            location: Location::default(),
            looking_for: LookingFor::default(),
            blocked: BTreeSet::new(),
            reported: BTreeSet::new(),
            is_online: false,
            last_active: Utc::now(),
            status: ProfileStatus::Active,
            stats: ProfileStats::default(),
            created_at: Utc::now(),
        }
    }

    /// Match store where another instance always inserts the pair first
    struct RacingMatches {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl MatchStore for RacingMatches {
        async fn create_match(&self, new_match: Match) -> StoreResult<Match> {
            self.inner.create_match(new_match).await?;
            Err(StoreError::Conflict("idx_matches_active_pair".to_string()))
        }

        async fn get_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
            self.inner.get_match(id).await
        }

        async fn find_active_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
            self.inner.find_active_match(a, b).await
        }

        async fn find_ended_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
            self.inner.find_ended_match(a, b).await
        }

        async fn update_match_status(
            &self,
            id: Uuid,
            status: MatchStatus,
            actor: &str,
            at: DateTime<Utc>,
        ) -> StoreResult<Match> {
            self.inner.update_match_status(id, status, actor, at).await
        }

        async fn list_active_matches(
            &self,
            user: &str,
            page: u32,
            page_size: u32,
        ) -> StoreResult<Vec<Match>> {
            self.inner.list_active_matches(user, page, page_size).await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_reports_no_match() {
        let store = Arc::new(MemoryStore::with_profiles(
            ["a", "b"].into_iter().map(create_test_profile),
        ));
        let processor = SwipeProcessor::new(
            store.clone(),
            store.clone(),
            Arc::new(RacingMatches {
                inner: store.clone(),
            }),
            Arc::new(PairLocks::new(4)),
        );

        processor.swipe("a", "b", SwipeAction::Like).await.unwrap();
        let outcome = processor.swipe("b", "a", SwipeAction::Like).await.unwrap();

        assert!(!outcome.matched);
        assert!(outcome.new_match.is_none());
        assert_eq!(store.list_active_matches("a", 1, 10).await.unwrap().len(), 1);
    }
}
