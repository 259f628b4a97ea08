use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::{MatchError, MatchResult};
use crate::core::locks::PairLocks;
use crate::models::{Match, MatchStatus, PairKey, ReportReason, UserProfile};
use crate::services::{MatchStore, ProfileStore, StoreError};

/// Match state transitions and the block/report flows that drive them
///
/// `active` is the only state with outgoing transitions; `unmatched` and
/// `blocked` are terminal.
#[derive(Clone)]
pub struct MatchLifecycle {
    profiles: Arc<dyn ProfileStore>,
    matches: Arc<dyn MatchStore>,
    locks: Arc<PairLocks>,
}

impl MatchLifecycle {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        matches: Arc<dyn MatchStore>,
        locks: Arc<PairLocks>,
    ) -> Self {
        Self {
            profiles,
            matches,
            locks,
        }
    }

    /// End an active match on behalf of one of its users
    ///
    /// Fails with `NotFound` unless `requester_id` is a party to an active
    /// match with that id, so a repeated unmatch is a `NotFound`.
    pub async fn unmatch(&self, match_id: Uuid, requester_id: &str) -> MatchResult<Match> {
        let existing = self
            .matches
            .get_match(match_id)
            .await?
            .filter(|m| m.is_active() && m.involves(requester_id))
            .ok_or_else(|| MatchError::NotFound("Match not found".to_string()))?;

        let _guard = self.locks.lock(&existing.pair()).await;

        let ended = self
            .matches
            .update_match_status(match_id, MatchStatus::Unmatched, requester_id, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => MatchError::NotFound("Match not found".to_string()),
                other => other.into(),
            })?;

        tracing::info!("Match {} unmatched by {}", match_id, requester_id);
        Ok(ended)
    }

    /// Block `target_id` and end any active match between the pair
    ///
    /// Returns the match that was moved to `blocked`, if there was one.
    pub async fn block(&self, blocker_id: &str, target_id: &str) -> MatchResult<Option<Match>> {
        if blocker_id == target_id {
            return Err(MatchError::InvalidArgument(
                "Cannot block yourself".to_string(),
            ));
        }
        self.require_profile(target_id).await?;

        let _guard = self.locks.lock(&PairKey::new(blocker_id, target_id)).await;

        if !self.profiles.add_blocked(blocker_id, target_id).await? {
            return Err(MatchError::InvalidArgument("User already blocked".to_string()));
        }

        let ended = match self.matches.find_active_match(blocker_id, target_id).await? {
            Some(active) => Some(
                self.matches
                    .update_match_status(active.id, MatchStatus::Blocked, blocker_id, Utc::now())
                    .await?,
            ),
            None => None,
        };

        tracing::info!(
            "User {} blocked {}{}",
            blocker_id,
            target_id,
            if ended.is_some() { " (match ended)" } else { "" }
        );
        Ok(ended)
    }

    /// Remove `target_id` from the blocked set. Ended matches stay ended.
    pub async fn unblock(&self, blocker_id: &str, target_id: &str) -> MatchResult<()> {
        if self.profiles.remove_blocked(blocker_id, target_id).await? {
            tracing::info!("User {} unblocked {}", blocker_id, target_id);
        } else {
            tracing::debug!("User {} was not blocking {}", blocker_id, target_id);
        }
        Ok(())
    }

    pub async fn report(
        &self,
        reporter_id: &str,
        target_id: &str,
        reason: ReportReason,
    ) -> MatchResult<()> {
        if reporter_id == target_id {
            return Err(MatchError::InvalidArgument(
                "Cannot report yourself".to_string(),
            ));
        }
        self.require_profile(target_id).await?;

        self.profiles.add_reported(reporter_id, target_id).await?;

        tracing::info!("User {} reported {} ({})", reporter_id, target_id, reason);
        Ok(())
    }

    /// Active matches of `user_id`, newest first
    pub async fn list_matches(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> MatchResult<Vec<Match>> {
        if page == 0 || page_size == 0 {
            return Err(MatchError::InvalidArgument(
                "page and page size must be positive".to_string(),
            ));
        }
        Ok(self
            .matches
            .list_active_matches(user_id, page, page_size)
            .await?)
    }

    async fn require_profile(&self, id: &str) -> MatchResult<UserProfile> {
        self.profiles
            .get_profile(id)
            .await?
            .ok_or_else(|| MatchError::NotFound("User not found".to_string()))
    }
}
