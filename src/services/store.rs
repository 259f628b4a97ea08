//! Store contracts consumed by the matching core.
//!
//! The core never talks to a database directly. It reads profiles, swipe
//! records and matches through these traits, so the in-memory store used by
//! tests and the PostgreSQL store used in production are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CandidateQuery, InteractionRecord, Location, Match, MatchStatus, Stat, SwipeAction,
    UserProfile,
};

/// Errors surfaced by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<UserProfile>>;

    /// Active profiles admitted by `query`, ordered by id, one page at a time.
    /// `page` is 1-based.
    async fn find_active_profiles(
        &self,
        query: &CandidateQuery,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<UserProfile>>;

    /// Atomic increment of a display counter
    async fn increment_stat(&self, id: &str, stat: Stat) -> StoreResult<()>;

    /// Insert or replace a whole profile
    async fn save_profile(&self, profile: UserProfile) -> StoreResult<()>;

    /// Returns false when `target` was already blocked
    async fn add_blocked(&self, owner: &str, target: &str) -> StoreResult<bool>;

    /// Returns false when `target` was not blocked
    async fn remove_blocked(&self, owner: &str, target: &str) -> StoreResult<bool>;

    async fn add_reported(&self, owner: &str, target: &str) -> StoreResult<()>;

    async fn update_location(&self, id: &str, location: Location) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[async_trait]
pub trait InteractionLog: Send + Sync {
    /// Insert or overwrite the record for the ordered (from, to) pair
    async fn upsert_swipe(
        &self,
        from: &str,
        to: &str,
        action: SwipeAction,
        at: DateTime<Utc>,
    ) -> StoreResult<InteractionRecord>;

    async fn find_swipe(&self, from: &str, to: &str) -> StoreResult<Option<InteractionRecord>>;

    /// Every target `from` has ever swiped on, compacted dislikes included
    async fn list_swiped_targets(&self, from: &str) -> StoreResult<HashSet<String>>;

    /// Like and superlike records pointing at `to`, newest first
    async fn list_likes_received(&self, to: &str) -> StoreResult<Vec<InteractionRecord>>;

    /// Drops dislike records created before `cutoff`, keeping their targets
    /// in the author's passed set. Returns how many records were compacted.
    async fn compact_dislikes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Fails with `Conflict` when the pair already has an active match
    async fn create_match(&self, new_match: Match) -> StoreResult<Match>;

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<Match>>;

    async fn find_active_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>>;

    /// Most recent unmatched or blocked match between the pair
    async fn find_ended_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>>;

    /// Moves an active match to `status`. `NotFound` if it is not active.
    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Match>;

    /// Active matches of `user`, newest first
    async fn list_active_matches(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<Match>>;
}

/// Zero-based row offset of a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> usize {
    (page.max(1) as usize - 1) * page_size as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
    }
}
