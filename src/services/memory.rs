use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::filters::admits;
use crate::models::{
    CandidateQuery, InteractionRecord, Location, Match, MatchStatus, PairKey, Stat, SwipeAction,
    UserProfile,
};
use crate::services::store::{
    page_offset, InteractionLog, MatchStore, ProfileStore, StoreError, StoreResult,
};

/// In-process store backing all three store traits
///
/// Used when no database is configured and throughout the test suite.
/// Lock order is swipes before passed; no method holds locks from two
/// different trait families at once.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    swipes: RwLock<HashMap<(String, String), InteractionRecord>>,
    passed: RwLock<HashMap<String, HashSet<String>>>,
    matches: RwLock<HashMap<Uuid, Match>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let map = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();
        Self {
            profiles: RwLock::new(map),
            ..Self::default()
        }
    }

    async fn modify_profile<F>(&self, id: &str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn find_active_profiles(
        &self,
        query: &CandidateQuery,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<UserProfile>> {
        let profiles = self.profiles.read().await;

        let mut admitted: Vec<&UserProfile> =
            profiles.values().filter(|p| admits(query, p)).collect();
        admitted.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(admitted
            .into_iter()
            .skip(page_offset(page, page_size))
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn increment_stat(&self, id: &str, stat: Stat) -> StoreResult<()> {
        self.modify_profile(id, |profile| stat.bump(&mut profile.stats))
            .await
    }

    async fn save_profile(&self, profile: UserProfile) -> StoreResult<()> {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn add_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let mut inserted = false;
        self.modify_profile(owner, |profile| {
            inserted = profile.blocked.insert(target.to_string());
        })
        .await?;
        Ok(inserted)
    }

    async fn remove_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let mut removed = false;
        self.modify_profile(owner, |profile| {
            removed = profile.blocked.remove(target);
        })
        .await?;
        Ok(removed)
    }

    async fn add_reported(&self, owner: &str, target: &str) -> StoreResult<()> {
        self.modify_profile(owner, |profile| {
            profile.reported.insert(target.to_string());
        })
        .await
    }

    async fn update_location(&self, id: &str, location: Location) -> StoreResult<()> {
        self.modify_profile(id, |profile| profile.location = location)
            .await
    }
}

#[async_trait]
impl InteractionLog for MemoryStore {
    async fn upsert_swipe(
        &self,
        from: &str,
        to: &str,
        action: SwipeAction,
        at: DateTime<Utc>,
    ) -> StoreResult<InteractionRecord> {
        let record = InteractionRecord {
            from: from.to_string(),
            to: to.to_string(),
            action,
            created_at: at,
        };
        self.swipes
            .write()
            .await
            .insert((from.to_string(), to.to_string()), record.clone());
        Ok(record)
    }

    async fn find_swipe(&self, from: &str, to: &str) -> StoreResult<Option<InteractionRecord>> {
        Ok(self
            .swipes
            .read()
            .await
            .get(&(from.to_string(), to.to_string()))
            .cloned())
    }

    async fn list_swiped_targets(&self, from: &str) -> StoreResult<HashSet<String>> {
        let swipes = self.swipes.read().await;
        let mut targets: HashSet<String> = swipes
            .values()
            .filter(|record| record.from == from)
            .map(|record| record.to.clone())
            .collect();
        drop(swipes);

        if let Some(passed) = self.passed.read().await.get(from) {
            targets.extend(passed.iter().cloned());
        }
        Ok(targets)
    }

    async fn list_likes_received(&self, to: &str) -> StoreResult<Vec<InteractionRecord>> {
        let swipes = self.swipes.read().await;
        let mut likes: Vec<InteractionRecord> = swipes
            .values()
            .filter(|record| record.to == to && record.action.is_positive())
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    async fn compact_dislikes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut swipes = self.swipes.write().await;
        let mut passed = self.passed.write().await;

        let expired: Vec<(String, String)> = swipes
            .iter()
            .filter(|(_, record)| {
                record.action == SwipeAction::Dislike && record.created_at < cutoff
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(record) = swipes.remove(key) {
                passed.entry(record.from).or_default().insert(record.to);
            }
        }

        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create_match(&self, new_match: Match) -> StoreResult<Match> {
        let mut matches = self.matches.write().await;
        let pair = new_match.pair();

        if matches.values().any(|m| m.is_active() && m.pair() == pair) {
            return Err(StoreError::Conflict(format!(
                "active match already exists for {} and {}",
                pair.low, pair.high
            )));
        }

        matches.insert(new_match.id, new_match.clone());
        Ok(new_match)
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        Ok(self.matches.read().await.get(&id).cloned())
    }

    async fn find_active_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
        let pair = PairKey::new(a, b);
        Ok(self
            .matches
            .read()
            .await
            .values()
            .find(|m| m.is_active() && m.pair() == pair)
            .cloned())
    }

    async fn find_ended_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
        let pair = PairKey::new(a, b);
        Ok(self
            .matches
            .read()
            .await
            .values()
            .filter(|m| !m.is_active() && m.pair() == pair)
            .max_by_key(|m| m.unmatched_at.unwrap_or(m.created_at))
            .cloned())
    }

    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Match> {
        let mut matches = self.matches.write().await;
        let existing = matches
            .get_mut(&id)
            .filter(|m| m.is_active())
            .ok_or_else(|| StoreError::NotFound(format!("active match {}", id)))?;

        existing.status = status;
        existing.unmatched_by = Some(actor.to_string());
        existing.unmatched_at = Some(at);
        Ok(existing.clone())
    }

    async fn list_active_matches(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<Match>> {
        let matches = self.matches.read().await;
        let mut active: Vec<&Match> = matches
            .values()
            .filter(|m| m.is_active() && m.involves(user))
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(active
            .into_iter()
            .skip(page_offset(page, page_size))
            .take(page_size as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Compatibility, Gender, LookingFor, MatchType, ProfileStats, ProfileStatus,
    };
    use chrono::Duration;
    use std::collections::BTreeSet;

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

    fn create_test_match(a: &str, b: &str) -> Match {
        Match::new(
            [a.to_string(), b.to_string()],
            a.to_string(),
            MatchType::Match,
            Compatibility::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_find_active_profiles_paginates_by_id() {
        let store = MemoryStore::with_profiles(
            ["e", "a", "d", "me", "c", "b"].into_iter().map(create_test_profile),
        );
        let query = CandidateQuery::for_requester("me");

        let first = store.find_active_profiles(&query, 1, 3).await.unwrap();
        let second = store.find_active_profiles(&query, 2, 3).await.unwrap();

        let ids: Vec<String> = first.iter().chain(&second).map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_previous_decision() {
        let store = MemoryStore::new();
        store.upsert_swipe("a", "b", SwipeAction::Like, Utc::now()).await.unwrap();
        store.upsert_swipe("a", "b", SwipeAction::Dislike, Utc::now()).await.unwrap();

        let record = store.find_swipe("a", "b").await.unwrap().unwrap();
        assert_eq!(record.action, SwipeAction::Dislike);
        assert!(store.list_likes_received("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compaction_keeps_target_excluded() {
        let store = MemoryStore::new();
        let old = Utc::now() - Duration::days(40);
        store.upsert_swipe("a", "b", SwipeAction::Dislike, old).await.unwrap();
        store.upsert_swipe("a", "c", SwipeAction::Dislike, Utc::now()).await.unwrap();
        store.upsert_swipe("a", "d", SwipeAction::Like, old).await.unwrap();

        let compacted = store
            .compact_dislikes(Utc::now() - Duration::days(30))
            .await
            .unwrap();

        assert_eq!(compacted, 1);
        assert!(store.find_swipe("a", "b").await.unwrap().is_none());
        assert!(store.find_swipe("a", "d").await.unwrap().is_some());
        let targets = store.list_swiped_targets("a").await.unwrap();
        assert_eq!(targets, HashSet::from(["b".to_string(), "c".to_string(), "d".to_string()]));
    }

    #[tokio::test]
    async fn test_create_match_rejects_duplicate_active_pair() {
        let store = MemoryStore::new();
        store.create_match(create_test_match("a", "b")).await.unwrap();

        let err = store.create_match(create_test_match("b", "a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_status_only_from_active() {
        let store = MemoryStore::new();
        let created = store.create_match(create_test_match("a", "b")).await.unwrap();

        let ended = store
            .update_match_status(created.id, MatchStatus::Unmatched, "a", Utc::now())
            .await
            .unwrap();
        assert_eq!(ended.status, MatchStatus::Unmatched);
        assert_eq!(ended.unmatched_by.as_deref(), Some("a"));

        let again = store
            .update_match_status(created.id, MatchStatus::Unmatched, "a", Utc::now())
            .await;
        assert!(matches!(again, Err(StoreError::NotFound(_))));

        assert!(store.find_active_match("a", "b").await.unwrap().is_none());
        assert!(store.find_ended_match("b", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_block_set_reports_changes() {
        let store = MemoryStore::with_profiles([create_test_profile("a")]);

        assert!(store.add_blocked("a", "b").await.unwrap());
        assert!(!store.add_blocked("a", "b").await.unwrap());
        assert!(store.remove_blocked("a", "b").await.unwrap());
        assert!(!store.remove_blocked("a", "b").await.unwrap());
        assert!(matches!(
            store.add_blocked("missing", "b").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
