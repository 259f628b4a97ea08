use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateQuery, Location, Stat, UserProfile};
use crate::services::store::{ProfileStore, StoreResult};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis, shared across instances,
/// and optional: without it the manager is a plain L1 cache.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an in-process cache with no Redis tier
    pub fn l1_only(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_l2(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let Some(l2) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        let mut conn = l2.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            let bytes = json.as_bytes().to_vec();
            self.l1_cache.insert(key.to_string(), bytes).await;

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from every configured tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            l2_enabled: self.has_l2(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub l2_enabled: bool,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a user profile
    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }
}

/// Profile store decorator that serves reads by id from the cache
///
/// Every write through the decorator invalidates the written profile.
/// Candidate queries always go to the inner store. Cache failures degrade
/// to the inner store and are logged.
pub struct CachedProfileStore {
    inner: Arc<dyn ProfileStore>,
    cache: Arc<CacheManager>,
}

impl CachedProfileStore {
    pub fn new(inner: Arc<dyn ProfileStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn invalidate(&self, id: &str) {
        if let Err(e) = self.cache.delete(&CacheKey::profile(id)).await {
            tracing::warn!("Failed to invalidate cached profile {}: {}", id, e);
        }
    }
}

#[async_trait]
impl ProfileStore for CachedProfileStore {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        let key = CacheKey::profile(id);

        match self.cache.get::<UserProfile>(&key).await {
            Ok(profile) => return Ok(Some(profile)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Profile cache read failed for {}: {}", id, e),
        }

        let profile = self.inner.get_profile(id).await?;
        if let Some(profile) = &profile {
            if let Err(e) = self.cache.set(&key, profile).await {
                tracing::warn!("Profile cache write failed for {}: {}", id, e);
            }
        }
        Ok(profile)
    }

    async fn find_active_profiles(
        &self,
        query: &CandidateQuery,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<UserProfile>> {
        self.inner.find_active_profiles(query, page, page_size).await
    }

    async fn increment_stat(&self, id: &str, stat: Stat) -> StoreResult<()> {
        self.inner.increment_stat(id, stat).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn save_profile(&self, profile: UserProfile) -> StoreResult<()> {
        let id = profile.id.clone();
        self.inner.save_profile(profile).await?;
        self.invalidate(&id).await;
        Ok(())
    }

    async fn add_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let changed = self.inner.add_blocked(owner, target).await?;
        self.invalidate(owner).await;
        Ok(changed)
    }

    async fn remove_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let changed = self.inner.remove_blocked(owner, target).await?;
        self.invalidate(owner).await;
        Ok(changed)
    }

    async fn add_reported(&self, owner: &str, target: &str) -> StoreResult<()> {
        self.inner.add_reported(owner, target).await?;
        self.invalidate(owner).await;
        Ok(())
    }

    async fn update_location(&self, id: &str, location: Location) -> StoreResult<()> {
        self.inner.update_location(id, location).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, LookingFor, ProfileStats, ProfileStatus};
    use crate::services::MemoryStore;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn create_test_profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: format!("User {}", id),
            age: 25,
            gender: Gender::Female,
            bio: None,
            interests: vec!["music".to_string()],
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

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.is_err());
    }

    #[tokio::test]
    async fn test_l1_only_set_get_delete() {
        let cache = CacheManager::l1_only(100, 60);
        assert!(!cache.has_l2());

        cache.set("k", &42u32).await.unwrap();
        assert_eq!(cache.get::<u32>("k").await.unwrap(), 42);

        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get::<u32>("k").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_cached_store_invalidates_on_write() {
        let inner = Arc::new(MemoryStore::with_profiles([create_test_profile("a")]));
        let cached = CachedProfileStore::new(inner.clone(), Arc::new(CacheManager::l1_only(100, 60)));

        let before = cached.get_profile("a").await.unwrap().unwrap();
        assert!(before.blocked.is_empty());

        assert!(cached.add_blocked("a", "b").await.unwrap());

        let after = cached.get_profile("a").await.unwrap().unwrap();
        assert!(after.has_blocked("b"));
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::profile("user123"), "profile:user123");
    }
}
