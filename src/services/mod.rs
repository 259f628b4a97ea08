// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats, CachedProfileStore};
pub use memory::MemoryStore;
pub use postgres::{PostgresError, PostgresStore};
pub use store::{InteractionLog, MatchStore, ProfileStore, StoreError, StoreResult};
