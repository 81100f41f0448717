pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{create_redis_client, Cache, CacheBackend, CacheKey, MemoryCache, RedisCache};
pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use store::{CatalogStore, StoreTx};
