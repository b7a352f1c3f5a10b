pub mod favorites;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use favorites::{FavoritesStore, PgFavoritesStore};
pub use memory::InMemoryFavoritesStore;
pub use postgres::{create_pool, run_migrations};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
