pub mod postgres;
pub mod redis;
pub mod users;

pub use postgres::create_pool;
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
pub use users::{ProfileUpdates, UserStore};
