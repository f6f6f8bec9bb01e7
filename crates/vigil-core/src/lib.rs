pub mod error;
pub mod keys;
pub mod store;

pub use error::{Result, StoreError};
pub use store::memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use store::redis_store::RedisStore;
pub use store::{open, SharedStore, Store, StoreOp};
