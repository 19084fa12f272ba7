// Service exports
pub mod cache;
pub mod memory;
pub mod notify;
pub mod postgres;
pub mod store;

pub use cache::{CacheKey, CacheManager, CachedStore};
pub use memory::MemoryStore;
pub use notify::{LogNotifier, NotificationSink, NotifyError};
pub use postgres::PostgresStore;
pub use store::{CommitOutcome, ProfileStore, StoreError};
