//! Tab session persistence: schema, migration, rehydration and debounced writes.
//! 標籤工作階段的持久化：格式、遷移、重建與延遲寫入。

mod error;
pub mod migrate;
pub mod persistence;
pub mod rehydrate;
pub mod scheduler;
pub mod schema;
pub mod storage;

pub use error::SessionError;
pub use migrate::migrate_v1_to_v2;
pub use persistence::SessionPersistence;
pub use rehydrate::{reduce, rehydrate};
pub use scheduler::SaveScheduler;
pub use schema::{
    decode, encode, LegacySingleTab, PersistedComparisonTab, PersistedSession,
    PersistedSessionV1, ReducedSingleTab, StoredSession, LEGACY_FORMAT_VERSION,
    SESSION_FORMAT_VERSION,
};
pub use storage::{write_atomic, FileStorage, MemoryStorage, SessionStorage};
