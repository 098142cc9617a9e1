pub mod adapter;
pub mod date;
pub mod error;
pub mod journal;
pub mod schema;
pub mod store;

pub use adapter::{Backend, LocalStorageAdapter, StorageAdapter, open_adapter};
pub use error::{Result, StorageError, ValidationError};
pub use journal::{Journal, LogFilter, LogView, Status};
pub use schema::{
    AppData, DATA_VERSION, DayRecord, EveningAnswers, EveningRecord, MorningAnswers,
    MorningRecord, Schema, Settings,
};
pub use store::{DetachedStore, KeyValueStore, MemoryStore, SqliteStore};
