//! modelfs - Storage facade for predictors and integrations.
//!
//! Every predictor and integration gets three kinds of storage:
//! - a metadata record (status, training progress, schema, connection args)
//! - a folder of files, cached locally and synced with durable storage
//! - small JSON values
//!
//! `ModelStorage` and `HandlerStorage` compose the three behind one interface.
//! Backends are injected through `StorageContext`; nothing is global.
//! Folders sync only when asked: `folder_get` pulls, `folder_sync` pushes.

pub mod config;
pub mod error;
pub mod records;
pub mod storage;
pub mod sync;

// Re-export main types
pub use config::Config;
pub use error::{Result, StorageError};
pub use records::{
    IntegrationRecord, JsonMap, PredictorRecord, RecordStore, SqliteRecordStore, TrainingPhase,
};
pub use storage::{
    normalize_name, HandlerStorage, JsonStore, ModelStorage, PredictorInfo, ResourceGroup,
    ResourceStorage, SqliteJsonStore, StorageContext,
};
pub use sync::{LocalProvider, PullResult, PushResult, SyncProvider};
