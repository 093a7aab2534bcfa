//! Storage module - Per-entity storage facades and the backends they compose.
//!
//! This module contains:
//! - FileStorage: local cache folder of a resource, synced through a provider
//! - JsonStore: scoped JSON values
//! - ModelStorage / HandlerStorage: facades for predictors and integrations
//! - StorageContext: builds facades from injected backends
//! - Zip archive export/import of a resource folder

pub mod archive;
pub mod context;
pub mod files;
pub mod handler;
pub mod json;
pub mod model;
pub mod names;

pub use context::StorageContext;
pub use files::FileStorage;
pub use handler::HandlerStorage;
pub use json::{JsonScope, JsonStore, SqliteJsonStore};
pub use model::{ModelStorage, PredictorInfo};
pub use names::normalize_name;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Kind of entity a folder or JSON value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceGroup {
    Predictor,
    Integration,
}

impl ResourceGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predictor => "predictor",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File, folder and JSON facet shared by both facades.
///
/// Folders are only as fresh as the last `folder_get`; writers must call
/// `folder_sync` themselves.
pub trait ResourceStorage {
    /// Read a file, `None` if absent
    fn file_get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    fn file_set(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Top-level file and folder names, service files excluded
    fn file_list(&self) -> Result<Vec<String>>;

    fn file_del(&self, name: &str) -> Result<()>;

    /// Pull a folder and return its local path
    fn folder_get(&self, name: &str) -> Result<PathBuf>;

    /// Push local changes of a folder
    fn folder_sync(&self, name: &str) -> Result<()>;

    fn json_set(&self, name: &str, data: &Value) -> Result<()>;

    fn json_get(&self, name: &str) -> Result<Option<Value>>;

    fn json_list(&self) -> Result<Vec<String>>;

    fn json_del(&self, name: &str) -> Result<()>;

    /// Purge all files and JSON values. The record row is left alone.
    fn delete(&self) -> Result<()>;
}
