//! Records module - Metadata rows for predictors and integrations.
//!
//! This module contains:
//! - `PredictorRecord` / `IntegrationRecord` row types
//! - `RecordStore` trait (lookup + commit) used by the storage facades
//! - `merge_field` / `replace_field`, the two mapping-field update rules
//! - SQLite implementation of the store

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON object used for `data`, `learn_args` and connection args.
pub type JsonMap = serde_json::Map<String, Value>;

/// Column name -> dtype mapping of a predictor.
pub type DtypeDict = BTreeMap<String, String>;

/// Training progress of a predictor. Each field is updated independently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPhase {
    pub current: Option<i64>,
    pub total: Option<i64>,
    pub name: Option<String>,
}

/// A trained model entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorRecord {
    pub id: i64,
    pub name: String,
    pub status: Option<String>,
    pub to_predict: Vec<String>,
    /// Free-form mapping, merged by `update_data`
    pub data: Option<Value>,
    /// Training arguments, merged by `update_learn_args`
    pub learn_args: Option<Value>,
    pub dtype_dict: Option<DtypeDict>,
    pub training_phase: TrainingPhase,
}

impl PredictorRecord {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An external data-source connector entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub id: i64,
    pub name: String,
    pub engine: String,
    /// Connection parameters, always replaced wholesale
    pub data: JsonMap,
}

impl IntegrationRecord {
    pub fn new(id: i64, name: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            engine: engine.into(),
            data: JsonMap::new(),
        }
    }
}

/// Durable record store for predictors and integrations.
///
/// Rows are created and removed by the owner of the store; the facades only
/// read a row, change fields in place and commit it back with `save_*`.
pub trait RecordStore: Send + Sync {
    /// Look up a predictor row
    fn get_predictor(&self, id: i64) -> Result<Option<PredictorRecord>>;

    /// Commit a modified predictor row. Fails with NotFound if the row is gone.
    fn save_predictor(&self, record: &PredictorRecord) -> Result<()>;

    /// Look up an integration row
    fn get_integration(&self, id: i64) -> Result<Option<IntegrationRecord>>;

    /// Commit a modified integration row. Fails with NotFound if the row is gone.
    fn save_integration(&self, record: &IntegrationRecord) -> Result<()>;
}

/// Merge `patch` into a mapping field. Patch keys override existing keys.
/// A field that is not a mapping yet is replaced by `patch` outright.
pub fn merge_field(slot: &mut Option<Value>, patch: JsonMap) {
    match slot {
        Some(Value::Object(current)) => current.extend(patch),
        _ => *slot = Some(Value::Object(patch)),
    }
}

/// Replace a field wholesale. Keys of the previous value do not survive.
pub fn replace_field<T>(slot: &mut T, value: T) {
    *slot = value;
}
