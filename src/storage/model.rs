//! ModelStorage - Everything a predictor persists: status, training progress,
//! schema, artifacts and JSON values.

use super::files::FileStorage;
use super::json::{JsonScope, JsonStore};
use super::names::normalize_name;
use super::{ResourceGroup, ResourceStorage};
use crate::error::{Result, StorageError};
use crate::records::{
    merge_field, replace_field, DtypeDict, JsonMap, PredictorRecord, RecordStore, TrainingPhase,
};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Summary returned by `ModelStorage::get_info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictorInfo {
    pub status: Option<String>,
    pub to_predict: Vec<String>,
    pub data: Option<Value>,
}

pub struct ModelStorage {
    predictor_id: i64,
    company_id: i64,
    records: Arc<dyn RecordStore>,
    json: Arc<dyn JsonStore>,
    files: FileStorage,
}

impl ModelStorage {
    /// Build a facade from its backends. `files` should be a syncing
    /// FileStorage of the predictor group.
    pub fn new(
        predictor_id: i64,
        company_id: i64,
        records: Arc<dyn RecordStore>,
        json: Arc<dyn JsonStore>,
        files: FileStorage,
    ) -> Self {
        Self {
            predictor_id,
            company_id,
            records,
            json,
            files,
        }
    }

    pub fn predictor_id(&self) -> i64 {
        self.predictor_id
    }

    pub fn file_storage(&self) -> &FileStorage {
        &self.files
    }

    fn json_scope(&self) -> JsonScope {
        JsonScope::new(ResourceGroup::Predictor, self.company_id, self.predictor_id)
    }

    fn record(&self) -> Result<PredictorRecord> {
        self.records
            .get_predictor(self.predictor_id)?
            .ok_or_else(|| StorageError::predictor_not_found(self.predictor_id))
    }

    /// Read the row, apply `change`, commit
    fn modify(&self, change: impl FnOnce(&mut PredictorRecord)) -> Result<()> {
        let mut record = self.record()?;
        change(&mut record);
        self.records.save_predictor(&record)
    }

    pub fn get_info(&self) -> Result<PredictorInfo> {
        let record = self.record()?;
        Ok(PredictorInfo {
            status: record.status,
            to_predict: record.to_predict,
            data: record.data,
        })
    }

    /// Merge `patch` into the `data` field
    pub fn update_data(&self, patch: JsonMap) -> Result<()> {
        self.modify(|record| merge_field(&mut record.data, patch))
    }

    /// Merge `patch` into the `learn_args` field
    pub fn update_learn_args(&self, patch: JsonMap) -> Result<()> {
        self.modify(|record| merge_field(&mut record.learn_args, patch))
    }

    /// Set the status. With `status_info`, `data` is replaced by it entirely.
    pub fn status_set(&self, status: &str, status_info: Option<Value>) -> Result<()> {
        debug!("[ModelStorage] Predictor {} -> {}", self.predictor_id, status);
        self.modify(|record| {
            record.status = Some(status.to_string());
            if let Some(info) = status_info {
                replace_field(&mut record.data, Some(info));
            }
        })
    }

    /// Overwrite only the supplied parts of the training phase
    pub fn training_state_set(
        &self,
        current: Option<i64>,
        total: Option<i64>,
        name: Option<&str>,
    ) -> Result<()> {
        self.modify(|record| {
            let phase = &mut record.training_phase;
            if current.is_some() {
                phase.current = current;
            }
            if total.is_some() {
                phase.total = total;
            }
            if let Some(name) = name {
                phase.name = Some(name.to_string());
            }
        })
    }

    pub fn training_state_get(&self) -> Result<TrainingPhase> {
        Ok(self.record()?.training_phase)
    }

    pub fn columns_get(&self) -> Result<Option<DtypeDict>> {
        Ok(self.record()?.dtype_dict)
    }

    pub fn columns_set(&self, columns: DtypeDict) -> Result<()> {
        self.modify(|record| replace_field(&mut record.dtype_dict, Some(columns)))
    }
}

impl ResourceStorage for ModelStorage {
    fn file_get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.files.file_get(name)
    }

    fn file_set(&self, name: &str, content: &[u8]) -> Result<()> {
        self.files.file_set(name, content)
    }

    fn file_list(&self) -> Result<Vec<String>> {
        self.files.list()
    }

    fn file_del(&self, name: &str) -> Result<()> {
        self.files.delete_path(name, true)
    }

    fn folder_get(&self, name: &str) -> Result<PathBuf> {
        let name = normalize_name(name);
        self.files.pull_path(&name)?;
        self.files.get_path(&name)
    }

    fn folder_sync(&self, name: &str) -> Result<()> {
        let name = normalize_name(name);
        self.files.push_path(&name)?;
        Ok(())
    }

    fn json_set(&self, name: &str, data: &Value) -> Result<()> {
        self.json.set(self.json_scope(), name, data)
    }

    fn json_get(&self, name: &str) -> Result<Option<Value>> {
        self.json.get(self.json_scope(), name)
    }

    fn json_list(&self) -> Result<Vec<String>> {
        self.json.list(self.json_scope())
    }

    fn json_del(&self, name: &str) -> Result<()> {
        self.json.delete(self.json_scope(), name)
    }

    fn delete(&self) -> Result<()> {
        self.files.delete(true)?;
        self.json.clean(self.json_scope())
    }
}
