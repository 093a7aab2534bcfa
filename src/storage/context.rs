//! StorageContext - Holds the backends and hands out per-entity facades.

use super::files::FileStorage;
use super::handler::HandlerStorage;
use super::json::{JsonStore, SqliteJsonStore};
use super::model::ModelStorage;
use super::ResourceGroup;
use crate::config::Config;
use crate::error::Result;
use crate::records::{RecordStore, SqliteRecordStore};
use crate::sync::{LocalProvider, SyncProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default folder below `storage_dir` holding resource folders
pub const DEFAULT_CONTENT_DIR: &str = "content";

#[derive(Clone)]
pub struct StorageContext {
    records: Arc<dyn RecordStore>,
    json: Arc<dyn JsonStore>,
    provider: Arc<dyn SyncProvider>,
    storage_dir: PathBuf,
    content_dir: String,
    company_id: i64,
}

impl StorageContext {
    pub fn new(
        records: Arc<dyn RecordStore>,
        json: Arc<dyn JsonStore>,
        provider: Arc<dyn SyncProvider>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            records,
            json,
            provider,
            storage_dir: storage_dir.into(),
            content_dir: DEFAULT_CONTENT_DIR.to_string(),
            company_id: 0,
        }
    }

    /// SQLite records + JSON values in the configured database, local provider
    /// on the configured remote directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        let records = Arc::new(SqliteRecordStore::open(&db_path)?);
        let json = Arc::new(SqliteJsonStore::open(&db_path)?);
        let provider = Arc::new(LocalProvider::new(config.remote.path.clone()));

        Ok(Self::new(records, json, provider, config.storage_dir.clone())
            .with_content_dir(&config.content_dir)
            .with_company_id(config.company_id))
    }

    pub fn with_content_dir(mut self, content_dir: &str) -> Self {
        self.content_dir = content_dir.to_string();
        self
    }

    pub fn with_company_id(mut self, company_id: i64) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn company_id(&self) -> i64 {
        self.company_id
    }

    /// File backend of one resource. `root_dir` overrides the content dir.
    pub fn file_storage(
        &self,
        group: ResourceGroup,
        resource_id: i64,
        root_dir: Option<&str>,
        sync: bool,
    ) -> Result<FileStorage> {
        FileStorage::new(
            &self.storage_dir,
            root_dir.unwrap_or(&self.content_dir),
            group,
            self.company_id,
            resource_id,
            sync,
            self.provider.clone(),
        )
    }

    pub fn model_storage(&self, predictor_id: i64) -> Result<ModelStorage> {
        let files = self.file_storage(ResourceGroup::Predictor, predictor_id, None, true)?;
        Ok(ModelStorage::new(
            predictor_id,
            self.company_id,
            self.records.clone(),
            self.json.clone(),
            files,
        ))
    }

    pub fn handler_storage(
        &self,
        integration_id: i64,
        root_dir: Option<&str>,
        is_temporal: bool,
    ) -> Result<HandlerStorage> {
        let files =
            self.file_storage(ResourceGroup::Integration, integration_id, root_dir, false)?;
        Ok(HandlerStorage::new(
            integration_id,
            self.company_id,
            is_temporal,
            self.records.clone(),
            self.json.clone(),
            files,
        ))
    }
}
