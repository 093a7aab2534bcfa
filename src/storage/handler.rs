//! HandlerStorage - Connection args, staged files and JSON values of an integration.
//!
//! The underlying FileStorage does not sync on its own; this facade pulls
//! before every read and pushes after every write. A temporal instance never
//! publishes local content to the provider; `delete` still purges it.

use super::archive::{pack_folder, unpack_into};
use super::files::FileStorage;
use super::json::{JsonScope, JsonStore};
use super::names::normalize_name;
use super::{ResourceGroup, ResourceStorage};
use crate::error::{Result, StorageError};
use crate::records::{replace_field, IntegrationRecord, JsonMap, RecordStore};
use crate::sync::is_service_file;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub struct HandlerStorage {
    integration_id: i64,
    company_id: i64,
    is_temporal: bool,
    records: Arc<dyn RecordStore>,
    json: Arc<dyn JsonStore>,
    files: FileStorage,
}

impl HandlerStorage {
    pub fn new(
        integration_id: i64,
        company_id: i64,
        is_temporal: bool,
        records: Arc<dyn RecordStore>,
        json: Arc<dyn JsonStore>,
        files: FileStorage,
    ) -> Self {
        Self {
            integration_id,
            company_id,
            is_temporal,
            records,
            json,
            files,
        }
    }

    pub fn integration_id(&self) -> i64 {
        self.integration_id
    }

    pub fn is_temporal(&self) -> bool {
        self.is_temporal
    }

    pub fn file_storage(&self) -> &FileStorage {
        &self.files
    }

    fn json_scope(&self) -> JsonScope {
        JsonScope::new(ResourceGroup::Integration, self.company_id, self.integration_id)
    }

    fn record(&self) -> Result<IntegrationRecord> {
        self.records
            .get_integration(self.integration_id)?
            .ok_or_else(|| StorageError::integration_not_found(self.integration_id))
    }

    pub fn get_connection_args(&self) -> Result<JsonMap> {
        Ok(self.record()?.data)
    }

    /// Replace the connection args wholesale
    pub fn update_connection_args(&self, connection_args: JsonMap) -> Result<()> {
        let mut record = self.record()?;
        replace_field(&mut record.data, connection_args);
        self.records.save_integration(&record)
    }

    /// True if the local folder holds nothing but service files
    pub fn is_empty(&self) -> Result<bool> {
        let folder = self.files.folder_path();
        if !folder.exists() {
            return Ok(true);
        }
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            if entry.file_type()?.is_file() && is_service_file(&entry.file_name().to_string_lossy())
            {
                continue;
            }
            return Ok(false);
        }
        Ok(true)
    }

    /// Zip every non-service file of the folder. `None` if the folder is empty.
    pub fn export_files(&self) -> Result<Option<Vec<u8>>> {
        if self.is_empty()? {
            return Ok(None);
        }
        let folder = self.folder_get("")?;
        let content = pack_folder(&folder)?;
        info!(
            "[HandlerStorage] Exported integration {} ({} bytes)",
            self.integration_id,
            content.len()
        );
        Ok(Some(content))
    }

    /// Extract an archive over the folder, then publish the whole folder.
    /// Returns the number of files extracted.
    pub fn import_files(&self, content: &[u8]) -> Result<usize> {
        let folder = self.folder_get("")?;
        let written = unpack_into(content, &folder)?;
        self.folder_sync("")?;
        info!(
            "[HandlerStorage] Imported {} file(s) into integration {}",
            written, self.integration_id
        );
        Ok(written)
    }
}

impl ResourceStorage for HandlerStorage {
    /// Read a file by its normalized name. Dots are normalized away too, so
    /// `"Service Account.json"` is stored as `service_account_json`.
    fn file_get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let name = normalize_name(name);
        self.files.pull_path(&name)?;
        self.files.file_get(&name)
    }

    /// Write a file under its normalized name (see `file_get`); the
    /// extension does not survive as a separate suffix.
    fn file_set(&self, name: &str, content: &[u8]) -> Result<()> {
        let name = normalize_name(name);
        self.files.file_set(&name, content)?;
        if !self.is_temporal {
            self.files.push_path(&name)?;
        }
        Ok(())
    }

    fn file_list(&self) -> Result<Vec<String>> {
        self.files.list()
    }

    fn file_del(&self, name: &str) -> Result<()> {
        let name = normalize_name(name);
        self.files.delete_path(&name, !self.is_temporal)
    }

    fn folder_get(&self, name: &str) -> Result<PathBuf> {
        let name = normalize_name(name);
        self.files.pull_path(&name)?;
        self.files.get_path(&name)
    }

    fn folder_sync(&self, name: &str) -> Result<()> {
        if self.is_temporal {
            debug!(
                "[HandlerStorage] Temporal integration {}, not pushing {}",
                self.integration_id, name
            );
            return Ok(());
        }
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

    /// Purge local and remote files plus JSON values, temporal or not
    fn delete(&self) -> Result<()> {
        self.files.delete(true)?;
        self.json.clean(self.json_scope())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SqliteRecordStore;
    use crate::storage::json::SqliteJsonStore;
    use crate::sync::{LocalProvider, LAST_MODIFIED_FILE_NAME};
    use serde_json::json;
    use tempfile::TempDir;

    fn handler(temp: &TempDir, machine: &str, is_temporal: bool) -> Result<HandlerStorage> {
        let records = Arc::new(SqliteRecordStore::open_in_memory()?);
        records.insert_integration(&IntegrationRecord::new(4, "pg", "postgres"))?;
        let files = FileStorage::new(
            &temp.path().join(machine),
            "content",
            ResourceGroup::Integration,
            0,
            4,
            false,
            Arc::new(LocalProvider::new(temp.path().join("remote"))),
        )?;
        Ok(HandlerStorage::new(
            4,
            0,
            is_temporal,
            records,
            Arc::new(SqliteJsonStore::open_in_memory()?),
            files,
        ))
    }

    #[test]
    fn test_connection_args_replaced_wholesale() -> Result<()> {
        let temp = TempDir::new()?;
        let storage = handler(&temp, "a", false)?;
        let first = json!({"host": "db", "port": 5432});
        let second = json!({"user": "admin"});

        storage.update_connection_args(first.as_object().cloned().unwrap())?;
        storage.update_connection_args(second.as_object().cloned().unwrap())?;
        assert_eq!(Value::Object(storage.get_connection_args()?), second);
        Ok(())
    }

    #[test]
    fn test_is_empty_ignores_service_files() -> Result<()> {
        let temp = TempDir::new()?;
        let storage = handler(&temp, "a", false)?;
        assert!(storage.is_empty()?);

        let folder = storage.file_storage().folder_path().to_path_buf();
        fs::write(folder.join(LAST_MODIFIED_FILE_NAME), "2024-01-01T00:00:00Z")?;
        assert!(storage.is_empty()?);

        fs::write(folder.join("data.csv"), "a,b")?;
        assert!(!storage.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_file_set_pushes_unless_temporal() -> Result<()> {
        let temp = TempDir::new()?;
        let persistent = handler(&temp, "a", false)?;
        persistent.file_set("token", b"secret")?;

        let other_machine = handler(&temp, "b", false)?;
        assert_eq!(other_machine.file_get("token")?, Some(b"secret".to_vec()));

        let temporal = handler(&temp, "c", true)?;
        temporal.file_set("scratch", b"tmp")?;
        temporal.folder_sync("")?;
        assert_eq!(other_machine.file_get("scratch")?, None);
        assert_eq!(temporal.file_get("scratch")?, Some(b"tmp".to_vec()));
        Ok(())
    }

    #[test]
    fn test_file_names_are_normalized() -> Result<()> {
        let temp = TempDir::new()?;
        let storage = handler(&temp, "a", false)?;
        storage.file_set("Service Account.json", b"{}")?;

        assert_eq!(storage.file_list()?, vec!["service_account_json"]);
        assert_eq!(
            storage.file_get("service account.JSON")?,
            Some(b"{}".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_export_empty_folder_is_none() -> Result<()> {
        let temp = TempDir::new()?;
        let storage = handler(&temp, "a", false)?;
        assert_eq!(storage.export_files()?, None);
        Ok(())
    }

    #[test]
    fn test_export_import_between_machines() -> Result<()> {
        let temp = TempDir::new()?;
        let source = handler(&temp, "a", true)?;
        let folder = source.folder_get("")?;
        fs::create_dir_all(folder.join("nested"))?;
        fs::write(folder.join("nested").join("model.pkl"), b"pickle")?;
        fs::write(folder.join("notes.txt"), b"notes")?;

        let content = source.export_files()?.expect("non-empty folder");

        let target = handler(&temp, "b", false)?;
        assert_eq!(target.import_files(&content)?, 2);
        let imported = target.folder_get("")?;
        assert_eq!(fs::read(imported.join("nested").join("model.pkl"))?, b"pickle");

        // import publishes, so a third machine sees the files
        let third = handler(&temp, "c", false)?;
        let pulled = third.folder_get("")?;
        assert_eq!(fs::read(pulled.join("notes.txt"))?, b"notes");
        Ok(())
    }

    #[test]
    fn test_delete_keeps_connection_args() -> Result<()> {
        let temp = TempDir::new()?;
        let storage = handler(&temp, "a", false)?;
        storage.update_connection_args(json!({"k": 1}).as_object().cloned().unwrap())?;
        storage.file_set("blob", b"x")?;
        storage.json_set("cursor", &json!(10))?;

        storage.delete()?;
        assert_eq!(storage.file_get("blob")?, None);
        assert_eq!(storage.json_get("cursor")?, None);
        assert_eq!(storage.get_connection_args()?.get("k"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn test_temporal_delete_stays_deleted() -> Result<()> {
        let temp = TempDir::new()?;
        let persistent = handler(&temp, "a", false)?;
        persistent.file_set("token", b"abc")?;

        let temporal = handler(&temp, "b", true)?;
        assert_eq!(temporal.file_get("token")?, Some(b"abc".to_vec()));
        temporal.delete()?;

        assert_eq!(temporal.file_get("token")?, None);
        assert!(temporal.is_empty()?);
        Ok(())
    }
}
