//! FileStorage - Local cache directory of one resource, backed by a sync provider.
//!
//! Layout: `<storage_dir>/<root_dir>/<group>_<company_id>_<resource_id>`.
//! The same relative path is used as remote key on the provider.
//!
//! With `sync = true`, reads pull before and writes push after; otherwise the
//! caller decides when to call `pull_path` / `push_path`.

use super::ResourceGroup;
use crate::error::{Result, StorageError};
use crate::sync::markers::{touch_last_modified, SyncLock};
use crate::sync::{is_service_file, PullResult, PushResult, SyncProvider, LAST_MODIFIED_FILE_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Components of a `/`-separated name below the folder root.
/// `.` and `..` are rejected so a name never leaves the resource folder.
fn name_parts(name: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = name
        .split(['/', '\\'])
        .filter(|part| !part.is_empty())
        .collect();
    if parts.iter().any(|part| *part == "." || *part == "..") {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(parts)
}

pub struct FileStorage {
    root_dir: String,
    folder_name: String,
    folder_path: PathBuf,
    sync: bool,
    provider: Arc<dyn SyncProvider>,
}

impl FileStorage {
    pub fn new(
        storage_dir: &Path,
        root_dir: &str,
        resource_group: ResourceGroup,
        company_id: i64,
        resource_id: i64,
        sync: bool,
        provider: Arc<dyn SyncProvider>,
    ) -> Result<Self> {
        let folder_name = format!("{}_{}_{}", resource_group, company_id, resource_id);
        let folder_path = storage_dir.join(root_dir).join(&folder_name);
        fs::create_dir_all(&folder_path)?;

        Ok(Self {
            root_dir: root_dir.trim_matches('/').to_string(),
            folder_name,
            folder_path,
            sync,
            provider,
        })
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Local root of this resource
    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// Remote key of `name` (empty name = whole folder)
    fn remote_key(&self, name: &str) -> Result<String> {
        let mut key = if self.root_dir.is_empty() {
            self.folder_name.clone()
        } else {
            format!("{}/{}", self.root_dir, self.folder_name)
        };
        for part in name_parts(name)? {
            key.push('/');
            key.push_str(part);
        }
        Ok(key)
    }

    /// Local path of `name` below the folder root
    fn local_path(&self, name: &str) -> Result<PathBuf> {
        Ok(name_parts(name)?
            .into_iter()
            .fold(self.folder_path.clone(), |path, part| path.join(part)))
    }

    /// Copy `name` from the provider into the local folder
    pub fn pull_path(&self, name: &str) -> Result<PullResult> {
        let local = self.local_path(name)?;
        let key = self.remote_key(name)?;
        let _lock = SyncLock::acquire(&self.folder_path)?;

        let result = self.provider.pull(&local, &key)?;
        if result.has_changes {
            debug!(
                "[FileStorage] Pulled {} new / {} updated file(s) into {}/{}",
                result.new_files, result.updated_files, self.folder_name, name
            );
        }
        Ok(result)
    }

    /// Copy `name` from the local folder to the provider.
    /// Skipped when the provider already holds the same content.
    pub fn push_path(&self, name: &str) -> Result<PushResult> {
        let local = self.local_path(name)?;
        let key = self.remote_key(name)?;
        let _lock = SyncLock::acquire(&self.folder_path)?;

        if !self.provider.has_local_changes(&local, &key)? {
            debug!(
                "[FileStorage] {}/{} is up to date, nothing to push",
                self.folder_name, name
            );
            return Ok(PushResult {
                success: true,
                files_pushed: 0,
                message: Some("Already up to date".to_string()),
            });
        }

        touch_last_modified(&self.folder_path)?;
        let result = self.provider.push(&local, &key)?;
        if !result.success {
            return Err(StorageError::Sync(anyhow::anyhow!(
                "Push of {}/{} via {} failed: {}",
                self.folder_name,
                name,
                self.provider.name(),
                result.message.as_deref().unwrap_or("no details")
            )));
        }
        if local != self.folder_path {
            self.provider.push(
                &self.folder_path.join(LAST_MODIFIED_FILE_NAME),
                &self.remote_key(LAST_MODIFIED_FILE_NAME)?,
            )?;
        }

        info!(
            "[FileStorage] Pushed {} file(s) from {}/{} via {}",
            result.files_pushed,
            self.folder_name,
            name,
            self.provider.name()
        );
        if let Some(message) = &result.message {
            debug!("[FileStorage] {}", message);
        }
        Ok(result)
    }

    /// Pull the whole folder
    pub fn pull(&self) -> Result<PullResult> {
        self.pull_path("")
    }

    /// Push the whole folder
    pub fn push(&self) -> Result<PushResult> {
        self.push_path("")
    }

    /// Local path of `name`, created as a directory if nothing exists there
    pub fn get_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.local_path(name)?;
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    /// Read a file. `None` if it does not exist.
    pub fn file_get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.sync {
            self.pull_path(name)?;
        }
        let path = self.local_path(name)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    /// Write a file, creating parent folders
    pub fn file_set(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = self.local_path(name)?;
        if path == self.folder_path {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        if self.sync {
            self.push_path(name)?;
        }
        Ok(())
    }

    /// Top-level entries of the local folder, service files excluded, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.folder_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.folder_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type()?.is_file() && is_service_file(&name) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Remove one file or subfolder locally and, if asked, from the provider
    pub fn delete_path(&self, name: &str, include_remote: bool) -> Result<()> {
        let path = self.local_path(name)?;
        if path == self.folder_path {
            return self.delete(include_remote);
        }
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        }
        if include_remote {
            self.provider.delete(&self.remote_key(name)?)?;
        }
        debug!("[FileStorage] Deleted {}/{}", self.folder_name, name);
        Ok(())
    }

    /// Remove the whole folder locally and, if asked, from the provider
    pub fn delete(&self, include_remote: bool) -> Result<()> {
        if self.folder_path.exists() {
            fs::remove_dir_all(&self.folder_path)?;
        }
        if include_remote {
            self.provider.delete(&self.remote_key("")?)?;
        }
        info!("[FileStorage] Deleted folder {}", self.folder_name);
        Ok(())
    }
}
