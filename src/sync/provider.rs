//! SyncProvider trait - Abstraction for the durable remote side of a folder.
//!
//! A provider moves a named subtree between a local path and a remote key
//! (`content/predictor_0_7/model`). Keys always use `/` as separator.

use anyhow::Result;
use std::path::Path;

/// Result of a pull operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullResult {
    /// Whether changes were pulled
    pub has_changes: bool,
    /// Number of new files
    pub new_files: usize,
    /// Number of updated files
    pub updated_files: usize,
}

/// Result of a push operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushResult {
    /// Whether push was successful
    pub success: bool,
    /// Number of files pushed
    pub files_pushed: usize,
    /// Message (if any)
    pub message: Option<String>,
}

/// Trait for all sync providers.
///
/// Each provider implements this trait to give the file backend
/// durable storage behind its local cache directory.
pub trait SyncProvider: Send + Sync {
    /// Provider name (local, s3, ...)
    fn name(&self) -> &'static str;

    /// Copy `remote_key` from remote into `local_path`. A missing remote key
    /// is not an error; nothing is pulled.
    fn pull(&self, local_path: &Path, remote_key: &str) -> Result<PullResult>;

    /// Copy `local_path` to `remote_key` on the remote
    fn push(&self, local_path: &Path, remote_key: &str) -> Result<PushResult>;

    /// Remove `remote_key` (file or subtree) from the remote
    fn delete(&self, remote_key: &str) -> Result<()>;

    /// Check if `local_path` has changes not yet pushed to `remote_key`
    fn has_local_changes(&self, local_path: &Path, remote_key: &str) -> Result<bool>;
}
