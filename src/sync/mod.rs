//! Sync module - Move resource folders between local cache and durable storage.
//!
//! This module contains:
//! - SyncProvider trait for abstraction
//! - Local provider (remote side kept in another directory)
//! - Service files (lock marker, last push time) written by the file backend

pub mod local;
pub mod markers;
pub mod provider;

pub use local::LocalProvider;
pub use markers::SyncLock;
pub use provider::{PullResult, PushResult, SyncProvider};

/// Marker present while a pull/push runs
pub const DIR_LOCK_FILE_NAME: &str = "dir.lock";

/// Time of the last push
pub const LAST_MODIFIED_FILE_NAME: &str = "last_modified.txt";

/// Reserved file names. Hidden from emptiness checks and archives.
pub const SERVICE_FILES_NAMES: [&str; 2] = [DIR_LOCK_FILE_NAME, LAST_MODIFIED_FILE_NAME];

pub fn is_service_file(name: &str) -> bool {
    SERVICE_FILES_NAMES.contains(&name)
}
