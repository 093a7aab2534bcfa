//! Service files written into a resource folder by the file backend.
//!
//! - `dir.lock`: present while a pull/push runs, content `timestamp:host:pid`
//! - `last_modified.txt`: RFC 3339 time of the last push
//!
//! The lock is advisory. A fresh lock owned by another process is reported
//! and then taken over.

use super::{DIR_LOCK_FILE_NAME, LAST_MODIFIED_FILE_NAME};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lock expires after 60 seconds
const LOCK_TIMEOUT_SECS: i64 = 60;

/// Unique owner id of this process (hostname + pid)
fn owner_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}:{}", hostname, std::process::id())
}

/// Sync-in-progress marker, removed on drop.
#[derive(Debug)]
pub struct SyncLock {
    path: PathBuf,
}

impl SyncLock {
    pub fn acquire(folder: &Path) -> Result<Self> {
        let path = folder.join(DIR_LOCK_FILE_NAME);
        let now = Utc::now().timestamp();
        let me = owner_id();

        if let Ok(content) = fs::read_to_string(&path) {
            if let Some((ts, owner)) = content.split_once(':') {
                if let Ok(lock_time) = ts.parse::<i64>() {
                    if now - lock_time < LOCK_TIMEOUT_SECS && owner != me {
                        warn!(
                            "[SyncLock] {:?} held by {} ({}s ago), taking over",
                            folder,
                            owner,
                            now - lock_time
                        );
                    }
                }
            }
        }

        fs::create_dir_all(folder)?;
        fs::write(&path, format!("{}:{}", now, me))
            .with_context(|| format!("Cannot write lock file {:?}", path))?;
        debug!("[SyncLock] Lock acquired on {:?}", folder);
        Ok(Self { path })
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Record the time of a push in the folder root
pub fn touch_last_modified(folder: &Path) -> Result<DateTime<Utc>> {
    let now = Utc::now();
    fs::create_dir_all(folder)?;
    fs::write(folder.join(LAST_MODIFIED_FILE_NAME), now.to_rfc3339())?;
    Ok(now)
}

/// Time of the last push seen by this folder, if any
pub fn read_last_modified(folder: &Path) -> Option<DateTime<Utc>> {
    let content = fs::read_to_string(folder.join(LAST_MODIFIED_FILE_NAME)).ok()?;
    DateTime::parse_from_rfc3339(content.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
