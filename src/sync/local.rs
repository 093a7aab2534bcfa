//! LocalProvider - Keeps the remote side of every folder in another directory.
//!
//! Remote keys map onto paths below `target_path`. Keys containing `.` or
//! `..` segments are refused.

use super::provider::{PullResult, PushResult, SyncProvider};
use super::DIR_LOCK_FILE_NAME;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Local file system provider.
/// Keeps the remote side in another local directory (e.g., shared mount, backup folder).
pub struct LocalProvider {
    target_path: PathBuf,
}

/// Files copied by one pull/push.
#[derive(Debug, Default)]
struct CopyStats {
    new_files: usize,
    updated_files: usize,
}

impl CopyStats {
    fn total(&self) -> usize {
        self.new_files + self.updated_files
    }
}

impl LocalProvider {
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
        }
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Resolve a `/`-separated remote key below the target directory
    fn remote_path(&self, remote_key: &str) -> Result<PathBuf> {
        let mut path = self.target_path.clone();
        for part in remote_key.split(['/', '\\']).filter(|part| !part.is_empty()) {
            if part == "." || part == ".." {
                bail!("Remote key {:?} escapes {:?}", remote_key, self.target_path);
            }
            path.push(part);
        }
        Ok(path)
    }

    /// Copy a single file if it is new or changed
    fn copy_file(src: &Path, dst: &Path, stats: &mut CopyStats) -> Result<()> {
        // Only copy if modified time differs or size differs
        let exists = dst.exists();
        let should_copy = if exists {
            let src_meta = fs::metadata(src)?;
            let dst_meta = fs::metadata(dst)?;
            src_meta.len() != dst_meta.len() || src_meta.modified()? > dst_meta.modified()?
        } else {
            true
        };

        if should_copy {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(src, dst).with_context(|| format!("Cannot copy {:?} to {:?}", src, dst))?;
            if exists {
                stats.updated_files += 1;
            } else {
                stats.new_files += 1;
            }
        }
        Ok(())
    }

    /// Recursive copy helper. The sync lock marker never leaves its folder.
    fn copy_dir_all(src: &Path, dst: &Path, stats: &mut CopyStats) -> Result<()> {
        if !dst.exists() {
            fs::create_dir_all(dst)?;
        }

        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let ty = entry.file_type()?;
            let dst_path = dst.join(entry.file_name());

            if ty.is_dir() {
                Self::copy_dir_all(&entry.path(), &dst_path, stats)?;
            } else if entry.file_name() != DIR_LOCK_FILE_NAME {
                Self::copy_file(&entry.path(), &dst_path, stats)?;
            }
        }
        Ok(())
    }

    fn copy_tree(src: &Path, dst: &Path) -> Result<CopyStats> {
        let mut stats = CopyStats::default();
        if src.is_dir() {
            Self::copy_dir_all(src, dst, &mut stats)?;
        } else {
            Self::copy_file(src, dst, &mut stats)?;
        }
        Ok(stats)
    }

    /// Check for differences between directories
    fn check_diff(src: &Path, dst: &Path) -> Result<bool> {
        if !dst.exists() {
            return Ok(true);
        }

        if src.is_file() {
            let src_meta = fs::metadata(src)?;
            let dst_meta = fs::metadata(dst)?;
            return Ok(
                src_meta.len() != dst_meta.len() || src_meta.modified()? > dst_meta.modified()?
            );
        }

        for entry in fs::read_dir(src)? {
            let entry = entry?;
            if entry.file_name() == DIR_LOCK_FILE_NAME {
                continue;
            }
            let dst_path = dst.join(entry.file_name());
            if Self::check_diff(&entry.path(), &dst_path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl SyncProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn pull(&self, local_path: &Path, remote_key: &str) -> Result<PullResult> {
        let src = self.remote_path(remote_key)?;
        if !src.exists() {
            debug!("[Local] Nothing to pull for {}", remote_key);
            return Ok(PullResult::default());
        }

        info!("[Local] Pulling from {:?} to {:?}", src, local_path);
        let stats = Self::copy_tree(&src, local_path)?;

        Ok(PullResult {
            has_changes: stats.total() > 0,
            new_files: stats.new_files,
            updated_files: stats.updated_files,
        })
    }

    fn push(&self, local_path: &Path, remote_key: &str) -> Result<PushResult> {
        if !local_path.exists() {
            return Ok(PushResult {
                success: true,
                files_pushed: 0,
                message: Some(format!("Nothing to push at {:?}", local_path)),
            });
        }

        let dst = self.remote_path(remote_key)?;
        info!("[Local] Pushing from {:?} to {:?}", local_path, dst);
        let stats = Self::copy_tree(local_path, &dst)?;

        Ok(PushResult {
            success: true,
            files_pushed: stats.total(),
            message: Some(format!("Synced to {:?}", dst)),
        })
    }

    fn delete(&self, remote_key: &str) -> Result<()> {
        let path = self.remote_path(remote_key)?;
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Cannot remove remote folder {:?}", path))?;
        } else if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Cannot remove remote file {:?}", path))?;
        }
        debug!("[Local] Deleted {}", remote_key);
        Ok(())
    }

    fn has_local_changes(&self, local_path: &Path, remote_key: &str) -> Result<bool> {
        if !local_path.exists() {
            return Ok(false);
        }
        Self::check_diff(local_path, &self.remote_path(remote_key)?)
    }
}
