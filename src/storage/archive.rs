//! Zip bundling of a resource folder for export/import.
//!
//! Entries are deflate-compressed, named by their `/`-separated path relative
//! to the folder root. Service files are never packed nor unpacked.

use crate::error::Result;
use crate::sync::is_service_file;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Collect every non-service file below `dir`, recursively
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else if !is_service_file(&entry.file_name().to_string_lossy()) {
            out.push(path);
        }
    }
    Ok(())
}

/// Archive entry name of `path` relative to `root`
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Pack every non-service file below `root` into an in-memory zip
pub fn pack_folder(root: &Path) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let Some(name) = entry_name(root, path) else {
            continue;
        };
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(path)?)?;
    }

    let cursor = zip.finish()?;
    debug!("[Archive] Packed {} file(s) from {:?}", files.len(), root);
    Ok(cursor.into_inner())
}

/// Extract a zip into `root`, overwriting existing files.
/// Returns the number of files written.
pub fn unpack_into(content: &[u8], root: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(content))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("[Archive] Skipping entry outside folder: {}", entry.name());
            continue;
        };
        let outpath = root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        let is_service = outpath
            .file_name()
            .map(|n| is_service_file(&n.to_string_lossy()))
            .unwrap_or(false);
        if is_service {
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)?;
        std::io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }

    debug!("[Archive] Unpacked {} file(s) into {:?}", written, root);
    Ok(written)
}
