//! Prefix management operations (backup and removal).
//!
//! - Backup: zip the prefix tree into the backup directory, one archive per
//!   prefix named after the prefix directory
//! - Removal: unlink symlinked prefixes, recursively delete real ones

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive path for a prefix: `<backup_dir>/<basename>.zip`.
pub fn archive_path(prefix: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let base = prefix
        .file_name()
        .context(format!("Invalid prefix path: {:?}", prefix))?;
    Ok(backup_dir.join(format!("{}.zip", base.to_string_lossy())))
}

/// Zips the prefix tree into `backup_dir`, replacing an older archive of the
/// same name. A symlinked prefix archives the contents of its target.
///
/// Returns `None` without touching `backup_dir` if the prefix (or its link
/// target) is already gone.
pub fn backup_prefix(prefix: &Path, backup_dir: &Path) -> Result<Option<PathBuf>> {
    if !prefix.exists() {
        debug!("Prefix {:?} vanished before backup, skipping archive", prefix);
        return Ok(None);
    }

    let archive = archive_path(prefix, backup_dir)?;
    fs::create_dir_all(backup_dir)
        .context(format!("Failed to create backup directory: {:?}", backup_dir))?;

    let file = File::create(&archive)
        .context(format!("Failed to create archive: {:?}", archive))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(prefix).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping path during archive of {:?}: {}", prefix, e);
                continue;
            }
        };
        let rel = entry
            .path()
            .strip_prefix(prefix)
            .context("Failed to relativize archive entry")?;
        let name = archive_entry_name(rel);

        // Links inside the tree are stored as what they point to; dangling
        // ones are dropped.
        let meta = match fs::metadata(entry.path()) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Skipping {:?} during archive: {}", entry.path(), e);
                continue;
            }
        };

        if meta.is_dir() {
            zip.add_directory(name, options)
                .context(format!("Failed to add directory {:?} to archive", rel))?;
        } else if meta.is_file() {
            let mut source = match File::open(entry.path()) {
                Ok(source) => source,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(e).context(format!("Failed to open {:?}", entry.path()));
                }
            };
            zip.start_file(name, options)
                .context(format!("Failed to add file {:?} to archive", rel))?;
            io::copy(&mut source, &mut zip)
                .context(format!("Failed to compress {:?}", entry.path()))?;
        }
    }

    zip.finish()
        .context(format!("Failed to finalize archive: {:?}", archive))?;
    info!("Backed up {:?} to {:?}", prefix, archive);

    Ok(Some(archive))
}

fn archive_entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Removes a prefix. A symlink is unlinked without touching its target;
/// anything else is deleted recursively.
pub fn remove_prefix(prefix: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(prefix)
        .context(format!("Failed to inspect prefix: {:?}", prefix))?;

    if meta.file_type().is_symlink() {
        fs::remove_file(prefix).context(format!("Failed to remove symlink: {:?}", prefix))?;
    } else if meta.is_dir() {
        fs::remove_dir_all(prefix)
            .context(format!("Failed to remove directory: {:?}", prefix))?;
    } else {
        fs::remove_file(prefix).context(format!("Failed to remove file: {:?}", prefix))?;
    }

    info!("Removed prefix {:?}", prefix);
    Ok(())
}
