//! Directory sizing with a per-pass cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Memoizes directory sizes for the lifetime of one inventory pass.
#[derive(Debug, Default)]
pub struct SizeCache {
    sizes: HashMap<PathBuf, u64>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes of regular files under `path`. Returns the cached value
    /// when this path was already walked since the last `clear`.
    pub fn compute(&mut self, path: &Path) -> u64 {
        if let Some(&total) = self.sizes.get(path) {
            return total;
        }
        let total = walk_size(path);
        self.sizes.insert(path.to_path_buf(), total);
        total
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Best-effort sum: entries that vanish or fail mid-walk are skipped, and a
/// root that cannot be read yields 0.
fn walk_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping entry while sizing {:?}: {}", root, e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Renders a byte count with binary-prefix units and one decimal place.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} {}", value, UNITS[UNITS.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn formats_binary_units() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(1023), "1023.0 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1 << 40), "1.0 TB");
        assert_eq!(format_size(1 << 50), "1024.0 TB");
    }

    #[test]
    fn sums_files_and_serves_cached_value_until_cleared() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("drive_c")).unwrap();
        fs::write(tmp.path().join("a.bin"), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("drive_c/b.bin"), vec![0u8; 200]).unwrap();

        let mut sizes = SizeCache::new();
        assert_eq!(sizes.compute(tmp.path()), 300);

        fs::write(tmp.path().join("c.bin"), vec![0u8; 50]).unwrap();
        assert_eq!(sizes.compute(tmp.path()), 300);

        sizes.clear();
        assert!(sizes.is_empty());
        assert_eq!(sizes.compute(tmp.path()), 350);
    }

    #[test]
    fn missing_root_is_zero() {
        let mut sizes = SizeCache::new();
        assert_eq!(sizes.compute(Path::new("/no/such/prefix/anywhere")), 0);
        assert_eq!(sizes.len(), 1);
    }
}
