//! Inventory records: one row per compatibility prefix.

use crate::size::{format_size, SizeCache};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Placeholder for an install path or size that is not known.
pub const UNKNOWN: &str = "-";

/// Display name given to prefixes that no manifest or shortcut claims.
pub const ORPHAN_NAME: &str = "ORPHAN PREFIX";

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefixKind {
    /// Found through an `appmanifest_*.acf` file.
    #[serde(rename = "Steam")]
    Installed,
    /// Found in the binary shortcuts database.
    #[serde(rename = "Non-Steam")]
    ExternalShortcut,
    /// A numeric `compatdata` directory nothing else claims.
    Orphan,
    /// Synthetic row describing an empty inventory.
    Debug,
    /// Synthetic row describing a failed inventory pass.
    Error,
}

impl PrefixKind {
    pub fn label(&self) -> &'static str {
        match self {
            PrefixKind::Installed => "Steam",
            PrefixKind::ExternalShortcut => "Non-Steam",
            PrefixKind::Orphan => "Orphan",
            PrefixKind::Debug => "Debug",
            PrefixKind::Error => "Error",
        }
    }

    /// Only rows backed by a real prefix directory may be deleted.
    pub fn is_erasable(&self) -> bool {
        matches!(
            self,
            PrefixKind::Installed | PrefixKind::ExternalShortcut | PrefixKind::Orphan
        )
    }
}

impl fmt::Display for PrefixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of what sits at a prefix path, taken without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixState {
    #[serde(rename = "Deleted")]
    Missing,
    #[serde(rename = "Symlink")]
    SymlinkPresent,
    #[serde(rename = "Folder")]
    DirectoryPresent,
}

impl PrefixState {
    pub fn probe(path: &Path) -> Self {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => PrefixState::SymlinkPresent,
            Ok(_) => PrefixState::DirectoryPresent,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!("Treating {:?} as missing: {}", path, e);
                }
                PrefixState::Missing
            }
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, PrefixState::Missing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrefixState::Missing => "Deleted",
            PrefixState::SymlinkPresent => "Symlink",
            PrefixState::DirectoryPresent => "Folder",
        }
    }
}

impl fmt::Display for PrefixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefixRecord {
    pub name: String,
    pub app_id: String,
    pub kind: PrefixKind,
    pub prefix_path: PathBuf,
    pub prefix_state: PrefixState,
    /// Replaces the state label on synthetic rows.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status_note: Option<String>,
    pub size_bytes: u64,
    pub size_display: String,
    pub install_path: String,
}

impl PrefixRecord {
    /// Builds a record for a real prefix, probing the path and sizing it
    /// only when something is there.
    pub fn probe(
        name: impl Into<String>,
        app_id: impl Into<String>,
        kind: PrefixKind,
        prefix_path: PathBuf,
        install_path: impl Into<String>,
        sizes: &mut SizeCache,
    ) -> Self {
        let prefix_state = PrefixState::probe(&prefix_path);
        let (size_bytes, size_display) = if prefix_state.exists() {
            let bytes = sizes.compute(&prefix_path);
            (bytes, format_size(bytes))
        } else {
            (0, UNKNOWN.to_string())
        };

        Self {
            name: name.into(),
            app_id: app_id.into(),
            kind,
            prefix_path,
            prefix_state,
            status_note: None,
            size_bytes,
            size_display,
            install_path: install_path.into(),
        }
    }

    /// Row shown when a pass succeeds but finds nothing at all.
    pub fn debug_empty(steam_root: &Path) -> Self {
        Self {
            name: "DEBUG INFO (No Games)".to_string(),
            app_id: "000000".to_string(),
            kind: PrefixKind::Debug,
            prefix_path: PathBuf::from(format!("Checked: {}", steam_root.display())),
            prefix_state: PrefixState::Missing,
            status_note: Some(format!("Exists: {}", steam_root.exists())),
            size_bytes: 0,
            size_display: "0 B".to_string(),
            install_path: UNKNOWN.to_string(),
        }
    }

    /// Row shown in place of the inventory when a pass fails.
    pub fn scan_failure(message: &str, log_path: &Path) -> Self {
        Self {
            name: format!("ERROR: {}", message),
            app_id: "ERR".to_string(),
            kind: PrefixKind::Error,
            prefix_path: log_path.to_path_buf(),
            prefix_state: PrefixState::Missing,
            status_note: Some("Check Log".to_string()),
            size_bytes: 0,
            size_display: "0 B".to_string(),
            install_path: UNKNOWN.to_string(),
        }
    }

    /// Status column text: the note on synthetic rows, the state otherwise.
    pub fn status_label(&self) -> &str {
        self.status_note
            .as_deref()
            .unwrap_or_else(|| self.prefix_state.label())
    }

    /// Case-insensitive match of `query` against name followed by app id.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let haystack = format!("{}{}", self.name, self.app_id).to_lowercase();
        haystack.contains(&query.to_lowercase())
    }
}

/// Column an inventory can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    AppId,
    Kind,
    State,
    Size,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "appid" | "app-id" | "id" => Ok(SortKey::AppId),
            "kind" | "type" => Ok(SortKey::Kind),
            "state" | "status" => Ok(SortKey::State),
            "size" => Ok(SortKey::Size),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Stable sort of inventory rows by one column.
pub fn sort_records(records: &mut [PrefixRecord], key: SortKey, descending: bool) {
    records.sort_by(|a, b| {
        let ordering = compare_by(a, b, key);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_by(a: &PrefixRecord, b: &PrefixRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        // Numeric ids sort numerically; anything else falls back to text.
        SortKey::AppId => match (a.app_id.parse::<u64>(), b.app_id.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.app_id.cmp(&b.app_id),
        },
        SortKey::Kind => a.kind.label().cmp(b.kind.label()),
        SortKey::State => a.status_label().cmp(b.status_label()),
        SortKey::Size => a.size_bytes.cmp(&b.size_bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, app_id: &str, size_bytes: u64) -> PrefixRecord {
        PrefixRecord {
            name: name.to_string(),
            app_id: app_id.to_string(),
            kind: PrefixKind::Installed,
            prefix_path: PathBuf::from(format!("/lib/steamapps/compatdata/{}", app_id)),
            prefix_state: PrefixState::DirectoryPresent,
            status_note: None,
            size_bytes,
            size_display: format_size(size_bytes),
            install_path: UNKNOWN.to_string(),
        }
    }

    #[test]
    fn probe_reports_missing_path() {
        let mut sizes = SizeCache::new();
        let record = PrefixRecord::probe(
            "Gone",
            "1",
            PrefixKind::Installed,
            PathBuf::from("/definitely/not/here/compatdata/1"),
            UNKNOWN,
            &mut sizes,
        );
        assert_eq!(record.prefix_state, PrefixState::Missing);
        assert_eq!(record.size_bytes, 0);
        assert_eq!(record.size_display, "-");
        assert_eq!(record.status_label(), "Deleted");
    }

    #[test]
    fn matches_name_and_app_id_case_insensitively() {
        let record = row("Half-Life 2", "220", 0);
        assert!(record.matches("half"));
        assert!(record.matches("220"));
        assert!(record.matches("LIFE 2220"));
        assert!(record.matches(""));
        assert!(!record.matches("portal"));
    }

    #[test]
    fn sorts_ids_numerically_and_sizes_descending() {
        let mut records = vec![row("b", "100", 5), row("a", "20", 50), row("c", "3", 1)];

        sort_records(&mut records, SortKey::AppId, false);
        let ids: Vec<_> = records.iter().map(|r| r.app_id.as_str()).collect();
        assert_eq!(ids, ["3", "20", "100"]);

        sort_records(&mut records, SortKey::Size, true);
        let ids: Vec<_> = records.iter().map(|r| r.app_id.as_str()).collect();
        assert_eq!(ids, ["20", "100", "3"]);
    }

    #[test]
    fn synthetic_rows_are_not_erasable() {
        let failure = PrefixRecord::scan_failure("boom", Path::new("/tmp/err.log"));
        assert_eq!(failure.status_label(), "Check Log");
        assert!(!failure.kind.is_erasable());
        assert!(PrefixKind::Orphan.is_erasable());
    }

    #[test]
    fn serializes_with_camel_case_fields_and_labels() {
        let json = serde_json::to_value(row("Foo", "42", 0)).unwrap();
        assert_eq!(json["appId"], "42");
        assert_eq!(json["kind"], "Steam");
        assert_eq!(json["prefixState"], "Folder");
        assert!(json.get("statusNote").is_none());
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!("Size".parse::<SortKey>(), Ok(SortKey::Size));
        assert_eq!("appid".parse::<SortKey>(), Ok(SortKey::AppId));
        assert!("colour".parse::<SortKey>().is_err());
    }
}
