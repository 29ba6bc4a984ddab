//! Installed-game discovery and orphaned prefix detection.
//!
//! Installed games come from `appmanifest_*.acf` files under each library's
//! `steamapps` directory. Every numeric directory under a library's
//! `steamapps/compatdata` that no manifest or shortcut claims is an orphan.
//!
//! # Manifest format
//!
//! Manifests are Valve KeyValues text. Only three keys are read, each by the
//! first `"key" "value"` pair found anywhere in the file:
//! - `name` - display name (required)
//! - `appid` - decimal app id (required)
//! - `installdir` - folder under `steamapps/common` (optional)

use crate::config::compatdata_dir;
use crate::error::ScanOutcome;
use crate::prefix::{PrefixKind, PrefixRecord, ORPHAN_NAME, UNKNOWN};
use crate::size::SizeCache;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

const MANIFEST_GLOB: &str = "appmanifest_*.acf";

struct ManifestPatterns {
    name: Regex,
    appid: Regex,
    installdir: Regex,
}

fn patterns() -> &'static ManifestPatterns {
    static PATTERNS: OnceLock<ManifestPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ManifestPatterns {
        name: Regex::new(r#""name"\s+"([^"]+)""#).expect("name pattern is valid"),
        appid: Regex::new(r#""appid"\s+"(\d+)""#).expect("appid pattern is valid"),
        installdir: Regex::new(r#""installdir"\s+"([^"]+)""#).expect("installdir pattern is valid"),
    })
}

/// The fields of an app manifest the inventory needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppManifest {
    pub name: String,
    pub app_id: String,
    pub install_dir: Option<String>,
}

/// Extracts `name`, `appid` and `installdir`. A manifest lacking either of
/// the first two is skipped.
pub fn parse_app_manifest(text: &str) -> ScanOutcome<AppManifest> {
    let patterns = patterns();
    let first = |re: &Regex| re.captures(text).map(|caps| caps[1].to_string());

    let Some(name) = first(&patterns.name) else {
        return ScanOutcome::Skipped("missing \"name\"".to_string());
    };
    let Some(app_id) = first(&patterns.appid) else {
        return ScanOutcome::Skipped("missing \"appid\"".to_string());
    };

    ScanOutcome::Parsed(AppManifest {
        name,
        app_id,
        install_dir: first(&patterns.installdir),
    })
}

/// Scans every library root for app manifests and returns one record per
/// installed game. Unreadable or incomplete manifests are logged and skipped.
pub fn scan_installed(roots: &[PathBuf], sizes: &mut SizeCache) -> Result<Vec<PrefixRecord>> {
    let mut installed = Vec::new();

    for root in roots {
        let steamapps = root.join("steamapps");
        for manifest_path in list_manifests(&steamapps)? {
            match read_manifest(&manifest_path) {
                Ok(ScanOutcome::Parsed(manifest)) => {
                    installed.push(installed_record(root, manifest, sizes));
                }
                Ok(ScanOutcome::Skipped(reason)) => {
                    debug!("Skipping manifest {:?}: {}", manifest_path, reason);
                }
                Err(e) => {
                    warn!("Error parsing manifest {:?}: {:#}", manifest_path, e);
                }
            }
        }
    }

    Ok(installed)
}

fn list_manifests(steamapps: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&steamapps.to_string_lossy()),
        MANIFEST_GLOB
    );
    let paths = glob::glob(&pattern)
        .context(format!("Invalid manifest pattern: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Skipping unreadable manifest entry: {}", e);
                None
            }
        })
        .collect();
    Ok(paths)
}

fn read_manifest(path: &Path) -> Result<ScanOutcome<AppManifest>> {
    let bytes = fs::read(path).context(format!("Failed to read manifest: {:?}", path))?;
    Ok(parse_app_manifest(&String::from_utf8_lossy(&bytes)))
}

fn installed_record(root: &Path, manifest: AppManifest, sizes: &mut SizeCache) -> PrefixRecord {
    let install_path = match &manifest.install_dir {
        Some(dir) => root
            .join("steamapps")
            .join("common")
            .join(dir)
            .to_string_lossy()
            .to_string(),
        None => UNKNOWN.to_string(),
    };
    let prefix_path = compatdata_dir(root).join(&manifest.app_id);

    PrefixRecord::probe(
        manifest.name,
        manifest.app_id,
        PrefixKind::Installed,
        prefix_path,
        install_path,
        sizes,
    )
}

/// Finds numeric `compatdata` entries whose id is not in `known_ids`.
///
/// A library without a `compatdata` directory is skipped. Entries that
/// disappear between listing and inspection are skipped too. Any other
/// failure to list a `compatdata` directory is returned as an error.
pub fn find_orphans(
    roots: &[PathBuf],
    known_ids: &HashSet<String>,
    sizes: &mut SizeCache,
) -> Result<Vec<PrefixRecord>> {
    let mut orphaned = Vec::new();

    for root in roots {
        let compat = compatdata_dir(root);
        let entries = match fs::read_dir(&compat) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e).context(format!("Failed to read directory: {:?}", compat));
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping entry in {:?}: {}", compat, e);
                    continue;
                }
            };
            let Some(folder) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_app_id(&folder) || known_ids.contains(&folder) {
                continue;
            }

            let record = PrefixRecord::probe(
                ORPHAN_NAME,
                folder,
                PrefixKind::Orphan,
                entry.path(),
                UNKNOWN,
                sizes,
            );
            if record.prefix_state.exists() {
                orphaned.push(record);
            } else {
                debug!("Orphan candidate {:?} vanished", record.prefix_path);
            }
        }
    }

    Ok(orphaned)
}

fn is_app_id(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest_fields_in_any_order() {
        let acf = r#"
"AppState"
{
	"installdir"		"Half-Life 2"
	"appid"		"220"
	"name"		"Half-Life 2"
	"StateFlags"		"4"
}
"#;
        assert_eq!(
            parse_app_manifest(acf),
            ScanOutcome::Parsed(AppManifest {
                name: "Half-Life 2".to_string(),
                app_id: "220".to_string(),
                install_dir: Some("Half-Life 2".to_string()),
            })
        );
    }

    #[test]
    fn first_match_wins() {
        let acf = "\"appid\" \"10\"\n\"name\" \"First\"\n\"name\" \"Second\"\n\"appid\" \"20\"\n";
        match parse_app_manifest(acf) {
            ScanOutcome::Parsed(m) => {
                assert_eq!(m.name, "First");
                assert_eq!(m.app_id, "10");
                assert_eq!(m.install_dir, None);
            }
            other => panic!("expected parsed manifest, got {:?}", other),
        }
    }

    #[test]
    fn skips_manifest_without_numeric_appid() {
        let acf = "\"name\" \"Tool\"\n\"appid\" \"abc\"\n";
        assert!(matches!(parse_app_manifest(acf), ScanOutcome::Skipped(_)));
        assert!(matches!(
            parse_app_manifest("\"appid\" \"5\""),
            ScanOutcome::Skipped(_)
        ));
    }

    #[test]
    fn app_ids_are_ascii_digits() {
        assert!(is_app_id("1091500"));
        assert!(!is_app_id(""));
        assert!(!is_app_id("pfx"));
        assert!(!is_app_id("12a"));
    }
}
