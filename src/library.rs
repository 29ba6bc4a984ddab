//! Steam library discovery.

use crate::config::DepotConfig;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn library_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\d+"\s+"([^"]+)""#).expect("library entry pattern is valid"))
}

/// Returns every library root that may hold a `steamapps` tree, in order of
/// discovery: the primary install, mounted removable media, then extra
/// folders from `libraryfolders.vdf`. Never fails; unreadable sources are
/// skipped.
pub fn discover_roots(config: &DepotConfig) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if config.steam_root.exists() {
        roots.push(config.steam_root.clone());
    } else {
        debug!("Primary Steam root {:?} not found", config.steam_root);
    }

    if config.media_root.exists() {
        match fs::read_dir(&config.media_root) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        roots.push(path);
                    }
                }
            }
            Err(e) => warn!("Failed to list media root {:?}: {}", config.media_root, e),
        }
    }

    let lib_file = config.library_folders_file();
    match fs::read(&lib_file) {
        Ok(bytes) => {
            for path in parse_library_folders(&String::from_utf8_lossy(&bytes)) {
                if path.exists() && !roots.contains(&path) {
                    roots.push(path);
                }
            }
        }
        Err(e) => debug!("Skipping library file {:?}: {}", lib_file, e),
    }

    roots
}

/// Extracts quoted path values from `"<index>" "<path>"` lines. Relative
/// values never name a library and are dropped.
pub fn parse_library_folders(text: &str) -> Vec<PathBuf> {
    library_entry()
        .captures_iter(text)
        .map(|caps| PathBuf::from(&caps[1]))
        .filter(|path| path.is_absolute())
        .collect()
}
