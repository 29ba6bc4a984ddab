//! Filesystem locations the depot reads from and writes to.
//!
//! Defaults follow the Steam Deck layout: Steam lives under the user's
//! `~/.local/share/Steam`, SD cards are mounted under `/run/media/<user>`,
//! and backups land in `~/Documents/PrefixBackups`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User name assumed when it cannot be taken from the home directory.
const DEFAULT_USER: &str = "deck";

/// Where the full trace of a failed inventory pass is written.
pub const DEFAULT_ERROR_LOG: &str = "/tmp/games_prefix_plugin_error.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotConfig {
    /// Primary Steam install.
    pub steam_root: PathBuf,
    /// Each immediate subdirectory is a candidate library root.
    pub media_root: PathBuf,
    /// Glob for the per-user binary shortcuts database.
    pub shortcuts_glob: String,
    pub backup_dir: PathBuf,
    pub error_log: PathBuf,
}

impl DepotConfig {
    /// Defaults derived from `$HOME`.
    pub fn from_env() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(Self::for_home(Path::new(&home)))
    }

    pub fn for_home(home: &Path) -> Self {
        let user = home
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        let steam_root = home.join(".local/share/Steam");
        let shortcuts_glob = format!(
            "{}/userdata/*/config/shortcuts.vdf",
            glob::Pattern::escape(&steam_root.to_string_lossy())
        );

        Self {
            media_root: PathBuf::from("/run/media").join(user),
            shortcuts_glob,
            backup_dir: home.join("Documents/PrefixBackups"),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            steam_root,
        }
    }

    /// The text file listing extra library folders.
    pub fn library_folders_file(&self) -> PathBuf {
        self.steam_root.join("steamapps").join("libraryfolders.vdf")
    }

    /// Where shortcut prefixes live; shortcuts always use the primary root.
    pub fn primary_compatdata(&self) -> PathBuf {
        compatdata_dir(&self.steam_root)
    }
}

/// `<root>/steamapps/compatdata`
pub fn compatdata_dir(root: &Path) -> PathBuf {
    root.join("steamapps").join("compatdata")
}
