//! The inventory pass and the deletions that act on its result.
//!
//! `PrefixDepot` owns the per-pass size cache and the last inventory. Delete
//! requests look records up in that held inventory by app id, so a host must
//! call [`PrefixDepot::get_inventory`] again after any deletion to see the
//! new state. A depot is meant to be driven by one caller at a time.

use crate::config::DepotConfig;
use crate::error::EraseError;
use crate::library::discover_roots;
use crate::operations::{backup_prefix, remove_prefix};
use crate::prefix::{PrefixKind, PrefixRecord, PrefixState};
use crate::registry::{find_orphans, scan_installed};
use crate::shortcuts::read_shortcuts;
use crate::size::SizeCache;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const SUCCESS: &str = "Success";
const NO_ORPHANS: &str = "No orphans found";

/// Result of deleting a single prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}

/// Result of an orphan cleanup. `removed` counts prefixes already deleted
/// even when `message` reports a failure part way through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub removed: usize,
    pub message: String,
}

impl CleanupOutcome {
    /// True unless the cleanup stopped on an error.
    pub fn completed(&self) -> bool {
        self.message == SUCCESS || self.message == NO_ORPHANS
    }
}

/// Result of deleting a selection of prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub removed: usize,
    pub backed_up: Vec<PathBuf>,
    pub failures: Vec<String>,
}

pub struct PrefixDepot {
    config: DepotConfig,
    sizes: SizeCache,
    inventory: Vec<PrefixRecord>,
}

impl PrefixDepot {
    pub fn new(config: DepotConfig) -> Self {
        Self {
            config,
            sizes: SizeCache::new(),
            inventory: Vec::new(),
        }
    }

    /// A depot using the default locations under `$HOME`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DepotConfig::from_env()?))
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    /// The inventory computed by the last pass.
    pub fn inventory(&self) -> &[PrefixRecord] {
        &self.inventory
    }

    /// Rebuilds the inventory from scratch: installed games, then shortcuts,
    /// then orphans.
    ///
    /// Never fails. A pass that errors out yields a single `Error` row and
    /// writes the full error chain to the configured error log; a pass that
    /// finds nothing yields a single `Debug` row.
    pub fn get_inventory(&mut self) -> Vec<PrefixRecord> {
        self.sizes.clear();
        self.inventory.clear();

        let records = match self.scan() {
            Ok(records) if records.is_empty() => {
                info!("Found no prefixes");
                vec![PrefixRecord::debug_empty(&self.config.steam_root)]
            }
            Ok(records) => {
                info!("Found {} prefixes", records.len());
                records
            }
            Err(e) => {
                error!("Inventory pass failed: {:#}", e);
                self.write_error_log(&e);
                vec![PrefixRecord::scan_failure(
                    &e.to_string(),
                    &self.config.error_log,
                )]
            }
        };

        self.inventory = records;
        self.inventory.clone()
    }

    fn scan(&mut self) -> Result<Vec<PrefixRecord>> {
        let roots = discover_roots(&self.config);
        info!("Scanning {} library roots", roots.len());

        let installed = scan_installed(&roots, &mut self.sizes)?;
        let shortcuts = read_shortcuts(&self.config, &mut self.sizes)?;

        let known_ids: HashSet<String> = installed
            .iter()
            .chain(shortcuts.iter())
            .map(|record| record.app_id.clone())
            .collect();
        let orphans = find_orphans(&roots, &known_ids, &mut self.sizes)?;

        Ok(dedup_by_app_id(
            installed.into_iter().chain(shortcuts).chain(orphans),
        ))
    }

    fn write_error_log(&self, err: &anyhow::Error) {
        let report = format!(
            "{} inventory pass failed\n\n{:?}\n",
            chrono::Local::now().to_rfc3339(),
            err
        );
        if let Err(e) = fs::write(&self.config.error_log, report) {
            warn!("Failed to write error log {:?}: {}", self.config.error_log, e);
        }
    }

    /// Inventory rows whose name or app id contains `query`.
    pub fn filter(&self, query: &str) -> Vec<PrefixRecord> {
        self.inventory
            .iter()
            .filter(|record| record.matches(query))
            .cloned()
            .collect()
    }

    /// Deletes the prefix of `app_id`, optionally archiving it first.
    pub fn delete_one(&self, app_id: &str, backup: bool) -> DeleteOutcome {
        match self.try_delete_one(app_id, backup) {
            Ok(_) => DeleteOutcome {
                success: true,
                message: SUCCESS.to_string(),
            },
            Err(e) => {
                warn!("Error deleting prefix {}: {}", app_id, e);
                DeleteOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    fn try_delete_one(&self, app_id: &str, backup: bool) -> Result<Option<PathBuf>, EraseError> {
        let record = self.lookup(app_id).ok_or(EraseError::NotFound)?;
        if !PrefixState::probe(&record.prefix_path).exists() {
            return Err(EraseError::PathGone);
        }
        self.erase(&record.prefix_path, backup)
    }

    /// Deletes every orphan from the last inventory that is still on disk.
    ///
    /// Stops at the first failure; orphans handled before it stay deleted
    /// and are counted in `removed`.
    pub fn delete_orphans(&self, backup: bool) -> CleanupOutcome {
        let orphans: Vec<&PrefixRecord> = self
            .inventory
            .iter()
            .filter(|record| record.kind == PrefixKind::Orphan)
            .filter(|record| PrefixState::probe(&record.prefix_path).exists())
            .collect();
        if orphans.is_empty() {
            return CleanupOutcome {
                removed: 0,
                message: NO_ORPHANS.to_string(),
            };
        }

        let mut removed = 0;
        for record in orphans {
            if !PrefixState::probe(&record.prefix_path).exists() {
                continue;
            }
            if let Err(e) = self.erase(&record.prefix_path, backup) {
                error!("Error cleaning orphans: {}", e);
                return CleanupOutcome {
                    removed,
                    message: e.to_string(),
                };
            }
            removed += 1;
        }

        info!("Removed {} orphan prefixes", removed);
        CleanupOutcome {
            removed,
            message: SUCCESS.to_string(),
        }
    }

    /// Deletes a selection of prefixes. Ids that are unknown or whose path is
    /// already gone are skipped; a failure on one prefix is recorded and the
    /// rest are still attempted.
    pub fn delete_many<S: AsRef<str>>(&self, app_ids: &[S], backup: bool) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for app_id in app_ids {
            let app_id = app_id.as_ref();
            let Some(record) = self.lookup(app_id) else {
                warn!("Skipping unknown prefix {}", app_id);
                continue;
            };
            if !PrefixState::probe(&record.prefix_path).exists() {
                continue;
            }

            match self.erase(&record.prefix_path, backup) {
                Ok(archive) => {
                    outcome.removed += 1;
                    outcome.backed_up.extend(archive);
                }
                Err(e) => {
                    warn!("Error deleting prefix {}: {}", app_id, e);
                    outcome.failures.push(format!("{}: {}", app_id, e));
                }
            }
        }

        outcome
    }

    fn lookup(&self, app_id: &str) -> Option<&PrefixRecord> {
        self.inventory
            .iter()
            .find(|record| record.app_id == app_id && record.kind.is_erasable())
    }

    fn erase(&self, path: &Path, backup: bool) -> Result<Option<PathBuf>, EraseError> {
        let archive = if backup {
            backup_prefix(path, &self.config.backup_dir).map_err(|cause| EraseError::Backup {
                path: path.to_path_buf(),
                cause,
            })?
        } else {
            None
        };

        remove_prefix(path).map_err(|cause| EraseError::Remove {
            path: path.to_path_buf(),
            cause,
        })?;

        Ok(archive)
    }
}

/// Keeps the first record seen for each app id.
fn dedup_by_app_id(records: impl Iterator<Item = PrefixRecord>) -> Vec<PrefixRecord> {
    let mut seen = HashSet::new();
    records
        .filter(|record| {
            let first = seen.insert(record.app_id.clone());
            if !first {
                warn!(
                    "Dropping duplicate app id {} at {:?}",
                    record.app_id, record.prefix_path
                );
            }
            first
        })
        .collect()
}
