//! PrefixDepot Core Library
//!
//! Inventory and cleanup of Proton compatibility prefixes on a Steam Deck
//! (or any Linux Steam install).
//!
//! # Architecture
//!
//! This library is designed to be driven by a thin front end:
//! - **Game-mode plugin**: loads the `cdylib` and calls the C ABI in `ffi`
//! - **Terminal**: the `prefixdepot` binary
//!
//! Both call the same three operations on a [`PrefixDepot`] and get plain
//! records back.
//!
//! # Core Features Implemented
//!
//! ## Discovery (`library`, `registry`, `shortcuts` modules)
//! - `discover_roots()` - Primary install, SD cards and `libraryfolders.vdf` entries
//! - `scan_installed()` - Installed games from `appmanifest_*.acf`
//! - `decode_shortcuts()` - Non-Steam games from the binary `shortcuts.vdf`
//! - `find_orphans()` - `compatdata` prefixes no game claims
//!
//! ## Inventory (`engine` module)
//! - `PrefixDepot::get_inventory()` - Unified, de-duplicated view of all prefixes
//! - `PrefixDepot::delete_one()` - Delete one prefix, optionally zipping it first
//! - `PrefixDepot::delete_orphans()` - Delete every orphaned prefix
//! - `PrefixDepot::delete_many()` - Delete a selection of prefixes
//!
//! ## Data Structures (`prefix` module)
//! - `PrefixRecord` - One inventory row
//! - `PrefixKind` - Installed, non-Steam shortcut, orphan (or a synthetic row)
//! - `PrefixState` - Missing, symlink or directory at scan time

pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod library;
pub mod operations;
pub mod prefix;
pub mod registry;
pub mod shortcuts;
pub mod size;

pub use config::DepotConfig;
pub use engine::{BatchOutcome, CleanupOutcome, DeleteOutcome, PrefixDepot};
pub use error::EraseError;
pub use prefix::{PrefixKind, PrefixRecord, PrefixState, SortKey};
pub use size::{format_size, SizeCache};
