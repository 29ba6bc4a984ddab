//! Builds a fake Steam Deck home inside a temporary directory.
//!
//! ```text
//! home/
//!   .local/share/Steam/
//!     steamapps/
//!       appmanifest_<id>.acf
//!       compatdata/<id>/...
//!     userdata/<user>/config/shortcuts.vdf
//!   media/                 removable media mount point
//!   err.log                diagnostic log target
//! ```

#![allow(dead_code)]

use prefixdepot_core::DepotConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct FakeDeck {
    pub home: TempDir,
    pub config: DepotConfig,
}

impl FakeDeck {
    pub fn new() -> Self {
        let home = TempDir::new().expect("failed to create temp dir");
        let mut config = DepotConfig::for_home(home.path());
        config.media_root = home.path().join("media");
        config.error_log = home.path().join("err.log");
        fs::create_dir_all(config.steam_root.join("steamapps")).unwrap();
        Self { home, config }
    }

    pub fn steamapps(&self) -> PathBuf {
        self.config.steam_root.join("steamapps")
    }

    pub fn compatdata(&self) -> PathBuf {
        self.config.primary_compatdata()
    }

    pub fn add_manifest(&self, root: &Path, app_id: &str, name: &str, install_dir: Option<&str>) {
        let steamapps = root.join("steamapps");
        fs::create_dir_all(&steamapps).unwrap();
        let mut acf = format!(
            "\"AppState\"\n{{\n\t\"appid\"\t\t\"{}\"\n\t\"name\"\t\t\"{}\"\n",
            app_id, name
        );
        if let Some(dir) = install_dir {
            acf.push_str(&format!("\t\"installdir\"\t\t\"{}\"\n", dir));
        }
        acf.push_str("}\n");
        fs::write(steamapps.join(format!("appmanifest_{}.acf", app_id)), acf).unwrap();
    }

    /// Creates `<root>/steamapps/compatdata/<name>` holding `bytes` of data.
    pub fn add_prefix(&self, root: &Path, name: &str, bytes: usize) -> PathBuf {
        let prefix = root.join("steamapps/compatdata").join(name);
        fs::create_dir_all(prefix.join("pfx/drive_c")).unwrap();
        fs::write(prefix.join("pfx/drive_c/data.bin"), vec![1u8; bytes]).unwrap();
        prefix
    }

    pub fn write_shortcuts(&self, entries: &[(&str, u32, Option<&str>)]) {
        let dir = self.config.steam_root.join("userdata/123456/config");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("shortcuts.vdf"), shortcuts_vdf(entries)).unwrap();
    }
}

/// Encodes a binary shortcuts database the way Steam writes it.
pub fn shortcuts_vdf(entries: &[(&str, u32, Option<&str>)]) -> Vec<u8> {
    let mut buf = vec![0x00];
    buf.extend_from_slice(b"shortcuts\0");
    for (index, (name, app_id, exe)) in entries.iter().enumerate() {
        buf.push(0x00);
        buf.extend_from_slice(format!("{}\0", index).as_bytes());

        buf.push(0x02);
        buf.extend_from_slice(b"appid\0");
        buf.extend_from_slice(&app_id.to_le_bytes());

        buf.push(0x01);
        buf.extend_from_slice(b"AppName\0");
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);

        if let Some(exe) = exe {
            buf.push(0x01);
            buf.extend_from_slice(b"Exe\0");
            buf.extend_from_slice(exe.as_bytes());
            buf.push(0);
        }

        buf.push(0x00);
        buf.extend_from_slice(b"tags\0");
        buf.push(0x08);
        buf.push(0x08);
    }
    buf.push(0x08);
    buf.push(0x08);
    buf
}
