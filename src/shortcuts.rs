//! Decoder for Steam's binary `shortcuts.vdf` (non-Steam games).
//!
//! The file is a flat binary KeyValues tree with no length prefixes:
//!
//! ```text
//! 00 "shortcuts" 00                  root map
//!   00 "0" 00                        entry, keyed by its index
//!     01 "AppName" 00 "Foo" 00       string field
//!     02 "appid" 00 <u32 LE>         integer field
//!     00 "tags" 00 08                nested map (not decoded)
//!   08                               end of entry
//! 08 08                              end of root, end of file
//! ```
//!
//! Decoding walks the bytes tag by tag. Unknown tags advance one byte after
//! their name, which can desynchronize on exotic input; a field cut short
//! stops decoding but keeps every entry finished before it.

use crate::config::DepotConfig;
use crate::error::DecodeStop;
use crate::prefix::{PrefixKind, PrefixRecord, UNKNOWN};
use crate::size::SizeCache;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, error, warn};

const MARKER: &[u8] = b"shortcuts\0";

const TYPE_STRING: u8 = 0x01;
const TYPE_INT: u8 = 0x02;
const TYPE_END: u8 = 0x08;

/// One non-Steam game entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub app_name: String,
    pub app_id: String,
    pub exe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedShortcuts {
    pub shortcuts: Vec<Shortcut>,
    pub stop: DecodeStop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Text(String),
    Int(u32),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{}", n),
        }
    }
}

fn find_nul(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .iter()
        .position(|&b| b == 0)
        .map(|i| from + i)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

/// Decodes every entry that carries both `AppName` and `appid`.
pub fn decode_shortcuts(data: &[u8]) -> DecodedShortcuts {
    let Some(start) = data.windows(MARKER.len()).position(|w| w == MARKER) else {
        return DecodedShortcuts {
            shortcuts: Vec::new(),
            stop: DecodeStop::NoMarker,
        };
    };

    let mut shortcuts = Vec::new();
    let mut pos = start + MARKER.len();

    let stop = loop {
        let Some(&tag) = data.get(pos) else {
            break DecodeStop::EndOfData;
        };
        if tag == TYPE_END {
            break DecodeStop::Terminator;
        }

        // Entry header: type byte then the index name, both ignored.
        let Some(index_end) = find_nul(data, pos + 1) else {
            break DecodeStop::EndOfData;
        };
        pos = index_end + 1;

        let fields = match decode_fields(data, &mut pos) {
            Ok(fields) => fields,
            Err(offset) => break DecodeStop::Truncated { offset },
        };

        if let (Some(name), Some(app_id)) = (fields.get("AppName"), fields.get("appid")) {
            shortcuts.push(Shortcut {
                app_name: name.to_string(),
                app_id: app_id.to_string(),
                exe: fields.get("Exe").map(|v| v.to_string()),
            });
        }
    };

    DecodedShortcuts { shortcuts, stop }
}

/// Parses one entry's fields up to its `0x08` terminator or the end of the
/// buffer. `Err` carries the offset of an integer cut short.
fn decode_fields(data: &[u8], pos: &mut usize) -> Result<HashMap<String, FieldValue>, usize> {
    let mut fields = HashMap::new();

    while let Some(&tag) = data.get(*pos) {
        if tag == TYPE_END {
            *pos += 1;
            break;
        }

        let Some(key_end) = find_nul(data, *pos + 1) else {
            break;
        };
        let key = lossy(&data[*pos + 1..key_end]);
        *pos = key_end + 1;

        match tag {
            TYPE_STRING => {
                let Some(value_end) = find_nul(data, *pos) else {
                    break;
                };
                fields.insert(key, FieldValue::Text(lossy(&data[*pos..value_end])));
                *pos = value_end + 1;
            }
            TYPE_INT => {
                let raw: [u8; 4] = data
                    .get(*pos..*pos + 4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(*pos)?;
                fields.insert(key, FieldValue::Int(u32::from_le_bytes(raw)));
                *pos += 4;
            }
            _ => *pos += 1,
        }
    }

    Ok(fields)
}

/// Turns decoded shortcuts into inventory rows. Shortcut prefixes are always
/// looked up under `compatdata` using the stored app id unchanged.
pub fn shortcut_records(
    shortcuts: Vec<Shortcut>,
    compatdata: &Path,
    sizes: &mut SizeCache,
) -> Vec<PrefixRecord> {
    shortcuts
        .into_iter()
        .map(|shortcut| {
            let prefix_path = compatdata.join(&shortcut.app_id);
            PrefixRecord::probe(
                shortcut.app_name,
                shortcut.app_id,
                PrefixKind::ExternalShortcut,
                prefix_path,
                shortcut.exe.unwrap_or_else(|| UNKNOWN.to_string()),
                sizes,
            )
        })
        .collect()
}

/// Reads the first shortcuts database matching the configured glob.
/// A missing or unreadable database yields no records.
pub fn read_shortcuts(config: &DepotConfig, sizes: &mut SizeCache) -> Result<Vec<PrefixRecord>> {
    let first = glob::glob(&config.shortcuts_glob)
        .context(format!("Invalid shortcuts pattern: {}", config.shortcuts_glob))?
        .flatten()
        .next();
    let Some(path) = first else {
        debug!("No shortcuts database matches {}", config.shortcuts_glob);
        return Ok(Vec::new());
    };

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to read shortcuts database {:?}: {}", path, e);
            return Ok(Vec::new());
        }
    };

    let decoded = decode_shortcuts(&data);
    if let DecodeStop::Truncated { offset } = decoded.stop {
        error!(
            "Error parsing shortcuts {:?}: field truncated at byte {}, kept {} entries",
            path,
            offset,
            decoded.shortcuts.len()
        );
    }

    Ok(shortcut_records(decoded.shortcuts, &config.primary_compatdata(), sizes))
}
