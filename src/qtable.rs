//! State-key → action-value table and its on-disk form.
//!
//! The table is stored as a single bincode artifact holding a versioned
//! envelope around the whole map. Saves go through a temporary sibling file
//! and a rename, so a crash mid-save leaves the previous artifact intact.

use crate::features::StateKey;
use crate::policy::ACTIONS;
use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

const FORMAT_VERSION: u32 = 1;

pub type Values = [f32; ACTIONS];

#[derive(Serialize)]
struct TableFileRef<'a> {
    version: u32,
    entries: &'a AHashMap<StateKey, Values>,
}

#[derive(Deserialize)]
struct TableFile {
    version: u32,
    entries: AHashMap<StateKey, Values>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QTable {
    entries: AHashMap<StateKey, Values>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored values for `key`, or zeros. Never inserts.
    pub fn get(&self, key: StateKey) -> Values {
        self.entries.get(&key).copied().unwrap_or([0.0; ACTIONS])
    }

    pub fn update(&mut self, key: StateKey, action: usize, value: f32) {
        let qs = self.entries.entry(key).or_insert([0.0; ACTIONS]);
        qs[action] = value;
    }

    pub fn contains(&self, key: StateKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateKey, &Values)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Takes every entry of `other`; its vectors win on shared keys.
    pub fn merge(&mut self, other: QTable) {
        self.entries.extend(other.entries);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = TableFileRef { version: FORMAT_VERSION, entries: &self.entries };
        bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .context("failed to encode value table")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (file, read): (TableFile, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .context("failed to decode value table")?;
        if file.version != FORMAT_VERSION {
            bail!("unsupported value table version {}", file.version);
        }
        if read != bytes.len() {
            bail!("{} trailing bytes after value table", bytes.len() - read);
        }
        Ok(Self { entries: file.entries })
    }

    /// Reads the table at `path`. A missing artifact means a cold start; an
    /// unreadable or corrupt one is logged, removed where possible, and also
    /// yields an empty table.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no value table found, starting cold");
                return Self::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "value table unreadable, starting cold");
                return Self::new();
            }
        };
        match Self::from_bytes(&bytes) {
            Ok(table) => {
                info!(path = %path.display(), states = table.len(), "loaded value table");
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "discarding corrupt value table");
                if let Err(e) = fs::remove_file(path) {
                    debug!(error = %e, "could not remove corrupt value table");
                }
                Self::new()
            }
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to move value table into {}", path.display()))?;
        info!(path = %path.display(), states = self.len(), "saved value table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURES;

    fn key(n: u16) -> StateKey {
        let mut bits = [false; FEATURES];
        for (i, b) in bits.iter_mut().enumerate() {
            *b = (n >> i) & 1 == 1;
        }
        StateKey::from_bits(bits)
    }

    #[test]
    fn unseen_keys_read_as_zero_without_inserting() {
        let table = QTable::new();
        assert_eq!(table.get(key(5)), [0.0; ACTIONS]);
        assert!(!table.contains(key(5)));
        assert!(table.is_empty());
    }

    #[test]
    fn update_inserts_then_overwrites_one_slot() {
        let mut table = QTable::new();
        table.update(key(3), 2, 1.5);
        assert!(table.contains(key(3)));
        assert_eq!(table.get(key(3)), [0.0, 0.0, 1.5, 0.0]);
        table.update(key(3), 0, -2.0);
        assert_eq!(table.get(key(3)), [-2.0, 0.0, 1.5, 0.0]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn merge_prefers_incoming_vectors() {
        let mut a = QTable::new();
        a.update(key(1), 0, 1.0);
        a.update(key(2), 0, 2.0);
        let mut b = QTable::new();
        b.update(key(2), 1, 9.0);
        b.update(key(4), 3, 4.0);
        a.merge(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get(key(1)), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(a.get(key(2)), [0.0, 9.0, 0.0, 0.0]);
        assert_eq!(a.get(key(4)), [0.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn bytes_round_trip() {
        let mut table = QTable::new();
        table.update(key(0), 0, 0.25);
        table.update(key(2047), 3, -10.0);
        table.update(key(700), 1, 3.75);
        let restored = QTable::from_bytes(&table.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let mut table = QTable::new();
        table.update(key(9), 2, 1.0);
        let bytes = table.to_bytes().unwrap();
        assert!(QTable::from_bytes(&bytes[..bytes.len() - 2]).is_err());
        assert!(QTable::from_bytes(&[]).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = QTable::new().to_bytes().unwrap();
        bytes.push(0);
        assert!(QTable::from_bytes(&bytes).is_err());
    }
}
