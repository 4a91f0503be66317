// src/watch/hash.rs

//! Content hashing for `[watch].use_hash`: a binding only re-runs when the
//! aggregate blake3 hash of its matched files differs from the last one seen.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Location of the persisted hashes, relative to the project root.
pub const HASH_FILE_PATH: &str = ".sitepipe/hashes";

/// Hash one file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut reader = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Combine per-file hashes into one.
///
/// `entries` must be ordered by path; each path is mixed in so that renaming
/// a file changes the aggregate too.
pub fn compute_aggregate_hash(entries: &[(PathBuf, String)]) -> String {
    let mut hasher = Hasher::new();
    for (path, hash) in entries {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Abstract storage for binding hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, binding: &str) -> Result<Option<String>>;
    fn save(&mut self, binding: &str, hash: &str) -> Result<()>;
    /// Drop hashes of bindings that no longer exist.
    fn prune(&mut self, active: &[&str]) -> Result<()>;
}

/// Stores hashes in `<root>/.sitepipe/hashes`, one `name hash` pair per line.
pub struct FileHashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn path(&self) -> PathBuf {
        self.root.join(HASH_FILE_PATH)
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }

        let contents = self.fs.read_to_string(&path)?;
        let map = contents
            .lines()
            .filter_map(|line| line.trim().split_once(char::is_whitespace))
            .map(|(name, hash)| (name.to_string(), hash.trim().to_string()))
            .collect();
        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let body: String = map
            .iter()
            .map(|(name, hash)| format!("{name} {hash}\n"))
            .collect();
        self.fs.write(&self.path(), body.as_bytes())
    }
}

impl HashStore for FileHashStore {
    fn load(&self, binding: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(binding).cloned())
    }

    fn save(&mut self, binding: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(binding.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(binding = %binding, hash = %hash, "stored binding hash (file)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let before = map.len();
        map.retain(|k, _| active.contains(&k.as_str()));
        if map.len() < before {
            self.save_all(&map)?;
            info!(removed = before - map.len(), "pruned stale binding hashes");
        }
        Ok(())
    }
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, binding: &str) -> Result<Option<String>> {
        Ok(self.map.get(binding).cloned())
    }

    fn save(&mut self, binding: &str, hash: &str) -> Result<()> {
        self.map.insert(binding.to_string(), hash.to_string());
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        self.map.retain(|k, _| active.contains(&k.as_str()));
        Ok(())
    }
}
