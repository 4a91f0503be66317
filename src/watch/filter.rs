// src/watch/filter.rs

//! Content-hash gate for `[watch].use_hash`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::fs::FileSystem;
use crate::types::HashStorageMode;
use crate::watch::bindings::WatchBinding;
use crate::watch::cache::FileCache;
use crate::watch::hash::{FileHashStore, HashStore, MemoryHashStore, compute_aggregate_hash};
use crate::watch::path_utils::to_slash;
use crate::watch::patterns::collect_matching_files;

/// Lets a binding fire only when the aggregate hash of its files changed
/// since it last fired.
///
/// Any error while hashing lets the binding fire.
pub struct ContentFilter {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    store: Box<dyn HashStore>,
    cache: FileCache,
}

impl std::fmt::Debug for ContentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentFilter")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ContentFilter {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>, mode: HashStorageMode) -> Self {
        let store: Box<dyn HashStore> = match mode {
            HashStorageMode::File => Box::new(FileHashStore::new(root.clone(), Arc::clone(&fs))),
            HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
        };
        Self {
            root,
            fs,
            store,
            cache: FileCache::new(),
        }
    }

    /// Drop stored hashes of bindings that no longer exist.
    pub fn prune(&mut self, active: &[&str]) {
        if let Err(err) = self.store.prune(active) {
            warn!(error = %err, "failed to prune stale hashes");
        }
    }

    /// Forget cached per-file hashes for `changed`.
    pub fn invalidate(&mut self, changed: &[PathBuf]) {
        for path in changed {
            self.cache.invalidate(path);
        }
    }

    /// True if `binding` should fire. Stores the new hash when it does.
    pub fn should_fire(&mut self, binding: &WatchBinding) -> bool {
        let name = binding.name();
        let hash = match self.aggregate(binding) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(binding = %name, error = %err, "failed to hash watched files; triggering anyway");
                return true;
            }
        };

        match self.store.load(name) {
            Ok(Some(old)) if old == hash => {
                info!(binding = %name, "watched content unchanged; skipping");
                false
            }
            Ok(_) => {
                if let Err(err) = self.store.save(name, &hash) {
                    warn!(binding = %name, error = %err, "failed to save binding hash");
                }
                true
            }
            Err(err) => {
                warn!(binding = %name, error = %err, "failed to load binding hash; triggering anyway");
                true
            }
        }
    }

    fn aggregate(&mut self, binding: &WatchBinding) -> Result<String> {
        let mut files = BTreeSet::new();
        for set in binding.sets() {
            files.extend(collect_matching_files(self.fs.as_ref(), &self.root, set)?);
        }

        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            let hash = self.cache.get_or_compute(self.fs.as_ref(), &path)?;
            entries.push((relative_to(&self.root, &path), hash));
        }
        Ok(compute_aggregate_hash(&entries))
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(|rel| PathBuf::from(to_slash(rel)))
        .unwrap_or_else(|_| path.to_path_buf())
}
