// src/watch/mod.rs

//! File watching and change routing.
//!
//! This module is responsible for:
//! - Compiling `src` / `watch` glob patterns (with `!` exclusions).
//! - Binding watched file sets to steps.
//! - Wiring up a debounced filesystem watcher (`notify`).
//! - Routing each change batch to bindings and live-reload notifications.
//! - (Optionally) content hashing so unchanged files trigger nothing.
//!
//! It does not run anything itself; it only emits runtime events.

pub mod bindings;
pub mod cache;
pub mod filter;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod router;
pub mod watcher;

pub use bindings::WatchBinding;
pub use filter::ContentFilter;
pub use hash::{FileHashStore, HASH_FILE_PATH, HashStore, MemoryHashStore};
pub use patterns::{FileSet, collect_matching_files, glob_base};
pub use router::{ChangedPath, RoutedBatch, WatchRouter, classify};
pub use watcher::{WatchOptions, WatcherHandle, spawn_watcher};
