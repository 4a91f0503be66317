// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::WatchSection;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;
use crate::types::{HashStorageMode, StepName};
use crate::watch::bindings::WatchBinding;
use crate::watch::filter::ContentFilter;
use crate::watch::router::{ChangedPath, WatchRouter, classify};

/// Watcher settings taken from `[watch]`.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Window in which rapid changes collapse into one batch.
    pub debounce: Duration,
    pub use_hash: bool,
    pub hash_storage: HashStorageMode,
}

impl WatchOptions {
    pub fn from_config(section: &WatchSection) -> Self {
        Self {
            debounce: Duration::from_millis(section.debounce_ms),
            use_hash: section.use_hash,
            hash_storage: section.hash_storage,
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            use_hash: false,
            hash_storage: HashStorageMode::Memory,
        }
    }
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle
/// stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// True for events that change what is on disk.
///
/// Reads (a transform opening its own input) and metadata updates are
/// reported too on some platforms and must not fire bindings.
pub fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    }
}

/// Start watching `root` recursively.
///
/// Content-changing events are collected into one batch per debounce
/// window (opened by the first event). Each batch is routed through the
/// bindings: every matching binding is sent as `BindingTriggered`, and a
/// batch touching `output_root` sends one `OutputChanged`. Must be called
/// from within a Tokio runtime.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    output_root: impl Into<PathBuf>,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    options: WatchOptions,
    fs: Arc<dyn FileSystem>,
) -> Result<WatcherHandle> {
    let root = canonical(root.into());
    let output_root = canonical(output_root.into());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    trace!("watcher loop gone; dropping event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .map_err(watch_error)?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(watch_error)?;

    if !output_root.starts_with(&root) && output_root.is_dir() {
        watcher
            .watch(&output_root, RecursiveMode::Recursive)
            .map_err(watch_error)?;
    }

    info!(?root, ?output_root, bindings = bindings.len(), "file watcher started");

    let filter = options.use_hash.then(|| {
        let mut filter = ContentFilter::new(root.clone(), fs, options.hash_storage);
        let active: Vec<&str> = bindings.iter().map(WatchBinding::name).collect();
        filter.prune(&active);
        Arc::new(Mutex::new(filter))
    });

    let dispatcher = BatchDispatcher {
        root,
        output_root,
        router: Arc::new(WatchRouter::new(bindings)),
        filter,
        runtime_tx,
    };
    let debounce = options.debounce;

    let task = tokio::spawn(async move {
        let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe = event_rx.recv() => {
                    let Some(event) = maybe else { break };
                    if !is_content_change(&event.kind) {
                        trace!(kind = ?event.kind, paths = ?event.paths, "ignoring event");
                        continue;
                    }
                    pending.extend(event.paths);
                    deadline.get_or_insert_with(|| Instant::now() + debounce);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let paths: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                    if !dispatcher.dispatch(paths).await {
                        debug!("runtime channel closed; stopping watcher loop");
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        task,
    })
}

/// Turns one debounced batch of paths into runtime events.
struct BatchDispatcher {
    root: PathBuf,
    output_root: PathBuf,
    router: Arc<WatchRouter>,
    filter: Option<Arc<Mutex<ContentFilter>>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl BatchDispatcher {
    /// Returns false once the runtime is gone.
    async fn dispatch(&self, paths: Vec<PathBuf>) -> bool {
        let changed: Vec<ChangedPath> = paths
            .iter()
            .filter_map(|p| classify(&self.root, &self.output_root, p))
            .collect();

        let routed = self.router.route(&changed);
        if routed.is_empty() {
            return true;
        }
        debug!(bindings = ?routed.bindings, reload = routed.reload, "routed change batch");

        let fire = match &self.filter {
            Some(filter) => {
                apply_content_filter(Arc::clone(filter), Arc::clone(&self.router), paths, routed.bindings)
                    .await
            }
            None => routed.bindings,
        };

        for binding in fire {
            if self
                .runtime_tx
                .send(RuntimeEvent::BindingTriggered { binding })
                .await
                .is_err()
            {
                return false;
            }
        }

        !(routed.reload && self.runtime_tx.send(RuntimeEvent::OutputChanged).await.is_err())
    }
}

/// Keep only bindings whose content actually changed.
async fn apply_content_filter(
    filter: Arc<Mutex<ContentFilter>>,
    router: Arc<WatchRouter>,
    changed: Vec<PathBuf>,
    candidates: Vec<StepName>,
) -> Vec<StepName> {
    let fallback = candidates.clone();
    tokio::task::spawn_blocking(move || {
        let mut filter = match filter.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("content filter mutex poisoned; triggering anyway");
                return candidates;
            }
        };
        filter.invalidate(&changed);
        candidates
            .into_iter()
            .filter(|name| match router.binding(name) {
                Some(binding) => filter.should_fire(binding),
                None => true,
            })
            .collect()
    })
    .await
    .unwrap_or(fallback)
}

fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

fn watch_error(err: notify::Error) -> SitepipeError {
    SitepipeError::Other(anyhow::Error::new(err).context("starting file watcher"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn reads_never_count_as_changes() {
        assert!(!is_content_change(&EventKind::Access(AccessKind::Open(AccessMode::Read))));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Close(AccessMode::Read))));
        assert!(!is_content_change(&EventKind::Access(AccessKind::Any)));
        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::AccessTime
        ))));
    }

    #[test]
    fn writes_creates_and_removes_count() {
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_content_change(&EventKind::Remove(RemoveKind::File)));
    }
}
