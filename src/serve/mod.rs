// src/serve/mod.rs

//! Live-reload development server.
//!
//! [`LiveReload`] is the hub the runtime notifies; [`server`] serves the
//! output root and streams notifications to browsers.

pub mod server;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

pub use server::{RELOAD_PATH, ServerHandle, spawn_server};

const CHANNEL_CAPACITY: usize = 16;

/// Broadcasts reload notifications to every connected client.
///
/// Clients that are not connected when a notification is sent miss it.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<()>,
    sent: Arc<AtomicUsize>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify all clients. Returns how many received it.
    pub fn notify(&self) -> usize {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let clients = self.tx.send(()).unwrap_or(0);
        debug!(clients, "live reload notified");
        clients
    }

    /// Notifications sent since creation.
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}
