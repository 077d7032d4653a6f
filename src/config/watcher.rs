//! Configuration file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! notify event (parent directory)
//!     → concerns() keeps events naming the config file
//!     → forward_reloads() collapses a save burst into one reload
//!     → load_config() → update channel → HttpServer swaps the dispatcher
//! ```
//!
//! # Design Decisions
//! - The parent directory is watched; editors that save by rename replace the
//!   file's inode and a watch on the file itself goes silent
//! - One save emits several modify/create events; they are collapsed so the
//!   dispatcher is rebuilt once per save

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;

/// Quiet period that ends a burst of change events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
}

/// Keeps the watch alive. Dropping it stops reloads.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a Tokio runtime.
    pub fn run(self) -> Result<WatchGuard, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if concerns(&event, &file_name) => {
                    // Only fails once the forwarder is gone, which ends reloads anyway.
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        let forwarder = tokio::spawn(forward_reloads(
            self.path.clone(),
            event_rx,
            self.update_tx,
            self.debounce,
        ));

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(WatchGuard {
            _watcher: watcher,
            forwarder,
        })
    }
}

/// Whether an event is a write to the watched file.
fn concerns(event: &Event, file_name: &OsString) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Turn change events into loaded configurations, one per burst.
///
/// Returns when either side of the pipeline is closed.
async fn forward_reloads(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<ServiceConfig>,
    debounce: Duration,
) {
    while events.recv().await.is_some() {
        let mut collapsed = 0usize;
        while let Ok(Some(())) = tokio::time::timeout(debounce, events.recv()).await {
            collapsed += 1;
        }

        tracing::info!(path = ?path, collapsed, "Config file change detected, reloading");
        match load_config(&path) {
            Ok(config) => {
                if updates.send(config).is_err() {
                    tracing::warn!("Config update receiver is gone, stopping reloads");
                    return;
                }
            }
            Err(e) => tracing::error!(
                error = %e,
                "Failed to reload config, keeping current configuration"
            ),
        }
    }
}
