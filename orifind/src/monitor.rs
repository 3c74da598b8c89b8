//! Document file monitor. Reloads the shared document when the file on
//! disk changes and tells the event loop about it.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;

use orifind_core::Document;

use crate::app::AppEvent;

/// Quiet period collapsing bursts of writes into one reload.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the document's parent directory and replaces the shared
/// [`Document`] whenever the file is rewritten.
pub struct DocumentMonitor {
    shutdown_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl DocumentMonitor {
    /// Start watching `path`. Returns `None` if the watch cannot be set up.
    pub fn new(
        path: &Path,
        document: Arc<Mutex<Document>>,
        events: mpsc::Sender<AppEvent>,
    ) -> Option<Self> {
        let file = path.canonicalize().ok()?;
        let parent = file.parent()?.to_path_buf();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (notify_tx, notify_rx) = mpsc::channel();

        let mut watcher = match notify::recommended_watcher(notify_tx) {
            Ok(w) => w,
            Err(e) => {
                log::warn!("monitor: failed to create watcher: {e}");
                return None;
            }
        };

        if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
            log::warn!("monitor: failed to watch {}: {e}", parent.display());
            return None;
        }

        log::info!("monitor: watching {}", file.display());

        let thread = std::thread::Builder::new()
            .name("document-watcher".into())
            .spawn(move || {
                // Keep the watcher alive for the lifetime of this thread.
                let _watcher = watcher;
                Self::watch_loop(&file, &document, &events, &notify_rx, &shutdown_rx);
            })
            .ok()?;

        Some(Self {
            shutdown_tx,
            thread: Some(thread),
        })
    }

    fn watch_loop(
        file: &Path,
        document: &Mutex<Document>,
        events: &mpsc::Sender<AppEvent>,
        notify_rx: &mpsc::Receiver<Result<notify::Event, notify::Error>>,
        shutdown_rx: &mpsc::Receiver<()>,
    ) {
        loop {
            let event = match notify_rx.recv_timeout(DEBOUNCE) {
                Ok(event) => event,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if shutdown_rx.try_recv().is_ok() {
                        return;
                    }
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return,
            };

            if shutdown_rx.try_recv().is_ok() {
                return;
            }

            let concerns_file = match &event {
                Ok(ev) => ev.paths.iter().any(|p| p == file),
                Err(_) => false,
            };
            if !concerns_file {
                continue;
            }

            // Drain the rest of the burst.
            while notify_rx.recv_timeout(DEBOUNCE).is_ok() {}

            if shutdown_rx.try_recv().is_ok() {
                return;
            }

            let text = match std::fs::read_to_string(file) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("monitor: failed to read {}: {e}", file.display());
                    continue;
                }
            };
            *document.lock() = Document::from_plain_text(&text);
            log::debug!("monitor: reloaded {} ({} bytes)", file.display(), text.len());

            if events.send(AppEvent::DocumentChanged).is_err() {
                // Event loop closed.
                return;
            }
        }
    }

    /// Shut down the watcher thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
