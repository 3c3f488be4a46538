//! Cleanup of generated documents.
//!
//! Three entry points share one lock around their list/delete sequence:
//!
//! - [`Janitor::schedule_removal`] deletes a single file once it has been
//!   delivered, on a short-lived background thread.
//! - [`Janitor::sweep_stale`] deletes outputs older than the sweep interval;
//!   [`Janitor::spawn_sweeper`] runs it on a dedicated thread.
//! - [`Janitor::clean_all`] deletes every output regardless of age.
//!
//! Templates are never touched: only `output_*.docx` files are candidates
//! and the template/reference names are excluded outright.

use crate::generator::OUTPUT_PREFIX;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// File names no cleanup path may delete.
pub const EXEMPT_FILES: [&str; 2] = ["template.docx", "reference.docx"];

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// The generated-documents directory.
    pub dir: PathBuf,
    /// How often the sweeper wakes, and the age past which outputs are stale.
    pub sweep_interval: Duration,
    /// Wait before the single retry of a failed delete.
    pub retry_delay: Duration,
}

impl JanitorConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JanitorConfig {
            dir: dir.into(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// True for names a cleanup path may delete.
pub fn is_generated_output(file_name: &str) -> bool {
    !EXEMPT_FILES.contains(&file_name)
        && file_name.starts_with(OUTPUT_PREFIX)
        && file_name.ends_with(".docx")
}

#[derive(Debug)]
pub struct Janitor {
    config: JanitorConfig,
    lock: Mutex<()>,
}

impl Janitor {
    pub fn new(config: JanitorConfig) -> Self {
        Janitor {
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Delete one generated file, retrying once after the retry delay.
    /// A file that is already gone counts as removed. Returns false if the
    /// file still exists after both attempts or is not a generated output.
    pub fn remove(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !is_generated_output(name) {
            log::warn!("Refusing to delete non-output file {}", path.display());
            return false;
        }
        let _guard = self.guard();
        self.delete_with_retry(path)
    }

    /// Delete `path` on a background thread. Used once a response has
    /// finished sending the file.
    pub fn schedule_removal(self: &Arc<Self>, path: PathBuf) -> JoinHandle<bool> {
        let janitor = Arc::clone(self);
        std::thread::spawn(move || janitor.remove(&path))
    }

    /// Delete every output older than the sweep interval.
    pub fn sweep_stale(&self) -> usize {
        self.sweep(Some(self.config.sweep_interval))
    }

    /// Delete every output regardless of age. Returns the number removed.
    pub fn clean_all(&self) -> usize {
        self.sweep(None)
    }

    fn sweep(&self, max_age: Option<Duration>) -> usize {
        let _guard = self.guard();
        let entries = match std::fs::read_dir(&self.config.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return 0,
            Err(e) => {
                log::error!("Cannot list {}: {}", self.config.dir.display(), e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_generated_output(name) {
                continue;
            }
            if let Some(max_age) = max_age {
                let modified = match entry.metadata().and_then(|m| m.modified()) {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("Cannot stat {}: {}", name, e);
                        continue;
                    }
                };
                let age = now.duration_since(modified).unwrap_or_default();
                if age <= max_age {
                    continue;
                }
            }
            if self.delete_with_retry(&entry.path()) {
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!(
                "Removed {} generated file(s) from {}",
                removed,
                self.config.dir.display()
            );
        }
        removed
    }

    /// Caller holds the lock.
    fn delete_with_retry(&self, path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => return true,
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(e) => log::warn!(
                "Delete of {} failed ({}), retrying in {:?}",
                path.display(),
                e,
                self.config.retry_delay
            ),
        }
        std::thread::sleep(self.config.retry_delay);
        match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                log::error!(
                    "Giving up on {}: {}; the periodic sweep will retry",
                    path.display(),
                    e
                );
                false
            }
        }
    }

    /// Start the periodic sweep on its own thread.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Sweeper {
        let janitor = Arc::clone(self);
        let (stop, stopped) = mpsc::channel::<()>();
        let interval = self.config.sweep_interval;
        let handle = std::thread::spawn(move || loop {
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    janitor.sweep_stale();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        log::info!(
            "Sweeping {} every {:?}",
            self.config.dir.display(),
            interval
        );
        Sweeper { stop, handle }
    }
}

/// Handle to the sweeper thread.
pub struct Sweeper {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Stop the sweeper and wait for it to exit.
    pub fn shutdown(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::error!("Sweeper thread panicked");
        }
    }
}

/// Deletes its file when dropped. A response body owns one of these, so the
/// file goes away once the body has been sent or abandoned.
#[derive(Debug)]
pub struct CleanupGuard {
    janitor: Arc<Janitor>,
    path: Option<PathBuf>,
}

impl CleanupGuard {
    pub fn new(janitor: Arc<Janitor>, path: PathBuf) -> Self {
        CleanupGuard {
            janitor,
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Keep the file.
    pub fn disarm(mut self) -> Option<PathBuf> {
        self.path.take()
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            self.janitor.schedule_removal(path);
        }
    }
}
