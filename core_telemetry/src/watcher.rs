//! Live state watcher: turns an externally rewritten JSON file into an
//! ordered stream of validated [`Snapshot`]s.
//!
//! File system notifications arrive on the `notify` callback thread. They only
//! raise the shared `read_pending` flag and wake a single worker thread, which
//! owns the debounce window and runs at most one read cycle at a time. A
//! cycle reads with a bounded, linearly backed-off retry (the producer may
//! have the file truncated or locked), parses, validates, and then calls every
//! subscriber synchronously on the worker thread.

use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::config::WatcherConfig;
use crate::error::LiveStateError;
use crate::snapshot::Snapshot;

/// A continuous stream of change notifications may postpone a read by at
/// most this many debounce windows.
const MAX_DEBOUNCE_WINDOWS: u32 = 4;

pub type SubscriptionId = u64;

type Handler = Box<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

enum Signal {
    /// The file changed; (re)start the debounce window.
    Changed,
    /// Read now, skipping the debounce window.
    Refresh,
    Stop,
}

#[derive(Default)]
struct Subscribers {
    next_id: SubscriptionId,
    handlers: Vec<(SubscriptionId, Handler)>,
}

#[derive(Default)]
struct Shared {
    read_pending: AtomicBool,
    stopped: AtomicBool,
    subscribers: Mutex<Subscribers>,
}

impl Shared {
    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, handler) in &subscribers.handlers {
            handler(&snapshot);
        }
    }
}

#[derive(Clone)]
struct Signaller {
    signals: Sender<Signal>,
    shared: Arc<Shared>,
}

impl Signaller {
    fn changed(&self) {
        self.shared.read_pending.store(true, Ordering::Release);
        let _ = self.signals.send(Signal::Changed);
    }

    fn refresh(&self) {
        if self.shared.stopped.load(Ordering::Acquire) {
            return;
        }
        self.shared.read_pending.store(true, Ordering::Release);
        let _ = self.signals.send(Signal::Refresh);
    }
}

/// Cloneable handle that requests an immediate read-and-publish cycle.
#[derive(Clone)]
pub struct RefreshHandle {
    signaller: Signaller,
}

impl RefreshHandle {
    pub fn refresh(&self) {
        self.signaller.refresh();
    }
}

struct Running {
    fs_watcher: RecommendedWatcher,
    signaller: Signaller,
    worker: JoinHandle<()>,
}

/// Watches one file and publishes every successfully parsed snapshot.
///
/// Subscribers are invoked on the watcher's worker thread, in the order
/// snapshots become available. Consumers that own a UI thread must forward
/// snapshots themselves, e.g. through [`LiveStateWatcher::snapshots`].
pub struct LiveStateWatcher {
    path: PathBuf,
    config: WatcherConfig,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl LiveStateWatcher {
    pub fn new(path: impl Into<PathBuf>, config: WatcherConfig) -> Self {
        Self {
            path: path.into(),
            config,
            shared: Arc::new(Shared::default()),
            running: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Register a handler for every published snapshot.
    ///
    /// Handlers run while the subscriber list is locked; they must not call
    /// back into [`LiveStateWatcher::subscribe`] or `unsubscribe`.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.handlers.len();
        subscribers.handlers.retain(|(existing, _)| *existing != id);
        subscribers.handlers.len() != before
    }

    /// Subscribe through a channel instead of a callback.
    pub fn snapshots(&self) -> Receiver<Arc<Snapshot>> {
        let (sender, receiver) = unbounded();
        self.subscribe(move |snapshot| {
            let _ = sender.send(Arc::clone(snapshot));
        });
        receiver
    }

    /// Begin monitoring. The current file content is read and published
    /// right away on the worker thread.
    pub fn start(&mut self) -> Result<(), LiveStateError> {
        if self.running.is_some() {
            return Ok(());
        }

        let (directory, file_name) = split_target(&self.path)?;
        fs::create_dir_all(&directory).map_err(|source| {
            LiveStateError::DirectoryUnavailable {
                path: directory.clone(),
                source,
            }
        })?;

        self.shared.stopped.store(false, Ordering::Release);
        let (signals, receiver) = unbounded::<Signal>();
        let signaller = Signaller {
            signals,
            shared: Arc::clone(&self.shared),
        };

        let callback_signaller = signaller.clone();
        let mut fs_watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if is_relevant_change(&event, &file_name) {
                        callback_signaller.changed();
                    }
                }
                Err(error) => {
                    warn!(target: "telemetry::watcher", %error, "live_state.notify_error");
                }
            })?;
        fs_watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        let worker = Worker {
            path: self.path.clone(),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            signals: receiver,
        };
        let worker = thread::spawn(move || worker.run());

        debug!(
            target: "telemetry::watcher",
            path = %self.path.display(),
            debounce_ms = self.config.debounce_ms,
            "live_state.watch_started"
        );

        signaller.refresh();
        self.running = Some(Running {
            fs_watcher,
            signaller,
            worker,
        });
        Ok(())
    }

    /// Handle for requesting a read without waiting for a file change.
    /// Returns `None` until the watcher has been started.
    pub fn refresh_handle(&self) -> Option<RefreshHandle> {
        self.running.as_ref().map(|running| RefreshHandle {
            signaller: running.signaller.clone(),
        })
    }

    pub fn refresh(&self) {
        if let Some(running) = &self.running {
            running.signaller.refresh();
        }
    }

    /// Release the file system handle and shut the worker down. Nothing is
    /// published once this returns.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.shared.stopped.store(true, Ordering::Release);
        drop(running.fs_watcher);
        let _ = running.signaller.signals.send(Signal::Stop);
        if running.worker.join().is_err() {
            warn!(target: "telemetry::watcher", "live_state.worker_panicked");
        }
        self.shared.read_pending.store(false, Ordering::Release);
        debug!(
            target: "telemetry::watcher",
            path = %self.path.display(),
            "live_state.watch_stopped"
        );
    }

    #[cfg(test)]
    fn signaller(&self) -> Option<Signaller> {
        self.running.as_ref().map(|running| running.signaller.clone())
    }
}

impl Drop for LiveStateWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn split_target(path: &Path) -> Result<(PathBuf, OsString), LiveStateError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name().map(OsStr::to_os_string).ok_or_else(|| {
        LiveStateError::DirectoryUnavailable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path does not name a file"),
        }
    })?;
    Ok((directory, file_name))
}

/// Content changes to the target file only; attribute-only updates and
/// sibling files are ignored.
fn is_relevant_change(event: &Event, file_name: &OsStr) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Any
            | EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

struct Worker {
    path: PathBuf,
    config: WatcherConfig,
    shared: Arc<Shared>,
    signals: Receiver<Signal>,
}

impl Worker {
    fn run(self) {
        while let Ok(signal) = self.signals.recv() {
            let flow = match signal {
                Signal::Stop => break,
                Signal::Refresh => ControlFlow::Continue(()),
                Signal::Changed => self.debounce(),
            };
            if flow.is_break() || self.run_pending_cycles().is_break() {
                break;
            }
        }
    }

    /// Changes that land while a cycle runs raise the flag again and get
    /// exactly one follow-up cycle.
    fn run_pending_cycles(&self) -> ControlFlow<()> {
        while self.shared.read_pending.swap(false, Ordering::AcqRel) {
            self.read_and_publish()?;
            if self.shared.read_pending.load(Ordering::Acquire) {
                self.debounce()?;
            }
        }
        ControlFlow::Continue(())
    }

    fn debounce(&self) -> ControlFlow<()> {
        let window = self.config.debounce();
        let started = Instant::now();
        let latest = started + window * MAX_DEBOUNCE_WINDOWS;
        let mut deadline = started + window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return ControlFlow::Continue(());
            }
            match self.signals.recv_timeout(remaining) {
                Ok(Signal::Changed) => deadline = (Instant::now() + window).min(latest),
                Ok(Signal::Refresh) | Err(RecvTimeoutError::Timeout) => {
                    return ControlFlow::Continue(())
                }
                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    return ControlFlow::Break(())
                }
            }
        }
    }

    /// Sleep between retries, waking early only for shutdown. Change signals
    /// received meanwhile are already reflected in `read_pending`.
    fn wait(&self, delay: Duration) -> ControlFlow<()> {
        let deadline = Instant::now() + delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return ControlFlow::Continue(());
            }
            match self.signals.recv_timeout(remaining) {
                Ok(Signal::Changed) | Ok(Signal::Refresh) => {}
                Err(RecvTimeoutError::Timeout) => return ControlFlow::Continue(()),
                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    return ControlFlow::Break(())
                }
            }
        }
    }

    fn read_and_publish(&self) -> ControlFlow<()> {
        let outcome = read_with_retry(
            &self.config,
            &self.path,
            || read_live_state(&self.path),
            |delay| self.wait(delay),
        );
        match outcome {
            Ok(snapshot) => {
                if self.shared.stopped.load(Ordering::Acquire) {
                    return ControlFlow::Break(());
                }
                trace!(
                    target: "telemetry::watcher",
                    status = %snapshot.status,
                    trial = snapshot.trial,
                    "live_state.published"
                );
                self.shared.publish(snapshot);
            }
            Err(LiveStateError::Cancelled) => return ControlFlow::Break(()),
            Err(error @ LiveStateError::MalformedPayload(_)) => {
                warn!(target: "telemetry::watcher", %error, "live_state.malformed");
            }
            Err(error @ LiveStateError::SchemaInvalid(_)) => {
                warn!(target: "telemetry::watcher", %error, "live_state.rejected");
            }
            Err(error) => {
                debug!(target: "telemetry::watcher", %error, "live_state.cycle_abandoned");
            }
        }
        ControlFlow::Continue(())
    }
}

/// Read the whole file. Opening for read only never blocks a concurrent
/// writer; any failure here is treated as transient by the caller.
fn read_live_state(path: &Path) -> io::Result<String> {
    let mut file = OpenOptions::new().read(true).open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// One read cycle: up to `config.attempts()` reads with a linear backoff.
///
/// I/O errors and blank content are retried. Malformed and schema-invalid
/// payloads end the cycle at once. `wait` returning `Break` cancels.
fn read_with_retry<R, W>(
    config: &WatcherConfig,
    path: &Path,
    mut read: R,
    mut wait: W,
) -> Result<Snapshot, LiveStateError>
where
    R: FnMut() -> io::Result<String>,
    W: FnMut(Duration) -> ControlFlow<()>,
{
    let attempts = config.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match read() {
            Ok(contents) if contents.trim().is_empty() => LiveStateError::EmptyContent {
                path: path.to_path_buf(),
            },
            Ok(contents) => return Snapshot::from_json_str(&contents),
            Err(source) => LiveStateError::TransientRead {
                path: path.to_path_buf(),
                source,
            },
        };
        if attempt >= attempts {
            return Err(LiveStateError::RetriesExhausted {
                attempts,
                last: Box::new(error),
            });
        }
        trace!(target: "telemetry::watcher", attempt, %error, "live_state.retry");
        if wait(config.retry_delay(attempt)).is_break() {
            return Err(LiveStateError::Cancelled);
        }
    }
}
