//! Live watchers: one thread per connected line, fed by a [`WatchService`] subscription.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::tools::is_ingestible;
use crate::error::WatchError;
use crate::share::network::is_network_path;
use crate::{FsEvent, IngestOutcome};

use super::context::IngestContext;

/// Change-notification backend for [`NotifyWatchService`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchBackend {
    /// Poll on network filesystems, native notifications elsewhere.
    #[default]
    Auto,
    Native,
    Poll,
}

/// A live event stream for one root. Dropping it unsubscribes.
pub struct Subscription {
    events: Receiver<FsEvent>,
    _source: Option<Box<dyn Send>>,
}

impl Subscription {
    pub fn new(events: Receiver<FsEvent>) -> Self {
        Self {
            events,
            _source: None,
        }
    }

    /// Keep `source` (usually the OS watcher) alive for as long as the subscription.
    pub fn with_source(events: Receiver<FsEvent>, source: impl Send + 'static) -> Self {
        Self {
            events,
            _source: Some(Box::new(source)),
        }
    }

    pub fn events(&self) -> &Receiver<FsEvent> {
        &self.events
    }
}

/// Produces create/modify events for a root. The stream ends (channel disconnects) when the
/// underlying watch terminates.
pub trait WatchService: Send + Sync {
    fn subscribe(&self, root: &Path, recursive: bool) -> Result<Subscription, WatchError>;
}

/// [`WatchService`] backed by `notify`.
#[derive(Debug, Clone)]
pub struct NotifyWatchService {
    backend: WatchBackend,
    poll_interval: Duration,
}

impl NotifyWatchService {
    pub fn new(backend: WatchBackend, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
        }
    }

    /// Resolve `Auto` for `root`.
    pub fn backend_for(&self, root: &Path) -> WatchBackend {
        match self.backend {
            WatchBackend::Auto if is_network_path(root) => WatchBackend::Poll,
            WatchBackend::Auto => WatchBackend::Native,
            other => other,
        }
    }
}

impl WatchService for NotifyWatchService {
    fn subscribe(&self, root: &Path, recursive: bool) -> Result<Subscription, WatchError> {
        if !root.exists() {
            return Err(WatchError::RootMissing {
                root: root.to_path_buf(),
            });
        }
        let subscribe_err = |source| WatchError::Subscribe {
            root: root.to_path_buf(),
            source,
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        let handler = event_forwarder(tx, root.to_path_buf());
        let backend = self.backend_for(root);
        debug!("Watch backend for {}: {:?}", root.display(), backend);

        let mut watcher: Box<dyn Watcher + Send> = match backend {
            WatchBackend::Poll => Box::new(
                PollWatcher::new(
                    handler,
                    Config::default().with_poll_interval(self.poll_interval),
                )
                .map_err(subscribe_err)?,
            ),
            WatchBackend::Native | WatchBackend::Auto => Box::new(
                RecommendedWatcher::new(handler, Config::default()).map_err(subscribe_err)?,
            ),
        };
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root, mode).map_err(subscribe_err)?;
        Ok(Subscription::with_source(rx, watcher))
    }
}

/// Forwards translated events until the watched root disappears. Dropping the only sender ends
/// the subscription, so the line's watcher thread sees a disconnect and exits.
fn event_forwarder(
    tx: Sender<FsEvent>,
    root: PathBuf,
) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    let mut tx = Some(tx);
    move |res: notify::Result<Event>| {
        let Some(sender) = &tx else {
            return;
        };
        let fatal = match res {
            Ok(event) => {
                for fs_event in translate_event(&event) {
                    if sender.send(fs_event).is_err() {
                        tx = None;
                        return;
                    }
                }
                matches!(event.kind, EventKind::Remove(_)) && !root.exists()
            }
            Err(e) => {
                warn!("Watch error on {}: {e}", root.display());
                !root.exists()
            }
        };
        if fatal {
            warn!("Watched root {} is gone", root.display());
            tx = None;
        }
    }
}

/// Map a raw `notify` event to create/modify events on non-directory paths.
///
/// A rename into place counts as a creation of the new name; other renames, removals and access
/// events are dropped.
pub fn translate_event(event: &Event) -> Vec<FsEvent> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            non_dirs(&event.paths).map(FsEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            non_dirs(&event.paths).last().map(FsEvent::Created).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => Vec::new(),
        EventKind::Modify(_) => non_dirs(&event.paths).map(FsEvent::Modified).collect(),
        _ => Vec::new(),
    }
}

fn non_dirs(paths: &[PathBuf]) -> impl Iterator<Item = PathBuf> + '_ {
    paths.iter().filter(|p| !p.is_dir()).cloned()
}

/// Reaction to create/modify notifications on one line.
pub trait FileEventHandler {
    fn on_created(&self, path: &Path) -> Option<IngestOutcome>;

    fn on_modified(&self, path: &Path) -> Option<IngestOutcome>;

    fn dispatch(&self, event: &FsEvent) -> Option<IngestOutcome> {
        match event {
            FsEvent::Created(p) => self.on_created(p),
            FsEvent::Modified(p) => self.on_modified(p),
        }
    }
}

/// Creates and modifies share one dedup path: a file already copied is never copied again.
impl FileEventHandler for IngestContext {
    fn on_created(&self, path: &Path) -> Option<IngestOutcome> {
        ingest_event(self, path, "New")
    }

    fn on_modified(&self, path: &Path) -> Option<IngestOutcome> {
        ingest_event(self, path, "Modified")
    }
}

fn ingest_event(ctx: &IngestContext, path: &Path, label: &str) -> Option<IngestOutcome> {
    if path.is_dir() || !is_ingestible(path) {
        return None;
    }
    match ctx.ingest(path, Some(label)) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!("[{}] Error processing {}: {}", ctx.alias(), path.display(), e);
            None
        }
    }
}

/// A running watcher thread for one line.
pub struct LineWatcher {
    alias: String,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl LineWatcher {
    /// Subscribe to `ctx.source_root` (recursively) and start the event thread. `idle` bounds how
    /// long the thread waits for an event before re-checking the stop flag.
    pub fn start(
        ctx: Arc<IngestContext>,
        service: &dyn WatchService,
        idle: Duration,
    ) -> Result<Self, WatchError> {
        let subscription = service.subscribe(&ctx.source_root, true)?;
        let alias = ctx.alias().to_string();
        let stop = Arc::new(AtomicBool::new(false));
        let root = ctx.source_root.clone();

        let handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name(format!("elcollect-watch-{alias}"))
                .spawn(move || run_watch_loop(&ctx, subscription, &stop, idle))
                .map_err(|source| WatchError::Spawn {
                    alias: alias.clone(),
                    source,
                })?
        };
        info!("[{}] Started monitoring {}", alias, root.display());
        Ok(Self {
            alias,
            stop,
            handle,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// False once the thread has exited (subscription ended or stop requested).
    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Request a stop and wait up to `timeout`. Returns false (and leaves the thread detached)
    /// when it did not finish in time.
    pub fn stop(self, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !self.handle.is_finished() {
            warn!(
                "[{}] Watcher did not stop within {:.1}s",
                self.alias,
                timeout.as_secs_f64()
            );
            return false;
        }
        if self.handle.join().is_err() {
            error!("[{}] Watcher thread panicked", self.alias);
        }
        debug!("[{}] Watcher stopped", self.alias);
        true
    }
}

fn run_watch_loop(
    ctx: &IngestContext,
    subscription: Subscription,
    stop: &AtomicBool,
    idle: Duration,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match subscription.events().recv_timeout(idle) {
            Ok(event) => {
                ctx.dispatch(&event);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!(
                    "[{}] Watch subscription ended for {}",
                    ctx.alias(),
                    ctx.source_root.display()
                );
                break;
            }
        }
    }
}
