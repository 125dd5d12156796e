//! Session lifecycle: connect, backfill, monitor, drain.

use anyhow::Result;
use chrono::TimeDelta;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::SourceLine;
use crate::engine::codec::Clock;
use crate::engine::ledger::ProcessedLedger;
use crate::engine::tools::count_images;
use crate::share::{ShareConnector, connect_with_retry};
use crate::utils::config::TimingConsts;
use crate::utils::{Settings, rule};

use super::archive::{ArchiveReport, ArchiveTree, Archiver};
use super::context::IngestContext;
use super::scan::{ScanReport, scan_backlog};
use super::watch::{LineWatcher, WatchService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Connecting,
    Backfilling,
    Monitoring,
    Draining,
    Stopped,
}

/// What one session did, for the caller and for tests.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Phases entered, in order.
    pub phases: Vec<Phase>,
    pub connected: Vec<String>,
    pub failed_to_connect: Vec<String>,
    pub scans: Vec<ScanReport>,
    pub watchers_started: usize,
    /// Watchers that did not stop within the join timeout.
    pub watchers_timed_out: usize,
    pub archive_runs: Vec<ArchiveReport>,
}

pub struct Orchestrator {
    settings: Settings,
    connector: Arc<dyn ShareConnector>,
    watch_service: Arc<dyn WatchService>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<AtomicBool>,
    ledger: Arc<ProcessedLedger>,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        connector: Arc<dyn ShareConnector>,
        watch_service: Arc<dyn WatchService>,
        clock: Arc<dyn Clock>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            connector,
            watch_service,
            clock,
            shutdown,
            ledger: Arc::new(ProcessedLedger::new()),
            phase: Phase::Initializing,
        }
    }

    pub fn ledger(&self) -> Arc<ProcessedLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase, summary: &mut RunSummary) {
        debug!("Phase: {:?}", phase);
        self.phase = phase;
        summary.phases.push(phase);
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn archive_tree(&self) -> Option<ArchiveTree> {
        self.settings
            .archive_enabled
            .then(|| ArchiveTree::new(&self.settings.archive_root, self.settings.archive_layout))
    }

    /// Run one session to completion. Returns `Err` only for initialization failures (invalid
    /// settings, roots that cannot be created); everything later is logged and isolated per line.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        self.enter(Phase::Initializing, &mut summary);
        self.settings.validate()?;
        self.settings.ensure_roots()?;
        self.print_banner();

        self.enter(Phase::Connecting, &mut summary);
        let connected = self.connect_all(&mut summary);
        if connected.is_empty() {
            error!("No production lines could be connected. Exiting.");
            self.enter(Phase::Stopped, &mut summary);
            return Ok(summary);
        }

        let contexts: Vec<Arc<IngestContext>> = connected
            .into_iter()
            .map(|(line, source_root)| {
                Arc::new(IngestContext {
                    line,
                    source_root,
                    dest_root: self.settings.centralized_folder.clone(),
                    archive: self.archive_tree(),
                    ledger: Arc::clone(&self.ledger),
                    clock: Arc::clone(&self.clock),
                })
            })
            .collect();

        self.enter(Phase::Backfilling, &mut summary);
        for ctx in &contexts {
            if self.shutdown_requested() {
                break;
            }
            summary.scans.push(scan_backlog(ctx));
        }

        let mut watchers = Vec::new();
        if !self.shutdown_requested() {
            self.enter(Phase::Monitoring, &mut summary);
            watchers = self.start_watchers(&contexts);
            summary.watchers_started = watchers.len();
            if watchers.is_empty() {
                error!("No watchers could be started. Shutting down.");
            } else {
                self.supervise(&watchers, &mut summary);
            }
        }

        self.enter(Phase::Draining, &mut summary);
        summary.watchers_timed_out = self.drain(watchers);

        self.enter(Phase::Stopped, &mut summary);
        info!("Monitoring stopped.");
        Ok(summary)
    }

    fn print_banner(&self) {
        let s = &self.settings;
        info!("{}", rule(60));
        info!("EL IMAGE COLLECTION SERVICE");
        info!("{}", rule(60));
        info!("Production lines:");
        for line in &s.lines {
            info!("  {} [{}]", line, line.unc_path());
        }
        info!("Output directory: {}", s.centralized_folder.display());
        if s.archive_enabled {
            info!(
                "Archive directory: {} ({:?} layout)",
                s.archive_root.display(),
                s.archive_layout
            );
            info!("Archive interval: {} hours", s.shift_duration_hours);
        } else {
            info!("Archival disabled");
        }
        info!("{}", rule(60));
    }

    fn connect_all(&self, summary: &mut RunSummary) -> Vec<(SourceLine, PathBuf)> {
        let mut connected = Vec::new();
        for line in &self.settings.lines {
            if self.shutdown_requested() {
                break;
            }
            info!("[{}] Connecting to {}...", line.alias, line.unc_path());
            match connect_with_retry(
                self.connector.as_ref(),
                line,
                self.settings.connect_attempts,
                self.settings.connect_retry_delay,
            ) {
                Ok(root) => {
                    summary.connected.push(line.alias.clone());
                    connected.push((line.clone(), root));
                }
                Err(e) => {
                    error!("[{}] Failed to connect: {}", line.alias, e);
                    summary.failed_to_connect.push(line.alias.clone());
                }
            }
        }
        connected
    }

    fn start_watchers(&self, contexts: &[Arc<IngestContext>]) -> Vec<LineWatcher> {
        let idle = Duration::from_millis(TimingConsts::WATCHER_IDLE_MILLIS);
        contexts
            .iter()
            .filter_map(|ctx| {
                match LineWatcher::start(Arc::clone(ctx), self.watch_service.as_ref(), idle) {
                    Ok(w) => Some(w),
                    Err(e) => {
                        error!("[{}] Failed to start watcher: {}", ctx.alias(), e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Supervisory loop: heartbeat, dead-watcher reports, archive schedule. Returns on shutdown.
    fn supervise(&self, watchers: &[LineWatcher], summary: &mut RunSummary) {
        let s = &self.settings;
        let archiver = self.archive_tree().map(|tree| {
            Archiver::new(
                &s.centralized_folder,
                tree,
                s.lines.clone(),
                Arc::clone(&self.clock),
            )
        });
        let interval = s.archive_interval();
        let countdown_every = Duration::from_secs(TimingConsts::ARCHIVE_COUNTDOWN_SECS);

        let start = Instant::now();
        let mut next_archive = start + interval;
        let mut last_heartbeat = start;
        let mut last_countdown = start;
        let mut reported_dead: HashSet<String> = HashSet::new();

        info!(
            "Monitoring {} lines. Press Ctrl+C to stop.",
            watchers.len()
        );

        while !self.shutdown_requested() {
            thread::sleep(s.tick);
            let now = Instant::now();

            for w in watchers {
                if !w.is_alive() && reported_dead.insert(w.alias().to_string()) {
                    error!("[{}] Watcher is no longer running", w.alias());
                }
            }

            if now.duration_since(last_heartbeat) >= s.heartbeat_interval {
                last_heartbeat = now;
                let until_archive = archiver
                    .as_ref()
                    .map(|_| next_archive.saturating_duration_since(now));
                self.heartbeat(watchers, until_archive);
            }

            let Some(archiver) = archiver.as_ref() else {
                continue;
            };
            if now >= next_archive {
                summary.archive_runs.push(archiver.run_once());
                while next_archive <= now {
                    next_archive += interval;
                }
                last_countdown = now;
            } else if now.duration_since(last_countdown) >= countdown_every {
                last_countdown = now;
                debug!(
                    "Next archive in {}s",
                    next_archive.duration_since(now).as_secs()
                );
            }
        }
        info!("Shutdown requested.");
    }

    fn heartbeat(&self, watchers: &[LineWatcher], until_archive: Option<Duration>) {
        let alive: Vec<&str> = watchers
            .iter()
            .filter(|w| w.is_alive())
            .map(|w| w.alias())
            .collect();
        let now = self.clock.now();
        info!(
            "[{}] System running - active lines: {}",
            now.format("%Y-%m-%d %H:%M:%S"),
            if alive.is_empty() {
                "none".to_string()
            } else {
                alive.join(", ")
            }
        );
        let Some(remaining) = until_archive else {
            return;
        };
        let next_at = now + TimeDelta::from_std(remaining).unwrap_or(TimeDelta::zero());
        info!(
            "Next archive at {} ({}s remaining)",
            next_at.format("%Y-%m-%d %H:%M:%S"),
            remaining.as_secs()
        );
        for line in &self.settings.lines {
            let pending = count_images(&line.dest_subtree(&self.settings.centralized_folder));
            info!("  [{}] {} JPEG files pending archive", line.alias, pending);
        }
    }

    /// Stop every watcher (bounded wait each) and disconnect every configured line.
    /// Returns how many watchers missed the join timeout.
    fn drain(&self, watchers: Vec<LineWatcher>) -> usize {
        let timeout = self.settings.watcher_join_timeout;
        let timed_out = watchers
            .into_iter()
            .map(|w| w.stop(timeout))
            .filter(|stopped| !stopped)
            .count();

        for line in &self.settings.lines {
            match self.connector.disconnect(line) {
                Ok(()) => debug!("[{}] Disconnected", line.alias),
                Err(e) => warn!("[{}] Disconnect failed: {}", line.alias, e),
            }
        }
        timed_out
    }
}
