//! CLI command handler: load settings, wire collaborators, run one session until Ctrl+C.

use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::codec::SystemClock;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::watch::NotifyWatchService;
use crate::share::build_connector;
use crate::utils::{Settings, setup_logging};

pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose);
    let cwd = std::env::current_dir().context("get current directory")?;
    let settings = Settings::load(cli.config.as_deref(), &cwd)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&shutdown);
    // Ctrl+C / SIGTERM: the supervisory loop notices within one tick.
    if let Err(e) = ctrlc::set_handler(move || {
        s.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let connector = build_connector(settings.connector, &settings.mount_base);
    let watch_service = Arc::new(NotifyWatchService::new(
        settings.watch_backend,
        settings.poll_interval,
    ));
    let mut orchestrator = Orchestrator::new(
        settings,
        connector,
        watch_service,
        Arc::new(SystemClock),
        shutdown,
    );
    let summary = orchestrator.run()?;
    info!(
        "Session ended: {} lines connected, {} failed, {} archive runs",
        summary.connected.len(),
        summary.failed_to_connect.len(),
        summary.archive_runs.len()
    );
    Ok(())
}
