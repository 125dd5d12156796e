//! Pipeline components: ingest context, backlog scan, live watchers, archiver, orchestrator.

pub mod archive;
pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod scan;
pub mod watch;

pub use archive::{ArchiveLayout, ArchiveReport, ArchiveTree, Archiver, LineArchiveReport};
pub use context::IngestContext;
pub use error_handler::report_skipped_paths;
pub use orchestrator::{Orchestrator, Phase, RunSummary};
pub use scan::{ScanReport, WalkOutcome, scan_backlog, to_outcome_walkdir};
pub use watch::{
    FileEventHandler, LineWatcher, NotifyWatchService, Subscription, WatchBackend, WatchService,
    translate_event,
};
