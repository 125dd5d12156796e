//! Backlog scan: walk a connected share once and ingest every image the ledger has not seen.

use log::{debug, error, info, warn};
use std::path::PathBuf;

use crate::IngestOutcome;
use crate::engine::tools::{ensure_dir, is_ingestible, mirror_dir, path_relative_to};

use super::context::IngestContext;
use super::error_handler::report_skipped_paths;

/// One result from a directory walk: either a path to consider or an error with optional path.
pub enum WalkOutcome {
    Ok { path: PathBuf, is_dir: bool },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => {
            let is_dir = entry.file_type().is_dir();
            WalkOutcome::Ok {
                path: entry.into_path(),
                is_dir,
            }
        }
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Counters for one line's backlog scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub alias: String,
    /// Image files encountered.
    pub seen: usize,
    pub copied: usize,
    /// Already in the ledger.
    pub skipped: usize,
    /// Found in the archive and not copied.
    pub archived: usize,
    /// Per-file copy failures (logged, not fatal).
    pub failed: usize,
    /// Entries the walk could not read, with the error message.
    pub unreadable: Vec<(PathBuf, String)>,
    /// False when the source root did not exist.
    pub root_found: bool,
}

/// Walk `ctx.source_root` and ingest every image file not already recorded.
///
/// The destination folder structure is replicated for every directory walked, including empty ones.
/// A missing root is logged and yields an empty report. Unreadable entries and per-file copy errors
/// are logged and counted; the walk always continues.
pub fn scan_backlog(ctx: &IngestContext) -> ScanReport {
    let alias = ctx.alias().to_string();
    let mut report = ScanReport {
        alias: alias.clone(),
        ..ScanReport::default()
    };

    if !ctx.source_root.is_dir() {
        warn!(
            "[{}] Source folder does not exist: {}",
            alias,
            ctx.source_root.display()
        );
        return report;
    }
    report.root_found = true;
    info!(
        "[{}] Scanning existing files in {}",
        alias,
        ctx.source_root.display()
    );

    let iter = walkdir::WalkDir::new(&ctx.source_root)
        .into_iter()
        .map(to_outcome_walkdir);
    let mut last_path: Option<PathBuf> = None;

    for outcome in iter {
        match outcome {
            WalkOutcome::Ok { path, is_dir: true } => {
                let rel = path_relative_to(&path, &ctx.source_root).unwrap_or_default();
                let dir = mirror_dir(&ctx.dest_root, &alias, &rel);
                if let Err(e) = ensure_dir(&dir) {
                    warn!("[{}] {}", alias, e);
                }
                last_path = Some(path);
            }
            WalkOutcome::Ok { path, is_dir: false } => {
                if is_ingestible(&path) {
                    report.seen += 1;
                    match ctx.ingest(&path, None) {
                        Ok(IngestOutcome::Copied(_)) => report.copied += 1,
                        Ok(IngestOutcome::AlreadyProcessed) => {
                            debug!("[{}] Already processed: {}", alias, path.display());
                            report.skipped += 1;
                        }
                        Ok(IngestOutcome::AlreadyArchived) => report.archived += 1,
                        Ok(IngestOutcome::Ignored) => {}
                        Err(e) => {
                            error!("[{}] Error copying {}: {}", alias, path.display(), e);
                            report.failed += 1;
                        }
                    }
                }
                last_path = Some(path);
            }
            WalkOutcome::Err { msg, path } => {
                // Errors without a path still count; name them after the last entry seen.
                let to_push = path.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "<no-path, last was {}>",
                        last_path
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "<none>".to_string())
                    ))
                });
                report.unreadable.push((to_push, msg));
            }
        }
    }

    report_skipped_paths(&alias, &report.unreadable);
    if report.copied > 0 {
        info!("[{}] Total files processed: {}", alias, report.copied);
    } else {
        info!("[{}] No new files to process.", alias);
    }
    report
}
