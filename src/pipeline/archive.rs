//! Periodic relocation of processed images from the destination tree into the archive tree.

use chrono::NaiveDateTime;
use log::{debug, error, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SourceLine;
use crate::engine::codec::{Clock, is_canonical_for};
use crate::engine::tools::{has_image_extension, is_os_hidden_file, move_file, path_relative_to};
use crate::utils::rule;

/// Where a line's files land under the archive root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveLayout {
    /// `<archive_root>/<alias>/<relative_subpath>/<name>`
    #[default]
    Mirror,
    /// `<archive_root>/<YYYY>/<MM>/<DD>/<alias>/<relative_subpath>/<name>`, dated by the archive run.
    Dated,
}

/// The archive root plus its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTree {
    pub root: PathBuf,
    pub layout: ArchiveLayout,
}

impl ArchiveTree {
    pub fn new(root: impl Into<PathBuf>, layout: ArchiveLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Archive folder for `alias` for a run at `at`.
    pub fn alias_dir(&self, alias: &str, at: NaiveDateTime) -> PathBuf {
        match self.layout {
            ArchiveLayout::Mirror => self.root.join(alias),
            ArchiveLayout::Dated => self
                .root
                .join(at.format("%Y").to_string())
                .join(at.format("%m").to_string())
                .join(at.format("%d").to_string())
                .join(alias),
        }
    }

    /// Every existing archive folder for `alias` (one for mirror, one per archived day for dated).
    pub fn existing_alias_dirs(&self, alias: &str) -> Vec<PathBuf> {
        match self.layout {
            ArchiveLayout::Mirror => {
                let dir = self.root.join(alias);
                if dir.is_dir() { vec![dir] } else { Vec::new() }
            }
            ArchiveLayout::Dated => {
                if !self.root.is_dir() {
                    return Vec::new();
                }
                walkdir::WalkDir::new(&self.root)
                    .min_depth(3)
                    .max_depth(3)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_dir())
                    .map(|e| e.into_path().join(alias))
                    .filter(|p| p.is_dir())
                    .collect()
            }
        }
    }

    /// True when the mirrored folder `rel_dir` of some alias archive holds `original_name` itself
    /// or a canonical name derived from it. Only that one folder is listed per archive day, never
    /// the whole subtree.
    pub fn contains_original(
        &self,
        alias: &str,
        rel_dir: &Path,
        original_name: &str,
        suffix: &str,
    ) -> bool {
        self.existing_alias_dirs(alias).iter().any(|dir| {
            let folder = dir.join(rel_dir);
            if !folder.is_dir() {
                return false;
            }
            walkdir::WalkDir::new(&folder)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .any(|e| {
                    let name = e.file_name().to_string_lossy();
                    name == original_name || is_canonical_for(&name, original_name, suffix)
                })
        })
    }
}

/// Per-line result of one archive run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineArchiveReport {
    pub alias: String,
    /// False when the line's destination folder did not exist.
    pub folder_found: bool,
    pub found: usize,
    pub moved: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub started_at: Option<NaiveDateTime>,
    pub lines: Vec<LineArchiveReport>,
}

impl ArchiveReport {
    pub fn total_found(&self) -> usize {
        self.lines.iter().map(|l| l.found).sum()
    }

    pub fn total_moved(&self) -> usize {
        self.lines.iter().map(|l| l.moved).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.lines.iter().map(|l| l.failed).sum()
    }
}

/// Moves every image under `<dest_root>/<alias>` into the archive tree, per configured line.
pub struct Archiver {
    dest_root: PathBuf,
    tree: ArchiveTree,
    lines: Vec<SourceLine>,
    clock: Arc<dyn Clock>,
}

impl Archiver {
    pub fn new(
        dest_root: impl Into<PathBuf>,
        tree: ArchiveTree,
        lines: Vec<SourceLine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dest_root: dest_root.into(),
            tree,
            lines,
            clock,
        }
    }

    pub fn tree(&self) -> &ArchiveTree {
        &self.tree
    }

    /// One archive pass over every line. A missing line folder or a failed move is logged and the
    /// run continues with the next file or line.
    pub fn run_once(&self) -> ArchiveReport {
        let now = self.clock.now();
        info!("{}", rule(60));
        info!(
            "STARTING ARCHIVAL PROCESS AT {}",
            now.format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", rule(60));

        let lines = self
            .lines
            .iter()
            .map(|line| self.archive_line(line, now))
            .collect();
        let report = ArchiveReport {
            started_at: Some(now),
            lines,
        };

        let found = report.total_found();
        info!("{}", rule(60));
        if found == 0 {
            info!("ARCHIVAL COMPLETE: no files to archive");
        } else {
            info!(
                "ARCHIVAL COMPLETE: {}/{} files archived to {} ({} failed)",
                report.total_moved(),
                found,
                self.tree.root.display(),
                report.total_failed()
            );
        }
        info!("{}", rule(60));
        report
    }

    fn archive_line(&self, line: &SourceLine, now: NaiveDateTime) -> LineArchiveReport {
        let alias = line.alias.as_str();
        let mut report = LineArchiveReport {
            alias: alias.to_string(),
            ..LineArchiveReport::default()
        };
        let source_dir = line.dest_subtree(&self.dest_root);
        if !source_dir.is_dir() {
            info!(
                "[{}] Source folder not found: {}",
                alias,
                source_dir.display()
            );
            return report;
        }
        report.folder_found = true;
        let target_dir = self.tree.alias_dir(alias, now);

        let files: Vec<PathBuf> = walkdir::WalkDir::new(&source_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| has_image_extension(p) && !is_os_hidden_file(p))
            .collect();
        report.found = files.len();
        if files.is_empty() {
            info!("[{}] No JPEG files found to archive", alias);
            return report;
        }

        for file in &files {
            let dest = archived_path(file, &source_dir, &target_dir);
            match move_file(file, &dest) {
                Ok(()) => {
                    report.moved += 1;
                    debug!(
                        "[{}] Archived: {} -> {}",
                        alias,
                        file.display(),
                        dest.display()
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!("[{}] Archive failed: {}", alias, e);
                }
            }
        }
        info!(
            "[{}] Archived {}/{} files to {} ({} failed)",
            alias,
            report.moved,
            report.found,
            target_dir.display(),
            report.failed
        );
        report
    }
}

/// Mirrored position of `file` (under `source_dir`) inside `target_dir`.
fn archived_path(file: &Path, source_dir: &Path, target_dir: &Path) -> PathBuf {
    match path_relative_to(file, source_dir) {
        Some(rel) => target_dir.join(rel),
        None => target_dir.join(file.file_name().unwrap_or(file.as_os_str())),
    }
}
