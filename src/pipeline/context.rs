//! Per-line ingest context: the copy-and-rename path shared by the backlog scan and live watchers.

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::classify::classify_path;
use crate::engine::codec::{Clock, canonical_name};
use crate::engine::ledger::ProcessedLedger;
use crate::engine::tools::{copy_into_place, ensure_dir, is_ingestible, mirror_dir, path_relative_to};
use crate::error::IngestError;
use crate::pipeline::archive::ArchiveTree;
use crate::{IngestOutcome, SourceLine};

/// Everything one line needs to turn a source file into a destination entry.
/// Built by the orchestrator after the line connects; shared with that line's watcher thread.
pub struct IngestContext {
    pub line: SourceLine,
    /// Connected, locally addressable root of the line's share.
    pub source_root: PathBuf,
    /// `centralized_folder`; files land under `<dest_root>/<alias>/...`.
    pub dest_root: PathBuf,
    /// Present when archival is enabled: files already archived are not copied again.
    pub archive: Option<ArchiveTree>,
    pub ledger: Arc<ProcessedLedger>,
    pub clock: Arc<dyn Clock>,
}

impl IngestContext {
    pub fn alias(&self) -> &str {
        &self.line.alias
    }

    /// Directory of `source_file` relative to the share root. Files outside the root map to the root.
    pub fn relative_dir(&self, source_file: &Path) -> PathBuf {
        path_relative_to(source_file, &self.source_root)
            .and_then(|rel| rel.parent().map(Path::to_path_buf))
            .unwrap_or_default()
    }

    /// `source_file` relative to the share root. Files outside the root keep only their name.
    pub fn relative_file(&self, source_file: &Path) -> PathBuf {
        path_relative_to(source_file, &self.source_root)
            .or_else(|| source_file.file_name().map(PathBuf::from))
            .unwrap_or_default()
    }

    /// Mirrored destination directory for `source_file`.
    pub fn destination_dir(&self, source_file: &Path) -> PathBuf {
        mirror_dir(&self.dest_root, self.alias(), &self.relative_dir(source_file))
    }

    /// Copy `source_file` into the destination tree unless the ledger or the archive says it was
    /// already handled. The ledger lock is held from the membership check until the insert, so
    /// concurrent events for one path produce at most one copy.
    ///
    /// `detected` is the event label (`New`, `Modified`) for watcher-driven calls.
    pub fn ingest(
        &self,
        source_file: &Path,
        detected: Option<&str>,
    ) -> Result<IngestOutcome, IngestError> {
        if !is_ingestible(source_file) {
            return Ok(IngestOutcome::Ignored);
        }

        let mut ledger = self.ledger.lock();
        if ledger.contains(source_file) {
            return Ok(IngestOutcome::AlreadyProcessed);
        }

        let original = source_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rel_dir = self.relative_dir(source_file);
        if let Some(archive) = &self.archive
            && archive.contains_original(self.alias(), &rel_dir, &original, &self.line.suffix)
        {
            info!(
                "[{}] File {} already exists in archive. Skipping...",
                self.alias(),
                original
            );
            ledger.insert(source_file);
            return Ok(IngestOutcome::AlreadyArchived);
        }

        if let Some(label) = detected {
            info!(
                "[{}] {} JPEG file detected: {}",
                self.alias(),
                label,
                source_file.display()
            );
        }

        if source_file.is_dir() {
            return Err(IngestError::NotAFile {
                path: source_file.to_path_buf(),
            });
        }

        let dest_dir = mirror_dir(&self.dest_root, self.alias(), &rel_dir);
        ensure_dir(&dest_dir)?;

        // Every segment below the share root grades, the filename included.
        let rel_file = self.relative_file(source_file);
        let grade = classify_path(&rel_file);
        let new_name = canonical_name(&original, &rel_file, &self.line.suffix, self.clock.as_ref());
        let dest_file = dest_dir.join(&new_name);

        copy_into_place(source_file, &dest_file)?;
        ledger.insert(source_file);
        drop(ledger);

        info!(
            "[{}] Processed: {} -> {} (Quality: {})",
            self.alias(),
            original,
            new_name,
            grade.label()
        );
        debug!("  Source: {}", source_file.display());
        debug!("  Destination: {}", dest_file.display());
        Ok(IngestOutcome::Copied(dest_file))
    }
}
