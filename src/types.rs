//! Public types shared by the codec, pipeline and orchestrator.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One monitored production line: a network share plus the naming data used for its files.
///
/// Immutable once loaded; the orchestrator hands clones to each worker.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SourceLine {
    /// Host name or IP of the line PC (a local directory for the `local` connector).
    pub address: String,
    pub username: String,
    /// Empty when the credential is expected from the environment.
    #[serde(default)]
    pub password: String,
    /// Display alias; also the top-level folder under the destination and archive roots.
    pub alias: String,
    /// Production-line token embedded in every canonical filename.
    pub suffix: String,
    /// Shared folder name on the line PC.
    #[serde(default = "default_shared_folder")]
    pub shared_folder: String,
}

fn default_shared_folder() -> String {
    crate::utils::config::DEFAULT_SHARED_FOLDER.to_string()
}

impl SourceLine {
    pub fn new(address: &str, username: &str, alias: &str, suffix: &str) -> Self {
        Self {
            address: address.to_string(),
            username: username.to_string(),
            password: String::new(),
            alias: alias.to_string(),
            suffix: suffix.to_string(),
            shared_folder: default_shared_folder(),
        }
    }

    /// UNC form of the share, e.g. `\\172.18.100.116\ELimagesnew`.
    pub fn unc_path(&self) -> String {
        format!("\\\\{}\\{}", self.address, self.shared_folder)
    }

    /// `<dest_root>/<alias>`
    pub fn dest_subtree(&self, dest_root: &Path) -> PathBuf {
        dest_root.join(&self.alias)
    }
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - Suffix: {}",
            self.alias, self.address, self.suffix
        )
    }
}

/// Single-letter quality classification embedded in canonical names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualityGrade {
    /// Normal / good part.
    A,
    /// Not-good part.
    Z,
}

impl QualityGrade {
    pub fn token(self) -> char {
        match self {
            QualityGrade::A => 'A',
            QualityGrade::Z => 'Z',
        }
    }

    /// Human label used in processed-file log lines.
    pub fn label(self) -> &'static str {
        match self {
            QualityGrade::A => "Normal",
            QualityGrade::Z => "NG",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Raw change notification delivered by a watch service. Directories never appear here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsEvent {
    Created(PathBuf),
    Modified(PathBuf),
}

impl FsEvent {
    pub fn path(&self) -> &Path {
        match self {
            FsEvent::Created(p) | FsEvent::Modified(p) => p,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            FsEvent::Created(_) => "New",
            FsEvent::Modified(_) => "Modified",
        }
    }
}

/// What happened to one candidate source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Copied to this destination path.
    Copied(PathBuf),
    /// Already in the ledger.
    AlreadyProcessed,
    /// Found in the archive tree; recorded without copying.
    AlreadyArchived,
    /// Not an image (or OS clutter); ignored.
    Ignored,
}
