//! Error taxonomy for the component seams. Application code wraps these in `anyhow`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Share connector failures. All of them exclude the line for the session, none is fatal.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },
    #[error("connected but path is not accessible: {}", path.display())]
    Inaccessible { path: PathBuf },
    #[error("failed to disconnect {target}: {reason}")]
    Disconnect { target: String, reason: String },
    #[error("connector `{0}` is not supported on this platform")]
    Unsupported(&'static str),
}

/// Per-file failures while copying into the destination tree or moving into the archive.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("destination already exists: {}", path.display())]
    Collision { path: PathBuf },
    #[error("source is not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },
}

/// Watch subscription setup failures. The line keeps its backfill result but has no live monitoring.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch root does not exist: {}", root.display())]
    RootMissing { root: PathBuf },
    #[error("failed to watch {}: {source}", root.display())]
    Subscribe {
        root: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to spawn watcher thread for {alias}: {source}")]
    Spawn {
        alias: String,
        #[source]
        source: io::Error,
    },
}
