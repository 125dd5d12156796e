//! Share connectors: turn a [`SourceLine`] into a locally addressable root, and release it again.

mod cifs;
mod local;
mod net_use;
pub mod network;

pub use cifs::CifsConnector;
pub use local::LocalConnector;
pub use net_use::NetUseConnector;

use log::{info, warn};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::SourceLine;
use crate::error::ShareError;

/// Which connector the orchestrator uses for every line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorKind {
    /// `net-use` on Windows, `cifs` on Linux, `local` elsewhere.
    #[default]
    Auto,
    NetUse,
    Cifs,
    Local,
}

impl ConnectorKind {
    /// Resolve `Auto` for the running platform.
    pub fn resolve(self) -> ConnectorKind {
        match self {
            ConnectorKind::Auto if cfg!(windows) => ConnectorKind::NetUse,
            ConnectorKind::Auto if cfg!(target_os = "linux") => ConnectorKind::Cifs,
            ConnectorKind::Auto => ConnectorKind::Local,
            other => other,
        }
    }
}

/// Credential-based access to one line's share.
pub trait ShareConnector: Send + Sync {
    /// Establish access and return the root to scan and watch.
    fn connect(&self, line: &SourceLine) -> Result<PathBuf, ShareError>;

    /// Release access. Called for every configured line at shutdown, connected or not.
    fn disconnect(&self, line: &SourceLine) -> Result<(), ShareError>;
}

pub fn build_connector(kind: ConnectorKind, mount_base: &Path) -> Arc<dyn ShareConnector> {
    match kind.resolve() {
        ConnectorKind::NetUse => Arc::new(NetUseConnector),
        ConnectorKind::Cifs => Arc::new(CifsConnector::new(mount_base)),
        ConnectorKind::Local | ConnectorKind::Auto => Arc::new(LocalConnector),
    }
}

/// Probe `path` up to `attempts` times, sleeping `delay` between probes.
pub fn is_path_accessible(path: &Path, attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=attempts.max(1) {
        if path.exists() {
            return true;
        }
        if attempt < attempts {
            thread::sleep(delay);
        }
    }
    false
}

/// Connect `line` with up to `attempts` tries and a fixed `delay` between them. A connect that
/// succeeds but leaves the root unreachable counts as a failed attempt.
pub fn connect_with_retry(
    connector: &dyn ShareConnector,
    line: &SourceLine,
    attempts: u32,
    delay: Duration,
) -> Result<PathBuf, ShareError> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match connector.connect(line) {
            Ok(root) => {
                info!("[{}] Connected to {}", line.alias, root.display());
                if is_path_accessible(&root, attempts, delay) {
                    return Ok(root);
                }
                warn!(
                    "[{}] Connected to {} but path is not accessible",
                    line.alias,
                    root.display()
                );
                last_err = Some(ShareError::Inaccessible { path: root });
            }
            Err(e) => {
                warn!(
                    "[{}] Attempt {} of {} failed: {}",
                    line.alias, attempt, attempts, e
                );
                last_err = Some(e);
            }
        }
        if attempt < attempts {
            thread::sleep(delay);
        }
    }
    Err(last_err.unwrap_or_else(|| ShareError::Connect {
        target: line.unc_path(),
        reason: "no connection attempt was made".to_string(),
    }))
}

/// Run an external share command; a non-zero exit becomes the trimmed stderr (or stdout).
fn run_share_command(cmd: &mut Command) -> Result<(), String> {
    let output = cmd.output().map_err(|e| format!("failed to run command: {e}"))?;
    command_result(&output)
}

/// Like [`run_share_command`] but feeds `input` (one line) on stdin.
fn run_share_command_with_input(cmd: &mut Command, input: &str) -> Result<(), String> {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to run command: {e}"))?;
    if let Some(mut stdin) = child.stdin.take() {
        // A child that exits early closes its end; its exit status carries the real error.
        let _ = writeln!(stdin, "{input}");
    }
    let output = child
        .wait_with_output()
        .map_err(|e| format!("failed to wait for command: {e}"))?;
    command_result(&output)
}

fn command_result(output: &Output) -> Result<(), String> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(if stderr.is_empty() {
        format!("{} ({})", stdout, output.status)
    } else {
        format!("{} ({})", stderr, output.status)
    })
}
