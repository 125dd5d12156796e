//! Runtime settings: compiled-in defaults, optionally overridden by a TOML file.

use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::SourceLine;
use crate::pipeline::archive::ArchiveLayout;
use crate::pipeline::watch::WatchBackend;
use crate::share::ConnectorKind;
use crate::utils::config::{DEFAULT_MOUNT_BASE, PackagePaths, RetryConsts, TimingConsts};
use crate::utils::credentials::resolve_passwords;
use crate::utils::settings_toml::{apply_file_to_settings, load_settings_toml};

/// Everything the orchestrator needs. Read-only after initialization.
#[derive(Clone, Debug)]
pub struct Settings {
    pub lines: Vec<SourceLine>,
    /// Live destination tree (`<centralized_folder>/<alias>/...`).
    pub centralized_folder: PathBuf,
    pub archive_root: PathBuf,
    /// When false the archiver never runs and the archive-presence check is skipped.
    pub archive_enabled: bool,
    pub archive_layout: ArchiveLayout,
    /// Archive interval in hours.
    pub shift_duration_hours: f64,
    pub heartbeat_interval: Duration,
    /// Supervisory loop tick.
    pub tick: Duration,
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
    pub watcher_join_timeout: Duration,
    pub connector: ConnectorKind,
    pub watch_backend: WatchBackend,
    pub poll_interval: Duration,
    /// CIFS mount points are created under this directory.
    pub mount_base: PathBuf,
}

#[cfg(windows)]
fn default_roots() -> (PathBuf, PathBuf) {
    (
        PathBuf::from("D:\\ELimagesnew\\Data_processed_new"),
        PathBuf::from("D:\\ELimagesnew\\Data_processed_new\\archive"),
    )
}

#[cfg(not(windows))]
fn default_roots() -> (PathBuf, PathBuf) {
    (
        PathBuf::from("/srv/elimages/processed"),
        PathBuf::from("/srv/elimages/processed/archive"),
    )
}

fn default_lines() -> Vec<SourceLine> {
    vec![
        SourceLine::new("172.18.100.90", "SDC5", "Galaxy", "GAL"),
        SourceLine::new("172.18.100.116", "SDC3", "Jigani", "JIG"),
        SourceLine::new("172.18.7.74", "SDC2", "vega", "VEGA"),
        SourceLine::new("172.18.100.214", "SDC5", "Mecury", "MERC"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        let (centralized_folder, archive_root) = default_roots();
        Self {
            lines: default_lines(),
            centralized_folder,
            archive_root,
            archive_enabled: true,
            archive_layout: ArchiveLayout::Mirror,
            shift_duration_hours: TimingConsts::SHIFT_HOURS,
            heartbeat_interval: Duration::from_secs(TimingConsts::HEARTBEAT_SECS),
            tick: Duration::from_millis(TimingConsts::TICK_MILLIS),
            connect_attempts: RetryConsts::CONNECT_ATTEMPTS,
            connect_retry_delay: Duration::from_secs(RetryConsts::CONNECT_DELAY_SECS),
            watcher_join_timeout: Duration::from_secs(TimingConsts::WATCHER_JOIN_TIMEOUT_SECS),
            connector: ConnectorKind::Auto,
            watch_backend: WatchBackend::Auto,
            poll_interval: Duration::from_millis(TimingConsts::POLL_INTERVAL_MILLIS),
            mount_base: PathBuf::from(DEFAULT_MOUNT_BASE),
        }
    }
}

impl Settings {
    /// Defaults, then the settings file (explicit `config` or `.elcollect.toml` in `dir`), then
    /// passwords from the environment / `.env` in `dir`. Validated before returning.
    pub fn load(config: Option<&Path>, dir: &Path) -> Result<Settings> {
        let mut settings = Settings::default();
        let (path, required) = match config {
            Some(p) => (p.to_path_buf(), true),
            None => (dir.join(PackagePaths::get().config_filename()), false),
        };
        if let Some(file) = load_settings_toml(&path, required)? {
            log::debug!("Loaded settings from {}", path.display());
            apply_file_to_settings(file, &mut settings);
        }
        resolve_passwords(&mut settings.lines, dir);
        settings.validate()?;
        Ok(settings)
    }

    /// Wall-clock period between archive runs.
    pub fn archive_interval(&self) -> Duration {
        Duration::from_secs_f64(self.shift_duration_hours * 3600.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            bail!("no production lines configured");
        }
        let mut aliases = HashSet::new();
        for line in &self.lines {
            if line.alias.trim().is_empty() {
                bail!("production line {} has an empty alias", line.address);
            }
            if line.suffix.trim().is_empty() {
                bail!("production line {} has an empty suffix", line.alias);
            }
            if line.alias.contains(['/', '\\']) {
                bail!("alias {:?} must be a single folder name", line.alias);
            }
            if !aliases.insert(line.alias.to_lowercase()) {
                bail!("duplicate production line alias {:?}", line.alias);
            }
            if self.archive_enabled
                && self
                    .archive_root
                    .starts_with(line.dest_subtree(&self.centralized_folder))
            {
                bail!(
                    "archive root {} lies inside the live folder of line {}",
                    self.archive_root.display(),
                    line.alias
                );
            }
        }
        if !(self.shift_duration_hours.is_finite()
            && self.shift_duration_hours > 0.0
            && self.shift_duration_hours <= TimingConsts::MAX_SHIFT_HOURS)
        {
            bail!(
                "shift duration must be between 0 and {} hours, got {}",
                TimingConsts::MAX_SHIFT_HOURS,
                self.shift_duration_hours
            );
        }
        if self.connect_attempts == 0 {
            bail!("connect_attempts must be at least 1");
        }
        if self.tick.is_zero() {
            bail!("tick must be greater than zero");
        }
        Ok(())
    }

    /// Create the destination and (when archiving) archive roots.
    pub fn ensure_roots(&self) -> Result<()> {
        std::fs::create_dir_all(&self.centralized_folder).with_context(|| {
            format!(
                "create centralized folder {}",
                self.centralized_folder.display()
            )
        })?;
        if self.archive_enabled {
            std::fs::create_dir_all(&self.archive_root).with_context(|| {
                format!("create archive root {}", self.archive_root.display())
            })?;
        }
        Ok(())
    }
}
