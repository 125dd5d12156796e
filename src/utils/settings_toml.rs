//! Load `.elcollect.toml` (or the `--config` file). Only fields present in the file override defaults.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::SourceLine;
use crate::pipeline::archive::ArchiveLayout;
use crate::pipeline::watch::WatchBackend;
use crate::share::ConnectorKind;
use crate::utils::Settings;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
    /// When present, replaces the compiled-in line table.
    lines: Option<Vec<SourceLine>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    centralized_folder: Option<String>,
    archive_root: Option<String>,
    archive_enabled: Option<bool>,
    archive_layout: Option<ArchiveLayout>,
    shift_duration_hours: Option<f64>,
    heartbeat_interval_secs: Option<u64>,
    tick_millis: Option<u64>,
    connect_attempts: Option<u32>,
    connect_retry_delay_secs: Option<u64>,
    watcher_join_timeout_secs: Option<u64>,
    connector: Option<ConnectorKind>,
    watch_backend: Option<WatchBackend>,
    poll_interval_millis: Option<u64>,
    mount_base: Option<String>,
    shared_folder: Option<String>,
}

/// Read and parse `path`. A missing file is `Ok(None)` unless `required`; a malformed file is an error.
pub fn load_settings_toml(path: &Path, required: bool) -> Result<Option<SettingsToml>> {
    if !path.is_file() {
        if required {
            bail!("settings file not found: {}", path.display());
        }
        return Ok(None);
    }
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    let parsed = parse_settings_toml(&s)
        .with_context(|| format!("parse settings file {}", path.display()))?;
    Ok(Some(parsed))
}

pub fn parse_settings_toml(s: &str) -> Result<SettingsToml> {
    Ok(toml::from_str(s)?)
}

/// Overwrite settings field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $settings:expr, $sec_field:ident => $settings_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $settings.$settings_field = v;
        }
    };
    ($sec:expr, $settings:expr, $sec_field:ident => $settings_field:ident, $conv:expr) => {
        if let Some(v) = $sec.$sec_field {
            $settings.$settings_field = $conv(v);
        }
    };
}

/// Apply file config to settings (only fields present in the file).
pub fn apply_file_to_settings(file: SettingsToml, settings: &mut Settings) {
    let sec = file.settings;
    apply_file_opt!(sec, settings, centralized_folder => centralized_folder, PathBuf::from);
    apply_file_opt!(sec, settings, archive_root => archive_root, PathBuf::from);
    apply_file_opt!(sec, settings, archive_enabled => archive_enabled);
    apply_file_opt!(sec, settings, archive_layout => archive_layout);
    apply_file_opt!(sec, settings, shift_duration_hours => shift_duration_hours);
    apply_file_opt!(sec, settings, heartbeat_interval_secs => heartbeat_interval, Duration::from_secs);
    apply_file_opt!(sec, settings, tick_millis => tick, Duration::from_millis);
    apply_file_opt!(sec, settings, connect_attempts => connect_attempts);
    apply_file_opt!(sec, settings, connect_retry_delay_secs => connect_retry_delay, Duration::from_secs);
    apply_file_opt!(sec, settings, watcher_join_timeout_secs => watcher_join_timeout, Duration::from_secs);
    apply_file_opt!(sec, settings, connector => connector);
    apply_file_opt!(sec, settings, watch_backend => watch_backend);
    apply_file_opt!(sec, settings, poll_interval_millis => poll_interval, Duration::from_millis);
    apply_file_opt!(sec, settings, mount_base => mount_base, PathBuf::from);

    if let Some(lines) = file.lines {
        settings.lines = lines;
    }
    // A global shared folder applies to every line that kept the default.
    if let Some(folder) = sec.shared_folder {
        let default = crate::utils::config::DEFAULT_SHARED_FOLDER;
        for line in settings.lines.iter_mut().filter(|l| l.shared_folder == default) {
            line.shared_folder = folder.clone();
        }
    }
}
