//! Application configuration constants.
//! Defaults and fixed names in one place; runtime values live in [`Settings`](crate::utils::Settings).

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Settings file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable holding the share password for `alias`.
    pub fn password_env_var(&self, alias: &str) -> String {
        format!("{}_PASSWORD_{}", self.env_prefix, alias.to_uppercase())
    }
}

// ---- Files ----

/// Extensions (lower-case, no dot) that count as inspection images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Suffix of the hidden temp file a copy is written to before it is renamed into place.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Shared folder name on each line PC unless a line overrides it.
pub const DEFAULT_SHARED_FOLDER: &str = "ELimagesnew";

/// `chrono` format of the timestamp embedded in canonical names (`YYMMDD_HHMMSS`).
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%y%m%d_%H%M%S";

// ---- Timing ----

/// Supervisory loop and retry defaults.
pub struct TimingConsts;

impl TimingConsts {
    pub const HEARTBEAT_SECS: u64 = 60;
    /// Supervisory loop tick; bounds shutdown latency.
    pub const TICK_MILLIS: u64 = 1000;
    /// Archive countdown is logged (debug) every this many seconds.
    pub const ARCHIVE_COUNTDOWN_SECS: u64 = 10;
    /// Hours between archive runs (one shift).
    pub const SHIFT_HOURS: f64 = 8.0;
    /// Upper bound for `shift_duration_hours` (one year).
    pub const MAX_SHIFT_HOURS: f64 = 24.0 * 366.0;
    pub const WATCHER_JOIN_TIMEOUT_SECS: u64 = 5;
    /// How often a watcher thread re-checks its stop flag while idle.
    pub const WATCHER_IDLE_MILLIS: u64 = 200;
    pub const POLL_INTERVAL_MILLIS: u64 = 2000;
}

/// Connection retry defaults.
pub struct RetryConsts;

impl RetryConsts {
    pub const CONNECT_ATTEMPTS: u32 = 3;
    pub const CONNECT_DELAY_SECS: u64 = 2;
}

// ---- Mounts ----

/// Parent directory for CIFS mount points on Linux (`<base>/<alias>`).
pub const DEFAULT_MOUNT_BASE: &str = "/mnt/elcollect";
