//! Share passwords: value from the settings file → env var → `.env` in the working directory.

use log::{debug, warn};
use std::path::Path;

use crate::SourceLine;
use crate::utils::config::PackagePaths;

fn try_env_then_dotenv(key: &str, dir: &Path) -> Option<String> {
    if let Ok(s) = std::env::var(key) {
        let s = s.trim().to_string();
        if !s.is_empty() {
            return Some(s);
        }
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Ok(s) = std::env::var(key) {
            let s = s.trim().to_string();
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// Fill empty passwords from `ELCOLLECT_PASSWORD_<ALIAS>`. Lines that stay empty are left for the
/// connector to reject.
pub fn resolve_passwords(lines: &mut [SourceLine], dir: &Path) {
    for line in lines.iter_mut().filter(|l| l.password.is_empty()) {
        let key = PackagePaths::get().password_env_var(&line.alias);
        match try_env_then_dotenv(&key, dir) {
            Some(pass) => {
                debug!("[{}] Password found in environment ({})", line.alias, key);
                line.password = pass;
            }
            None => warn!("[{}] No password configured; set {}", line.alias, key),
        }
    }
}
