use std::path::PathBuf;

/// Log entries a walk could not read: a warning with the count, then one debug line per path.
pub fn report_skipped_paths(alias: &str, skipped: &[(PathBuf, String)]) {
    if skipped.is_empty() {
        return;
    }
    log::warn!(
        "[{}] Skipped {} paths due to permission errors or access issues",
        alias,
        skipped.len()
    );
    for (p, msg) in skipped {
        log::debug!("  skipped: {} ({})", p.display(), msg);
    }
}
