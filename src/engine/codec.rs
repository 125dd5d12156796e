//! Canonical destination filenames: `<stem>_<suffix>_<grade>_<YYMMDD_HHMMSS><.ext>`.
//!
//! The timestamp is the wall-clock time of the encode call, never the source file's mtime. Two
//! files with the same stem, suffix and grade encoded within the same second map to the same name;
//! the copy path refuses to overwrite in that case (see [`IngestError::Collision`](crate::error::IngestError)).

use chrono::{Local, NaiveDateTime};
use std::path::Path;

use crate::QualityGrade;
use crate::engine::classify::classify_path;
use crate::utils::config::CANONICAL_TIMESTAMP_FORMAT;

/// Source of "now" for canonical names. Injected so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Split a filename into `(stem, extension)` where the extension keeps its leading dot.
///
/// Leading dots belong to the stem (`.jpg` has no extension); an empty name gives two empty strings.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Build the canonical name for `original_name` with an explicit grade and instant.
pub fn canonical_name_with_grade(
    original_name: &str,
    suffix: &str,
    grade: QualityGrade,
    at: NaiveDateTime,
) -> String {
    let (stem, ext) = split_name(original_name);
    format!(
        "{}_{}_{}_{}{}",
        stem,
        suffix,
        grade.token(),
        at.format(CANONICAL_TIMESTAMP_FORMAT),
        ext
    )
}

/// Encode `original_name` for a file found at `source_path` on the line with `suffix`.
///
/// The grade comes from [`classify_path`] applied to `source_path`; callers pass the path relative
/// to the share root so the mount location never affects the grade.
pub fn canonical_name(
    original_name: &str,
    source_path: &Path,
    suffix: &str,
    clock: &dyn Clock,
) -> String {
    canonical_name_with_grade(original_name, suffix, classify_path(source_path), clock.now())
}

/// True when `candidate` is a canonical name produced from `original_name` for `suffix`, at any
/// grade and any timestamp. Used by the archive-presence check.
pub fn is_canonical_for(candidate: &str, original_name: &str, suffix: &str) -> bool {
    let (stem, ext) = split_name(original_name);
    let Some(rest) = candidate.strip_prefix(stem) else {
        return false;
    };
    let Some(rest) = rest.strip_suffix(ext) else {
        return false;
    };
    let Some(rest) = rest
        .strip_prefix('_')
        .and_then(|r| r.strip_prefix(suffix))
        .and_then(|r| r.strip_prefix('_'))
    else {
        return false;
    };
    let mut chars = rest.chars();
    let grade_ok = matches!(chars.next(), Some('A' | 'Z'));
    let rest = chars.as_str();
    let Some(stamp) = rest.strip_prefix('_') else {
        return false;
    };
    grade_ok && NaiveDateTime::parse_from_str(stamp, CANONICAL_TIMESTAMP_FORMAT).is_ok()
}
