//! Quality grade from folder names.

use std::path::Path;

use crate::QualityGrade;

/// Grade a path by its segments, scanned root to leaf.
///
/// Per segment the `NG` check runs before the `NORMAL` check and the first hit of either returns,
/// so `NG/Normal/x` is `Z` and `Normal/NG/x` is `A`. Both checks are case-insensitive substring
/// matches. With no hit the grade is `A`. Backslash and slash both separate segments so UNC-style
/// strings grade the same on every platform.
pub fn classify_path(path: &Path) -> QualityGrade {
    classify_str(&path.to_string_lossy())
}

pub fn classify_str(path: &str) -> QualityGrade {
    for part in path.split(['/', '\\']) {
        let upper = part.to_uppercase();
        if upper.contains("NG") {
            return QualityGrade::Z;
        }
        if upper.contains("NORMAL") {
            return QualityGrade::A;
        }
    }
    QualityGrade::A
}
