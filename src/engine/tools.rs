//! Path filters and the copy / move primitives used by ingestion and archival.

use std::fs::{self, File, FileTimes};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::IngestError;
use crate::utils::config::{IMAGE_EXTENSIONS, PARTIAL_SUFFIX};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Check if a file should be excluded based on OS-specific hidden files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" | "$RECYCLE.BIN" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource forks and our own in-flight copies
                name.starts_with("._") || is_partial_copy(path)
            }
        }
    } else {
        false
    }
}

/// True for `.jpg` / `.jpeg` in any letter case.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Image files worth ingesting: image extension and not OS clutter.
pub fn is_ingestible(path: &Path) -> bool {
    has_image_extension(path) && !is_os_hidden_file(path)
}

/// Hidden temp name a copy is written to before the final rename: `.<name>.part`.
pub fn partial_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.parent()
        .unwrap_or(Path::new("."))
        .join(format!(".{name}{PARTIAL_SUFFIX}"))
}

pub fn is_partial_copy(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.ends_with(PARTIAL_SUFFIX))
        .unwrap_or(false)
}

/// `<root>/<alias>/<rel_dir>`; an empty `rel_dir` maps to the alias folder itself.
pub fn mirror_dir(root: &Path, alias: &str, rel_dir: &Path) -> PathBuf {
    let base = root.join(alias);
    if rel_dir.as_os_str().is_empty() || rel_dir == Path::new(".") {
        base
    } else {
        base.join(rel_dir)
    }
}

pub fn ensure_dir(dir: &Path) -> Result<(), IngestError> {
    fs::create_dir_all(dir).map_err(|source| IngestError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Carry access and modification times from `from` over to `to`.
fn copy_times(from: &Path, to: &Path) -> std::io::Result<()> {
    let meta = fs::metadata(from)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::options().write(true).open(to)?.set_times(times)
}

/// Copy `from` to `to` keeping permissions and timestamps. Never overwrites: an existing `to` is a
/// collision. Data goes to a hidden partial file first and is renamed into place, so a reader of the
/// destination tree never sees a half-written image. Returns bytes copied.
pub fn copy_into_place(from: &Path, to: &Path) -> Result<u64, IngestError> {
    if to.exists() {
        return Err(IngestError::Collision {
            path: to.to_path_buf(),
        });
    }
    let part = partial_path_for(to);
    let copy_err = |source| IngestError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    let bytes = match fs::copy(from, &part) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(copy_err(e));
        }
    };
    if let Err(e) = copy_times(from, &part) {
        log::debug!("Could not preserve timestamps on {}: {}", part.display(), e);
    }
    if let Err(e) = fs::rename(&part, to) {
        let _ = fs::remove_file(&part);
        return Err(copy_err(e));
    }
    Ok(bytes)
}

/// Move `from` to `to`, creating parents. Same-volume moves are a rename; cross-device (or
/// rename-denied) moves degrade to copy + delete and are not atomic. An existing `to` is replaced.
pub fn move_file(from: &Path, to: &Path) -> Result<(), IngestError> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    let move_err = |source| IngestError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(rename_err)
            if matches!(
                rename_err.kind(),
                ErrorKind::CrossesDevices | ErrorKind::PermissionDenied
            ) =>
        {
            fs::copy(from, to).map_err(move_err)?;
            if let Err(e) = copy_times(from, to) {
                log::debug!("Could not preserve timestamps on {}: {}", to.display(), e);
            }
            fs::remove_file(from).map_err(move_err)
        }
        Err(rename_err) => Err(move_err(rename_err)),
    }
}

/// Number of ingestible image files under `dir` (0 when missing).
pub fn count_images(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_ingestible(e.path()))
        .count()
}
