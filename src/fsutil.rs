//! Filesystem helpers for publishing downloaded captures.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// Prefix of staging files, so stray leftovers are easy to spot.
const STAGING_PREFIX: &str = ".eds-download-";

/// Attempts at publishing before giving up on a destination that keeps
/// getting taken between resolution and rename.
const MAX_PUBLISH_ATTEMPTS: usize = 8;

/// Return `path` if nothing exists there, otherwise the first free
/// `stem_N.ext` with `N` counting up from 1.
#[must_use]
pub fn resolve_unique(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().map(OsString::from).unwrap_or_default();
    let extension = path.extension();

    (1..=u32::MAX)
        .map(|index| {
            let mut name = stem.clone();
            name.push(format!("_{index}"));
            if let Some(ext) = extension {
                name.push(".");
                name.push(ext);
            }
            path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Create the parent directory of `path` (and its ancestors) if missing.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Create a uniquely named, empty staging file in `dir`.
///
/// The file is removed when the returned path is dropped unless it has
/// been published.
pub fn staging_file(dir: &Path) -> io::Result<TempPath> {
    fs::create_dir_all(dir)?;
    let file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".part")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// Move a staging file to `dest`, never overwriting an existing file.
///
/// Returns the path the file was published under, which differs from
/// `dest` when the name was already taken.
pub fn publish(staged: TempPath, dest: &Path) -> io::Result<PathBuf> {
    ensure_parent_dir(dest)?;

    let mut staged = staged;
    for _ in 0..MAX_PUBLISH_ATTEMPTS {
        let target = resolve_unique(dest);
        match staged.persist_noclobber(&target) {
            Ok(()) => return Ok(target),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => staged = err.path,
            Err(err) => return Err(err.error),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name near {}", dest.display()),
    ))
}
