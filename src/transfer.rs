//! Download of captured objects to their final location.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::fsutil;
use crate::traits::{CameraError, CameraSdk, ObjectRef, Result};

/// Download `object` and publish it at (or next to) `dest`.
///
/// A directory destination receives the device-side file name. The file
/// is staged in `staging_dir`, or in the destination directory when
/// `None`, and moved into place without overwriting anything. The object
/// reference is released whether or not the transfer succeeds.
pub fn transfer<S: CameraSdk>(
    sdk: &mut S,
    object: ObjectRef,
    dest: &Path,
    staging_dir: Option<&Path>,
) -> Result<PathBuf> {
    let result = download_and_publish(sdk, object, dest, staging_dir);
    sdk.release_object(object);
    result
}

fn download_and_publish<S: CameraSdk>(
    sdk: &mut S,
    object: ObjectRef,
    dest: &Path,
    staging_dir: Option<&Path>,
) -> Result<PathBuf> {
    let item = sdk
        .item_info(object)
        .map_err(|code| failed(format!("cannot read object info: {code}")))?;
    if item.is_folder {
        return Err(failed(format!("{} is a folder", item.file_name)));
    }

    let dest = if dest.is_dir() {
        dest.join(&item.file_name)
    } else {
        dest.to_path_buf()
    };
    let staging_dir = staging_dir.map_or_else(|| parent_dir(&dest), Path::to_path_buf);

    let staged = fsutil::staging_file(&staging_dir)
        .map_err(|err| failed(format!("cannot create staging file in {}: {err}", staging_dir.display())))?;
    debug!(file = %item.file_name, size = item.size, staged = %staged.display(), "downloading capture");

    sdk.download(object, item.size, &staged)
        .map_err(|code| failed(format!("download of {} failed: {code}", item.file_name)))?;
    sdk.download_complete(object)
        .map_err(|code| failed(format!("download of {} not acknowledged: {code}", item.file_name)))?;

    let published = fsutil::publish(staged, &dest)
        .map_err(|err| failed(format!("cannot move capture to {}: {err}", dest.display())))?;
    info!(path = %published.display(), bytes = item.size, "capture transferred");
    Ok(published)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

const fn failed(reason: String) -> CameraError {
    CameraError::TransferFailed(reason)
}
