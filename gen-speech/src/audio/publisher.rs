//! Moving a finished scratch file into place next to its source.

use crate::error::{ConversionError, Result};
use log::{info, warn};
use speech_client::AudioFormat;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Serializes the check-then-rename sequence across concurrent conversions.
static PUBLISH_LOCK: Mutex<()> = Mutex::new(());

/// Candidate output paths for `source`, in preference order:
/// `<stem>.mp3`, `<stem>-1.mp3`, `<stem>-2.mp3`, ...
fn output_candidates(source: &Path) -> impl Iterator<Item = PathBuf> {
    let parent = source.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let extension = AudioFormat::Mp3.extension();

    (0u64..).map(move |n| {
        let name = if n == 0 {
            format!("{}{}", stem, extension)
        } else {
            format!("{}-{}{}", stem, n, extension)
        };
        parent.join(name)
    })
}

fn is_free(candidate: &Path) -> Result<bool> {
    match fs::symlink_metadata(candidate) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(ConversionError::file(
            format!("Unable to check output path {}", candidate.display()),
            e,
        )),
    }
}

fn first_free(source: &Path) -> Result<PathBuf> {
    for candidate in output_candidates(source) {
        if is_free(&candidate)? {
            return Ok(candidate);
        }
    }
    unreachable!("output candidates are unbounded")
}

/// Copy `scratch` to `target` through a temp file in the target's directory,
/// so `target` never exists half-written. `scratch` is removed afterwards.
fn copy_into_place(scratch: &Path, target: &Path) -> Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut input = File::open(scratch)
        .map_err(|e| ConversionError::file("Unable to open temporary file", e))?;
    let mut staged = NamedTempFile::new_in(dir)
        .map_err(|e| ConversionError::file("Unable to create file in destination", e))?;

    io::copy(&mut input, staged.as_file_mut())
        .map_err(|e| ConversionError::file("Unable to copy output file to destination", e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| ConversionError::file("Unable to flush output file", e))?;
    staged.persist_noclobber(target).map_err(|e| {
        ConversionError::file("Unable to move output file to destination", e.error)
    })?;

    if let Err(e) = fs::remove_file(scratch) {
        warn!("Unable to remove temporary file {}: {}", scratch.display(), e);
    }
    Ok(())
}

/// Rename `scratch` to the first free output name beside `source` and return it.
///
/// The scratch file's permission bits are re-applied to the new path after the
/// rename.
pub fn publish(scratch: &Path, source: &Path) -> Result<PathBuf> {
    let _guard = PUBLISH_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let target = first_free(source)?;

    let permissions = {
        let file = File::open(scratch)
            .map_err(|e| ConversionError::file("Unable to open temporary file", e))?;
        file.metadata()
            .map_err(|e| ConversionError::file("Unable to get file info", e))?
            .permissions()
    };

    match fs::rename(scratch, &target) {
        Ok(()) => {}
        // Scratch dir on another filesystem: copy, then drop the scratch file
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_into_place(scratch, &target)?,
        Err(e) => {
            return Err(ConversionError::file(
                "Unable to move output file to destination",
                e,
            ));
        }
    }

    fs::set_permissions(&target, permissions)
        .map_err(|e| ConversionError::file("Unable to set file permissions", e))?;

    info!("Published {}", target.display());
    Ok(target)
}
