//! Scratch file lifecycle: creation, in-order appends, and rewinding after a
//! failed append.

use crate::error::{ConversionError, ErrorKind, Result};
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// Create an empty scratch file in `dir` that survives past this call.
pub fn create_scratch(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| ConversionError::file("Unable to create scratch directory", e))?;

    let file = Builder::new()
        .prefix("gen-speech-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ConversionError::file("Unable to create temporary work file", e))?;

    let (_file, path) = file
        .keep()
        .map_err(|e| ConversionError::file("Unable to close temporary work file", e.error))?;

    debug!("Created scratch file {}", path.display());
    Ok(path)
}

/// Append one chunk's audio to the scratch file, keeping what is already there.
///
/// A failed write may leave a partial chunk behind; callers that retry must
/// rewind first.
pub fn append_audio(scratch: &Path, audio: &[u8]) -> Result<u64> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(scratch)
        .map_err(|e| ConversionError::file("Unable to open file for appending", e))?;

    file.write_all(audio)
        .map_err(|e| ConversionError::file("Unable to write data to file", e))?;

    let len = file
        .metadata()
        .map_err(|e| ConversionError::file("Unable to get file info", e))?
        .len();
    Ok(len)
}

/// Truncate the scratch file back to `committed_len` bytes.
///
/// Drops whatever a failed or interrupted append left past the last chunk
/// known to be complete. A file already at that length is untouched.
pub fn rewind_scratch(scratch: &Path, committed_len: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(scratch)
        .map_err(|e| ConversionError::file("Unable to open temporary file", e))?;

    let len = file
        .metadata()
        .map_err(|e| ConversionError::file("Unable to get file info", e))?
        .len();

    if len < committed_len {
        return Err(ConversionError::new(
            ErrorKind::File,
            format!(
                "Scratch file is shorter than recorded ({} < {} bytes)",
                len, committed_len
            ),
        ));
    }

    if len > committed_len {
        debug!(
            "Rewinding {} from {} to {} bytes",
            scratch.display(),
            len,
            committed_len
        );
        file.set_len(committed_len)
            .map_err(|e| ConversionError::file("Unable to truncate temporary file", e))?;
    }
    Ok(())
}
