//! Session persistence: loading, saving, and managing journals.

use super::types::Session;
use crate::error::{ConversionError, ErrorKind, Result};
use chrono::Utc;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

/// Compute a hash of the source file for session identification.
///
/// Uses SHA256 of the first 1MB for speed with large files.
pub fn compute_source_hash(source_path: &Path) -> Result<String> {
    let file = File::open(source_path)
        .map_err(|e| ConversionError::file("Failed to open source file for hashing", e))?;
    let mut reader = BufReader::new(file).take(1024 * 1024);

    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .map_err(|e| ConversionError::file("Failed to read source file for hashing", e))?;

    let mut hasher = Sha256::new();
    hasher.update(&buffer);
    let result = hasher.finalize();

    // Return first 16 hex characters
    Ok(format!("{:x}", result)[..16].to_string())
}

/// Exclusive claim on a session for the lifetime of one run.
///
/// Backed by an advisory lock on `<session>.lock`. The OS drops the lock when
/// the file is closed, so a crashed run never leaves its session claimed.
#[derive(Debug)]
pub struct SessionLock {
    _file: File,
}

/// Directory of session journals.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_file(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    fn lock_file(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", session_id))
    }

    /// Try to take the session's lock. `None` means another run holds it.
    pub fn claim(&self, session_id: &str) -> Result<Option<SessionLock>> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ConversionError::file("Failed to create sessions directory", e))?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_file(session_id))
            .map_err(|e| ConversionError::file("Failed to open session lock", e))?;

        match file.try_lock() {
            Ok(()) => Ok(Some(SessionLock { _file: file })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(ConversionError::file("Failed to lock session", e)),
        }
    }

    /// Create, claim, and save a new session.
    ///
    /// The lock is taken before the journal first appears on disk, so no other
    /// run can ever see the session unclaimed while this one is alive.
    pub fn create(
        &self,
        source_path: &Path,
        scratch_path: &Path,
        total_chunks: usize,
    ) -> Result<(Session, SessionLock)> {
        let source_hash = compute_source_hash(source_path)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let scratch_name = scratch_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let session_id = format!("{}_{}_{}", source_hash, timestamp, scratch_name);

        let session = Session::new(
            session_id,
            source_path.to_path_buf(),
            source_hash,
            scratch_path.to_path_buf(),
            total_chunks,
        );

        let lock = self.claim(&session.session_id)?.ok_or_else(|| {
            ConversionError::new(
                ErrorKind::File,
                format!("Session {} is already claimed", session.session_id),
            )
        })?;

        self.save(&session)?;
        Ok((session, lock))
    }

    /// Save session state to disk.
    ///
    /// Written to a sibling file and renamed over the old one, so a crash never
    /// leaves a half-written journal.
    pub fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ConversionError::file("Failed to create sessions directory", e))?;

        let mut session = session.clone();
        session.updated_at = Utc::now();

        let session_file = self.session_file(&session.session_id);
        let staging = session_file.with_extension("json.partial");

        let file = File::create(&staging)
            .map_err(|e| ConversionError::file("Failed to create session file", e))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &session).map_err(|e| {
            ConversionError::with_source(ErrorKind::File, "Failed to write session JSON", e)
        })?;

        fs::rename(&staging, &session_file)
            .map_err(|e| ConversionError::file("Failed to replace session file", e))?;
        Ok(())
    }

    /// Load every readable session in the store. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<Session>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConversionError::file("Failed to read sessions directory", e)),
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(file) = File::open(&path) {
                    let reader = BufReader::new(file);
                    match serde_json::from_reader::<_, Session>(reader) {
                        Ok(session) => sessions.push(session),
                        Err(e) => warn!("Ignoring unreadable session {}: {}", path.display(), e),
                    }
                }
            }
        }
        Ok(sessions)
    }

    /// Find and claim the most recent resumable session for a source.
    ///
    /// A session matches when the source content hash and chunk count are
    /// unchanged and its scratch file still exists. Sessions claimed by a live
    /// run are skipped. A session with every chunk appended still matches: only
    /// publishing is left to do.
    pub fn find_resumable(
        &self,
        source_path: &Path,
        total_chunks: usize,
    ) -> Result<Option<(Session, SessionLock)>> {
        let source_hash = compute_source_hash(source_path)?;

        let mut matching: Vec<Session> = self
            .list()?
            .into_iter()
            .filter(|s| {
                s.source_path == source_path
                    && s.source_hash == source_hash
                    && s.total_chunks == total_chunks
                    && s.scratch_path.is_file()
            })
            .collect();

        // Most recent first
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        for session in matching {
            match self.claim(&session.session_id)? {
                Some(lock) => return Ok(Some((session, lock))),
                None => debug!("Session {} is in use by another run", session.session_id),
            }
        }
        Ok(None)
    }

    /// Remove a session's journal and lock file after its output has been published.
    pub fn remove(&self, session: &Session) -> Result<()> {
        for path in [
            self.session_file(&session.session_id),
            self.lock_file(&session.session_id),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ConversionError::file("Failed to remove session file", e)),
            }
        }
        debug!("Removed session {}", session.session_id);
        Ok(())
    }
}
