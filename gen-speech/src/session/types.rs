//! Journal data types for a conversion run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress record for one conversion, stored beside its scratch file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub session_id: String,
    /// Resolved path of the source document
    pub source_path: PathBuf,
    /// SHA256 hash of the source (first 1MB)
    pub source_hash: String,
    /// Scratch file receiving the audio
    pub scratch_path: PathBuf,
    /// Total number of text chunks
    pub total_chunks: usize,
    /// Highest chunk index (1-based) whose audio is fully appended; 0 for none
    pub completed_chunks: usize,
    /// Scratch file length after the last completed chunk
    pub committed_len: u64,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with no chunks completed.
    pub fn new(
        session_id: String,
        source_path: PathBuf,
        source_hash: String,
        scratch_path: PathBuf,
        total_chunks: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            source_path,
            source_hash,
            scratch_path,
            total_chunks,
            completed_chunks: 0,
            committed_len: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record that chunk `index` is fully appended and the file is now `len` bytes.
    pub fn mark_chunk_complete(&mut self, index: usize, len: u64) {
        self.completed_chunks = index;
        self.committed_len = len;
    }

    /// Whether every chunk's audio is in the scratch file.
    pub fn is_complete(&self) -> bool {
        self.completed_chunks >= self.total_chunks
    }

    /// Get progress as (completed, total, percentage).
    pub fn progress(&self) -> (usize, usize, f64) {
        let percentage = if self.total_chunks > 0 {
            self.completed_chunks as f64 / self.total_chunks as f64 * 100.0
        } else {
            0.0
        };
        (self.completed_chunks, self.total_chunks, percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(total: usize) -> Session {
        Session::new(
            "abc_20260101_000000".to_string(),
            PathBuf::from("/tmp/book.txt"),
            "abc".to_string(),
            PathBuf::from("/tmp/work.tmp"),
            total,
        )
    }

    #[test]
    fn test_session_new() {
        let s = session(3);
        assert_eq!(s.completed_chunks, 0);
        assert_eq!(s.committed_len, 0);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_mark_chunk_complete() {
        let mut s = session(2);
        s.mark_chunk_complete(1, 100);
        assert_eq!(s.completed_chunks, 1);
        assert_eq!(s.committed_len, 100);
        assert!(!s.is_complete());

        s.mark_chunk_complete(2, 180);
        assert!(s.is_complete());
    }

    #[test]
    fn test_progress() {
        let mut s = session(4);
        s.mark_chunk_complete(1, 10);
        let (completed, total, pct) = s.progress();
        assert_eq!(completed, 1);
        assert_eq!(total, 4);
        assert!((pct - 25.0).abs() < 0.001);
    }
}
