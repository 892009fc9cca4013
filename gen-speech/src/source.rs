//! Input document resolution and loading.

use crate::error::{ConversionError, ErrorKind, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Accepted input extension
pub const TEXT_EXTENSION: &str = ".txt";

/// A validated path to a plain-text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
}

impl SourceDocument {
    /// Resolve a user-supplied path, expanding a leading `~` to the home directory.
    pub fn resolve(input: &str) -> Result<Self> {
        Self::resolve_with_home(input, dirs::home_dir)
    }

    fn resolve_with_home<F>(input: &str, home_dir: F) -> Result<Self>
    where
        F: FnOnce() -> Option<PathBuf>,
    {
        if input.is_empty() || !input.ends_with(TEXT_EXTENSION) {
            return Err(ConversionError::malformed(format!("Invalid path: {:?}", input)));
        }

        let expanded = match input.strip_prefix('~') {
            Some(rest) => {
                let home = home_dir().ok_or_else(|| {
                    ConversionError::new(ErrorKind::HomeDir, "Unable to determine home directory")
                })?;
                home.join(rest.trim_start_matches(['/', '\\']))
            }
            None => PathBuf::from(input),
        };

        let path = std::path::absolute(&expanded).map_err(|e| {
            ConversionError::with_source(ErrorKind::MalformedInput, "Invalid path", e)
        })?;

        let metadata = fs::metadata(&path).map_err(|e| {
            ConversionError::with_source(
                ErrorKind::MalformedInput,
                format!("Invalid path: {}", path.display()),
                e,
            )
        })?;
        if !metadata.is_file() {
            return Err(ConversionError::malformed(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document as UTF-8 text.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            ConversionError::with_source(
                ErrorKind::MissingContent,
                format!("Invalid content: {}", self.path.display()),
                e,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("story.txt");
        fs::write(&file, "Once upon a time").unwrap();

        let doc = SourceDocument::resolve(file.to_str().unwrap()).unwrap();
        assert_eq!(doc.path(), file.as_path());
        assert_eq!(doc.read().unwrap(), "Once upon a time");
    }

    #[test]
    fn test_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("story.md");
        fs::write(&file, "text").unwrap();

        let err = SourceDocument::resolve(file.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_empty_path() {
        let err = SourceDocument::resolve("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("missing.txt");

        let err = SourceDocument::resolve(file.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("notes.txt");
        fs::create_dir(&sub).unwrap();

        let err = SourceDocument::resolve(sub.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_home_expansion() {
        let home = TempDir::new().unwrap();
        fs::create_dir(home.path().join("books")).unwrap();
        let file = home.path().join("books").join("novel.txt");
        fs::write(&file, "words").unwrap();

        let home_path = home.path().to_path_buf();
        let doc =
            SourceDocument::resolve_with_home("~/books/novel.txt", || Some(home_path)).unwrap();
        assert_eq!(doc.path(), file.as_path());
    }

    #[test]
    fn test_home_unavailable() {
        let err = SourceDocument::resolve_with_home("~/novel.txt", || None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HomeDir);
    }

    #[test]
    fn test_invalid_utf8_is_missing_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("binary.txt");
        fs::write(&file, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let doc = SourceDocument::resolve(file.to_str().unwrap()).unwrap();
        let err = doc.read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingContent);
    }
}
