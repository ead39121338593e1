use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A screenshot written to local storage, waiting to be sent.
///
/// The file lives for exactly one send attempt: the caller removes it with
/// [`CaptureResult::discard`] once the attempt is over. If the value is
/// dropped without being discarded the file is removed anyway.
#[derive(Debug)]
pub struct CaptureResult {
    pub room_code: String,
    pub timestamp: DateTime<Utc>,
    path: Option<PathBuf>,
}

impl CaptureResult {
    pub fn new(room_code: String, path: PathBuf, timestamp: DateTime<Utc>) -> Self {
        Self {
            room_code,
            timestamp,
            path: Some(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Deletes the screenshot file. A file that is already gone counts as deleted.
    pub fn discard(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => remove(&path),
            None => Ok(()),
        }
    }
}

impl Drop for CaptureResult {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = remove(&path) {
                warn!("Failed to remove screenshot {}: {}", path.display(), e);
            }
        }
    }
}

fn remove(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed screenshot {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(dir: &Path) -> CaptureResult {
        let path = dir.join("screenshot_test.png");
        std::fs::write(&path, b"png").unwrap();
        CaptureResult::new("49r1Q8".to_string(), path, Utc::now())
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = shot(dir.path());
        let path = result.path().to_path_buf();
        assert!(path.exists());
        result.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let result = shot(dir.path());
        std::fs::remove_file(result.path()).unwrap();
        assert!(result.discard().is_ok());
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let result = shot(dir.path());
            result.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
