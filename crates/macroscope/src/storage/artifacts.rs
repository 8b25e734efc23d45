use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::sanitize::safe_file_name;

/// Owns the session output directory. Every write lands directly inside it
/// under a sanitized base name.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_directory: PathBuf,
}

impl ArtifactStore {
    /// Creates the directory if needed. Fails when it cannot be created or
    /// the path exists as something other than a directory.
    pub fn open<P: AsRef<Path>>(output_directory: P) -> Result<Self, StorageError> {
        let output_directory = output_directory.as_ref().to_path_buf();

        if !output_directory.exists() {
            std::fs::create_dir_all(&output_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: output_directory.clone(),
                    source: e,
                }
            })?;
        }
        if !output_directory.is_dir() {
            return Err(StorageError::NotADirectory(output_directory));
        }

        // Canonical so artifact paths compare equal to canonicalized visits.
        let output_directory =
            output_directory
                .canonicalize()
                .map_err(|e| StorageError::CreateDirectory {
                    path: output_directory.clone(),
                    source: e,
                })?;

        Ok(Self { output_directory })
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Where `store` would put `requested_name`. Nothing is touched.
    pub fn target(&self, requested_name: &str) -> PathBuf {
        self.output_directory.join(safe_file_name(requested_name))
    }

    /// Writes `content` to `target(requested_name)`, replacing any file of
    /// the same name. Callers that must not clobber a file check the target
    /// first.
    pub fn store(&self, requested_name: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.target(requested_name);

        // A planted symlink must not redirect the write outside the directory.
        if let Ok(meta) = std::fs::symlink_metadata(&path) {
            if meta.file_type().is_symlink() {
                std::fs::remove_file(&path).map_err(|e| StorageError::WriteFile {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(
            artifact = %crate::sanitize::redact_path(&path),
            bytes = content.len(),
            "artifact written"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested/output");

        let store = ArtifactStore::open(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(store.output_directory(), out.canonicalize().unwrap());
    }

    #[test]
    fn test_open_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();

        let err = ArtifactStore::open(&file).unwrap_err();
        assert!(matches!(err, StorageError::NotADirectory(_)));
    }

    #[test]
    fn test_store_writes_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp_dir.path()).unwrap();

        let target = store.target("payload.bin");
        assert!(!target.exists());

        let path = store.store("payload.bin", b"MZ\x90\x00").unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read(&path).unwrap(), b"MZ\x90\x00");
        assert_eq!(path.parent().unwrap(), store.output_directory());
    }

    #[test]
    fn test_traversal_stays_inside() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out");
        let store = ArtifactStore::open(&out).unwrap();

        for name in ["../../etc/passwd", "..\\..\\boot.ini", "/abs/evil", ".."] {
            let path = store.store(name, b"x").unwrap();
            assert_eq!(path.parent().unwrap(), store.output_directory());
            assert!(path.canonicalize().unwrap().starts_with(store.output_directory()));
        }
        assert!(!temp_dir.path().join("passwd").exists());
    }

    #[test]
    fn test_same_name_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(temp_dir.path()).unwrap();

        let first = store.store("oleObject1.bin", b"first").unwrap();
        let second = store.store("oleObject1.bin", b"second").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn test_planted_symlink_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let outside = temp_dir.path().join("outside.txt");
        std::fs::write(&outside, b"untouched").unwrap();

        let store = ArtifactStore::open(temp_dir.path().join("out")).unwrap();
        std::os::unix::fs::symlink(&outside, store.output_directory().join("evil.bin")).unwrap();

        let path = store.store("evil.bin", b"payload").unwrap();
        assert_eq!(std::fs::read(&outside).unwrap(), b"untouched");
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }
}
