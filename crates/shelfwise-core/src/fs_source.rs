use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, ShelfError};

/// Filesystem access the engine needs: enumeration and byte lengths.
pub trait FileSource {
    /// Flat list of file paths under `root`, sorted.
    fn list_files(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>>;

    /// Size of a file in bytes.
    fn file_len(&self, path: &Path) -> Result<u64>;
}

/// `FileSource` backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

impl FileSource for LocalFileSource {
    fn list_files(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ShelfError::DirectoryNotFound(root.display().to_string()));
        }

        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).max_depth(max_depth).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry under {}: {e}", root.display());
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_list_files_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("subdir");
        fs::create_dir(&sub).unwrap();
        File::create(dir.path().join("root.pdf")).unwrap();
        File::create(sub.join("nested.epub")).unwrap();

        let files = LocalFileSource.list_files(dir.path(), true).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_list_files_non_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("subdir");
        fs::create_dir(&sub).unwrap();
        File::create(dir.path().join("root.pdf")).unwrap();
        File::create(sub.join("nested.epub")).unwrap();

        let files = LocalFileSource.list_files(dir.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("root.pdf"));
    }

    #[test]
    fn test_list_files_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = LocalFileSource.list_files(&missing, true).unwrap_err();
        assert!(matches!(err, ShelfError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_file_len() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sized.txt");
        fs::write(&path, b"12345").unwrap();
        assert_eq!(LocalFileSource.file_len(&path).unwrap(), 5);
    }
}
