//! Destination files on the local filesystem.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use vdxfer_transfer::Storage;

/// Writes incoming files under the user's downloads directory.
///
/// The directory is looked up again for every transfer.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    download_dir: Option<PathBuf>,
}

impl LocalStorage {
    /// Creates a storage backend; `download_dir` overrides the platform lookup.
    pub fn new(download_dir: Option<PathBuf>) -> Self {
        Self { download_dir }
    }
}

/// Returns the platform downloads directory, or the desktop when there is none.
///
/// A directory that is configured but missing on disk counts as absent.
pub fn default_download_dir() -> Option<PathBuf> {
    dirs::download_dir()
        .filter(|p| p.is_dir())
        .or_else(|| dirs::desktop_dir().filter(|p| p.is_dir()))
}

impl Storage for LocalStorage {
    type File = File;

    fn downloads_dir(&self) -> Option<PathBuf> {
        let dir = match &self.download_dir {
            Some(dir) if dir.is_dir() => Some(dir.clone()),
            Some(dir) => {
                tracing::warn!(dir = %dir.display(), "configured download directory does not exist");
                None
            }
            None => default_download_dir(),
        };
        if dir.is_none() {
            tracing::warn!("no downloads or desktop directory available");
        }
        dir
    }

    fn free_space(&self, dir: &Path) -> io::Result<u64> {
        fs2::available_space(dir)
    }

    fn create_exclusive(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        options.open(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn override_directory_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(Some(tmp.path().to_path_buf()));
        assert_eq!(storage.downloads_dir(), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn missing_override_is_not_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(Some(tmp.path().join("gone")));
        assert_eq!(storage.downloads_dir(), None);
    }

    #[test]
    fn create_exclusive_refuses_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::default();
        let path = tmp.path().join("a.txt");

        let mut file = storage.create_exclusive(&path).unwrap();
        file.write_all(b"data").unwrap();
        drop(file);

        let err = storage.create_exclusive(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn created_file_is_user_writable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.txt");
        LocalStorage::default().create_exclusive(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn remove_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::default();
        let path = tmp.path().join("a.txt");
        storage.create_exclusive(&path).unwrap();

        storage.remove(&path).unwrap();
        assert!(!path.exists());
        assert!(storage.remove(&path).is_err());
    }

    #[test]
    fn free_space_of_tempdir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(LocalStorage::default().free_space(tmp.path()).is_ok());
    }

    #[test]
    fn free_space_of_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");
        assert!(LocalStorage::default().free_space(&missing).is_err());
    }
}
