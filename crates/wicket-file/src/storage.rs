//! Filesystem storage backend.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument, trace};

use wicket_core::Storage;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Name of the lock file guarding writes within the state directory.
const LOCK_FILE: &str = ".lock";

/// A [`Storage`] that keeps each key in its own file.
///
/// Writes go to a temporary file that is renamed into place while holding
/// an exclusive lock, so concurrent processes never observe a torn value.
/// On Unix, value files are created with `0600` permissions.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at the given directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path for a key.
    fn key_path(&self, key: &str) -> io::Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key '{}'", key),
            ));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn lock(&self, exclusive: bool) -> io::Result<File> {
        fs::create_dir_all(&self.root)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;

        if exclusive {
            lock_file.lock_exclusive()?;
        } else {
            lock_file.lock_shared()?;
        }
        Ok(lock_file)
    }

    fn restrict_permissions(_path: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(_path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(_path, perms)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.key_path(key)?;
        if !self.root.exists() {
            return Ok(None);
        }

        let lock = self.lock(false)?;
        let result = match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        };
        lock.unlock()?;

        trace!(found = matches!(result, Ok(Some(_))), "Read key");
        result
    }

    #[instrument(skip(self, value), fields(root = %self.root.display()))]
    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        let lock = self.lock(true)?;

        let mut file = File::create(&tmp_path)?;
        Self::restrict_permissions(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_data()?;
        drop(file);
        fs::rename(&tmp_path, &path)?;

        lock.unlock()?;

        debug!("Wrote key");
        Ok(())
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn remove(&self, key: &str) -> io::Result<()> {
        let path = self.key_path(key)?;
        if !self.root.exists() {
            return Ok(());
        }

        let lock = self.lock(true)?;
        let result = match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        lock.unlock()?;

        debug!("Removed key");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state"));
        assert!(storage.get("access_token").unwrap().is_none());
        storage.remove("access_token").unwrap();
        assert!(!dir.path().join("state").exists());
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.set("access_token", "A1").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("A1"));

        storage.set("access_token", "A2").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("A2"));

        storage.remove("access_token").unwrap();
        assert!(storage.get("access_token").unwrap().is_none());
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.set(".lock", "x").is_err());
        assert!(storage.get("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn value_files_are_private() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set("refresh_token", "R1").unwrap();

        let mode = fs::metadata(dir.path().join("refresh_token.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
