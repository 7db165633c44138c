use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use jiff::Timestamp;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::to_string_pretty;
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
};

pub const DEFAULT_BACKUPS_TO_KEEP: usize = 5;

/// Reads a JSON document, falling back to `T::default()` when the file does not exist yet.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(StorageError::LoadFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Serializes `value` into a uniquely named sibling temp file and returns its path.
fn write_temp<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, StorageError> {
    let json = to_string_pretty(value).map_err(|e| StorageError::SerializeFailed { source: e })?;

    let temp_path = PathBuf::from(format!("{}.tmp.{}", path.display(), Uuid::new_v4()));
    write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
        path: temp_path.clone(),
        source: e,
    })?;

    Ok(temp_path)
}

/// Replaces the document at `path` wholesale; readers never observe a partial write.
pub fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let temp_path = write_temp(path, value)?;
    rename(&temp_path, path)
        .map_err(|e| StorageError::SaveFailed {
            path: path.to_path_buf(),
            source: e,
        })
        .inspect_err(|_| discard_temp(&temp_path))
}

fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        warn!(path = %temp_path.display(), error = %e, "failed to remove temp file");
    }
}

pub struct JsonFileStorage {
    path: PathBuf,
    backups_to_keep: usize,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
        }
    }

    pub fn with_backups_to_keep(mut self, backups_to_keep: usize) -> Self {
        self.backups_to_keep = backups_to_keep;
        self
    }

    fn backup_dir(&self) -> PathBuf {
        self.path.parent().unwrap_or(Path::new(".")).join("backups")
    }

    /// Copies the current document into `backups/` and prunes the oldest
    /// copies beyond the configured limit. Nothing to do before the first save.
    fn rotate_backups(&self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }

        let dir = self.backup_dir();
        fs::create_dir_all(&dir).map_err(|e| StorageError::BackupFailed {
            path: dir.clone(),
            source: e,
        })?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clients.json".to_string());
        // Zero-padded so lexical order is chronological order
        let nanos = Timestamp::now().as_nanosecond();
        let backup_path = dir.join(format!("{}.{:020}", file_name, nanos));
        fs::copy(&self.path, &backup_path).map_err(|e| StorageError::BackupFailed {
            path: backup_path.clone(),
            source: e,
        })?;

        let cleanup_failed = |e| StorageError::CleanupFailed {
            dir: dir.clone(),
            source: e,
        };
        let mut backups = fs::read_dir(&dir)
            .map_err(cleanup_failed)?
            .flatten()
            .filter(|entry| entry.metadata().is_ok_and(|m| m.is_file()))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        backups.sort();

        let excess = backups.len().saturating_sub(self.backups_to_keep);
        for stale in &backups[..excess] {
            fs::remove_file(stale).map_err(cleanup_failed)?;
        }

        Ok(())
    }

    /// Everything after the temp file exists: lock, back up, swap in.
    fn commit(&self, temp_path: &Path) -> Result<(), StorageError> {
        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        if self.backups_to_keep > 0 {
            self.rotate_backups()?;
        }

        rename(temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Store, StorageError> {
        read_json_or_default(&self.path)
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let temp_path = write_temp(&self.path, store)?;
        self.commit(&temp_path).inspect_err(|_| discard_temp(&temp_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::client::{Client, ClientId, Union};

    fn client(name: &str) -> Client {
        Client {
            id: ClientId::generate(),
            name: name.to_string(),
            ..Client::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("clients.json"));

        let store = Store::new(vec![
            Client {
                union: Some(Union {
                    name: String::from("Sindpan"),
                    base_date: String::from("5"),
                }),
                ..client("Padaria")
            },
            client("Oficina"),
        ]);

        if storage.save(&store).is_err() {
            panic!("Should correctly save the store");
        }
        match storage.load() {
            Ok(loaded) => assert_eq!(loaded, store),
            Err(_) => panic!("Should correctly load the saved store"),
        }
    }

    #[test]
    fn test_document_is_a_bare_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clients.json");
        let storage = JsonFileStorage::new(path.clone());

        storage.save(&Store::new(vec![client("Acme")])).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let array = raw.as_array().expect("document should be an array");
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["name"], "Acme");
        assert_eq!(array[0]["payrollSent"], false);
        assert_eq!(array[0]["isProLabore"], false);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("missing.json"));

        assert!(storage.load().unwrap().clients.is_empty());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clients.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        let storage = JsonFileStorage::new(path);

        match storage.load() {
            Err(StorageError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("nope").join("clients.json"));

        match storage.save(&Store::default()) {
            Err(StorageError::SaveFailed { .. }) => {}
            _ => panic!("Expected SaveFailed error"),
        }
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("clients.json"));

        for i in 1..=7 {
            let clients = (0..i).map(|n| client(&format!("Client {n}"))).collect();
            storage.save(&Store::new(clients)).unwrap();

            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backup_count = fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count();

        assert_eq!(backup_count, 5, "Should keep exactly 5 backups");
    }

    #[test]
    fn test_backup_directory_created_on_second_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("clients.json"));
        let backups_dir = dir.path().join("backups");

        storage.save(&Store::default()).unwrap();
        assert!(
            !backups_dir.exists(),
            "Backups dir should not exist after first save"
        );

        storage.save(&Store::new(vec![client("Acme")])).unwrap();
        assert!(backups_dir.is_dir(), "Backups dir should be created on second save");
    }

    #[test]
    fn test_backups_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("clients.json")).with_backups_to_keep(0);

        storage.save(&Store::default()).unwrap();
        storage.save(&Store::default()).unwrap();

        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_failed_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("clients.json"));
        fs::write(dir.path().join("backups"), "not a directory").unwrap();

        storage.save(&Store::default()).unwrap();
        for _ in 0..3 {
            match storage.save(&Store::new(vec![client("Acme")])) {
                Err(StorageError::BackupFailed { .. }) => {}
                other => panic!("Expected BackupFailed error, got {:?}", other.err()),
            }
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0, "Failed saves should remove their temp files");
        assert!(storage.load().unwrap().clients.is_empty());
    }
}
