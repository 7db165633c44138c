use std::{
    io,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
};

/// Shared in-memory slot. Clones see the same document, so a test can keep a
/// handle while the registry owns another.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    document: Arc<Mutex<Option<Store>>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryStorage {
    pub fn with_store(store: Store) -> Self {
        let storage = Self::default();
        *storage.document.lock().unwrap() = Some(store);
        storage
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<Store> {
        self.document.lock().unwrap().clone()
    }
}

impl Storage for InMemoryStorage {
    fn load(&self) -> Result<Store, StorageError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StorageError::LoadFailed {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("load refused"),
            });
        }
        Ok(self.snapshot().unwrap_or_default())
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::SaveFailed {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("save refused"),
            });
        }
        *self.document.lock().unwrap() = Some(store.clone());
        Ok(())
    }
}
