//! Durable state: the connection catalog and the parked systems
//!
//! Both are small JSON documents rewritten as a whole on every change.
//! Writes go to a sibling temporary file first and are renamed into place
//! so an interrupted write never leaves a truncated catalog behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::types::{ConnectionData, LinkState, SystemId};

const CATALOG_FILE: &str = "connections.json";
const PARKED_FILE: &str = "parked.json";

/// Persistence for state that outlives the process
pub trait StateStore: Send + Sync {
    /// Declared connections. Every entry comes back disconnected.
    fn load_catalog(&self) -> Result<Vec<ConnectionData>, StoreError>;

    fn save_catalog(&self, catalog: &[ConnectionData]) -> Result<(), StoreError>;

    /// Systems that were active when the last session ended
    fn load_parked(&self) -> Result<Vec<SystemId>, StoreError>;

    fn save_parked(&self, parked: &[SystemId]) -> Result<(), StoreError>;
}

/// JSON files in a state directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.dir.join(file);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(file);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

impl StateStore for FileStore {
    fn load_catalog(&self) -> Result<Vec<ConnectionData>, StoreError> {
        let mut catalog: Vec<ConnectionData> = self.read(CATALOG_FILE)?;
        for entry in &mut catalog {
            entry.state = LinkState::Disconnected;
        }
        Ok(catalog)
    }

    fn save_catalog(&self, catalog: &[ConnectionData]) -> Result<(), StoreError> {
        self.write(CATALOG_FILE, catalog)
    }

    fn load_parked(&self) -> Result<Vec<SystemId>, StoreError> {
        self.read(PARKED_FILE)
    }

    fn save_parked(&self, parked: &[SystemId]) -> Result<(), StoreError> {
        self.write(PARKED_FILE, parked)
    }
}

/// In-process store, for tests and hosts without a state directory
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: Mutex<Vec<ConnectionData>>,
    parked: Mutex<Vec<SystemId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Vec<ConnectionData>) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            parked: Mutex::default(),
        }
    }
}

impl StateStore for MemoryStore {
    fn load_catalog(&self) -> Result<Vec<ConnectionData>, StoreError> {
        let catalog = self.catalog.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(catalog
            .iter()
            .cloned()
            .map(|mut entry| {
                entry.state = LinkState::Disconnected;
                entry
            })
            .collect())
    }

    fn save_catalog(&self, catalog: &[ConnectionData]) -> Result<(), StoreError> {
        *self.catalog.lock().map_err(|_| StoreError::Poisoned)? = catalog.to_vec();
        Ok(())
    }

    fn load_parked(&self) -> Result<Vec<SystemId>, StoreError> {
        Ok(self.parked.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save_parked(&self, parked: &[SystemId]) -> Result<(), StoreError> {
        *self.parked.lock().map_err(|_| StoreError::Poisoned)? = parked.to_vec();
        Ok(())
    }
}
