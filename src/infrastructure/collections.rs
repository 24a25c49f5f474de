use crate::domain::models::{ProcrastinationEntry, Task, VisionBoardEntry};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

pub const TASKS_KEY: &str = "tasks";
pub const PROCRASTINATION_KEY: &str = "procrastinationEntries";
pub const VISION_BOARD_KEY: &str = "visionBoardEntries";

/// A record that can live in a persisted JSON list.
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync {
    fn validate(&self) -> Result<(), String>;
}

impl StoredRecord for Task {
    fn validate(&self) -> Result<(), String> {
        Task::validate(self)
    }
}

impl StoredRecord for ProcrastinationEntry {
    fn validate(&self) -> Result<(), String> {
        ProcrastinationEntry::validate(self)
    }
}

impl StoredRecord for VisionBoardEntry {
    fn validate(&self) -> Result<(), String> {
        VisionBoardEntry::validate(self)
    }
}

/// A whole collection stored as one JSON array under one key.
pub struct JsonListRepository<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _records: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonListRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _records: PhantomData,
        }
    }
}

impl<T: StoredRecord> JsonListRepository<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _records: PhantomData,
        }
    }

    /// A missing key is an empty list. A value that does not parse, or holds a
    /// record that fails validation, is removed and treated as empty.
    pub fn load(&self) -> Result<Vec<T>, InfraError> {
        let Some(raw) = self.store.get(self.key)? else {
            return Ok(Vec::new());
        };
        match parse_records::<T>(&raw) {
            Ok(records) => Ok(records),
            Err(reason) => {
                warn!(key = self.key, %reason, "discarding corrupt collection");
                self.store.remove(self.key)?;
                Ok(Vec::new())
            }
        }
    }

    pub fn save(&self, records: &[T]) -> Result<(), InfraError> {
        let payload = serde_json::to_string(records)?;
        self.store.set(self.key, &payload)
    }
}

fn parse_records<T: StoredRecord>(raw: &str) -> Result<Vec<T>, String> {
    let records = serde_json::from_str::<Vec<T>>(raw).map_err(|error| error.to_string())?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

/// Vision board entries live in the indexed store. Older installs kept them in
/// the local store; the first load moves them across.
#[derive(Clone)]
pub struct VisionBoardRepository {
    legacy: Arc<dyn KeyValueStore>,
    entries: JsonListRepository<VisionBoardEntry>,
}

impl VisionBoardRepository {
    pub fn new(local: Arc<dyn KeyValueStore>, indexed: Arc<dyn KeyValueStore>) -> Self {
        Self {
            legacy: local,
            entries: JsonListRepository::new(indexed, VISION_BOARD_KEY),
        }
    }

    pub fn load(&self) -> Result<Vec<VisionBoardEntry>, InfraError> {
        if let Some(raw) = self.legacy.get(VISION_BOARD_KEY)? {
            match parse_records::<VisionBoardEntry>(&raw) {
                Ok(entries) => {
                    self.entries.save(&entries)?;
                    self.legacy.remove(VISION_BOARD_KEY)?;
                    info!(count = entries.len(), "migrated vision board entries to indexed store");
                    return Ok(entries);
                }
                Err(reason) => {
                    warn!(%reason, "discarding corrupt legacy vision board entries");
                    self.legacy.remove(VISION_BOARD_KEY)?;
                }
            }
        }
        self.entries.load()
    }

    pub fn save(&self, entries: &[VisionBoardEntry]) -> Result<(), InfraError> {
        self.entries.save(entries)
    }
}
