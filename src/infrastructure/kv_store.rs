use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_connection;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Which of the two browser-style stores a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreNamespace {
    /// Small synchronous settings and collections (`localStorage`).
    Local,
    /// Larger documents such as vision board media (`IndexedDB`).
    Indexed,
}

impl StoreNamespace {
    fn table_name(self) -> &'static str {
        match self {
            Self::Local => "local_storage",
            Self::Indexed => "indexed_store",
        }
    }
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove(&self, key: &str) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
    namespace: StoreNamespace,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>, namespace: StoreNamespace) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            namespace,
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_connection(&self.db_path)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let sql = format!(
            "SELECT value FROM {} WHERE key = ?1",
            self.namespace.table_name()
        );
        let value = connection
            .query_row(&sql, params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let sql = format!(
            "INSERT INTO {} (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            self.namespace.table_name()
        );
        connection.execute(&sql, params![key, value, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.namespace.table_name());
        connection.execute(&sql, params![key])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let sql = format!("DELETE FROM {}", self.namespace.table_name());
        connection.execute(&sql, [])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, InfraError> {
        self.values
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("key-value lock poisoned: {error}")))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        self.lock()?.clear();
        Ok(())
    }
}
