//! Site persistence.
//!
//! The whole collection is read and written as a unit. Two backends exist:
//! - `JsonFileStore`: a `{ "sites": [...] }` document on disk
//! - `SqliteStore`: a `sites` table in a SQLite database

mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::site::Site;
use std::fmt;

/// Storage collaborator for site records.
pub trait SiteStore: Send + Sync {
    /// Read every site in stored order.
    fn load(&self) -> Result<Vec<Site>, StorageError>;

    /// Replace the stored collection.
    fn save(&self, sites: &[Site]) -> Result<(), StorageError>;
}

/// Failure reading or writing the backing medium.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Sqlite(rusqlite::Error),
    Lock(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Json(e) => write!(f, "JSON error: {}", e),
            StorageError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            StorageError::Lock(msg) => write!(f, "Lock error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            StorageError::Sqlite(e) => Some(e),
            StorageError::Lock(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e)
    }
}

/// Open the backend selected in the configuration.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn SiteStore>, StorageError> {
    match config.backend {
        StorageBackend::Json => Ok(Box::new(JsonFileStore::open(&config.path)?)),
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::open(&config.path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_configured_json_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Json,
            path: dir.path().join("data.json"),
        };

        let store = open_store(&config).unwrap();

        assert!(store.load().unwrap().is_empty());
        assert!(config.path.exists());
    }

    #[test]
    fn opens_configured_sqlite_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: dir.path().join("sites.db"),
        };

        let store = open_store(&config).unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn storage_error_display_names_the_medium() {
        let err = StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        assert!(err.to_string().starts_with("IO error"));
    }
}
