//! JSON document store, compatible with the dashboard's `data.json`.

use super::{SiteStore, StorageError};
use crate::site::Site;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Default)]
struct SitesDocument {
    #[serde(default)]
    sites: Vec<Site>,
}

/// Stores all sites in one pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating an empty document if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            store.write_document(&SitesDocument::default())?;
        }
        Ok(store)
    }

    fn write_document(&self, document: &SitesDocument) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(document)?;
        // Write beside the target and rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SiteStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Site>, StorageError> {
        let content = std::fs::read_to_string(&self.path)?;
        let document: SitesDocument = serde_json::from_str(&content)?;
        Ok(document.sites)
    }

    fn save(&self, sites: &[Site]) -> Result<(), StorageError> {
        self.write_document(&SitesDocument {
            sites: sites.to_vec(),
        })
    }
}
