//! Catalog file persistence.
//!
//! A catalog file is a JSON document holding every catalog of a
//! [`MemoryStore`]. Saving writes to a temporary file first and renames it
//! over the target, so a crash never leaves a half-written file behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::memory::{CatalogSnapshot, MemoryStore};

/// Current catalog file format version.
pub const CATALOG_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    catalogs: Vec<CatalogSnapshot>,
}

/// Saves every catalog of `store` to `path`.
pub fn save_catalog_file(store: &MemoryStore, path: &Path) -> Result<()> {
    let file = CatalogFile {
        version: CATALOG_FILE_VERSION,
        catalogs: store.snapshot()?,
    };
    let bytes = serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            operation: "create directory for",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut temp = File::create(&temp_path).map_err(|e| StoreError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    temp.write_all(&bytes).map_err(|e| StoreError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;
    temp.sync_all().map_err(|e| StoreError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| StoreError::Io {
        operation: "replace",
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        path = %path.display(),
        catalogs = file.catalogs.len(),
        "Saved catalog file"
    );
    Ok(())
}

/// Loads a store from a catalog file.
pub fn load_catalog_file(path: &Path) -> Result<MemoryStore> {
    let bytes = fs::read(path).map_err(|e| StoreError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: CatalogFile = serde_json::from_slice(&bytes).map_err(|e| StoreError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    if file.version > CATALOG_FILE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: file.version,
            max_supported: CATALOG_FILE_VERSION,
        });
    }

    let catalogs = file.catalogs.len();
    let store = MemoryStore::from_snapshots(file.catalogs)?;
    tracing::info!(path = %path.display(), catalogs, "Loaded catalog file");
    Ok(store)
}
