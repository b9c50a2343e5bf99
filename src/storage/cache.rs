//! Load-or-compute cache for derived summaries.
//!
//! Each summary is one pretty-printed JSON file. A present, non-empty file is
//! trusted as-is; otherwise the summary is computed and written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use super::StorageError;

/// Summary files for one match.
pub struct SummaryCache {
    dir: PathBuf,
}

impl SummaryCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Return the cached value for `name`, or compute and store it.
    ///
    /// Errors from `compute` are returned unchanged; nothing is written then.
    pub fn load_or_compute<T, E, F>(&self, name: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StorageError>,
        F: FnOnce() -> Result<T, E>,
    {
        let path = self.path_for(name);

        if let Some(value) = read_cached(&path)? {
            info!("Loaded cached data from {:?}", path);
            return Ok(value);
        }

        let value = compute()?;
        write_pretty(&path, &value)?;
        info!("Extracted and saved data to {:?}", path);

        Ok(value)
    }

    /// Drop every cached summary for this match.
    pub fn clear(&self) -> Result<(), StorageError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

fn read_cached<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let non_empty = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !non_empty {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
