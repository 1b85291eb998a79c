//! Location and activation state of the custom map file
//!
//! The custom map is a single CSV file. It is "active" while it sits at
//! `active_path` and "disabled" while it has been renamed to `disabled_path`.
//! Deactivating keeps the file around so it can be re-enabled later.

use crate::store::{StoreError, TabularStore};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MAP_DIR: &str = "map";
pub const ACTIVE_MAP_NAME: &str = "custom_map.csv";
pub const DISABLED_MAP_NAME: &str = "disabled_custom_map.csv";

#[derive(Debug, Error)]
pub enum MapSourceError {
    #[error("no disabled map at {0}")]
    NotFound(PathBuf),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
    Active,
    Disabled,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSource {
    active_path: PathBuf,
    disabled_path: PathBuf,
}

impl Default for MapSource {
    fn default() -> Self {
        Self::in_dir(DEFAULT_MAP_DIR)
    }
}

impl MapSource {
    pub fn new(active_path: impl Into<PathBuf>, disabled_path: impl Into<PathBuf>) -> Self {
        Self {
            active_path: active_path.into(),
            disabled_path: disabled_path.into(),
        }
    }

    /// Standard active/disabled file pair inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(ACTIVE_MAP_NAME), dir.join(DISABLED_MAP_NAME))
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    pub fn disabled_path(&self) -> &Path {
        &self.disabled_path
    }

    pub fn status(&self) -> MapStatus {
        if self.active_path.exists() {
            MapStatus::Active
        } else if self.disabled_path.exists() {
            MapStatus::Disabled
        } else {
            MapStatus::Missing
        }
    }

    /// Checked once per tick by the track engine.
    pub fn is_active(&self) -> bool {
        self.status() == MapStatus::Active
    }

    /// Store for the active map file.
    pub fn store(&self) -> Result<TabularStore, StoreError> {
        TabularStore::new(&self.active_path)
    }

    /// Moves the disabled map back into the active slot.
    pub fn activate(&self) -> Result<(), MapSourceError> {
        if !self.disabled_path.exists() {
            warn!("Cannot activate map: {} does not exist", self.disabled_path.display());
            return Err(MapSourceError::NotFound(self.disabled_path.clone()));
        }
        fs::rename(&self.disabled_path, &self.active_path)?;
        info!("Custom map activated");
        Ok(())
    }

    /// Moves the active map aside. Succeeds when there is no active map.
    pub fn deactivate(&self) -> Result<(), MapSourceError> {
        if self.active_path.exists() {
            fs::rename(&self.active_path, &self.disabled_path)?;
            info!("Custom map deactivated");
        }
        Ok(())
    }

    /// Overwrites the active map with an uploaded file.
    pub fn store_upload(&self, bytes: &[u8]) -> Result<(), MapSourceError> {
        if let Some(parent) = self.active_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.active_path, bytes)?;
        info!(
            "Stored uploaded map ({} bytes) at {}",
            bytes.len(),
            self.active_path.display()
        );
        Ok(())
    }
}
