//! CSV-backed tabular storage for custom maps
//!
//! A map file is a headerless CSV whose rows may be ragged. Reads return the raw
//! string tokens; validation and translation are left to the track engine.

use log::{debug, error};
use shared::{MAP_COLUMNS, MAP_MAX_ROWS};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Raw rows of string tokens as stored on disk
pub type Matrix = Vec<Vec<String>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported file extension for {0} (expected .csv)")]
    UnsupportedExtension(PathBuf),
    #[error("map file not found: {0}")]
    NotFound(PathBuf),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads and writes one CSV file
#[derive(Debug, Clone)]
pub struct TabularStore {
    path: PathBuf,
}

impl TabularStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            return Err(StoreError::UnsupportedExtension(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file into a matrix of strings.
    pub fn read_as_matrix(&self) -> Result<Matrix, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(self.path.clone()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut matrix = Vec::new();
        for record in reader.records() {
            let record = record?;
            matrix.push(record.iter().map(String::from).collect());
        }

        debug!("Read {} rows from {}", matrix.len(), self.path.display());
        Ok(matrix)
    }

    /// Appends one row, creating the file when it does not exist yet.
    pub fn add_line(&self, row: &[String]) -> Result<(), StoreError> {
        let result = self.append_record(row);
        if let Err(e) = &result {
            error!("Error appending to {}: {}", self.path.display(), e);
        }
        result
    }

    fn append_record(&self, row: &[String]) -> Result<(), StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Overwrites the file with `matrix`.
    ///
    /// Every row is padded with empty strings or truncated to `MAP_COLUMNS`
    /// and at most `MAP_MAX_ROWS` rows are kept. An empty matrix leaves a
    /// zero-byte file.
    pub fn write_matrix(&self, matrix: &[Vec<String>]) -> Result<(), StoreError> {
        let file = File::create(&self.path)?;
        if matrix.is_empty() {
            debug!("Cleared {}", self.path.display());
            return Ok(());
        }

        let mut writer = csv::WriterBuilder::new().from_writer(file);
        for row in matrix.iter().take(MAP_MAX_ROWS) {
            writer.write_record(fit_row(row))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn fit_row(row: &[String]) -> Vec<&str> {
    let mut fitted: Vec<&str> = row.iter().take(MAP_COLUMNS).map(String::as_str).collect();
    fitted.resize(MAP_COLUMNS, "");
    fitted
}
