//! Versioned dataset source
//!
//! Stand-in for the remote data-versioning collaborator: a dataset path plus
//! a revision identifier resolves to an immutable snapshot directory under the
//! data root, and the file is loaded by extension.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Loads versioned tabular datasets from a local data root.
pub struct DatasetSource {
    root: PathBuf,
}

impl DatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `path` at `revision` to a concrete snapshot path.
    pub fn resolve(&self, path: &str, revision: &str) -> PathBuf {
        self.root.join(revision).join(path)
    }

    /// Fetch one versioned dataset as a DataFrame.
    pub fn fetch(&self, path: &str, revision: &str) -> Result<DataFrame> {
        let resolved = self.resolve(path, revision);
        info!(path = %resolved.display(), revision, "Fetching dataset snapshot");
        load_table(&resolved)
    }
}

/// Load a CSV or Parquet file into a DataFrame, chosen by extension.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| ChurnError::DataError(format!("{}: {}", path.display(), e)))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| ChurnError::DataError(e.to_string())),
        Some("parquet") => ParquetReader::new(file)
            .finish()
            .map_err(|e| ChurnError::DataError(e.to_string())),
        other => Err(ChurnError::DataError(format!(
            "unsupported dataset format: {:?} ({})",
            other,
            path.display()
        ))),
    }
}

/// Write a DataFrame as Parquet, creating parent directories as needed.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| ChurnError::DataError(e.to_string()))?;
    Ok(())
}
