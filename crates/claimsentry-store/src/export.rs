//! Export writing: one file per typology, the consolidated feed and a JSON
//! run summary, all inside a timestamped run folder.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use claimsentry_core::schema::feed;
use claimsentry_core::{Exports, RunSummary};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "parquet" => Ok(ExportFormat::Parquet),
            other => Err(format!(
                "unknown export format `{other}` (expected csv or parquet)"
            )),
        }
    }
}

/// Write one batch as CSV with a header row.
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;
    Ok(())
}

pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Write `batch` as `<dir>/<name>.<ext>` and return the path.
pub fn write_batch(
    dir: &Path,
    name: &str,
    batch: &RecordBatch,
    format: ExportFormat,
) -> Result<PathBuf, StoreError> {
    let path = dir.join(format!("{name}.{}", format.extension()));
    match format {
        ExportFormat::Csv => write_csv(&path, batch)?,
        ExportFormat::Parquet => write_parquet(&path, batch)?,
    }
    info!(path = %path.display(), rows = batch.num_rows(), "wrote export");
    Ok(path)
}

/// Write every typology export, then the consolidated feed.
///
/// Empty tables are written too, so a run folder always has the same files.
pub fn write_exports(
    dir: &Path,
    exports: &Exports,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, StoreError> {
    let mut paths = Vec::with_capacity(exports.detectors.len() + 1);
    for (detector, batch) in &exports.detectors {
        paths.push(write_batch(dir, &detector.export_name(), batch, format)?);
    }
    paths.push(write_batch(
        dir,
        Exports::consolidated_name(),
        &exports.consolidated,
        format,
    )?);
    Ok(paths)
}

pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, StoreError> {
    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, serde_json::to_string_pretty(summary)?)?;
    Ok(path)
}

/// Create `<root>/run_YYYYMMDD_HHMMSS` for a run started at `started`.
pub fn create_run_folder(root: &Path, started: NaiveDateTime) -> Result<PathBuf, StoreError> {
    let dir = root.join(format!("run_{}", started.format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Read back the consolidated feed of a run folder, Parquet first, then CSV.
pub fn read_feed(run_dir: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let name = Exports::consolidated_name();
    let parquet = run_dir.join(format!("{name}.parquet"));
    if parquet.exists() {
        return read_parquet(&parquet);
    }
    let csv = run_dir.join(format!("{name}.csv"));
    if !csv.exists() {
        return Err(StoreError::FeedNotFound(run_dir.to_path_buf()));
    }
    let reader = ReaderBuilder::new(Arc::new(feed::anomaly_schema()))
        .with_header(true)
        .build(File::open(&csv)?)?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}
