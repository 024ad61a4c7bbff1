//! Storage layer: DuckDB snapshot loading and CSV/Parquet export writing.

mod error;
pub use error::StoreError;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

mod export;
pub use export::{
    ExportFormat, create_run_folder, read_feed, read_parquet, write_batch, write_csv,
    write_exports, write_parquet, write_summary,
};
