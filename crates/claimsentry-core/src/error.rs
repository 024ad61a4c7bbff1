use arrow::error::ArrowError;
use thiserror::Error;

/// Fatal engine failures.
///
/// Every variant is a configuration problem: the input tables or the
/// thresholds are unusable. Business conditions (empty window, no tariffs,
/// no beneficiaries) never surface here; they only shape the output.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("table `{table}` is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("column `{table}.{column}` cannot be read as {expected}: {source}")]
    ColumnType {
        table: &'static str,
        column: &'static str,
        expected: &'static str,
        #[source]
        source: ArrowError,
    },

    #[error("column `{table}.{column}` is null at row {row}")]
    NullValue {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}
