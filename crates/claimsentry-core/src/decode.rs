//! Raw Arrow tables and their conversion into typed rows.
//!
//! Column types are normalised with Arrow's cast kernel, so an identifier may
//! arrive as an integer or a string, an amount as an integer, float or
//! decimal, and a date as a date, timestamp or ISO string.

use arrow::array::{
    Array, AsArray, Float64Array, Int64Array, StringArray, TimestampSecondArray,
};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampSecondType};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::EngineError;
use crate::model::{ActLine, Transaction};
use crate::schema::claims;

/// The raw table snapshot for one run, as handed over by the data source.
///
/// Each table is a list of batches; an empty list is an empty table.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub transactions: Vec<RecordBatch>,
    pub act_lines: Vec<RecordBatch>,
    pub tariffs: Vec<RecordBatch>,
    pub health_structures: Vec<RecordBatch>,
    pub structures: Vec<RecordBatch>,
    pub structure_types: Vec<RecordBatch>,
    pub beneficiaries: Vec<RecordBatch>,
    pub service_types: Vec<RecordBatch>,
    pub acts: Vec<RecordBatch>,
}

impl RawTables {
    pub fn transaction_rows(&self) -> usize {
        row_count(&self.transactions)
    }

    pub fn act_line_rows(&self) -> usize {
        row_count(&self.act_lines)
    }
}

pub fn row_count(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|b| b.num_rows()).sum()
}

/// Decode `acte_trans`. The beneficiary column is optional.
pub fn read_transactions(batches: &[RecordBatch]) -> Result<Vec<Transaction>, EngineError> {
    let mut out = Vec::with_capacity(row_count(batches));
    for batch in batches {
        let cols = Columns::new(claims::TRANSACTIONS, batch);
        let ids = cols.strings(claims::TRANSACTION_ID)?;
        let structures = cols.strings(claims::STRUCTURE_ID)?;
        let service_types = cols.strings(claims::SERVICE_TYPE_ID)?;
        let care_dates = cols.datetimes(claims::CARE_DATE)?;
        let beneficiaries = cols.optional_strings(claims::BENEFICIARY_ID)?;

        for row in 0..batch.num_rows() {
            out.push(Transaction {
                id: cols.require(claims::TRANSACTION_ID, row, string_at(&ids, row))?,
                structure_id: string_at(&structures, row),
                service_type_id: string_at(&service_types, row),
                care_date: cols.require(claims::CARE_DATE, row, datetime_at(&care_dates, row))?,
                beneficiary_id: beneficiaries.as_ref().and_then(|b| string_at(b, row)),
            });
        }
    }
    Ok(out)
}

/// Decode `list_acte_acte_trans`.
pub fn read_act_lines(batches: &[RecordBatch]) -> Result<Vec<ActLine>, EngineError> {
    let mut out = Vec::with_capacity(row_count(batches));
    for batch in batches {
        let cols = Columns::new(claims::ACT_LINES, batch);
        let ids = cols.strings(claims::LINE_ID)?;
        let transactions = cols.strings(claims::TRANSACTION_ID)?;
        let acts = cols.strings(claims::ACT_ID)?;
        let quantities = cols.floats(claims::QUANTITY)?;
        let executions = cols.datetimes(claims::EXECUTION_DATE)?;
        let amounts = cols.floats(claims::BILLED_AMOUNT)?;

        for row in 0..batch.num_rows() {
            out.push(ActLine {
                id: cols.require(claims::LINE_ID, row, string_at(&ids, row))?,
                transaction_id: cols.require(
                    claims::TRANSACTION_ID,
                    row,
                    string_at(&transactions, row),
                )?,
                act_id: string_at(&acts, row),
                quantity: float_at(&quantities, row),
                execution_date: datetime_at(&executions, row),
                billed_amount: float_at(&amounts, row),
            });
        }
    }
    Ok(out)
}

// ── Column access ──

/// Named, typed access to the columns of one batch of a raw table.
pub(crate) struct Columns<'a> {
    table: &'static str,
    batch: &'a RecordBatch,
}

impl<'a> Columns<'a> {
    pub(crate) fn new(table: &'static str, batch: &'a RecordBatch) -> Self {
        Self { table, batch }
    }

    fn column(&self, name: &'static str) -> Result<&'a dyn Array, EngineError> {
        self.batch
            .column_by_name(name)
            .map(|c| c.as_ref())
            .ok_or(EngineError::MissingColumn {
                table: self.table,
                column: name,
            })
    }

    fn cast_to(
        &self,
        name: &'static str,
        to: &DataType,
        expected: &'static str,
    ) -> Result<arrow::array::ArrayRef, EngineError> {
        let col = self.column(name)?;
        // Unsafe casts fail on unparseable values instead of nulling them.
        let options = CastOptions {
            safe: false,
            ..Default::default()
        };
        cast_with_options(col, to, &options).map_err(|source| EngineError::ColumnType {
            table: self.table,
            column: name,
            expected,
            source,
        })
    }

    pub(crate) fn strings(&self, name: &'static str) -> Result<StringArray, EngineError> {
        let arr = self.cast_to(name, &DataType::Utf8, "text")?;
        Ok(arr.as_string::<i32>().clone())
    }

    pub(crate) fn optional_strings(
        &self,
        name: &'static str,
    ) -> Result<Option<StringArray>, EngineError> {
        if self.batch.column_by_name(name).is_none() {
            return Ok(None);
        }
        self.strings(name).map(Some)
    }

    pub(crate) fn floats(&self, name: &'static str) -> Result<Float64Array, EngineError> {
        let arr = self.cast_to(name, &DataType::Float64, "a number")?;
        Ok(arr.as_primitive::<Float64Type>().clone())
    }

    pub(crate) fn integers(&self, name: &'static str) -> Result<Int64Array, EngineError> {
        let arr = self.cast_to(name, &DataType::Int64, "an integer")?;
        Ok(arr.as_primitive::<Int64Type>().clone())
    }

    pub(crate) fn datetimes(
        &self,
        name: &'static str,
    ) -> Result<TimestampSecondArray, EngineError> {
        let arr = self.cast_to(
            name,
            &DataType::Timestamp(TimeUnit::Second, None),
            "a date",
        )?;
        Ok(arr.as_primitive::<TimestampSecondType>().clone())
    }

    /// Turn a null in a key column into a configuration error.
    pub(crate) fn require<T>(
        &self,
        column: &'static str,
        row: usize,
        value: Option<T>,
    ) -> Result<T, EngineError> {
        value.ok_or(EngineError::NullValue {
            table: self.table,
            column,
            row,
        })
    }
}

pub(crate) fn string_at(arr: &StringArray, row: usize) -> Option<String> {
    arr.is_valid(row).then(|| arr.value(row).to_string())
}

pub(crate) fn float_at(arr: &Float64Array, row: usize) -> Option<f64> {
    arr.is_valid(row).then(|| arr.value(row)).filter(|v| !v.is_nan())
}

pub(crate) fn integer_at(arr: &Int64Array, row: usize) -> Option<i64> {
    arr.is_valid(row).then(|| arr.value(row))
}

fn datetime_at(arr: &TimestampSecondArray, row: usize) -> Option<NaiveDateTime> {
    if arr.is_null(row) {
        return None;
    }
    arr.value_as_datetime(row)
}
