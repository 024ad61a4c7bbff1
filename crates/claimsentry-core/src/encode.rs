//! Arrow encoding of the anomaly feed and its per-detector exports.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, TimestampSecondArray,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};

use crate::consolidate::{Anomaly, detector_rows};
use crate::detect::{Detections, Detector};
use crate::schema::feed;

/// Encode rows against [`feed::anomaly_schema`].
pub fn anomalies_to_batch(rows: &[Anomaly]) -> Result<RecordBatch, ArrowError> {
    fn text(rows: &[Anomaly], f: impl Fn(&Anomaly) -> Option<&str>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<StringArray>())
    }
    fn float(rows: &[Anomaly], f: impl Fn(&Anomaly) -> Option<f64>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Float64Array>())
    }
    fn int(rows: &[Anomaly], f: impl Fn(&Anomaly) -> Option<i64>) -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<Int64Array>())
    }
    fn timestamp(rows: &[Anomaly], f: impl Fn(&Anomaly) -> Option<NaiveDateTime>) -> ArrayRef {
        Arc::new(
            rows.iter()
                .map(|a| f(a).map(|dt| dt.and_utc().timestamp()))
                .collect::<TimestampSecondArray>(),
        )
    }
    fn date(rows: &[Anomaly], f: impl Fn(&Anomaly) -> Option<NaiveDate>) -> ArrayRef {
        Arc::new(
            rows.iter()
                .map(|a| f(a).map(days_since_epoch))
                .collect::<Date32Array>(),
        )
    }

    let columns: Vec<ArrayRef> = vec![
        text(rows, |a| Some(a.typology.code())),
        text(rows, |a| Some(a.reason.as_str())),
        timestamp(rows, |a| a.care_date),
        date(rows, |a| a.day),
        timestamp(rows, |a| a.window_start),
        timestamp(rows, |a| a.window_end),
        text(rows, |a| a.transaction_id.as_deref()),
        text(rows, |a| a.act_id.as_deref()),
        text(rows, |a| a.act_code.as_deref()),
        text(rows, |a| a.act_label.as_deref()),
        text(rows, |a| a.structure_id.as_deref()),
        text(rows, |a| a.structure_code.as_deref()),
        text(rows, |a| a.structure_name.as_deref()),
        text(rows, |a| a.structure_type_label.as_deref()),
        text(rows, |a| a.beneficiary_id.as_deref()),
        text(rows, |a| a.beneficiary_last_name.as_deref()),
        text(rows, |a| a.beneficiary_first_names.as_deref()),
        text(rows, |a| a.beneficiary_registration.as_deref()),
        text(rows, |a| a.beneficiary_contact.as_deref()),
        text(rows, |a| a.service_type_id.as_deref()),
        text(rows, |a| a.service_type_label_id.as_deref()),
        text(rows, |a| a.service_type_label.as_deref()),
        float(rows, |a| a.executed_amount),
        float(rows, |a| a.tariff),
        float(rows, |a| a.variance),
        int(rows, |a| a.acts_7d),
        int(rows, |a| a.positive_variances_7d),
        int(rows, |a| a.structure_count),
        text(rows, |a| a.structures.as_deref()),
    ];

    RecordBatch::try_new(Arc::new(feed::anomaly_schema()), columns)
}

/// Keep only `columns` of a feed batch, in that order.
pub fn project(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    let indices = columns
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<Result<Vec<_>, _>>()?;
    batch.project(&indices)
}

/// Every export of one run: the five detector tables and the consolidated feed.
#[derive(Debug, Clone)]
pub struct Exports {
    pub detectors: Vec<(Detector, RecordBatch)>,
    pub consolidated: RecordBatch,
}

impl Exports {
    pub fn build(detections: &Detections) -> Result<Self, ArrowError> {
        let mut detectors = Vec::with_capacity(Detector::ALL.len());
        let mut all = Vec::with_capacity(detections.total());
        for detector in Detector::ALL {
            let rows = detector_rows(detections, detector);
            let batch = anomalies_to_batch(&rows)?;
            detectors.push((detector, project(&batch, detector.export_columns())?));
            all.extend(rows);
        }
        Ok(Self {
            detectors,
            consolidated: anomalies_to_batch(&all)?,
        })
    }

    /// Exports with every table present and empty.
    pub fn empty() -> Result<Self, ArrowError> {
        Self::build(&Detections::default())
    }

    pub fn consolidated_name() -> &'static str {
        "auto_all"
    }
}

fn days_since_epoch(day: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (day - epoch).num_days() as i32
}
