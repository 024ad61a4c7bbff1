//! One detection run over a raw table snapshot.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::EngineError;
use crate::config::DetectionConfig;
use crate::decode::{RawTables, read_act_lines, read_transactions};
use crate::detect::{Detections, Detector, detect_all, has_beneficiaries};
use crate::encode::Exports;
use crate::enrich::enrich;
use crate::reference::References;
use crate::tariff::{TariffBook, read_tariffs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The window held no transactions or no act lines; nothing was evaluated.
    NoData,
    Completed,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub detections: Detections,
    pub exports: Exports,
}

impl RunReport {
    pub fn summary(
        &self,
        config: &DetectionConfig,
        window_start: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> RunSummary {
        let counts = Detector::ALL
            .iter()
            .map(|&d| (d.tag().to_string(), self.detections.count(d)))
            .collect();
        RunSummary {
            window_start,
            status: self.status,
            counts,
            total: self.detections.total(),
            generated_at,
            config: config.clone(),
        }
    }
}

/// Machine-readable digest of a run, written next to the exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub window_start: NaiveDate,
    pub status: RunStatus,
    /// Anomaly count per detector tag (`T1a` .. `T4`).
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
    pub generated_at: NaiveDateTime,
    pub config: DetectionConfig,
}

/// The detection engine. Holds only its configuration; every run is
/// independent of the previous one.
#[derive(Debug, Clone)]
pub struct Engine {
    config: DetectionConfig,
}

impl Engine {
    pub fn new(config: DetectionConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Decode, resolve, enrich, detect and consolidate.
    ///
    /// Every table is decoded before anything is evaluated, so a malformed
    /// table fails the run even when the window turns out to be empty.
    pub fn run(&self, raw: &RawTables) -> Result<RunReport, EngineError> {
        let transactions = read_transactions(&raw.transactions)?;
        let lines = read_act_lines(&raw.act_lines)?;
        let tariffs = read_tariffs(&raw.tariffs)?;
        let refs = References::from_raw(raw)?;
        info!(
            transactions = transactions.len(),
            act_lines = lines.len(),
            tariffs = tariffs.len(),
            "decoded snapshot"
        );

        if transactions.is_empty() || lines.is_empty() {
            info!("no transactions or act lines in the window, nothing to evaluate");
            return Ok(RunReport {
                status: RunStatus::NoData,
                detections: Detections::default(),
                exports: Exports::empty()?,
            });
        }

        let book = TariffBook::resolve(&tariffs);
        let records = enrich(&lines, &transactions, &book, &refs);
        if !has_beneficiaries(&records) {
            warn!("no beneficiary ids in the window, collusion (T3) and spoofing (T4) skipped");
        }

        let detections = detect_all(&self.config, &transactions, &lines, &records, &refs);
        let exports = Exports::build(&detections)?;
        info!(total = detections.total(), "run completed");

        Ok(RunReport {
            status: RunStatus::Completed,
            detections,
            exports,
        })
    }
}
