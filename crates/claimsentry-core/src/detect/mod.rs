//! The four fraud typologies.
//!
//! Every detector is a pure function over the enriched record set (T1a also
//! reads the raw transactions and act lines). None of them keeps state
//! between calls, and each returns an empty list when the data it needs is
//! absent.

mod collusion;
mod incomplete;
mod overbilling;
mod spoofing;

pub use collusion::{CollusionFinding, detect_collusion};
pub use incomplete::{OrphanTransaction, detect_missing_execution_dates, detect_orphan_transactions};
pub use overbilling::detect_overbilling;
pub use spoofing::{SpoofingFinding, detect_identity_spoofing};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DetectionConfig;
use crate::model::{ActLine, EnrichedRecord, Transaction};
use crate::reference::References;
use crate::schema::feed;

/// Fraud pattern category carried by every anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Typology {
    T1,
    T2,
    T3,
    T4,
}

impl Typology {
    pub fn code(self) -> &'static str {
        match self {
            Typology::T1 => "T1",
            Typology::T2 => "T2",
            Typology::T3 => "T3",
            Typology::T4 => "T4",
        }
    }
}

impl fmt::Display for Typology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One of the five detector outputs, in consolidation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Detector {
    OrphanTransaction,
    MissingExecutionDate,
    Overbilling,
    Collusion,
    IdentitySpoofing,
}

impl Detector {
    /// Consolidation order of the feed.
    pub const ALL: [Detector; 5] = [
        Detector::OrphanTransaction,
        Detector::MissingExecutionDate,
        Detector::Overbilling,
        Detector::Collusion,
        Detector::IdentitySpoofing,
    ];

    pub fn typology(self) -> Typology {
        match self {
            Detector::OrphanTransaction | Detector::MissingExecutionDate => Typology::T1,
            Detector::Overbilling => Typology::T2,
            Detector::Collusion => Typology::T3,
            Detector::IdentitySpoofing => Typology::T4,
        }
    }

    /// Short tag used in export names: `T1a`, `T1b`, `T2`, `T3`, `T4`.
    pub fn tag(self) -> &'static str {
        match self {
            Detector::OrphanTransaction => "T1a",
            Detector::MissingExecutionDate => "T1b",
            Detector::Overbilling => "T2",
            Detector::Collusion => "T3",
            Detector::IdentitySpoofing => "T4",
        }
    }

    pub fn export_name(self) -> String {
        format!("auto_{}", self.tag())
    }

    /// Fixed column set of this detector's own export.
    pub fn export_columns(self) -> &'static [&'static str] {
        match self {
            Detector::OrphanTransaction
            | Detector::MissingExecutionDate
            | Detector::Overbilling => feed::LINE_COLUMNS,
            Detector::Collusion => feed::COLLUSION_COLUMNS,
            Detector::IdentitySpoofing => feed::SPOOFING_COLUMNS,
        }
    }
}

/// A flagged enriched record (T1b, T2).
#[derive(Debug, Clone, PartialEq)]
pub struct LineFinding {
    pub reason: String,
    pub record: EnrichedRecord,
}

/// The five detector outputs of one run.
#[derive(Debug, Clone, Default)]
pub struct Detections {
    pub orphan_transactions: Vec<OrphanTransaction>,
    pub missing_execution_dates: Vec<LineFinding>,
    pub overbilling: Vec<LineFinding>,
    pub collusion: Vec<CollusionFinding>,
    pub identity_spoofing: Vec<SpoofingFinding>,
}

impl Detections {
    pub fn count(&self, detector: Detector) -> usize {
        match detector {
            Detector::OrphanTransaction => self.orphan_transactions.len(),
            Detector::MissingExecutionDate => self.missing_execution_dates.len(),
            Detector::Overbilling => self.overbilling.len(),
            Detector::Collusion => self.collusion.len(),
            Detector::IdentitySpoofing => self.identity_spoofing.len(),
        }
    }

    pub fn total(&self) -> usize {
        Detector::ALL.iter().map(|&d| self.count(d)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Run every detector over one snapshot.
pub fn detect_all(
    config: &DetectionConfig,
    transactions: &[Transaction],
    lines: &[ActLine],
    records: &[EnrichedRecord],
    refs: &References,
) -> Detections {
    let detections = Detections {
        orphan_transactions: detect_orphan_transactions(transactions, lines, refs),
        missing_execution_dates: detect_missing_execution_dates(records),
        overbilling: detect_overbilling(records, config.t2_tolerance_pct),
        collusion: detect_collusion(
            records,
            config.t3_min_acts_7d,
            config.t3_min_positive_variance_7d,
        ),
        identity_spoofing: detect_identity_spoofing(records, config.t4_min_structures_per_day),
    };

    for detector in Detector::ALL {
        info!(
            detector = detector.tag(),
            count = detections.count(detector),
            "detector finished"
        );
    }
    detections
}

/// True when at least one record carries a beneficiary id.
///
/// T3 and T4 correlate on the beneficiary; without any, they must not run at
/// all rather than correlate on an all-null key.
pub(crate) fn has_beneficiaries(records: &[EnrichedRecord]) -> bool {
    records
        .iter()
        .any(|r| r.transaction.beneficiary_id.is_some())
}
