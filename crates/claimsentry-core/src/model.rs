//! Typed rows for one claims snapshot.
//!
//! Identifiers are kept as strings whatever their upstream column type, so
//! integer and text keys join the same way.

use chrono::NaiveDateTime;

/// One claim submission (`acte_trans`).
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub structure_id: Option<String>,
    pub service_type_id: Option<String>,
    pub care_date: NaiveDateTime,
    /// Absent when the claim has no identified beneficiary, or when the
    /// upstream table has no beneficiary column at all.
    pub beneficiary_id: Option<String>,
}

/// One billed procedure instance (`list_acte_acte_trans`).
#[derive(Debug, Clone, PartialEq)]
pub struct ActLine {
    pub id: String,
    pub transaction_id: String,
    pub act_id: Option<String>,
    pub quantity: Option<f64>,
    pub execution_date: Option<NaiveDateTime>,
    pub billed_amount: Option<f64>,
}

/// One amendment-versioned contracted tariff (`actes_convention`).
#[derive(Debug, Clone, PartialEq)]
pub struct ContractTariff {
    pub amendment_id: i64,
    pub act_id: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureLabel {
    pub code: Option<String>,
    pub name: Option<String>,
    pub type_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeneficiaryLabel {
    pub number: Option<String>,
    /// Employer registration number ("mecano").
    pub registration: Option<String>,
    pub last_name: Option<String>,
    pub first_names: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceTypeLabel {
    pub id: String,
    pub label: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActLabel {
    pub code: Option<String>,
    pub label: Option<String>,
}

/// An act line joined with its transaction, current tariff and labels.
///
/// Each side of the join stays its own value: there is no flattening, so two
/// sources can never collide on a column name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub line: ActLine,
    pub transaction: Transaction,
    pub tariff: Option<f64>,
    pub structure: Option<StructureLabel>,
    pub beneficiary: Option<BeneficiaryLabel>,
    pub service_type: Option<ServiceTypeLabel>,
    pub act: Option<ActLabel>,
}

impl EnrichedRecord {
    /// Amount actually executed; the billed amount as-is.
    pub fn executed_amount(&self) -> Option<f64> {
        self.line.billed_amount
    }

    /// Executed amount minus tariff, with a missing tariff counted as zero.
    pub fn variance(&self) -> Option<f64> {
        self.executed_amount()
            .map(|executed| executed - self.tariff.unwrap_or(0.0))
    }

    pub fn has_positive_variance(&self) -> bool {
        self.variance().is_some_and(|v| v > 0.0)
    }
}
