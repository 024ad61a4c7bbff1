//! T1: incomplete claims.
//!
//! T1a flags transactions that no act line points at; T1b flags act lines
//! with no execution date. A T1a transaction has no line by definition and a
//! T1b record has one, so the two never overlap.

use std::collections::HashSet;

use crate::detect::LineFinding;
use crate::model::{
    ActLine, BeneficiaryLabel, EnrichedRecord, ServiceTypeLabel, StructureLabel, Transaction,
};
use crate::reference::References;

pub const ORPHAN_REASON: &str = "transaction with no attached acts";
pub const MISSING_EXECUTION_DATE_REASON: &str = "act with no execution date";

/// A transaction without act lines, with whatever labels apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanTransaction {
    pub reason: String,
    pub transaction: Transaction,
    pub structure: Option<StructureLabel>,
    pub beneficiary: Option<BeneficiaryLabel>,
    pub service_type: Option<ServiceTypeLabel>,
}

/// T1a. Reads the raw act lines, not the enriched set, so a line pointing at
/// a transaction outside the snapshot still counts as "attached".
pub fn detect_orphan_transactions(
    transactions: &[Transaction],
    lines: &[ActLine],
    refs: &References,
) -> Vec<OrphanTransaction> {
    let referenced: HashSet<&str> = lines.iter().map(|l| l.transaction_id.as_str()).collect();
    transactions
        .iter()
        .filter(|tx| !referenced.contains(tx.id.as_str()))
        .map(|tx| OrphanTransaction {
            reason: ORPHAN_REASON.to_string(),
            structure: refs.structure(tx.structure_id.as_deref()).cloned(),
            beneficiary: refs.beneficiary(tx.beneficiary_id.as_deref()).cloned(),
            service_type: refs.service_type(tx.service_type_id.as_deref()).cloned(),
            transaction: tx.clone(),
        })
        .collect()
}

/// T1b.
pub fn detect_missing_execution_dates(records: &[EnrichedRecord]) -> Vec<LineFinding> {
    records
        .iter()
        .filter(|r| r.line.execution_date.is_none())
        .map(|r| LineFinding {
            reason: MISSING_EXECUTION_DATE_REASON.to_string(),
            record: r.clone(),
        })
        .collect()
}
