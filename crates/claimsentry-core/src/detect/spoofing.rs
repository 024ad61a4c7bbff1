//! T4: one beneficiary seen at several structures on the same calendar day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::detect::has_beneficiaries;
use crate::model::{BeneficiaryLabel, EnrichedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct SpoofingFinding {
    pub reason: String,
    pub beneficiary_id: String,
    pub beneficiary: Option<BeneficiaryLabel>,
    pub day: NaiveDate,
    pub structure_count: usize,
    /// Sorted, deduplicated, comma-joined structure ids.
    pub structures: String,
}

/// Output is ordered by beneficiary id, then day.
pub fn detect_identity_spoofing(
    records: &[EnrichedRecord],
    min_structures: usize,
) -> Vec<SpoofingFinding> {
    if !has_beneficiaries(records) {
        debug!("no beneficiary ids in the snapshot, skipping identity spoofing detection");
        return Vec::new();
    }

    let mut groups: BTreeMap<(&str, NaiveDate), (&EnrichedRecord, BTreeSet<&str>)> =
        BTreeMap::new();
    for r in records {
        let Some(beneficiary) = r.transaction.beneficiary_id.as_deref() else {
            continue;
        };
        let day = r.transaction.care_date.date();
        let (_, structures) = groups
            .entry((beneficiary, day))
            .or_insert_with(|| (r, BTreeSet::new()));
        if let Some(structure) = r.transaction.structure_id.as_deref() {
            structures.insert(structure);
        }
    }

    let reason = format!("same beneficiary at >={min_structures} structures on the same day");
    groups
        .into_iter()
        .filter(|(_, (_, structures))| structures.len() >= min_structures)
        .map(|((beneficiary_id, day), (first, structures))| SpoofingFinding {
            reason: reason.clone(),
            beneficiary_id: beneficiary_id.to_string(),
            beneficiary: first.beneficiary.clone(),
            day,
            structure_count: structures.len(),
            structures: structures.into_iter().collect::<Vec<_>>().join(","),
        })
        .collect()
}
