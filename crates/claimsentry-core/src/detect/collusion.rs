//! T3: structure/beneficiary collusion.
//!
//! Within each (structure, beneficiary) pair, every act anchors a trailing
//! window `[anchor - 7 days, anchor]`, inclusive at both ends. The pair is
//! flagged when any anchored window holds enough acts and enough acts with a
//! positive variance. This is an interval self-join, evaluated per group with
//! a sort and two cursors instead of a cross product.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::config::COLLUSION_WINDOW_DAYS;
use crate::detect::has_beneficiaries;
use crate::model::{BeneficiaryLabel, EnrichedRecord, StructureLabel};

#[derive(Debug, Clone, PartialEq)]
pub struct CollusionFinding {
    pub reason: String,
    pub structure_id: String,
    pub beneficiary_id: String,
    pub structure: Option<StructureLabel>,
    pub beneficiary: Option<BeneficiaryLabel>,
    /// Earliest care date inside the reported window.
    pub window_start: NaiveDateTime,
    /// Latest care date inside the reported window (the anchor).
    pub window_end: NaiveDateTime,
    pub act_count: usize,
    pub positive_variance_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    start: NaiveDateTime,
    end: NaiveDateTime,
    acts: usize,
    positives: usize,
}

/// Flag (structure, beneficiary) pairs with a dense 7-day window.
///
/// Output is ordered by structure id, then beneficiary id.
pub fn detect_collusion(
    records: &[EnrichedRecord],
    min_acts: usize,
    min_positive: usize,
) -> Vec<CollusionFinding> {
    if !has_beneficiaries(records) {
        debug!("no beneficiary ids in the snapshot, skipping collusion detection");
        return Vec::new();
    }

    let mut groups: BTreeMap<(&str, &str), Vec<&EnrichedRecord>> = BTreeMap::new();
    for r in records {
        if let (Some(structure), Some(beneficiary)) = (
            r.transaction.structure_id.as_deref(),
            r.transaction.beneficiary_id.as_deref(),
        ) {
            groups.entry((structure, beneficiary)).or_default().push(r);
        }
    }

    let reason =
        format!("7-day collusion (acts>={min_acts}, positive variances>={min_positive})");

    groups
        .into_iter()
        .filter_map(|((structure_id, beneficiary_id), mut members)| {
            members.sort_by_key(|r| r.transaction.care_date);
            let window = densest_window(&members, min_acts, min_positive)?;
            let first = members[0];
            Some(CollusionFinding {
                reason: reason.clone(),
                structure_id: structure_id.to_string(),
                beneficiary_id: beneficiary_id.to_string(),
                structure: first.structure.clone(),
                beneficiary: first.beneficiary.clone(),
                window_start: window.start,
                window_end: window.end,
                act_count: window.acts,
                positive_variance_count: window.positives,
            })
        })
        .collect()
}

/// Best qualifying window over `members`, sorted by care date.
///
/// Among windows meeting both minimums, prefers the most acts, then the most
/// positive variances, then the earliest anchor.
fn densest_window(
    members: &[&EnrichedRecord],
    min_acts: usize,
    min_positive: usize,
) -> Option<Window> {
    let span = Duration::days(COLLUSION_WINDOW_DAYS);

    // positives[i] = positive-variance acts among members[..i]
    let mut positives = Vec::with_capacity(members.len() + 1);
    positives.push(0usize);
    for r in members {
        let last = positives[positives.len() - 1];
        positives.push(last + usize::from(r.has_positive_variance()));
    }

    let mut best: Option<Window> = None;
    let mut start = 0;
    let mut end = 0;
    while end < members.len() {
        let anchor = members[end].transaction.care_date;
        // Acts sharing the anchor's date are inside its window too.
        let mut last = end;
        while last + 1 < members.len() && members[last + 1].transaction.care_date == anchor {
            last += 1;
        }
        while members[start].transaction.care_date < anchor - span {
            start += 1;
        }

        let acts = last - start + 1;
        let pos = positives[last + 1] - positives[start];
        if acts >= min_acts && pos >= min_positive {
            let better = best.is_none_or(|b| (acts, pos) > (b.acts, b.positives));
            if better {
                best = Some(Window {
                    start: members[start].transaction.care_date,
                    end: anchor,
                    acts,
                    positives: pos,
                });
            }
        }
        end = last + 1;
    }
    best
}
