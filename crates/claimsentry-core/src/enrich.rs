//! The enriched record set shared by every line-level detector.
//!
//! Join plan, applied per act line in input order:
//!
//! | right side       | key                          | kind  |
//! |------------------|------------------------------|-------|
//! | transactions     | `id_acte_trans`              | inner |
//! | current tariff   | `id_acte`                    | left  |
//! | structure labels | `id_structure`               | left  |
//! | beneficiaries    | `id_beneficiaire`            | left  |
//! | service types    | `id_type_prest`              | left  |
//! | act labels       | `id_acte`                    | left  |
//!
//! An act line whose transaction is not in the snapshot is dropped: lines
//! are only ever pulled for transactions inside the window, so such a line
//! is a data-integrity fault upstream rather than something to report.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::model::{ActLine, EnrichedRecord, Transaction};
use crate::reference::References;
use crate::tariff::TariffBook;

pub fn enrich(
    lines: &[ActLine],
    transactions: &[Transaction],
    tariffs: &TariffBook,
    refs: &References,
) -> Vec<EnrichedRecord> {
    // Transaction ids are unique upstream; keep the first if not.
    let mut by_id: HashMap<&str, &Transaction> = HashMap::with_capacity(transactions.len());
    for tx in transactions {
        by_id.entry(tx.id.as_str()).or_insert(tx);
    }

    let mut dropped = 0usize;
    let records: Vec<EnrichedRecord> = lines
        .iter()
        .filter_map(|line| {
            let Some(tx) = by_id.get(line.transaction_id.as_str()) else {
                dropped += 1;
                return None;
            };
            let act_id = line.act_id.as_deref();
            Some(EnrichedRecord {
                line: line.clone(),
                transaction: (*tx).clone(),
                tariff: tariffs.current(act_id),
                structure: refs.structure(tx.structure_id.as_deref()).cloned(),
                beneficiary: refs.beneficiary(tx.beneficiary_id.as_deref()).cloned(),
                service_type: refs.service_type(tx.service_type_id.as_deref()).cloned(),
                act: refs.act(act_id).cloned(),
            })
        })
        .collect();

    if dropped > 0 {
        debug!(dropped, "act lines without a matching transaction dropped");
    }
    info!(records = records.len(), "enriched act lines");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContractTariff;
    use crate::testing::{date, line, reference_tables, transaction};

    fn refs() -> References {
        References::from_raw(&reference_tables()).unwrap()
    }

    #[test]
    fn one_record_per_matched_line_in_line_order() {
        let txs = vec![
            transaction("T1", "S1", Some("B1"), "2025-01-10"),
            transaction("T2", "S2", Some("B2"), "2025-01-11"),
        ];
        let lines = vec![
            line("L1", "T2", "A1", Some(100.0)),
            line("L2", "T1", "A1", Some(200.0)),
            line("L3", "T1", "A2", Some(300.0)),
        ];
        let records = enrich(&lines, &txs, &TariffBook::default(), &refs());
        let ids: Vec<&str> = records.iter().map(|r| r.line.id.as_str()).collect();
        assert_eq!(ids, ["L1", "L2", "L3"]);
        assert_eq!(records[0].transaction.id, "T2");
        assert_eq!(records[1].transaction.care_date, date("2025-01-10"));
    }

    #[test]
    fn orphan_lines_are_dropped() {
        let txs = vec![transaction("T1", "S1", None, "2025-01-10")];
        let lines = vec![
            line("L1", "T1", "A1", Some(100.0)),
            line("L2", "T404", "A1", Some(100.0)),
        ];
        let records = enrich(&lines, &txs, &TariffBook::default(), &refs());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line.id, "L1");
    }

    #[test]
    fn tariff_and_labels_attached() {
        let txs = vec![transaction("T1", "S1", Some("B1"), "2025-01-10")];
        let lines = vec![line("L1", "T1", "A1", Some(1500.0))];
        let book = TariffBook::resolve(&[ContractTariff {
            amendment_id: 1,
            act_id: "A1".into(),
            amount: Some(1000.0),
        }]);
        let records = enrich(&lines, &txs, &book, &refs());
        let r = &records[0];
        assert_eq!(r.tariff, Some(1000.0));
        assert_eq!(r.variance(), Some(500.0));
        assert_eq!(
            r.structure.as_ref().and_then(|s| s.name.as_deref()),
            Some("Clinique du Plateau")
        );
        assert_eq!(
            r.beneficiary.as_ref().and_then(|b| b.last_name.as_deref()),
            Some("KOUASSI")
        );
        assert_eq!(r.service_type.as_ref().map(|t| t.id.as_str()), Some("P1"));
        assert_eq!(
            r.act.as_ref().and_then(|a| a.code.as_deref()),
            Some("CS")
        );
    }

    #[test]
    fn unmatched_labels_are_null_not_dropped() {
        let txs = vec![transaction("T1", "S404", Some("B404"), "2025-01-10")];
        let lines = vec![line("L1", "T1", "A404", Some(10.0))];
        let records = enrich(&lines, &txs, &TariffBook::default(), &refs());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert!(r.structure.is_none());
        assert!(r.beneficiary.is_none());
        assert!(r.act.is_none());
        assert!(r.tariff.is_none());
        assert_eq!(r.variance(), Some(10.0));
    }
}
