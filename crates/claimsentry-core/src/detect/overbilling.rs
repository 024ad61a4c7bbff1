//! T2: executed amount above the contracted tariff.

use crate::detect::LineFinding;
use crate::model::EnrichedRecord;

/// Flag records billed above `tariff × (1 + tolerance)`.
///
/// A record without a resolved tariff is never flagged: an unknown tariff is
/// not evidence of overbilling.
pub fn detect_overbilling(records: &[EnrichedRecord], tolerance: f64) -> Vec<LineFinding> {
    let reason = format!("overbilling: executed amount > tariff x (1+{tolerance:.2})");
    records
        .iter()
        .filter(|r| is_overbilled(r, tolerance))
        .map(|r| LineFinding {
            reason: reason.clone(),
            record: r.clone(),
        })
        .collect()
}

fn is_overbilled(record: &EnrichedRecord, tolerance: f64) -> bool {
    match (record.executed_amount(), record.tariff) {
        (Some(executed), Some(tariff)) => executed > tariff * (1.0 + tolerance),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn priced(id: &str, billed: f64, tariff: Option<f64>) -> EnrichedRecord {
        let mut r = record(id, "S1", Some("B1"), "2025-01-10");
        r.line.billed_amount = Some(billed);
        r.tariff = tariff;
        r
    }

    #[test]
    fn billed_above_tariff_is_flagged_with_variance() {
        let findings = detect_overbilling(&[priced("L1", 1500.0, Some(1000.0))], 0.0);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].record.variance(), Some(500.0));
        assert_eq!(
            findings[0].reason,
            "overbilling: executed amount > tariff x (1+0.00)"
        );
    }

    #[test]
    fn equal_to_tariff_is_not_flagged() {
        assert!(detect_overbilling(&[priced("L1", 1000.0, Some(1000.0))], 0.0).is_empty());
    }

    #[test]
    fn tolerance_raises_the_bar() {
        let records = [
            priced("L1", 1090.0, Some(1000.0)),
            priced("L2", 1110.0, Some(1000.0)),
        ];
        let findings = detect_overbilling(&records, 0.10);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].record.line.id, "L2");
        assert!(findings[0].reason.contains("(1+0.10)"));
    }

    #[test]
    fn unknown_tariff_is_never_flagged() {
        assert!(detect_overbilling(&[priced("L1", 1_000_000.0, None)], 0.0).is_empty());
    }

    #[test]
    fn flagged_iff_inequality_holds_with_a_tariff() {
        let records: Vec<EnrichedRecord> = (0..40)
            .map(|i| {
                let tariff = if i % 4 == 0 { None } else { Some(100.0) };
                priced(&format!("L{i}"), 80.0 + i as f64, tariff)
            })
            .collect();
        let tolerance = 0.05;
        let flagged: Vec<String> = detect_overbilling(&records, tolerance)
            .into_iter()
            .map(|f| f.record.line.id)
            .collect();
        for r in &records {
            let expected = r
                .tariff
                .is_some_and(|t| r.executed_amount().unwrap() > t * (1.0 + tolerance));
            assert_eq!(flagged.contains(&r.line.id), expected, "{}", r.line.id);
        }
    }
}
