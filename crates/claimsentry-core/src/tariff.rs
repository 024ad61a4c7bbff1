//! Current contracted tariff per act.
//!
//! Each act may carry several tariffs, one per contract amendment. The
//! current one is the tariff of the highest amendment id. When two rows share
//! that maximum id, the row that comes later in the input wins.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use arrow::record_batch::RecordBatch;
use tracing::{info, warn};

use crate::EngineError;
use crate::decode::{Columns, float_at, integer_at, row_count, string_at};
use crate::model::ContractTariff;
use crate::schema::claims;

/// Decode `actes_convention`.
pub fn read_tariffs(batches: &[RecordBatch]) -> Result<Vec<ContractTariff>, EngineError> {
    let mut out = Vec::with_capacity(row_count(batches));
    for batch in batches {
        let cols = Columns::new(claims::TARIFFS, batch);
        let amendments = cols.integers(claims::AMENDMENT_ID)?;
        let acts = cols.strings(claims::ACT_ID)?;
        let amounts = cols.floats(claims::CONTRACT_AMOUNT)?;
        for row in 0..batch.num_rows() {
            out.push(ContractTariff {
                amendment_id: cols.require(
                    claims::AMENDMENT_ID,
                    row,
                    integer_at(&amendments, row),
                )?,
                act_id: cols.require(claims::ACT_ID, row, string_at(&acts, row))?,
                amount: float_at(&amounts, row),
            });
        }
    }
    Ok(out)
}

/// Mapping from act id to its current contracted amount.
#[derive(Debug, Clone, Default)]
pub struct TariffBook {
    current: HashMap<String, (i64, Option<f64>)>,
}

impl TariffBook {
    pub fn resolve(tariffs: &[ContractTariff]) -> Self {
        if tariffs.is_empty() {
            warn!("tariff table is empty, overbilling (T2) will not compare against tariffs");
        }

        let mut current: HashMap<String, (i64, Option<f64>)> = HashMap::new();
        for tariff in tariffs {
            match current.entry(tariff.act_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert((tariff.amendment_id, tariff.amount));
                }
                // `>=` so that a later row with the same amendment replaces an earlier one.
                Entry::Occupied(mut slot) if tariff.amendment_id >= slot.get().0 => {
                    slot.insert((tariff.amendment_id, tariff.amount));
                }
                Entry::Occupied(_) => {}
            }
        }

        info!(
            tariffs = tariffs.len(),
            acts = current.len(),
            "resolved current tariffs"
        );
        Self { current }
    }

    /// The current tariff, `None` when the act has none or its amount is null.
    pub fn current(&self, act_id: Option<&str>) -> Option<f64> {
        act_id
            .and_then(|id| self.current.get(id))
            .and_then(|(_, amount)| *amount)
    }

    /// Amendment that supplied the current tariff.
    #[cfg(test)]
    pub(crate) fn amendment(&self, act_id: &str) -> Option<i64> {
        self.current.get(act_id).map(|(amendment, _)| *amendment)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
