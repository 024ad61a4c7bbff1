//! Descriptive labels for structures, beneficiaries, service types and acts.
//!
//! Built from the raw lookup tables by projection and renaming only; nothing
//! is filtered or aggregated. When a lookup key repeats, the first row wins,
//! so a duplicated lookup row can never fan out an enriched record.

use std::collections::HashMap;

use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::EngineError;
use crate::decode::{Columns, RawTables, string_at};
use crate::model::{ActLabel, BeneficiaryLabel, ServiceTypeLabel, StructureLabel};
use crate::schema::claims;

/// Label tables keyed by entity id.
#[derive(Debug, Clone, Default)]
pub struct References {
    pub structures: HashMap<String, StructureLabel>,
    pub beneficiaries: HashMap<String, BeneficiaryLabel>,
    pub service_types: HashMap<String, ServiceTypeLabel>,
    pub acts: HashMap<String, ActLabel>,
}

impl References {
    /// Resolve every label table from the raw lookup tables.
    pub fn from_raw(raw: &RawTables) -> Result<Self, EngineError> {
        let refs = Self {
            structures: structure_labels(
                &raw.health_structures,
                &raw.structures,
                &raw.structure_types,
            )?,
            beneficiaries: beneficiary_labels(&raw.beneficiaries)?,
            service_types: service_type_labels(&raw.service_types)?,
            acts: act_labels(&raw.acts)?,
        };
        info!(
            structures = refs.structures.len(),
            beneficiaries = refs.beneficiaries.len(),
            service_types = refs.service_types.len(),
            acts = refs.acts.len(),
            "resolved reference labels"
        );
        Ok(refs)
    }

    pub fn structure(&self, id: Option<&str>) -> Option<&StructureLabel> {
        id.and_then(|id| self.structures.get(id))
    }

    pub fn beneficiary(&self, id: Option<&str>) -> Option<&BeneficiaryLabel> {
        id.and_then(|id| self.beneficiaries.get(id))
    }

    pub fn service_type(&self, id: Option<&str>) -> Option<&ServiceTypeLabel> {
        id.and_then(|id| self.service_types.get(id))
    }

    pub fn act(&self, id: Option<&str>) -> Option<&ActLabel> {
        id.and_then(|id| self.acts.get(id))
    }
}

/// `structure_sante` left-joined to `structure` (on the structure code) and
/// to `type_str_sante` (on the facility type).
fn structure_labels(
    health_structures: &[RecordBatch],
    structures: &[RecordBatch],
    structure_types: &[RecordBatch],
) -> Result<HashMap<String, StructureLabel>, EngineError> {
    let mut names: HashMap<String, Option<String>> = HashMap::new();
    for batch in structures {
        let cols = Columns::new(claims::STRUCTURES, batch);
        let codes = cols.strings(claims::STRUCTURE_CODE)?;
        let values = cols.strings(claims::STRUCTURE_NAME)?;
        for row in 0..batch.num_rows() {
            if let Some(code) = string_at(&codes, row) {
                names.entry(code).or_insert_with(|| string_at(&values, row));
            }
        }
    }

    let mut type_labels: HashMap<String, Option<String>> = HashMap::new();
    for batch in structure_types {
        let cols = Columns::new(claims::STRUCTURE_TYPES, batch);
        let ids = cols.strings(claims::STRUCTURE_TYPE_ID)?;
        let values = cols.strings(claims::STRUCTURE_TYPE_LABEL)?;
        for row in 0..batch.num_rows() {
            if let Some(id) = string_at(&ids, row) {
                type_labels
                    .entry(id)
                    .or_insert_with(|| string_at(&values, row));
            }
        }
    }

    let mut out = HashMap::new();
    for batch in health_structures {
        let cols = Columns::new(claims::HEALTH_STRUCTURES, batch);
        let ids = cols.strings(claims::STRUCTURE_ID)?;
        let codes = cols.strings(claims::STRUCTURE_CODE_REF)?;
        let types = cols.strings(claims::STRUCTURE_TYPE_ID)?;
        for row in 0..batch.num_rows() {
            let Some(id) = string_at(&ids, row) else {
                continue;
            };
            let code = string_at(&codes, row);
            let type_id = string_at(&types, row);
            out.entry(id).or_insert_with(|| StructureLabel {
                name: code
                    .as_ref()
                    .and_then(|c| names.get(c))
                    .cloned()
                    .flatten(),
                type_label: type_id
                    .as_ref()
                    .and_then(|t| type_labels.get(t))
                    .cloned()
                    .flatten(),
                code,
            });
        }
    }
    Ok(out)
}

fn beneficiary_labels(
    batches: &[RecordBatch],
) -> Result<HashMap<String, BeneficiaryLabel>, EngineError> {
    let mut out = HashMap::new();
    for batch in batches {
        let cols = Columns::new(claims::BENEFICIARIES, batch);
        let ids = cols.strings(claims::MEMBER_ID)?;
        let numbers = cols.strings(claims::MEMBER_NUMBER)?;
        let registrations = cols.strings(claims::MEMBER_REGISTRATION)?;
        let last_names = cols.strings(claims::MEMBER_LAST_NAME)?;
        let first_names = cols.strings(claims::MEMBER_FIRST_NAMES)?;
        let phones = cols.strings(claims::MEMBER_PHONE)?;
        for row in 0..batch.num_rows() {
            if let Some(id) = string_at(&ids, row) {
                out.entry(id).or_insert_with(|| BeneficiaryLabel {
                    number: string_at(&numbers, row),
                    registration: string_at(&registrations, row),
                    last_name: string_at(&last_names, row),
                    first_names: string_at(&first_names, row),
                    contact: string_at(&phones, row),
                });
            }
        }
    }
    Ok(out)
}

fn service_type_labels(
    batches: &[RecordBatch],
) -> Result<HashMap<String, ServiceTypeLabel>, EngineError> {
    let mut out = HashMap::new();
    for batch in batches {
        let cols = Columns::new(claims::SERVICE_TYPES, batch);
        let ids = cols.strings(claims::SERVICE_TYPE_ID)?;
        let labels = cols.strings(claims::SERVICE_TYPE_LABEL)?;
        let codes = cols.strings(claims::SERVICE_TYPE_CODE)?;
        for row in 0..batch.num_rows() {
            if let Some(id) = string_at(&ids, row) {
                out.entry(id.clone()).or_insert_with(|| ServiceTypeLabel {
                    id,
                    label: string_at(&labels, row),
                    code: string_at(&codes, row),
                });
            }
        }
    }
    Ok(out)
}

fn act_labels(batches: &[RecordBatch]) -> Result<HashMap<String, ActLabel>, EngineError> {
    let mut out = HashMap::new();
    for batch in batches {
        let cols = Columns::new(claims::ACTS, batch);
        let ids = cols.strings(claims::ACT_ID)?;
        let codes = cols.strings(claims::ACT_CODE)?;
        let labels = cols.strings(claims::ACT_LABEL)?;
        for row in 0..batch.num_rows() {
            if let Some(id) = string_at(&ids, row) {
                out.entry(id).or_insert_with(|| ActLabel {
                    code: string_at(&codes, row),
                    label: string_at(&labels, row),
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{string_batch, reference_tables};

    #[test]
    fn structure_label_joins_name_and_type() {
        let refs = References::from_raw(&reference_tables()).unwrap();
        let s1 = refs.structure(Some("S1")).unwrap();
        assert_eq!(s1.code.as_deref(), Some("C1"));
        assert_eq!(s1.name.as_deref(), Some("Clinique du Plateau"));
        assert_eq!(s1.type_label.as_deref(), Some("Clinique"));
    }

    #[test]
    fn unmatched_structure_code_keeps_the_row() {
        let refs = References::from_raw(&reference_tables()).unwrap();
        // S3 points at a structure code that has no `structure` row.
        let s3 = refs.structure(Some("S3")).unwrap();
        assert_eq!(s3.code.as_deref(), Some("C9"));
        assert_eq!(s3.name, None);
        assert_eq!(s3.type_label.as_deref(), Some("Pharmacie"));
    }

    #[test]
    fn beneficiary_service_type_and_act_labels() {
        let refs = References::from_raw(&reference_tables()).unwrap();

        let b = refs.beneficiary(Some("B1")).unwrap();
        assert_eq!(b.last_name.as_deref(), Some("KOUASSI"));
        assert_eq!(b.first_names.as_deref(), Some("Awa"));
        assert_eq!(b.registration.as_deref(), Some("M-001"));

        let tp = refs.service_type(Some("P1")).unwrap();
        assert_eq!(tp.id, "P1");
        assert_eq!(tp.label.as_deref(), Some("Consultation"));

        let act = refs.act(Some("A1")).unwrap();
        assert_eq!(act.code.as_deref(), Some("CS"));
    }

    #[test]
    fn lookups_on_missing_keys_are_none() {
        let refs = References::from_raw(&reference_tables()).unwrap();
        assert!(refs.structure(None).is_none());
        assert!(refs.beneficiary(Some("nobody")).is_none());
    }

    #[test]
    fn duplicate_keys_keep_the_first_row() {
        let mut raw = reference_tables();
        raw.acts = vec![string_batch(
            &["id_acte", "code_acte", "libelle_acte"],
            &[
                &[Some("A1"), Some("CS"), Some("first")],
                &[Some("A1"), Some("CS"), Some("second")],
            ],
        )];
        let refs = References::from_raw(&raw).unwrap();
        assert_eq!(refs.acts.len(), 1);
        assert_eq!(refs.acts["A1"].label.as_deref(), Some("first"));
    }

    #[test]
    fn missing_lookup_column_is_fatal() {
        let mut raw = reference_tables();
        raw.beneficiaries = vec![string_batch(&["id_adherent", "nom"], &[&[Some("B1"), Some("X")]])];
        let err = References::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingColumn {
                table: "adherent",
                ..
            }
        ));
    }

    #[test]
    fn empty_lookups_resolve_to_empty_maps() {
        let refs = References::from_raw(&RawTables::default()).unwrap();
        assert!(refs.structures.is_empty());
        assert!(refs.acts.is_empty());
    }
}
