//! Fixtures shared by the unit tests.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};

use crate::decode::RawTables;
use crate::model::{ActLine, EnrichedRecord, Transaction};

/// Midnight of an ISO date.
pub(crate) fn date(s: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Transaction with service type `P1`.
pub(crate) fn transaction(
    id: &str,
    structure: &str,
    beneficiary: Option<&str>,
    care_date: &str,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        structure_id: Some(structure.to_string()),
        service_type_id: Some("P1".to_string()),
        care_date: date(care_date),
        beneficiary_id: beneficiary.map(str::to_string),
    }
}

/// Act line executed on 2025-01-10.
pub(crate) fn line(id: &str, transaction: &str, act: &str, billed: Option<f64>) -> ActLine {
    ActLine {
        id: id.to_string(),
        transaction_id: transaction.to_string(),
        act_id: Some(act.to_string()),
        quantity: Some(1.0),
        execution_date: Some(date("2025-01-10")),
        billed_amount: billed,
    }
}

/// Enriched record on act `A1`, billed at its tariff of 100, no labels.
pub(crate) fn record(
    line_id: &str,
    structure: &str,
    beneficiary: Option<&str>,
    care_date: &str,
) -> EnrichedRecord {
    let transaction = transaction(&format!("TX-{line_id}"), structure, beneficiary, care_date);
    EnrichedRecord {
        line: ActLine {
            id: line_id.to_string(),
            transaction_id: transaction.id.clone(),
            act_id: Some("A1".to_string()),
            quantity: Some(1.0),
            execution_date: Some(transaction.care_date),
            billed_amount: Some(100.0),
        },
        transaction,
        tariff: Some(100.0),
        structure: None,
        beneficiary: None,
        service_type: None,
        act: None,
    }
}

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> RecordBatch {
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}

/// `acte_trans` rows of (id, structure, beneficiary, care date), all text.
pub(crate) fn transactions_batch(rows: &[(&str, &str, Option<&str>, &str)]) -> RecordBatch {
    batch(
        vec![
            Field::new("id_acte_trans", DataType::Utf8, false),
            Field::new("id_structure", DataType::Utf8, true),
            Field::new("id_type_prest", DataType::Utf8, true),
            Field::new("date_soin", DataType::Utf8, false),
            Field::new("id_beneficiaire", DataType::Utf8, true),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|_| "P1"))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.3))),
            Arc::new(rows.iter().map(|r| r.2).collect::<StringArray>()),
        ],
    )
}

/// `list_acte_acte_trans` rows of (id, transaction, act, execution date, amount).
pub(crate) fn act_lines_batch(
    rows: &[(&str, &str, &str, Option<&str>, Option<f64>)],
) -> RecordBatch {
    batch(
        vec![
            Field::new("id_list_acte_acte_trans", DataType::Utf8, false),
            Field::new("id_acte_trans", DataType::Utf8, false),
            Field::new("id_acte", DataType::Utf8, true),
            Field::new("quantite", DataType::Float64, true),
            Field::new("date_execution_acte", DataType::Utf8, true),
            Field::new("montant_acte", DataType::Float64, true),
        ],
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.2))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|_| 1.0))),
            Arc::new(rows.iter().map(|r| r.3).collect::<StringArray>()),
            Arc::new(rows.iter().map(|r| r.4).collect::<Float64Array>()),
        ],
    )
}

/// `actes_convention` rows of (amendment, act, amount).
pub(crate) fn tariffs_batch(rows: &[(i64, &str, f64)]) -> RecordBatch {
    batch(
        vec![
            Field::new("id_avenant", DataType::Int64, false),
            Field::new("id_acte", DataType::Utf8, false),
            Field::new("forfait_acte_convention", DataType::Float64, true),
        ],
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.2))),
        ],
    )
}

/// A batch whose columns are all nullable text.
pub(crate) fn string_batch(columns: &[&str], rows: &[&[Option<&str>]]) -> RecordBatch {
    let fields = columns
        .iter()
        .map(|c| Field::new(*c, DataType::Utf8, true))
        .collect();
    let arrays = (0..columns.len())
        .map(|i| Arc::new(rows.iter().map(|r| r[i]).collect::<StringArray>()) as ArrayRef)
        .collect();
    batch(fields, arrays)
}

/// Lookup tables: structures S1..S3, beneficiaries B1 and B2, service type P1,
/// acts A1 and A2. S3 references a structure code with no `structure` row.
pub(crate) fn reference_tables() -> RawTables {
    RawTables {
        health_structures: vec![string_batch(
            &["id_structure", "str_id_structure", "id_type_str_sante"],
            &[
                &[Some("S1"), Some("C1"), Some("TY1")],
                &[Some("S2"), Some("C2"), Some("TY1")],
                &[Some("S3"), Some("C9"), Some("TY2")],
            ],
        )],
        structures: vec![string_batch(
            &["code_structure", "nom_structure"],
            &[
                &[Some("C1"), Some("Clinique du Plateau")],
                &[Some("C2"), Some("Centre de Sante Yopougon")],
            ],
        )],
        structure_types: vec![string_batch(
            &["id_type_str_sante", "libelle_type_structure_sante"],
            &[
                &[Some("TY1"), Some("Clinique")],
                &[Some("TY2"), Some("Pharmacie")],
            ],
        )],
        beneficiaries: vec![string_batch(
            &["id_adherent", "num_bnf", "matricule", "nom", "prenoms", "telephone"],
            &[
                &[
                    Some("B1"),
                    Some("BNF-1"),
                    Some("M-001"),
                    Some("KOUASSI"),
                    Some("Awa"),
                    Some("0700000001"),
                ],
                &[
                    Some("B2"),
                    Some("BNF-2"),
                    Some("M-002"),
                    Some("TRAORE"),
                    Some("Moussa"),
                    None,
                ],
            ],
        )],
        service_types: vec![string_batch(
            &["id_type_prest", "libelle_type_prestation", "code_prestation"],
            &[&[Some("P1"), Some("Consultation"), Some("CONS")]],
        )],
        acts: vec![string_batch(
            &["id_acte", "code_acte", "libelle_acte"],
            &[
                &[Some("A1"), Some("CS"), Some("Consultation generale")],
                &[Some("A2"), Some("NFS"), Some("Numeration formule sanguine")],
            ],
        )],
        ..Default::default()
    }
}
