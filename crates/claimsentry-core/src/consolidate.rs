//! One homogeneous anomaly feed from the five detector outputs.
//!
//! Every row carries the full field set of the feed schema; fields a detector
//! does not produce stay `None`. Rows are concatenated in [`Detector::ALL`]
//! order, keeping each detector's own row order.

use chrono::{NaiveDate, NaiveDateTime};

use crate::detect::{
    CollusionFinding, Detections, Detector, LineFinding, OrphanTransaction, SpoofingFinding,
    Typology,
};
use crate::model::{BeneficiaryLabel, ServiceTypeLabel, StructureLabel};

/// One row of the consolidated feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub typology: Typology,
    pub reason: String,
    pub care_date: Option<NaiveDateTime>,
    pub day: Option<NaiveDate>,
    pub window_start: Option<NaiveDateTime>,
    pub window_end: Option<NaiveDateTime>,
    pub transaction_id: Option<String>,
    pub act_id: Option<String>,
    pub act_code: Option<String>,
    pub act_label: Option<String>,
    pub structure_id: Option<String>,
    pub structure_code: Option<String>,
    pub structure_name: Option<String>,
    pub structure_type_label: Option<String>,
    pub beneficiary_id: Option<String>,
    pub beneficiary_last_name: Option<String>,
    pub beneficiary_first_names: Option<String>,
    pub beneficiary_registration: Option<String>,
    pub beneficiary_contact: Option<String>,
    pub service_type_id: Option<String>,
    /// Key of the matched service-type label; `None` when the label lookup missed.
    pub service_type_label_id: Option<String>,
    pub service_type_label: Option<String>,
    pub executed_amount: Option<f64>,
    pub tariff: Option<f64>,
    pub variance: Option<f64>,
    pub acts_7d: Option<i64>,
    pub positive_variances_7d: Option<i64>,
    pub structure_count: Option<i64>,
    pub structures: Option<String>,
}

impl Anomaly {
    /// A row with only the typology and reason set.
    pub fn new(typology: Typology, reason: impl Into<String>) -> Self {
        Self {
            typology,
            reason: reason.into(),
            care_date: None,
            day: None,
            window_start: None,
            window_end: None,
            transaction_id: None,
            act_id: None,
            act_code: None,
            act_label: None,
            structure_id: None,
            structure_code: None,
            structure_name: None,
            structure_type_label: None,
            beneficiary_id: None,
            beneficiary_last_name: None,
            beneficiary_first_names: None,
            beneficiary_registration: None,
            beneficiary_contact: None,
            service_type_id: None,
            service_type_label_id: None,
            service_type_label: None,
            executed_amount: None,
            tariff: None,
            variance: None,
            acts_7d: None,
            positive_variances_7d: None,
            structure_count: None,
            structures: None,
        }
    }

    fn with_structure(mut self, id: Option<&str>, label: Option<&StructureLabel>) -> Self {
        self.structure_id = id.map(str::to_string);
        if let Some(label) = label {
            self.structure_code = label.code.clone();
            self.structure_name = label.name.clone();
            self.structure_type_label = label.type_label.clone();
        }
        self
    }

    fn with_beneficiary(mut self, id: Option<&str>, label: Option<&BeneficiaryLabel>) -> Self {
        self.beneficiary_id = id.map(str::to_string);
        if let Some(label) = label {
            self.beneficiary_last_name = label.last_name.clone();
            self.beneficiary_first_names = label.first_names.clone();
            self.beneficiary_registration = label.registration.clone();
            self.beneficiary_contact = label.contact.clone();
        }
        self
    }

    fn with_service_type(mut self, id: Option<&str>, label: Option<&ServiceTypeLabel>) -> Self {
        self.service_type_id = id.map(str::to_string);
        if let Some(label) = label {
            self.service_type_label_id = Some(label.id.clone());
            self.service_type_label = label.label.clone();
        }
        self
    }
}

fn orphan_row(finding: &OrphanTransaction, typology: Typology) -> Anomaly {
    let tx = &finding.transaction;
    let mut row = Anomaly::new(typology, finding.reason.as_str())
        .with_structure(tx.structure_id.as_deref(), finding.structure.as_ref())
        .with_beneficiary(tx.beneficiary_id.as_deref(), finding.beneficiary.as_ref())
        .with_service_type(tx.service_type_id.as_deref(), finding.service_type.as_ref());
    row.care_date = Some(tx.care_date);
    row.transaction_id = Some(tx.id.clone());
    row
}

fn line_row(finding: &LineFinding, typology: Typology) -> Anomaly {
    let r = &finding.record;
    let tx = &r.transaction;
    let mut row = Anomaly::new(typology, finding.reason.as_str())
        .with_structure(tx.structure_id.as_deref(), r.structure.as_ref())
        .with_beneficiary(tx.beneficiary_id.as_deref(), r.beneficiary.as_ref())
        .with_service_type(tx.service_type_id.as_deref(), r.service_type.as_ref());
    row.care_date = Some(tx.care_date);
    row.transaction_id = Some(tx.id.clone());
    row.act_id = r.line.act_id.clone();
    if let Some(act) = &r.act {
        row.act_code = act.code.clone();
        row.act_label = act.label.clone();
    }
    row.executed_amount = r.executed_amount();
    row.tariff = r.tariff;
    row.variance = r.variance();
    row
}

fn collusion_row(finding: &CollusionFinding, typology: Typology) -> Anomaly {
    let mut row = Anomaly::new(typology, finding.reason.as_str())
        .with_structure(Some(&finding.structure_id), finding.structure.as_ref())
        .with_beneficiary(Some(&finding.beneficiary_id), finding.beneficiary.as_ref());
    row.window_start = Some(finding.window_start);
    row.window_end = Some(finding.window_end);
    row.acts_7d = Some(finding.act_count as i64);
    row.positive_variances_7d = Some(finding.positive_variance_count as i64);
    row
}

fn spoofing_row(finding: &SpoofingFinding, typology: Typology) -> Anomaly {
    let mut row = Anomaly::new(typology, finding.reason.as_str())
        .with_beneficiary(Some(&finding.beneficiary_id), finding.beneficiary.as_ref());
    row.day = Some(finding.day);
    row.structure_count = Some(finding.structure_count as i64);
    row.structures = Some(finding.structures.clone());
    row
}

/// Rows of a single detector, stamped with its typology.
pub fn detector_rows(detections: &Detections, detector: Detector) -> Vec<Anomaly> {
    let typology = detector.typology();
    match detector {
        Detector::OrphanTransaction => detections
            .orphan_transactions
            .iter()
            .map(|f| orphan_row(f, typology))
            .collect(),
        Detector::MissingExecutionDate => detections
            .missing_execution_dates
            .iter()
            .map(|f| line_row(f, typology))
            .collect(),
        Detector::Overbilling => detections
            .overbilling
            .iter()
            .map(|f| line_row(f, typology))
            .collect(),
        Detector::Collusion => detections
            .collusion
            .iter()
            .map(|f| collusion_row(f, typology))
            .collect(),
        Detector::IdentitySpoofing => detections
            .identity_spoofing
            .iter()
            .map(|f| spoofing_row(f, typology))
            .collect(),
    }
}

/// The full feed: T1a, T1b, T2, T3, T4.
pub fn consolidate(detections: &Detections) -> Vec<Anomaly> {
    Detector::ALL
        .iter()
        .flat_map(|&d| detector_rows(detections, d))
        .collect()
}
