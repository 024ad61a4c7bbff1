/// Raw table and column names of the upstream claims database.
pub mod claims {
    pub const TRANSACTIONS: &str = "acte_trans";
    pub const ACT_LINES: &str = "list_acte_acte_trans";
    pub const TARIFFS: &str = "actes_convention";
    pub const HEALTH_STRUCTURES: &str = "structure_sante";
    pub const STRUCTURES: &str = "structure";
    pub const STRUCTURE_TYPES: &str = "type_str_sante";
    pub const BENEFICIARIES: &str = "adherent";
    pub const SERVICE_TYPES: &str = "type_prestation";
    pub const ACTS: &str = "acte";

    /// Every raw table, in load order.
    pub const ALL_TABLES: &[&str] = &[
        TRANSACTIONS,
        ACT_LINES,
        TARIFFS,
        HEALTH_STRUCTURES,
        STRUCTURES,
        STRUCTURE_TYPES,
        BENEFICIARIES,
        SERVICE_TYPES,
        ACTS,
    ];

    pub const TRANSACTION_ID: &str = "id_acte_trans";
    pub const STRUCTURE_ID: &str = "id_structure";
    pub const SERVICE_TYPE_ID: &str = "id_type_prest";
    pub const CARE_DATE: &str = "date_soin";
    pub const BENEFICIARY_ID: &str = "id_beneficiaire";

    pub const LINE_ID: &str = "id_list_acte_acte_trans";
    pub const ACT_ID: &str = "id_acte";
    pub const QUANTITY: &str = "quantite";
    pub const EXECUTION_DATE: &str = "date_execution_acte";
    pub const BILLED_AMOUNT: &str = "montant_acte";

    pub const AMENDMENT_ID: &str = "id_avenant";
    pub const CONTRACT_AMOUNT: &str = "forfait_acte_convention";

    pub const STRUCTURE_CODE_REF: &str = "str_id_structure";
    pub const STRUCTURE_TYPE_ID: &str = "id_type_str_sante";
    pub const STRUCTURE_CODE: &str = "code_structure";
    pub const STRUCTURE_NAME: &str = "nom_structure";
    pub const STRUCTURE_TYPE_LABEL: &str = "libelle_type_structure_sante";

    pub const MEMBER_ID: &str = "id_adherent";
    pub const MEMBER_NUMBER: &str = "num_bnf";
    pub const MEMBER_REGISTRATION: &str = "matricule";
    pub const MEMBER_LAST_NAME: &str = "nom";
    pub const MEMBER_FIRST_NAMES: &str = "prenoms";
    pub const MEMBER_PHONE: &str = "telephone";

    pub const SERVICE_TYPE_LABEL: &str = "libelle_type_prestation";
    pub const SERVICE_TYPE_CODE: &str = "code_prestation";

    pub const ACT_CODE: &str = "code_acte";
    pub const ACT_LABEL: &str = "libelle_acte";
}

/// Arrow schemas for the anomaly feed and its per-typology exports.
pub mod feed {
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

    pub const TYPOLOGY: &str = "typologie_code";
    pub const REASON: &str = "raison";

    /// Columns of the T1a, T1b and T2 exports.
    pub const LINE_COLUMNS: &[&str] = &[
        TYPOLOGY,
        REASON,
        "date_soin",
        "id_structure",
        "structure_code",
        "structure_nom",
        "type_structure_libelle",
        "id_beneficiaire",
        "beneficiaire_nom",
        "beneficiaire_prenom",
        "mecano",
        "beneficiaire_contact",
        "id_type_prest",
        "id_type_prestation",
        "type_prestation_libelle",
        "id_acte",
        "acte_code",
        "acte_libelle",
        "montant_execute",
        "tarif_officiel",
        "ecart_montant",
    ];

    /// Columns of the T3 export.
    pub const COLLUSION_COLUMNS: &[&str] = &[
        TYPOLOGY,
        REASON,
        "id_structure",
        "structure_code",
        "structure_nom",
        "id_beneficiaire",
        "beneficiaire_nom",
        "beneficiaire_prenom",
        "periode_debut",
        "periode_fin",
        "nb_actes_7j",
        "nb_ecarts_pos_7j",
    ];

    /// Columns of the T4 export.
    pub const SPOOFING_COLUMNS: &[&str] = &[
        TYPOLOGY,
        REASON,
        "id_beneficiaire",
        "beneficiaire_nom",
        "beneficiaire_prenom",
        "jour",
        "nb_structures",
        "structures",
    ];

    fn timestamp() -> DataType {
        DataType::Timestamp(TimeUnit::Second, None)
    }

    /// Schema of the consolidated feed: the union of every detector's fields.
    ///
    /// Only the typology code and reason are non-nullable.
    pub fn anomaly_schema() -> Schema {
        Schema::new(vec![
            Field::new(TYPOLOGY, DataType::Utf8, false),
            Field::new(REASON, DataType::Utf8, false),
            Field::new("date_soin", timestamp(), true),
            Field::new("jour", DataType::Date32, true),
            Field::new("periode_debut", timestamp(), true),
            Field::new("periode_fin", timestamp(), true),
            Field::new("id_acte_trans", DataType::Utf8, true),
            Field::new("id_acte", DataType::Utf8, true),
            Field::new("acte_code", DataType::Utf8, true),
            Field::new("acte_libelle", DataType::Utf8, true),
            Field::new("id_structure", DataType::Utf8, true),
            Field::new("structure_code", DataType::Utf8, true),
            Field::new("structure_nom", DataType::Utf8, true),
            Field::new("type_structure_libelle", DataType::Utf8, true),
            Field::new("id_beneficiaire", DataType::Utf8, true),
            Field::new("beneficiaire_nom", DataType::Utf8, true),
            Field::new("beneficiaire_prenom", DataType::Utf8, true),
            Field::new("mecano", DataType::Utf8, true),
            Field::new("beneficiaire_contact", DataType::Utf8, true),
            Field::new("id_type_prest", DataType::Utf8, true),
            Field::new("id_type_prestation", DataType::Utf8, true),
            Field::new("type_prestation_libelle", DataType::Utf8, true),
            Field::new("montant_execute", DataType::Float64, true),
            Field::new("tarif_officiel", DataType::Float64, true),
            Field::new("ecart_montant", DataType::Float64, true),
            Field::new("nb_actes_7j", DataType::Int64, true),
            Field::new("nb_ecarts_pos_7j", DataType::Int64, true),
            Field::new("nb_structures", DataType::Int64, true),
            Field::new("structures", DataType::Utf8, true),
        ])
    }
}
