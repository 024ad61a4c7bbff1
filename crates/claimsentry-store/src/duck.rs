//! DuckDB storage for the raw claims snapshot.

use std::path::Path;

use arrow::array::{Array, Int64Array};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use claimsentry_core::RawTables;
use claimsentry_core::schema::claims;
use duckdb::Connection;
use tracing::{info, warn};

use crate::StoreError;

/// DuckDB store holding the nine raw claims tables under their upstream names.
///
/// Tables are imported once from Parquet or CSV exports of the claims
/// database, then [`snapshot`](Self::snapshot) selects the slice a run
/// evaluates. Supports both in-memory (ephemeral) and persistent
/// (file-backed) modes.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open or create a persistent DuckDB database at the given path.
    ///
    /// If the file already holds the raw tables, they can be snapshotted
    /// without re-importing. Use [`has_tables`](Self::has_tables) to check.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Check whether every raw table exists.
    pub fn has_tables(&self) -> bool {
        claims::ALL_TABLES
            .iter()
            .all(|table| self.count_table(table).is_ok())
    }

    /// Load `<table>.parquet`, or failing that `<table>.csv`, from `data_dir`.
    pub fn load_table(&self, data_dir: &Path, table: &str) -> Result<usize, StoreError> {
        let parquet = data_dir.join(format!("{table}.parquet"));
        let csv = data_dir.join(format!("{table}.csv"));
        let source = if parquet.exists() {
            format!("read_parquet('{}')", sql_path(&parquet))
        } else if csv.exists() {
            format!("read_csv_auto('{}', header = true)", sql_path(&csv))
        } else {
            return Err(StoreError::SourceNotFound {
                table: table.to_string(),
                dir: data_dir.to_path_buf(),
            });
        };

        let sql = format!("CREATE OR REPLACE TABLE {table} AS SELECT * FROM {source}");
        self.conn.execute_batch(&sql)?;
        let count = self.count_table(table)?;
        info!(table, count, "loaded raw table");
        Ok(count)
    }

    /// Load every raw table from a data directory.
    pub fn load_all(&self, data_dir: &Path) -> Result<(), StoreError> {
        for table in claims::ALL_TABLES {
            self.load_table(data_dir, table)?;
        }
        Ok(())
    }

    // ── Introspection ──

    pub fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        self.single_count(&sql, [])
    }

    /// Whether `table` has a column named `column`.
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        let count = self.single_count(
            "SELECT count(*)::BIGINT AS cnt FROM information_schema.columns \
             WHERE table_name = ? AND column_name = ?",
            [table, column],
        )?;
        Ok(count > 0)
    }

    fn single_count<P: duckdb::Params>(&self, sql: &str, params: P) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params)?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        if col.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(col.value(0) as usize)
    }

    // ── Snapshot ──

    /// The raw tables for a run whose window opens on `window_start`.
    ///
    /// Transactions are restricted to care dates on or after the window
    /// start, act lines to those transactions. Lookup tables are taken whole.
    pub fn snapshot(&self, window_start: NaiveDate) -> Result<RawTables, StoreError> {
        let start = window_start.format("%Y-%m-%d").to_string();

        let beneficiary = if self.has_column(claims::TRANSACTIONS, claims::BENEFICIARY_ID)? {
            claims::BENEFICIARY_ID.to_string()
        } else {
            warn!(
                table = claims::TRANSACTIONS,
                column = claims::BENEFICIARY_ID,
                "beneficiary column absent, treating every beneficiary as unknown"
            );
            format!("CAST(NULL AS VARCHAR) AS {}", claims::BENEFICIARY_ID)
        };

        let in_window = format!(
            "CAST({date} AS DATE) >= CAST(? AS DATE)",
            date = claims::CARE_DATE
        );
        let transactions = self.query_params(
            &format!(
                "SELECT {id}, {structure}, {service_type}, {date}, {beneficiary} \
                 FROM {table} WHERE {in_window}",
                id = claims::TRANSACTION_ID,
                structure = claims::STRUCTURE_ID,
                service_type = claims::SERVICE_TYPE_ID,
                date = claims::CARE_DATE,
                table = claims::TRANSACTIONS,
            ),
            &start,
        )?;
        let act_lines = self.query_params(
            &format!(
                "SELECT l.* FROM {lines} l WHERE l.{id} IN \
                 (SELECT {id} FROM {transactions} WHERE {in_window})",
                lines = claims::ACT_LINES,
                id = claims::TRANSACTION_ID,
                transactions = claims::TRANSACTIONS,
            ),
            &start,
        )?;

        let raw = RawTables {
            transactions,
            act_lines,
            tariffs: self.select_all(claims::TARIFFS)?,
            health_structures: self.select_all(claims::HEALTH_STRUCTURES)?,
            structures: self.select_all(claims::STRUCTURES)?,
            structure_types: self.select_all(claims::STRUCTURE_TYPES)?,
            beneficiaries: self.select_all(claims::BENEFICIARIES)?,
            service_types: self.select_all(claims::SERVICE_TYPES)?,
            acts: self.select_all(claims::ACTS)?,
        };
        info!(
            window_start = %window_start,
            transactions = raw.transaction_rows(),
            act_lines = raw.act_line_rows(),
            "snapshot selected"
        );
        Ok(raw)
    }

    fn select_all(&self, table: &str) -> Result<Vec<RecordBatch>, StoreError> {
        self.query_arrow(&format!("SELECT * FROM {table}"))
    }

    fn query_params(&self, sql: &str, param: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([param])?.collect();
        Ok(batches)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn sql_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimsentry_core::{DetectionConfig, Engine, RunStatus};

    const SEED: &str = "
        CREATE TABLE acte_trans (id_acte_trans BIGINT, id_structure BIGINT, id_type_prest BIGINT,
                                 date_soin DATE, id_beneficiaire BIGINT);
        INSERT INTO acte_trans VALUES
            (1, 10, 1, DATE '2025-01-10', 100),
            (2, 20, 1, DATE '2025-01-10', 100),
            (3, 10, 1, DATE '2024-06-01', 100);

        CREATE TABLE list_acte_acte_trans (id_list_acte_acte_trans BIGINT, id_acte_trans BIGINT,
                                           id_acte BIGINT, quantite INTEGER,
                                           date_execution_acte DATE, montant_acte DECIMAL(12, 2));
        INSERT INTO list_acte_acte_trans VALUES
            (11, 1, 5, 1, DATE '2025-01-10', 1500),
            (12, 2, 5, 1, NULL, 900),
            (13, 3, 5, 1, DATE '2024-06-01', 100);

        CREATE TABLE actes_convention (id_avenant BIGINT, id_acte BIGINT,
                                       forfait_acte_convention DECIMAL(12, 2));
        INSERT INTO actes_convention VALUES (1, 5, 800), (2, 5, 1000);

        CREATE TABLE structure_sante (id_structure BIGINT, str_id_structure VARCHAR,
                                      id_type_str_sante BIGINT);
        INSERT INTO structure_sante VALUES (10, 'C10', 1), (20, 'C20', 2);

        CREATE TABLE structure (code_structure VARCHAR, nom_structure VARCHAR);
        INSERT INTO structure VALUES ('C10', 'Clinique du Plateau');

        CREATE TABLE type_str_sante (id_type_str_sante BIGINT, libelle_type_structure_sante VARCHAR);
        INSERT INTO type_str_sante VALUES (1, 'Clinique'), (2, 'Pharmacie');

        CREATE TABLE adherent (id_adherent BIGINT, num_bnf VARCHAR, matricule VARCHAR,
                               nom VARCHAR, prenoms VARCHAR, telephone VARCHAR);
        INSERT INTO adherent VALUES (100, 'BNF-100', 'M-100', 'KOUASSI', 'Awa', NULL);

        CREATE TABLE type_prestation (id_type_prest BIGINT, libelle_type_prestation VARCHAR,
                                      code_prestation VARCHAR);
        INSERT INTO type_prestation VALUES (1, 'Consultation', 'CONS');

        CREATE TABLE acte (id_acte BIGINT, code_acte VARCHAR, libelle_acte VARCHAR);
        INSERT INTO acte VALUES (5, 'CS', 'Consultation generale');
    ";

    fn seeded() -> DuckStore {
        let store = DuckStore::open().unwrap();
        store.connection().execute_batch(SEED).unwrap();
        store
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn open_in_memory() {
        let store = DuckStore::open().unwrap();
        let batches = store.query_arrow("SELECT 1 AS x").unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), 1);
    }

    #[test]
    fn has_tables_false_for_empty_memory() {
        let store = DuckStore::open().unwrap();
        assert!(!store.has_tables());
        assert!(seeded().has_tables());
    }

    #[test]
    fn load_missing_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = DuckStore::open().unwrap();
        let result = store.load_table(tmp.path(), "acte");
        assert!(matches!(
            result,
            Err(StoreError::SourceNotFound { ref table, .. }) if table == "acte"
        ));
    }

    #[test]
    fn load_table_from_csv() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("acte.csv"),
            "id_acte,code_acte,libelle_acte\n5,CS,Consultation\n6,NFS,Numeration\n",
        )
        .unwrap();
        let store = DuckStore::open().unwrap();
        assert_eq!(store.load_table(tmp.path(), "acte").unwrap(), 2);
        assert_eq!(store.count_table("acte").unwrap(), 2);
    }

    #[test]
    fn has_column_introspects_the_schema() {
        let store = seeded();
        assert!(store.has_column("acte_trans", "id_beneficiaire").unwrap());
        assert!(!store.has_column("acte_trans", "no_such_column").unwrap());
    }

    #[test]
    fn snapshot_filters_by_window_start() {
        let raw = seeded().snapshot(day("2025-01-01")).unwrap();
        assert_eq!(raw.transaction_rows(), 2);
        assert_eq!(raw.act_line_rows(), 2);
        assert_eq!(claimsentry_core::row_count(&raw.tariffs), 2);

        let all = seeded().snapshot(day("2024-01-01")).unwrap();
        assert_eq!(all.transaction_rows(), 3);
        assert_eq!(all.act_line_rows(), 3);
    }

    #[test]
    fn snapshot_window_start_is_inclusive() {
        let raw = seeded().snapshot(day("2025-01-10")).unwrap();
        assert_eq!(raw.transaction_rows(), 2);
        let raw = seeded().snapshot(day("2025-01-11")).unwrap();
        assert_eq!(raw.transaction_rows(), 0);
    }

    #[test]
    fn snapshot_without_beneficiary_column_selects_nulls() {
        let store = seeded();
        store
            .connection()
            .execute_batch("ALTER TABLE acte_trans DROP COLUMN id_beneficiaire")
            .unwrap();
        let raw = store.snapshot(day("2025-01-01")).unwrap();
        let batch = &raw.transactions[0];
        let col = batch.column_by_name("id_beneficiaire").unwrap();
        assert_eq!(col.null_count(), col.len());

        let txs = claimsentry_core::read_transactions(&raw.transactions).unwrap();
        assert!(txs.iter().all(|t| t.beneficiary_id.is_none()));
    }

    #[test]
    fn snapshot_feeds_the_engine() {
        let raw = seeded().snapshot(day("2025-01-01")).unwrap();
        let engine = Engine::new(DetectionConfig::default()).unwrap();
        let report = engine.run(&raw).unwrap();
        assert_eq!(report.status, RunStatus::Completed);

        let d = &report.detections;
        assert_eq!(d.overbilling.len(), 1);
        assert_eq!(d.overbilling[0].record.line.id, "11");
        assert_eq!(d.overbilling[0].record.tariff, Some(1000.0));
        assert_eq!(d.missing_execution_dates[0].record.line.id, "12");
        assert_eq!(d.identity_spoofing[0].structures, "10,20");
        assert_eq!(
            d.identity_spoofing[0]
                .beneficiary
                .as_ref()
                .and_then(|b| b.last_name.as_deref()),
            Some("KOUASSI")
        );
    }

    #[test]
    fn empty_window_is_no_data() {
        let raw = seeded().snapshot(day("2026-01-01")).unwrap();
        let engine = Engine::new(DetectionConfig::default()).unwrap();
        assert_eq!(engine.run(&raw).unwrap().status, RunStatus::NoData);
    }

    #[test]
    fn persistent_load_and_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("claims.duckdb");

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert!(!store.has_tables());
        store.connection().execute_batch(SEED).unwrap();
        assert!(store.has_tables());
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert!(store.has_tables());
        assert_eq!(store.count_table("acte_trans").unwrap(), 3);
    }
}
