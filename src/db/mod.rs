use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqlResult, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use crate::models::{Client, Document, DocumentFilter, DocumentType, WorkRecord};
use crate::services::outdated::documents_to_flag;

const DOCUMENT_COLUMNS: &str = "id, work_record_id, client_id, doc_type, document_number, month, working_days,
     weekend_dates, rate, total_amount, file_hash, generated_at, is_outdated, outdated_at";

const WORK_RECORD_COLUMNS: &str = "id, client_id, month, working_days, weekend_dates, holiday_names, config,
     notes, total_working_days, created_at, updated_at";

const CLIENT_COLUMNS: &str =
    "id, name, daily_rate, hours_per_day, column_mapping, fill_instructions, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        Self::init(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_clients_and_work_records.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/001_create_clients_and_work_records.sql"
                )),
            ),
            (
                "002_create_documents.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_documents.sql"
                )),
            ),
            (
                "003_create_settings_and_generation_logs.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/003_create_settings_and_generation_logs.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    pub fn upsert_client(&self, client: &Client) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO clients (
                id, name, daily_rate, hours_per_day, column_mapping, fill_instructions, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                daily_rate = excluded.daily_rate,
                hours_per_day = excluded.hours_per_day,
                column_mapping = excluded.column_mapping,
                fill_instructions = excluded.fill_instructions,
                updated_at = excluded.updated_at",
            params![
                client.id,
                client.name,
                client.daily_rate,
                client.hours_per_day,
                client.column_mapping.as_ref().map(to_json).transpose()?,
                client.fill_instructions,
                client.created_at,
                client.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get_client(&self, id: &str) -> SqlResult<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE id = ?1", CLIENT_COLUMNS);
        self.conn.query_row(&sql, params![id], map_client).optional()
    }

    pub fn get_client_by_name(&self, name: &str) -> SqlResult<Option<Client>> {
        let sql = format!("SELECT {} FROM clients WHERE name = ?1 COLLATE NOCASE", CLIENT_COLUMNS);
        self.conn.query_row(&sql, params![name], map_client).optional()
    }

    pub fn list_clients(&self) -> SqlResult<Vec<Client>> {
        let sql = format!("SELECT {} FROM clients ORDER BY name", CLIENT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_client)?;
        rows.collect()
    }

    pub fn get_work_record(&self, client_id: &str, month: &str) -> SqlResult<Option<WorkRecord>> {
        let sql = format!(
            "SELECT {} FROM work_records WHERE client_id = ?1 AND month = ?2",
            WORK_RECORD_COLUMNS
        );
        self.conn
            .query_row(&sql, params![client_id, month], map_work_record)
            .optional()
    }

    /// One record per (client, month); a second save for the pair updates it.
    pub fn save_work_record(&self, record: &WorkRecord) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO work_records (
                id, client_id, month, working_days, weekend_dates, holiday_names, config,
                notes, total_working_days, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(client_id, month) DO UPDATE SET
                working_days = excluded.working_days,
                weekend_dates = excluded.weekend_dates,
                holiday_names = excluded.holiday_names,
                config = excluded.config,
                notes = excluded.notes,
                total_working_days = excluded.total_working_days,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.client_ref,
                record.month.to_string(),
                to_json(&record.working_days)?,
                to_json(&record.weekend_dates)?,
                to_json(&record.holiday_names)?,
                to_json(&record.config)?,
                record.notes,
                record.total_working_days,
                record.created_at,
                record.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get_documents(&self, filter: &DocumentFilter) -> SqlResult<Vec<Document>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(client) = &filter.client_ref {
            values.push(client.clone());
            clauses.push("client_id = ?");
        }
        if let Some(work_record) = &filter.work_record_ref {
            values.push(work_record.clone());
            clauses.push("work_record_id = ?");
        }
        if let Some(month) = &filter.month {
            values.push(month.to_string());
            clauses.push("month = ?");
        }
        if filter.outdated_only {
            clauses.push("is_outdated = 1");
        }

        let mut sql = format!("SELECT {} FROM documents", DOCUMENT_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY generated_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), map_document)?;
        rows.collect()
    }

    pub fn get_document_for(&self, work_record_id: &str, doc_type: DocumentType) -> SqlResult<Option<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE work_record_id = ?1 AND doc_type = ?2",
            DOCUMENT_COLUMNS
        );
        self.conn
            .query_row(&sql, params![work_record_id, doc_type.as_str()], map_document)
            .optional()
    }

    pub fn save_document(&self, document: &Document) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (
                id, work_record_id, client_id, doc_type, document_number, month, working_days,
                weekend_dates, rate, total_amount, file_hash, generated_at, is_outdated, outdated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                document.id,
                document.work_record_ref,
                document.client_ref,
                document.doc_type.as_str(),
                document.document_number,
                document.month.to_string(),
                to_json(&document.working_days_array)?,
                document.weekend_dates_array.as_ref().map(to_json).transpose()?,
                document.rate,
                document.total_amount,
                document.file_hash,
                document.generated_at,
                document.is_outdated,
                document.outdated_at
            ],
        )?;
        Ok(())
    }

    pub fn next_document_sequence(&self, doc_type: DocumentType, month: &str) -> SqlResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE doc_type = ?1 AND month = ?2",
            params![doc_type.as_str(), month],
            |row| row.get(0),
        )?;
        Ok(count + 1)
    }

    /// Flags every not-yet-outdated document of the work record whose day
    /// snapshot differs from the current one. Returns the flagged ids.
    pub fn mark_outdated(
        &self,
        work_record_id: &str,
        current_days: &[NaiveDate],
        current_weekends: &[NaiveDate],
        now: &str,
    ) -> SqlResult<Vec<String>> {
        let documents = self.get_documents(&DocumentFilter {
            work_record_ref: Some(work_record_id.to_string()),
            ..Default::default()
        })?;

        let mut flagged = Vec::new();
        for document in documents_to_flag(&documents, current_days, current_weekends) {
            self.conn.execute(
                "UPDATE documents SET is_outdated = 1, outdated_at = ?1 WHERE id = ?2",
                params![now, document.id],
            )?;
            flagged.push(document.id.clone());
        }
        Ok(flagged)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn log_generation(
        &self,
        document_id: Option<&str>,
        work_record_id: Option<&str>,
        status: &str,
        message: Option<&str>,
    ) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO generation_logs (id, document_id, work_record_id, status, message, created_at)
             VALUES (hex(randomblob(16)), ?1, ?2, ?3, ?4, datetime('now'))",
            params![document_id, work_record_id, status, message],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn count_generation_logs(&self, status: &str) -> SqlResult<u32> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM generation_logs WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> SqlResult<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> SqlResult<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> SqlResult<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> SqlResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_client(row: &Row<'_>) -> SqlResult<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        daily_rate: row.get(2)?,
        hours_per_day: row.get(3)?,
        column_mapping: optional_json_column(row, 4)?,
        fill_instructions: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn map_work_record(row: &Row<'_>) -> SqlResult<WorkRecord> {
    Ok(WorkRecord {
        id: row.get(0)?,
        client_ref: row.get(1)?,
        month: parse_column(row, 2)?,
        working_days: json_column(row, 3)?,
        weekend_dates: json_column(row, 4)?,
        holiday_names: json_column(row, 5)?,
        config: json_column(row, 6)?,
        notes: row.get(7)?,
        total_working_days: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_document(row: &Row<'_>) -> SqlResult<Document> {
    let raw_type: String = row.get(3)?;
    let doc_type = raw_type
        .parse::<DocumentType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;
    Ok(Document {
        id: row.get(0)?,
        work_record_ref: row.get(1)?,
        client_ref: row.get(2)?,
        doc_type,
        document_number: row.get(4)?,
        month: parse_column(row, 5)?,
        working_days_array: json_column(row, 6)?,
        weekend_dates_array: optional_json_column(row, 7)?,
        rate: row.get(8)?,
        total_amount: row.get(9)?,
        file_hash: row.get(10)?,
        generated_at: row.get(11)?,
        is_outdated: row.get(12)?,
        outdated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnMapping, WorkRecordConfig, YearMonth};
    use std::collections::{BTreeMap, BTreeSet};

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn client() -> Client {
        Client {
            id: "client-1".into(),
            name: "Acme".into(),
            daily_rate: Some(500.0),
            hours_per_day: None,
            column_mapping: Some(ColumnMapping {
                date_col: "A".into(),
                hours_col: "C".into(),
                description_col: None,
                start_row: 2,
                sync_dates: true,
            }),
            fill_instructions: None,
            created_at: "2026-04-01T00:00:00Z".into(),
            updated_at: "2026-04-01T00:00:00Z".into(),
        }
    }

    fn work_record(days: &[&str]) -> WorkRecord {
        let working_days: BTreeSet<NaiveDate> = days.iter().map(|s| d(s)).collect();
        WorkRecord {
            id: "wr-1".into(),
            client_ref: "client-1".into(),
            month: YearMonth::new(2026, 4).unwrap(),
            total_working_days: working_days.len() as u32,
            working_days,
            weekend_dates: BTreeSet::from([d("2026-04-04")]),
            holiday_names: BTreeMap::from([(d("2026-04-06"), "Ostermontag".to_string())]),
            config: WorkRecordConfig::with_holidays(true),
            notes: None,
            created_at: "2026-04-01T00:00:00Z".into(),
            updated_at: "2026-04-01T00:00:00Z".into(),
        }
    }

    fn document(id: &str, days: &[&str]) -> Document {
        Document {
            id: id.into(),
            work_record_ref: "wr-1".into(),
            client_ref: "client-1".into(),
            doc_type: DocumentType::Invoice,
            document_number: format!("INV-202604-{}", id),
            month: YearMonth::new(2026, 4).unwrap(),
            working_days_array: days.iter().map(|s| d(s)).collect(),
            weekend_dates_array: None,
            rate: 500.0,
            total_amount: 500.0 * days.len() as f64,
            file_hash: "abc".into(),
            generated_at: "2026-04-30T00:00:00Z".into(),
            is_outdated: false,
            outdated_at: None,
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_client(&client()).unwrap();
        db.save_work_record(&work_record(&["2026-04-01", "2026-04-02"])).unwrap();
        db
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut db = Database::open_in_memory().unwrap();
        db.run_migrations().unwrap();
        assert_eq!(db.get_setting("missing").unwrap(), None);
    }

    #[test]
    fn client_round_trips_with_mapping() {
        let db = seeded();
        let loaded = db.get_client_by_name("acme").unwrap().unwrap();
        assert_eq!(loaded, client());
        assert_eq!(db.list_clients().unwrap().len(), 1);
    }

    #[test]
    fn work_record_is_unique_per_client_and_month() {
        let db = seeded();
        let mut again = work_record(&["2026-04-01"]);
        again.id = "wr-other".into();
        db.save_work_record(&again).unwrap();

        let loaded = db.get_work_record("client-1", "2026-04").unwrap().unwrap();
        assert_eq!(loaded.id, "wr-1");
        assert_eq!(loaded.working_days, BTreeSet::from([d("2026-04-01")]));
        assert_eq!(loaded.holiday_names.len(), 1);
        assert!(db.get_work_record("client-1", "2026-05").unwrap().is_none());
    }

    #[test]
    fn mark_outdated_flags_changed_documents_only() {
        let db = seeded();
        db.save_document(&document("001", &["2026-04-01", "2026-04-02"])).unwrap();
        db.save_document(&document("002", &["2026-04-01"])).unwrap();

        let flagged = db
            .mark_outdated("wr-1", &[d("2026-04-01")], &[], "2026-05-01T00:00:00Z")
            .unwrap();
        assert_eq!(flagged, vec!["001".to_string()]);

        let outdated = db
            .get_documents(&DocumentFilter {
                outdated_only: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(outdated.len(), 1);
        assert_eq!(outdated[0].outdated_at.as_deref(), Some("2026-05-01T00:00:00Z"));

        // Already flagged documents are not touched again.
        let again = db
            .mark_outdated("wr-1", &[d("2026-04-03")], &[], "2026-05-02T00:00:00Z")
            .unwrap();
        assert_eq!(again, vec!["002".to_string()]);
    }

    #[test]
    fn document_lookup_and_sequence() {
        let db = seeded();
        assert_eq!(db.next_document_sequence(DocumentType::Invoice, "2026-04").unwrap(), 1);
        db.save_document(&document("001", &["2026-04-01"])).unwrap();
        assert_eq!(db.next_document_sequence(DocumentType::Invoice, "2026-04").unwrap(), 2);
        assert_eq!(db.next_document_sequence(DocumentType::Timesheet, "2026-04").unwrap(), 1);

        let found = db.get_document_for("wr-1", DocumentType::Invoice).unwrap().unwrap();
        assert_eq!(found.id, "001");
        assert!(db.get_document_for("wr-1", DocumentType::Timesheet).unwrap().is_none());
    }

    #[test]
    fn unknown_document_type_is_a_conversion_error() {
        let db = seeded();
        db.save_document(&document("001", &["2026-04-01"])).unwrap();
        db.conn
            .execute("UPDATE documents SET doc_type = 'receipt' WHERE id = '001'", [])
            .unwrap();

        let err = db.get_documents(&DocumentFilter::default()).unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(3, _, _)));
    }

    #[test]
    fn settings_and_logs() {
        let db = seeded();
        db.set_setting("holiday_country", "AT").unwrap();
        assert_eq!(db.get_setting("holiday_country").unwrap().as_deref(), Some("AT"));
        db.log_generation(None, Some("wr-1"), "failed", Some("no template")).unwrap();
        assert_eq!(db.count_generation_logs("failed").unwrap(), 1);
    }
}
