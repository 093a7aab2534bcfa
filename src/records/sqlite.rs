//! SqliteRecordStore - SQLite tables for predictor and integration rows.
//!
//! Mapping fields are stored as JSON text. The connection sits behind a
//! mutex so one store can be shared between facades through `Arc`.

use super::{DtypeDict, IntegrationRecord, PredictorRecord, RecordStore, TrainingPhase};
use crate::error::{Result, StorageError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

/// Predictor row as it comes out of SQLite, before JSON decoding.
struct RawPredictor {
    id: i64,
    name: String,
    status: Option<String>,
    to_predict: Option<String>,
    data: Option<String>,
    learn_args: Option<String>,
    dtype_dict: Option<String>,
    phase_current: Option<i64>,
    phase_total: Option<i64>,
    phase_name: Option<String>,
}

fn decode<T: serde::de::DeserializeOwned>(text: Option<String>) -> Result<Option<T>> {
    match text {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

fn encode<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    match value {
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
        None => Ok(None),
    }
}

impl RawPredictor {
    fn into_record(self) -> Result<PredictorRecord> {
        Ok(PredictorRecord {
            id: self.id,
            name: self.name,
            status: self.status,
            to_predict: decode::<Vec<String>>(self.to_predict)?.unwrap_or_default(),
            data: decode(self.data)?,
            learn_args: decode(self.learn_args)?,
            dtype_dict: decode::<DtypeDict>(self.dtype_dict)?,
            training_phase: TrainingPhase {
                current: self.phase_current,
                total: self.phase_total,
                name: self.phase_name,
            },
        })
    }
}

impl SqliteRecordStore {
    /// Open or create the record database.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        info!("[Records] Opened record store at {:?}", db_path);

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open database in memory (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Statements are atomic, so a poisoned connection is still consistent.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS predictor (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                status TEXT,
                to_predict TEXT,
                data TEXT,
                learn_args TEXT,
                dtype_dict TEXT,
                training_phase_current INTEGER,
                training_phase_total INTEGER,
                training_phase_name TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS integration (
                id INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                engine TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
        )?;
        Ok(())
    }

    /// Create a predictor row. Called by the owner of the predictor, never by
    /// the facades.
    pub fn insert_predictor(&self, record: &PredictorRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO predictor
                (id, name, status, to_predict, data, learn_args, dtype_dict,
                 training_phase_current, training_phase_total, training_phase_name, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                record.name,
                record.status,
                serde_json::to_string(&record.to_predict)?,
                encode(&record.data)?,
                encode(&record.learn_args)?,
                encode(&record.dtype_dict)?,
                record.training_phase.current,
                record.training_phase.total,
                record.training_phase.name,
                now
            ],
        )?;
        debug!("[Records] Inserted predictor {}", record.id);
        Ok(())
    }

    /// Create an integration row.
    pub fn insert_integration(&self, record: &IntegrationRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO integration (id, name, engine, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.name,
                record.engine,
                serde_json::to_string(&record.data)?,
                now
            ],
        )?;
        debug!("[Records] Inserted integration {}", record.id);
        Ok(())
    }

    /// Remove a predictor row. Returns false if there was none.
    pub fn remove_predictor(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM predictor WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Remove an integration row. Returns false if there was none.
    pub fn remove_integration(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM integration WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

impl RecordStore for SqliteRecordStore {
    fn get_predictor(&self, id: i64) -> Result<Option<PredictorRecord>> {
        let raw = self
            .conn()
            .query_row(
                "SELECT id, name, status, to_predict, data, learn_args, dtype_dict,
                        training_phase_current, training_phase_total, training_phase_name
                 FROM predictor WHERE id = ?1",
                params![id],
                |row| {
                    Ok(RawPredictor {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status: row.get(2)?,
                        to_predict: row.get(3)?,
                        data: row.get(4)?,
                        learn_args: row.get(5)?,
                        dtype_dict: row.get(6)?,
                        phase_current: row.get(7)?,
                        phase_total: row.get(8)?,
                        phase_name: row.get(9)?,
                    })
                },
            )
            .optional()?;

        raw.map(RawPredictor::into_record).transpose()
    }

    fn save_predictor(&self, record: &PredictorRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let updated = self.conn().execute(
            "UPDATE predictor SET
                name = ?2, status = ?3, to_predict = ?4, data = ?5,
                learn_args = ?6, dtype_dict = ?7, training_phase_current = ?8,
                training_phase_total = ?9, training_phase_name = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                record.id,
                record.name,
                record.status,
                serde_json::to_string(&record.to_predict)?,
                encode(&record.data)?,
                encode(&record.learn_args)?,
                encode(&record.dtype_dict)?,
                record.training_phase.current,
                record.training_phase.total,
                record.training_phase.name,
                now
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::predictor_not_found(record.id));
        }
        Ok(())
    }

    fn get_integration(&self, id: i64) -> Result<Option<IntegrationRecord>> {
        let raw: Option<(i64, String, String, String)> = self
            .conn()
            .query_row(
                "SELECT id, name, engine, data FROM integration WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match raw {
            Some((id, name, engine, data)) => Ok(Some(IntegrationRecord {
                id,
                name,
                engine,
                data: serde_json::from_str(&data)?,
            })),
            None => Ok(None),
        }
    }

    fn save_integration(&self, record: &IntegrationRecord) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let updated = self.conn().execute(
            "UPDATE integration SET name = ?2, engine = ?3, data = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                record.id,
                record.name,
                record.engine,
                serde_json::to_string(&record.data)?,
                now
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::integration_not_found(record.id));
        }
        Ok(())
    }
}
