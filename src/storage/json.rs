//! JSON store - Small structured values scoped to one resource.
//!
//! Values are keyed by `(resource_group, company_id, resource_id, name)`.

use super::ResourceGroup;
use crate::error::{Result, StorageError};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Owner of a set of JSON values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JsonScope {
    pub group: ResourceGroup,
    pub company_id: i64,
    pub resource_id: i64,
}

impl JsonScope {
    pub fn new(group: ResourceGroup, company_id: i64, resource_id: i64) -> Self {
        Self {
            group,
            company_id,
            resource_id,
        }
    }
}

/// Scoped key-value store for JSON values.
pub trait JsonStore: Send + Sync {
    fn set(&self, scope: JsonScope, name: &str, data: &Value) -> Result<()>;

    fn get(&self, scope: JsonScope, name: &str) -> Result<Option<Value>>;

    /// Remove every value of the scope
    fn clean(&self, scope: JsonScope) -> Result<()>;

    /// Names stored under the scope
    fn list(&self, _scope: JsonScope) -> Result<Vec<String>> {
        Err(StorageError::Unsupported(
            "listing JSON values is not supported by this store".into(),
        ))
    }

    /// Remove one value
    fn delete(&self, _scope: JsonScope, _name: &str) -> Result<()> {
        Err(StorageError::Unsupported(
            "deleting JSON values is not supported by this store".into(),
        ))
    }
}

/// JSON store kept in a SQLite table.
pub struct SqliteJsonStore {
    conn: Mutex<Connection>,
}

impl SqliteJsonStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
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
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS json_storage (
                resource_group TEXT NOT NULL,
                company_id INTEGER NOT NULL,
                resource_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (resource_group, company_id, resource_id, name)
            );
        ",
        )?;
        Ok(())
    }
}

impl JsonStore for SqliteJsonStore {
    fn set(&self, scope: JsonScope, name: &str, data: &Value) -> Result<()> {
        let content = serde_json::to_string(data)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO json_storage
                (resource_group, company_id, resource_id, name, content, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (resource_group, company_id, resource_id, name)
             DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
            params![
                scope.group.as_str(),
                scope.company_id,
                scope.resource_id,
                name,
                content,
                now
            ],
        )?;
        debug!("[JsonStore] Set {}/{}/{}", scope.group, scope.resource_id, name);
        Ok(())
    }

    fn get(&self, scope: JsonScope, name: &str) -> Result<Option<Value>> {
        let content: Option<String> = self
            .conn()
            .query_row(
                "SELECT content FROM json_storage
                 WHERE resource_group = ?1 AND company_id = ?2 AND resource_id = ?3 AND name = ?4",
                params![scope.group.as_str(), scope.company_id, scope.resource_id, name],
                |row| row.get(0),
            )
            .optional()?;

        match content {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    fn clean(&self, scope: JsonScope) -> Result<()> {
        let removed = self.conn().execute(
            "DELETE FROM json_storage
             WHERE resource_group = ?1 AND company_id = ?2 AND resource_id = ?3",
            params![scope.group.as_str(), scope.company_id, scope.resource_id],
        )?;
        debug!(
            "[JsonStore] Cleaned {} value(s) of {}/{}",
            removed, scope.group, scope.resource_id
        );
        Ok(())
    }

    fn list(&self, scope: JsonScope) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name FROM json_storage
             WHERE resource_group = ?1 AND company_id = ?2 AND resource_id = ?3
             ORDER BY name",
        )?;
        let names = stmt
            .query_map(
                params![scope.group.as_str(), scope.company_id, scope.resource_id],
                |row| row.get(0),
            )?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn delete(&self, scope: JsonScope, name: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM json_storage
             WHERE resource_group = ?1 AND company_id = ?2 AND resource_id = ?3 AND name = ?4",
            params![scope.group.as_str(), scope.company_id, scope.resource_id, name],
        )?;
        Ok(())
    }
}
