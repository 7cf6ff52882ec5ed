//! SQLite-backed site store.

use super::{SiteStore, StorageError};
use crate::site::{Site, SiteStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Stores sites in a `sites` table; `position` keeps the collection order.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a site database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                api_key TEXT NOT NULL,
                balance REAL NOT NULL DEFAULT 0.0,
                total_limit REAL,
                models TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL CHECK (status IN ('active', 'inactive')),
                created_at TEXT NOT NULL,
                last_checked TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sites_position ON sites(position);
            "#,
        )
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

/// Decode a text column, reporting bad content as a conversion failure.
fn decode_text<T, E>(
    column: usize,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    parse(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, e.into()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

impl SiteStore for SqliteStore {
    fn load(&self) -> Result<Vec<Site>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, api_key, balance, total_limit, models, status, created_at, last_checked
             FROM sites ORDER BY position ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let models: String = row.get(6)?;
            let status: String = row.get(7)?;
            let created_at: String = row.get(8)?;
            let last_checked: String = row.get(9)?;

            Ok(Site {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                api_key: row.get(3)?,
                balance: row.get(4)?,
                total_limit: row.get(5)?,
                models: decode_text(6, &models, |raw| serde_json::from_str::<Vec<String>>(raw))?,
                status: decode_text(7, &status, |raw| raw.parse::<SiteStatus>())?,
                created_at: decode_text(8, &created_at, parse_timestamp)?,
                last_checked: decode_text(9, &last_checked, parse_timestamp)?,
            })
        })?;

        let sites = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    fn save(&self, sites: &[Site]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sites", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO sites (id, position, name, url, api_key, balance, total_limit, models, status, created_at, last_checked)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, site) in sites.iter().enumerate() {
                let models = serde_json::to_string(&site.models)?;
                insert.execute(params![
                    site.id,
                    position as i64,
                    site.name,
                    site.url,
                    site.api_key,
                    site.balance,
                    site.total_limit,
                    models,
                    site.status.to_string(),
                    site.created_at.to_rfc3339(),
                    site.last_checked.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
