// Local SQLite ledger and migrations
// Holds every sheet row that was not appended remotely
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{StoreError, StoreResult};

/// Where a row was persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOrigin {
    /// No remote endpoint configured
    Local,
    /// Remote append failed
    Fallback,
    /// Appended to the remote sheet; never stored in the ledger
    Remote,
}

impl RowOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowOrigin::Local => "local",
            RowOrigin::Fallback => "fallback",
            RowOrigin::Remote => "remote",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "fallback" => RowOrigin::Fallback,
            "remote" => RowOrigin::Remote,
            _ => RowOrigin::Local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: i64,
    pub spreadsheet: String,
    pub worksheet: String,
    pub row: Vec<Value>,
    pub recorded_at: DateTime<Utc>,
    pub origin: RowOrigin,
}

// Thread-safe ledger connection wrapper
#[derive(Clone)]
pub struct Ledger {
    conn: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Open (or create) the ledger file and run migrations
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        run_migrations(&conn)?;
        log::info!("Ledger ready at {}", path.display());

        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Append one row and return its ledger id
    pub fn append(
        &self,
        spreadsheet: &str,
        worksheet: &str,
        row: &[Value],
        origin: RowOrigin,
    ) -> StoreResult<i64> {
        let row_json = serde_json::to_string(row)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sheet_rows (spreadsheet, worksheet, row_json, recorded_at, origin)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                spreadsheet,
                worksheet,
                row_json,
                Utc::now().to_rfc3339(),
                origin.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of rows stored for one worksheet
    pub fn count_rows(&self, spreadsheet: &str, worksheet: &str) -> StoreResult<u32> {
        let conn = self.lock()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM sheet_rows WHERE spreadsheet = ?1 AND worksheet = ?2",
            params![spreadsheet, worksheet],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of rows of one worksheet stored with `origin`
    pub fn count_rows_with_origin(
        &self,
        spreadsheet: &str,
        worksheet: &str,
        origin: RowOrigin,
    ) -> StoreResult<u32> {
        let conn = self.lock()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM sheet_rows WHERE spreadsheet = ?1 AND worksheet = ?2 AND origin = ?3",
            params![spreadsheet, worksheet, origin.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Stored rows in insertion order, optionally limited to one worksheet
    pub fn list_rows(&self, worksheet: Option<&str>) -> StoreResult<Vec<LedgerRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, spreadsheet, worksheet, row_json, recorded_at, origin
             FROM sheet_rows
             WHERE ?1 IS NULL OR worksheet = ?1
             ORDER BY id",
        )?;

        let raw = stmt
            .query_map(params![worksheet], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(id, spreadsheet, worksheet, row_json, recorded_at, origin)| -> StoreResult<LedgerRow> {
                Ok(LedgerRow {
                    id,
                    spreadsheet,
                    worksheet,
                    row: serde_json::from_str(&row_json)?,
                    recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                        .map_err(|e| StoreError::Corrupt(format!("row {}: {}", id, e)))?
                        .with_timezone(&Utc),
                    origin: RowOrigin::from_string(&origin),
                })
            })
            .collect()
    }
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        migration_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [1])?;
    }

    Ok(())
}

fn migration_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheet_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            spreadsheet TEXT NOT NULL,
            worksheet TEXT NOT NULL,
            row_json TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            origin TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sheet_rows_worksheet ON sheet_rows(spreadsheet, worksheet)",
        [],
    )?;

    Ok(())
}
