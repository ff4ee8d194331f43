//! Database handle and schema

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gw_types::{AppError, AppResult};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{error, info};

/// Shared SQLite handle.
///
/// rusqlite is synchronous; async callers go through [`GatewayDb::with_conn`],
/// which moves the work onto the blocking pool so request tasks are never
/// stalled on database I/O.
#[derive(Clone)]
pub struct GatewayDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl GatewayDb {
    /// Open (or create) the database and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| AppError::Storage(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Open with a bounded number of attempts and a fixed backoff between
    /// them. Startup is the only caller; a database that stays unreachable
    /// is fatal to the process.
    pub async fn open_with_retry(
        path: impl AsRef<Path>,
        attempts: u32,
        backoff: Duration,
    ) -> AppResult<Self> {
        let path = path.as_ref();
        let mut last_err = AppError::Storage("No connection attempts made".to_string());

        for attempt in 1..=attempts {
            match Self::open(path) {
                Ok(db) => {
                    info!("Database ready at {:?}", path);
                    return Ok(db);
                }
                Err(e) => {
                    error!(
                        "Database setup failed (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_err = e;
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_err)
    }

    fn initialize_schema(&self) -> AppResult<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS incidents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                ip TEXT NOT NULL,
                payload TEXT NOT NULL,
                rule_triggered TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open'
            );
            CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                status TEXT NOT NULL,
                client_ip TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ttps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                incident_id INTEGER NOT NULL,
                technique_id TEXT NOT NULL,
                technique_name TEXT NOT NULL,
                description TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS suricata_alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                source TEXT NOT NULL,
                signature TEXT NOT NULL,
                category TEXT NOT NULL,
                severity INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_timestamp ON incidents(timestamp);
            CREATE INDEX IF NOT EXISTS idx_incidents_rule ON incidents(rule_triggered);
            CREATE INDEX IF NOT EXISTS idx_requests_timestamp ON requests(timestamp);
            CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON suricata_alerts(timestamp);",
        )
        .map_err(|e| AppError::Storage(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run a closure against the connection on the blocking pool.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
        .map_err(|e| AppError::Storage(e.to_string()))
    }
}
