//! SQLite database for Skeleton application state

use crate::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Database wrapper for state persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Expose the underlying connection for repositories that manage their
    /// own queries against the shared database.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                roles TEXT NOT NULL DEFAULT '[]',
                password TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    // ========================================================================
    // Dataset import
    // ========================================================================

    /// Replay a SQL dump against the database in a single transaction.
    ///
    /// The dump is expected to carry its own `DROP`/`CREATE`/`INSERT`
    /// statements. If any statement fails nothing is applied.
    pub fn import_dump(&self, sql: &str) -> Result<()> {
        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.commit()?;
        }

        // Dumps may drop tables wholesale
        self.init_schema()?;

        debug!("Imported SQL dump ({} bytes)", sql.len());
        Ok(())
    }

    /// Read a SQL dump from disk and replay it
    pub fn import_dump_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let sql = std::fs::read_to_string(path.as_ref())?;
        self.import_dump(&sql)?;
        info!("Imported dump {:?}", path.as_ref());
        Ok(())
    }

    /// Count rows in a table
    pub fn count(&self, table: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table),
            params![],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
