//! SQLite connection handling for the canonical memory store.
//!
//! Searches on the in-process path scan a tenant's rows while imports and
//! syncs write, so reads and writes get separate pools over one WAL
//! database: a read-only pool sized for concurrent scans and a one-connection
//! writer that serializes every mutation.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "xmem.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over the same database file.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections for lookups and similarity scans.
    pub reader: SqlitePool,
    /// The single writer connection.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Connect to `database_url` and bring the schema up to date.
    ///
    /// Migrations run through the writer before any reader connects, so
    /// readers never observe a half-migrated schema.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(database_url, "database opened");
        Ok(Self { reader, writer })
    }

    /// Open (creating if needed) [`DATABASE_FILE`] inside `data_dir`.
    pub async fn open_in(data_dir: &Path) -> Result<Self, sqlx::Error> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(sqlx::Error::Io)?;
        Self::new(&database_url_for(data_dir)).await
    }
}

/// Database URL inside [`default_data_dir`].
pub fn default_database_url() -> String {
    database_url_for(&default_data_dir())
}

pub fn database_url_for(data_dir: &Path) -> String {
    format!(
        "sqlite://{}?mode=rwc",
        data_dir.join(DATABASE_FILE).display()
    )
}

/// `XMEM_DATA_DIR` when set, else the platform data directory
/// (`~/.local/share/xmem` on Linux).
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("XMEM_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("xmem")
}
