mod file;
mod sqlite;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;

use crate::domain::{BalanceReport, LedgerEntry};

pub use file::*;
pub use sqlite::*;

/// SQL migration for the transactions table
pub const MIGRATION_001_TRANSACTIONS: &str = include_str!("migrations/001_transactions.sql");

/// Storage capability shared by every ledger backend.
///
/// `Key` is how a backend addresses a single entry: a zero-based position for
/// the flat file, a generated identity for SQLite. Positions shift after a
/// delete, so callers must list again before the next positional mutation.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    type Key: Copy + fmt::Display;
    type Record;

    /// Persist a new entry at the end of the ledger.
    async fn save(&self, entry: LedgerEntry) -> Result<Self::Record>;

    /// Every entry, in insertion order. A ledger that was never written is empty.
    async fn list_all(&self) -> Result<Vec<Self::Record>>;

    /// Remove one entry. Returns `false`, without writing, when `key` is unknown.
    async fn delete(&self, key: Self::Key) -> Result<bool>;

    /// Income, expense and net totals. Unreadable rows are skipped and counted.
    async fn compute_balance(&self) -> Result<BalanceReport>;
}

/// Backends that can replace an entry in place.
#[allow(async_fn_in_trait)]
pub trait UpdatableLedgerStore: LedgerStore {
    /// Replace the entry at `key`. Returns `false`, without writing, when `key`
    /// is unknown.
    async fn update(&self, key: Self::Key, entry: LedgerEntry) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    File,
    Sqlite,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::File => "file",
            Backend::Sqlite => "sqlite",
        }
    }

    /// Where the ledger lives when no path is configured.
    pub fn default_path(&self) -> PathBuf {
        match self {
            Backend::File => PathBuf::from("transactions.csv"),
            Backend::Sqlite => PathBuf::from("tally.db"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "csv" => Ok(Backend::File),
            "sqlite" | "db" => Ok(Backend::Sqlite),
            other => Err(format!(
                "unknown backend '{}', expected 'file' or 'sqlite'",
                other
            )),
        }
    }
}

/// Which backend to open, and where.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(backend: Backend, path: Option<PathBuf>) -> Self {
        Self {
            backend,
            path: path.unwrap_or_else(|| backend.default_path()),
        }
    }
}

/// The backend chosen at startup.
pub enum Store {
    File(FileLedgerStore),
    Sqlite(SqliteLedgerStore),
}

impl Store {
    /// Open the configured backend. The SQLite database is created and
    /// migrated if needed; the flat file is only created on first save.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        tracing::debug!(backend = %config.backend, path = %config.path.display(), "opening ledger store");
        match config.backend {
            Backend::File => Ok(Store::File(FileLedgerStore::new(&config.path))),
            Backend::Sqlite => {
                let url = format!("sqlite:{}?mode=rwc", config.path.display());
                Ok(Store::Sqlite(SqliteLedgerStore::init(&url).await?))
            }
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Store::File(_) => Backend::File,
            Store::Sqlite(_) => Backend::Sqlite,
        }
    }
}
