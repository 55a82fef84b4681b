// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use rust_decimal::Decimal;
use tally::application::LedgerService;
use tally::storage::{Backend, StoreConfig};
use tally::{FileLedgerStore, LedgerEntry, SqliteLedgerStore};
use tempfile::TempDir;

/// Helper to create a file store backed by a temporary directory
pub fn file_store() -> Result<(FileLedgerStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = FileLedgerStore::new(temp_dir.path().join("transactions.csv"));
    Ok((store, temp_dir))
}

/// Helper to create a migrated SQLite store in a temporary directory
pub async fn sqlite_store() -> Result<(SqliteLedgerStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteLedgerStore::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    Ok((store, temp_dir))
}

/// Helper to create a service over the given backend
pub async fn test_service(backend: Backend) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let path: PathBuf = temp_dir.path().join(backend.default_path());
    let service = LedgerService::open(&StoreConfig::new(backend, Some(path))).await?;
    Ok((service, temp_dir))
}

pub fn entry(category: &str, description: &str, kind: &str, amount: &str) -> LedgerEntry {
    LedgerEntry::new(category, description, kind, amount.parse::<Decimal>().unwrap())
}

/// The two-entry scenario: a 12.50 lunch expense and a 1000.00 salary.
pub fn lunch_and_salary() -> Vec<LedgerEntry> {
    vec![
        entry("Food", "Lunch", "Expense", "12.50"),
        entry("Job", "Salary", "Income", "1000.00"),
    ]
}
