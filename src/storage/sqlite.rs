use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::domain::{BalanceReport, BalanceTally, DATE_FORMAT, LedgerEntry, parse_amount};

use super::{LedgerStore, MIGRATION_001_TRANSACTIONS};

/// An entry together with the identity SQLite assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

/// Ledger persisted in the `transactions` table. Entries are addressed by
/// their generated identity; there is no positional access and no update.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_TRANSACTIONS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_rows(&self) -> Result<Vec<SqliteRow>> {
        sqlx::query(
            r#"
            SELECT id, date, description, amount, type, category
            FROM transactions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")
    }

    /// Turn a row into an entry, or `None` when its date or amount is unreadable.
    /// The `amount` column has TEXT affinity, so numeric literals written by
    /// other tools arrive here as text too.
    fn row_to_entry(row: &SqliteRow) -> Option<StoredEntry> {
        let id: i64 = row.try_get("id").ok()?;
        let date_str: String = row.try_get("date").ok()?;
        let amount_str: String = row.try_get("amount").ok()?;

        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).ok()?;
        let amount = parse_amount(&amount_str).ok()?;
        let kind: String = row.try_get("type").ok()?;

        Some(StoredEntry {
            id,
            entry: LedgerEntry::restore(
                date,
                row.try_get::<String, _>("category").ok()?,
                row.try_get::<String, _>("description").ok()?,
                &kind,
                amount,
            ),
        })
    }
}

impl LedgerStore for SqliteLedgerStore {
    type Key = i64;
    type Record = StoredEntry;

    async fn save(&self, entry: LedgerEntry) -> Result<StoredEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (date, description, amount, type, category)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.date().format(DATE_FORMAT).to_string())
        .bind(entry.description())
        .bind(entry.amount().to_string())
        .bind(entry.transaction_type().as_str())
        .bind(entry.category())
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        tx.commit().await.context("Failed to commit transaction")?;

        let id = result.last_insert_rowid();
        debug!(id, "transaction inserted");
        Ok(StoredEntry { id, entry })
    }

    async fn list_all(&self) -> Result<Vec<StoredEntry>> {
        let rows = self.fetch_rows().await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let stored = Self::row_to_entry(row);
                if stored.is_none() {
                    warn!(id = ?row.try_get::<i64, _>("id").ok(), "skipping unreadable transaction row");
                }
                stored
            })
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let found = sqlx::query("SELECT id FROM transactions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch transaction")?;

        if found.is_none() {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete transaction")?;
        tx.commit().await.context("Failed to commit transaction")?;

        debug!(id, "transaction deleted");
        Ok(true)
    }

    async fn compute_balance(&self) -> Result<BalanceReport> {
        let mut tally = BalanceTally::default();
        for row in self.fetch_rows().await? {
            match Self::row_to_entry(&row) {
                Some(stored) => tally.add_entry(&stored.entry),
                None => tally.skip(),
            }
        }
        Ok(tally.finish())
    }
}
