use std::fmt;

use serde::Serialize;

use crate::domain::{BalanceReport, LedgerEntry, LedgerRow, TransactionType, parse_amount};
use crate::storage::{LedgerStore, Store, StoreConfig, UpdatableLedgerStore};

use super::{AppError, ExpenseExtract};

/// Application service providing high-level operations on the ledger.
/// This is the primary interface for any client (CLI, API, etc.); the store is
/// injected once at startup.
pub struct LedgerService {
    store: Store,
}

/// How a listed entry is addressed for later updates and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKey {
    /// Zero-based row position in the flat file. Re-list after any mutation.
    Position(usize),
    /// Identity assigned by the database.
    Id(i64),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Position(position) => write!(f, "{}", position),
            EntryKey::Id(id) => write!(f, "{}", id),
        }
    }
}

/// An entry as shown to callers, whatever the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    pub key: EntryKey,
    #[serde(flatten)]
    pub row: LedgerRow,
}

impl LedgerService {
    /// Create a new ledger service with the given store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open the configured store and wrap it in a service.
    pub async fn open(config: &StoreConfig) -> Result<Self, AppError> {
        Ok(Self::new(Store::open(config).await?))
    }

    /// Record a new transaction dated today.
    pub async fn record(
        &self,
        category: &str,
        description: &str,
        transaction_type: &str,
        amount: &str,
    ) -> Result<ListedEntry, AppError> {
        let entry = build_entry(category, description, transaction_type, amount)?;

        match &self.store {
            Store::File(store) => {
                let (position, row) = store.append(entry).await?;
                Ok(ListedEntry {
                    key: EntryKey::Position(position),
                    row,
                })
            }
            Store::Sqlite(store) => {
                let stored = store.save(entry).await?;
                Ok(ListedEntry {
                    key: EntryKey::Id(stored.id),
                    row: LedgerRow::from(&stored.entry),
                })
            }
        }
    }

    /// List every entry in ledger order.
    pub async fn list(&self) -> Result<Vec<ListedEntry>, AppError> {
        let entries = match &self.store {
            Store::File(store) => store
                .list_all()
                .await?
                .into_iter()
                .enumerate()
                .map(|(position, row)| ListedEntry {
                    key: EntryKey::Position(position),
                    row,
                })
                .collect(),
            Store::Sqlite(store) => store
                .list_all()
                .await?
                .into_iter()
                .map(|stored| ListedEntry {
                    key: EntryKey::Id(stored.id),
                    row: LedgerRow::from(&stored.entry),
                })
                .collect(),
        };
        Ok(entries)
    }

    /// Replace the entry at `position`. Only the flat-file backend supports this.
    pub async fn update(
        &self,
        position: u64,
        category: &str,
        description: &str,
        transaction_type: &str,
        amount: &str,
    ) -> Result<ListedEntry, AppError> {
        let Store::File(store) = &self.store else {
            return Err(AppError::UnsupportedOperation {
                backend: self.store.backend(),
                operation: "update",
            });
        };

        let entry = build_entry(category, description, transaction_type, amount)?;
        let row = LedgerRow::from(&entry);
        let index = usize::try_from(position).map_err(|_| AppError::EntryNotFound(position))?;

        if !store.update(index, entry).await? {
            return Err(AppError::EntryNotFound(position));
        }
        Ok(ListedEntry {
            key: EntryKey::Position(index),
            row,
        })
    }

    /// Delete by position (flat file) or identity (SQLite).
    pub async fn delete(&self, key: u64) -> Result<(), AppError> {
        let deleted = match &self.store {
            Store::File(store) => match usize::try_from(key) {
                Ok(position) => store.delete(position).await?,
                Err(_) => false,
            },
            Store::Sqlite(store) => match i64::try_from(key) {
                Ok(id) => store.delete(id).await?,
                Err(_) => false,
            },
        };

        if !deleted {
            return Err(AppError::EntryNotFound(key));
        }
        Ok(())
    }

    pub async fn balance(&self) -> Result<BalanceReport, AppError> {
        let report = match &self.store {
            Store::File(store) => store.compute_balance().await?,
            Store::Sqlite(store) => store.compute_balance().await?,
        };
        Ok(report)
    }

    /// Expense-only listing with its total.
    pub async fn expense_extract(&self) -> Result<ExpenseExtract, AppError> {
        let entries = self.list().await?;
        Ok(ExpenseExtract::from_rows(entries.iter().map(|e| &e.row)))
    }
}

/// Validate caller input and build a dated entry.
fn build_entry(
    category: &str,
    description: &str,
    transaction_type: &str,
    amount: &str,
) -> Result<LedgerEntry, AppError> {
    let amount = parse_amount(amount).map_err(|e| AppError::InvalidAmount(e.to_string()))?;

    if !TransactionType::normalize(transaction_type).is_recognized() {
        return Err(AppError::InvalidTransactionType(
            transaction_type.to_string(),
        ));
    }

    Ok(LedgerEntry::new(
        category,
        description,
        transaction_type,
        amount,
    ))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_build_entry_normalizes() {
        let entry = build_entry("Food", "Lunch", " expense ", "12.5").unwrap();
        assert_eq!(entry.transaction_type(), &TransactionType::Expense);
        assert_eq!(entry.amount(), dec!(12.50));
    }

    #[test]
    fn test_build_entry_rejects_bad_input() {
        assert!(matches!(
            build_entry("Food", "Lunch", "Expense", "twelve"),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            build_entry("Food", "Lunch", "refund", "12"),
            Err(AppError::InvalidTransactionType(t)) if t == "refund"
        ));
    }

    #[test]
    fn test_entry_key_display() {
        assert_eq!(EntryKey::Position(3).to_string(), "3");
        assert_eq!(EntryKey::Id(42).to_string(), "42");
    }
}
