use thiserror::Error;

use crate::storage::Backend;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Entry not found: {0}")]
    EntryNotFound(u64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transaction type '{0}': expected Income or Expense")]
    InvalidTransactionType(String),

    #[error("The {backend} backend does not support {operation}")]
    UnsupportedOperation {
        backend: Backend,
        operation: &'static str,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
