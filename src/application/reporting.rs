use serde::Serialize;
use tracing::warn;

use crate::domain::{Amount, LedgerRow, TransactionType, parse_amount};

/// Expense-only view of the ledger, in ledger order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpenseExtract {
    pub lines: Vec<ExpenseLine>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Amount,
    /// Expense rows left out because their amount was unreadable or would
    /// overflow the total.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseLine {
    pub date: String,
    pub category: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Amount,
}

impl ExpenseExtract {
    /// Collect expense rows. Rows of other types are ignored; expense rows
    /// with an unreadable or overflowing amount are left out and counted.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a LedgerRow>) -> Self {
        let mut extract = Self::default();

        for row in rows {
            if TransactionType::normalize(&row.transaction_type) != TransactionType::Expense {
                continue;
            }
            let Some((value, total)) = parse_amount(&row.amount)
                .ok()
                .and_then(|value| Some((value, extract.total.checked_add(value)?)))
            else {
                warn!(amount = %row.amount, "leaving expense out of the extract");
                extract.skipped += 1;
                continue;
            };

            extract.total = total;
            extract.lines.push(ExpenseLine {
                date: row.date.clone(),
                category: row.category.clone(),
                description: row.description.clone(),
                value,
            });
        }

        extract
    }
}
