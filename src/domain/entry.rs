use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Amount, normalize_scale, parse_amount};

/// Date format used in the canonical row.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column names of the canonical row, in order.
pub const HEADER: [&str; 5] = ["Date", "Category", "Description", "Type", "Amount"];

/// Classification of a ledger entry.
///
/// Anything that does not normalize to `Income` or `Expense` is kept verbatim
/// in `Other` and never counts towards a balance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Other(String),
}

impl TransactionType {
    /// Normalize a raw label: surrounding whitespace is dropped, the first
    /// character is upper-cased and the rest lower-cased.
    pub fn normalize(raw: &str) -> Self {
        match capitalize(raw.trim()).as_str() {
            "Income" => TransactionType::Income,
            "Expense" => TransactionType::Expense,
            _ => TransactionType::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::Other(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, TransactionType::Other(_))
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for TransactionType {
    fn from(raw: String) -> Self {
        TransactionType::normalize(&raw)
    }
}

impl From<TransactionType> for String {
    fn from(kind: TransactionType) -> Self {
        kind.as_str().to_string()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// One income or expense record.
///
/// Entries are immutable once built: the date is captured at construction and
/// corrections are made by replacing the whole entry through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    date: NaiveDate,
    category: String,
    description: String,
    transaction_type: TransactionType,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Amount,
}

impl LedgerEntry {
    /// Create an entry dated today (local clock).
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        transaction_type: &str,
        amount: Amount,
    ) -> Self {
        Self::restore(
            Local::now().date_naive(),
            category,
            description,
            transaction_type,
            amount,
        )
    }

    /// Rebuild an entry that was already persisted, keeping its stored date.
    pub fn restore(
        date: NaiveDate,
        category: impl Into<String>,
        description: impl Into<String>,
        transaction_type: &str,
        amount: Amount,
    ) -> Self {
        Self {
            date,
            category: category.into(),
            description: description.into(),
            transaction_type: TransactionType::normalize(transaction_type),
            amount: normalize_scale(amount),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn transaction_type(&self) -> &TransactionType {
        &self.transaction_type
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Canonical row: `[date, category, description, type, amount]`.
    pub fn to_row(&self) -> [String; 5] {
        [
            self.date.format(DATE_FORMAT).to_string(),
            self.category.clone(),
            self.description.clone(),
            self.transaction_type.to_string(),
            self.amount.to_string(),
        ]
    }
}

/// A row of the flat-file ledger, keyed by column name.
///
/// Values are kept as they were read so listing never loses information,
/// even for rows that would not parse back into a [`LedgerEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Type")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: String,
}

impl LedgerRow {
    pub fn to_row(&self) -> [&str; 5] {
        [
            &self.date,
            &self.category,
            &self.description,
            &self.transaction_type,
            &self.amount,
        ]
    }

    /// Parse the row back into an entry. Returns `None` when the date or the
    /// amount is unreadable.
    pub fn to_entry(&self) -> Option<LedgerEntry> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()?;
        let amount = parse_amount(&self.amount).ok()?;
        Some(LedgerEntry::restore(
            date,
            self.category.clone(),
            self.description.clone(),
            &self.transaction_type,
            amount,
        ))
    }
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        let [date, category, description, transaction_type, amount] = entry.to_row();
        Self {
            date,
            category,
            description,
            transaction_type,
            amount,
        }
    }
}
