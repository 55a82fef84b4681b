use serde::{Serialize, Serializer};

use super::{Amount, LedgerEntry, LedgerRow, TransactionType, format_amount, parse_amount};

/// Totals over a ledger snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    #[serde(serialize_with = "two_decimals")]
    pub total_income: Amount,
    #[serde(serialize_with = "two_decimals")]
    pub total_expense: Amount,
    #[serde(serialize_with = "two_decimals")]
    pub net_balance: Amount,
    /// Rows left out because they could not be parsed or classified.
    pub skipped: usize,
}

fn two_decimals<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_amount(*amount))
}

impl BalanceReport {
    /// Compute the report from already-parsed entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries
            .into_iter()
            .fold(BalanceTally::default(), |mut tally, entry| {
                tally.add_entry(entry);
                tally
            })
            .finish()
    }
}

/// Why a row was left out of a balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidAmount(String),
    UnknownType(String),
    /// Adding the amount would leave the representable range.
    Overflow(Amount),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidAmount(raw) => write!(f, "invalid amount '{}'", raw),
            SkipReason::UnknownType(raw) => write!(f, "unknown transaction type '{}'", raw),
            SkipReason::Overflow(amount) => write!(f, "amount {} overflows the running total", amount),
        }
    }
}

/// Best-effort accumulator: valid rows are summed, everything else is counted
/// as skipped instead of aborting the scan.
#[derive(Debug, Clone, Default)]
pub struct BalanceTally {
    income: Amount,
    expense: Amount,
    net: Amount,
    skipped: usize,
}

impl BalanceTally {
    /// Fold one amount. All three totals stay representable: an amount that
    /// would overflow any of them is skipped and the totals are left as they were.
    pub fn add(&mut self, kind: &TransactionType, amount: Amount) -> Result<(), SkipReason> {
        let totals = match kind {
            TransactionType::Income => self
                .income
                .checked_add(amount)
                .zip(self.net.checked_add(amount))
                .map(|(income, net)| (income, self.expense, net)),
            TransactionType::Expense => self
                .expense
                .checked_add(amount)
                .zip(self.net.checked_sub(amount))
                .map(|(expense, net)| (self.income, expense, net)),
            TransactionType::Other(raw) => {
                self.skipped += 1;
                return Err(SkipReason::UnknownType(raw.clone()));
            }
        };

        let Some((income, expense, net)) = totals else {
            self.skipped += 1;
            return Err(SkipReason::Overflow(amount));
        };
        self.income = income;
        self.expense = expense;
        self.net = net;
        Ok(())
    }

    pub fn add_entry(&mut self, entry: &LedgerEntry) {
        let _ = self.add(entry.transaction_type(), entry.amount());
    }

    /// Fold a raw file row. Only the type and the amount are inspected.
    pub fn add_row(&mut self, row: &LedgerRow) -> Result<(), SkipReason> {
        let amount = match parse_amount(&row.amount) {
            Ok(amount) => amount,
            Err(_) => {
                self.skipped += 1;
                return Err(SkipReason::InvalidAmount(row.amount.clone()));
            }
        };
        self.add(&TransactionType::normalize(&row.transaction_type), amount)
    }

    /// Count a record that could not be read at all.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> BalanceReport {
        BalanceReport {
            total_income: self.income,
            total_expense: self.expense,
            net_balance: self.net,
            skipped: self.skipped,
        }
    }
}
