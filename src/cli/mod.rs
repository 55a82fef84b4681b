use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::application::{LedgerService, ListedEntry};
use crate::domain::{BalanceReport, format_amount};
use crate::storage::{Backend, StoreConfig};

/// Tally - income and expense ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Record income and expenses and report the balance")]
#[command(version)]
pub struct Cli {
    /// Storage backend: file or sqlite
    #[arg(short, long, env = "TALLY_BACKEND", default_value = "file")]
    pub backend: Backend,

    /// Ledger location (defaults to transactions.csv or tally.db)
    #[arg(short, long, env = "TALLY_PATH")]
    pub path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a transaction dated today
    Add {
        /// Category (e.g., "Food", "Job")
        #[arg(short, long)]
        category: String,

        /// Description of the transaction
        #[arg(short, long)]
        description: String,

        /// Transaction type: income or expense
        #[arg(short = 't', long = "type")]
        transaction_type: String,

        /// Amount (e.g., "12.50" or "1000")
        amount: String,
    },

    /// List all transactions
    List {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Replace the transaction at a position (file backend only)
    Update {
        /// Zero-based position as shown by `list`
        position: u64,

        #[arg(short, long)]
        category: String,

        #[arg(short, long)]
        description: String,

        #[arg(short = 't', long = "type")]
        transaction_type: String,

        amount: String,
    },

    /// Delete a transaction by position (file) or id (sqlite)
    Delete {
        /// Key as shown by `list`
        key: u64,
    },

    /// Show total income, total expense and net balance
    Balance {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Detailed listing of expenses
    Expenses,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.backend, self.path.clone())
    }

    pub async fn run(self) -> Result<()> {
        let service = LedgerService::open(&self.store_config()).await?;

        match self.command {
            Commands::Add {
                category,
                description,
                transaction_type,
                amount,
            } => {
                let listed = service
                    .record(&category, &description, &transaction_type, &amount)
                    .await?;
                println!(
                    "Recorded {} {} ({}) [{}]",
                    listed.row.transaction_type, listed.row.amount, listed.row.description, listed.key
                );
            }

            Commands::List { format } => {
                let entries = service.list().await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
                    _ => print_entries(&entries),
                }
            }

            Commands::Update {
                position,
                category,
                description,
                transaction_type,
                amount,
            } => {
                let listed = service
                    .update(position, &category, &description, &transaction_type, &amount)
                    .await?;
                println!(
                    "Updated [{}]: {} {} ({})",
                    listed.key, listed.row.transaction_type, listed.row.amount, listed.row.description
                );
            }

            Commands::Delete { key } => {
                service.delete(key).await?;
                println!("Deleted [{}]", key);
            }

            Commands::Balance { format } => {
                let report = service.balance().await?;
                match format.as_str() {
                    "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                    _ => print_balance(&report, self.verbose),
                }
            }

            Commands::Expenses => {
                let extract = service.expense_extract().await?;
                let rule = "-".repeat(70);
                println!("{}", rule);
                println!(
                    "{:<12} | {:<15} | {:<25} | {:>10}",
                    "DATE", "CATEGORY", "DESCRIPTION", "VALUE"
                );
                println!("{}", rule);
                for line in &extract.lines {
                    println!(
                        "{:<12} | {:<15} | {:<25} | {:>10}",
                        line.date,
                        truncate(&line.category, 15),
                        truncate(&line.description, 25),
                        format_amount(line.value)
                    );
                }
                println!("{}", rule);
                println!("{:<58} | {:>10}", "TOTAL", format_amount(extract.total));
                if extract.skipped > 0 {
                    println!("Skipped rows: {}", extract.skipped);
                }
            }
        }

        Ok(())
    }
}

fn print_entries(entries: &[ListedEntry]) {
    if entries.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:>5}  {:<12} {:<15} {:<25} {:<8} {:>12}",
        "KEY", "DATE", "CATEGORY", "DESCRIPTION", "TYPE", "AMOUNT"
    );
    println!("{}", "-".repeat(82));
    for entry in entries {
        let row = &entry.row;
        println!(
            "{:>5}  {:<12} {:<15} {:<25} {:<8} {:>12}",
            entry.key,
            row.date,
            truncate(&row.category, 15),
            truncate(&row.description, 25),
            row.transaction_type,
            row.amount
        );
    }
}

fn print_balance(report: &BalanceReport, verbose: bool) {
    println!("Total income:   {:>12}", format_amount(report.total_income));
    println!("Total expense:  {:>12}", format_amount(report.total_expense));
    println!("Net balance:    {:>12}", format_amount(report.net_balance));
    if report.skipped > 0 || verbose {
        println!("Skipped rows:   {:>12}", report.skipped);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the default level.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default = if verbose { "tally=debug" } else { "tally=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
