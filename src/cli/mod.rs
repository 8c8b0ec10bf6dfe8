pub mod accounts;
pub mod backup;
pub mod budget;
pub mod categories;
pub mod import;
pub mod init;
pub mod report;
pub mod rules;
pub mod transactions;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};

use crate::error::Result;
use crate::fmt::money;
use crate::models::{AccountType, GoalType, MatchType};

/// Today's date in local time. Month defaults and reports hang off this.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Money in red when negative.
pub(crate) fn tinted(val: f64) -> ColoredString {
    let text = money(val);
    if val < 0.0 && text.starts_with('-') { text.red() } else { text.normal() }
}

/// Ask a yes/no question on stdin; `assume_yes` skips the prompt.
pub(crate) fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[derive(Parser)]
#[command(name = "zeroed", version, about = "Zero-based budgeting CLI backed by SQLite.")]
pub struct Cli {
    /// Database file (default: <data_dir>/budget.db)
    #[arg(long, global = true, env = "ZEROED_DB")]
    pub db: Option<PathBuf>,
    /// Print debug logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database with default categories.
    Init {
        /// Directory for zeroed data (default: ~/Documents/zeroed)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show the version.
    Version,
    /// Delete all data and start over with default categories.
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Back up the database.
    Backup {
        /// Output path (default: <db dir>/backups/budget-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage category groups and categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// List, add and categorize transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Assign money to categories.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Manage payee matching rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Import bank statements.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Spending reports.
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List open accounts.
    List,
    /// Create an account.
    Create {
        name: String,
        /// checking, savings, credit_card, cash, investment
        #[arg(short = 't', long = "type")]
        account_type: AccountType,
        /// Bank or institution name
        #[arg(short, long)]
        institution: Option<String>,
        /// Starting balance
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        balance: f64,
        /// Track the account without including it in the budget
        #[arg(long)]
        off_budget: bool,
    },
    /// Show account details.
    Show { name: String },
    /// Close an account.
    Close {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Balances grouped by type, with net worth.
    Balances {
        /// Include closed accounts
        #[arg(long)]
        all: bool,
    },
    /// Recalculate an account's balances from its transactions.
    Recalc { name: String },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List visible categories.
    List {
        /// Show as a tree
        #[arg(long)]
        tree: bool,
    },
    /// Create a category group.
    CreateGroup { name: String },
    /// Create a category in a group.
    Create {
        name: String,
        #[arg(short, long)]
        group: String,
    },
    /// Rename a category.
    Rename { name: String, new_name: String },
    /// Hide a category from the budget.
    Hide { name: String },
    /// Show a hidden category again.
    Unhide { name: String },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List transactions, newest first.
    List {
        #[arg(short, long)]
        account: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// YYYY-MM
        #[arg(short, long)]
        month: Option<String>,
        /// Only uncategorized transactions
        #[arg(short, long)]
        uncategorized: bool,
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },
    /// Add a transaction by hand. Negative amounts are outflows.
    Add {
        account: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        #[arg(short, long)]
        payee: String,
        #[arg(short, long)]
        category: Option<String>,
        /// YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        memo: Option<String>,
    },
    /// Assign a category to a transaction.
    Categorize {
        id: i64,
        category: String,
        /// Don't remember this payee's category
        #[arg(long)]
        no_learn: bool,
    },
    /// Mark a transaction as cleared.
    Clear { id: i64 },
    /// List uncategorized transactions.
    Uncategorized,
    /// Run payees and rules over every uncategorized transaction.
    AutoCategorize,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Show the budget for a month.
    Show {
        /// YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set the amount budgeted to a category.
    Set {
        category: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Suggest budgets from average spending.
    Auto {
        #[arg(short, long)]
        month: Option<String>,
        /// Months of history to average (default from settings)
        #[arg(long)]
        lookback: Option<u32>,
        /// Apply without asking
        #[arg(long)]
        yes: bool,
    },
    /// Totals, funding and overspent categories.
    Summary {
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Set a goal on a category.
    Goal {
        category: String,
        /// target_balance, target_by_date, monthly_funding, spending
        #[arg(short = 't', long = "type")]
        goal_type: GoalType,
        #[arg(long)]
        target: Option<f64>,
        /// Target date, YYYY-MM-DD
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        monthly: Option<f64>,
    },
    /// Remove a category's goal.
    ClearGoal { category: String },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// List rules by priority.
    List,
    /// Create a rule mapping a payee pattern to a category.
    Create {
        pattern: String,
        #[arg(short, long)]
        category: String,
        /// contains, starts_with, exact, regex
        #[arg(short = 't', long = "type", default_value = "contains")]
        match_type: MatchType,
        /// Higher priorities are checked first
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i64,
    },
    /// Delete a rule.
    Delete { id: i64 },
    /// Show which category a payee name would get.
    Test { payee: String },
    /// List known payees.
    Payees,
    /// Set a payee's default category.
    SetPayee { payee: String, category: String },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import transactions from a CSV file.
    Csv {
        file: PathBuf,
        #[arg(short, long)]
        account: String,
        /// chase, generic, or a saved profile name
        #[arg(short, long)]
        format: Option<String>,
        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },
    /// List available formats and saved profiles.
    Profiles,
    /// Save a custom CSV column mapping.
    ProfileAdd {
        name: String,
        #[arg(long)]
        institution: Option<String>,
        #[arg(long)]
        date_column: String,
        #[arg(long, default_value = "%m/%d/%Y")]
        date_format: String,
        /// Signed amount column
        #[arg(long)]
        amount_column: Option<String>,
        #[arg(long)]
        inflow_column: Option<String>,
        #[arg(long)]
        outflow_column: Option<String>,
        #[arg(long)]
        payee_column: String,
        #[arg(long)]
        memo_column: Option<String>,
        /// Lines up to and including the header row
        #[arg(long, default_value_t = 1)]
        skip_rows: i64,
        /// Multiply every amount, e.g. -1 for card exports that show charges as positive
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        multiplier: f64,
    },
    /// Delete a saved profile.
    ProfileDelete { name: String },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Spending by category or group.
    Spending {
        #[arg(short, long, default_value_t = 1)]
        months: u32,
        /// Group by category group
        #[arg(short, long)]
        group: bool,
    },
    /// Income and spending per month.
    Trends {
        /// Number of months (default from settings)
        #[arg(short, long)]
        months: Option<u32>,
    },
    /// This month at a glance.
    Summary,
    /// Spending history for one category.
    Category {
        name: String,
        #[arg(short, long, default_value_t = 6)]
        months: u32,
    },
}
