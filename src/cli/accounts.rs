use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::accounts::{self, NewAccount};
use crate::cli::{confirm, tinted};
use crate::error::Result;
use crate::fmt::money;
use crate::models::AccountType;

pub fn list(conn: &Connection) -> Result<()> {
    let accounts = accounts::list_accounts(conn, false)?;
    if accounts.is_empty() {
        println!("No accounts found. Create one with 'zeroed accounts create'");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Type", "Institution", "Balance", "On Budget"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(&account.name),
            Cell::new(account.account_type.label()),
            Cell::new(account.institution.as_deref().unwrap_or("-")),
            Cell::new(tinted(account.current_balance)),
            Cell::new(if account.is_on_budget { "Yes" } else { "No" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn create(
    conn: &Connection,
    name: &str,
    account_type: AccountType,
    institution: Option<&str>,
    balance: f64,
    off_budget: bool,
) -> Result<()> {
    let account = accounts::create_account(
        conn,
        &NewAccount {
            name,
            account_type,
            institution,
            starting_balance: balance,
            on_budget: !off_budget,
        },
    )?;
    println!("{}", format!("Created account '{}'", account.name).green());
    println!("  Type: {}", account.account_type.label());
    println!("  Balance: {}", money(account.current_balance));
    if let Some(inst) = &account.institution {
        println!("  Institution: {inst}");
    }
    if off_budget {
        println!("  Off budget (tracking only)");
    }
    Ok(())
}

pub fn show(conn: &Connection, name: &str) -> Result<()> {
    let account = accounts::find_account(conn, name)?;
    let count = accounts::transaction_count(conn, account.id)?;
    println!("{}", account.name.bold());
    println!("  Type: {}", account.account_type.label());
    if let Some(inst) = &account.institution {
        println!("  Institution: {inst}");
    }
    println!("  Current Balance: {}", tinted(account.current_balance));
    println!("  Cleared Balance: {}", tinted(account.cleared_balance));
    println!("  On Budget: {}", if account.is_on_budget { "Yes" } else { "No" });
    if account.is_closed {
        println!("  Closed");
    }
    println!("  Transactions: {count}");
    Ok(())
}

pub fn close(conn: &Connection, name: &str, yes: bool) -> Result<()> {
    let account = accounts::find_account(conn, name)?;
    if account.is_closed {
        println!("Account '{}' is already closed", account.name);
        return Ok(());
    }
    if account.current_balance.abs() >= 0.005 {
        println!(
            "{}",
            format!("Warning: '{}' still has a balance of {}", account.name, money(account.current_balance)).yellow()
        );
    }
    if !confirm(&format!("Close account '{}'?", account.name), yes)? {
        println!("Cancelled");
        return Ok(());
    }
    accounts::close_account(conn, account.id)?;
    println!("{}", format!("Closed account '{}'", account.name).green());
    Ok(())
}

pub fn balances(conn: &Connection, all: bool) -> Result<()> {
    let sheet = accounts::balance_sheet(conn, all)?;
    if sheet.groups.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Account", "Cleared", "Current"]);
    for group in &sheet.groups {
        table.add_row(vec![
            Cell::new(group.account_type.label().bold()),
            Cell::new(""),
            Cell::new(""),
        ]);
        for account in &group.accounts {
            let label = if account.is_closed {
                format!("  {} (closed)", account.name)
            } else {
                format!("  {}", account.name)
            };
            table.add_row(vec![
                Cell::new(label),
                Cell::new(tinted(account.cleared_balance)),
                Cell::new(tinted(account.current_balance)),
            ]);
        }
    }
    println!("Account Balances\n{table}");
    println!("Total Assets:      {}", money(sheet.total_assets));
    println!("Total Liabilities: {}", money(sheet.total_liabilities));
    println!("Net Worth:         {}", tinted(sheet.net_worth).bold());
    Ok(())
}

pub fn recalc(conn: &Connection, name: &str) -> Result<()> {
    let before = accounts::find_account(conn, name)?;
    let after = accounts::update_balance(conn, before.id)?;
    println!("Recalculated '{}'", after.name);
    println!("  Current: {} -> {}", money(before.current_balance), money(after.current_balance));
    println!("  Cleared: {} -> {}", money(before.cleared_balance), money(after.cleared_balance));
    Ok(())
}
