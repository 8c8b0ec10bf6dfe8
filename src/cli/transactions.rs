use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::categorizer::categorize_uncategorized;
use crate::cli::{tinted, today};
use crate::error::Result;
use crate::fmt::{clip, signed_money};
use crate::month::parse_date;
use crate::transactions::{self, ManualTransaction, TransactionFilter, TransactionRow};

pub fn format_rows(title: &str, rows: &[TransactionRow]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Account", "Payee", "Category", "Amount", "C"]);
    for row in rows {
        let category = match &row.category {
            Some(c) => c.normal(),
            None => "Uncategorized".yellow(),
        };
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.date),
            Cell::new(clip(&row.account_name, 15)),
            Cell::new(clip(row.payee.as_deref().unwrap_or("-"), 30)),
            Cell::new(category),
            Cell::new(tinted(row.amount)),
            Cell::new(if row.is_cleared { "✓" } else { "" }),
        ]);
    }
    format!("{title}\n{table}")
}

pub fn list(conn: &Connection, filter: &TransactionFilter<'_>) -> Result<()> {
    let rows = transactions::list_transactions(conn, filter)?;
    if rows.is_empty() {
        println!("No transactions found");
        return Ok(());
    }
    println!("{}", format_rows(&format!("Transactions ({})", rows.len()), &rows));
    Ok(())
}

pub fn add(
    conn: &Connection,
    account: &str,
    amount: f64,
    payee: &str,
    category: Option<&str>,
    date: Option<&str>,
    memo: Option<&str>,
) -> Result<()> {
    let date = match date {
        Some(d) => parse_date(d)?,
        None => today(),
    };
    let added = transactions::add_transaction(
        conn,
        &ManualTransaction {
            account,
            amount,
            payee,
            category,
            date,
            memo,
        },
    )?;
    if let Some(missing) = &added.missing_category {
        println!("{}", format!("Category '{missing}' not found, leaving uncategorized").yellow());
    }
    println!(
        "{}",
        format!("Added {} to {} (#{})", signed_money(amount), added.account_name, added.id).green()
    );
    println!("  Payee: {payee}");
    if let Some(cat) = &added.category {
        println!("  Category: {}", cat.name);
    }
    println!("  Date: {date}");
    Ok(())
}

pub fn categorize(conn: &Connection, id: i64, category: &str, learn: bool) -> Result<()> {
    let category = transactions::categorize_transaction(conn, id, category, learn)?;
    println!("{}", format!("Categorized transaction #{id} as {}", category.name).green());
    Ok(())
}

pub fn clear(conn: &Connection, id: i64) -> Result<()> {
    if transactions::clear_transaction(conn, id)? {
        println!("{}", format!("Cleared transaction #{id}").green());
    } else {
        println!("Transaction #{id} was already cleared");
    }
    Ok(())
}

pub fn uncategorized(conn: &Connection) -> Result<()> {
    let count = transactions::uncategorized_count(conn)?;
    if count == 0 {
        println!("{}", "All transactions are categorized!".green());
        return Ok(());
    }
    let rows = transactions::list_transactions(
        conn,
        &TransactionFilter {
            uncategorized: true,
            limit: 100,
            ..Default::default()
        },
    )?;
    println!("{}", format_rows(&format!("Uncategorized Transactions ({count})"), &rows));
    println!("Assign one with 'zeroed transactions categorize <id> <category>'");
    Ok(())
}

pub fn auto_categorize(conn: &Connection) -> Result<()> {
    let result = categorize_uncategorized(conn)?;
    println!("Categorized {} transactions", result.categorized);
    if result.still_uncategorized > 0 {
        println!("{} still need a category", result.still_uncategorized);
    }
    Ok(())
}
