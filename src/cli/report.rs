use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::cli::today;
use crate::error::Result;
use crate::fmt::money;
use crate::month::{long_label, short_label};
use crate::reports::{self, CategoryHistory, SpendingReport, Summary, TrendMonth};

fn net_cell(net: f64) -> String {
    if net >= 0.0 {
        money(net).green().to_string()
    } else {
        money(net).red().to_string()
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

pub fn format_spending(data: &SpendingReport, by_group: bool) -> String {
    if data.items.is_empty() {
        return format!("No spending since {}.", data.since);
    }
    let mut table = Table::new();
    if by_group {
        table.set_header(vec!["Group", "Amount", "%"]);
    } else {
        table.set_header(vec!["Category", "Group", "Amount", "%"]);
    }
    for item in &data.items {
        let mut row = vec![Cell::new(&item.name)];
        if !by_group {
            row.push(Cell::new(item.group.as_deref().unwrap_or("").dimmed()));
        }
        row.push(Cell::new(money(item.amount)));
        row.push(Cell::new(format!("{:.1}%", item.percent)));
        table.add_row(row);
    }
    let mut total = vec![Cell::new("Total".bold())];
    if !by_group {
        total.push(Cell::new(""));
    }
    total.push(Cell::new(money(data.total).bold()));
    total.push(Cell::new(""));
    table.add_row(total);
    format!("Spending since {}\n{table}", data.since)
}

pub fn format_trends(months: &[TrendMonth]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Spending", "Net"]);
    for m in months {
        table.add_row(vec![
            Cell::new(short_label(m.month)),
            Cell::new(money(m.income)),
            Cell::new(money(m.spending)),
            Cell::new(net_cell(m.net)),
        ]);
    }
    format!("Income vs Spending\n{table}")
}

pub fn format_summary(data: &Summary) -> String {
    let mut out = format!("{}\n\n", format!("Summary - {}", long_label(data.month)).bold());
    out.push_str(&format!("Income:             {}\n", money(data.income).green()));
    out.push_str(&format!("Spending:           {}\n", money(data.spending).red()));
    out.push_str(&format!("Net:                {}\n", net_cell(data.net)));
    out.push_str(&format!("\nTransactions:       {}\n", data.transaction_count));
    if data.uncategorized > 0 {
        out.push_str(&format!(
            "Uncategorized:      {}\n",
            data.uncategorized.to_string().yellow()
        ));
    }
    out.push_str(&format!("On-budget balance:  {}", money(data.on_budget_balance)));
    out
}

pub fn format_category(data: &CategoryHistory) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Spent", "Transactions"]);
    for m in &data.months {
        table.add_row(vec![
            Cell::new(short_label(m.month)),
            Cell::new(money(m.spent)),
            Cell::new(m.transactions),
        ]);
    }
    format!(
        "{} - Spending History\n{table}\n\nTotal: {}\nMonthly average: {}",
        data.category.name,
        money(data.total()),
        money(data.average())
    )
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn spending(conn: &Connection, months: u32, by_group: bool) -> Result<()> {
    let data = reports::spending(conn, today(), months, by_group)?;
    println!("{}", format_spending(&data, by_group));
    Ok(())
}

pub fn trends(conn: &Connection, months: u32) -> Result<()> {
    let data = reports::trends(conn, today(), months)?;
    println!("{}", format_trends(&data));
    Ok(())
}

pub fn summary(conn: &Connection) -> Result<()> {
    let data = reports::summary(conn, today())?;
    println!("{}", format_summary(&data));
    Ok(())
}

pub fn category(conn: &Connection, name: &str, months: u32) -> Result<()> {
    let data = reports::category_history(conn, today(), name, months)?;
    println!("{}", format_category(&data));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::reports::SpendingItem;

    fn may() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    #[test]
    fn test_format_spending_by_category() {
        colored::control::set_override(false);
        let data = SpendingReport {
            since: may(),
            items: vec![SpendingItem {
                name: "Groceries".into(),
                group: Some("Everyday".into()),
                amount: 150.0,
                percent: 100.0,
            }],
            total: 150.0,
        };
        let out = format_spending(&data, false);
        assert!(out.starts_with("Spending since 2026-05-01\n"));
        assert!(out.contains("Groceries"));
        assert!(out.contains("Everyday"));
        assert!(out.contains("100.0%"));
        assert!(out.contains("$150.00"));
    }

    #[test]
    fn test_format_spending_empty() {
        let data = SpendingReport { since: may(), items: vec![], total: 0.0 };
        assert_eq!(format_spending(&data, true), "No spending since 2026-05-01.");
    }

    #[test]
    fn test_format_trends_labels_months() {
        colored::control::set_override(false);
        let out = format_trends(&[TrendMonth {
            month: may(),
            income: 3000.0,
            spending: 1200.0,
            net: 1800.0,
        }]);
        assert!(out.contains(&short_label(may())));
        assert!(out.contains("$3,000.00"));
        assert!(out.contains("$1,800.00"));
    }

    #[test]
    fn test_format_summary_hides_zero_uncategorized() {
        colored::control::set_override(false);
        let mut data = Summary {
            month: may(),
            income: 100.0,
            spending: 40.0,
            net: 60.0,
            transaction_count: 3,
            uncategorized: 0,
            on_budget_balance: 560.0,
        };
        let out = format_summary(&data);
        assert!(out.starts_with("Summary - May 2026"));
        assert!(!out.contains("Uncategorized"));
        data.uncategorized = 2;
        assert!(format_summary(&data).contains("Uncategorized:      2"));
    }
}
