use chrono::NaiveDate;
use rusqlite::Connection;

use crate::budget::{income_between, spending_between};
use crate::categories::find_category;
use crate::error::{Result, ZeroedError};
use crate::models::Category;
use crate::month::{iso, month_start, next_month, shift_months};

fn check_months(months: u32) -> Result<()> {
    if months == 0 {
        return Err(ZeroedError::Other("--months must be at least 1".into()));
    }
    Ok(())
}

/// First day of the earliest month in a window of `months` ending with the
/// month containing `today`.
fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    shift_months(month_start(today), 1 - months as i32)
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Spending
// ---------------------------------------------------------------------------

pub struct SpendingItem {
    pub name: String,
    /// Group name; `None` when the report is already per group.
    pub group: Option<String>,
    pub amount: f64,
    pub percent: f64,
}

pub struct SpendingReport {
    pub since: NaiveDate,
    pub items: Vec<SpendingItem>,
    pub total: f64,
}

/// Categorized outflows since the start of the window, largest first.
pub fn spending(conn: &Connection, today: NaiveDate, months: u32, by_group: bool) -> Result<SpendingReport> {
    check_months(months)?;
    let since = window_start(today, months);
    let (select, group_by) = if by_group {
        ("g.name, NULL", "g.id")
    } else {
        ("c.name, g.name", "c.id")
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {select}, -SUM(t.amount) AS spent FROM transactions t \
         JOIN categories c ON t.category_id = c.id \
         JOIN category_groups g ON c.group_id = g.id \
         WHERE t.amount < 0 AND t.date >= ?1 \
         GROUP BY {group_by} ORDER BY spent DESC"
    ))?;
    let rows = stmt
        .query_map([iso(since)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, row.get::<_, f64>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total: f64 = rows.iter().map(|(_, _, amount)| amount).sum();
    let items = rows
        .into_iter()
        .map(|(name, group, amount)| SpendingItem {
            name,
            group,
            amount,
            percent: percent(amount, total),
        })
        .collect();
    Ok(SpendingReport { since, items, total })
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

pub struct TrendMonth {
    pub month: NaiveDate,
    pub income: f64,
    /// Positive number of dollars spent.
    pub spending: f64,
    pub net: f64,
}

/// On-budget income and spending per month, oldest first.
pub fn trends(conn: &Connection, today: NaiveDate, months: u32) -> Result<Vec<TrendMonth>> {
    check_months(months)?;
    let mut result = Vec::with_capacity(months as usize);
    let mut month = window_start(today, months);
    for _ in 0..months {
        let end = next_month(month);
        let income = income_between(conn, month, end)?;
        let spent = spending_between(conn, month, end)?;
        result.push(TrendMonth {
            month,
            income,
            spending: spent.abs(),
            net: income + spent,
        });
        month = end;
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub struct Summary {
    pub month: NaiveDate,
    pub income: f64,
    pub spending: f64,
    pub net: f64,
    pub transaction_count: i64,
    pub uncategorized: i64,
    pub on_budget_balance: f64,
}

pub fn summary(conn: &Connection, today: NaiveDate) -> Result<Summary> {
    let month = month_start(today);
    let end = next_month(month);
    let income = income_between(conn, month, end)?;
    let spent = spending_between(conn, month, end)?;
    let transaction_count: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE date >= ?1 AND date < ?2",
        [iso(month), iso(end)],
        |row| row.get(0),
    )?;
    let uncategorized: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE category_id IS NULL",
        [],
        |row| row.get(0),
    )?;
    let on_budget_balance: f64 = conn.query_row(
        "SELECT COALESCE(SUM(current_balance), 0) FROM accounts WHERE is_closed = 0 AND is_on_budget = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(Summary {
        month,
        income,
        spending: spent.abs(),
        net: income + spent,
        transaction_count,
        uncategorized,
        on_budget_balance,
    })
}

// ---------------------------------------------------------------------------
// Category history
// ---------------------------------------------------------------------------

pub struct CategoryMonth {
    pub month: NaiveDate,
    pub spent: f64,
    pub transactions: i64,
}

pub struct CategoryHistory {
    pub category: Category,
    /// Newest month first.
    pub months: Vec<CategoryMonth>,
}

impl CategoryHistory {
    pub fn total(&self) -> f64 {
        self.months.iter().map(|m| m.spent).sum()
    }

    pub fn average(&self) -> f64 {
        if self.months.is_empty() {
            return 0.0;
        }
        self.total() / self.months.len() as f64
    }
}

pub fn category_history(conn: &Connection, today: NaiveDate, name: &str, months: u32) -> Result<CategoryHistory> {
    check_months(months)?;
    let category = find_category(conn, name)?;
    let mut stmt = conn.prepare(
        "SELECT COALESCE(-SUM(amount), 0), count(*) FROM transactions \
         WHERE category_id = ?1 AND amount < 0 AND date >= ?2 AND date < ?3",
    )?;
    let mut history = Vec::with_capacity(months as usize);
    let mut month = month_start(today);
    for _ in 0..months {
        let (spent, transactions) = stmt.query_row(
            rusqlite::params![category.id, iso(month), iso(next_month(month))],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        history.push(CategoryMonth { month, spent, transactions });
        month = shift_months(month, -1);
    }
    Ok(CategoryHistory { category, months: history })
}
