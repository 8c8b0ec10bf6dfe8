//! Zero-based budgeting arithmetic.
//!
//! Every dollar that comes in must be assigned to a category. Two numbers
//! drive the budget screen:
//!
//! - **Ready to Assign** for a month is this month's on-budget income, plus
//!   everything left over from earlier months, minus what has been budgeted
//!   this month.
//! - **Available** for a category is what was budgeted to it plus its
//!   activity (spending is negative), accumulated over every month up to and
//!   including the one shown.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;

use crate::categories::{find_category, list_visible};
use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Category, Goal, GoalType};
use crate::month::{iso, month_start, months_between, next_month, parse_date, shift_months};

fn on_budget_sum(conn: &Connection, sign: &str, from: Option<NaiveDate>, to: NaiveDate) -> Result<f64> {
    let lower = if from.is_some() { "AND t.date >= ?2" } else { "" };
    let sql = format!(
        "SELECT COALESCE(SUM(t.amount), 0) FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         WHERE a.is_on_budget = 1 AND t.amount {sign} 0 AND t.date < ?1 {lower}"
    );
    let total = match from {
        Some(from) => conn.query_row(&sql, [iso(to), iso(from)], |row| row.get(0))?,
        None => conn.query_row(&sql, [iso(to)], |row| row.get(0))?,
    };
    Ok(total)
}

/// Positive amounts into on-budget accounts dated within `[from, to)`.
pub fn income_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<f64> {
    on_budget_sum(conn, ">", Some(from), to)
}

/// Negative amounts out of on-budget accounts dated within `[from, to)`.
pub fn spending_between(conn: &Connection, from: NaiveDate, to: NaiveDate) -> Result<f64> {
    on_budget_sum(conn, "<", Some(from), to)
}

fn budgeted_in_month(conn: &Connection, month: NaiveDate) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(budgeted), 0) FROM budget_entries WHERE month = ?1",
        [iso(month)],
        |row| row.get(0),
    )?)
}

/// Unassigned money left over from every month before `month`: historical
/// income plus historical spending, minus everything ever budgeted.
pub fn carryover(conn: &Connection, month: NaiveDate) -> Result<f64> {
    let start = month_start(month);
    let budgeted: f64 = conn.query_row(
        "SELECT COALESCE(SUM(budgeted), 0) FROM budget_entries WHERE month < ?1",
        [iso(start)],
        |row| row.get(0),
    )?;
    let inflows = on_budget_sum(conn, ">", None, start)?;
    let outflows = on_budget_sum(conn, "<", None, start)?;
    Ok(inflows + outflows - budgeted)
}

pub fn ready_to_assign(conn: &Connection, month: NaiveDate) -> Result<f64> {
    let start = month_start(month);
    let income = income_between(conn, start, next_month(start))?;
    let budgeted = budgeted_in_month(conn, start)?;
    Ok(income + carryover(conn, start)? - budgeted)
}

pub fn budgeted_for(conn: &Connection, category_id: i64, month: NaiveDate) -> Result<f64> {
    Ok(conn
        .query_row(
            "SELECT budgeted FROM budget_entries WHERE category_id = ?1 AND month = ?2",
            rusqlite::params![category_id, iso(month_start(month))],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0.0))
}

/// Net transaction amount for a category in the month containing `month`.
pub fn activity(conn: &Connection, category_id: i64, month: NaiveDate) -> Result<f64> {
    let start = month_start(month);
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions \
         WHERE category_id = ?1 AND date >= ?2 AND date < ?3",
        rusqlite::params![category_id, iso(start), iso(next_month(start))],
        |row| row.get(0),
    )?)
}

pub fn category_available(conn: &Connection, category_id: i64, month: NaiveDate) -> Result<f64> {
    let start = month_start(month);
    let budgeted = budgeted_for(conn, category_id, start)?;
    let this_activity = activity(conn, category_id, start)?;
    let prev_budgeted: f64 = conn.query_row(
        "SELECT COALESCE(SUM(budgeted), 0) FROM budget_entries WHERE category_id = ?1 AND month < ?2",
        rusqlite::params![category_id, iso(start)],
        |row| row.get(0),
    )?;
    let prev_activity: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE category_id = ?1 AND date < ?2",
        rusqlite::params![category_id, iso(start)],
        |row| row.get(0),
    )?;
    Ok(budgeted + this_activity + prev_budgeted + prev_activity)
}

// ---------------------------------------------------------------------------
// Month view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBudget {
    pub id: i64,
    pub name: String,
    pub budgeted: f64,
    pub activity: f64,
    pub available: f64,
    pub goal: Option<GoalProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupBudget {
    pub id: i64,
    pub name: String,
    pub categories: Vec<CategoryBudget>,
}

impl GroupBudget {
    pub fn budgeted(&self) -> f64 {
        self.categories.iter().map(|c| c.budgeted).sum()
    }

    pub fn activity(&self) -> f64 {
        self.categories.iter().map(|c| c.activity).sum()
    }

    pub fn available(&self) -> f64 {
        self.categories.iter().map(|c| c.available).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthBudget {
    /// First day of the month, `YYYY-MM-DD`.
    pub month: String,
    pub ready_to_assign: f64,
    pub groups: Vec<GroupBudget>,
}

impl MonthBudget {
    pub fn categories(&self) -> impl Iterator<Item = &CategoryBudget> {
        self.groups.iter().flat_map(|g| g.categories.iter())
    }
}

pub fn month_budget(conn: &Connection, month: NaiveDate) -> Result<MonthBudget> {
    let start = month_start(month);
    let mut groups = Vec::new();
    for entry in list_visible(conn)? {
        let mut categories = Vec::with_capacity(entry.categories.len());
        for cat in entry.categories {
            let budgeted = budgeted_for(conn, cat.id, start)?;
            let activity = activity(conn, cat.id, start)?;
            let available = category_available(conn, cat.id, start)?;
            let goal = match get_goal(conn, cat.id)? {
                Some(goal) => Some(goal_progress(&goal, start, budgeted, available)),
                None => None,
            };
            categories.push(CategoryBudget {
                id: cat.id,
                name: cat.name,
                budgeted,
                activity,
                available,
                goal,
            });
        }
        groups.push(GroupBudget {
            id: entry.group.id,
            name: entry.group.name,
            categories,
        });
    }
    Ok(MonthBudget {
        month: iso(start),
        ready_to_assign: ready_to_assign(conn, start)?,
        groups,
    })
}

/// Set (or replace) the amount budgeted to a category for a month.
pub fn set_category_budget(conn: &Connection, category_name: &str, month: NaiveDate, amount: f64) -> Result<Category> {
    let category = find_category(conn, category_name)?;
    set_budget_by_id(conn, category.id, month, amount)?;
    info!(category = %category.name, month = %iso(month_start(month)), amount, "set budget");
    Ok(category)
}

fn set_budget_by_id(conn: &Connection, category_id: i64, month: NaiveDate, amount: f64) -> Result<()> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO budget_entries (category_id, month, budgeted, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4) \
         ON CONFLICT(category_id, month) DO UPDATE SET budgeted = excluded.budgeted, updated_at = excluded.updated_at",
        rusqlite::params![category_id, iso(month_start(month)), amount, now],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub category_id: i64,
    pub category: String,
    pub suggested: f64,
    pub current: f64,
}

/// Average monthly spending per visible category over the `lookback_months`
/// before `month`, largest first. Categories with no spending are left out.
pub fn suggest_budgets(conn: &Connection, month: NaiveDate, lookback_months: u32) -> Result<Vec<Suggestion>> {
    if lookback_months == 0 {
        return Err(ZeroedError::Other("Lookback must be at least one month".into()));
    }
    let start = month_start(month);
    let lookback_start = shift_months(start, -(lookback_months as i32));

    let mut stmt = conn.prepare(
        "SELECT COALESCE(SUM(amount), 0) FROM transactions \
         WHERE category_id = ?1 AND amount < 0 AND date >= ?2 AND date < ?3",
    )?;
    let mut suggestions = Vec::new();
    for cat in list_visible(conn)?.into_iter().flat_map(|g| g.categories) {
        let spent: f64 = stmt.query_row(
            rusqlite::params![cat.id, iso(lookback_start), iso(start)],
            |row| row.get(0),
        )?;
        let average = spent.abs() / lookback_months as f64;
        if average > 0.0 {
            suggestions.push(Suggestion {
                category_id: cat.id,
                category: cat.name,
                suggested: (average * 100.0).round() / 100.0,
                current: budgeted_for(conn, cat.id, start)?,
            });
        }
    }
    suggestions.sort_by(|a, b| b.suggested.total_cmp(&a.suggested));
    Ok(suggestions)
}

pub fn apply_suggestions(conn: &Connection, month: NaiveDate, suggestions: &[Suggestion]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for s in suggestions {
        set_budget_by_id(&tx, s.category_id, month, s.suggested)?;
    }
    tx.commit()?;
    info!(count = suggestions.len(), month = %iso(month_start(month)), "applied budget suggestions");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub struct BudgetSummary {
    pub ready_to_assign: f64,
    pub total_budgeted: f64,
    pub total_spent: f64,
    pub total_available: f64,
    pub funded: usize,
    pub total_categories: usize,
    pub overspent: Vec<(String, f64)>,
}

pub fn summarize(budget: &MonthBudget) -> BudgetSummary {
    BudgetSummary {
        ready_to_assign: budget.ready_to_assign,
        total_budgeted: budget.categories().map(|c| c.budgeted).sum(),
        total_spent: budget
            .categories()
            .filter(|c| c.activity < 0.0)
            .map(|c| c.activity)
            .sum::<f64>()
            .abs(),
        total_available: budget.categories().map(|c| c.available).sum(),
        funded: budget.categories().filter(|c| c.budgeted > 0.0).count(),
        total_categories: budget.categories().count(),
        overspent: budget
            .categories()
            .filter(|c| c.available < 0.0)
            .map(|c| (c.name.clone(), c.available))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalProgress {
    TargetBalance {
        target: f64,
        saved: f64,
        progress: f64,
        remaining: f64,
    },
    TargetByDate {
        target: f64,
        target_date: Option<String>,
        saved: f64,
        progress: f64,
        monthly_needed: f64,
        months_remaining: i32,
    },
    MonthlyFunding {
        target: f64,
        budgeted: f64,
        funded: bool,
    },
    Spending {
        target: Option<f64>,
        available: f64,
    },
}

impl GoalProgress {
    /// One-line description for tables.
    pub fn describe(&self) -> String {
        match self {
            Self::TargetBalance { progress, .. } => format!("{progress:.0}% of balance"),
            Self::TargetByDate {
                progress,
                monthly_needed,
                ..
            } => format!("{progress:.0}%, {} /mo", crate::fmt::money(*monthly_needed)),
            Self::MonthlyFunding { funded, .. } => {
                if *funded { "funded".to_string() } else { "underfunded".to_string() }
            }
            Self::Spending { target, .. } => match target {
                Some(t) => format!("spend {}", crate::fmt::money(*t)),
                None => "spending".to_string(),
            },
        }
    }
}

fn percent_of(saved: f64, target: f64) -> f64 {
    if target == 0.0 {
        return 0.0;
    }
    (saved / target * 100.0).clamp(0.0, 100.0)
}

/// Without a target date a dated goal is spread over a year.
const DEFAULT_GOAL_MONTHS: i32 = 12;

pub fn goal_progress(goal: &Goal, month: NaiveDate, budgeted: f64, available: f64) -> GoalProgress {
    let target = goal.target_amount.unwrap_or(0.0);
    let remaining = if target == 0.0 { 0.0 } else { (target - available).max(0.0) };
    match goal.goal_type {
        GoalType::TargetBalance => GoalProgress::TargetBalance {
            target,
            saved: available,
            progress: percent_of(available, target),
            remaining,
        },
        GoalType::TargetByDate => {
            let months_remaining = goal
                .target_date
                .as_deref()
                .and_then(|d| parse_date(d).ok())
                .map(|d| months_between(month_start(month), d))
                .unwrap_or(DEFAULT_GOAL_MONTHS);
            GoalProgress::TargetByDate {
                target,
                target_date: goal.target_date.clone(),
                saved: available,
                progress: percent_of(available, target),
                monthly_needed: remaining / months_remaining.max(1) as f64,
                months_remaining,
            }
        }
        GoalType::MonthlyFunding => {
            let monthly = goal.monthly_funding.unwrap_or(0.0);
            GoalProgress::MonthlyFunding {
                target: monthly,
                budgeted,
                funded: budgeted >= monthly,
            }
        }
        GoalType::Spending => GoalProgress::Spending {
            target: goal.target_amount,
            available,
        },
    }
}

pub fn get_goal(conn: &Connection, category_id: i64) -> Result<Option<Goal>> {
    Ok(conn
        .query_row(
            "SELECT goal_type, target_amount, target_date, monthly_funding FROM goals WHERE category_id = ?1",
            [category_id],
            |row| {
                Ok(Goal {
                    goal_type: row.get(0)?,
                    target_amount: row.get(1)?,
                    target_date: row.get(2)?,
                    monthly_funding: row.get(3)?,
                })
            },
        )
        .optional()?)
}

pub struct NewGoal {
    pub goal_type: GoalType,
    pub target_amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub monthly_funding: Option<f64>,
}

fn validate_goal(new: &NewGoal) -> Result<()> {
    let missing = |what: &str| {
        Err(ZeroedError::Other(format!(
            "A {} goal needs {what}",
            new.goal_type.as_str()
        )))
    };
    match new.goal_type {
        GoalType::TargetBalance | GoalType::TargetByDate if new.target_amount.is_none() => missing("--target"),
        GoalType::TargetByDate if new.target_date.is_none() => missing("--by"),
        GoalType::MonthlyFunding if new.monthly_funding.is_none() => missing("--monthly"),
        _ => Ok(()),
    }
}

/// Attach a goal to a category, replacing any goal it already has.
pub fn set_goal(conn: &Connection, category_name: &str, new: &NewGoal) -> Result<(Category, Goal)> {
    validate_goal(new)?;
    let category = find_category(conn, category_name)?;
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO goals (category_id, goal_type, target_amount, target_date, monthly_funding, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
         ON CONFLICT(category_id) DO UPDATE SET goal_type = excluded.goal_type, \
         target_amount = excluded.target_amount, target_date = excluded.target_date, \
         monthly_funding = excluded.monthly_funding, updated_at = excluded.updated_at",
        rusqlite::params![
            category.id,
            new.goal_type,
            new.target_amount,
            new.target_date.map(iso),
            new.monthly_funding,
            now
        ],
    )?;
    let goal = get_goal(conn, category.id)?
        .ok_or_else(|| ZeroedError::Other(format!("Goal for '{}' was not saved", category.name)))?;
    Ok((category, goal))
}

/// Returns false when the category had no goal.
pub fn clear_goal(conn: &Connection, category_name: &str) -> Result<(Category, bool)> {
    let category = find_category(conn, category_name)?;
    let removed = conn.execute("DELETE FROM goals WHERE category_id = ?1", [category.id])?;
    Ok((category, removed > 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{create_account, NewAccount};
    use crate::db::test_db;
    use crate::models::AccountType;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(conn: &Connection, name: &str, on_budget: bool) -> i64 {
        create_account(
            conn,
            &NewAccount {
                name,
                account_type: AccountType::Checking,
                institution: None,
                starting_balance: 0.0,
                on_budget,
            },
        )
        .unwrap()
        .id
    }

    fn txn(conn: &Connection, account_id: i64, date: &str, amount: f64, category: Option<&str>) {
        let category_id = category.map(|c| find_category(conn, c).unwrap().id);
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO transactions (account_id, category_id, date, amount, transaction_type, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 'outflow', ?5, ?5)",
            rusqlite::params![account_id, category_id, date, amount, now],
        )
        .unwrap();
    }

    #[test]
    fn test_ready_to_assign_first_month() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        txn(&conn, acct, "2025-03-01", 3000.0, None);
        txn(&conn, acct, "2025-03-31", 200.0, None);
        txn(&conn, acct, "2025-04-01", 999.0, None);
        set_category_budget(&conn, "Groceries", ymd(2025, 3, 1), 400.0).unwrap();
        set_category_budget(&conn, "Rent", ymd(2025, 3, 1), 1500.0).unwrap();
        assert_eq!(ready_to_assign(&conn, ymd(2025, 3, 17)).unwrap(), 1300.0);
    }

    #[test]
    fn test_off_budget_income_ignored() {
        let (_dir, conn) = test_db();
        let tracking = account(&conn, "Brokerage", false);
        txn(&conn, tracking, "2025-03-05", 5000.0, None);
        assert_eq!(ready_to_assign(&conn, ymd(2025, 3, 1)).unwrap(), 0.0);
    }

    #[test]
    fn test_carryover_from_previous_months() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        txn(&conn, acct, "2025-01-10", 1000.0, None);
        txn(&conn, acct, "2025-01-20", -300.0, Some("Groceries"));
        set_category_budget(&conn, "Groceries", ymd(2025, 1, 1), 500.0).unwrap();
        // 1000 - 300 - 500
        assert_eq!(carryover(&conn, ymd(2025, 2, 1)).unwrap(), 200.0);
        txn(&conn, acct, "2025-02-01", 800.0, None);
        set_category_budget(&conn, "Groceries", ymd(2025, 2, 1), 100.0).unwrap();
        assert_eq!(ready_to_assign(&conn, ymd(2025, 2, 1)).unwrap(), 900.0);
    }

    #[test]
    fn test_category_available_accumulates() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        let groceries = find_category(&conn, "Groceries").unwrap();
        set_category_budget(&conn, "Groceries", ymd(2025, 1, 1), 400.0).unwrap();
        txn(&conn, acct, "2025-01-15", -350.0, Some("Groceries"));
        set_category_budget(&conn, "Groceries", ymd(2025, 2, 1), 400.0).unwrap();
        txn(&conn, acct, "2025-02-15", -500.0, Some("Groceries"));
        assert_eq!(category_available(&conn, groceries.id, ymd(2025, 1, 1)).unwrap(), 50.0);
        assert_eq!(category_available(&conn, groceries.id, ymd(2025, 2, 1)).unwrap(), -50.0);
        assert_eq!(activity(&conn, groceries.id, ymd(2025, 2, 1)).unwrap(), -500.0);
    }

    #[test]
    fn test_set_budget_replaces_entry() {
        let (_dir, conn) = test_db();
        let cat = set_category_budget(&conn, "Electric", ymd(2025, 5, 9), 80.0).unwrap();
        set_category_budget(&conn, "Electric", ymd(2025, 5, 1), 95.0).unwrap();
        assert_eq!(budgeted_for(&conn, cat.id, ymd(2025, 5, 1)).unwrap(), 95.0);
        let count: i64 = conn.query_row("SELECT count(*) FROM budget_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        assert!(matches!(
            set_category_budget(&conn, "Llama Food", ymd(2025, 5, 1), 1.0),
            Err(ZeroedError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_month_budget_structure() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        txn(&conn, acct, "2025-06-02", 2000.0, None);
        set_category_budget(&conn, "Internet", ymd(2025, 6, 1), 60.0).unwrap();
        txn(&conn, acct, "2025-06-05", -60.0, Some("Internet"));
        let budget = month_budget(&conn, ymd(2025, 6, 1)).unwrap();
        assert_eq!(budget.month, "2025-06-01");
        // 2000 income, 60 budgeted; the spending is not yet carryover.
        assert_eq!(budget.ready_to_assign, 1940.0);
        let bills = &budget.groups[0];
        assert_eq!(bills.name, "Bills");
        assert_eq!(bills.budgeted(), 60.0);
        assert_eq!(bills.activity(), -60.0);
        assert_eq!(bills.available(), 0.0);
        let json = serde_json::to_value(&budget).unwrap();
        assert_eq!(json["groups"][0]["categories"][2]["name"], "Internet");
    }

    #[test]
    fn test_suggest_budgets_averages_lookback() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        txn(&conn, acct, "2025-01-10", -90.0, Some("Gas"));
        txn(&conn, acct, "2025-02-10", -60.0, Some("Gas"));
        txn(&conn, acct, "2025-03-10", -100.0, Some("Groceries"));
        txn(&conn, acct, "2025-03-11", 40.0, Some("Groceries"));
        txn(&conn, acct, "2024-12-31", -999.0, Some("Gas"));
        txn(&conn, acct, "2025-04-02", -999.0, Some("Gas"));
        set_category_budget(&conn, "Gas", ymd(2025, 4, 1), 20.0).unwrap();

        let suggestions = suggest_budgets(&conn, ymd(2025, 4, 1), 3).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].category, "Gas");
        assert_eq!(suggestions[0].suggested, 50.0);
        assert_eq!(suggestions[0].current, 20.0);
        assert_eq!(suggestions[1].category, "Groceries");
        assert_eq!(suggestions[1].suggested, 33.33);

        apply_suggestions(&conn, ymd(2025, 4, 1), &suggestions).unwrap();
        let gas = find_category(&conn, "Gas").unwrap();
        assert_eq!(budgeted_for(&conn, gas.id, ymd(2025, 4, 1)).unwrap(), 50.0);
        assert!(suggest_budgets(&conn, ymd(2025, 4, 1), 0).is_err());
    }

    #[test]
    fn test_summary_counts() {
        let (_dir, conn) = test_db();
        let acct = account(&conn, "Checking", true);
        set_category_budget(&conn, "Gas", ymd(2025, 7, 1), 50.0).unwrap();
        txn(&conn, acct, "2025-07-03", -80.0, Some("Gas"));
        txn(&conn, acct, "2025-07-04", 10.0, Some("Gifts"));
        let summary = summarize(&month_budget(&conn, ymd(2025, 7, 1)).unwrap());
        assert_eq!(summary.total_budgeted, 50.0);
        assert_eq!(summary.total_spent, 80.0);
        assert_eq!(summary.total_available, -20.0);
        assert_eq!(summary.funded, 1);
        assert_eq!(summary.total_categories, 17);
        assert_eq!(summary.overspent, vec![("Gas".to_string(), -30.0)]);
    }

    fn goal(goal_type: GoalType, target: Option<f64>, date: Option<&str>, monthly: Option<f64>) -> Goal {
        Goal {
            goal_type,
            target_amount: target,
            target_date: date.map(str::to_string),
            monthly_funding: monthly,
        }
    }

    #[test]
    fn test_target_balance_progress_clamped() {
        let g = goal(GoalType::TargetBalance, Some(1000.0), None, None);
        assert_eq!(
            goal_progress(&g, ymd(2025, 1, 1), 0.0, 250.0),
            GoalProgress::TargetBalance { target: 1000.0, saved: 250.0, progress: 25.0, remaining: 750.0 }
        );
        match goal_progress(&g, ymd(2025, 1, 1), 0.0, 1500.0) {
            GoalProgress::TargetBalance { progress, remaining, .. } => {
                assert_eq!(progress, 100.0);
                assert_eq!(remaining, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        match goal_progress(&g, ymd(2025, 1, 1), 0.0, -50.0) {
            GoalProgress::TargetBalance { progress, .. } => assert_eq!(progress, 0.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_target_by_date_monthly_needed() {
        let g = goal(GoalType::TargetByDate, Some(1200.0), Some("2025-07-15"), None);
        match goal_progress(&g, ymd(2025, 1, 1), 0.0, 600.0) {
            GoalProgress::TargetByDate { months_remaining, monthly_needed, progress, .. } => {
                assert_eq!(months_remaining, 6);
                assert_eq!(monthly_needed, 100.0);
                assert_eq!(progress, 50.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        let past_due = goal(GoalType::TargetByDate, Some(1200.0), Some("2024-12-01"), None);
        match goal_progress(&past_due, ymd(2025, 1, 1), 0.0, 600.0) {
            GoalProgress::TargetByDate { monthly_needed, .. } => assert_eq!(monthly_needed, 600.0),
            other => panic!("unexpected {other:?}"),
        }
        let undated = goal(GoalType::TargetByDate, Some(1200.0), None, None);
        match goal_progress(&undated, ymd(2025, 1, 1), 0.0, 0.0) {
            GoalProgress::TargetByDate { months_remaining, monthly_needed, .. } => {
                assert_eq!(months_remaining, 12);
                assert_eq!(monthly_needed, 100.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_monthly_funding_goal() {
        let g = goal(GoalType::MonthlyFunding, None, None, Some(100.0));
        assert_eq!(
            goal_progress(&g, ymd(2025, 1, 1), 100.0, 100.0),
            GoalProgress::MonthlyFunding { target: 100.0, budgeted: 100.0, funded: true }
        );
        match goal_progress(&g, ymd(2025, 1, 1), 99.99, 0.0) {
            GoalProgress::MonthlyFunding { funded, .. } => assert!(!funded),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_set_goal_upserts_and_shows_in_budget() {
        let (_dir, conn) = test_db();
        let new = NewGoal {
            goal_type: GoalType::TargetBalance,
            target_amount: Some(5000.0),
            target_date: None,
            monthly_funding: None,
        };
        set_goal(&conn, "Emergency", &new).unwrap();
        let new = NewGoal {
            goal_type: GoalType::MonthlyFunding,
            target_amount: None,
            target_date: None,
            monthly_funding: Some(250.0),
        };
        let (cat, g) = set_goal(&conn, "Emergency", &new).unwrap();
        assert_eq!(g.goal_type, GoalType::MonthlyFunding);
        let count: i64 = conn.query_row("SELECT count(*) FROM goals", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);

        set_category_budget(&conn, "Emergency Fund", ymd(2025, 1, 1), 250.0).unwrap();
        let budget = month_budget(&conn, ymd(2025, 1, 1)).unwrap();
        let row = budget.categories().find(|c| c.id == cat.id).unwrap();
        assert!(matches!(row.goal, Some(GoalProgress::MonthlyFunding { funded: true, .. })));

        let (_, removed) = clear_goal(&conn, "Emergency").unwrap();
        assert!(removed);
        let (_, removed) = clear_goal(&conn, "Emergency").unwrap();
        assert!(!removed);
    }

    #[test]
    fn test_goal_validation() {
        let (_dir, conn) = test_db();
        let new = NewGoal {
            goal_type: GoalType::TargetByDate,
            target_amount: Some(100.0),
            target_date: None,
            monthly_funding: None,
        };
        assert!(set_goal(&conn, "Vacation", &new).is_err());
    }

    #[test]
    fn test_spending_goal_without_target() {
        let (_dir, conn) = test_db();
        let new = NewGoal {
            goal_type: GoalType::Spending,
            target_amount: None,
            target_date: None,
            monthly_funding: None,
        };
        let (_, g) = set_goal(&conn, "Dining Out", &new).unwrap();
        assert_eq!(g.target_amount, None);
        let progress = goal_progress(&g, ymd(2025, 1, 1), 0.0, 40.0);
        assert_eq!(progress, GoalProgress::Spending { target: None, available: 40.0 });
        assert_eq!(progress.describe(), "spending");
    }
}
