use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::budget::{self, NewGoal, MonthBudget};
use crate::cli::{confirm, tinted, today};
use crate::error::Result;
use crate::fmt::{money, signed_money};
use crate::models::GoalType;
use crate::month::{long_label, month_or_current, parse_date, parse_month};

pub fn format_month(budget: &MonthBudget) -> Result<String> {
    let month = parse_date(&budget.month)?;
    let ready = if budget.ready_to_assign >= 0.0 {
        money(budget.ready_to_assign).green().bold().to_string()
    } else {
        format!("{} (overspent)", money(budget.ready_to_assign).red().bold())
    };

    let mut table = Table::new();
    table.set_header(vec!["Category", "Budgeted", "Activity", "Available", "Goal"]);
    for group in &budget.groups {
        table.add_row(vec![
            Cell::new(group.name.bold()),
            Cell::new(money(group.budgeted()).dimmed()),
            Cell::new(money(group.activity()).dimmed()),
            Cell::new(money(group.available()).dimmed()),
            Cell::new(""),
        ]);
        for cat in &group.categories {
            let available = if cat.available > 0.0 {
                money(cat.available).green()
            } else {
                tinted(cat.available)
            };
            let activity = if cat.activity > 0.0 {
                signed_money(cat.activity).green()
            } else {
                tinted(cat.activity)
            };
            let goal = cat.goal.as_ref().map(|g| g.describe()).unwrap_or_default();
            table.add_row(vec![
                Cell::new(format!("  {}", cat.name)),
                Cell::new(money(cat.budgeted)),
                Cell::new(activity),
                Cell::new(available),
                Cell::new(goal),
            ]);
        }
    }
    Ok(format!(
        "Budget for {}\n\nReady to Assign: {ready}\n\n{table}",
        long_label(month)
    ))
}

pub fn show(conn: &Connection, month: Option<&str>, json: bool) -> Result<()> {
    let month = month_or_current(month, today())?;
    let budget = budget::month_budget(conn, month)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&budget)?);
    } else {
        println!("{}", format_month(&budget)?);
    }
    Ok(())
}

pub fn set(conn: &Connection, category: &str, amount: f64, month: Option<&str>) -> Result<()> {
    let month = month_or_current(month, today())?;
    let category = budget::set_category_budget(conn, category, month, amount)?;
    println!(
        "{}",
        format!("Set {} budget to {} for {}", category.name, money(amount), long_label(month)).green()
    );
    let ready = budget::ready_to_assign(conn, month)?;
    println!("Ready to Assign: {}", tinted(ready));
    Ok(())
}

pub fn auto(conn: &Connection, month: Option<&str>, lookback: u32, yes: bool) -> Result<()> {
    let month = month_or_current(month, today())?;
    let suggestions = budget::suggest_budgets(conn, month, lookback)?;
    if suggestions.is_empty() {
        println!("No spending history to base suggestions on");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Suggested", "Current", "Difference"]);
    for s in &suggestions {
        let diff = s.suggested - s.current;
        let diff = if diff > 0.0 {
            signed_money(diff).green()
        } else {
            tinted(diff)
        };
        table.add_row(vec![
            Cell::new(&s.category),
            Cell::new(money(s.suggested)),
            Cell::new(money(s.current)),
            Cell::new(diff),
        ]);
    }
    println!("Budget Suggestions ({lookback}-month average)\n{table}");

    if !confirm("Apply these suggestions?", yes)? {
        println!("No changes made");
        return Ok(());
    }
    budget::apply_suggestions(conn, month, &suggestions)?;
    println!("{}", "Budget updated!".green());
    Ok(())
}

pub fn summary(conn: &Connection, month: Option<&str>) -> Result<()> {
    let month = month_or_current(month, today())?;
    let s = budget::summarize(&budget::month_budget(conn, month)?);
    println!("{}\n", format!("Budget Summary - {}", long_label(month)).bold());
    println!("Ready to Assign:  {:>14}", money(s.ready_to_assign));
    println!("Total Budgeted:   {:>14}", money(s.total_budgeted));
    println!("Total Spent:      {:>14}", money(s.total_spent));
    println!("Total Available:  {:>14}", money(s.total_available));
    println!("\nCategories Funded: {}/{}", s.funded, s.total_categories);
    if !s.overspent.is_empty() {
        println!("\n{}", "Overspent Categories:".red());
        for (name, amount) in &s.overspent {
            println!("  {name}: {}", money(*amount).red());
        }
    }
    Ok(())
}

pub fn goal(
    conn: &Connection,
    category: &str,
    goal_type: GoalType,
    target: Option<f64>,
    by: Option<&str>,
    monthly: Option<f64>,
) -> Result<()> {
    let target_date = match by {
        Some(raw) => Some(match parse_date(raw) {
            Ok(d) => d,
            // `--by 2026-06` means the start of that month.
            Err(_) => parse_month(raw)?,
        }),
        None => None,
    };
    let new = NewGoal {
        goal_type,
        target_amount: target,
        target_date,
        monthly_funding: monthly,
    };
    let (category, _) = budget::set_goal(conn, category, &new)?;
    println!("{}", format!("Set {} goal on {}", goal_type.as_str(), category.name).green());
    Ok(())
}

pub fn clear_goal(conn: &Connection, category: &str) -> Result<()> {
    let (category, removed) = budget::clear_goal(conn, category)?;
    if removed {
        println!("Removed goal from {}", category.name);
    } else {
        println!("{} has no goal", category.name);
    }
    Ok(())
}
