use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::categories::get_category;
use crate::categorizer::{self, Categorizer, MatchSource};
use crate::error::Result;
use crate::models::MatchType;

pub fn list(conn: &Connection) -> Result<()> {
    let rules = categorizer::list_rules(conn)?;
    if rules.is_empty() {
        println!("No rules yet. Create one with 'zeroed rules create'");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Type", "Category", "Priority", "Hits"]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(rule.pattern),
            Cell::new(rule.match_type),
            Cell::new(rule.category.unwrap_or_else(|| "-".to_string())),
            Cell::new(rule.priority),
            Cell::new(rule.hit_count),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn create(conn: &Connection, pattern: &str, category: &str, match_type: MatchType, priority: i64) -> Result<()> {
    let rule = categorizer::create_rule(conn, pattern, category, match_type, priority)?;
    println!(
        "{}",
        format!("Created rule #{}: '{pattern}' ({match_type}) \u{2192} {}", rule.id, rule.category.name).green()
    );
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let pattern = categorizer::delete_rule(conn, id)?;
    println!("{}", format!("Deleted rule '{pattern}'").green());
    Ok(())
}

pub fn test(conn: &Connection, payee: &str) -> Result<()> {
    let engine = Categorizer::load(conn)?;
    match engine.categorize(conn, payee)? {
        Some(m) => {
            let category = get_category(conn, m.category_id)?;
            let via = match m.source {
                MatchSource::Payee(_) => "known payee".to_string(),
                MatchSource::Rule(id) => format!("rule #{id}"),
            };
            println!("{}", "Match found!".green());
            println!("  '{payee}' \u{2192} {} (via {via})", category.name);
        }
        None => {
            println!("{}", format!("No match for '{payee}'").yellow());
            let suggestions = categorizer::suggest_categories(conn, payee, 5)?;
            if !suggestions.is_empty() {
                println!("\nSuggested categories based on similar payees:");
                for cat in suggestions {
                    println!("  - {}", cat.name);
                }
            }
        }
    }
    Ok(())
}

pub fn payees(conn: &Connection) -> Result<()> {
    let payees = categorizer::list_payees(conn)?;
    if payees.is_empty() {
        println!("No payees with a default category yet");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Payee", "Default Category", "Auto"]);
    for p in payees {
        table.add_row(vec![
            Cell::new(p.name),
            Cell::new(p.category),
            Cell::new(if p.auto_categorize { "Yes" } else { "No" }),
        ]);
    }
    println!("Payees\n{table}");
    Ok(())
}

pub fn set_payee(conn: &Connection, payee: &str, category: &str) -> Result<()> {
    let (payee, category, created) = categorizer::set_payee(conn, payee, category)?;
    let verb = if created { "Created payee" } else { "Updated payee" };
    println!("{}", format!("{verb} '{}' \u{2192} {}", payee.name, category.name).green());
    Ok(())
}
