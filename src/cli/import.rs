use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::cli::tinted;
use crate::error::Result;
use crate::fmt::clip;
use crate::importer::{self, ImportResult};
use crate::models::ImportProfile;

const PREVIEW_ROWS: usize = 10;

pub fn format_preview(result: &ImportResult) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Payee", "Amount", "Memo"]);
    for row in result.rows.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            Cell::new(&row.date),
            Cell::new(clip(&row.payee, 30)),
            Cell::new(tinted(row.amount)),
            Cell::new(clip(row.memo.as_deref().unwrap_or(""), 30)),
        ]);
    }
    let mut out = format!("Import Preview (first {PREVIEW_ROWS})\n{table}");
    if result.rows.len() > PREVIEW_ROWS {
        out.push_str(&format!("\n... and {} more", result.rows.len() - PREVIEW_ROWS));
    }
    out
}

pub fn csv(conn: &Connection, file: &Path, account: &str, format: Option<&str>, dry_run: bool) -> Result<()> {
    let result = importer::import_file(conn, file, account, format, dry_run)?;

    if format.is_none() {
        if result.detected {
            println!("Auto-detected format: {}", result.format);
        } else {
            println!("{}", "Could not auto-detect format, using 'generic'".yellow());
        }
    }
    println!("Parsed {} transactions for {}", result.rows.len(), result.account.name);
    if result.rows.is_empty() {
        println!("{}", "No transactions found in file".yellow());
        return Ok(());
    }
    println!("{}", format_preview(&result));

    if result.dry_run {
        println!("\nWould import {} transactions", result.imported);
        if result.skipped > 0 {
            println!("{} duplicates would be skipped", result.skipped);
        }
        println!("\n{}", "Dry run - no changes made".yellow());
        return Ok(());
    }

    println!("\n{}", format!("Imported {} transactions", result.imported).green().bold());
    if result.skipped > 0 {
        println!("{}", format!("Skipped {} duplicates", result.skipped).yellow());
    }
    if result.categorized > 0 {
        println!("{}", format!("Auto-categorized {} transactions", result.categorized).blue());
    }
    if result.uncategorized() > 0 {
        println!(
            "{} transactions need categorization. Run 'zeroed transactions list --uncategorized'",
            result.uncategorized()
        );
    }
    Ok(())
}

pub fn profiles(conn: &Connection) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Institution", "Description"]);
    for kind in importer::list_formats(conn)? {
        table.add_row(vec![
            Cell::new(kind.key()),
            Cell::new(kind.institution()),
            Cell::new(kind.description()),
        ]);
    }
    println!("Import Profiles\n{table}");
    println!("Use --format <name> to specify a format when importing");
    Ok(())
}

pub fn profile_add(conn: &Connection, profile: &ImportProfile) -> Result<()> {
    let saved = importer::add_profile(conn, profile)?;
    println!("{}", format!("Saved import profile '{}'", saved.name).green());
    Ok(())
}

pub fn profile_delete(conn: &Connection, name: &str) -> Result<()> {
    if importer::delete_profile(conn, name)? {
        println!("Deleted import profile '{name}'");
    } else {
        println!("{}", format!("No import profile named '{name}'").yellow());
    }
    Ok(())
}
