use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::categories::{self, GroupWithCategories};
use crate::error::Result;

pub fn format_tree(groups: &[GroupWithCategories]) -> String {
    let mut out = String::from("Budget Categories\n");
    for (gi, entry) in groups.iter().enumerate() {
        let last_group = gi + 1 == groups.len();
        out.push_str(if last_group { "└── " } else { "├── " });
        out.push_str(&format!("{}\n", entry.group.name.cyan().bold()));
        for (ci, cat) in entry.categories.iter().enumerate() {
            let stem = if last_group { "    " } else { "│   " };
            let branch = if ci + 1 == entry.categories.len() { "└── " } else { "├── " };
            out.push_str(&format!("{stem}{branch}{}\n", cat.name));
        }
    }
    out
}

pub fn list(conn: &Connection, tree: bool) -> Result<()> {
    let groups = categories::list_visible(conn)?;
    if groups.is_empty() {
        println!("No categories found");
        return Ok(());
    }
    if tree {
        print!("{}", format_tree(&groups));
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Group", "Category", "ID"]);
    for entry in &groups {
        for (i, cat) in entry.categories.iter().enumerate() {
            let group = if i == 0 { entry.group.name.bold().to_string() } else { String::new() };
            table.add_row(vec![Cell::new(group), Cell::new(&cat.name), Cell::new(cat.id)]);
        }
    }
    println!("Budget Categories\n{table}");
    Ok(())
}

pub fn create_group(conn: &Connection, name: &str) -> Result<()> {
    let group = categories::create_group(conn, name)?;
    println!("{}", format!("Created category group '{}'", group.name).green());
    Ok(())
}

pub fn create(conn: &Connection, name: &str, group: &str) -> Result<()> {
    let (group, category) = categories::create_category(conn, name, group)?;
    println!("{}", format!("Created category '{}' in {}", category.name, group.name).green());
    Ok(())
}

pub fn rename(conn: &Connection, name: &str, new_name: &str) -> Result<()> {
    let (old, category) = categories::rename_category(conn, name, new_name)?;
    println!("{}", format!("Renamed '{old}' to '{}'", category.name).green());
    Ok(())
}

pub fn hide(conn: &Connection, name: &str) -> Result<()> {
    let (category, changed) = categories::hide_category(conn, name)?;
    if changed {
        println!("Hidden category '{}'", category.name);
    } else {
        println!("'{}' is already hidden", category.name);
    }
    Ok(())
}

pub fn unhide(conn: &Connection, name: &str) -> Result<()> {
    let category = categories::unhide_category(conn, name)?;
    println!("{}", format!("Unhidden category '{}'", category.name).green());
    Ok(())
}
