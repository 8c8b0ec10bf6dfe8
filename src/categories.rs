use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Category, CategoryGroup};

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        is_hidden: row.get(2)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryGroup> {
    Ok(CategoryGroup {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

pub struct GroupWithCategories {
    pub group: CategoryGroup,
    pub categories: Vec<Category>,
}

/// Visible groups in display order, each with its visible categories.
pub fn list_visible(conn: &Connection) -> Result<Vec<GroupWithCategories>> {
    let mut gstmt = conn.prepare(
        "SELECT id, name FROM category_groups \
         WHERE is_hidden = 0 ORDER BY sort_order, id",
    )?;
    let groups = gstmt
        .query_map([], group_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut cstmt = conn.prepare(
        "SELECT id, name, is_hidden FROM categories \
         WHERE group_id = ?1 AND is_hidden = 0 ORDER BY sort_order, id",
    )?;
    let mut result = Vec::with_capacity(groups.len());
    for group in groups {
        let categories = cstmt
            .query_map([group.id], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        result.push(GroupWithCategories { group, categories });
    }
    Ok(result)
}

pub fn create_group(conn: &Connection, name: &str) -> Result<CategoryGroup> {
    if name.trim().is_empty() {
        return Err(ZeroedError::Other("Group name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM category_groups WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(ZeroedError::Duplicate(format!("Category group '{name}'")));
    }
    let sort_order: i64 = conn.query_row("SELECT count(*) FROM category_groups", [], |row| row.get(0))?;
    conn.execute(
        "INSERT INTO category_groups (name, sort_order, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, sort_order, now_timestamp()],
    )?;
    info!(name, "created category group");
    Ok(CategoryGroup {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn find_group(conn: &Connection, name: &str) -> Result<CategoryGroup> {
    conn.query_row(
        "SELECT id, name FROM category_groups WHERE lower(name) = lower(?1)",
        [name],
        group_from_row,
    )
    .optional()?
    .ok_or_else(|| ZeroedError::UnknownGroup(name.to_string()))
}

pub fn create_category(conn: &Connection, name: &str, group_name: &str) -> Result<(CategoryGroup, Category)> {
    if name.trim().is_empty() {
        return Err(ZeroedError::Other("Category name is required".into()));
    }
    let group = find_group(conn, group_name)?;
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE group_id = ?1 AND name = ?2)",
        rusqlite::params![group.id, name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(ZeroedError::Duplicate(format!("Category '{name}' in {}", group.name)));
    }
    let sort_order: i64 = conn.query_row(
        "SELECT count(*) FROM categories WHERE group_id = ?1",
        [group.id],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO categories (group_id, name, sort_order, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![group.id, name, sort_order, now_timestamp()],
    )?;
    info!(name, group = %group.name, "created category");
    let category = Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        is_hidden: false,
    };
    Ok((group, category))
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, is_hidden FROM categories WHERE id = ?1",
        [id],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| ZeroedError::UnknownCategory(id.to_string()))
}

fn find_where(conn: &Connection, name: &str, hidden_only: bool) -> Result<Option<Category>> {
    let hidden = if hidden_only { " AND is_hidden = 1" } else { "" };
    let exact = conn
        .query_row(
            &format!(
                "SELECT id, name, is_hidden FROM categories \
                 WHERE lower(name) = lower(?1){hidden} ORDER BY id LIMIT 1"
            ),
            [name],
            category_from_row,
        )
        .optional()?;
    if exact.is_some() {
        return Ok(exact);
    }
    Ok(conn
        .query_row(
            &format!(
                "SELECT id, name, is_hidden FROM categories \
                 WHERE instr(lower(name), lower(?1)) > 0{hidden} ORDER BY id LIMIT 1"
            ),
            [name],
            category_from_row,
        )
        .optional()?)
}

/// Case-insensitive lookup: an exact name wins, otherwise the first category
/// whose name contains `name`.
pub fn find_category(conn: &Connection, name: &str) -> Result<Category> {
    find_where(conn, name, false)?.ok_or_else(|| ZeroedError::UnknownCategory(name.to_string()))
}

pub fn rename_category(conn: &Connection, name: &str, new_name: &str) -> Result<(String, Category)> {
    if new_name.trim().is_empty() {
        return Err(ZeroedError::Other("New name is required".into()));
    }
    let mut category = find_category(conn, name)?;
    let old_name = std::mem::replace(&mut category.name, new_name.to_string());
    conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2",
        rusqlite::params![new_name, category.id],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
            ZeroedError::Duplicate(format!("Category '{new_name}'"))
        }
        other => other.into(),
    })?;
    Ok((old_name, category))
}

/// Returns false when the category was already hidden.
pub fn hide_category(conn: &Connection, name: &str) -> Result<(Category, bool)> {
    let category = find_category(conn, name)?;
    if category.is_hidden {
        return Ok((category, false));
    }
    conn.execute("UPDATE categories SET is_hidden = 1 WHERE id = ?1", [category.id])?;
    Ok((Category { is_hidden: true, ..category }, true))
}

/// Only hidden categories are candidates, so a visible category with a
/// similar name cannot shadow the one being restored.
pub fn unhide_category(conn: &Connection, name: &str) -> Result<Category> {
    let category = find_where(conn, name, true)?
        .ok_or_else(|| ZeroedError::UnknownCategory(format!("{name} (hidden)")))?;
    conn.execute("UPDATE categories SET is_hidden = 0 WHERE id = ?1", [category.id])?;
    Ok(Category { is_hidden: false, ..category })
}
