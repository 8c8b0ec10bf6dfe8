use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL,
    institution TEXT,
    account_number_last4 TEXT,
    current_balance REAL NOT NULL DEFAULT 0,
    cleared_balance REAL NOT NULL DEFAULT 0,
    is_on_budget INTEGER NOT NULL DEFAULT 1,
    is_closed INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS category_groups (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_hidden INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    group_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_hidden INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (group_id, name),
    FOREIGN KEY (group_id) REFERENCES category_groups(id)
);

CREATE TABLE IF NOT EXISTS payees (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    default_category_id INTEGER,
    auto_categorize INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    FOREIGN KEY (default_category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS payee_match_rules (
    id INTEGER PRIMARY KEY,
    payee_id INTEGER NOT NULL,
    pattern TEXT NOT NULL,
    match_type TEXT NOT NULL DEFAULT 'contains',
    priority INTEGER NOT NULL DEFAULT 0,
    hit_count INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (payee_id) REFERENCES payees(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS ix_payee_match_rules_priority ON payee_match_rules(priority);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    category_id INTEGER,
    payee_id INTEGER,
    transfer_account_id INTEGER,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    transaction_type TEXT NOT NULL,
    memo TEXT,
    is_cleared INTEGER NOT NULL DEFAULT 0,
    is_reconciled INTEGER NOT NULL DEFAULT 0,
    import_id TEXT UNIQUE,
    import_source TEXT,
    raw_payee_name TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (payee_id) REFERENCES payees(id),
    FOREIGN KEY (transfer_account_id) REFERENCES accounts(id)
);
CREATE INDEX IF NOT EXISTS ix_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS ix_transactions_date_account ON transactions(date, account_id);
CREATE INDEX IF NOT EXISTS ix_transactions_category ON transactions(category_id);

CREATE TABLE IF NOT EXISTS budget_entries (
    id INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL,
    month TEXT NOT NULL,
    budgeted REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (category_id, month),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);
CREATE INDEX IF NOT EXISTS ix_budget_entries_month ON budget_entries(month);

CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL UNIQUE,
    goal_type TEXT NOT NULL,
    target_amount REAL,
    target_date TEXT,
    monthly_funding REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS import_profiles (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    institution TEXT,
    date_column TEXT NOT NULL,
    date_format TEXT NOT NULL DEFAULT '%m/%d/%Y',
    amount_column TEXT,
    amount_inflow_column TEXT,
    amount_outflow_column TEXT,
    payee_column TEXT NOT NULL,
    memo_column TEXT,
    skip_header_rows INTEGER NOT NULL DEFAULT 1,
    amount_multiplier REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL
);
";

// (group, categories) in display order
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Bills", &["Rent/Mortgage", "Electric", "Internet", "Phone", "Insurance"]),
    ("Everyday", &["Groceries", "Dining Out", "Transportation", "Gas"]),
    ("Fun", &["Entertainment", "Hobbies", "Subscriptions"]),
    ("Savings Goals", &["Emergency Fund", "Vacation", "Big Purchases"]),
    ("Giving", &["Charity", "Gifts"]),
];

/// UTC timestamp without fractional seconds. The dashboard parses this exact
/// form, so every `created_at` / `updated_at` goes through here.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(path = %db_path.display(), "opening database");
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Seed the default groups and categories. Does nothing once any group exists.
pub fn create_default_categories(conn: &Connection) -> Result<()> {
    let count: i64 = conn.query_row("SELECT count(*) FROM category_groups", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }
    let now = now_timestamp();
    let tx = conn.unchecked_transaction()?;
    for (group_order, (group, categories)) in DEFAULT_CATEGORIES.iter().enumerate() {
        tx.execute(
            "INSERT INTO category_groups (name, sort_order, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![group, group_order as i64, now],
        )?;
        let group_id = tx.last_insert_rowid();
        for (cat_order, name) in categories.iter().enumerate() {
            tx.execute(
                "INSERT INTO categories (group_id, name, sort_order, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![group_id, name, cat_order as i64, now],
            )?;
        }
    }
    tx.commit()?;
    debug!("seeded default categories");
    Ok(())
}

/// Open a database, creating the schema and default categories if needed.
pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = get_connection(db_path)?;
    init_db(&conn)?;
    create_default_categories(&conn)?;
    Ok(conn)
}

/// Delete the database file (and its WAL sidecars) and recreate it empty.
pub fn reset_database(db_path: &Path) -> Result<Connection> {
    for suffix in ["", "-wal", "-shm"] {
        let mut path = db_path.as_os_str().to_owned();
        path.push(suffix);
        let path = std::path::PathBuf::from(path);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
    }
    open(db_path)
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = open(&dir.path().join("test.db")).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "accounts",
            "category_groups",
            "categories",
            "payees",
            "payee_match_rules",
            "transactions",
            "budget_entries",
            "goals",
            "import_profiles",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let (dir, _conn) = test_db();
        let conn = open(&dir.path().join("test.db")).unwrap();
        let groups: i64 = conn.query_row("SELECT count(*) FROM category_groups", [], |r| r.get(0)).unwrap();
        assert_eq!(groups, 5);
    }

    #[test]
    fn test_default_categories_in_order() {
        let (_dir, conn) = test_db();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 17);
        let first: String = conn
            .query_row(
                "SELECT c.name FROM categories c JOIN category_groups g ON c.group_id = g.id \
                 ORDER BY g.sort_order, c.sort_order LIMIT 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(first, "Rent/Mortgage");
    }

    #[test]
    fn test_budget_entry_unique_per_month() {
        let (_dir, conn) = test_db();
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO budget_entries (category_id, month, budgeted, created_at, updated_at) VALUES (1, '2025-01-01', 10, ?1, ?1)",
            [&now],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO budget_entries (category_id, month, budgeted, created_at, updated_at) VALUES (1, '2025-01-01', 20, ?1, ?1)",
            [&now],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_timestamp_has_no_fraction() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(!ts.contains('.'));
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn test_reset_database_clears_data() {
        let (dir, conn) = test_db();
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO accounts (name, account_type, created_at, updated_at) VALUES ('A', 'cash', ?1, ?1)",
            [&now],
        )
        .unwrap();
        drop(conn);
        let conn = reset_database(&dir.path().join("test.db")).unwrap();
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0)).unwrap();
        assert_eq!(accounts, 0);
    }
}
