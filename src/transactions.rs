use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use crate::accounts::{adjust_balance, find_account};
use crate::categories::find_category;
use crate::categorizer::{find_or_create_payee, learn};
use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Category, Transaction, TransactionType};
use crate::month::{iso, next_month, parse_month};

#[derive(Debug, Default)]
pub struct TransactionFilter<'a> {
    pub account: Option<&'a str>,
    pub category: Option<&'a str>,
    /// `YYYY-MM`
    pub month: Option<&'a str>,
    pub uncategorized: bool,
    pub limit: usize,
}

pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub account_name: String,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub amount: f64,
    pub is_cleared: bool,
}

/// Newest first, filtered the way `transactions list` asks.
pub fn list_transactions(conn: &Connection, filter: &TransactionFilter<'_>) -> Result<Vec<TransactionRow>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(name) = filter.account {
        let account = find_account(conn, name)?;
        params.push(Box::new(account.id));
        clauses.push(format!("t.account_id = ?{}", params.len()));
    }
    if let Some(name) = filter.category {
        let category = find_category(conn, name)?;
        params.push(Box::new(category.id));
        clauses.push(format!("t.category_id = ?{}", params.len()));
    }
    if let Some(m) = filter.month {
        let start = parse_month(m)?;
        params.push(Box::new(iso(start)));
        clauses.push(format!("t.date >= ?{}", params.len()));
        params.push(Box::new(iso(next_month(start))));
        clauses.push(format!("t.date < ?{}", params.len()));
    }
    if filter.uncategorized {
        clauses.push("t.category_id IS NULL".to_string());
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    params.push(Box::new(filter.limit as i64));

    let sql = format!(
        "SELECT t.id, t.date, a.name, COALESCE(p.name, t.raw_payee_name), c.name, t.amount, t.is_cleared \
         FROM transactions t \
         JOIN accounts a ON t.account_id = a.id \
         LEFT JOIN payees p ON t.payee_id = p.id \
         LEFT JOIN categories c ON t.category_id = c.id \
         {where_clause} ORDER BY t.date DESC, t.id DESC LIMIT ?{}",
        params.len()
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                date: row.get(1)?,
                account_name: row.get(2)?,
                payee: row.get(3)?,
                category: row.get(4)?,
                amount: row.get(5)?,
                is_cleared: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        "SELECT id, account_id, category_id, payee_id, date, amount, transaction_type, memo, \
         is_cleared, import_id, import_source, raw_payee_name FROM transactions WHERE id = ?1",
        [id],
        |row| {
            Ok(Transaction {
                id: row.get(0)?,
                account_id: row.get(1)?,
                category_id: row.get(2)?,
                payee_id: row.get(3)?,
                date: row.get(4)?,
                amount: row.get(5)?,
                transaction_type: row.get(6)?,
                memo: row.get(7)?,
                is_cleared: row.get(8)?,
                import_id: row.get(9)?,
                import_source: row.get(10)?,
                raw_payee_name: row.get(11)?,
            })
        },
    )
    .optional()?
    .ok_or(ZeroedError::UnknownTransaction(id))
}

/// Insert a fully-specified transaction row. Does not touch account balances.
pub fn insert_transaction(conn: &Connection, txn: &Transaction) -> Result<i64> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO transactions (account_id, category_id, payee_id, date, amount, transaction_type, memo, \
         is_cleared, import_id, import_source, raw_payee_name, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        rusqlite::params![
            txn.account_id,
            txn.category_id,
            txn.payee_id,
            txn.date,
            txn.amount,
            txn.transaction_type,
            txn.memo,
            txn.is_cleared,
            txn.import_id,
            txn.import_source,
            txn.raw_payee_name,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct ManualTransaction<'a> {
    pub account: &'a str,
    pub amount: f64,
    pub payee: &'a str,
    pub category: Option<&'a str>,
    pub date: NaiveDate,
    pub memo: Option<&'a str>,
}

pub struct AddedTransaction {
    pub id: i64,
    pub account_name: String,
    pub category: Option<Category>,
    /// Set when a category was asked for but not found.
    pub missing_category: Option<String>,
}

pub fn add_transaction(conn: &Connection, new: &ManualTransaction<'_>) -> Result<AddedTransaction> {
    if new.payee.trim().is_empty() {
        return Err(ZeroedError::Other("Payee is required".into()));
    }
    let account = find_account(conn, new.account)?;

    let (category, missing_category) = match new.category {
        Some(name) => match find_category(conn, name) {
            Ok(cat) => (Some(cat), None),
            Err(ZeroedError::UnknownCategory(_)) => {
                warn!(category = name, "category not found, leaving transaction uncategorized");
                (None, Some(name.to_string()))
            }
            Err(e) => return Err(e),
        },
        None => (None, None),
    };

    let tx = conn.unchecked_transaction()?;
    let payee = find_or_create_payee(&tx, new.payee)?;
    let id = insert_transaction(
        &tx,
        &Transaction {
            id: 0,
            account_id: account.id,
            category_id: category.as_ref().map(|c| c.id),
            payee_id: Some(payee.id),
            date: iso(new.date),
            amount: new.amount,
            transaction_type: TransactionType::for_amount(new.amount),
            memo: new.memo.map(str::to_string),
            is_cleared: false,
            import_id: None,
            import_source: None,
            raw_payee_name: Some(new.payee.to_string()),
        },
    )?;
    adjust_balance(&tx, account.id, new.amount, false)?;
    tx.commit()?;
    info!(id, account = %account.name, amount = new.amount, "added transaction");

    Ok(AddedTransaction {
        id,
        account_name: account.name,
        category,
        missing_category,
    })
}

/// Assign a category. With `learn_payee`, the transaction's payee name is
/// remembered so later imports pick the same category.
pub fn categorize_transaction(conn: &Connection, id: i64, category_name: &str, learn_payee: bool) -> Result<Category> {
    let txn = get_transaction(conn, id)?;
    let category = find_category(conn, category_name)?;
    conn.execute(
        "UPDATE transactions SET category_id = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![category.id, now_timestamp(), id],
    )?;
    if learn_payee {
        if let Some(payee) = txn.raw_payee_name.as_deref().filter(|p| !p.trim().is_empty()) {
            learn(conn, payee, category.id)?;
        }
    }
    Ok(category)
}

/// Mark cleared and move the amount into the account's cleared balance.
/// Returns false when the transaction was already cleared.
pub fn clear_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let txn = get_transaction(conn, id)?;
    if txn.is_cleared {
        return Ok(false);
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE transactions SET is_cleared = 1, updated_at = ?1 WHERE id = ?2",
        rusqlite::params![now_timestamp(), id],
    )?;
    adjust_balance(&tx, txn.account_id, txn.amount, true)?;
    tx.commit()?;
    Ok(true)
}

pub fn uncategorized_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM transactions WHERE category_id IS NULL",
        [],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{create_account, get_account, NewAccount};
    use crate::categorizer::Categorizer;
    use crate::db::test_db;
    use crate::models::AccountType;

    fn setup(conn: &Connection) -> i64 {
        create_account(
            conn,
            &NewAccount {
                name: "Checking",
                account_type: AccountType::Checking,
                institution: None,
                starting_balance: 100.0,
                on_budget: true,
            },
        )
        .unwrap()
        .id
    }

    fn manual<'a>(amount: f64, payee: &'a str, category: Option<&'a str>, date: &str) -> ManualTransaction<'a> {
        ManualTransaction {
            account: "checking",
            amount,
            payee,
            category,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            memo: None,
        }
    }

    #[test]
    fn test_add_updates_balance_and_payee() {
        let (_dir, conn) = test_db();
        let account_id = setup(&conn);
        let added = add_transaction(&conn, &manual(-25.5, "Kroger", Some("groceries"), "2025-02-03")).unwrap();
        assert_eq!(added.category.unwrap().name, "Groceries");
        let txn = get_transaction(&conn, added.id).unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Outflow);
        assert!(txn.payee_id.is_some());
        assert_eq!(get_account(&conn, account_id).unwrap().current_balance, 74.5);
    }

    #[test]
    fn test_add_with_unknown_category_stays_uncategorized() {
        let (_dir, conn) = test_db();
        setup(&conn);
        let added = add_transaction(&conn, &manual(-5.0, "Vending", Some("Snacks!!"), "2025-02-03")).unwrap();
        assert!(added.category.is_none());
        assert_eq!(added.missing_category.as_deref(), Some("Snacks!!"));
        assert_eq!(uncategorized_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_filters() {
        let (_dir, conn) = test_db();
        setup(&conn);
        add_transaction(&conn, &manual(-10.0, "A", Some("Gas"), "2025-01-31")).unwrap();
        add_transaction(&conn, &manual(-20.0, "B", None, "2025-02-01")).unwrap();
        add_transaction(&conn, &manual(500.0, "Employer", None, "2025-02-15")).unwrap();

        let all = list_transactions(&conn, &TransactionFilter { limit: 50, ..Default::default() }).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].payee.as_deref(), Some("Employer"));

        let feb = list_transactions(
            &conn,
            &TransactionFilter { month: Some("2025-02"), limit: 50, ..Default::default() },
        )
        .unwrap();
        assert_eq!(feb.len(), 2);

        let uncategorized = list_transactions(
            &conn,
            &TransactionFilter { uncategorized: true, limit: 1, ..Default::default() },
        )
        .unwrap();
        assert_eq!(uncategorized.len(), 1);

        let gas = list_transactions(
            &conn,
            &TransactionFilter { category: Some("gas"), limit: 50, ..Default::default() },
        )
        .unwrap();
        assert_eq!(gas.len(), 1);
        assert!(list_transactions(
            &conn,
            &TransactionFilter { account: Some("savings"), limit: 50, ..Default::default() },
        )
        .is_err());
    }

    #[test]
    fn test_categorize_and_learn() {
        let (_dir, conn) = test_db();
        setup(&conn);
        let added = add_transaction(&conn, &manual(-12.0, "Local Diner", None, "2025-02-03")).unwrap();
        let cat = categorize_transaction(&conn, added.id, "dining", true).unwrap();
        assert_eq!(cat.name, "Dining Out");
        let engine = Categorizer::load(&conn).unwrap();
        let found = engine.categorize(&conn, "LOCAL DINER").unwrap().unwrap();
        assert_eq!(found.category_id, cat.id);
        assert!(matches!(
            categorize_transaction(&conn, 999, "Gas", false),
            Err(ZeroedError::UnknownTransaction(999))
        ));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_dir, conn) = test_db();
        let account_id = setup(&conn);
        let added = add_transaction(&conn, &manual(-30.0, "Shell", None, "2025-02-03")).unwrap();
        assert!(clear_transaction(&conn, added.id).unwrap());
        assert!(!clear_transaction(&conn, added.id).unwrap());
        assert_eq!(get_account(&conn, account_id).unwrap().cleared_balance, 70.0);
    }
}
