use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Account, AccountType};

const ACCOUNT_COLUMNS: &str =
    "id, name, account_type, institution, current_balance, cleared_balance, is_on_budget, is_closed";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: row.get(2)?,
        institution: row.get(3)?,
        current_balance: row.get(4)?,
        cleared_balance: row.get(5)?,
        is_on_budget: row.get(6)?,
        is_closed: row.get(7)?,
    })
}

pub struct NewAccount<'a> {
    pub name: &'a str,
    pub account_type: AccountType,
    pub institution: Option<&'a str>,
    pub starting_balance: f64,
    pub on_budget: bool,
}

pub fn create_account(conn: &Connection, new: &NewAccount<'_>) -> Result<Account> {
    if new.name.trim().is_empty() {
        return Err(ZeroedError::Other("Account name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1)",
        [new.name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(ZeroedError::Duplicate(format!("Account '{}'", new.name)));
    }
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO accounts (name, account_type, institution, current_balance, cleared_balance, \
         is_on_budget, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?6)",
        rusqlite::params![
            new.name,
            new.account_type,
            new.institution,
            new.starting_balance,
            new.on_budget,
            now
        ],
    )?;
    info!(name = new.name, account_type = %new.account_type, "created account");
    get_account(conn, conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        [id],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| ZeroedError::UnknownAccount(id.to_string()))
}

pub fn list_accounts(conn: &Connection, include_closed: bool) -> Result<Vec<Account>> {
    let filter = if include_closed { "" } else { "WHERE is_closed = 0" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts {filter} ORDER BY id"
    ))?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

/// Case-insensitive lookup: an exact name wins, otherwise the first account
/// whose name contains `name`.
pub fn find_account(conn: &Connection, name: &str) -> Result<Account> {
    let exact = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(name) = lower(?1)"),
            [name],
            account_from_row,
        )
        .optional()?;
    if let Some(account) = exact {
        return Ok(account);
    }
    conn.query_row(
        &format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE instr(lower(name), lower(?1)) > 0 ORDER BY id LIMIT 1"
        ),
        [name],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| ZeroedError::UnknownAccount(name.to_string()))
}

pub fn transaction_count(conn: &Connection, account_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM transactions WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )?)
}

pub fn close_account(conn: &Connection, account_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET is_closed = 1, updated_at = ?1 WHERE id = ?2",
        rusqlite::params![now_timestamp(), account_id],
    )?;
    info!(account_id, "closed account");
    Ok(())
}

/// Add `amount` to an account's running balance (and the cleared balance when
/// `cleared`).
pub fn adjust_balance(conn: &Connection, account_id: i64, amount: f64, cleared: bool) -> Result<()> {
    let sql = if cleared {
        "UPDATE accounts SET cleared_balance = cleared_balance + ?1, updated_at = ?2 WHERE id = ?3"
    } else {
        "UPDATE accounts SET current_balance = current_balance + ?1, updated_at = ?2 WHERE id = ?3"
    };
    conn.execute(sql, rusqlite::params![amount, now_timestamp(), account_id])?;
    Ok(())
}

/// Recalculate both balances from the account's transactions.
pub fn update_balance(conn: &Connection, account_id: i64) -> Result<Account> {
    let (current, cleared): (f64, f64) = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0), \
         COALESCE(SUM(CASE WHEN is_cleared = 1 THEN amount ELSE 0 END), 0) \
         FROM transactions WHERE account_id = ?1",
        [account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    conn.execute(
        "UPDATE accounts SET current_balance = ?1, cleared_balance = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![current, cleared, now_timestamp(), account_id],
    )?;
    get_account(conn, account_id)
}

pub struct TypeGroup {
    pub account_type: AccountType,
    pub accounts: Vec<Account>,
}

pub struct BalanceSheet {
    pub groups: Vec<TypeGroup>,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
}

/// Balances grouped by account type, in first-seen order. Credit cards owe
/// money when negative; every other type counts toward assets.
pub fn balance_sheet(conn: &Connection, include_closed: bool) -> Result<BalanceSheet> {
    let mut groups: Vec<TypeGroup> = Vec::new();
    let mut total_assets = 0.0;
    let mut total_liabilities = 0.0;

    for account in list_accounts(conn, include_closed)? {
        if account.account_type == AccountType::CreditCard {
            if account.current_balance < 0.0 {
                total_liabilities += account.current_balance.abs();
            }
        } else {
            total_assets += account.current_balance;
        }
        match groups.iter_mut().find(|g| g.account_type == account.account_type) {
            Some(group) => group.accounts.push(account),
            None => groups.push(TypeGroup {
                account_type: account.account_type,
                accounts: vec![account],
            }),
        }
    }

    Ok(BalanceSheet {
        groups,
        total_assets,
        total_liabilities,
        net_worth: total_assets - total_liabilities,
    })
}
