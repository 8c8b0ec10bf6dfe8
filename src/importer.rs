use std::collections::HashSet;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use rusqlite::{Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::accounts::{adjust_balance, find_account};
use crate::categorizer::Categorizer;
use crate::db::now_timestamp;
use crate::error::{Result, ZeroedError};
use crate::models::{Account, ImportProfile, ParsedRow, Transaction, TransactionType};
use crate::month::iso;
use crate::transactions::insert_transaction;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lenient bank amount: `$`, `,` and quotes are dropped and `(x)` means
/// `-x`. Blank cells are zero.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%Y-%m-%d", "%m/%d/%y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

/// Parse with a single strftime format. A four-digit-year format never
/// accepts a short year, so `01/15/25` falls through to `%y`.
pub fn parse_date_with(raw: &str, format: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), format).ok()?;
    if format.contains("%Y") && date.year() < 1000 {
        return None;
    }
    Some(date)
}

pub fn parse_date_any(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|fmt| parse_date_with(raw, fmt))
}

/// Stable dedup key for a transaction in a given account.
pub fn import_id(account_id: i64, date: &str, amount: f64, payee: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{account_id}:{date}:{amount:.2}:{payee}").as_bytes());
    hex::encode(hasher.finalize())
}

fn open_csv(file_path: &Path, has_headers: bool) -> Result<csv::Reader<std::io::BufReader<std::fs::File>>> {
    let file = std::fs::File::open(file_path)?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(std::io::BufReader::new(file)))
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// First header matching any candidate, case-insensitively, in candidate order.
fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(candidate))
    })
}

fn payee_or_unknown(raw: &str) -> String {
    if raw.is_empty() { "Unknown".to_string() } else { raw.to_string() }
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

// ---------------------------------------------------------------------------
// Importer kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ImporterKind {
    Chase,
    Generic,
    Profile(ImportProfile),
}

impl ImporterKind {
    pub fn key(&self) -> &str {
        match self {
            Self::Chase => "chase",
            Self::Generic => "generic",
            Self::Profile(p) => &p.name,
        }
    }

    pub fn institution(&self) -> &str {
        match self {
            Self::Chase => "Chase Bank",
            Self::Generic => "Any",
            Self::Profile(p) => p.institution.as_deref().unwrap_or("Custom"),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Chase => "Chase checking, savings, and credit card statements".to_string(),
            Self::Generic => "Generic importer - auto-detects common column formats".to_string(),
            Self::Profile(p) => format!("Saved profile (dates {})", p.date_format),
        }
    }

    pub fn detect(&self, file_path: &Path) -> bool {
        match self {
            Self::Chase => detect_chase(file_path),
            Self::Generic | Self::Profile(_) => false,
        }
    }

    pub fn parse(&self, file_path: &Path) -> Result<Vec<ParsedRow>> {
        match self {
            Self::Chase => parse_chase(file_path),
            Self::Generic => parse_generic(file_path),
            Self::Profile(p) => parse_profile(p, file_path),
        }
    }
}

/// Every format usable with `--format`: built-ins first, then saved profiles.
pub fn list_formats(conn: &Connection) -> Result<Vec<ImporterKind>> {
    let mut formats = vec![ImporterKind::Chase, ImporterKind::Generic];
    formats.extend(list_profiles(conn)?.into_iter().map(ImporterKind::Profile));
    Ok(formats)
}

pub fn get_by_key(conn: &Connection, key: &str) -> Result<ImporterKind> {
    let formats = list_formats(conn)?;
    if let Some(kind) = formats.iter().find(|k| k.key() == key) {
        return Ok(kind.clone());
    }
    let available = formats.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ");
    Err(ZeroedError::UnknownFormat {
        name: key.to_string(),
        available,
    })
}

/// Auto-detect a built-in format, falling back to generic. The flag is true
/// when a format was detected.
pub fn detect_format(file_path: &Path) -> (ImporterKind, bool) {
    match [ImporterKind::Chase].into_iter().find(|k| k.detect(file_path)) {
        Some(kind) => (kind, true),
        None => (ImporterKind::Generic, false),
    }
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

pub struct ImportResult {
    pub account: Account,
    pub format: String,
    pub detected: bool,
    pub rows: Vec<ParsedRow>,
    pub imported: usize,
    pub skipped: usize,
    pub categorized: usize,
    pub dry_run: bool,
}

impl ImportResult {
    pub fn uncategorized(&self) -> usize {
        self.imported - self.categorized
    }
}

pub fn import_file(
    conn: &Connection,
    file_path: &Path,
    account_name: &str,
    format_key: Option<&str>,
    dry_run: bool,
) -> Result<ImportResult> {
    let account = find_account(conn, account_name)?;
    let (importer, detected) = match format_key {
        Some(key) => (get_by_key(conn, key)?, false),
        None => detect_format(file_path),
    };
    debug!(format = importer.key(), detected, file = %file_path.display(), "parsing import file");
    let rows = importer.parse(file_path)?;

    let mut result = ImportResult {
        account,
        format: importer.key().to_string(),
        detected,
        rows: Vec::new(),
        imported: 0,
        skipped: 0,
        categorized: 0,
        dry_run,
    };

    let tx = conn.unchecked_transaction()?;
    let categorizer = Categorizer::load(&tx)?;
    let mut seen = tx.prepare("SELECT 1 FROM transactions WHERE import_id = ?1")?;
    // Repeated rows within the file count as duplicates too.
    let mut in_file = HashSet::new();
    let mut total = 0.0;

    for row in &rows {
        let id = import_id(result.account.id, &row.date, row.amount, &row.payee);
        if !in_file.insert(id.clone()) || seen.exists([&id])? {
            result.skipped += 1;
            continue;
        }
        if dry_run {
            if categorizer.categorize(&tx, &row.payee)?.is_some() {
                result.categorized += 1;
            }
            result.imported += 1;
            continue;
        }
        let category_id = categorizer.categorize_and_record(&tx, &row.payee)?;
        if category_id.is_some() {
            result.categorized += 1;
        }
        insert_transaction(
            &tx,
            &Transaction {
                id: 0,
                account_id: result.account.id,
                category_id,
                payee_id: None,
                date: row.date.clone(),
                amount: row.amount,
                transaction_type: TransactionType::for_amount(row.amount),
                memo: row.memo.clone(),
                is_cleared: false,
                import_id: Some(id),
                import_source: Some(row.import_source.to_string()),
                raw_payee_name: Some(row.payee.clone()),
            },
        )?;
        total += row.amount;
        result.imported += 1;
    }
    drop(seen);

    if dry_run {
        // Nothing was written; the transaction rolls back on drop.
        drop(tx);
    } else {
        if result.imported > 0 {
            adjust_balance(&tx, result.account.id, total, false)?;
            result.account.current_balance += total;
        }
        tx.commit()?;
        info!(
            account = %result.account.name,
            format = %result.format,
            imported = result.imported,
            skipped = result.skipped,
            categorized = result.categorized,
            "imported transactions"
        );
    }
    result.rows = rows;
    Ok(result)
}

// ---------------------------------------------------------------------------
// Chase parser
// ---------------------------------------------------------------------------

fn detect_chase(file_path: &Path) -> bool {
    let Ok(mut rdr) = open_csv(file_path, true) else {
        return false;
    };
    let Ok(headers) = rdr.headers() else {
        return false;
    };
    let has = |name: &str| position(headers, name).is_some();
    has("Description") && (has("Transaction Date") || has("Posting Date"))
}

fn parse_chase(file_path: &Path) -> Result<Vec<ParsedRow>> {
    let mut rdr = open_csv(file_path, true)?;
    let headers = rdr.headers()?.clone();
    let is_credit_card = position(&headers, "Transaction Date").is_some();
    let (idx_date, idx_memo, source) = if is_credit_card {
        (position(&headers, "Transaction Date"), position(&headers, "Memo"), "chase_cc")
    } else {
        (position(&headers, "Posting Date"), None, "chase_bank")
    };
    let idx_desc = position(&headers, "Description");
    let idx_amount = position(&headers, "Amount");

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let Some(date) = parse_date_with(field(&record, idx_date), "%m/%d/%Y") else {
            continue;
        };
        let Ok(amount) = field(&record, idx_amount).parse::<f64>() else {
            continue;
        };
        rows.push(ParsedRow {
            date: iso(date),
            amount,
            payee: payee_or_unknown(field(&record, idx_desc)),
            memo: non_empty(field(&record, idx_memo)),
            import_source: source,
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Generic parser
// ---------------------------------------------------------------------------

const DATE_COLUMNS: &[&str] = &[
    "date", "transaction date", "trans date", "posting date", "post date", "transaction_date",
];
const AMOUNT_COLUMNS: &[&str] = &["amount", "transaction amount", "debit/credit"];
const DEBIT_COLUMNS: &[&str] = &["debit", "withdrawal", "debit amount", "withdrawals"];
const CREDIT_COLUMNS: &[&str] = &["credit", "deposit", "credit amount", "deposits"];
const PAYEE_COLUMNS: &[&str] = &[
    "description", "payee", "merchant", "name", "memo", "transaction description",
];
const MEMO_COLUMNS: &[&str] = &["memo", "notes", "reference", "check number"];

/// Sum of a signed amount column, or of split outflow/inflow columns.
/// `None` means the row's amount could not be read.
fn row_amount(record: &StringRecord, amount: Option<usize>, outflow: Option<usize>, inflow: Option<usize>) -> Option<f64> {
    if amount.is_some() {
        return parse_amount(field(record, amount));
    }
    let mut total = 0.0;
    if let Some(debit) = parse_amount(field(record, outflow)) {
        total -= debit.abs();
    }
    if let Some(credit) = parse_amount(field(record, inflow)) {
        total += credit.abs();
    }
    Some(total)
}

fn parse_generic(file_path: &Path) -> Result<Vec<ParsedRow>> {
    let mut rdr = open_csv(file_path, true)?;
    let headers = rdr.headers()?.clone();

    let idx_date = find_column(&headers, DATE_COLUMNS)
        .ok_or_else(|| ZeroedError::Import("Could not find date column".into()))?;
    let idx_amount = find_column(&headers, AMOUNT_COLUMNS);
    let idx_debit = find_column(&headers, DEBIT_COLUMNS);
    let idx_credit = find_column(&headers, CREDIT_COLUMNS);
    if idx_amount.is_none() && idx_debit.is_none() && idx_credit.is_none() {
        return Err(ZeroedError::Import("Could not find amount column(s)".into()));
    }
    let idx_payee = find_column(&headers, PAYEE_COLUMNS)
        .ok_or_else(|| ZeroedError::Import("Could not find payee/description column".into()))?;
    let idx_memo = find_column(&headers, MEMO_COLUMNS);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let Some(date) = parse_date_any(field(&record, Some(idx_date))) else {
            continue;
        };
        let Some(amount) = row_amount(&record, idx_amount, idx_debit, idx_credit) else {
            continue;
        };
        if amount == 0.0 {
            continue;
        }
        rows.push(ParsedRow {
            date: iso(date),
            amount,
            payee: payee_or_unknown(field(&record, Some(idx_payee))),
            memo: non_empty(field(&record, idx_memo)),
            import_source: "generic",
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Saved profiles
// ---------------------------------------------------------------------------

/// A profile column is a header name (case-insensitive) or, for files without
/// a header row, a 1-based column number.
fn resolve_column(headers: Option<&StringRecord>, column: &str) -> Result<usize> {
    if let Ok(n) = column.trim().parse::<usize>() {
        if n >= 1 {
            return Ok(n - 1);
        }
    }
    headers
        .and_then(|h| find_column(h, &[column.trim()]))
        .ok_or_else(|| ZeroedError::Import(format!("Column '{column}' not found")))
}

fn parse_profile(profile: &ImportProfile, file_path: &Path) -> Result<Vec<ParsedRow>> {
    let mut rdr = open_csv(file_path, false)?;
    let mut records = rdr.records();

    // Lines before the header are preamble; the last skipped line is the header.
    let skip = profile.skip_header_rows.max(0) as usize;
    let mut headers = None;
    for _ in 0..skip {
        match records.next() {
            Some(record) => headers = Some(record?),
            None => return Ok(Vec::new()),
        }
    }

    let h = headers.as_ref();
    let idx_date = resolve_column(h, &profile.date_column)?;
    let idx_payee = resolve_column(h, &profile.payee_column)?;
    let optional = |col: &Option<String>| col.as_deref().map(|c| resolve_column(h, c)).transpose();
    let idx_amount = optional(&profile.amount_column)?;
    let idx_inflow = optional(&profile.amount_inflow_column)?;
    let idx_outflow = optional(&profile.amount_outflow_column)?;
    let idx_memo = optional(&profile.memo_column)?;

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        let Some(date) = parse_date_with(field(&record, Some(idx_date)), &profile.date_format) else {
            continue;
        };
        let Some(amount) = row_amount(&record, idx_amount, idx_outflow, idx_inflow) else {
            continue;
        };
        let amount = amount * profile.amount_multiplier;
        if amount == 0.0 {
            continue;
        }
        rows.push(ParsedRow {
            date: iso(date),
            amount,
            payee: payee_or_unknown(field(&record, Some(idx_payee))),
            memo: non_empty(field(&record, idx_memo)),
            import_source: "profile",
        });
    }
    Ok(rows)
}

const PROFILE_COLUMNS: &str = "id, name, institution, date_column, date_format, amount_column, \
    amount_inflow_column, amount_outflow_column, payee_column, memo_column, skip_header_rows, amount_multiplier";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ImportProfile> {
    Ok(ImportProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        institution: row.get(2)?,
        date_column: row.get(3)?,
        date_format: row.get(4)?,
        amount_column: row.get(5)?,
        amount_inflow_column: row.get(6)?,
        amount_outflow_column: row.get(7)?,
        payee_column: row.get(8)?,
        memo_column: row.get(9)?,
        skip_header_rows: row.get(10)?,
        amount_multiplier: row.get(11)?,
    })
}

pub fn list_profiles(conn: &Connection) -> Result<Vec<ImportProfile>> {
    let mut stmt = conn.prepare(&format!("SELECT {PROFILE_COLUMNS} FROM import_profiles ORDER BY name"))?;
    let profiles = stmt
        .query_map([], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(profiles)
}

pub fn get_profile(conn: &Connection, name: &str) -> Result<Option<ImportProfile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM import_profiles WHERE name = ?1"),
            [name],
            profile_from_row,
        )
        .optional()?)
}

/// Save a column mapping. The `id` field of `profile` is ignored.
pub fn add_profile(conn: &Connection, profile: &ImportProfile) -> Result<ImportProfile> {
    if profile.name == "chase" || profile.name == "generic" {
        return Err(ZeroedError::Duplicate(format!("Format '{}'", profile.name)));
    }
    if get_profile(conn, &profile.name)?.is_some() {
        return Err(ZeroedError::Duplicate(format!("Import profile '{}'", profile.name)));
    }
    if profile.amount_column.is_none()
        && profile.amount_inflow_column.is_none()
        && profile.amount_outflow_column.is_none()
    {
        return Err(ZeroedError::Import(
            "A profile needs an amount column or inflow/outflow columns".into(),
        ));
    }
    conn.execute(
        "INSERT INTO import_profiles (name, institution, date_column, date_format, amount_column, \
         amount_inflow_column, amount_outflow_column, payee_column, memo_column, skip_header_rows, \
         amount_multiplier, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            profile.name,
            profile.institution,
            profile.date_column,
            profile.date_format,
            profile.amount_column,
            profile.amount_inflow_column,
            profile.amount_outflow_column,
            profile.payee_column,
            profile.memo_column,
            profile.skip_header_rows,
            profile.amount_multiplier,
            now_timestamp(),
        ],
    )?;
    info!(name = %profile.name, "saved import profile");
    Ok(ImportProfile {
        id: conn.last_insert_rowid(),
        ..profile.clone()
    })
}

/// Returns false when no profile had that name.
pub fn delete_profile(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.execute("DELETE FROM import_profiles WHERE name = ?1", [name])? > 0)
}
