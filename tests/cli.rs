use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn zeroed(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zeroed").unwrap();
    cmd.env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("ZEROED_DB")
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(dir.path().join("budget.db"));
    cmd
}

fn run(dir: &TempDir, args: &[&str]) {
    zeroed(dir).args(args).assert().success();
}

fn with_checking(dir: &TempDir) {
    run(dir, &["accounts", "create", "Checking", "--type", "checking"]);
}

fn write_chase_csv(path: &Path) {
    std::fs::write(
        path,
        "Transaction Date,Post Date,Description,Category,Type,Amount,Memo\n\
         05/02/2026,05/03/2026,WHOLE FOODS MARKET,Groceries,Sale,-82.14,\n\
         05/04/2026,05/05/2026,NETFLIX.COM,Entertainment,Sale,-15.49,monthly\n\
         05/06/2026,05/07/2026,PAYROLL DEPOSIT,,Payment,1500.00,\n",
    )
    .unwrap();
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("zeroed "));
}

#[test]
fn test_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized zeroed"));
    assert!(dir.path().join("budget.db").exists());
}

#[test]
fn test_accounts_create_and_list() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["accounts", "create", "Checking", "--type", "checking", "--balance", "1250"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created account 'Checking'"));
    zeroed(&dir)
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking").and(predicate::str::contains("$1,250.00")));
}

#[test]
fn test_duplicate_account_fails() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    zeroed(&dir)
        .args(["accounts", "create", "Checking", "--type", "savings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_unknown_account_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["transactions", "add", "Nowhere", "-5", "--payee", "Cafe"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Account not found: Nowhere"));
}

#[test]
fn test_invalid_account_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["accounts", "create", "Mattress", "--type", "piggybank"])
        .assert()
        .failure();
}

#[test]
fn test_budget_json_reflects_income_and_spending() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    run(&dir, &["transactions", "add", "Checking", "2000", "--payee", "Employer", "--date", "2026-05-01"]);
    run(
        &dir,
        &[
            "transactions", "add", "Checking", "-45.50", "--payee", "Corner Market", "--category", "Groceries",
            "--date", "2026-05-03",
        ],
    );
    zeroed(&dir)
        .args(["budget", "set", "Groceries", "300", "--month", "2026-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set Groceries budget to $300.00 for May 2026"));

    let output = zeroed(&dir)
        .args(["budget", "show", "--month", "2026-05", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let budget: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(budget["month"], "2026-05-01");
    assert_eq!(budget["ready_to_assign"].as_f64().unwrap(), 1700.0);

    let groceries = budget["groups"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|g| g["categories"].as_array().unwrap().iter())
        .find(|c| c["name"] == "Groceries")
        .unwrap();
    assert_eq!(groceries["budgeted"].as_f64().unwrap(), 300.0);
    assert_eq!(groceries["activity"].as_f64().unwrap(), -45.5);
    assert_eq!(groceries["available"].as_f64().unwrap(), 254.5);
}

#[test]
fn test_budget_show_table() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["budget", "show", "--month", "2026-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Budget for March 2026").and(predicate::str::contains("Rent/Mortgage")));
}

#[test]
fn test_budget_rejects_bad_month() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["budget", "show", "--month", "May 2026"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_rules_create_and_test() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["rules", "create", "STARBUCKS", "--category", "Dining Out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created rule #1"));
    zeroed(&dir)
        .args(["rules", "test", "STARBUCKS STORE 123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dining Out").and(predicate::str::contains("rule #1")));
    zeroed(&dir)
        .args(["rules", "test", "Hardware Barn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No match for 'Hardware Barn'"));
}

#[test]
fn test_import_chase_csv_skips_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    run(&dir, &["rules", "create", "NETFLIX", "--category", "Subscriptions"]);
    let csv = dir.path().join("chase.csv");
    write_chase_csv(&csv);
    let csv = csv.to_str().unwrap();

    zeroed(&dir)
        .args(["import", "csv", csv, "--account", "Checking"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Auto-detected format: chase")
                .and(predicate::str::contains("Imported 3 transactions"))
                .and(predicate::str::contains("Auto-categorized 1 transactions")),
        );

    zeroed(&dir)
        .args(["import", "csv", csv, "--account", "Checking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 transactions").and(predicate::str::contains("Skipped 3 duplicates")));

    zeroed(&dir)
        .args(["transactions", "list", "--uncategorized"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WHOLE FOODS MARKET").and(predicate::str::contains("NETFLIX").not()));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    let csv = dir.path().join("chase.csv");
    write_chase_csv(&csv);

    zeroed(&dir)
        .args(["import", "csv", csv.to_str().unwrap(), "--account", "Checking", "--dry-run"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Would import 3 transactions")
                .and(predicate::str::contains("Dry run - no changes made")),
        );
    zeroed(&dir)
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions found"));
}

#[test]
fn test_import_unknown_format_lists_available() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    let csv = dir.path().join("chase.csv");
    write_chase_csv(&csv);
    zeroed(&dir)
        .args(["import", "csv", csv.to_str().unwrap(), "--account", "Checking", "--format", "ofx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ofx").and(predicate::str::contains("chase")));
}

#[test]
fn test_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    with_checking(&dir);
    zeroed(&dir)
        .args(["reports", "summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary - ").and(predicate::str::contains("Transactions:")));
}

#[test]
fn test_categories_tree() {
    let dir = tempfile::tempdir().unwrap();
    zeroed(&dir)
        .args(["categories", "list", "--tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Savings Goals").and(predicate::str::contains("Emergency Fund")));
}

#[test]
fn test_backup_to_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("copy.db");
    zeroed(&dir)
        .args(["backup", "--output", dest.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup saved to"));
    assert!(dest.exists());
}
