mod accounts;
mod budget;
mod categories;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod month;
mod reports;
mod settings;
mod transactions;

use clap::{CommandFactory, Parser};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use cli::{
    AccountsCommands, BudgetCommands, CategoriesCommands, Cli, Commands, ImportCommands, ReportCommands,
    RulesCommands, TransactionsCommands,
};
use error::Result;
use models::ImportProfile;
use settings::Settings;
use transactions::TransactionFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "zeroed=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = settings::load_settings();
    let db_path = settings::resolve_db_path(cli.db.as_deref(), &settings);

    match cli.command {
        Commands::Version => {
            println!("zeroed {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "zeroed", &mut std::io::stdout());
            Ok(())
        }
        Commands::Init { data_dir } => cli::init::run(&mut settings, cli.db.as_deref(), data_dir.as_deref()),
        Commands::Reset { yes } => {
            if !cli::confirm(&format!("Delete all data in {}?", db_path.display()), yes)? {
                println!("Cancelled");
                return Ok(());
            }
            db::reset_database(&db_path)?;
            println!("Database reset with default categories");
            Ok(())
        }
        Commands::Backup { output } => cli::backup::run(&db::open(&db_path)?, &db_path, output.as_deref()),
        Commands::Accounts { command } => dispatch_accounts(&db::open(&db_path)?, command),
        Commands::Categories { command } => dispatch_categories(&db::open(&db_path)?, command),
        Commands::Transactions { command } => dispatch_transactions(&db::open(&db_path)?, command),
        Commands::Budget { command } => dispatch_budget(&db::open(&db_path)?, &settings, command),
        Commands::Rules { command } => dispatch_rules(&db::open(&db_path)?, command),
        Commands::Import { command } => dispatch_import(&db::open(&db_path)?, command),
        Commands::Reports { command } => dispatch_reports(&db::open(&db_path)?, &settings, command),
    }
}

fn dispatch_accounts(conn: &Connection, command: AccountsCommands) -> Result<()> {
    match command {
        AccountsCommands::List => cli::accounts::list(conn),
        AccountsCommands::Create {
            name,
            account_type,
            institution,
            balance,
            off_budget,
        } => cli::accounts::create(conn, &name, account_type, institution.as_deref(), balance, off_budget),
        AccountsCommands::Show { name } => cli::accounts::show(conn, &name),
        AccountsCommands::Close { name, yes } => cli::accounts::close(conn, &name, yes),
        AccountsCommands::Balances { all } => cli::accounts::balances(conn, all),
        AccountsCommands::Recalc { name } => cli::accounts::recalc(conn, &name),
    }
}

fn dispatch_categories(conn: &Connection, command: CategoriesCommands) -> Result<()> {
    match command {
        CategoriesCommands::List { tree } => cli::categories::list(conn, tree),
        CategoriesCommands::CreateGroup { name } => cli::categories::create_group(conn, &name),
        CategoriesCommands::Create { name, group } => cli::categories::create(conn, &name, &group),
        CategoriesCommands::Rename { name, new_name } => cli::categories::rename(conn, &name, &new_name),
        CategoriesCommands::Hide { name } => cli::categories::hide(conn, &name),
        CategoriesCommands::Unhide { name } => cli::categories::unhide(conn, &name),
    }
}

fn dispatch_transactions(conn: &Connection, command: TransactionsCommands) -> Result<()> {
    match command {
        TransactionsCommands::List {
            account,
            category,
            month,
            uncategorized,
            limit,
        } => cli::transactions::list(
            conn,
            &TransactionFilter {
                account: account.as_deref(),
                category: category.as_deref(),
                month: month.as_deref(),
                uncategorized,
                limit,
            },
        ),
        TransactionsCommands::Add {
            account,
            amount,
            payee,
            category,
            date,
            memo,
        } => cli::transactions::add(
            conn,
            &account,
            amount,
            &payee,
            category.as_deref(),
            date.as_deref(),
            memo.as_deref(),
        ),
        TransactionsCommands::Categorize { id, category, no_learn } => {
            cli::transactions::categorize(conn, id, &category, !no_learn)
        }
        TransactionsCommands::Clear { id } => cli::transactions::clear(conn, id),
        TransactionsCommands::Uncategorized => cli::transactions::uncategorized(conn),
        TransactionsCommands::AutoCategorize => cli::transactions::auto_categorize(conn),
    }
}

fn dispatch_budget(conn: &Connection, settings: &Settings, command: BudgetCommands) -> Result<()> {
    match command {
        BudgetCommands::Show { month, json } => cli::budget::show(conn, month.as_deref(), json),
        BudgetCommands::Set { category, amount, month } => {
            cli::budget::set(conn, &category, amount, month.as_deref())
        }
        BudgetCommands::Auto { month, lookback, yes } => cli::budget::auto(
            conn,
            month.as_deref(),
            lookback.unwrap_or(settings.default_lookback_months),
            yes,
        ),
        BudgetCommands::Summary { month } => cli::budget::summary(conn, month.as_deref()),
        BudgetCommands::Goal {
            category,
            goal_type,
            target,
            by,
            monthly,
        } => cli::budget::goal(conn, &category, goal_type, target, by.as_deref(), monthly),
        BudgetCommands::ClearGoal { category } => cli::budget::clear_goal(conn, &category),
    }
}

fn dispatch_rules(conn: &Connection, command: RulesCommands) -> Result<()> {
    match command {
        RulesCommands::List => cli::rules::list(conn),
        RulesCommands::Create {
            pattern,
            category,
            match_type,
            priority,
        } => cli::rules::create(conn, &pattern, &category, match_type, priority),
        RulesCommands::Delete { id } => cli::rules::delete(conn, id),
        RulesCommands::Test { payee } => cli::rules::test(conn, &payee),
        RulesCommands::Payees => cli::rules::payees(conn),
        RulesCommands::SetPayee { payee, category } => cli::rules::set_payee(conn, &payee, &category),
    }
}

fn dispatch_import(conn: &Connection, command: ImportCommands) -> Result<()> {
    match command {
        ImportCommands::Csv {
            file,
            account,
            format,
            dry_run,
        } => cli::import::csv(conn, &file, &account, format.as_deref(), dry_run),
        ImportCommands::Profiles => cli::import::profiles(conn),
        ImportCommands::ProfileAdd {
            name,
            institution,
            date_column,
            date_format,
            amount_column,
            inflow_column,
            outflow_column,
            payee_column,
            memo_column,
            skip_rows,
            multiplier,
        } => cli::import::profile_add(
            conn,
            &ImportProfile {
                id: 0,
                name,
                institution,
                date_column,
                date_format,
                amount_column,
                amount_inflow_column: inflow_column,
                amount_outflow_column: outflow_column,
                payee_column,
                memo_column,
                skip_header_rows: skip_rows,
                amount_multiplier: multiplier,
            },
        ),
        ImportCommands::ProfileDelete { name } => cli::import::profile_delete(conn, &name),
    }
}

fn dispatch_reports(conn: &Connection, settings: &Settings, command: ReportCommands) -> Result<()> {
    match command {
        ReportCommands::Spending { months, group } => cli::report::spending(conn, months, group),
        ReportCommands::Trends { months } => {
            cli::report::trends(conn, months.unwrap_or(settings.trend_months))
        }
        ReportCommands::Summary => cli::report::summary(conn),
        ReportCommands::Category { name, months } => cli::report::category(conn, &name, months),
    }
}
