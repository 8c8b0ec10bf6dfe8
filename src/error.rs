use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZeroedError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Account not found: {0}")]
    UnknownAccount(String),

    #[error("Category not found: {0}")]
    UnknownCategory(String),

    #[error("Category group not found: {0}")]
    UnknownGroup(String),

    #[error("Unknown format '{name}'. Available: {available}")]
    UnknownFormat { name: String, available: String },

    #[error("Transaction {0} not found")]
    UnknownTransaction(i64),

    #[error("Rule {0} not found")]
    UnknownRule(i64),

    #[error("Invalid month '{0}'. Use YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ZeroedError>;
