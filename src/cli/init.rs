use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::info;

use crate::db;
use crate::error::Result;
use crate::settings::{resolve_db_path, save_settings, shellexpand_path, Settings};

/// Create the data directory and database. A new `data_dir` is saved to the
/// settings file; `--db` only affects this run.
pub fn run(settings: &mut Settings, explicit_db: Option<&Path>, data_dir: Option<&str>) -> Result<()> {
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(dir);
        save_settings(settings)?;
        info!(data_dir = %settings.data_dir, "saved data directory");
    }
    std::fs::create_dir_all(PathBuf::from(&settings.data_dir))?;

    let db_path = resolve_db_path(explicit_db, settings);
    db::open(&db_path)?;

    println!("{}", format!("Initialized zeroed at {}", db_path.display()).green());
    println!("Next: create an account with 'zeroed accounts create <name> --type checking'");
    Ok(())
}
