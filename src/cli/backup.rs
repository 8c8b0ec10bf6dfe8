use std::path::{Path, PathBuf};

use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::format_bytes;

/// `<db dir>/backups/budget-YYYYMMDD-HHMMSS.db`
fn default_destination(db_path: &Path) -> Result<PathBuf> {
    let backups_dir = db_path
        .parent()
        .map(|p| p.join("backups"))
        .unwrap_or_else(|| PathBuf::from("backups"));
    std::fs::create_dir_all(&backups_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(backups_dir.join(format!("budget-{stamp}.db")))
}

/// Copy the live database with SQLite's online backup API.
pub fn backup_to(conn: &Connection, dest_path: &Path) -> Result<u64> {
    let mut dest_conn = Connection::open(dest_path)?;
    let backup = Backup::new(conn, &mut dest_conn)?;
    backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
    Ok(std::fs::metadata(dest_path)?.len())
}

pub fn run(conn: &Connection, db_path: &Path, output: Option<&Path>) -> Result<()> {
    let dest_path = match output {
        Some(p) => p.to_path_buf(),
        None => default_destination(db_path)?,
    };
    let size = backup_to(conn, &dest_path)?;
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    #[test]
    fn test_backup_copies_categories() {
        let (dir, conn) = test_db();
        let dest = dir.path().join("copy.db");
        let size = backup_to(&conn, &dest).unwrap();
        assert!(size > 0);

        let copy = Connection::open(&dest).unwrap();
        let count: i64 = copy
            .query_row("SELECT count(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 17);
    }

    #[test]
    fn test_default_destination_is_beside_db() {
        let dir = tempfile::tempdir().unwrap();
        let dest = default_destination(&dir.path().join("budget.db")).unwrap();
        assert_eq!(dest.parent().unwrap(), dir.path().join("backups"));
        assert!(dest.file_name().unwrap().to_string_lossy().starts_with("budget-"));
    }
}
