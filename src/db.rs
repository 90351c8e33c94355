use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

/// Database file inside an index directory.
pub const INDEX_FILE: &str = "index.sqlite";

pub fn index_file(index_dir: &Path) -> PathBuf {
    index_dir.join(INDEX_FILE)
}

/// Creates the index database inside an existing, empty directory.
///
/// A single connection is enough: the builder writes strictly in sequence.
pub async fn create(index_dir: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(index_file(index_dir))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Opens a built index for queries.
pub async fn open_read_only(index_dir: &Path) -> Result<SqlitePool> {
    let file = index_file(index_dir);
    if !file.is_file() {
        bail!("no index at {}", index_dir.display());
    }

    let options = SqliteConnectOptions::new().filename(file).read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}
