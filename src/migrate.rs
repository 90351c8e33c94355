use anyhow::Result;
use sqlx::SqlitePool;

use crate::terms::Stemmer;

/// Creates the index schema. The FTS tokenizer is fixed at creation time, so
/// the stemmer chosen here applies to every document and every later query.
pub async fn create_schema(pool: &SqlitePool, stemmer: Stemmer) -> Result<()> {
    // Stored records, one row per concept
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS concepts (
            id TEXT PRIMARY KEY,
            doi TEXT NOT NULL,
            name TEXT,
            data_json TEXT NOT NULL,
            content_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Spelling dictionary: unstemmed indexed words and their frequencies
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spelling (
            word TEXT PRIMARY KEY,
            freq INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='concepts_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(&format!(
            r#"
            CREATE VIRTUAL TABLE concepts_fts USING fts5(
                id UNINDEXED,
                text,
                location,
                tokenize = '{}'
            )
            "#,
            stemmer.fts5_tokenizer()
        ))
        .execute(pool)
        .await?;
    }

    set_meta(pool, "stemmer", stemmer.name()).await?;
    Ok(())
}

pub async fn set_meta(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO index_meta (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_meta(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}
