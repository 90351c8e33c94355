//! Queries against a built index.
//!
//! Two query forms are supported:
//!
//! - `id:<value>`: exact point lookup on the concept identifier.
//! - free text and/or a location: words are matched (stemmed, implicit AND)
//!   against the `text` and `location` FTS columns and ranked by bm25.
//!
//! When a free-text query finds nothing, the spelling dictionary is consulted
//! for a "did you mean" rewrite.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::migrate;
use crate::models::{Concept, SearchHit};

const ID_PREFIX: &str = "id:";
/// Largest edit distance accepted for a spelling correction.
const MAX_EDIT_DISTANCE: usize = 2;
/// Words shorter than this get at most one edit.
const SHORT_WORD: usize = 5;

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub total: i64,
    pub offset: i64,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Runs a query against the index at `index_path`.
pub async fn search(
    index_path: &Path,
    offset: i64,
    text_query: Option<&str>,
    location_query: Option<&str>,
    page_size: i64,
) -> Result<SearchResults> {
    let text_query = text_query.map(str::trim).filter(|q| !q.is_empty());
    let location_query = location_query.map(str::trim).filter(|q| !q.is_empty());
    if text_query.is_none() && location_query.is_none() {
        bail!("missing queries");
    }
    let offset = offset.max(0);

    let pool = db::open_read_only(index_path).await?;
    let result = match text_query.and_then(|q| q.strip_prefix(ID_PREFIX)) {
        Some(id) => lookup_id(&pool, id.trim(), offset).await,
        None => full_text(&pool, text_query, location_query, offset, page_size).await,
    };
    pool.close().await;
    result
}

async fn lookup_id(pool: &SqlitePool, id: &str, offset: i64) -> Result<SearchResults> {
    let found = fetch_concept(pool, id).await?;
    let total = i64::from(found.is_some());
    let results = found
        .filter(|_| offset == 0)
        .map(|item| SearchHit { score: 1.0, item })
        .into_iter()
        .collect();
    Ok(SearchResults {
        total,
        offset,
        results,
        suggestion: None,
    })
}

async fn full_text(
    pool: &SqlitePool,
    text_query: Option<&str>,
    location_query: Option<&str>,
    offset: i64,
    page_size: i64,
) -> Result<SearchResults> {
    let mut clauses = Vec::new();
    clauses.extend(text_query.and_then(|q| match_expr("text", q)));
    clauses.extend(location_query.and_then(|q| match_expr("location", q)));
    if clauses.is_empty() {
        return Ok(SearchResults {
            total: 0,
            offset,
            results: Vec::new(),
            suggestion: None,
        });
    }
    let expr = clauses.join(" AND ");

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM concepts_fts WHERE concepts_fts MATCH ?")
            .bind(&expr)
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query(
        r#"
        SELECT c.data_json AS data_json, concepts_fts.rank AS rank
        FROM concepts_fts
        JOIN concepts c ON c.id = concepts_fts.id
        WHERE concepts_fts MATCH ?
        ORDER BY concepts_fts.rank, c.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&expr)
    .bind(page_size)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut results = Vec::with_capacity(rows.len());
    for row in &rows {
        let data_json: String = row.get("data_json");
        let rank: f64 = row.get("rank");
        let item: Concept =
            serde_json::from_str(&data_json).context("stored record is not valid JSON")?;
        results.push(SearchHit {
            score: -rank, // negate so higher = better
            item,
        });
    }

    let suggestion = match text_query {
        Some(q) if total == 0 && spelling_enabled(pool).await? => suggest(pool, q).await?,
        _ => None,
    };

    Ok(SearchResults {
        total,
        offset,
        results,
        suggestion,
    })
}

/// FTS5 expression matching every word of `query` in `column`.
///
/// Words are quoted so user input can never inject FTS5 operators.
fn match_expr(column: &str, query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| format!("{} : \"{}\"", column, w))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

/// Fetches a stored record by identifier.
pub async fn fetch_concept(pool: &SqlitePool, id: &str) -> Result<Option<Concept>> {
    let data_json: Option<String> =
        sqlx::query_scalar("SELECT data_json FROM concepts WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    data_json
        .map(|json| serde_json::from_str(&json).context("stored record is not valid JSON"))
        .transpose()
}

/// Number of committed documents in the index at `index_path`.
pub async fn document_count(index_path: &Path) -> Result<i64> {
    let pool = db::open_read_only(index_path).await?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM concepts")
        .fetch_one(&pool)
        .await?;
    pool.close().await;
    Ok(count)
}

/// Indexes built with spelling off have an empty dictionary.
async fn spelling_enabled(pool: &SqlitePool) -> Result<bool> {
    Ok(migrate::get_meta(pool, "spelling").await?.as_deref() != Some("off"))
}

/// Rewrites `query` with the closest known spelling of each unknown word.
///
/// Tokens without a letter (years, identifiers) pass through unchanged.
/// Returns `None` when every word is already known or nothing close exists.
pub async fn suggest(pool: &SqlitePool, query: &str) -> Result<Option<String>> {
    let mut changed = false;
    let mut out = Vec::new();
    for token in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let word = token.to_lowercase();
        if !word.chars().any(char::is_alphabetic) {
            out.push(word);
            continue;
        }
        match correct_word(pool, &word).await? {
            Some(better) => {
                changed = true;
                out.push(better);
            }
            None => out.push(word),
        }
    }
    Ok(changed.then(|| out.join(" ")))
}

/// Edits allowed when correcting a word of `len` chars.
pub fn max_edit_distance(len: usize) -> usize {
    match len {
        0 | 1 => 0,
        n if n < SHORT_WORD => 1,
        _ => MAX_EDIT_DISTANCE,
    }
}

async fn correct_word(pool: &SqlitePool, word: &str) -> Result<Option<String>> {
    let len = word.chars().count();
    let max_distance = max_edit_distance(len);
    if max_distance == 0 {
        return Ok(None);
    }

    let known: Option<i64> = sqlx::query_scalar("SELECT freq FROM spelling WHERE word = ?")
        .bind(word)
        .fetch_optional(pool)
        .await?;
    if known.is_some() {
        return Ok(None);
    }

    let rows = sqlx::query(
        r#"
        SELECT word, freq FROM spelling
        WHERE length(word) BETWEEN ? AND ?
        ORDER BY freq DESC, word ASC
        "#,
    )
    .bind((len - max_distance) as i64)
    .bind((len + max_distance) as i64)
    .fetch_all(pool)
    .await?;

    let mut best: Option<(usize, i64, String)> = None;
    for row in &rows {
        let candidate: String = row.get("word");
        let freq: i64 = row.get("freq");
        let distance = strsim::levenshtein(word, &candidate);
        if distance > max_distance {
            continue;
        }
        let better = match &best {
            None => true,
            Some((d, f, _)) => distance < *d || (distance == *d && freq > *f),
        };
        if better {
            best = Some((distance, freq, candidate));
        }
    }
    Ok(best.map(|(_, _, w)| w))
}

/// CLI entry point: runs a query and prints one line per hit.
pub async fn run_search(
    index_path: &Path,
    text: Option<&str>,
    location: Option<&str>,
    offset: i64,
    page_size: i64,
    json: bool,
) -> Result<()> {
    let results = search(index_path, offset, text, location, page_size).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.results.is_empty() {
        println!("No results.");
        if let Some(s) = &results.suggestion {
            println!("Did you mean: {}", s);
        }
        return Ok(());
    }

    for (i, hit) in results.results.iter().enumerate() {
        let item = &hit.item;
        println!(
            "{}. [{:.2}] {} ({})",
            results.offset as usize + i + 1,
            hit.score,
            item.display_name(),
            item.id
        );
        println!("    doi: {}", item.doi);
        if let Some(ref country) = item.country {
            println!("    country: {}", country);
        }
        if !item.altnames.is_empty() {
            println!("    also: {}", item.altnames.join("; "));
        }
    }
    println!(
        "showing {}-{} of {}",
        results.offset + 1,
        results.offset + results.results.len() as i64,
        results.total
    );
    Ok(())
}
