//! Index construction with checkpoint commits.
//!
//! [`IndexBuilder`] feeds resolved concepts through the [`TermGenerator`] into a
//! [`DocumentSink`], committing every `checkpoint_every` documents and once more
//! at the end for the remainder. [`SqliteIndex`] is the on-disk sink: a fresh
//! directory holding an FTS5 database. Writes between checkpoints live in an
//! open transaction, so dropping the sink before a commit discards only the
//! uncommitted tail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;

use crate::db;
use crate::error::DestinationExists;
use crate::migrate;
use crate::models::{Concept, RecordSet, ResolvedRelations};
use crate::progress::{BuildProgressEvent, BuildProgressReporter};
use crate::terms::{IndexDocument, Stemmer, TermGenerator};

/// Default number of documents between checkpoint commits.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 5000;

/// Documents between running-count progress events.
const PROGRESS_EVERY: u64 = 1000;

/// Index-engine configuration, fixed for the life of one build.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub stemmer: Stemmer,
    pub spelling: bool,
    pub checkpoint_every: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            stemmer: Stemmer::English,
            spelling: true,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

/// Outcome of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildReport {
    pub documents: u64,
    /// Checkpoint commits plus the final commit, if it had anything to flush.
    pub commits: u64,
}

/// Destination for index documents.
#[async_trait]
pub trait DocumentSink: Send {
    /// Adds or replaces the document keyed by `doc.id`.
    async fn add_document(&mut self, doc: &IndexDocument) -> Result<()>;

    /// Makes every document added so far durable.
    async fn commit(&mut self) -> Result<()>;
}

/// Fails if anything at all exists at `path`.
pub fn check_destination(path: &Path) -> Result<(), DestinationExists> {
    if std::fs::symlink_metadata(path).is_ok() {
        return Err(DestinationExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// SQLite/FTS5 index in its own directory.
pub struct SqliteIndex {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteIndex {
    /// Creates a new index at `dir`, which must not exist yet.
    pub async fn create(dir: &Path, settings: &IndexSettings) -> Result<Self> {
        check_destination(dir)?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

        let pool = db::create(dir).await?;
        migrate::create_schema(&pool, settings.stemmer).await?;
        migrate::set_meta(&pool, "spelling", if settings.spelling { "on" } else { "off" })
            .await?;

        Ok(Self { pool, tx: None })
    }

    /// Records build metadata and closes the database. Call after the final commit.
    pub async fn close(mut self, report: &BuildReport) -> Result<()> {
        self.commit().await?;
        migrate::set_meta(&self.pool, "documents", &report.documents.to_string()).await?;
        migrate::set_meta(&self.pool, "built_at", &chrono::Utc::now().to_rfc3339()).await?;
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for SqliteIndex {
    async fn add_document(&mut self, doc: &IndexDocument) -> Result<()> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        let tx = self.tx.insert(tx);

        sqlx::query(
            r#"
            INSERT INTO concepts (id, doi, name, data_json, content_hash)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                doi = excluded.doi,
                name = excluded.name,
                data_json = excluded.data_json,
                content_hash = excluded.content_hash
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.doi)
        .bind(&doc.name)
        .bind(&doc.data_json)
        .bind(&doc.content_hash)
        .execute(&mut **tx)
        .await?;

        // Replace any earlier FTS entry for this id
        sqlx::query("DELETE FROM concepts_fts WHERE id = ?")
            .bind(&doc.id)
            .execute(&mut **tx)
            .await?;

        sqlx::query("INSERT INTO concepts_fts (id, text, location) VALUES (?, ?, ?)")
            .bind(&doc.id)
            .bind(&doc.text)
            .bind(&doc.location)
            .execute(&mut **tx)
            .await?;

        for word in &doc.spelling {
            sqlx::query(
                r#"
                INSERT INTO spelling (word, freq) VALUES (?, 1)
                ON CONFLICT(word) DO UPDATE SET freq = freq + 1
                "#,
            )
            .bind(word)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}

/// Feeds concepts into a sink, committing at fixed intervals.
pub struct IndexBuilder<'p, S: DocumentSink> {
    sink: S,
    terms: TermGenerator,
    checkpoint_every: u64,
    progress: &'p dyn BuildProgressReporter,
    total: u64,
    count: u64,
    pending: u64,
    commits: u64,
}

impl<'p, S: DocumentSink> IndexBuilder<'p, S> {
    /// `total` is only used for progress reporting.
    pub fn new(
        sink: S,
        settings: &IndexSettings,
        total: u64,
        progress: &'p dyn BuildProgressReporter,
    ) -> Self {
        Self {
            sink,
            terms: TermGenerator::new(settings.stemmer).with_spelling(settings.spelling),
            checkpoint_every: settings.checkpoint_every.max(1) as u64,
            progress,
            total,
            count: 0,
            pending: 0,
            commits: 0,
        }
    }

    /// Documents added so far, committed or not.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub async fn add(&mut self, concept: &Concept) -> Result<()> {
        let doc = self.terms.document(concept)?;
        self.sink
            .add_document(&doc)
            .await
            .with_context(|| format!("Failed to index concept {}", concept.id))?;
        self.count += 1;
        self.pending += 1;

        if self.count % self.checkpoint_every == 0 {
            self.commit().await?;
            self.progress.report(BuildProgressEvent::Checkpoint {
                n: self.count,
                total: self.total,
            });
        } else if self.count % PROGRESS_EVERY == 0 {
            self.progress.report(BuildProgressEvent::Indexing {
                n: self.count,
                total: self.total,
            });
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.sink.commit().await?;
        self.commits += 1;
        self.pending = 0;
        Ok(())
    }

    /// Commits the remainder and hands the sink back.
    pub async fn finish(mut self) -> Result<(S, BuildReport)> {
        if self.pending > 0 {
            self.commit().await?;
        }
        let report = BuildReport {
            documents: self.count,
            commits: self.commits,
        };
        self.progress.report(BuildProgressEvent::Done {
            documents: report.documents,
            commits: report.commits,
        });
        Ok((self.sink, report))
    }
}

/// Builds a new index at `path` from a resolved record set.
///
/// Refuses to touch an existing path; build somewhere fresh and swap it in.
pub async fn build_index(
    path: &Path,
    records: &RecordSet<ResolvedRelations>,
    settings: &IndexSettings,
    progress: &dyn BuildProgressReporter,
) -> Result<BuildReport> {
    let sink = SqliteIndex::create(path, settings).await?;
    let mut builder = IndexBuilder::new(sink, settings, records.len() as u64, progress);
    for concept in records.values() {
        builder.add(concept).await?;
    }
    let (sink, report) = builder.finish().await?;
    sink.close(&report).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawConcept;
    use crate::progress::NoProgress;
    use std::sync::{Arc, Mutex};

    /// Records what the builder asked for, in order.
    #[derive(Default, Clone)]
    struct RecordingSink {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DocumentSink for RecordingSink {
        async fn add_document(&mut self, doc: &IndexDocument) -> Result<()> {
            self.log.lock().unwrap().push(format!("add {}", doc.id));
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("commit".to_string());
            Ok(())
        }
    }

    fn concept(i: usize) -> Concept {
        let mut r = RawConcept::new(format!("{:06}", i));
        r.name = Some(format!("Funder {}", i));
        r.with_relations(ResolvedRelations::new(), ResolvedRelations::new())
    }

    async fn run(n: usize, every: usize) -> (Vec<String>, BuildReport) {
        let sink = RecordingSink::default();
        let log = sink.log.clone();
        let settings = IndexSettings {
            checkpoint_every: every,
            ..Default::default()
        };
        let mut builder = IndexBuilder::new(sink, &settings, n as u64, &NoProgress);
        for i in 0..n {
            builder.add(&concept(i)).await.unwrap();
        }
        let (_, report) = builder.finish().await.unwrap();
        let log = log.lock().unwrap().clone();
        (log, report)
    }

    #[tokio::test]
    async fn commits_at_each_checkpoint_and_for_the_remainder() {
        let (log, report) = run(7, 3).await;
        assert_eq!(report, BuildReport { documents: 7, commits: 3 });
        let commits: Vec<usize> = log
            .iter()
            .enumerate()
            .filter(|(_, e)| *e == "commit")
            .map(|(i, _)| i)
            .collect();
        // after doc 3, after doc 6, then the final one after doc 7
        assert_eq!(commits, vec![3, 7, 9]);
    }

    #[tokio::test]
    async fn no_extra_commit_when_batches_divide_evenly() {
        let (_, report) = run(6, 3).await;
        assert_eq!(report.commits, 2);
        let (_, report) = run(0, 3).await;
        assert_eq!(report, BuildReport::default());
    }

    #[test]
    fn existing_destination_is_refused() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(check_destination(dir.path()).is_err());
        assert!(check_destination(&dir.path().join("fresh")).is_ok());

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(
            check_destination(&file),
            Err(DestinationExists { path: file.clone() })
        );
    }
}
