//! Sweep coordinator - one pass over every due source
//!
//! A sweep visits sources strictly one at a time:
//! 1. Reset the retry ledger and read the watermark as the threshold
//! 2. Ask the scheduler for the next eligible source
//! 3. Fetch and extract it outside any store lock, bounded by the visit timeout
//! 4. Insert new articles into the outbox and mark the source visited, or
//!    spend one retry on failure
//! 5. When nothing is eligible, append a new watermark
//!
//! Per-source problems never end the sweep, including a failed insert of one
//! source's articles. A store error from the ledger itself does, and leaves
//! the watermark where it was so the next sweep covers the same sources.

use crate::clock::Clock;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::parser::{ExtractError, ExtractedArticle};
use crate::crawler::scheduler::Scheduler;
use crate::storage::{SourceRecord, Storage, StorageError};
use crate::RelayError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a single source visit failed
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("Unreadable source settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to store articles: {0}")]
    Persist(#[from] StorageError),
}

/// Summary of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Successful visits
    pub visited: u64,
    /// Failed visits, each of which spent one retry
    pub failures: u64,
    /// Sources left with no retries at the end of the sweep
    pub exhausted: u64,
    pub articles_found: u64,
    /// Articles that were not already in the outbox
    pub articles_new: u64,
    pub started_at: i64,
    pub finished_at: i64,
    /// Shutdown was requested before the sweep ran out of sources
    pub interrupted: bool,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited={} failures={} exhausted={} articles={} new={} duration={}s",
            self.visited,
            self.failures,
            self.exhausted,
            self.articles_found,
            self.articles_new,
            self.finished_at - self.started_at
        )
    }
}

/// Runs sweeps against one store with one fetcher
pub struct SweepRunner<S: Storage + ?Sized> {
    store: Arc<S>,
    scheduler: Scheduler<S>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    visit_timeout: Duration,
}

impl<S: Storage + ?Sized> SweepRunner<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        max_retries: u32,
        visit_timeout: Duration,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(Arc::clone(&store), max_retries),
            store,
            fetcher,
            clock,
            visit_timeout,
        }
    }

    /// Runs one sweep to completion
    ///
    /// `cancel` is checked between visits; an in-flight visit always finishes.
    /// An interrupted sweep does not advance the watermark.
    ///
    /// # Returns
    ///
    /// * `Ok(SweepReport)` - The sweep ran out of eligible sources or was interrupted
    /// * `Err(RelayError)` - The store failed; the sweep was abandoned
    pub async fn run_sweep(&self, cancel: &CancellationToken) -> Result<SweepReport, RelayError> {
        let started_at = self.clock.now();
        let threshold = self.scheduler.start_sweep(started_at)?;
        let mut report = SweepReport {
            started_at,
            ..SweepReport::default()
        };

        tracing::info!("Starting sweep with threshold {}", threshold);

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Shutdown requested, leaving sweep early");
                report.interrupted = true;
                break;
            }

            let source = match self.scheduler.next_eligible(threshold)? {
                Some(source) => source,
                None => break,
            };

            tracing::debug!("Visiting {} ({})", source, source.url);

            match self.process(&source).await {
                Ok((found, created)) => {
                    report.visited += 1;
                    report.articles_found += found;
                    report.articles_new += created;

                    let visited_at = self.clock.now().max(threshold);
                    self.scheduler.record_success(source.id, visited_at)?;
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(
                        "Visit of {} failed (attempt {}/{}): {}",
                        source,
                        source.retries + 1,
                        self.scheduler.max_retries(),
                        e
                    );
                    self.scheduler.record_failure(source.id)?;
                }
            }
        }

        report.exhausted = self.scheduler.exhausted_count()?;
        report.finished_at = self.clock.now();

        if !report.interrupted {
            self.scheduler.finish_sweep(report.finished_at)?;
        }

        tracing::info!("Sweep finished: {}", report);
        if report.exhausted > 0 {
            tracing::warn!("{} source(s) gave up after too many failures", report.exhausted);
        }

        Ok(report)
    }

    /// Visits one source and stores what it yields, returning
    /// `(articles found, articles new)`
    async fn process(&self, source: &SourceRecord) -> Result<(u64, u64), VisitError> {
        let articles = self.visit(source).await?;
        let created = self.persist(source, &articles)?;
        Ok((articles.len() as u64, created))
    }

    /// Fetches and extracts one source; touches no store
    async fn visit(&self, source: &SourceRecord) -> Result<Vec<ExtractedArticle>, VisitError> {
        let settings = source.settings()?;

        let html = match tokio::time::timeout(
            self.visit_timeout,
            self.fetcher.fetch(&source.url, self.visit_timeout),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: source.url.clone(),
                }
                .into())
            }
        };

        Ok(self.fetcher.extract(&html, &source.url, &settings.selectors)?)
    }

    /// Adds extracted articles to the outbox, returning how many were new
    fn persist(
        &self,
        source: &SourceRecord,
        articles: &[ExtractedArticle],
    ) -> Result<u64, StorageError> {
        let added = self.clock.now();
        let mut created = 0;

        for article in articles {
            if self
                .store
                .insert_item(source.id, &article.title, &article.detail_url, added)?
            {
                tracing::debug!("New article from {}: {}", source.name, article);
                created += 1;
            }
        }

        Ok(created)
    }
}
