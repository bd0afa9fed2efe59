use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ca_core::{ArticleStore, Result, RunReport, SourceName};
use tracing::{debug, error, info, warn};

use crate::extract::Extractor;
use crate::fetch::{FetchConfig, Fetcher};
use crate::sources::{spec_for, SourceSpec};
use crate::sync::SyncPolicy;
use crate::traversal::Traversal;

/// Hard ceilings on how far a single run may traverse.
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub max_pages: usize,
    pub max_days: usize,
    pub max_articles: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_pages: 10,
            max_days: 3,
            max_articles: 100,
        }
    }
}

/// Cooperative cancellation handle shared between a run and its owner.
/// Checked between articles, so a fetch in flight still completes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub limits: RunLimits,
    /// Pause between article fetches so we stay a polite guest.
    pub politeness_delay: Duration,
    /// Additional pause before each subsequent index page or day.
    pub page_delay: Duration,
    /// Consecutive already-stored articles before an incremental run stops.
    pub stop_threshold: usize,
    pub fetch: FetchConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            limits: RunLimits::default(),
            politeness_delay: Duration::from_secs(2),
            page_delay: Duration::from_secs(1),
            stop_threshold: 5,
            fetch: FetchConfig::default(),
        }
    }
}

enum Processed {
    New,
    Known,
    Unavailable,
}

/// Drives one source end to end: traverse index pages, skip known URLs,
/// fetch and extract the rest, and persist what comes out.
pub struct SourceRunner {
    spec: SourceSpec,
    store: Arc<dyn ArticleStore>,
    config: RunnerConfig,
    fetcher: Fetcher,
}

impl SourceRunner {
    pub fn new(
        source: SourceName,
        store: Arc<dyn ArticleStore>,
        config: RunnerConfig,
    ) -> Result<Self> {
        Self::with_spec(spec_for(source), store, config)
    }

    /// Build from an explicit source description instead of a registered one.
    pub fn with_spec(
        spec: SourceSpec,
        store: Arc<dyn ArticleStore>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone())?;
        Ok(Self {
            spec,
            store,
            config,
            fetcher,
        })
    }

    pub async fn run(&self, cancel: CancelFlag) -> RunReport {
        let started = Instant::now();
        let source = self.spec.name;
        info!(source = %source, "starting run");

        if let Err(e) = self.store.ping().await {
            error!(source = %source, error = %e, "storage unreachable, aborting run");
            return RunReport::failed(
                format!("Storage unreachable: {e}"),
                started.elapsed().as_secs_f64(),
            );
        }

        let mut report = RunReport {
            success: true,
            articles_scraped: 0,
            articles_skipped: 0,
            errors: Vec::new(),
            runtime_seconds: 0.0,
        };
        let mut policy = SyncPolicy::new(self.config.stop_threshold);
        let mut traversal = Traversal::new(
            &self.spec,
            self.config.limits.max_pages,
            self.config.limits.max_days,
        );
        let mut first_batch = true;

        'run: loop {
            if !first_batch && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            first_batch = false;

            let batch = match traversal.next_batch(&self.fetcher).await {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(e) => {
                    report.errors.push(format!("Traversal failed: {e}"));
                    break;
                }
            };

            for url in batch {
                if cancel.is_cancelled() {
                    info!(source = %source, "run cancelled");
                    report.errors.push("Run cancelled".to_string());
                    break 'run;
                }
                // The ceiling bounds how much new material one run may
                // ingest; known and dead candidates don't count against it.
                if report.articles_scraped >= self.config.limits.max_articles {
                    info!(
                        source = %source,
                        limit = report.articles_scraped,
                        "article limit reached"
                    );
                    break 'run;
                }

                match self.process(&url).await {
                    Ok(Processed::New) => {
                        report.articles_scraped += 1;
                        policy.record_new();
                    }
                    Ok(Processed::Known) => {
                        report.articles_skipped += 1;
                        policy.record_existing();
                    }
                    Ok(Processed::Unavailable) => {
                        // Dead links don't say anything about how far back
                        // we have already synced.
                        report.articles_skipped += 1;
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "article processing failed");
                        report.errors.push(format!("Error processing {url}: {e}"));
                    }
                }

                if policy.should_stop() {
                    info!(
                        source = %source,
                        consecutive = policy.consecutive_existing(),
                        "caught up with stored articles, stopping"
                    );
                    break 'run;
                }
            }
        }

        report.success = report.errors.is_empty();
        report.runtime_seconds = started.elapsed().as_secs_f64();
        info!(
            source = %source,
            scraped = report.articles_scraped,
            skipped = report.articles_skipped,
            errors = report.errors.len(),
            runtime = report.runtime_seconds,
            "run finished"
        );
        report
    }

    async fn process(&self, url: &str) -> Result<Processed> {
        if self.store.exists(url).await? {
            debug!(url = %url, "already stored, skipping");
            return Ok(Processed::Known);
        }

        if !self.config.politeness_delay.is_zero() {
            tokio::time::sleep(self.config.politeness_delay).await;
        }

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) if e.is_fetch_failure() => {
                warn!(url = %url, error = %e, "article unavailable, skipping");
                return Ok(Processed::Unavailable);
            }
            Err(e) => return Err(e),
        };

        let article = Extractor::new(&self.spec).extract(&html, url);
        let upserted = self.store.upsert(&article).await?;
        if upserted.created {
            info!(url = %url, title = %article.title, "stored new article");
            Ok(Processed::New)
        } else {
            // Another runner or an earlier batch got here first.
            Ok(Processed::Known)
        }
    }
}
