use std::sync::Arc;
use std::time::{Duration, Instant};

use ca_core::{Article, ArticleStore, Result, RunReport, SourceName};
use ca_scrapers::runner::{CancelFlag, RunnerConfig, SourceRunner};
use ca_scrapers::sources::{all_sources, SourceSpec};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::progress::{CombinedReport, SourceReport, SyncProgress, SyncStatus};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("a sync run is already in progress")]
    AlreadyRunning,
    #[error(transparent)]
    Core(#[from] ca_core::Error),
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub runner: RunnerConfig,
    /// Wall-clock ceiling per source; a runner past it is reported as
    /// failed and the rest of the sync continues.
    pub runner_timeout: Duration,
    /// Run sources one after another instead of concurrently.
    pub sequential: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            runner_timeout: Duration::from_secs(300),
            sequential: false,
        }
    }
}

/// Per-run overrides of the service defaults. Absent fields keep the
/// configured values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncOptions {
    pub sources: Option<Vec<SourceName>>,
    pub max_pages: Option<usize>,
    pub max_articles: Option<usize>,
    pub parallel: Option<bool>,
}

struct ServiceState {
    progress: SyncProgress,
    result: Option<CombinedReport>,
    cancel: CancelFlag,
}

impl ServiceState {
    fn idle() -> Self {
        Self {
            progress: SyncProgress::idle(),
            result: None,
            cancel: CancelFlag::new(),
        }
    }
}

/// Owns the single run slot. At most one sync runs at a time; progress
/// and the last combined report are retained for polling until the next
/// run replaces them.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn ArticleStore>,
    config: ServiceConfig,
    sources: Vec<SourceSpec>,
    state: Arc<Mutex<ServiceState>>,
}

impl SyncService {
    pub fn new(store: Arc<dyn ArticleStore>, config: ServiceConfig) -> Self {
        Self::with_sources(store, config, all_sources())
    }

    /// Restrict the service to an explicit source list.
    pub fn with_sources(
        store: Arc<dyn ArticleStore>,
        config: ServiceConfig,
        sources: Vec<SourceSpec>,
    ) -> Self {
        Self {
            store,
            config,
            sources,
            state: Arc::new(Mutex::new(ServiceState::idle())),
        }
    }

    /// Claim the run slot and kick off a sync in the background. Fails
    /// if a run is already in flight.
    pub async fn start(&self) -> std::result::Result<(), ServiceError> {
        self.start_with(SyncOptions::default()).await
    }

    /// Start with per-run overrides of the configured defaults.
    pub async fn start_with(&self, options: SyncOptions) -> std::result::Result<(), ServiceError> {
        let specs: Vec<SourceSpec> = match &options.sources {
            Some(names) => self
                .sources
                .iter()
                .filter(|s| names.contains(&s.name))
                .cloned()
                .collect(),
            None => self.sources.clone(),
        };
        let mut config = self.config.clone();
        if let Some(max_pages) = options.max_pages {
            config.runner.limits.max_pages = max_pages;
        }
        if let Some(max_articles) = options.max_articles {
            config.runner.limits.max_articles = max_articles;
        }
        if let Some(parallel) = options.parallel {
            config.sequential = !parallel;
        }

        let cancel = CancelFlag::new();
        {
            let mut state = self.state.lock().await;
            if state.progress.status == SyncStatus::Running {
                return Err(ServiceError::AlreadyRunning);
            }
            state.progress = SyncProgress::running(Utc::now());
            state.result = None;
            state.cancel = cancel.clone();
        }

        let service = self.clone();
        tokio::spawn(async move {
            service.run_all(specs, config, cancel).await;
        });
        Ok(())
    }

    pub async fn progress(&self) -> SyncProgress {
        self.state.lock().await.progress.clone()
    }

    pub async fn result(&self) -> Option<CombinedReport> {
        self.state.lock().await.result.clone()
    }

    /// Cancel an in-flight run. Returns false when nothing was running.
    /// The article being fetched at cancellation time still completes.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.progress.status != SyncStatus::Running {
            return false;
        }
        warn!("cancelling sync run");
        state.cancel.cancel();
        state.progress.status = SyncStatus::Cancelled;
        state.progress.completed_at = Some(Utc::now());
        true
    }

    pub async fn latest_articles(&self, limit: usize) -> Result<Vec<Article>> {
        self.store.latest(limit).await
    }

    pub fn store(&self) -> Arc<dyn ArticleStore> {
        self.store.clone()
    }

    async fn run_all(&self, specs: Vec<SourceSpec>, config: ServiceConfig, cancel: CancelFlag) {
        let started = Instant::now();
        let total = specs.len();
        info!(sources = total, sequential = config.sequential, "sync run starting");

        let reports = if config.sequential {
            self.run_sequential(specs, &config, &cancel).await
        } else {
            self.run_parallel(specs, &config, &cancel).await
        };

        let combined = CombinedReport::from_reports(reports, started.elapsed().as_secs_f64());
        info!(summary = %combined.summary(), "sync run finished");

        let mut state = self.state.lock().await;
        // A cancelled run keeps its status; the partial report is still
        // worth keeping for inspection.
        if state.progress.status != SyncStatus::Cancelled {
            state.progress.status = if combined.success {
                SyncStatus::Completed
            } else {
                SyncStatus::Failed
            };
            state.progress.completed_at = Some(Utc::now());
        }
        state.progress.current_source = None;
        state.progress.progress_percentage = 100.0;
        state.progress.articles_scraped = combined.total_scraped;
        state.progress.articles_skipped = combined.total_skipped;
        state.progress.errors = combined.errors.clone();
        state.result = Some(combined);
    }

    async fn run_sequential(
        &self,
        specs: Vec<SourceSpec>,
        config: &ServiceConfig,
        cancel: &CancelFlag,
    ) -> Vec<SourceReport> {
        let total = specs.len();
        let mut reports = Vec::with_capacity(total);
        for (index, spec) in specs.into_iter().enumerate() {
            let name = spec.name.as_str().to_string();
            {
                let mut state = self.state.lock().await;
                state.progress.current_source = Some(name.clone());
            }
            let report = self.run_one(spec, config, cancel.clone()).await;
            let entry = SourceReport {
                source: name,
                report,
            };
            self.bump_progress(index + 1, total, &entry).await;
            reports.push(entry);
        }
        reports
    }

    async fn run_parallel(
        &self,
        specs: Vec<SourceSpec>,
        config: &ServiceConfig,
        cancel: &CancelFlag,
    ) -> Vec<SourceReport> {
        let total = specs.len();
        let mut handles = Vec::with_capacity(total);
        for spec in specs {
            let service = self.clone();
            let config = config.clone();
            let cancel = cancel.clone();
            let name = spec.name.as_str().to_string();
            let handle =
                tokio::spawn(async move { service.run_one(spec, &config, cancel).await });
            handles.push((name, handle));
        }

        let mut reports = Vec::with_capacity(total);
        for (index, (name, handle)) in handles.into_iter().enumerate() {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!(source = %name, error = %e, "runner task failed");
                    RunReport::failed(format!("Runner task failed: {e}"), 0.0)
                }
            };
            let entry = SourceReport {
                source: name,
                report,
            };
            self.bump_progress(index + 1, total, &entry).await;
            reports.push(entry);
        }
        reports
    }

    async fn run_one(&self, spec: SourceSpec, config: &ServiceConfig, cancel: CancelFlag) -> RunReport {
        let runner =
            match SourceRunner::with_spec(spec, self.store.clone(), config.runner.clone()) {
                Ok(runner) => runner,
                Err(e) => return RunReport::failed(format!("Runner setup failed: {e}"), 0.0),
            };
        let timeout = config.runner_timeout;
        match tokio::time::timeout(timeout, runner.run(cancel)).await {
            Ok(report) => report,
            Err(_) => RunReport::failed(
                format!("Runner timed out after {}s", timeout.as_secs()),
                timeout.as_secs_f64(),
            ),
        }
    }

    async fn bump_progress(&self, completed: usize, total: usize, entry: &SourceReport) {
        let mut state = self.state.lock().await;
        state.progress.articles_scraped += entry.report.articles_scraped;
        state.progress.articles_skipped += entry.report.articles_skipped;
        for error in &entry.report.errors {
            state.progress.errors.push(format!("{}: {}", entry.source, error));
        }
        if state.progress.status == SyncStatus::Running {
            state.progress.progress_percentage =
                10.0 + 90.0 * (completed as f64) / (total.max(1) as f64);
        }
    }
}
