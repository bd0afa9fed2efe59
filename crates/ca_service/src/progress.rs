use ca_core::RunReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Cancelled
        )
    }
}

/// Point-in-time view of the run slot, cheap to snapshot for polling.
/// Counts and errors accumulate as each source finishes, so pollers see
/// them without waiting for the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProgress {
    pub status: SyncStatus,
    pub current_source: Option<String>,
    pub progress_percentage: f64,
    pub articles_scraped: usize,
    pub articles_skipped: usize,
    pub errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncProgress {
    pub fn idle() -> Self {
        Self {
            status: SyncStatus::Idle,
            current_source: None,
            progress_percentage: 0.0,
            articles_scraped: 0,
            articles_skipped: 0,
            errors: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn running(started_at: DateTime<Utc>) -> Self {
        Self {
            status: SyncStatus::Running,
            progress_percentage: 10.0,
            started_at: Some(started_at),
            ..Self::idle()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub report: RunReport,
}

/// Aggregate of every source's run, kept until the next run replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedReport {
    pub success: bool,
    pub total_scraped: usize,
    pub total_skipped: usize,
    pub errors: Vec<String>,
    pub runtime_seconds: f64,
    pub reports: Vec<SourceReport>,
}

impl CombinedReport {
    pub fn from_reports(reports: Vec<SourceReport>, runtime_seconds: f64) -> Self {
        let mut errors = Vec::new();
        for entry in &reports {
            for error in &entry.report.errors {
                errors.push(format!("{}: {}", entry.source, error));
            }
        }
        Self {
            success: reports.iter().all(|r| r.report.success),
            total_scraped: reports.iter().map(|r| r.report.articles_scraped).sum(),
            total_skipped: reports.iter().map(|r| r.report.articles_skipped).sum(),
            errors,
            runtime_seconds,
            reports,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} new, {} skipped, {} error(s) in {:.1}s",
            self.total_scraped,
            self.total_skipped,
            self.errors.len(),
            self.runtime_seconds
        )
    }
}
