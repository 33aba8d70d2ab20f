use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of one job pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobReport {
    /// Records the pass looked at
    pub examined: usize,
    /// Records the pass created or changed
    pub produced: usize,
    /// Human-readable summary for logs
    pub summary: Option<String>,
}

impl JobReport {
    pub fn new(examined: usize, produced: usize) -> Self {
        Self {
            examined,
            produced,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Why a pass was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunReason {
    /// First pass, right after the job is scheduled
    Startup,
    /// The fixed period elapsed
    Interval,
    /// Something the job watches changed
    Triggered,
}

/// Core trait that every scheduled job implements
#[async_trait]
pub trait Job: Send + Sync {
    /// Unique identifier for this job
    fn id(&self) -> &str;

    /// Execute one pass
    async fn run(&self, reason: RunReason) -> Result<JobReport>;
}
