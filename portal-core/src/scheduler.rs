//! Scheduler – owns the background task that drives a [`Job`].
//!
//! A scheduled job runs once as soon as it is spawned, then every `period`,
//! and again whenever its trigger is notified. The returned [`ScheduledJob`]
//! is the only handle on that task:
//!
//! ```rust,ignore
//! let scheduler = Scheduler::new(Duration::from_secs(24 * 60 * 60))?;
//! let scanner = scheduler.spawn(Arc::new(ExpirationScanJob::new(store.clone())), store.policy_changes());
//! // ...
//! scanner.shutdown().await?;
//! ```
//!
//! Dropping the handle aborts the task, so a job never outlives the state it
//! was scheduled against.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::{PortalError, Result};
use crate::job::{Job, RunReason};

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    /// A zero period is rejected: the interval it would drive never ticks.
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(PortalError::Scheduler(
                "period must be greater than zero".to_string(),
            ));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start driving `job`. Must be called from within a tokio runtime.
    pub fn spawn(&self, job: Arc<dyn Job>, trigger: Arc<Notify>) -> ScheduledJob {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let id = job.id().to_string();
        info!(job_id = %id, period_secs = self.period.as_secs(), "Scheduling job");

        let handle = tokio::spawn(drive(job, self.period, trigger.clone(), shutdown_rx));

        ScheduledJob {
            id,
            trigger,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

/// Handle on a running job
pub struct ScheduledJob {
    id: String,
    trigger: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledJob {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request an extra pass outside the regular period
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the job after its current pass and wait for the task to exit
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            // Receiver already gone means the task has exited on its own
            let _ = tx.send(());
        }

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| PortalError::Scheduler(format!("job {} failed: {}", self.id, e))),
            None => Ok(()),
        }
    }
}

impl Drop for ScheduledJob {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(job_id = %self.id, "Aborting scheduled job");
            handle.abort();
        }
    }
}

async fn drive(
    job: Arc<dyn Job>,
    period: Duration,
    trigger: Arc<Notify>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the startup pass is not doubled
    ticker.tick().await;

    let mut reason = RunReason::Startup;
    loop {
        run_once(job.as_ref(), reason).await;

        reason = tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => RunReason::Interval,
            _ = trigger.notified() => RunReason::Triggered,
        };
    }

    info!(job_id = %job.id(), "Scheduled job stopped");
}

async fn run_once(job: &dyn Job, reason: RunReason) {
    match job.run(reason).await {
        Ok(report) => debug!(
            job_id = %job.id(),
            reason = ?reason,
            examined = report.examined,
            produced = report.produced,
            summary = ?report.summary,
            "Job pass finished"
        ),
        Err(e) => error!(job_id = %job.id(), reason = ?reason, error = %e, "Job pass failed"),
    }
}
