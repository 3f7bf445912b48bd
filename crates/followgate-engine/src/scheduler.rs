//! Durable delay scheduler.
//!
//! A SEND verdict with a configured delay is not held in an in-process
//! timer — it is persisted as a `ScheduledJob` and picked up by the poll
//! loop, so deferred follow-ups survive restarts. At execution time the job
//! is re-validated (rule still active, lead still there) and the guards run
//! again over fresh context; a decision made before the delay is never
//! trusted blindly after it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use followgate_core::error::Result;
use followgate_core::model::{AutomationRule, JobStatus, ScheduledJob, TriggerEvent};
use followgate_core::traits::JobStore;

use crate::dispatch::GovernanceEngine;

#[derive(Clone)]
pub struct DelayScheduler {
    jobs: Arc<dyn JobStore>,
}

impl DelayScheduler {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Persist a deferred execution due `rule.delay_minutes` from `now`.
    /// Zero-delay work is the dispatcher's to run inline, not ours.
    pub fn defer(
        &self,
        event: &TriggerEvent,
        rule: &AutomationRule,
        now: DateTime<Utc>,
    ) -> Result<ScheduledJob> {
        let due_at = now + Duration::minutes(i64::from(rule.delay_minutes));
        let job = ScheduledJob::new(event, rule, due_at);
        self.jobs.enqueue(&job)?;
        tracing::info!(
            "⏳ Deferred {} for lead {} until {}",
            rule.action,
            event.lead_id,
            due_at.to_rfc3339()
        );
        Ok(job)
    }

    /// Pending jobs due at or before `now`.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        self.jobs.due(now)
    }

    pub fn mark(&self, job_id: &str, status: JobStatus) -> Result<()> {
        self.jobs.mark(job_id, status)
    }
}

/// Poll loop: hand due jobs back to the engine on a fixed interval.
/// Runs until the hosting task is dropped.
pub async fn run_scheduler(engine: Arc<GovernanceEngine>, poll_interval_secs: u64) {
    tracing::info!("⏰ Scheduler started (check every {poll_interval_secs}s)");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(poll_interval_secs));

    loop {
        interval.tick().await;
        match engine.run_due_jobs(Utc::now()).await {
            Ok(0) => {}
            Ok(count) => tracing::info!("🔔 Ran {count} deferred follow-up(s)"),
            Err(e) => tracing::warn!("⚠️ Scheduler pass failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followgate_core::model::ActionKind;
    use followgate_store::GovernanceDb;

    #[test]
    fn defer_persists_a_pending_job() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        let scheduler = DelayScheduler::new(db.clone());

        let event = TriggerEvent::new("booking_completed", "lead-1", "tenant-1").with_niche("salon");
        let rule = AutomationRule::new(Some("salon"), "booking_completed", 90, ActionKind::SendReviewRequest);

        let now = Utc::now();
        let job = scheduler.defer(&event, &rule, now).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.due_at, now + Duration::minutes(90));

        // Not due yet, due after the delay.
        assert!(scheduler.due(now).unwrap().is_empty());
        let due = scheduler.due(now + Duration::minutes(91)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].rule_id, rule.id);
    }
}
