//! Trigger dispatcher — drives the evaluation pipeline for every rule an
//! event activates.
//!
//! Per-rule failures are isolated: one rule's storage hiccup or send failure
//! never aborts the other rules matching the same event, and never poisons
//! other leads. The audit row for an evaluation is written before its side
//! effect, so evidence survives a crash mid-send.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use followgate_core::error::{FollowgateError, Result};
use followgate_core::model::{
    ActionKind, AutomationRule, GovernanceState, JobStatus, Lead, ScheduledJob, TriggerEvent,
};
use followgate_core::traits::{
    ActionContext, ActionExecutor, AuditSink, ContextProvider, JobStore, RuleSource,
};

use crate::audit::{AuditLogger, Disposition};
use crate::context::ContextLoader;
use crate::evaluate::evaluate;
use crate::lanes::LeadLanes;
use crate::registry::RuleRegistry;
use crate::scheduler::DelayScheduler;
use crate::state::{GovernanceEvent, TransitionTable};

/// What happened to one rule during a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Executed,
    Deferred,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub action: ActionKind,
    pub status: OutcomeStatus,
    /// Guard name for skips, error detail for failures.
    pub reason: String,
}

impl RuleOutcome {
    fn executed(rule: &AutomationRule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.action,
            status: OutcomeStatus::Executed,
            reason: String::new(),
        }
    }

    fn deferred(rule: &AutomationRule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.action,
            status: OutcomeStatus::Deferred,
            reason: format!("due in {}m", rule.delay_minutes),
        }
    }

    fn skipped(rule: &AutomationRule, guard: &str) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.action,
            status: OutcomeStatus::Skipped,
            reason: guard.to_string(),
        }
    }

    fn failed(rule: &AutomationRule, reason: String) -> Self {
        Self {
            rule_id: rule.id.clone(),
            action: rule.action,
            status: OutcomeStatus::Failed,
            reason,
        }
    }
}

/// Outcome of one dispatch, per matching rule.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchSummary {
    pub outcomes: Vec<RuleOutcome>,
}

impl DispatchSummary {
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// The governance engine: registry, loader, evaluator, scheduler, audit, and
/// executor wired over injected seams. One instance serves every tenant.
pub struct GovernanceEngine {
    provider: Arc<dyn ContextProvider>,
    loader: ContextLoader,
    registry: RuleRegistry,
    executor: Arc<dyn ActionExecutor>,
    audit: AuditLogger,
    scheduler: DelayScheduler,
    lanes: LeadLanes,
    table: TransitionTable,
}

impl GovernanceEngine {
    pub fn new(
        provider: Arc<dyn ContextProvider>,
        rules: Arc<dyn RuleSource>,
        jobs: Arc<dyn JobStore>,
        audit: Arc<dyn AuditSink>,
        executor: Arc<dyn ActionExecutor>,
        table: TransitionTable,
    ) -> Self {
        let registry = RuleRegistry::new(rules);
        if let Err(e) = registry.reload() {
            tracing::warn!("⚠️ Initial rule load failed, starting empty: {e}");
        }
        Self {
            loader: ContextLoader::new(provider.clone()),
            provider,
            registry,
            executor,
            audit: AuditLogger::new(audit),
            scheduler: DelayScheduler::new(jobs),
            lanes: LeadLanes::new(),
            table,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Entry point for business events. Evaluates every matching active rule
    /// independently and reports what happened to each.
    pub async fn dispatch(&self, event: &TriggerEvent) -> DispatchSummary {
        let now = Utc::now();
        if let Err(e) = self.registry.reload() {
            tracing::warn!("⚠️ Rule reload failed, using cached rules: {e}");
        }

        let niche = self.resolve_niche(event);
        let rules = self.registry.matching(&event.name, niche.as_deref());
        if rules.is_empty() {
            tracing::debug!("No rules match '{}' for niche {:?}", event.name, niche);
            return DispatchSummary::default();
        }
        tracing::info!(
            "⚡ '{}' matched {} rule(s) for lead {}",
            event.name,
            rules.len(),
            event.lead_id
        );

        let mut outcomes = Vec::with_capacity(rules.len());
        for rule in rules {
            match self.run_pipeline(event, &rule, now, true).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!("⚠️ Rule {} failed for lead {}: {e}", rule.id, event.lead_id);
                    outcomes.push(RuleOutcome::failed(&rule, e.to_string()));
                }
            }
        }
        DispatchSummary { outcomes }
    }

    /// Explicit inbound-message event: append the reply and regress the
    /// governance state toward "awaiting new outreach".
    pub async fn record_inbound(
        &self,
        lead_id: &str,
        detail: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<GovernanceState> {
        let lane = self.lanes.lane(lead_id);
        let _guard = lane.lock().await;

        let (lead, _) = self.loader.load(lead_id)?;
        let next = self
            .table
            .apply(lead.governance_state, GovernanceEvent::InboundReceived);
        self.provider.commit_inbound(lead_id, detail, next, at)?;
        tracing::info!(
            "📥 Inbound from lead {lead_id} ({} → {})",
            lead.governance_state.as_str(),
            next.as_str()
        );
        Ok(next)
    }

    /// One scheduler pass: run every due deferred job. Returns how many jobs
    /// were handled (any outcome).
    pub async fn run_due_jobs(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.scheduler.due(now)?;
        if due.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.registry.reload() {
            tracing::warn!("⚠️ Rule reload failed, using cached rules: {e}");
        }

        let mut handled = 0;
        for job in due {
            let status = match self.run_job(&job, now).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("⚠️ Job {} failed: {e}", job.id);
                    JobStatus::Failed
                }
            };
            if let Err(e) = self.scheduler.mark(&job.id, status) {
                tracing::warn!("⚠️ Failed to mark job {}: {e}", job.id);
            }
            handled += 1;
        }
        self.lanes.prune();
        Ok(handled)
    }

    /// Execute one due job. The delay has been served; re-validate, then run
    /// the pipeline with fresh context — the guards decide again.
    async fn run_job(&self, job: &ScheduledJob, now: DateTime<Utc>) -> Result<JobStatus> {
        let Some(rule) = self.registry.find(&job.rule_id) else {
            tracing::info!("🗑 Job {} stale: rule {} no longer active", job.id, job.rule_id);
            return Ok(JobStatus::Stale);
        };

        let event = job.to_event();
        match self.run_pipeline(&event, &rule, now, false).await {
            Ok(outcome) => Ok(match outcome.status {
                OutcomeStatus::Failed => JobStatus::Failed,
                _ => JobStatus::Done,
            }),
            Err(FollowgateError::LeadNotFound(_)) => {
                tracing::info!("🗑 Job {} stale: lead {} is gone", job.id, job.lead_id);
                Ok(JobStatus::Stale)
            }
            Err(e) => Err(e),
        }
    }

    /// The per-rule pipeline, under the lead's lane: load → evaluate →
    /// audit → act. `defer_allowed` is true on the dispatch path (a delayed
    /// SEND becomes a durable job) and false on the job path (the delay has
    /// already been served).
    async fn run_pipeline(
        &self,
        event: &TriggerEvent,
        rule: &AutomationRule,
        now: DateTime<Utc>,
        defer_allowed: bool,
    ) -> Result<RuleOutcome> {
        let lane = self.lanes.lane(&event.lead_id);
        let _guard = lane.lock().await;

        let (lead, snapshot) = self.loader.load(&event.lead_id)?;
        let decision = evaluate(&snapshot, rule.delay_minutes, now);

        if !decision.is_send() {
            self.audit
                .record_decision(event, rule, &decision, Disposition::Skipped, now)?;
            tracing::info!(
                "⏭ Skipped {} for lead {} ({})",
                rule.action,
                lead.id,
                decision.rule
            );
            return Ok(RuleOutcome::skipped(rule, decision.rule));
        }

        if defer_allowed && rule.delay_minutes > 0 {
            self.audit
                .record_decision(event, rule, &decision, Disposition::Deferred, now)?;
            self.scheduler.defer(event, rule, now)?;
            return Ok(RuleOutcome::deferred(rule));
        }

        self.audit
            .record_decision(event, rule, &decision, Disposition::Dispatched, now)?;
        match self.execute_and_commit(event, rule, &lead, now).await {
            Ok(()) => Ok(RuleOutcome::executed(rule)),
            Err(e @ FollowgateError::Action(_)) => {
                tracing::warn!("⚠️ {} failed for lead {}: {e}", rule.action, lead.id);
                if let Err(audit_err) = self.audit.record_failure(event, rule, &e, now) {
                    tracing::warn!("⚠️ Failed to audit action failure: {audit_err}");
                }
                Ok(RuleOutcome::failed(rule, e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Run the side effect, then commit message + state + timestamp in one
    /// transaction. On executor failure nothing is committed — the lead is
    /// exactly as it was.
    async fn execute_and_commit(
        &self,
        event: &TriggerEvent,
        rule: &AutomationRule,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ctx = ActionContext {
            tenant_id: event.tenant_id.clone(),
            lead_id: lead.id.clone(),
            niche: Some(lead.niche.clone()),
            trigger_event: event.name.clone(),
            payload: event.payload.clone(),
        };
        let receipt = self.executor.execute(rule.action, &ctx).await?;

        let next = self
            .table
            .apply(lead.governance_state, GovernanceEvent::OutboundSent);
        self.provider
            .commit_outbound(&lead.id, rule.action, receipt.detail.as_deref(), next, now)?;
        tracing::info!(
            "✅ {} sent for lead {} ({} → {})",
            rule.action,
            lead.id,
            lead.governance_state.as_str(),
            next.as_str()
        );
        Ok(())
    }

    /// Niche comes from the event when the producer knows it, else from the
    /// lead. Failure to resolve is not fatal — niche-bound rules simply
    /// won't match.
    fn resolve_niche(&self, event: &TriggerEvent) -> Option<String> {
        if event.niche.is_some() {
            return event.niche.clone();
        }
        match self.provider.lead(&event.lead_id) {
            Ok(Some(lead)) => Some(lead.niche),
            Ok(None) => {
                tracing::warn!(
                    "⚠️ Cannot resolve niche: lead {} not found",
                    event.lead_id
                );
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Cannot resolve niche for lead {}: {e}", event.lead_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::NullExecutor;
    use followgate_core::model::Lead;
    use followgate_store::GovernanceDb;

    fn engine_with(db: &Arc<GovernanceDb>) -> GovernanceEngine {
        GovernanceEngine::new(
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            Arc::new(NullExecutor),
            TransitionTable::default(),
        )
    }

    #[tokio::test]
    async fn dispatch_without_rules_is_a_no_op() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        db.upsert_lead(&Lead::new("lead-1", "tenant-1", "salon")).unwrap();
        let engine = engine_with(&db);

        let summary = engine
            .dispatch(&TriggerEvent::new("lead_created", "lead-1", "tenant-1"))
            .await;
        assert!(summary.outcomes.is_empty());
        assert!(db.audit_for_lead("lead-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn niche_falls_back_to_the_lead() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        db.upsert_lead(&Lead::new("lead-1", "tenant-1", "salon")).unwrap();
        db.save_rule(&AutomationRule::new(
            Some("salon"),
            "lead_created",
            0,
            ActionKind::SendBookingConfirmation,
        ))
        .unwrap();
        let engine = engine_with(&db);

        // Event without a niche hint still matches the salon rule.
        let summary = engine
            .dispatch(&TriggerEvent::new("lead_created", "lead-1", "tenant-1"))
            .await;
        assert_eq!(summary.count(OutcomeStatus::Executed), 1);
    }

    #[tokio::test]
    async fn missing_lead_fails_only_that_rule() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        // System-wide rule so the niche resolution miss doesn't hide it.
        db.save_rule(&AutomationRule::new(None, "lead_created", 0, ActionKind::UpdateLeadStatus))
            .unwrap();
        let engine = engine_with(&db);

        let summary = engine
            .dispatch(&TriggerEvent::new("lead_created", "lead-ghost", "tenant-1"))
            .await;
        assert_eq!(summary.count(OutcomeStatus::Failed), 1);
        assert!(summary.outcomes[0].reason.contains("Lead not found"));
    }
}
