//! Trait seams between the governance engine and its external collaborators.
//!
//! The engine never talks to storage or delivery channels directly — it is
//! constructed over these traits (explicit dependency injection, no
//! module-level singletons). `followgate-store` ships the SQLite
//! implementation; hosts may substitute their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    ActionKind, AuditEntry, AutomationRule, GovernanceState, JobStatus, Lead, Message,
    ScheduledJob,
};

/// Read/write access to lead governance fields and message history.
///
/// The two commit methods must be atomic: either the message row, the state
/// transition, and the timestamp all land, or none do.
pub trait ContextProvider: Send + Sync {
    fn lead(&self, lead_id: &str) -> Result<Option<Lead>>;

    /// Full message history for a lead, oldest first.
    fn messages(&self, lead_id: &str) -> Result<Vec<Message>>;

    /// Append an outbound message, set the governance state, and update
    /// `last_outbound_at` — in one transaction.
    fn commit_outbound(
        &self,
        lead_id: &str,
        action: ActionKind,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Append an inbound message and set the governance state — in one
    /// transaction. `last_outbound_at` is untouched.
    fn commit_inbound(
        &self,
        lead_id: &str,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Where the rule registry loads its configuration from.
pub trait RuleSource: Send + Sync {
    /// All currently active automation rules.
    fn active_rules(&self) -> Result<Vec<AutomationRule>>;
}

/// Append-only audit trail.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<()>;
}

/// Durable storage for deferred executions.
pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: &ScheduledJob) -> Result<()>;

    /// Pending jobs whose `due_at` has passed.
    fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>>;

    fn mark(&self, job_id: &str, status: JobStatus) -> Result<()>;
}

/// Everything an action handler gets to see about the contact it performs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub tenant_id: String,
    pub lead_id: String,
    pub niche: Option<String>,
    pub trigger_event: String,
    pub payload: serde_json::Value,
}

/// Returned by a successful action execution.
#[derive(Debug, Clone, Default)]
pub struct ActionReceipt {
    /// Short human-readable note recorded on the outbound message row.
    pub detail: Option<String>,
}

/// The concrete side-effect boundary — send review request, send referral
/// offer, update status, send booking confirmation. Implemented by external
/// collaborators; the engine treats it as opaque and only cares about
/// success/failure.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: ActionKind, ctx: &ActionContext) -> Result<ActionReceipt>;
}
