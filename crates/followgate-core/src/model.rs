//! Domain model — leads, messages, automation rules, audit entries,
//! scheduled jobs, and trigger events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a prefixed row id ("lead-…", "rule-…", "job-…", "log-…").
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

// ─── Governance state ──────────────────────────────────────

/// Per-lead contact lifecycle, independent of the business status.
/// Tracks whether the lead is awaiting a reply from us or we from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceState {
    /// No outbound contact yet.
    New,
    /// At least one outbound sent, awaiting reply.
    Contacted,
    /// Inbound received after our last outbound.
    Responded,
    /// Funnel complete — no further automated outreach.
    Closed,
}

impl GovernanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GovernanceState::New => "new",
            GovernanceState::Contacted => "contacted",
            GovernanceState::Responded => "responded",
            GovernanceState::Closed => "closed",
        }
    }

    /// Parse from storage. Unknown values fall back to `New` so a bad row
    /// degrades to "eligible for first contact" instead of crashing a load.
    pub fn parse(s: &str) -> Self {
        match s {
            "contacted" => GovernanceState::Contacted,
            "responded" => GovernanceState::Responded,
            "closed" => GovernanceState::Closed,
            _ => GovernanceState::New,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GovernanceState::Closed)
    }
}

// ─── Leads & messages ──────────────────────────────────────

/// A lead under governance. Business CRUD owns everything else about the
/// lead; the engine only reads/writes the governance fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    /// Business niche this lead belongs to ("salon", "home-services", …).
    pub niche: String,
    /// Originating business status (new, booked, completed, …).
    pub business_status: String,
    pub governance_state: GovernanceState,
    /// Most recent outbound contact, if any.
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(id: &str, tenant_id: &str, niche: &str) -> Self {
        Self {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            niche: niche.to_string(),
            business_status: "new".to_string(),
            governance_state: GovernanceState::New,
            last_outbound_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Message direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "outbound" => Direction::Outbound,
            _ => Direction::Inbound,
        }
    }
}

/// One contact event on a lead. Append-only — the inbound rows are the
/// authoritative "has this customer already replied" signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub lead_id: String,
    pub direction: Direction,
    /// Optional short description (action name, channel receipt, note).
    pub detail: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn outbound(lead_id: &str, detail: Option<&str>, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id("msg"),
            lead_id: lead_id.to_string(),
            direction: Direction::Outbound,
            detail: detail.map(String::from),
            sent_at: at,
        }
    }

    pub fn inbound(lead_id: &str, detail: Option<&str>, at: DateTime<Utc>) -> Self {
        Self {
            id: new_id("msg"),
            lead_id: lead_id.to_string(),
            direction: Direction::Inbound,
            detail: detail.map(String::from),
            sent_at: at,
        }
    }
}

// ─── Actions & rules ──────────────────────────────────────

/// Closed set of outbound contact actions. Dispatch is by exhaustive match —
/// adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendReviewRequest,
    SendReferralOffer,
    UpdateLeadStatus,
    SendBookingConfirmation,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::SendReviewRequest,
        ActionKind::SendReferralOffer,
        ActionKind::UpdateLeadStatus,
        ActionKind::SendBookingConfirmation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SendReviewRequest => "send_review_request",
            ActionKind::SendReferralOffer => "send_referral_offer",
            ActionKind::UpdateLeadStatus => "update_lead_status",
            ActionKind::SendBookingConfirmation => "send_booking_confirmation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "send_review_request" => Some(ActionKind::SendReviewRequest),
            "send_referral_offer" => Some(ActionKind::SendReferralOffer),
            "update_lead_status" => Some(ActionKind::UpdateLeadStatus),
            "send_booking_confirmation" => Some(ActionKind::SendBookingConfirmation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An automation rule: when `trigger_event` fires for a lead in `niche`,
/// run `action` after `delay_minutes` — subject to the governance guards.
///
/// Rules are configured out-of-band (tenant/niche onboarding) and read-only
/// at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    /// `None` = system-wide rule (applies to every niche).
    pub niche: Option<String>,
    /// `None` = manual rule, never matched by the dispatcher.
    pub trigger_event: Option<String>,
    pub delay_minutes: u32,
    pub action: ActionKind,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AutomationRule {
    pub fn new(
        niche: Option<&str>,
        trigger_event: &str,
        delay_minutes: u32,
        action: ActionKind,
    ) -> Self {
        Self {
            id: new_id("rule"),
            niche: niche.map(String::from),
            trigger_event: Some(trigger_event.to_string()),
            delay_minutes,
            action,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Invariant: a niche-bound rule must name a trigger event. Manual rules
    /// (no trigger) and system rules (no niche) are each fine on their own.
    pub fn is_well_formed(&self) -> bool {
        self.niche.is_none() || self.trigger_event.is_some()
    }
}

// ─── Trigger events ──────────────────────────────────────

/// A named business occurrence that may activate zero or more automation
/// rules: booking status change, review submission, lead creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub name: String,
    pub lead_id: String,
    pub tenant_id: String,
    /// Niche hint from the producer. Falls back to the lead's niche.
    pub niche: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(name: &str, lead_id: &str, tenant_id: &str) -> Self {
        Self {
            name: name.to_string(),
            lead_id: lead_id.to_string(),
            tenant_id: tenant_id.to_string(),
            niche: None,
            payload: serde_json::Value::Null,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_niche(mut self, niche: &str) -> Self {
        self.niche = Some(niche.to_string());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ─── Audit log ──────────────────────────────────────

/// Entry kinds in the audit trail. `Decision` rows record the verdict of one
/// rule evaluation; `ActionFailed` rows record an executor failure after a
/// SEND verdict. Rows are never updated after insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditKind {
    Decision,
    ActionFailed,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Decision => "decision",
            AuditKind::ActionFailed => "action-failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "action-failed" => AuditKind::ActionFailed,
            _ => AuditKind::Decision,
        }
    }
}

/// Immutable audit row — the evidentiary record that the contact policy was
/// honored, written whether or not the action executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub tenant_id: String,
    pub lead_id: String,
    pub rule_id: String,
    pub action: ActionKind,
    pub kind: AuditKind,
    pub recorded_at: DateTime<Utc>,
    /// Decision, engine version, trigger event, disposition, error detail.
    pub data: serde_json::Value,
}

// ─── Scheduled jobs ──────────────────────────────────────

/// Scheduled job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
    /// Rule deactivated or lead gone before the delay elapsed.
    Stale,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Stale => "stale",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "done" => JobStatus::Done,
            "failed" => JobStatus::Failed,
            "stale" => JobStatus::Stale,
            _ => JobStatus::Pending,
        }
    }
}

/// A durable deferred execution: "re-run this rule for this lead at
/// `due_at`". Persisted so deferred SEND decisions survive restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub tenant_id: String,
    pub lead_id: String,
    pub niche: Option<String>,
    pub rule_id: String,
    pub trigger_event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub due_at: DateTime<Utc>,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl ScheduledJob {
    pub fn new(event: &TriggerEvent, rule: &AutomationRule, due_at: DateTime<Utc>) -> Self {
        Self {
            id: new_id("job"),
            tenant_id: event.tenant_id.clone(),
            lead_id: event.lead_id.clone(),
            niche: event.niche.clone(),
            rule_id: rule.id.clone(),
            trigger_event: event.name.clone(),
            payload: event.payload.clone(),
            due_at,
            status: JobStatus::Pending,
            attempts: 0,
            created_at: event.occurred_at,
        }
    }

    /// Reconstruct the trigger event this job was deferred from, for
    /// re-running the evaluation pipeline at execution time.
    pub fn to_event(&self) -> TriggerEvent {
        TriggerEvent {
            name: self.trigger_event.clone(),
            lead_id: self.lead_id.clone(),
            tenant_id: self.tenant_id.clone(),
            niche: self.niche.clone(),
            payload: self.payload.clone(),
            occurred_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn governance_state_roundtrip() {
        for state in [
            GovernanceState::New,
            GovernanceState::Contacted,
            GovernanceState::Responded,
            GovernanceState::Closed,
        ] {
            assert_eq!(GovernanceState::parse(state.as_str()), state);
        }
        // Garbage degrades to New, never panics.
        assert_eq!(GovernanceState::parse("zombie"), GovernanceState::New);

        assert!(GovernanceState::Closed.is_terminal());
        assert!(!GovernanceState::Contacted.is_terminal());
    }

    #[test]
    fn action_kind_roundtrip() {
        for action in ActionKind::ALL {
            assert_eq!(ActionKind::parse(action.as_str()), Some(action));
        }
        assert_eq!(ActionKind::parse("send_pigeon"), None);
    }

    #[test]
    fn rule_invariant() {
        let mut rule = AutomationRule::new(Some("salon"), "lead_created", 0, ActionKind::SendBookingConfirmation);
        assert!(rule.is_well_formed());

        // Niche binding without a trigger event is malformed.
        rule.trigger_event = None;
        assert!(!rule.is_well_formed());

        // A manual system rule (neither niche nor trigger) is fine.
        rule.niche = None;
        assert!(rule.is_well_formed());
    }

    #[test]
    fn job_event_roundtrip() {
        let event = TriggerEvent::new("booking_completed", "lead-1", "tenant-1")
            .with_niche("salon")
            .with_payload(serde_json::json!({"booking_id": "bk-9"}));
        let rule = AutomationRule::new(Some("salon"), "booking_completed", 120, ActionKind::SendReviewRequest);
        let job = ScheduledJob::new(&event, &rule, event.occurred_at + chrono::Duration::minutes(120));

        let rebuilt = job.to_event();
        assert_eq!(rebuilt.name, "booking_completed");
        assert_eq!(rebuilt.lead_id, "lead-1");
        assert_eq!(rebuilt.payload["booking_id"], "bk-9");
    }
}
