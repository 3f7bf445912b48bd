//! Audit logger — append-only evidence of every governance evaluation.
//!
//! Exactly one decision entry per rule evaluation, written before any side
//! effect, so a crash between logging and sending still leaves proof the
//! evaluation happened. Executor failures get their own `action-failed`
//! entry; rows are never updated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use followgate_core::error::{FollowgateError, Result};
use followgate_core::model::{AuditEntry, AuditKind, AutomationRule, TriggerEvent, new_id};

use crate::evaluate::Decision;

/// Engine version stamped into every audit entry.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the dispatcher did with the verdict at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disposition {
    /// SEND verdict, executing now.
    Dispatched,
    /// SEND verdict, deferred to a durable scheduled job.
    Deferred,
    /// SKIP verdict.
    Skipped,
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn followgate_core::traits::AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn followgate_core::traits::AuditSink>) -> Self {
        Self { sink }
    }

    /// Record the verdict of one rule evaluation.
    pub fn record_decision(
        &self,
        event: &TriggerEvent,
        rule: &AutomationRule,
        decision: &Decision,
        disposition: Disposition,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = AuditEntry {
            id: new_id("log"),
            tenant_id: event.tenant_id.clone(),
            lead_id: event.lead_id.clone(),
            rule_id: rule.id.clone(),
            action: rule.action,
            kind: AuditKind::Decision,
            recorded_at: at,
            data: serde_json::json!({
                "decision": decision,
                "disposition": disposition,
                "engine_version": ENGINE_VERSION,
                "trigger_event": event.name,
            }),
        };
        self.sink.append(&entry)
    }

    /// Record an executor failure after a SEND verdict. A distinct entry,
    /// not an update — the decision row stays untouched.
    pub fn record_failure(
        &self,
        event: &TriggerEvent,
        rule: &AutomationRule,
        error: &FollowgateError,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = AuditEntry {
            id: new_id("log"),
            tenant_id: event.tenant_id.clone(),
            lead_id: event.lead_id.clone(),
            rule_id: rule.id.clone(),
            action: rule.action,
            kind: AuditKind::ActionFailed,
            recorded_at: at,
            data: serde_json::json!({
                "error": error.to_string(),
                "engine_version": ENGINE_VERSION,
                "trigger_event": event.name,
            }),
        };
        self.sink.append(&entry)
    }
}
