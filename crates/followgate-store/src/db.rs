//! SQLite persistence for leads, messages, rules, audit log, and scheduled
//! jobs. Timestamps are RFC 3339 text, JSON payloads live in TEXT columns.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use followgate_core::error::{FollowgateError, Result};
use followgate_core::model::{
    ActionKind, AuditEntry, AuditKind, AutomationRule, Direction, GovernanceState, JobStatus,
    Lead, Message, ScheduledJob,
};
use followgate_core::traits::{AuditSink, ContextProvider, JobStore, RuleSource};

/// Single-file governance database.
pub struct GovernanceDb {
    conn: Mutex<Connection>,
}

impl GovernanceDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| FollowgateError::Storage(format!("DB open: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FollowgateError::Storage(format!("DB open: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FollowgateError::Storage(format!("DB lock poisoned: {e}")))
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "
            -- Leads under governance
            CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                niche TEXT NOT NULL,
                business_status TEXT NOT NULL DEFAULT 'new',
                governance_state TEXT NOT NULL DEFAULT 'new',
                last_outbound_at TEXT,
                created_at TEXT NOT NULL
            );

            -- Contact history (append-only)
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                lead_id TEXT NOT NULL,
                direction TEXT NOT NULL,          -- 'inbound', 'outbound'
                detail TEXT,
                sent_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_lead ON messages(lead_id, sent_at);

            -- Automation rules (trigger -> action per niche)
            CREATE TABLE IF NOT EXISTS automation_rules (
                id TEXT PRIMARY KEY,
                niche TEXT,
                trigger_event TEXT,
                delay_minutes INTEGER NOT NULL DEFAULT 0,
                action TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Audit trail (append-only, never updated)
            CREATE TABLE IF NOT EXISTS automation_log (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                lead_id TEXT NOT NULL,
                rule_id TEXT NOT NULL,
                action TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'decision',   -- 'decision', 'action-failed'
                recorded_at TEXT NOT NULL,
                data TEXT NOT NULL                        -- JSON: decision, engine version, trigger
            );
            CREATE INDEX IF NOT EXISTS idx_log_lead ON automation_log(lead_id, recorded_at);

            -- Deferred executions (durable across restarts)
            CREATE TABLE IF NOT EXISTS scheduled_jobs (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                lead_id TEXT NOT NULL,
                niche TEXT,
                rule_id TEXT NOT NULL,
                trigger_event TEXT NOT NULL,
                payload TEXT NOT NULL DEFAULT 'null',
                due_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_due ON scheduled_jobs(status, due_at);
         ",
            )
            .map_err(|e| FollowgateError::Storage(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Leads ──────────────────────────────────────

    /// Insert or replace a lead.
    pub fn upsert_lead(&self, lead: &Lead) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO leads
                 (id, tenant_id, niche, business_status, governance_state, last_outbound_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    lead.id,
                    lead.tenant_id,
                    lead.niche,
                    lead.business_status,
                    lead.governance_state.as_str(),
                    lead.last_outbound_at.map(|t| t.to_rfc3339()),
                    lead.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FollowgateError::Storage(format!("Save lead: {e}")))?;
        Ok(())
    }

    /// Fetch a lead by id.
    pub fn lead(&self, lead_id: &str) -> Result<Option<Lead>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, niche, business_status, governance_state, last_outbound_at, created_at
                 FROM leads WHERE id = ?1",
            )
            .map_err(|e| FollowgateError::Storage(format!("Load lead: {e}")))?;
        let mut rows = stmt
            .query_map([lead_id], row_to_lead)
            .map_err(|e| FollowgateError::Storage(format!("Load lead: {e}")))?;
        match rows.next() {
            Some(Ok(lead)) => Ok(Some(lead)),
            Some(Err(e)) => Err(FollowgateError::Storage(format!("Load lead: {e}"))),
            None => Ok(None),
        }
    }

    /// All leads for a tenant (operator surface).
    pub fn leads_for_tenant(&self, tenant_id: &str) -> Result<Vec<Lead>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, niche, business_status, governance_state, last_outbound_at, created_at
                 FROM leads WHERE tenant_id = ?1 ORDER BY created_at",
            )
            .map_err(|e| FollowgateError::Storage(format!("List leads: {e}")))?;
        let rows = stmt
            .query_map([tenant_id], row_to_lead)
            .map_err(|e| FollowgateError::Storage(format!("List leads: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Delete a lead and its history (business CRUD calls this, not the engine).
    pub fn delete_lead(&self, lead_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM leads WHERE id = ?1", [lead_id])
            .map_err(|e| FollowgateError::Storage(format!("Delete lead: {e}")))?;
        conn.execute("DELETE FROM messages WHERE lead_id = ?1", [lead_id])
            .map_err(|e| FollowgateError::Storage(format!("Delete lead messages: {e}")))?;
        Ok(())
    }

    // ─── Messages ──────────────────────────────────────

    /// Append a message row. History is append-only; there is no update/delete.
    pub fn append_message(&self, message: &Message) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO messages (id, lead_id, direction, detail, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id,
                    message.lead_id,
                    message.direction.as_str(),
                    message.detail,
                    message.sent_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FollowgateError::Storage(format!("Append message: {e}")))?;
        Ok(())
    }

    /// Full history for a lead, oldest first.
    pub fn messages_for(&self, lead_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, lead_id, direction, detail, sent_at
                 FROM messages WHERE lead_id = ?1 ORDER BY sent_at",
            )
            .map_err(|e| FollowgateError::Storage(format!("Load messages: {e}")))?;
        let rows = stmt
            .query_map([lead_id], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    lead_id: row.get(1)?,
                    direction: Direction::parse(&row.get::<_, String>(2)?),
                    detail: row.get(3)?,
                    sent_at: parse_ts(&row.get::<_, String>(4)?),
                })
            })
            .map_err(|e| FollowgateError::Storage(format!("Load messages: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Governance commits ──────────────────────────────────────

    /// Commit a successful outbound send: message row + state + timestamp,
    /// all or nothing.
    pub fn commit_outbound_tx(
        &self,
        lead_id: &str,
        action: ActionKind,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| FollowgateError::Storage(format!("Begin commit: {e}")))?;

        let note = detail.map(String::from).unwrap_or_else(|| action.as_str().to_string());
        let message = Message::outbound(lead_id, Some(&note), at);
        tx.execute(
            "INSERT INTO messages (id, lead_id, direction, detail, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                message.id,
                message.lead_id,
                message.direction.as_str(),
                message.detail,
                message.sent_at.to_rfc3339(),
            ],
        )
        .map_err(|e| FollowgateError::Storage(format!("Commit outbound message: {e}")))?;

        let updated = tx
            .execute(
                "UPDATE leads SET governance_state = ?1, last_outbound_at = ?2 WHERE id = ?3",
                rusqlite::params![state.as_str(), at.to_rfc3339(), lead_id],
            )
            .map_err(|e| FollowgateError::Storage(format!("Commit outbound state: {e}")))?;
        if updated == 0 {
            // Roll back the message row as well.
            drop(tx);
            return Err(FollowgateError::LeadNotFound(lead_id.to_string()));
        }

        tx.commit()
            .map_err(|e| FollowgateError::Storage(format!("Commit outbound: {e}")))?;
        Ok(())
    }

    /// Commit an inbound reply: message row + state regression, all or nothing.
    pub fn commit_inbound_tx(
        &self,
        lead_id: &str,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| FollowgateError::Storage(format!("Begin commit: {e}")))?;

        let message = Message::inbound(lead_id, detail, at);
        tx.execute(
            "INSERT INTO messages (id, lead_id, direction, detail, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                message.id,
                message.lead_id,
                message.direction.as_str(),
                message.detail,
                message.sent_at.to_rfc3339(),
            ],
        )
        .map_err(|e| FollowgateError::Storage(format!("Commit inbound message: {e}")))?;

        let updated = tx
            .execute(
                "UPDATE leads SET governance_state = ?1 WHERE id = ?2",
                rusqlite::params![state.as_str(), lead_id],
            )
            .map_err(|e| FollowgateError::Storage(format!("Commit inbound state: {e}")))?;
        if updated == 0 {
            drop(tx);
            return Err(FollowgateError::LeadNotFound(lead_id.to_string()));
        }

        tx.commit()
            .map_err(|e| FollowgateError::Storage(format!("Commit inbound: {e}")))?;
        Ok(())
    }

    // ─── Automation rules ──────────────────────────────────────

    /// Save an automation rule.
    pub fn save_rule(&self, rule: &AutomationRule) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO automation_rules
                 (id, niche, trigger_event, delay_minutes, action, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    rule.id,
                    rule.niche,
                    rule.trigger_event,
                    rule.delay_minutes,
                    rule.action.as_str(),
                    rule.is_active as i32,
                    rule.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FollowgateError::Storage(format!("Save rule: {e}")))?;
        Ok(())
    }

    /// Load rules. `active_only` filters to `is_active = 1`.
    pub fn load_rules(&self, active_only: bool) -> Result<Vec<AutomationRule>> {
        let sql = if active_only {
            "SELECT id, niche, trigger_event, delay_minutes, action, is_active, created_at
             FROM automation_rules WHERE is_active = 1 ORDER BY created_at"
        } else {
            "SELECT id, niche, trigger_event, delay_minutes, action, is_active, created_at
             FROM automation_rules ORDER BY created_at"
        };
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| FollowgateError::Storage(format!("Load rules: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i32>(5)? != 0,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(|e| FollowgateError::Storage(format!("Load rules: {e}")))?;

        let mut rules = Vec::new();
        for (id, niche, trigger_event, delay_minutes, action_str, is_active, created_at) in
            rows.filter_map(|r| r.ok())
        {
            let Some(action) = ActionKind::parse(&action_str) else {
                tracing::warn!("⚠️ Rule {id} has unknown action '{action_str}', skipping");
                continue;
            };
            rules.push(AutomationRule {
                id,
                niche,
                trigger_event,
                delay_minutes,
                action,
                is_active,
                created_at: parse_ts(&created_at),
            });
        }
        Ok(rules)
    }

    /// Enable/disable a rule.
    pub fn set_rule_active(&self, rule_id: &str, active: bool) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE automation_rules SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![active as i32, rule_id],
            )
            .map_err(|e| FollowgateError::Storage(format!("Update rule: {e}")))?;
        Ok(())
    }

    // ─── Audit log ──────────────────────────────────────

    /// Append an audit entry. There is deliberately no update path.
    pub fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO automation_log
                 (id, tenant_id, lead_id, rule_id, action, kind, recorded_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    entry.id,
                    entry.tenant_id,
                    entry.lead_id,
                    entry.rule_id,
                    entry.action.as_str(),
                    entry.kind.as_str(),
                    entry.recorded_at.to_rfc3339(),
                    entry.data.to_string(),
                ],
            )
            .map_err(|e| FollowgateError::Storage(format!("Append audit: {e}")))?;
        Ok(())
    }

    /// Most recent audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, lead_id, rule_id, action, kind, recorded_at, data
                 FROM automation_log ORDER BY recorded_at DESC LIMIT ?1",
            )
            .map_err(|e| FollowgateError::Storage(format!("Load audit: {e}")))?;
        let rows = stmt
            .query_map([limit as i64], row_to_audit)
            .map_err(|e| FollowgateError::Storage(format!("Load audit: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Full audit history for one lead, oldest first.
    pub fn audit_for_lead(&self, lead_id: &str) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, lead_id, rule_id, action, kind, recorded_at, data
                 FROM automation_log WHERE lead_id = ?1 ORDER BY recorded_at",
            )
            .map_err(|e| FollowgateError::Storage(format!("Load audit: {e}")))?;
        let rows = stmt
            .query_map([lead_id], row_to_audit)
            .map_err(|e| FollowgateError::Storage(format!("Load audit: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Scheduled jobs ──────────────────────────────────────

    /// Persist a deferred execution.
    pub fn enqueue_job(&self, job: &ScheduledJob) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO scheduled_jobs
                 (id, tenant_id, lead_id, niche, rule_id, trigger_event, payload,
                  due_at, status, attempts, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    job.id,
                    job.tenant_id,
                    job.lead_id,
                    job.niche,
                    job.rule_id,
                    job.trigger_event,
                    job.payload.to_string(),
                    job.due_at.to_rfc3339(),
                    job.status.as_str(),
                    job.attempts,
                    job.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FollowgateError::Storage(format!("Enqueue job: {e}")))?;
        Ok(())
    }

    /// Pending jobs due at or before `now`, oldest first.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, lead_id, niche, rule_id, trigger_event, payload,
                        due_at, status, attempts, created_at
                 FROM scheduled_jobs WHERE status = 'pending' AND due_at <= ?1
                 ORDER BY due_at",
            )
            .map_err(|e| FollowgateError::Storage(format!("Load jobs: {e}")))?;
        let rows = stmt
            .query_map([now.to_rfc3339()], |row| {
                Ok(ScheduledJob {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    lead_id: row.get(2)?,
                    niche: row.get(3)?,
                    rule_id: row.get(4)?,
                    trigger_event: row.get(5)?,
                    payload: serde_json::from_str(&row.get::<_, String>(6)?)
                        .unwrap_or(serde_json::Value::Null),
                    due_at: parse_ts(&row.get::<_, String>(7)?),
                    status: JobStatus::parse(&row.get::<_, String>(8)?),
                    attempts: row.get(9)?,
                    created_at: parse_ts(&row.get::<_, String>(10)?),
                })
            })
            .map_err(|e| FollowgateError::Storage(format!("Load jobs: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Record the outcome of a job and bump its attempt counter.
    pub fn mark_job(&self, job_id: &str, status: JobStatus) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE scheduled_jobs SET status = ?1, attempts = attempts + 1 WHERE id = ?2",
                rusqlite::params![status.as_str(), job_id],
            )
            .map_err(|e| FollowgateError::Storage(format!("Mark job: {e}")))?;
        Ok(())
    }

    /// Count of still-pending jobs (operator surface).
    pub fn pending_job_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM scheduled_jobs WHERE status = 'pending'",
            [],
            |r| r.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(|e| FollowgateError::Storage(format!("Count jobs: {e}")))
    }
}

// ─── Trait seam implementations ──────────────────────────────────────

impl ContextProvider for GovernanceDb {
    fn lead(&self, lead_id: &str) -> Result<Option<Lead>> {
        GovernanceDb::lead(self, lead_id)
    }

    fn messages(&self, lead_id: &str) -> Result<Vec<Message>> {
        self.messages_for(lead_id)
    }

    fn commit_outbound(
        &self,
        lead_id: &str,
        action: ActionKind,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.commit_outbound_tx(lead_id, action, detail, state, at)
    }

    fn commit_inbound(
        &self,
        lead_id: &str,
        detail: Option<&str>,
        state: GovernanceState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.commit_inbound_tx(lead_id, detail, state, at)
    }
}

impl RuleSource for GovernanceDb {
    fn active_rules(&self) -> Result<Vec<AutomationRule>> {
        self.load_rules(true)
    }
}

impl AuditSink for GovernanceDb {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.append_audit(entry)
    }
}

impl JobStore for GovernanceDb {
    fn enqueue(&self, job: &ScheduledJob) -> Result<()> {
        self.enqueue_job(job)
    }

    fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>> {
        self.due_jobs(now)
    }

    fn mark(&self, job_id: &str, status: JobStatus) -> Result<()> {
        self.mark_job(job_id, status)
    }
}

// ─── Row helpers ──────────────────────────────────────

fn row_to_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        niche: row.get(2)?,
        business_status: row.get(3)?,
        governance_state: GovernanceState::parse(&row.get::<_, String>(4)?),
        last_outbound_at: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
        created_at: parse_ts(&row.get::<_, String>(6)?),
    })
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        lead_id: row.get(2)?,
        rule_id: row.get(3)?,
        action: ActionKind::parse(&row.get::<_, String>(4)?).unwrap_or(ActionKind::UpdateLeadStatus),
        kind: AuditKind::parse(&row.get::<_, String>(5)?),
        recorded_at: parse_ts(&row.get::<_, String>(6)?),
        data: serde_json::from_str(&row.get::<_, String>(7)?).unwrap_or_default(),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use followgate_core::model::new_id;

    #[test]
    fn open_and_migrate() {
        let db = GovernanceDb::open_in_memory().unwrap();
        assert!(db.load_rules(false).unwrap().is_empty());
        assert_eq!(db.pending_job_count().unwrap(), 0);
    }

    #[test]
    fn lead_roundtrip() {
        let db = GovernanceDb::open_in_memory().unwrap();
        let lead = Lead::new("lead-1", "tenant-1", "salon");
        db.upsert_lead(&lead).unwrap();

        let loaded = db.lead("lead-1").unwrap().unwrap();
        assert_eq!(loaded.governance_state, GovernanceState::New);
        assert_eq!(loaded.niche, "salon");
        assert!(loaded.last_outbound_at.is_none());
        assert!(db.lead("lead-missing").unwrap().is_none());
    }

    #[test]
    fn commit_outbound_updates_everything() {
        let db = GovernanceDb::open_in_memory().unwrap();
        db.upsert_lead(&Lead::new("lead-1", "tenant-1", "salon")).unwrap();

        let at = Utc::now();
        db.commit_outbound_tx(
            "lead-1",
            ActionKind::SendReviewRequest,
            Some("review link sent"),
            GovernanceState::Contacted,
            at,
        )
        .unwrap();

        let lead = db.lead("lead-1").unwrap().unwrap();
        assert_eq!(lead.governance_state, GovernanceState::Contacted);
        assert!(lead.last_outbound_at.is_some());

        let messages = db.messages_for("lead-1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, Direction::Outbound);
    }

    #[test]
    fn commit_outbound_missing_lead_leaves_no_message() {
        let db = GovernanceDb::open_in_memory().unwrap();
        let err = db
            .commit_outbound_tx(
                "lead-ghost",
                ActionKind::SendReviewRequest,
                None,
                GovernanceState::Contacted,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, FollowgateError::LeadNotFound(_)));
        // Transaction rolled back: no orphan message row.
        assert!(db.messages_for("lead-ghost").unwrap().is_empty());
    }

    #[test]
    fn commit_inbound_regresses_state() {
        let db = GovernanceDb::open_in_memory().unwrap();
        db.upsert_lead(&Lead::new("lead-1", "tenant-1", "salon")).unwrap();
        db.commit_outbound_tx(
            "lead-1",
            ActionKind::SendBookingConfirmation,
            None,
            GovernanceState::Contacted,
            Utc::now(),
        )
        .unwrap();

        db.commit_inbound_tx("lead-1", Some("customer reply"), GovernanceState::Responded, Utc::now())
            .unwrap();

        let lead = db.lead("lead-1").unwrap().unwrap();
        assert_eq!(lead.governance_state, GovernanceState::Responded);
        assert_eq!(db.messages_for("lead-1").unwrap().len(), 2);
    }

    #[test]
    fn rules_roundtrip_and_active_filter() {
        let db = GovernanceDb::open_in_memory().unwrap();
        let rule = AutomationRule::new(Some("salon"), "booking_completed", 120, ActionKind::SendReviewRequest);
        db.save_rule(&rule).unwrap();

        let mut inactive = AutomationRule::new(Some("salon"), "lead_created", 0, ActionKind::SendBookingConfirmation);
        inactive.is_active = false;
        db.save_rule(&inactive).unwrap();

        assert_eq!(db.load_rules(false).unwrap().len(), 2);
        let active = db.load_rules(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, rule.id);

        db.set_rule_active(&rule.id, false).unwrap();
        assert!(db.load_rules(true).unwrap().is_empty());
    }

    fn fixture_event() -> followgate_core::model::TriggerEvent {
        followgate_core::model::TriggerEvent::new("booking_completed", "lead-1", "tenant-1")
            .with_niche("salon")
    }

    #[test]
    fn jobs_due_filtering() {
        let db = GovernanceDb::open_in_memory().unwrap();
        let event = fixture_event();
        let rule = AutomationRule::new(Some("salon"), "booking_completed", 60, ActionKind::SendReviewRequest);

        let now = Utc::now();
        let due = ScheduledJob::new(&event, &rule, now - Duration::minutes(1));
        let not_due = ScheduledJob::new(&event, &rule, now + Duration::minutes(60));
        db.enqueue_job(&due).unwrap();
        db.enqueue_job(&not_due).unwrap();

        let picked = db.due_jobs(now).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, due.id);

        db.mark_job(&due.id, JobStatus::Done).unwrap();
        assert!(db.due_jobs(now).unwrap().is_empty());
        assert_eq!(db.pending_job_count().unwrap(), 1); // the future one
    }

    #[test]
    fn audit_append_and_query() {
        let db = GovernanceDb::open_in_memory().unwrap();
        let entry = AuditEntry {
            id: new_id("log"),
            tenant_id: "tenant-1".into(),
            lead_id: "lead-1".into(),
            rule_id: "rule-1".into(),
            action: ActionKind::SendReviewRequest,
            kind: AuditKind::Decision,
            recorded_at: Utc::now(),
            data: serde_json::json!({"decision": {"action": "SEND", "rule": "clear"}}),
        };
        db.append_audit(&entry).unwrap();

        let recent = db.recent_audit(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, AuditKind::Decision);
        assert_eq!(recent[0].data["decision"]["rule"], "clear");

        let for_lead = db.audit_for_lead("lead-1").unwrap();
        assert_eq!(for_lead.len(), 1);
        assert!(db.audit_for_lead("lead-2").unwrap().is_empty());
    }
}
