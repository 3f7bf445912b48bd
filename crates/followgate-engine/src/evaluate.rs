//! Decision evaluator — a pure verdict over timing and reply history.
//!
//! `now` is an explicit parameter: given identical inputs the evaluator
//! always returns the same decision, so every verdict in the audit trail can
//! be replayed in a test.

use chrono::{DateTime, Duration, Utc};
use followgate_core::model::GovernanceState;
use serde::{Deserialize, Serialize};

/// Named reason the already-responded guard fired.
pub const RULE_ALREADY_RESPONDED: &str = "already-responded";
/// Named reason the cooldown guard fired.
pub const RULE_TOO_SOON: &str = "too-soon";
/// Named reason for the default SEND verdict.
pub const RULE_CLEAR: &str = "clear";

/// SEND or SKIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Send,
    Skip,
}

/// The outcome of evaluating one rule against one lead: the verdict plus the
/// named guard that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    #[serde(rename = "action")]
    pub verdict: Verdict,
    pub rule: &'static str,
}

impl Decision {
    fn send() -> Self {
        Self {
            verdict: Verdict::Send,
            rule: RULE_CLEAR,
        }
    }

    fn skip(rule: &'static str) -> Self {
        Self {
            verdict: Verdict::Skip,
            rule,
        }
    }

    pub fn is_send(&self) -> bool {
        self.verdict == Verdict::Send
    }
}

/// Governance-relevant view of a lead at evaluation time.
#[derive(Debug, Clone)]
pub struct LeadSnapshot {
    pub state: GovernanceState,
    pub last_outbound_at: Option<DateTime<Utc>>,
    /// Timestamps of every inbound message, oldest first.
    pub inbound_times: Vec<DateTime<Utc>>,
}

/// Evaluate one rule against a lead snapshot. Guard precedence, first match
/// wins:
///
/// 1. already-responded — an inbound message newer than the last outbound
///    (or any inbound when nothing was ever sent) means the customer has
///    engaged; a scheduled follow-up would be noise.
/// 2. too-soon — the configured cooldown since the last outbound has not
///    elapsed yet.
/// 3. clear — SEND.
///
/// First-ever contact (`last_outbound_at` = None, no inbound) is always SEND
/// regardless of `now`.
pub fn evaluate(snapshot: &LeadSnapshot, delay_minutes: u32, now: DateTime<Utc>) -> Decision {
    match snapshot.last_outbound_at {
        Some(last_outbound) => {
            if snapshot.inbound_times.iter().any(|t| *t > last_outbound) {
                return Decision::skip(RULE_ALREADY_RESPONDED);
            }
            if now - last_outbound < Duration::minutes(i64::from(delay_minutes)) {
                return Decision::skip(RULE_TOO_SOON);
            }
        }
        None => {
            if !snapshot.inbound_times.is_empty() {
                return Decision::skip(RULE_ALREADY_RESPONDED);
            }
        }
    }
    Decision::send()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
    }

    fn snapshot(
        last_outbound_at: Option<DateTime<Utc>>,
        inbound_times: Vec<DateTime<Utc>>,
    ) -> LeadSnapshot {
        LeadSnapshot {
            state: GovernanceState::Contacted,
            last_outbound_at,
            inbound_times,
        }
    }

    #[test]
    fn first_contact_always_sends() {
        let snap = snapshot(None, vec![]);
        for hour in [0, 9, 23] {
            let decision = evaluate(&snap, 60, at(hour, 0));
            assert_eq!(decision.verdict, Verdict::Send);
            assert_eq!(decision.rule, RULE_CLEAR);
        }
    }

    #[test]
    fn inbound_after_outbound_skips() {
        let snap = snapshot(Some(at(9, 0)), vec![at(9, 30)]);
        // Skip for any `now` at or after the reply.
        for now in [at(9, 30), at(12, 0), at(23, 59)] {
            let decision = evaluate(&snap, 60, now);
            assert_eq!(decision.verdict, Verdict::Skip);
            assert_eq!(decision.rule, RULE_ALREADY_RESPONDED);
        }
    }

    #[test]
    fn inbound_with_no_outbound_skips() {
        // Customer reached out first — never auto-contact over their message.
        let snap = snapshot(None, vec![at(8, 0)]);
        let decision = evaluate(&snap, 0, at(20, 0));
        assert_eq!(decision.rule, RULE_ALREADY_RESPONDED);
    }

    #[test]
    fn old_inbound_does_not_block() {
        // Reply older than the last outbound: we contacted them after, so the
        // already-responded guard must not fire.
        let snap = snapshot(Some(at(10, 0)), vec![at(9, 0)]);
        let decision = evaluate(&snap, 60, at(12, 0));
        assert_eq!(decision.verdict, Verdict::Send);
    }

    #[test]
    fn cooldown_guard_boundaries() {
        let snap = snapshot(Some(at(9, 0)), vec![]);

        let decision = evaluate(&snap, 60, at(9, 30));
        assert_eq!(decision.verdict, Verdict::Skip);
        assert_eq!(decision.rule, RULE_TOO_SOON);

        // Exactly at the boundary the cooldown has elapsed.
        assert_eq!(evaluate(&snap, 60, at(10, 0)).verdict, Verdict::Send);
        assert_eq!(evaluate(&snap, 60, at(10, 1)).verdict, Verdict::Send);
    }

    #[test]
    fn zero_delay_never_too_soon() {
        let snap = snapshot(Some(at(9, 0)), vec![]);
        assert_eq!(evaluate(&snap, 0, at(9, 0)).verdict, Verdict::Send);
    }

    #[test]
    fn already_responded_wins_over_too_soon() {
        // Both guards would fire; precedence picks already-responded.
        let snap = snapshot(Some(at(9, 0)), vec![at(9, 10)]);
        let decision = evaluate(&snap, 60, at(9, 20));
        assert_eq!(decision.rule, RULE_ALREADY_RESPONDED);
    }

    #[test]
    fn deterministic() {
        let snap = snapshot(Some(at(9, 0)), vec![at(8, 0), at(9, 5)]);
        let first = evaluate(&snap, 45, at(9, 40));
        for _ in 0..10 {
            assert_eq!(evaluate(&snap, 45, at(9, 40)), first);
        }
    }
}
