//! Context loader — assembles the evaluator's input from lead and
//! message-history storage.

use std::sync::Arc;

use followgate_core::error::{FollowgateError, Result};
use followgate_core::model::{Direction, Lead};
use followgate_core::traits::ContextProvider;

use crate::evaluate::LeadSnapshot;

/// Thin façade over the storage seam: loads the lead's governance fields and
/// full message history, filtered down to what the evaluator needs.
#[derive(Clone)]
pub struct ContextLoader {
    provider: Arc<dyn ContextProvider>,
}

impl ContextLoader {
    pub fn new(provider: Arc<dyn ContextProvider>) -> Self {
        Self { provider }
    }

    /// Load a lead and its evaluation snapshot. A missing lead is an
    /// infrastructure error (`LeadNotFound`) — the caller aborts that rule's
    /// pipeline only, never the whole dispatch batch.
    pub fn load(&self, lead_id: &str) -> Result<(Lead, LeadSnapshot)> {
        let lead = self
            .provider
            .lead(lead_id)?
            .ok_or_else(|| FollowgateError::LeadNotFound(lead_id.to_string()))?;

        let messages = self.provider.messages(lead_id)?;
        let inbound_times = messages
            .iter()
            .filter(|m| m.direction == Direction::Inbound)
            .map(|m| m.sent_at)
            .collect();

        let snapshot = LeadSnapshot {
            state: lead.governance_state,
            last_outbound_at: lead.last_outbound_at,
            inbound_times,
        };
        Ok((lead, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use followgate_core::model::{ActionKind, GovernanceState, Lead};
    use followgate_store::GovernanceDb;

    #[test]
    fn snapshot_filters_to_inbound() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        db.upsert_lead(&Lead::new("lead-1", "tenant-1", "salon")).unwrap();
        db.commit_outbound_tx(
            "lead-1",
            ActionKind::SendBookingConfirmation,
            None,
            GovernanceState::Contacted,
            Utc::now(),
        )
        .unwrap();
        db.commit_inbound_tx("lead-1", Some("reply"), GovernanceState::Responded, Utc::now())
            .unwrap();

        let loader = ContextLoader::new(db);
        let (lead, snapshot) = loader.load("lead-1").unwrap();
        assert_eq!(lead.governance_state, GovernanceState::Responded);
        assert_eq!(snapshot.inbound_times.len(), 1);
        assert!(snapshot.last_outbound_at.is_some());
    }

    #[test]
    fn missing_lead_is_infrastructure_error() {
        let db = Arc::new(GovernanceDb::open_in_memory().unwrap());
        let loader = ContextLoader::new(db);
        let err = loader.load("lead-ghost").unwrap_err();
        assert!(matches!(err, FollowgateError::LeadNotFound(_)));
        assert!(err.is_infrastructure());
    }
}
