//! Per-lead governance state machine.
//!
//! The transition function is total and pure: unknown (state, event) pairs
//! return the current state unchanged, so a malformed input can never crash
//! the pipeline. The table itself is injected policy — hosts can replace or
//! extend the default lifecycle without touching the dispatcher.

use followgate_core::model::GovernanceState;
use serde::{Deserialize, Serialize};

/// Event kinds that drive governance transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceEvent {
    /// An outbound action committed successfully.
    OutboundSent,
    /// The customer replied.
    InboundReceived,
}

/// Transition policy: a list of (from, on, to) rules. First match wins;
/// no match keeps the current state.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    entries: Vec<(GovernanceState, GovernanceEvent, GovernanceState)>,
}

impl TransitionTable {
    /// Empty table — every state is a fixed point. Build up with `with_rule`.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with_rule(
        mut self,
        from: GovernanceState,
        on: GovernanceEvent,
        to: GovernanceState,
    ) -> Self {
        self.entries.push((from, on, to));
        self
    }

    /// Apply an event. Total: never panics, never errors.
    pub fn apply(&self, state: GovernanceState, event: GovernanceEvent) -> GovernanceState {
        self.entries
            .iter()
            .find(|(from, on, _)| *from == state && *on == event)
            .map(|(_, _, to)| *to)
            .unwrap_or(state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TransitionTable {
    /// The standard contact lifecycle. Outbound always moves toward
    /// "awaiting reply"; inbound always moves toward "awaiting new
    /// outreach". `Closed` has no entries and therefore never leaves.
    fn default() -> Self {
        use GovernanceEvent::{InboundReceived, OutboundSent};
        use GovernanceState::{Contacted, New, Responded};

        Self::empty()
            .with_rule(New, OutboundSent, Contacted)
            .with_rule(Contacted, OutboundSent, Contacted)
            .with_rule(Responded, OutboundSent, Contacted)
            .with_rule(New, InboundReceived, Responded)
            .with_rule(Contacted, InboundReceived, Responded)
            .with_rule(Responded, InboundReceived, Responded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GovernanceEvent::{InboundReceived, OutboundSent};
    use GovernanceState::{Closed, Contacted, New, Responded};

    #[test]
    fn default_lifecycle() {
        let table = TransitionTable::default();
        assert_eq!(table.apply(New, OutboundSent), Contacted);
        assert_eq!(table.apply(Contacted, InboundReceived), Responded);
        assert_eq!(table.apply(Responded, OutboundSent), Contacted);
        // Repeated outreach stays in Contacted.
        assert_eq!(table.apply(Contacted, OutboundSent), Contacted);
    }

    #[test]
    fn closed_is_terminal() {
        let table = TransitionTable::default();
        assert_eq!(table.apply(Closed, OutboundSent), Closed);
        assert_eq!(table.apply(Closed, InboundReceived), Closed);
    }

    #[test]
    fn unknown_pairs_are_fixed_points() {
        // An empty table never moves any state.
        let table = TransitionTable::empty();
        assert_eq!(table.apply(New, OutboundSent), New);
        assert_eq!(table.apply(Responded, InboundReceived), Responded);
    }

    #[test]
    fn custom_policy() {
        // A host that closes the funnel after the first reply.
        let table = TransitionTable::default().with_rule(Responded, InboundReceived, Closed);
        // Earlier default entry (Responded, InboundReceived) -> Responded wins:
        // first match, so custom overrides must be built from empty().
        assert_eq!(table.apply(Responded, InboundReceived), Responded);

        let strict = TransitionTable::empty()
            .with_rule(New, OutboundSent, Contacted)
            .with_rule(Contacted, InboundReceived, Closed);
        assert_eq!(strict.apply(Contacted, InboundReceived), Closed);
    }
}
