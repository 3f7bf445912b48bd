//! Automation rule registry — maps (trigger event, niche) to active rules.
//!
//! Read-mostly: rules change at onboarding time, not at dispatch time, so
//! the registry keeps an in-memory cache and reloads it from the source on
//! demand. Safe to share across tasks.

use std::sync::{Arc, RwLock};

use followgate_core::error::Result;
use followgate_core::model::AutomationRule;
use followgate_core::traits::RuleSource;

pub struct RuleRegistry {
    source: Arc<dyn RuleSource>,
    rules: RwLock<Vec<AutomationRule>>,
}

impl RuleRegistry {
    /// Create an empty registry. Call `reload` before the first dispatch.
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            source,
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Reload the cache from the source, dropping malformed rules (a niche
    /// binding requires a trigger event). Returns how many rules are live.
    pub fn reload(&self) -> Result<usize> {
        let loaded = self.source.active_rules()?;
        let mut kept = Vec::with_capacity(loaded.len());
        for rule in loaded {
            if !rule.is_well_formed() {
                tracing::warn!(
                    "⚠️ Dropping rule {}: niche binding without a trigger event",
                    rule.id
                );
                continue;
            }
            kept.push(rule);
        }
        let count = kept.len();
        *self.write() = kept;
        tracing::debug!("🔄 Rule registry reloaded: {count} rules");
        Ok(count)
    }

    /// Active rules matching a trigger for a lead's niche. Rules without a
    /// niche binding are system-wide and match every niche; rules without a
    /// trigger event are manual and never match.
    pub fn matching(&self, trigger: &str, niche: Option<&str>) -> Vec<AutomationRule> {
        self.read()
            .iter()
            .filter(|rule| rule.is_active)
            .filter(|rule| rule.trigger_event.as_deref() == Some(trigger))
            .filter(|rule| match (&rule.niche, niche) {
                (None, _) => true,
                (Some(bound), Some(actual)) => bound == actual,
                (Some(_), None) => false,
            })
            .cloned()
            .collect()
    }

    /// Look up a live rule by id (scheduled-job re-validation: a rule that
    /// was deactivated after scheduling no longer resolves here).
    pub fn find(&self, rule_id: &str) -> Option<AutomationRule> {
        self.read().iter().find(|r| r.id == rule_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<AutomationRule>> {
        self.rules.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<AutomationRule>> {
        self.rules.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followgate_core::model::ActionKind;

    struct FixedSource(Vec<AutomationRule>);

    impl RuleSource for FixedSource {
        fn active_rules(&self) -> Result<Vec<AutomationRule>> {
            Ok(self.0.clone())
        }
    }

    fn registry(rules: Vec<AutomationRule>) -> RuleRegistry {
        let reg = RuleRegistry::new(Arc::new(FixedSource(rules)));
        reg.reload().unwrap();
        reg
    }

    #[test]
    fn matching_respects_trigger_and_niche() {
        let salon = AutomationRule::new(Some("salon"), "booking_completed", 120, ActionKind::SendReviewRequest);
        let medspa = AutomationRule::new(Some("med-spa"), "booking_completed", 240, ActionKind::SendReviewRequest);
        let system = AutomationRule::new(None, "booking_completed", 0, ActionKind::UpdateLeadStatus);
        let reg = registry(vec![salon.clone(), medspa, system.clone()]);

        let matched = reg.matching("booking_completed", Some("salon"));
        let ids: Vec<&str> = matched.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&salon.id.as_str()));
        assert!(ids.contains(&system.id.as_str()));
        assert_eq!(matched.len(), 2);

        // Unknown niche still gets system-wide rules.
        assert_eq!(reg.matching("booking_completed", None).len(), 1);
        assert!(reg.matching("lead_created", Some("salon")).is_empty());
    }

    #[test]
    fn malformed_rules_are_dropped_at_reload() {
        let mut bad = AutomationRule::new(Some("salon"), "lead_created", 0, ActionKind::SendBookingConfirmation);
        bad.trigger_event = None; // niche binding without trigger

        let good = AutomationRule::new(Some("salon"), "lead_created", 0, ActionKind::SendBookingConfirmation);
        let reg = registry(vec![bad, good.clone()]);
        assert_eq!(reg.len(), 1);
        assert!(reg.find(&good.id).is_some());
    }

    #[test]
    fn manual_rules_never_match() {
        let mut manual = AutomationRule::new(None, "ignored", 0, ActionKind::SendReferralOffer);
        manual.trigger_event = None;
        let reg = registry(vec![manual]);
        assert_eq!(reg.len(), 1);
        assert!(reg.matching("ignored", Some("salon")).is_empty());
    }
}
