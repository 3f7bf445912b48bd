//! Niche starter packs — the default automation rules a tenant gets when
//! onboarding into a business niche. Delays are minutes.

use followgate_core::model::{ActionKind, AutomationRule};

pub const TRIGGER_LEAD_CREATED: &str = "lead_created";
pub const TRIGGER_BOOKING_COMPLETED: &str = "booking_completed";
pub const TRIGGER_REVIEW_RECEIVED: &str = "review_received";

pub const NICHE_SALON: &str = "salon";
pub const NICHE_HOME_SERVICES: &str = "home-services";
pub const NICHE_MED_SPA: &str = "med-spa";

/// Niches with a built-in starter pack.
pub fn known_niches() -> [&'static str; 3] {
    [NICHE_SALON, NICHE_HOME_SERVICES, NICHE_MED_SPA]
}

/// Default rule set for a niche. Unknown niches get an empty pack — rules
/// for them are configured by hand.
pub fn starter_pack(niche: &str) -> Vec<AutomationRule> {
    match niche {
        NICHE_SALON => vec![
            rule(niche, TRIGGER_LEAD_CREATED, 0, ActionKind::SendBookingConfirmation),
            // Review ask two hours after the appointment wraps.
            rule(niche, TRIGGER_BOOKING_COMPLETED, 120, ActionKind::SendReviewRequest),
            rule(niche, TRIGGER_REVIEW_RECEIVED, 1440, ActionKind::SendReferralOffer),
        ],
        NICHE_HOME_SERVICES => vec![
            rule(niche, TRIGGER_LEAD_CREATED, 0, ActionKind::SendBookingConfirmation),
            rule(niche, TRIGGER_BOOKING_COMPLETED, 0, ActionKind::UpdateLeadStatus),
            // Jobs run long; wait two days before asking for a review.
            rule(niche, TRIGGER_BOOKING_COMPLETED, 2880, ActionKind::SendReviewRequest),
            rule(niche, TRIGGER_REVIEW_RECEIVED, 1440, ActionKind::SendReferralOffer),
        ],
        NICHE_MED_SPA => vec![
            rule(niche, TRIGGER_LEAD_CREATED, 0, ActionKind::SendBookingConfirmation),
            rule(niche, TRIGGER_BOOKING_COMPLETED, 1440, ActionKind::SendReviewRequest),
            rule(niche, TRIGGER_REVIEW_RECEIVED, 4320, ActionKind::SendReferralOffer),
        ],
        _ => Vec::new(),
    }
}

fn rule(niche: &str, trigger: &str, delay_minutes: u32, action: ActionKind) -> AutomationRule {
    AutomationRule::new(Some(niche), trigger, delay_minutes, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_niche_has_a_pack() {
        for niche in known_niches() {
            let pack = starter_pack(niche);
            assert!(!pack.is_empty(), "{niche} pack is empty");
            for rule in &pack {
                assert!(rule.is_well_formed());
                assert!(rule.is_active);
                assert_eq!(rule.niche.as_deref(), Some(niche));
            }
        }
    }

    #[test]
    fn unknown_niche_gets_nothing() {
        assert!(starter_pack("barbershop").is_empty());
    }
}
