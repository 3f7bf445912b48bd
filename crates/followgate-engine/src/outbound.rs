//! Outbound action adapters. The engine treats actions as opaque side
//! effects behind the `ActionExecutor` seam; these are the two adapters it
//! ships — a no-op logger and a webhook bridge to whatever service actually
//! renders and delivers the contact.

use async_trait::async_trait;

use followgate_core::error::{FollowgateError, Result};
use followgate_core::model::ActionKind;
use followgate_core::traits::{ActionContext, ActionExecutor, ActionReceipt};

/// Human phrasing per action kind. Exhaustive on purpose: a new action kind
/// does not compile until every dispatch site handles it.
pub fn describe(action: ActionKind) -> &'static str {
    match action {
        ActionKind::SendReviewRequest => "review request",
        ActionKind::SendReferralOffer => "referral offer",
        ActionKind::UpdateLeadStatus => "lead status update",
        ActionKind::SendBookingConfirmation => "booking confirmation",
    }
}

/// Logs the action and succeeds. Default wiring for dry runs and tests.
pub struct NullExecutor;

#[async_trait]
impl ActionExecutor for NullExecutor {
    async fn execute(&self, action: ActionKind, ctx: &ActionContext) -> Result<ActionReceipt> {
        tracing::info!("📣 [dry-run] {} for lead {}", describe(action), ctx.lead_id);
        Ok(ActionReceipt {
            detail: Some(format!("{action} (dry-run)")),
        })
    }
}

/// POSTs the action envelope to a configured automation endpoint and treats
/// a non-2xx response as an action failure.
pub struct WebhookExecutor {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookExecutor {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            headers: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }
}

#[async_trait]
impl ActionExecutor for WebhookExecutor {
    async fn execute(&self, action: ActionKind, ctx: &ActionContext) -> Result<ActionReceipt> {
        let body = serde_json::json!({
            "action": action.as_str(),
            "tenant_id": ctx.tenant_id,
            "lead_id": ctx.lead_id,
            "niche": ctx.niche,
            "trigger_event": ctx.trigger_event,
            "payload": ctx.payload,
        });

        let mut req = self
            .client
            .post(&self.url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(10));
        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FollowgateError::Action(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ {} delivered for lead {}", action, ctx.lead_id);
            Ok(ActionReceipt {
                detail: Some(format!("{action} via {}", self.url)),
            })
        } else {
            Err(FollowgateError::Action(format!(
                "Webhook error {} for {action}",
                resp.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActionContext {
        ActionContext {
            tenant_id: "tenant-1".into(),
            lead_id: "lead-1".into(),
            niche: Some("salon".into()),
            trigger_event: "lead_created".into(),
            payload: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn null_executor_always_succeeds() {
        let receipt = NullExecutor
            .execute(ActionKind::SendReviewRequest, &ctx())
            .await
            .unwrap();
        assert!(receipt.detail.unwrap().contains("send_review_request"));
    }

    #[tokio::test]
    async fn webhook_failure_is_an_action_error() {
        // Nothing listens here; the send itself must fail as Action, not panic.
        let exec = WebhookExecutor::new("http://127.0.0.1:1/hooks/outreach");
        let err = exec
            .execute(ActionKind::SendReferralOffer, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, FollowgateError::Action(_)));
        assert!(!err.is_infrastructure());
    }
}
