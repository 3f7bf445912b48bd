//! Error taxonomy for the governance engine.
//!
//! A governance Skip (already responded, cooldown not met) is a verdict, not
//! an error — it never appears here. Errors split into infrastructure
//! failures (storage, registry, missing lead) and action execution failures,
//! which the dispatcher treats differently: infrastructure errors are
//! isolated per rule, action failures block the post-send commit.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FollowgateError>;

/// All error cases the engine can surface.
#[derive(Error, Debug)]
pub enum FollowgateError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Registry error: {0}")]
    Registry(String),

    /// The side effect itself failed. The lead must be left untouched.
    #[error("Action execution failed: {0}")]
    Action(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FollowgateError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn action(msg: impl Into<String>) -> Self {
        Self::Action(msg.into())
    }

    /// Infrastructure errors are retryable and never block other rules.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::Action(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_errors_are_not_infrastructure() {
        assert!(!FollowgateError::action("smtp down").is_infrastructure());
        assert!(FollowgateError::storage("db locked").is_infrastructure());
        assert!(FollowgateError::LeadNotFound("lead-1".into()).is_infrastructure());
    }
}
