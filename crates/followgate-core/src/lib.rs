//! # Followgate Core
//!
//! Shared foundation for the Followgate governance engine: the domain model
//! (leads, messages, automation rules, audit entries, scheduled jobs), the
//! error taxonomy, the TOML configuration system, and the trait seams through
//! which the engine talks to its collaborators (storage, action execution,
//! rule configuration).
//!
//! Nothing in this crate performs I/O except `config` (reads/writes the
//! config file). Everything else is plain data and contracts.

pub mod config;
pub mod error;
pub mod model;
pub mod traits;

pub use config::FollowgateConfig;
pub use error::{FollowgateError, Result};
pub use model::{
    ActionKind, AuditEntry, AuditKind, AutomationRule, Direction, GovernanceState, JobStatus,
    Lead, Message, ScheduledJob, TriggerEvent,
};
pub use traits::{
    ActionContext, ActionExecutor, ActionReceipt, AuditSink, ContextProvider, JobStore, RuleSource,
};
