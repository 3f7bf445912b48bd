//! # Followgate Engine
//!
//! Response-aware follow-up governance. Given an automation rule fired by a
//! business event, decide whether the outbound contact should actually
//! execute — considering elapsed time and whether the customer already
//! replied — then durably record the decision and advance the per-lead
//! state machine.
//!
//! ## Architecture
//! ```text
//! TriggerEvent (booking_completed, review_received, lead_created, …)
//!   → GovernanceEngine.dispatch
//!     → RuleRegistry: active rules for (trigger, niche)
//!     → per rule, under the lead's lane (single writer per lead):
//!       → ContextLoader: governance state + reply history
//!       → evaluate: already-responded / too-soon / clear
//!       → AuditLogger: one decision row, before any side effect
//!       → Skip: done
//!       → Send, delay > 0: durable ScheduledJob (picked up by the poll loop)
//!       → Send: ActionExecutor → commit message + state + last_outbound_at
//! ```
//!
//! Everything mutable is injected (storage, rules, executor) — there are no
//! module-level singletons, and the evaluator itself is a pure function.

pub mod audit;
pub mod context;
pub mod dispatch;
pub mod evaluate;
pub mod lanes;
pub mod outbound;
pub mod packs;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use audit::{AuditLogger, Disposition, ENGINE_VERSION};
pub use context::ContextLoader;
pub use dispatch::{DispatchSummary, GovernanceEngine, OutcomeStatus, RuleOutcome};
pub use evaluate::{Decision, LeadSnapshot, Verdict, evaluate};
pub use lanes::LeadLanes;
pub use outbound::{NullExecutor, WebhookExecutor};
pub use registry::RuleRegistry;
pub use scheduler::{DelayScheduler, run_scheduler};
pub use state::{GovernanceEvent, TransitionTable};
