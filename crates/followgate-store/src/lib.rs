//! # Followgate Store
//!
//! SQLite-backed persistence for the governance engine: leads, message
//! history, automation rules, the append-only audit log, and durable
//! scheduled jobs. One file on disk, survives restarts, no external services.
//!
//! `GovernanceDb` implements all the trait seams in `followgate_core::traits`,
//! so a single handle wires the whole engine.

pub mod db;

pub use db::GovernanceDb;
