//! # cov-core
//!
//! Core types and pure lifecycle logic for Covenant.
//!
//! This crate provides everything about a contract's lifecycle that does not
//! touch storage:
//! - Entity structs (contracts, approvals, versions, audit entries)
//! - Status, track, and action enums
//! - The status transition table and available-action computation
//! - Approval track validation and the orchestrator's status fold
//! - Collaborator interfaces (permission checks, notifications)
//! - The changelog diff engine used by the version ledger
//! - Cross-cutting error types

pub mod actions;
pub mod approval_track;
pub mod changelog;
pub mod collaborators;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod orchestrator;
pub mod state_machine;
