//! Claim resolution decision engine.
//!
//! Classifies carrier settlement offers against independently generated estimates, scores
//! whether a claim is worth pursuing, and drives the homeowner-approved escalation of a
//! claim to a legal partner.

pub mod clock;
pub mod config;
pub mod error;
pub mod llm;
pub mod store;
pub mod telemetry;
pub mod workflows;
