//! Core detection logic.
//!
//! This module contains:
//! - Heuristics: independent tri-state tests
//! - Workflow: per-category evaluation and decision rules
//! - Engine: the `Detector` that routes documents to workflows
//! - AuditLog: append-only log of results
//! - Thresholds: tunable limits

pub mod audit_log;
pub mod engine;
pub mod heuristics;
pub mod thresholds;
pub mod workflow;

// Re-export commonly used types
pub use audit_log::{digest_file, hash_bytes, AuditEntry, AuditLog};
pub use engine::{DetectError, Detector};
pub use heuristics::Availability;
pub use thresholds::{Thresholds, Timeouts};
pub use workflow::{
    decide_editable, decide_fixed_layout, refine_with_logos, EvaluationContext,
};
