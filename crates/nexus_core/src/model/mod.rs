//! Domain model for club content, people and visitor feedback.
//!
//! # Responsibility
//! - Define canonical records consumed by catalog, team and inbox views.
//! - Validate records before they reach persistence.
//!
//! # Invariants
//! - Every record is identified by a stable string id.
//! - Validation errors carry the offending form field.

pub mod content;
pub mod feedback;
pub mod member;
pub mod org;
