//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into view-level APIs.
//! - Translate repository errors into the not-found / validation /
//!   transient taxonomy the views render.

pub mod catalog;
pub mod feedback_service;
pub mod team_service;
