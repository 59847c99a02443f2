//! Repository layer: the data provider behind every public view.
//!
//! # Responsibility
//! - Define use-case oriented read/write contracts.
//! - Isolate SQLite query details from catalog and view logic.
//!
//! # Invariants
//! - Write paths validate records before persistence.
//! - Missing rows surface as `RepoError::NotFound`, never as panics.

pub mod content_repo;
pub mod feedback_repo;
pub mod team_repo;
