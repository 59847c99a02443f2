//! Visitor feedback model.
//!
//! # Invariants
//! - `subject` and `message` are non-blank.
//! - Status moves `new -> read` only; there is no way back to `new`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type FeedbackId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    New,
    Read,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(Self::New),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// One contact-form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub subject: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
    /// Sender asked to join the club.
    #[serde(default)]
    pub is_join_interest: bool,
    pub status: FeedbackStatus,
}

impl Feedback {
    /// Creates a new unread submission with a generated id.
    pub fn submit(
        subject: impl Into<String>,
        message: impl Into<String>,
        is_join_interest: bool,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, FeedbackValidationError> {
        let feedback = Self {
            id: Uuid::new_v4().to_string(),
            subject: subject.into().trim().to_string(),
            message: message.into().trim().to_string(),
            submitted_at,
            is_join_interest,
            status: FeedbackStatus::New,
        };
        feedback.validate()?;
        Ok(feedback)
    }

    pub fn validate(&self) -> Result<(), FeedbackValidationError> {
        if self.subject.trim().is_empty() {
            return Err(FeedbackValidationError::MissingField("subject"));
        }
        if self.message.trim().is_empty() {
            return Err(FeedbackValidationError::MissingField("message"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackValidationError {
    MissingField(&'static str),
}

impl Display for FeedbackValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "`{field}` is required"),
        }
    }
}

impl Error for FeedbackValidationError {}
