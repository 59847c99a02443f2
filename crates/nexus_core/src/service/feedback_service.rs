//! Visitor feedback inbox service.

use crate::model::feedback::{Feedback, FeedbackId, FeedbackValidationError};
use crate::repo::content_repo::RepoError;
use crate::repo::feedback_repo::{FeedbackFilter, FeedbackRepository};
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum FeedbackError {
    NotFound(FeedbackId),
    Validation(FeedbackValidationError),
    Repo(RepoError),
}

impl Display for FeedbackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "feedback not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FeedbackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for FeedbackError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            RepoError::InvalidFeedback(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<FeedbackValidationError> for FeedbackError {
    fn from(value: FeedbackValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct FeedbackService<R: FeedbackRepository> {
    repo: R,
}

impl<R: FeedbackRepository> FeedbackService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores one contact-form submission as unread.
    pub fn submit(
        &self,
        subject: &str,
        message: &str,
        is_join_interest: bool,
        now: DateTime<Utc>,
    ) -> Result<FeedbackId, FeedbackError> {
        let feedback = Feedback::submit(subject, message, is_join_interest, now)?;
        self.repo.submit(&feedback)?;
        info!(
            "event=feedback_submit module=feedback status=ok id={} join_interest={}",
            feedback.id, feedback.is_join_interest
        );
        Ok(feedback.id)
    }

    pub fn inbox(&self, filter: &FeedbackFilter) -> Result<Vec<Feedback>, FeedbackError> {
        self.repo.list(filter).map_err(Into::into)
    }

    pub fn mark_read(&self, id: &str) -> Result<(), FeedbackError> {
        self.repo.mark_read(id).map_err(Into::into)
    }

    pub fn delete(&self, id: &str) -> Result<(), FeedbackError> {
        self.repo.delete(id)?;
        info!("event=feedback_delete module=feedback status=ok id={id}");
        Ok(())
    }

    pub fn unread_count(&self) -> Result<u64, FeedbackError> {
        self.repo.unread_count().map_err(Into::into)
    }
}
