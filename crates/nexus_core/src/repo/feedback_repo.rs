//! Visitor feedback inbox repository.
//!
//! # Invariants
//! - Listing is newest first (`submitted_at DESC, seq DESC`).
//! - `mark_read` is idempotent.

use crate::model::feedback::{Feedback, FeedbackStatus};
use crate::repo::content_repo::{conflict_or_db, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

/// Inbox filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    /// Only submissions asking to join the club.
    pub join_interest_only: bool,
}

pub trait FeedbackRepository {
    fn submit(&self, feedback: &Feedback) -> RepoResult<()>;
    fn list(&self, filter: &FeedbackFilter) -> RepoResult<Vec<Feedback>>;
    fn mark_read(&self, id: &str) -> RepoResult<()>;
    fn delete(&self, id: &str) -> RepoResult<()>;
    fn unread_count(&self) -> RepoResult<u64>;
}

pub struct SqliteFeedbackRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeedbackRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn submit(&self, feedback: &Feedback) -> RepoResult<()> {
        feedback.validate()?;
        self.conn
            .execute(
                "INSERT INTO feedback (id, subject, message, submitted_at, is_join_interest, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    feedback.id.as_str(),
                    feedback.subject.as_str(),
                    feedback.message.as_str(),
                    feedback.submitted_at.timestamp_millis(),
                    i64::from(feedback.is_join_interest),
                    feedback.status.as_str(),
                ],
            )
            .map_err(|err| conflict_or_db(err, "feedback", &feedback.id))?;
        Ok(())
    }

    fn list(&self, filter: &FeedbackFilter) -> RepoResult<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject, message, submitted_at, is_join_interest, status
             FROM feedback
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 = 0 OR is_join_interest = 1)
             ORDER BY submitted_at DESC, seq DESC;",
        )?;
        let mut rows = stmt.query(params![
            filter.status.map(FeedbackStatus::as_str),
            i64::from(filter.join_interest_only),
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_feedback_row(row)?);
        }
        Ok(items)
    }

    fn mark_read(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE feedback SET status = 'read' WHERE id = ?1;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("feedback", id));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM feedback WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("feedback", id));
        }
        Ok(())
    }

    fn unread_count(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM feedback WHERE status = 'new';",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    let submitted_ms: i64 = row.get("submitted_at")?;
    let submitted_at = DateTime::<Utc>::from_timestamp_millis(submitted_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid submitted_at `{submitted_ms}` in feedback.submitted_at"
        ))
    })?;
    let status_text: String = row.get("status")?;
    let status = FeedbackStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in feedback.status"))
    })?;
    Ok(Feedback {
        id: row.get("id")?,
        subject: row.get("subject")?,
        message: row.get("message")?,
        submitted_at,
        is_join_interest: row.get::<_, i64>("is_join_interest")? == 1,
        status,
    })
}
