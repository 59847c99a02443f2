//! Team member model.
//!
//! # Invariants
//! - `name` and `position` are non-blank.
//! - `email`, when present, has a `local@domain.tld` shape.
//! - A member is owned by exactly one org node or one roster listing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static ROSTER_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid roster year regex"));

/// Stable identifier of a team member.
pub type MemberId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    /// Role label, e.g. `President` or `Frontend Lead`.
    pub position: String,
    /// Season label such as `2024-25`.
    #[serde(default)]
    pub roster_year: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub portrait: Option<String>,
}

impl Member {
    pub fn new(
        id: impl Into<MemberId>,
        name: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: position.into(),
            roster_year: None,
            bio: None,
            email: None,
            linkedin: None,
            github: None,
            portrait: None,
        }
    }

    pub fn validate(&self) -> Result<(), MemberValidationError> {
        if self.id.trim().is_empty() {
            return Err(MemberValidationError::MissingField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(MemberValidationError::MissingField("name"));
        }
        if self.position.trim().is_empty() {
            return Err(MemberValidationError::MissingField("position"));
        }
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_RE.is_match(email.trim()) {
                return Err(MemberValidationError::InvalidEmail(email.to_string()));
            }
        }
        if let Some(year) = self.roster_year.as_deref() {
            if !ROSTER_YEAR_RE.is_match(year.trim()) {
                return Err(MemberValidationError::InvalidRosterYear(year.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    MissingField(&'static str),
    InvalidEmail(String),
    InvalidRosterYear(String),
}

impl MemberValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidEmail(_) => "email",
            Self::InvalidRosterYear(_) => "roster_year",
        }
    }
}

impl Display for MemberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "`{field}` is required"),
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::InvalidRosterYear(value) => {
                write!(f, "invalid roster year `{value}`; expected YYYY-YY")
            }
        }
    }
}

impl Error for MemberValidationError {}

#[cfg(test)]
mod tests {
    use super::{Member, MemberValidationError};

    #[test]
    fn validate_rejects_malformed_contact_fields() {
        let mut member = Member::new("1", "Alex Johnson", "President");
        member.email = Some("alex-at-nexusclub".to_string());
        assert!(matches!(
            member.validate(),
            Err(MemberValidationError::InvalidEmail(_))
        ));

        member.email = Some("alex@nexusclub.edu".to_string());
        member.roster_year = Some("2024".to_string());
        assert_eq!(member.validate().unwrap_err().field(), "roster_year");

        member.roster_year = Some("2024-25".to_string());
        assert!(member.validate().is_ok());
    }
}
