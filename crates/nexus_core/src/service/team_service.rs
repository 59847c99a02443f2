//! Team directory use-case service.
//!
//! # Responsibility
//! - Serve roster listings by season and the department tree.
//! - Validate member writes above the repository.

use crate::model::member::{Member, MemberId, MemberValidationError};
use crate::model::org::{OrgNode, OrgTreeError};
use crate::repo::content_repo::RepoError;
use crate::repo::team_repo::TeamRepository;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum TeamServiceError {
    MemberNotFound(MemberId),
    /// No department tree has been stored yet.
    OrgTreeMissing,
    Validation(MemberValidationError),
    /// The write would leave the department tree invalid.
    OrgTree(OrgTreeError),
    TransientFetch(RepoError),
    Repo(RepoError),
}

impl TeamServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch(_))
    }
}

impl Display for TeamServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::OrgTreeMissing => write!(f, "no org tree has been published"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::OrgTree(err) => write!(f, "{err}"),
            Self::TransientFetch(err) => write!(f, "team provider unavailable: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TeamServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::OrgTree(err) => Some(err),
            Self::TransientFetch(err) | Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TeamServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "org tree", .. } => Self::OrgTreeMissing,
            RepoError::NotFound { id, .. } => Self::MemberNotFound(id),
            RepoError::InvalidMember(err) => Self::Validation(err),
            RepoError::InvalidOrgTree(err) => Self::OrgTree(err),
            other if other.is_transient() => Self::TransientFetch(other),
            other => Self::Repo(other),
        }
    }
}

/// Team directory facade.
pub struct TeamService<R: TeamRepository> {
    repo: R,
}

impl<R: TeamRepository> TeamService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Members of one season, or every member when `roster_year` is `None`.
    pub fn roster(&self, roster_year: Option<&str>) -> Result<Vec<Member>, TeamServiceError> {
        let year = roster_year.map(str::trim).filter(|year| !year.is_empty());
        self.repo.list_members(year).map_err(Into::into)
    }

    pub fn roster_years(&self) -> Result<Vec<String>, TeamServiceError> {
        self.repo.list_roster_years().map_err(Into::into)
    }

    pub fn member(&self, id: &str) -> Result<Member, TeamServiceError> {
        self.repo
            .get_member(id)?
            .ok_or_else(|| TeamServiceError::MemberNotFound(id.to_string()))
    }

    pub fn org_tree(&self) -> Result<OrgNode, TeamServiceError> {
        self.repo.get_org_tree().map_err(Into::into)
    }

    pub fn publish_org_tree(&self, root: &OrgNode) -> Result<(), TeamServiceError> {
        self.repo.replace_org_tree(root)?;
        info!(
            "event=org_publish module=team status=ok root={}",
            root.id()
        );
        Ok(())
    }

    pub fn add_member(&self, member: &Member) -> Result<(), TeamServiceError> {
        member.validate().map_err(TeamServiceError::Validation)?;
        self.repo.create_member(member)?;
        info!("event=member_write module=team status=ok op=create id={}", member.id);
        Ok(())
    }

    pub fn update_member(&self, member: &Member) -> Result<(), TeamServiceError> {
        member.validate().map_err(TeamServiceError::Validation)?;
        self.repo.update_member(member)?;
        info!("event=member_write module=team status=ok op=update id={}", member.id);
        Ok(())
    }

    pub fn remove_member(&self, id: &str) -> Result<(), TeamServiceError> {
        self.repo.delete_member(id)?;
        info!("event=member_write module=team status=ok op=delete id={id}");
        Ok(())
    }
}
