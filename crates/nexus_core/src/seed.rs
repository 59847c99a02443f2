//! JSON seed import.
//!
//! A `SeedBundle` carries the content, roster, org tree and inbox a fresh
//! site starts with. Import is all-or-nothing: one transaction, rolled back
//! on the first failure.

use crate::model::content::{ContentId, ContentItem};
use crate::model::feedback::Feedback;
use crate::model::member::Member;
use crate::model::org::{OrgNodeSpec, OrgTreeError};
use crate::repo::content_repo::{ContentRepository, RepoError, SqliteContentRepository};
use crate::repo::feedback_repo::{FeedbackRepository, SqliteFeedbackRepository};
use crate::repo::team_repo::{SqliteTeamRepository, TeamRepository};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedBundle {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub org: Option<OrgNodeSpec>,
    #[serde(default)]
    pub feedback: Vec<Feedback>,
}

impl SeedBundle {
    pub fn from_json_str(raw: &str) -> Result<Self, SeedError> {
        serde_json::from_str(raw).map_err(SeedError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

/// Row counts written by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub content_items: usize,
    pub members: usize,
    pub org_nodes: usize,
    pub feedback: usize,
    /// Event items whose stored category was stale at import time.
    pub reclassified: usize,
}

#[derive(Debug)]
pub enum SeedError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    InvalidOrgTree(OrgTreeError),
    /// More than one item is marked pinned.
    MultiplePinned(Vec<ContentId>),
    Repo(RepoError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read seed file {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid seed json: {err}"),
            Self::InvalidOrgTree(err) => write!(f, "invalid seed org tree: {err}"),
            Self::MultiplePinned(ids) => {
                write!(f, "seed pins more than one item: {}", ids.join(", "))
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidOrgTree(err) => Some(err),
            Self::MultiplePinned(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SeedError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Writes `bundle` into `conn` in a single transaction.
///
/// Event categories are re-derived at `now` before insert.
pub fn import_seed(
    conn: &Connection,
    bundle: SeedBundle,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let started_at = Instant::now();
    let result = import_in_transaction(conn, bundle, now);
    match &result {
        Ok(report) => info!(
            "event=seed_import module=seed status=ok duration_ms={} content={} members={} org_nodes={} feedback={} reclassified={}",
            started_at.elapsed().as_millis(),
            report.content_items,
            report.members,
            report.org_nodes,
            report.feedback,
            report.reclassified
        ),
        Err(err) => error!(
            "event=seed_import module=seed status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn import_in_transaction(
    conn: &Connection,
    bundle: SeedBundle,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError> {
    let pinned: Vec<ContentId> = bundle
        .content
        .iter()
        .filter(|item| item.is_pinned)
        .map(|item| item.id.clone())
        .collect();
    if pinned.len() > 1 {
        return Err(SeedError::MultiplePinned(pinned));
    }
    let org = bundle
        .org
        .map(OrgNodeSpec::build)
        .transpose()
        .map_err(SeedError::InvalidOrgTree)?;

    let tx = conn.unchecked_transaction()?;
    let mut report = SeedReport::default();

    let content_repo = SqliteContentRepository::new(&tx);
    for mut item in bundle.content {
        if item.classify(now) {
            report.reclassified += 1;
        }
        content_repo.create_content_item(&item)?;
        report.content_items += 1;
    }
    if let Some(id) = pinned.first() {
        content_repo.set_pinned(id)?;
    }

    let team_repo = SqliteTeamRepository::new(&tx);
    for member in &bundle.members {
        team_repo.create_member(member)?;
        report.members += 1;
    }
    if let Some(root) = &org {
        team_repo.replace_org_tree(root)?;
        root.walk(&mut |_, _| report.org_nodes += 1);
    }

    let feedback_repo = SqliteFeedbackRepository::new(&tx);
    for feedback in &bundle.feedback {
        feedback_repo.submit(feedback)?;
        report.feedback += 1;
    }

    tx.commit()?;
    Ok(report)
}
