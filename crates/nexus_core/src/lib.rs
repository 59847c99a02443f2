//! Core domain logic for the Nexus club site.
//! Catalog, countdowns, media viewer, org tree and their storage live here;
//! front-ends only render what this crate returns.

pub mod config;
pub mod countdown;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;
pub mod view;

pub use config::{ConfigError, SiteConfig};
pub use countdown::{
    decompose, Breakdown, Clock, Countdown, CountdownEvent, CountdownHandle, CountdownScheduler,
    ManualClock, SystemClock, TickGranularity,
};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::content::{
    ContentCategory, ContentDraft, ContentId, ContentItem, ContentValidationError, MediaRef,
    MediaSet, TimeWindow,
};
pub use model::feedback::{Feedback, FeedbackStatus};
pub use model::member::Member;
pub use model::org::{OrgNode, OrgNodeSpec, OrgTreeError};
pub use repo::content_repo::{
    ContentListQuery, ContentRepository, RepoError, RepoResult, SqliteContentRepository,
};
pub use repo::feedback_repo::{FeedbackFilter, FeedbackRepository, SqliteFeedbackRepository};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use seed::{import_seed, SeedBundle, SeedError, SeedReport};
pub use service::catalog::{AdminCatalog, CatalogError, CatalogStore, ListQuery, SortOrder};
pub use service::feedback_service::{FeedbackError, FeedbackService};
pub use service::team_service::{TeamService, TeamServiceError};
pub use view::fetch::{FetchState, FetchTicket, RetryPolicy, ViewScope};
pub use view::lightbox::{Lightbox, LightboxError};
pub use view::org_tree::{OrgRow, OrgTreeView};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
