//! Content repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the read/write data provider surface for content items.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `ContentItem::validate()` before SQL mutations.
//! - Generic create/update never touch the pin flag; only `set_pinned` and
//!   `clear_pinned` do, and they keep at most one pinned row.
//! - Listing order is insertion order (`seq ASC`).

use crate::db::DbError;
use crate::model::content::{
    ContentCategory, ContentId, ContentItem, ContentValidationError, MediaRef, MediaSet,
    TimeWindow,
};
use crate::model::feedback::FeedbackValidationError;
use crate::model::member::MemberValidationError;
use crate::model::org::OrgTreeError;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CONTENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    category,
    item_date,
    item_time,
    description,
    summary,
    cover_image,
    registration_link,
    issue_label,
    download_link,
    related_item_id,
    is_pinned
FROM content_items";

const DATE_DB_FORMAT: &str = "%Y-%m-%d";
const TIME_DB_FORMAT: &str = "%H:%M:%S";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by content, team and feedback persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidContent(ContentValidationError),
    InvalidMember(MemberValidationError),
    InvalidFeedback(FeedbackValidationError),
    InvalidOrgTree(OrgTreeError),
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    /// Write collides with an existing row (duplicate id).
    Conflict { entity: &'static str, id: String },
    InvalidData(String),
}

impl RepoError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_transient())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContent(err) => write!(f, "{err}"),
            Self::InvalidMember(err) => write!(f, "{err}"),
            Self::InvalidFeedback(err) => write!(f, "{err}"),
            Self::InvalidOrgTree(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { entity, id } => write!(f, "{entity} already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidContent(err) => Some(err),
            Self::InvalidMember(err) => Some(err),
            Self::InvalidFeedback(err) => Some(err),
            Self::InvalidOrgTree(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::Conflict { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ContentValidationError> for RepoError {
    fn from(value: ContentValidationError) -> Self {
        Self::InvalidContent(value)
    }
}

impl From<MemberValidationError> for RepoError {
    fn from(value: MemberValidationError) -> Self {
        Self::InvalidMember(value)
    }
}

impl From<FeedbackValidationError> for RepoError {
    fn from(value: FeedbackValidationError) -> Self {
        Self::InvalidFeedback(value)
    }
}

impl From<OrgTreeError> for RepoError {
    fn from(value: OrgTreeError) -> Self {
        Self::InvalidOrgTree(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing content items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentListQuery {
    pub category: Option<ContentCategory>,
    pub window: Option<TimeWindow>,
}

impl ContentListQuery {
    pub fn category(category: ContentCategory) -> Self {
        Self {
            category: Some(category),
            window: None,
        }
    }
}

/// Data provider contract for content items.
pub trait ContentRepository {
    fn list_content_items(&self, query: &ContentListQuery) -> RepoResult<Vec<ContentItem>>;
    fn get_content_item(&self, id: &str) -> RepoResult<Option<ContentItem>>;
    /// Inserts an unpinned item; `item.is_pinned` is ignored.
    fn create_content_item(&self, item: &ContentItem) -> RepoResult<()>;
    /// Inserts `item` as the sole pinned item; nothing is written on failure.
    fn create_pinned_content_item(&self, item: &ContentItem) -> RepoResult<()>;
    /// Replaces every field except the pin flag.
    fn update_content_item(&self, item: &ContentItem) -> RepoResult<()>;
    fn delete_content_item(&self, id: &str) -> RepoResult<()>;
    /// Pins `id` and unpins every other item atomically.
    fn set_pinned(&self, id: &str) -> RepoResult<()>;
    /// Unpins the pinned item, returning its id.
    fn clear_pinned(&self) -> RepoResult<Option<ContentId>>;
    fn set_category(&self, id: &str, category: ContentCategory) -> RepoResult<()>;
}

/// SQLite-backed content repository.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn list_content_items(&self, query: &ContentListQuery) -> RepoResult<Vec<ContentItem>> {
        let mut media = load_all_media(self.conn)?;
        let mut stmt = self.conn.prepare(&format!(
            "{CONTENT_SELECT_SQL}
             WHERE (?1 IS NULL OR category = ?1)
             ORDER BY seq ASC;"
        ))?;
        let mut rows = stmt.query([query.category.map(ContentCategory::as_str)])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let mut item = parse_content_row(row)?;
            if let Some(window) = query.window {
                if !window.contains(item.primary_timestamp()) {
                    continue;
                }
            }
            item.media = MediaSet::new(media.remove(&item.id).unwrap_or_default());
            items.push(item);
        }
        Ok(items)
    }

    fn get_content_item(&self, id: &str) -> RepoResult<Option<ContentItem>> {
        let item = self
            .conn
            .query_row(
                &format!("{CONTENT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_content_row(row)),
            )
            .optional()?;
        let Some(item) = item else {
            return Ok(None);
        };
        let mut item = item?;
        item.media = MediaSet::new(load_media(self.conn, &item.id)?);
        Ok(Some(item))
    }

    fn create_content_item(&self, item: &ContentItem) -> RepoResult<()> {
        item.validate()?;

        atomic_write(self.conn, |tx| {
            tx.execute(
                "INSERT INTO content_items (
                    id,
                    title,
                    category,
                    item_date,
                    item_time,
                    description,
                    summary,
                    cover_image,
                    registration_link,
                    issue_label,
                    download_link,
                    related_item_id,
                    is_pinned
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0);",
                params![
                    item.id.as_str(),
                    item.title.as_str(),
                    item.category.as_str(),
                    date_to_db(item.date),
                    item.time.map(time_to_db),
                    item.description.as_deref(),
                    item.summary.as_deref(),
                    item.cover_image.as_deref(),
                    item.registration_link.as_deref(),
                    item.issue_label.as_deref(),
                    item.download_link.as_deref(),
                    item.related_item_id.as_deref(),
                ],
            )
            .map_err(|err| conflict_or_db(err, "content item", &item.id))?;
            replace_media(tx, &item.id, &item.media)
        })
    }

    fn update_content_item(&self, item: &ContentItem) -> RepoResult<()> {
        item.validate()?;

        atomic_write(self.conn, |tx| {
            let changed = tx.execute(
                "UPDATE content_items
                 SET
                    title = ?2,
                    category = ?3,
                    item_date = ?4,
                    item_time = ?5,
                    description = ?6,
                    summary = ?7,
                    cover_image = ?8,
                    registration_link = ?9,
                    issue_label = ?10,
                    download_link = ?11,
                    related_item_id = ?12,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    item.id.as_str(),
                    item.title.as_str(),
                    item.category.as_str(),
                    date_to_db(item.date),
                    item.time.map(time_to_db),
                    item.description.as_deref(),
                    item.summary.as_deref(),
                    item.cover_image.as_deref(),
                    item.registration_link.as_deref(),
                    item.issue_label.as_deref(),
                    item.download_link.as_deref(),
                    item.related_item_id.as_deref(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found("content item", item.id.as_str()));
            }
            replace_media(tx, &item.id, &item.media)
        })
    }

    fn create_pinned_content_item(&self, item: &ContentItem) -> RepoResult<()> {
        atomic_write(self.conn, |tx| {
            let repo = SqliteContentRepository::new(tx);
            repo.create_content_item(item)?;
            repo.set_pinned(&item.id)
        })
    }

    fn delete_content_item(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM content_items WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("content item", id));
        }
        Ok(())
    }

    fn set_pinned(&self, id: &str) -> RepoResult<()> {
        atomic_write(self.conn, |tx| {
            let exists = tx
                .query_row("SELECT 1 FROM content_items WHERE id = ?1;", [id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Err(RepoError::not_found("content item", id));
            }
            // Clear first: the partial unique index rejects two pinned rows.
            tx.execute(
                "UPDATE content_items SET is_pinned = 0 WHERE is_pinned = 1 AND id <> ?1;",
                [id],
            )?;
            tx.execute("UPDATE content_items SET is_pinned = 1 WHERE id = ?1;", [id])?;
            Ok(())
        })
    }

    fn clear_pinned(&self) -> RepoResult<Option<ContentId>> {
        atomic_write(self.conn, |tx| {
            let pinned: Option<String> = tx
                .query_row(
                    "SELECT id FROM content_items WHERE is_pinned = 1;",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            if pinned.is_some() {
                tx.execute(
                    "UPDATE content_items SET is_pinned = 0 WHERE is_pinned = 1;",
                    [],
                )?;
            }
            Ok(pinned)
        })
    }

    fn set_category(&self, id: &str, category: ContentCategory) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE content_items
             SET category = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, category.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("content item", id));
        }
        Ok(())
    }
}

/// Runs `write` in its own transaction, or inside the caller's when one is
/// already open on `conn`.
pub(crate) fn atomic_write<T>(
    conn: &Connection,
    write: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return write(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = write(&*tx)?;
    tx.commit()?;
    Ok(value)
}

/// Maps a unique-constraint failure to `Conflict`, everything else to `Db`.
pub(crate) fn conflict_or_db(err: rusqlite::Error, entity: &'static str, id: &str) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            RepoError::Conflict {
                entity,
                id: id.to_string(),
            }
        }
        _ => err.into(),
    }
}

fn replace_media(conn: &Connection, item_id: &str, media: &MediaSet) -> RepoResult<()> {
    conn.execute("DELETE FROM content_media WHERE item_id = ?1;", [item_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO content_media (item_id, position, url, caption, credit)
         VALUES (?1, ?2, ?3, ?4, ?5);",
    )?;
    for (position, entry) in media.iter().enumerate() {
        stmt.execute(params![
            item_id,
            position as i64,
            entry.url.as_str(),
            entry.caption.as_deref(),
            entry.credit.as_deref(),
        ])?;
    }
    Ok(())
}

fn load_media(conn: &Connection, item_id: &str) -> RepoResult<Vec<MediaRef>> {
    let mut stmt = conn.prepare(
        "SELECT url, caption, credit
         FROM content_media
         WHERE item_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([item_id])?;
    let mut media = Vec::new();
    while let Some(row) = rows.next()? {
        media.push(parse_media_row(row)?);
    }
    Ok(media)
}

fn load_all_media(conn: &Connection) -> RepoResult<HashMap<String, Vec<MediaRef>>> {
    let mut stmt = conn.prepare(
        "SELECT item_id, url, caption, credit
         FROM content_media
         ORDER BY item_id ASC, position ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut media: HashMap<String, Vec<MediaRef>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let item_id: String = row.get("item_id")?;
        media.entry(item_id).or_default().push(parse_media_row(row)?);
    }
    Ok(media)
}

fn parse_media_row(row: &Row<'_>) -> RepoResult<MediaRef> {
    Ok(MediaRef {
        url: row.get("url")?,
        caption: row.get("caption")?,
        credit: row.get("credit")?,
    })
}

fn parse_content_row(row: &Row<'_>) -> RepoResult<ContentItem> {
    let id: String = row.get("id")?;

    let category_text: String = row.get("category")?;
    let category = ContentCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in content_items.category"
        ))
    })?;

    let date_text: String = row.get("item_date")?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_DB_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{date_text}` in content_items.item_date"
        ))
    })?;

    let time = match row.get::<_, Option<String>>("item_time")? {
        Some(value) => Some(NaiveTime::parse_from_str(&value, TIME_DB_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!("invalid time `{value}` in content_items.item_time"))
        })?),
        None => None,
    };

    let is_pinned = match row.get::<_, i64>("is_pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_pinned value `{other}` in content_items.is_pinned"
            )));
        }
    };

    let mut item = ContentItem::new(id, row.get::<_, String>("title")?, date, category);
    item.time = time;
    item.description = row.get("description")?;
    item.summary = row.get("summary")?;
    item.cover_image = row.get("cover_image")?;
    item.registration_link = row.get("registration_link")?;
    item.issue_label = row.get("issue_label")?;
    item.download_link = row.get("download_link")?;
    item.related_item_id = row.get("related_item_id")?;
    item.is_pinned = is_pinned;
    Ok(item)
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_DB_FORMAT).to_string()
}

fn time_to_db(time: NaiveTime) -> String {
    time.format(TIME_DB_FORMAT).to_string()
}
