//! Content item domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by event, gallery and publication
//!   listings.
//! - Classify events against the clock and validate admin drafts.
//!
//! # Invariants
//! - Every item carries exactly one `ContentCategory`.
//! - `Upcoming` implies the primary timestamp is strictly after "now" at the
//!   moment of classification; otherwise the item is `Past`.
//! - Only event categories are ever reclassified.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a content item.
pub type ContentId = String;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p"];

/// Closed set of listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Event that has not started yet.
    Upcoming,
    /// Event that already started.
    Past,
    /// Club publication issue.
    Magazine,
    /// Photo gallery.
    Gallery,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 4] = [
        ContentCategory::Upcoming,
        ContentCategory::Past,
        ContentCategory::Magazine,
        ContentCategory::Gallery,
    ];

    /// Returns whether this category is time-classified.
    pub fn is_event(self) -> bool {
        matches!(self, Self::Upcoming | Self::Past)
    }

    /// Classifies an event timestamp against `now`.
    pub fn classify_event(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if timestamp > now {
            Self::Upcoming
        } else {
            Self::Past
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Past => "past",
            Self::Magazine => "magazine",
            Self::Gallery => "gallery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Some(Self::Upcoming),
            "past" => Some(Self::Past),
            "magazine" => Some(Self::Magazine),
            "gallery" => Some(Self::Gallery),
            _ => None,
        }
    }
}

impl Display for ContentCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media reference (image) attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// Photographer or source credit.
    #[serde(default)]
    pub credit: Option<String>,
}

impl MediaRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: None,
            credit: None,
        }
    }
}

/// Ordered media belonging to one content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaSet {
    items: Vec<MediaRef>,
}

impl MediaSet {
    pub fn new(items: Vec<MediaRef>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaRef> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaRef> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[MediaRef] {
        &self.items
    }
}

impl From<Vec<MediaRef>> for MediaSet {
    fn from(items: Vec<MediaRef>) -> Self {
        Self::new(items)
    }
}

/// Half-open time window `[start, end)` over primary timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp < end)
    }
}

/// Canonical content record for event, gallery and publication listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub title: String,
    pub date: NaiveDate,
    /// `None` means the item is dated but has no announced start time.
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub category: ContentCategory,
    #[serde(default)]
    pub media: MediaSet,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub registration_link: Option<String>,
    /// Magazine issue label such as `#15`.
    #[serde(default)]
    pub issue_label: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
    /// Gallery -> event back reference.
    #[serde(default)]
    pub related_item_id: Option<ContentId>,
    #[serde(default)]
    pub is_pinned: bool,
}

impl ContentItem {
    pub fn new(
        id: impl Into<ContentId>,
        title: impl Into<String>,
        date: NaiveDate,
        category: ContentCategory,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            date,
            time: None,
            category,
            media: MediaSet::default(),
            description: None,
            summary: None,
            cover_image: None,
            registration_link: None,
            issue_label: None,
            download_link: None,
            related_item_id: None,
            is_pinned: false,
        }
    }

    /// Date plus time, midnight UTC when no time is set.
    pub fn primary_timestamp(&self) -> DateTime<Utc> {
        let naive = self.date.and_time(self.time.unwrap_or_default());
        Utc.from_utc_datetime(&naive)
    }

    /// Re-derives an event category from the clock.
    ///
    /// Returns `true` when the category changed. Non-event items are left
    /// untouched.
    pub fn classify(&mut self, now: DateTime<Utc>) -> bool {
        if !self.category.is_event() {
            return false;
        }
        let classified = ContentCategory::classify_event(self.primary_timestamp(), now);
        if classified == self.category {
            return false;
        }
        self.category = classified;
        true
    }

    /// Checks record-level invariants that do not depend on the clock.
    pub fn validate(&self) -> Result<(), ContentValidationError> {
        if self.id.trim().is_empty() {
            return Err(ContentValidationError::MissingField("id"));
        }
        if self.title.trim().is_empty() {
            return Err(ContentValidationError::MissingField("title"));
        }
        validate_link("cover_image", self.cover_image.as_deref())?;
        validate_link("registration_link", self.registration_link.as_deref())?;
        validate_link("download_link", self.download_link.as_deref())?;
        for media in self.media.iter() {
            if media.url.trim().is_empty() {
                return Err(ContentValidationError::MissingField("media.url"));
            }
            validate_link("media.url", Some(media.url.as_str()))?;
        }
        Ok(())
    }
}

/// Field-level rejection for content writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    MissingField(&'static str),
    InvalidDate(String),
    InvalidTime(String),
    InvalidCategory(String),
    InvalidLink { field: &'static str, value: String },
}

impl ContentValidationError {
    /// Form field the message should be attached to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidDate(_) => "date",
            Self::InvalidTime(_) => "time",
            Self::InvalidCategory(_) => "category",
            Self::InvalidLink { field, .. } => field,
        }
    }
}

impl Display for ContentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "`{field}` is required"),
            Self::InvalidDate(value) => {
                write!(f, "invalid date `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidTime(value) => {
                write!(f, "invalid time `{value}`; expected HH:MM or HH:MM AM/PM")
            }
            Self::InvalidCategory(value) => write!(
                f,
                "invalid category `{value}`; expected upcoming|past|magazine|gallery"
            ),
            Self::InvalidLink { field, value } => {
                write!(f, "`{field}` must be an http(s) URL or /path, got `{value}`")
            }
        }
    }
}

impl Error for ContentValidationError {}

/// Raw admin form submission.
///
/// All values arrive as strings; `into_item` parses and validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub registration_link: String,
    #[serde(default)]
    pub issue_label: String,
    #[serde(default)]
    pub download_link: String,
    #[serde(default)]
    pub related_item_id: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    /// Requests the hero pin; applied by the admin facade, not by storage.
    #[serde(default)]
    pub pin: bool,
}

impl ContentDraft {
    /// Parses the draft into an item with a fresh generated id.
    pub fn into_new_item(self, now: DateTime<Utc>) -> Result<ContentItem, ContentValidationError> {
        self.into_item(Uuid::new_v4().to_string(), now)
    }

    /// Parses the draft into an item with the given id.
    ///
    /// Event categories are derived from the timestamp, so a draft marked
    /// `upcoming` with a date in the past lands as `past`.
    pub fn into_item(
        self,
        id: impl Into<ContentId>,
        now: DateTime<Utc>,
    ) -> Result<ContentItem, ContentValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ContentValidationError::MissingField("title"));
        }
        let date = parse_date(&self.date)?;
        let time = parse_optional_time(&self.time)?;
        let category = ContentCategory::parse(&self.category)
            .ok_or_else(|| ContentValidationError::InvalidCategory(self.category.clone()))?;

        let mut item = ContentItem::new(id, title, date, category);
        item.time = time;
        item.description = non_blank(self.description);
        item.summary = non_blank(self.summary);
        item.cover_image = non_blank(self.cover_image);
        item.registration_link = non_blank(self.registration_link);
        item.issue_label = non_blank(self.issue_label);
        item.download_link = non_blank(self.download_link);
        item.related_item_id = non_blank(self.related_item_id);
        item.media = MediaSet::new(self.media);
        item.classify(now);
        item.validate()?;
        Ok(item)
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ContentValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentValidationError::MissingField("date"));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| ContentValidationError::InvalidDate(trimmed.to_string()))
}

/// Parses an optional time; blank input means "no time".
pub fn parse_optional_time(value: &str) -> Result<Option<NaiveTime>, ContentValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .map(Some)
        .ok_or_else(|| ContentValidationError::InvalidTime(trimmed.to_string()))
}

fn validate_link(field: &'static str, value: Option<&str>) -> Result<(), ContentValidationError> {
    let Some(value) = value else {
        return Ok(());
    };
    let trimmed = value.trim();
    let accepted = trimmed.starts_with("https://")
        || trimmed.starts_with("http://")
        || (trimmed.starts_with('/') && !trimmed.starts_with("//"));
    if !accepted {
        return Err(ContentValidationError::InvalidLink {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_date, parse_optional_time, ContentValidationError, TimeWindow};
    use chrono::{NaiveTime, TimeZone, Utc};

    #[test]
    fn parse_optional_time_accepts_form_and_listing_formats() {
        let expected = NaiveTime::from_hms_opt(14, 0, 0);
        assert_eq!(parse_optional_time("14:00").unwrap(), expected);
        assert_eq!(parse_optional_time("02:00 PM").unwrap(), expected);
        assert_eq!(parse_optional_time("  ").unwrap(), None);
    }

    #[test]
    fn parse_date_reports_the_field() {
        let err = parse_date("2024-13-40").unwrap_err();
        assert_eq!(err.field(), "date");
        assert!(matches!(parse_date(""), Err(ContentValidationError::MissingField("date"))));
    }

    #[test]
    fn time_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::between(start, end);
        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert!(TimeWindow::default().contains(end));
    }
}
