//! Content catalog store and admin write facade.
//!
//! # Responsibility
//! - Cache provider content in insertion order and answer public queries
//!   (filter by category/time window, lookup by id, hero pin).
//! - Keep event categories consistent with the clock.
//! - Route admin writes through the provider before touching the cache.
//!
//! # Invariants
//! - Public queries are pure reads over the cached collection.
//! - The cache changes only after the provider accepted the write, so a
//!   rejected write leaves state unchanged.
//! - At most one cached item is pinned at any time.

use crate::model::content::{
    ContentCategory, ContentDraft, ContentId, ContentItem, ContentValidationError, TimeWindow,
};
use crate::repo::content_repo::{ContentListQuery, ContentRepository, RepoError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error taxonomy shared by catalog reads and admin writes.
#[derive(Debug)]
pub enum CatalogError {
    /// Requested id is absent; callers render a fallback.
    NotFound(ContentId),
    /// Admin write rejected; the field tells the form where to show it.
    Validation(ContentValidationError),
    /// Provider temporarily unreachable; retrying may succeed.
    TransientFetch(RepoError),
    /// Any other provider failure.
    Storage(RepoError),
}

impl CatalogError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch(_))
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "content item not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::TransientFetch(err) => write!(f, "content provider unavailable: {err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Validation(err) => Some(err),
            Self::TransientFetch(err) | Self::Storage(err) => Some(err),
        }
    }
}

impl From<ContentValidationError> for CatalogError {
    fn from(value: ContentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            RepoError::InvalidContent(err) => Self::Validation(err),
            other if other.is_transient() => Self::TransientFetch(other),
            other => Self::Storage(other),
        }
    }
}

/// Result ordering for catalog listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Order in which items entered the provider.
    #[default]
    Insertion,
    /// Soonest first for upcoming items, newest first for everything else.
    Chronological,
}

/// Public catalog query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListQuery {
    pub category: Option<ContentCategory>,
    pub window: Option<TimeWindow>,
    pub order: SortOrder,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    /// Category listing in the order its page displays it.
    pub fn for_display(category: ContentCategory) -> Self {
        Self {
            category: Some(category),
            window: None,
            order: SortOrder::Chronological,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// Read-through cache over a content provider.
pub struct CatalogStore<R: ContentRepository> {
    repo: R,
    items: Vec<ContentItem>,
}

impl<R: ContentRepository> CatalogStore<R> {
    /// Loads every item from the provider and classifies events at `now`.
    pub fn load(repo: R, now: DateTime<Utc>) -> Result<Self, CatalogError> {
        let mut store = Self {
            repo,
            items: Vec::new(),
        };
        store.refresh(now)?;
        Ok(store)
    }

    /// Re-reads the provider, replacing the cache only on success.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), CatalogError> {
        let items = match self.repo.list_content_items(&ContentListQuery::default()) {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    "event=catalog_load module=catalog status=error transient={} error={}",
                    err.is_transient(),
                    err
                );
                return Err(err.into());
            }
        };
        self.items = items;
        let moved = self.reclassify(now);
        info!(
            "event=catalog_load module=catalog status=ok items={} reclassified={}",
            self.items.len(),
            moved.len()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Filters the cached collection; no provider access.
    pub fn list(&self, query: &ListQuery) -> Vec<&ContentItem> {
        let mut matches: Vec<&ContentItem> = self
            .items
            .iter()
            .filter(|item| query.category.map_or(true, |category| item.category == category))
            .filter(|item| {
                query
                    .window
                    .map_or(true, |window| window.contains(item.primary_timestamp()))
            })
            .collect();

        if query.order == SortOrder::Chronological {
            if query.category == Some(ContentCategory::Upcoming) {
                matches.sort_by_key(|item| item.primary_timestamp());
            } else {
                matches.sort_by_key(|item| std::cmp::Reverse(item.primary_timestamp()));
            }
        }
        matches
    }

    pub fn get(&self, id: &str) -> Result<&ContentItem, CatalogError> {
        self.items
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Item promoted to the hero section, if any.
    pub fn pinned(&self) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.is_pinned)
    }

    /// Moves every elapsed upcoming item to past.
    ///
    /// The cache is updated even when persisting a change fails; the next
    /// refresh re-derives the same category.
    pub fn reclassify(&mut self, now: DateTime<Utc>) -> Vec<ContentId> {
        let mut moved = Vec::new();
        for item in &mut self.items {
            if item.category != ContentCategory::Upcoming || !item.classify(now) {
                continue;
            }
            if let Err(err) = self.repo.set_category(&item.id, item.category) {
                warn!(
                    "event=catalog_reclassify module=catalog status=error id={} error={}",
                    item.id, err
                );
            }
            moved.push(item.id.clone());
        }
        if !moved.is_empty() {
            info!(
                "event=catalog_reclassify module=catalog status=ok moved={}",
                moved.len()
            );
        }
        moved
    }

    /// Opens the admin write facade over this store.
    pub fn admin(&mut self) -> AdminCatalog<'_, R> {
        AdminCatalog { store: self }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}

/// Write-capable facade used only by the admin surface.
pub struct AdminCatalog<'a, R: ContentRepository> {
    store: &'a mut CatalogStore<R>,
}

impl<R: ContentRepository> AdminCatalog<'_, R> {
    /// Creates an item from a form draft, pinning it when requested.
    ///
    /// With `pin` set the insert and the pin land together or not at all.
    pub fn create(
        &mut self,
        draft: ContentDraft,
        now: DateTime<Utc>,
    ) -> Result<ContentId, CatalogError> {
        let pin = draft.pin;
        let item = draft.into_new_item(now)?;
        if pin {
            self.store.repo.create_pinned_content_item(&item)?;
        } else {
            self.store.repo.create_content_item(&item)?;
        }
        let id = item.id.clone();
        info!(
            "event=content_write module=catalog status=ok op=create id={} category={}",
            id, item.category
        );
        if pin {
            for existing in &mut self.store.items {
                existing.is_pinned = false;
            }
            info!("event=pin_change module=catalog status=ok op=set id={id}");
        }
        self.store.items.push(ContentItem {
            is_pinned: pin,
            ..item
        });
        Ok(id)
    }

    /// Replaces an item's fields from a form draft.
    ///
    /// The draft's pin checkbox is applied through `set_pinned` or
    /// `clear_pinned`, never as a plain field write.
    pub fn update(
        &mut self,
        id: &str,
        draft: ContentDraft,
        now: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let was_pinned = self.store.get(id)?.is_pinned;
        let pin = draft.pin;
        let mut item = draft.into_item(id, now)?;
        item.is_pinned = was_pinned;
        self.store.repo.update_content_item(&item)?;
        info!(
            "event=content_write module=catalog status=ok op=update id={} category={}",
            id, item.category
        );
        if let Some(slot) = self.store.items.iter_mut().find(|cached| cached.id == id) {
            *slot = item;
        }

        match (was_pinned, pin) {
            (false, true) => self.set_pinned(id),
            (true, false) => self.clear_pinned().map(|_| ()),
            _ => Ok(()),
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<(), CatalogError> {
        self.store.repo.delete_content_item(id)?;
        self.store.items.retain(|item| item.id != id);
        info!("event=content_write module=catalog status=ok op=delete id={id}");
        Ok(())
    }

    /// Pins `id` and unpins every other item (last writer wins).
    pub fn set_pinned(&mut self, id: &str) -> Result<(), CatalogError> {
        self.store.repo.set_pinned(id)?;
        for item in &mut self.store.items {
            item.is_pinned = item.id == id;
        }
        info!("event=pin_change module=catalog status=ok op=set id={id}");
        Ok(())
    }

    /// Unpins the hero item, returning the id that was pinned.
    pub fn clear_pinned(&mut self) -> Result<Option<ContentId>, CatalogError> {
        let cleared = self.store.repo.clear_pinned()?;
        for item in &mut self.store.items {
            item.is_pinned = false;
        }
        info!(
            "event=pin_change module=catalog status=ok op=clear id={}",
            cleared.as_deref().unwrap_or("none")
        );
        Ok(cleared)
    }

    /// Flips the pin on `id`. Returns whether `id` is pinned afterwards.
    pub fn toggle_pin(&mut self, id: &str) -> Result<bool, CatalogError> {
        if self.store.get(id)?.is_pinned {
            self.clear_pinned()?;
            Ok(false)
        } else {
            self.set_pinned(id)?;
            Ok(true)
        }
    }
}
