//! Modal media viewer state.
//!
//! # Invariants
//! - While open, `0 <= index < media.len()`.
//! - Opening an empty set never changes state.
//! - Closing forgets the position; reopening starts from the given index.

use crate::model::content::{MediaRef, MediaSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightboxError {
    NotOpen,
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for LightboxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOpen => write!(f, "lightbox is not open"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "media index {index} out of range for {len} items")
            }
        }
    }
}

impl Error for LightboxError {}

#[derive(Debug, Clone)]
struct Viewing {
    media: MediaSet,
    index: usize,
}

/// One lightbox per view; opening again replaces the active set.
#[derive(Debug, Clone, Default)]
pub struct Lightbox {
    viewing: Option<Viewing>,
}

impl Lightbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `media` at `start`, clamped to the last item.
    ///
    /// Returns `false` and leaves the lightbox untouched when `media` is empty.
    pub fn open(&mut self, media: MediaSet, start: usize) -> bool {
        if media.is_empty() {
            return false;
        }
        let index = start.min(media.len() - 1);
        self.viewing = Some(Viewing { media, index });
        true
    }

    pub fn close(&mut self) {
        self.viewing = None;
    }

    pub fn is_open(&self) -> bool {
        self.viewing.is_some()
    }

    /// Advances with wraparound; returns the new index.
    pub fn next(&mut self) -> Option<usize> {
        let viewing = self.viewing.as_mut()?;
        viewing.index = (viewing.index + 1) % viewing.media.len();
        Some(viewing.index)
    }

    /// Steps back with wraparound; returns the new index.
    pub fn previous(&mut self) -> Option<usize> {
        let viewing = self.viewing.as_mut()?;
        let len = viewing.media.len();
        viewing.index = (viewing.index + len - 1) % len;
        Some(viewing.index)
    }

    /// Thumbnail navigation. Out-of-range indexes leave the position unchanged.
    pub fn jump_to(&mut self, index: usize) -> Result<(), LightboxError> {
        let viewing = self.viewing.as_mut().ok_or(LightboxError::NotOpen)?;
        let len = viewing.media.len();
        if index >= len {
            return Err(LightboxError::IndexOutOfRange { index, len });
        }
        viewing.index = index;
        Ok(())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.viewing.as_ref().map(|viewing| viewing.index)
    }

    pub fn current(&self) -> Option<&MediaRef> {
        let viewing = self.viewing.as_ref()?;
        viewing.media.get(viewing.index)
    }

    pub fn len(&self) -> usize {
        self.viewing
            .as_ref()
            .map_or(0, |viewing| viewing.media.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Lightbox;
    use crate::model::content::{MediaRef, MediaSet};

    fn set(len: usize) -> MediaSet {
        (0..len)
            .map(|i| MediaRef::new(format!("/img/{i}.jpg")))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn start_index_is_clamped() {
        let mut lightbox = Lightbox::new();
        assert!(lightbox.open(set(3), 9));
        assert_eq!(lightbox.current_index(), Some(2));
    }

    #[test]
    fn single_item_wraps_to_itself() {
        let mut lightbox = Lightbox::new();
        lightbox.open(set(1), 0);
        assert_eq!(lightbox.next(), Some(0));
        assert_eq!(lightbox.previous(), Some(0));
    }
}
