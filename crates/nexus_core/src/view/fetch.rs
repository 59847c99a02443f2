//! View-scoped fetch lifecycle.
//!
//! # Responsibility
//! - Track pending/ready/failed state for one mounted view.
//! - Drop fetch results that arrive after the view unmounted or after a
//!   newer fetch started.
//! - Retry transient provider failures a bounded number of times.

use crate::repo::content_repo::RepoError;
use crate::service::catalog::CatalogError;
use crate::service::team_service::TeamServiceError;
use log::warn;
use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T, E> {
    Pending,
    Ready(T),
    Failed(E),
}

impl<T, E> FetchState<T, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn failed(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct ScopeState<T, E> {
    generation: Cell<u64>,
    state: RefCell<FetchState<T, E>>,
}

/// A mounted view owning one fetch state. Dropping it unmounts the view.
#[derive(Debug)]
pub struct ViewScope<T, E> {
    inner: Rc<ScopeState<T, E>>,
}

impl<T, E> ViewScope<T, E> {
    pub fn mount() -> Self {
        Self {
            inner: Rc::new(ScopeState {
                generation: Cell::new(0),
                state: RefCell::new(FetchState::Pending),
            }),
        }
    }

    /// Starts a fetch; any earlier ticket becomes stale.
    pub fn begin_fetch(&self) -> FetchTicket<T, E> {
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        *self.inner.state.borrow_mut() = FetchState::Pending;
        FetchTicket {
            scope: Rc::downgrade(&self.inner),
            generation,
        }
    }

    pub fn state(&self) -> Ref<'_, FetchState<T, E>> {
        self.inner.state.borrow()
    }

    pub fn unmount(self) {
        drop(self);
    }
}

/// Completion side of one fetch.
#[derive(Debug)]
pub struct FetchTicket<T, E> {
    scope: Weak<ScopeState<T, E>>,
    generation: u64,
}

impl<T, E> FetchTicket<T, E> {
    /// Publishes the result. Returns `false` when the view is gone or a newer
    /// fetch superseded this one; the result is then discarded.
    pub fn complete(self, result: Result<T, E>) -> bool {
        let Some(scope) = self.scope.upgrade() else {
            return false;
        };
        if scope.generation.get() != self.generation {
            return false;
        }
        *scope.state.borrow_mut() = match result {
            Ok(value) => FetchState::Ready(value),
            Err(err) => FetchState::Failed(err),
        };
        true
    }

    pub fn is_live(&self) -> bool {
        self.scope
            .upgrade()
            .is_some_and(|scope| scope.generation.get() == self.generation)
    }
}

/// Errors that may succeed when retried.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for RepoError {
    fn is_transient(&self) -> bool {
        RepoError::is_transient(self)
    }
}

impl Transient for CatalogError {
    fn is_transient(&self) -> bool {
        CatalogError::is_transient(self)
    }
}

impl Transient for TeamServiceError {
    fn is_transient(&self) -> bool {
        TeamServiceError::is_transient(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, E: Transient + std::fmt::Display>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, E> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        "event=fetch_retry module=view status=error attempt={} max_attempts={} error={}",
                        attempt, max_attempts, err
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchState, ViewScope};

    #[test]
    fn newer_fetch_supersedes_older_ticket() {
        let scope: ViewScope<u32, String> = ViewScope::mount();
        let first = scope.begin_fetch();
        let second = scope.begin_fetch();

        assert!(!first.complete(Ok(1)));
        assert!(second.complete(Ok(2)));
        assert_eq!(*scope.state(), FetchState::Ready(2));
    }
}
