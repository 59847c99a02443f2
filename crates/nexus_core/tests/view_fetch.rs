use nexus_core::view::fetch::Transient;
use nexus_core::{CatalogError, FetchState, RetryPolicy, ViewScope};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProviderError {
    Busy,
    Gone,
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => f.write_str("busy"),
            Self::Gone => f.write_str("gone"),
        }
    }
}

impl Transient for ProviderError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

#[test]
fn result_after_unmount_is_discarded() {
    let scope: ViewScope<Vec<String>, ProviderError> = ViewScope::mount();
    let ticket = scope.begin_fetch();
    assert!(scope.state().is_pending());
    assert!(ticket.is_live());

    scope.unmount();
    assert!(!ticket.is_live());
    assert!(!ticket.complete(Ok(vec!["late".to_string()])));
}

#[test]
fn failure_is_published_to_the_view() {
    let scope: ViewScope<u32, ProviderError> = ViewScope::mount();
    assert!(scope.begin_fetch().complete(Err(ProviderError::Gone)));

    assert_eq!(scope.state().failed(), Some(&ProviderError::Gone));

    let retry = scope.begin_fetch();
    assert!(scope.state().is_pending());
    assert!(retry.complete(Ok(7)));
    assert_eq!(*scope.state(), FetchState::Ready(7));
}

#[test]
fn transient_errors_are_retried_until_success() {
    let mut attempts = Vec::new();
    let result = RetryPolicy::default().run(|attempt| {
        attempts.push(attempt);
        if attempt < 3 {
            Err(ProviderError::Busy)
        } else {
            Ok("loaded")
        }
    });

    assert_eq!(result, Ok("loaded"));
    assert_eq!(attempts, [1, 2, 3]);
}

#[test]
fn retries_stop_at_the_attempt_limit() {
    let mut calls = 0;
    let result: Result<(), _> = RetryPolicy::new(2).run(|_| {
        calls += 1;
        Err(ProviderError::Busy)
    });

    assert_eq!(result, Err(ProviderError::Busy));
    assert_eq!(calls, 2);
}

#[test]
fn permanent_errors_are_not_retried() {
    let mut calls = 0;
    let result: Result<(), _> = RetryPolicy::new(5).run(|_| {
        calls += 1;
        Err(CatalogError::NotFound("missing".to_string()))
    });

    assert!(matches!(result, Err(CatalogError::NotFound(_))));
    assert_eq!(calls, 1);
    assert_eq!(RetryPolicy::new(0).max_attempts, 1);
}
