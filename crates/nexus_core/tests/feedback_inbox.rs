use chrono::{Duration, TimeZone, Utc};
use nexus_core::db::open_db_in_memory;
use nexus_core::{
    FeedbackError, FeedbackFilter, FeedbackService, FeedbackStatus, SqliteFeedbackRepository,
};

#[test]
fn inbox_is_newest_first_and_filters() {
    let conn = open_db_in_memory().unwrap();
    let inbox = FeedbackService::new(SqliteFeedbackRepository::new(&conn));
    let base = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

    let first = inbox.submit("Hello", "Great event", false, base).unwrap();
    let join = inbox
        .submit("Joining", "How do I join?", true, base + Duration::hours(1))
        .unwrap();
    let latest = inbox
        .submit("Venue", "Where is it?", false, base + Duration::hours(2))
        .unwrap();

    let all: Vec<String> = inbox
        .inbox(&FeedbackFilter::default())
        .unwrap()
        .into_iter()
        .map(|feedback| feedback.id)
        .collect();
    assert_eq!(all, [latest.clone(), join.clone(), first.clone()]);

    let joins = inbox
        .inbox(&FeedbackFilter {
            join_interest_only: true,
            ..FeedbackFilter::default()
        })
        .unwrap();
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].id, join);
    assert_eq!(joins[0].submitted_at, base + Duration::hours(1));
}

#[test]
fn mark_read_updates_unread_count() {
    let conn = open_db_in_memory().unwrap();
    let inbox = FeedbackService::new(SqliteFeedbackRepository::new(&conn));
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

    let id = inbox.submit("Question", "Is it free?", false, now).unwrap();
    inbox.submit("Other", "Thanks", false, now).unwrap();
    assert_eq!(inbox.unread_count().unwrap(), 2);

    inbox.mark_read(&id).unwrap();
    assert_eq!(inbox.unread_count().unwrap(), 1);

    let unread = inbox
        .inbox(&FeedbackFilter {
            status: Some(FeedbackStatus::New),
            ..FeedbackFilter::default()
        })
        .unwrap();
    assert_eq!(unread.len(), 1);
    assert_ne!(unread[0].id, id);
}

#[test]
fn blank_submission_is_rejected_and_missing_ids_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let inbox = FeedbackService::new(SqliteFeedbackRepository::new(&conn));
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

    assert!(matches!(
        inbox.submit("Subject", "   ", false, now),
        Err(FeedbackError::Validation(_))
    ));
    assert!(matches!(inbox.mark_read("ghost"), Err(FeedbackError::NotFound(_))));
    assert!(matches!(inbox.delete("ghost"), Err(FeedbackError::NotFound(_))));
    assert_eq!(inbox.unread_count().unwrap(), 0);
}
