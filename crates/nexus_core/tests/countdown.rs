use chrono::{DateTime, Duration, TimeZone, Utc};
use nexus_core::countdown::{CountdownState, ManualClock};
use nexus_core::{
    decompose, Breakdown, Clock, Countdown, CountdownEvent, CountdownScheduler, TickGranularity,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap()
}

#[test]
fn decompose_matches_known_breakdowns() {
    assert_eq!(
        decompose(Duration::seconds(90_061)),
        Breakdown {
            days: 1,
            hours: 1,
            minutes: 1,
            seconds: 1
        }
    );
    assert_eq!(
        decompose(Duration::seconds(86_399)),
        Breakdown {
            days: 0,
            hours: 23,
            minutes: 59,
            seconds: 59
        }
    );
    assert_eq!(decompose(Duration::days(40)).days, 40);
    assert_eq!(decompose(Duration::seconds(90_061)).to_string(), "1d 01h 01m 01s");
}

#[test]
fn past_target_completes_immediately_with_zero_breakdown() {
    let now = start();
    let mut countdown = Countdown::start(now - Duration::minutes(1), TickGranularity::Second, now);

    assert!(countdown.breakdown().is_zero());
    assert_eq!(countdown.poll(now), Some(CountdownEvent::Completed));
    assert_eq!(countdown.poll(now + Duration::seconds(1)), None);
    assert_eq!(countdown.state(), CountdownState::Completed);
}

#[test]
fn second_countdown_runs_down_and_completes_once() {
    let clock = ManualClock::new(start());
    let target = start() + Duration::seconds(3);
    let mut countdown = Countdown::start(target, TickGranularity::Second, clock.now());

    let mut ticks = Vec::new();
    let mut completions = 0;
    for _ in 0..6 {
        match countdown.poll(clock.now()) {
            Some(CountdownEvent::Tick(breakdown)) => ticks.push(breakdown.seconds),
            Some(CountdownEvent::Completed) => completions += 1,
            None => {}
        }
        clock.advance(Duration::seconds(1));
    }

    assert_eq!(ticks, vec![3, 2, 1]);
    assert_eq!(completions, 1);
}

#[test]
fn cancelled_countdown_emits_nothing() {
    let now = start();
    let mut countdown = Countdown::start(now + Duration::seconds(2), TickGranularity::Second, now);
    countdown.cancel();

    assert_eq!(countdown.poll(now), None);
    assert_eq!(countdown.poll(now + Duration::seconds(5)), None);
    assert_eq!(countdown.state(), CountdownState::Cancelled);
}

#[test]
fn scheduler_drives_independent_countdowns() {
    let clock = ManualClock::new(start());
    let scheduler = CountdownScheduler::new();
    let short = scheduler.start(
        "short",
        clock.now() + Duration::seconds(30),
        TickGranularity::Second,
        clock.now(),
    );
    let long = scheduler.start(
        "long",
        clock.now() + Duration::hours(3),
        TickGranularity::Minute,
        clock.now(),
    );

    assert_eq!(scheduler.tick(clock.now()).len(), 2);

    clock.advance(Duration::seconds(31));
    let notices = scheduler.tick(clock.now());
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].label, "short");
    assert_eq!(notices[0].event, CountdownEvent::Completed);
    assert_eq!(short.state(), Some(CountdownState::Completed));
    assert!(long.is_active());
    assert_eq!(scheduler.active_count(), 1);

    clock.advance(Duration::seconds(30));
    let notices = scheduler.tick(clock.now());
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, long.id());
    match notices[0].event {
        CountdownEvent::Tick(breakdown) => {
            assert_eq!((breakdown.hours, breakdown.minutes, breakdown.seconds), (2, 58, 59));
        }
        CountdownEvent::Completed => panic!("long countdown completed early"),
    }
}

#[test]
fn dropping_handle_cancels_countdown() {
    let now = start();
    let scheduler = CountdownScheduler::new();
    let handle = scheduler.start("view", now + Duration::seconds(10), TickGranularity::Second, now);
    assert_eq!(scheduler.len(), 1);

    drop(handle);
    assert!(scheduler.is_empty());
    assert!(scheduler.tick(now + Duration::seconds(20)).is_empty());
}

#[test]
fn explicit_cancel_releases_countdown() {
    let now = start();
    let scheduler = CountdownScheduler::new();
    let keep = scheduler.start("keep", now + Duration::hours(1), TickGranularity::Minute, now);
    let cancel = scheduler.start("cancel", now + Duration::hours(1), TickGranularity::Minute, now);

    cancel.cancel();
    let notices = scheduler.tick(now);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].id, keep.id());
}

#[test]
fn handle_outlives_scheduler_without_panicking() {
    let now = start();
    let scheduler = CountdownScheduler::new();
    let handle = scheduler.start("orphan", now + Duration::hours(1), TickGranularity::Second, now);

    drop(scheduler);
    assert_eq!(handle.state(), None);
    assert_eq!(handle.breakdown(), None);
    drop(handle);
}

#[test]
fn breakdown_components_never_go_negative() {
    let now = start();
    let mut countdown = Countdown::start(now + Duration::seconds(2), TickGranularity::Second, now);
    for offset in 0..5 {
        countdown.poll(now + Duration::milliseconds(offset * 700));
        let breakdown = countdown.breakdown();
        assert!(breakdown.seconds < 60 && breakdown.minutes < 60 && breakdown.hours < 24);
    }
}
