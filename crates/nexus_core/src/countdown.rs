//! Countdown engine for upcoming items.
//!
//! # Responsibility
//! - Decompose the time left until a target into days/hours/minutes/seconds.
//! - Drive many independent countdowns from discrete clock ticks.
//! - Tie each countdown's lifetime to the handle owned by its view.
//!
//! # Invariants
//! - Breakdown components are never negative (delta is clamped at zero).
//! - A countdown emits `Completed` exactly once and nothing afterwards.
//! - A cancelled countdown emits nothing.
//! - Dropping a `CountdownHandle` cancels its countdown.

use crate::model::content::{ContentCategory, ContentItem};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::rc::{Rc, Weak};

const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Source of "now" for classification and ticking.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for simulations and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Time left until a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Breakdown {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Display for Breakdown {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Splits a delta into whole days/hours/minutes/seconds.
///
/// Negative deltas are clamped to zero; sub-second remainders are dropped.
pub fn decompose(delta: Duration) -> Breakdown {
    let total = u64::try_from(delta.num_seconds()).unwrap_or(0);
    Breakdown {
        days: total / SECONDS_PER_DAY,
        hours: ((total / SECONDS_PER_HOUR) % 24) as u32,
        minutes: ((total / SECONDS_PER_MINUTE) % 60) as u32,
        seconds: (total % 60) as u32,
    }
}

/// Recompute interval requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickGranularity {
    /// Hero banner style, one tick per second.
    #[default]
    Second,
    /// Listing style, one tick per minute.
    Minute,
}

impl TickGranularity {
    pub fn interval(self) -> Duration {
        match self {
            Self::Second => Duration::seconds(1),
            Self::Minute => Duration::seconds(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick(Breakdown),
    /// Target reached; the owner should hide the countdown.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Active,
    Completed,
    Cancelled,
}

/// One countdown toward a fixed target.
#[derive(Debug, Clone)]
pub struct Countdown {
    target: DateTime<Utc>,
    granularity: TickGranularity,
    next_tick: DateTime<Utc>,
    state: CountdownState,
    breakdown: Breakdown,
}

impl Countdown {
    /// Starts a countdown; the first `poll` at or after `now` ticks.
    pub fn start(target: DateTime<Utc>, granularity: TickGranularity, now: DateTime<Utc>) -> Self {
        Self {
            target,
            granularity,
            next_tick: now,
            state: CountdownState::Active,
            breakdown: decompose(target - now),
        }
    }

    /// Advances the countdown to `now`.
    ///
    /// Returns `Completed` once the target is reached, a `Tick` when a tick
    /// boundary has passed since the previous tick, and `None` otherwise.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<CountdownEvent> {
        if self.state != CountdownState::Active {
            return None;
        }
        if self.target <= now {
            self.state = CountdownState::Completed;
            self.breakdown = Breakdown::default();
            return Some(CountdownEvent::Completed);
        }
        if now < self.next_tick {
            return None;
        }

        self.breakdown = decompose(self.target - now);
        let interval_ms = self.granularity.interval().num_milliseconds();
        let behind_ms = (now - self.next_tick).num_milliseconds();
        // Skip missed boundaries instead of replaying them.
        let steps = behind_ms / interval_ms + 1;
        self.next_tick += Duration::milliseconds(steps * interval_ms);
        Some(CountdownEvent::Tick(self.breakdown))
    }

    pub fn cancel(&mut self) {
        if self.state == CountdownState::Active {
            self.state = CountdownState::Cancelled;
        }
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CountdownState::Active
    }

    /// Breakdown as of the last tick.
    pub fn breakdown(&self) -> Breakdown {
        self.breakdown
    }
}

pub type CountdownId = u64;

/// Event emitted by `CountdownScheduler::tick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownNotice {
    pub id: CountdownId,
    /// Caller-provided label, typically the content item id.
    pub label: String,
    pub event: CountdownEvent,
}

#[derive(Debug)]
struct Slot {
    label: String,
    countdown: Countdown,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: CountdownId,
    slots: BTreeMap<CountdownId, Slot>,
}

#[derive(Debug, Default)]
struct Shared {
    registry: RefCell<Registry>,
    /// Handles dropped while `registry` was borrowed; pruned on the next tick.
    released: RefCell<Vec<CountdownId>>,
}

/// Single-threaded owner of independent countdowns.
///
/// Countdowns live exactly as long as their `CountdownHandle`.
#[derive(Debug, Default)]
pub struct CountdownScheduler {
    shared: Rc<Shared>,
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &self,
        label: impl Into<String>,
        target: DateTime<Utc>,
        granularity: TickGranularity,
        now: DateTime<Utc>,
    ) -> CountdownHandle {
        let mut registry = self.shared.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.slots.insert(
            id,
            Slot {
                label: label.into(),
                countdown: Countdown::start(target, granularity, now),
            },
        );
        CountdownHandle {
            id,
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Starts a countdown for an upcoming item; other categories get none.
    pub fn watch_item(
        &self,
        item: &ContentItem,
        granularity: TickGranularity,
        now: DateTime<Utc>,
    ) -> Option<CountdownHandle> {
        if item.category != ContentCategory::Upcoming {
            return None;
        }
        Some(self.start(item.id.as_str(), item.primary_timestamp(), granularity, now))
    }

    /// Polls every live countdown at `now`, in start order.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<CountdownNotice> {
        let released = std::mem::take(&mut *self.shared.released.borrow_mut());
        let mut registry = self.shared.registry.borrow_mut();
        for id in released {
            registry.slots.remove(&id);
        }
        let mut notices = Vec::new();
        for (id, slot) in registry.slots.iter_mut() {
            let Some(event) = slot.countdown.poll(now) else {
                continue;
            };
            if event == CountdownEvent::Completed {
                info!(
                    "event=countdown_completed module=countdown status=ok label={}",
                    slot.label
                );
            }
            notices.push(CountdownNotice {
                id: *id,
                label: slot.label.clone(),
                event,
            });
        }
        notices
    }

    /// Number of countdowns still ticking.
    pub fn active_count(&self) -> usize {
        self.shared
            .registry
            .borrow()
            .slots
            .values()
            .filter(|slot| slot.countdown.is_active())
            .count()
    }

    /// Number of countdowns whose handles are still alive.
    pub fn len(&self) -> usize {
        self.shared.registry.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owning handle for one scheduled countdown.
#[derive(Debug)]
pub struct CountdownHandle {
    id: CountdownId,
    shared: Weak<Shared>,
}

impl CountdownHandle {
    pub fn id(&self) -> CountdownId {
        self.id
    }

    /// Current state; `None` once the scheduler itself is gone.
    pub fn state(&self) -> Option<CountdownState> {
        self.with_countdown(Countdown::state)
    }

    /// Breakdown as of the last tick.
    pub fn breakdown(&self) -> Option<Breakdown> {
        self.with_countdown(Countdown::breakdown)
    }

    pub fn is_active(&self) -> bool {
        self.state() == Some(CountdownState::Active)
    }

    /// Cancels and releases the countdown.
    pub fn cancel(self) {
        drop(self);
    }

    fn with_countdown<T>(&self, read: impl FnOnce(&Countdown) -> T) -> Option<T> {
        let shared = self.shared.upgrade()?;
        let registry = shared.registry.borrow();
        let value = registry.slots.get(&self.id).map(|slot| read(&slot.countdown));
        value
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let removed = match shared.registry.try_borrow_mut() {
            Ok(mut registry) => {
                registry.slots.remove(&self.id);
                true
            }
            Err(_) => false,
        };
        if !removed {
            warn!(
                "event=countdown_release module=countdown status=deferred id={}",
                self.id
            );
            shared.released.borrow_mut().push(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decompose, Breakdown, Countdown, CountdownEvent, CountdownScheduler, TickGranularity,
    };
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn decompose_splits_each_unit() {
        assert_eq!(
            decompose(Duration::seconds(90_061)),
            Breakdown {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
    }

    #[test]
    fn decompose_clamps_negative_delta() {
        assert!(decompose(Duration::seconds(-5)).is_zero());
        assert!(decompose(Duration::milliseconds(999)).is_zero());
    }

    #[test]
    fn minute_countdown_ticks_once_per_interval() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut countdown =
            Countdown::start(now + Duration::hours(2), TickGranularity::Minute, now);

        assert!(matches!(countdown.poll(now), Some(CountdownEvent::Tick(_))));
        assert_eq!(countdown.poll(now + Duration::seconds(30)), None);
        let Some(CountdownEvent::Tick(breakdown)) = countdown.poll(now + Duration::seconds(60))
        else {
            panic!("expected a tick at the minute boundary");
        };
        assert_eq!(breakdown.hours, 1);
        assert_eq!(breakdown.minutes, 59);
    }

    #[test]
    fn late_poll_skips_missed_ticks() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut countdown = Countdown::start(now + Duration::days(1), TickGranularity::Second, now);
        countdown.poll(now);

        assert!(countdown.poll(now + Duration::milliseconds(10_500)).is_some());
        assert_eq!(countdown.poll(now + Duration::milliseconds(10_900)), None);
        assert!(countdown.poll(now + Duration::seconds(11)).is_some());
    }

    #[test]
    fn handle_dropped_while_registry_is_borrowed_is_pruned_on_next_tick() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let scheduler = CountdownScheduler::new();
        let handle = scheduler.start("hero", now + Duration::hours(1), TickGranularity::Second, now);

        {
            let _reading = scheduler.shared.registry.borrow();
            drop(handle);
        }
        assert_eq!(scheduler.len(), 1);

        assert!(scheduler.tick(now).is_empty());
        assert!(scheduler.is_empty());
    }
}
