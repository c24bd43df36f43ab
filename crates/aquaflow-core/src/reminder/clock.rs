//! Hourly reminder clock.
//!
//! The clock is driven by the caller once per second and never spawns
//! anything itself. Each tick is decided by [`evaluate`], a pure function of
//! the window, the current day state, the previous tick and the current
//! local time:
//!
//! ```text
//! rollover?  -> reset count and last hour, keep is_active
//! active && hour in window && hour != last_reminder_hour && boundary crossed
//!            -> fire, last_reminder_hour = hour
//! ```
//!
//! A boundary is crossed on minute 0 of an hour, or when the previous tick
//! belonged to another hour or day. A process that starts mid-hour waits for
//! the next hour.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::window::{format_countdown, ReminderWindow};
use crate::hydration::DailyState;

/// Derived clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    /// Reminders are off.
    Paused,
    InWindow,
    OutOfWindow,
}

impl ClockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClockStatus::Paused => "paused",
            ClockStatus::InWindow => "in_window",
            ClockStatus::OutOfWindow => "out_of_window",
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub state: DailyState,
    /// Previous date when the tick rolled the day over.
    pub rolled_over_from: Option<NaiveDate>,
    /// Hour whose reminder fired on this tick.
    pub fired_hour: Option<u8>,
}

pub fn hour_boundary_crossed(previous: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    if now.minute() == 0 {
        return true;
    }
    match previous {
        Some(prev) => prev.date() != now.date() || prev.hour() != now.hour(),
        None => false,
    }
}

pub fn status_at(window: &ReminderWindow, state: &DailyState, now: NaiveDateTime) -> ClockStatus {
    if !state.is_active {
        ClockStatus::Paused
    } else if window.contains(now) {
        ClockStatus::InWindow
    } else {
        ClockStatus::OutOfWindow
    }
}

/// Decide what a tick at `now` does to `state`.
pub fn evaluate(
    window: &ReminderWindow,
    state: &DailyState,
    previous: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> TickOutcome {
    let today = now.date();
    let (state, rolled_over_from) = if state.date != today {
        (state.rolled_over(today), Some(state.date))
    } else {
        (state.clone(), None)
    };

    let hour = now.hour() as u8;
    let should_fire = state.is_active
        && window.contains_hour(hour)
        && state.last_reminder_hour != Some(hour)
        && hour_boundary_crossed(previous, now);

    if should_fire {
        TickOutcome {
            state: state.with_reminder_fired(hour),
            rolled_over_from,
            fired_hour: Some(hour),
        }
    } else {
        TickOutcome {
            state,
            rolled_over_from,
            fired_hour: None,
        }
    }
}

/// Remembers the previous tick so that [`evaluate`] can detect boundaries.
#[derive(Debug, Clone)]
pub struct ReminderClock {
    window: ReminderWindow,
    last_tick: Option<NaiveDateTime>,
}

impl ReminderClock {
    pub fn new(window: ReminderWindow) -> Self {
        Self {
            window,
            last_tick: None,
        }
    }

    pub fn window(&self) -> &ReminderWindow {
        &self.window
    }

    pub fn last_tick(&self) -> Option<NaiveDateTime> {
        self.last_tick
    }

    pub fn tick(&mut self, state: &DailyState, now: NaiveDateTime) -> TickOutcome {
        let outcome = evaluate(&self.window, state, self.last_tick, now);
        self.last_tick = Some(now);
        outcome
    }

    pub fn status(&self, state: &DailyState, now: NaiveDateTime) -> ClockStatus {
        status_at(&self.window, state, now)
    }

    pub fn next_reminder_time(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.window.next_reminder_time(now)
    }

    /// Countdown to the next reminder, or `--:--:--` outside the window.
    pub fn countdown(&self, state: &DailyState, now: NaiveDateTime) -> String {
        match self.status(state, now) {
            ClockStatus::InWindow => {
                let remaining = self.next_reminder_time(now) - now;
                format_countdown(remaining.num_milliseconds())
            }
            ClockStatus::Paused | ClockStatus::OutOfWindow => "--:--:--".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    fn active() -> DailyState {
        DailyState::fresh(day()).with_active(true)
    }

    #[test]
    fn boundary_on_minute_zero_or_hour_change() {
        assert!(hour_boundary_crossed(None, at(14, 0, 0)));
        assert!(!hour_boundary_crossed(None, at(14, 10, 0)));
        assert!(!hour_boundary_crossed(Some(at(14, 9, 59)), at(14, 10, 0)));
        assert!(hour_boundary_crossed(Some(at(13, 59, 59)), at(14, 10, 0)));
    }

    #[test]
    fn fires_on_hour_start_in_window() {
        let outcome = evaluate(&ReminderWindow::default(), &active(), None, at(14, 0, 0));
        assert_eq!(outcome.fired_hour, Some(14));
        assert_eq!(outcome.state.last_reminder_hour, Some(14));
    }

    #[test]
    fn same_hour_never_fires_twice() {
        let state = active().with_reminder_fired(14);
        let outcome = evaluate(
            &ReminderWindow::default(),
            &state,
            Some(at(14, 0, 0)),
            at(14, 0, 1),
        );
        assert_eq!(outcome.fired_hour, None);
    }

    #[test]
    fn paused_or_out_of_window_does_not_fire() {
        let window = ReminderWindow::default();
        let paused = DailyState::fresh(day());
        assert_eq!(evaluate(&window, &paused, None, at(10, 0, 0)).fired_hour, None);
        assert_eq!(evaluate(&window, &active(), None, at(19, 0, 0)).fired_hour, None);
        assert_eq!(evaluate(&window, &active(), None, at(8, 0, 0)).fired_hour, None);
    }

    #[test]
    fn end_hour_is_inclusive() {
        let outcome = evaluate(&ReminderWindow::default(), &active(), None, at(18, 0, 0));
        assert_eq!(outcome.fired_hour, Some(18));
    }

    #[test]
    fn skipped_ticks_still_fire_after_resume() {
        let outcome = evaluate(
            &ReminderWindow::default(),
            &active(),
            Some(at(11, 42, 7)),
            at(13, 5, 0),
        );
        assert_eq!(outcome.fired_hour, Some(13));
    }

    #[test]
    fn rollover_applies_before_firing() {
        let yesterday = DailyState {
            date: day().pred_opt().unwrap(),
            glass_count: 6,
            is_active: true,
            last_reminder_hour: Some(10),
        };
        let outcome = evaluate(&ReminderWindow::default(), &yesterday, None, at(10, 0, 0));
        assert_eq!(outcome.rolled_over_from, Some(day().pred_opt().unwrap()));
        assert_eq!(outcome.state.date, day());
        assert_eq!(outcome.state.glass_count, 0);
        assert!(outcome.state.is_active);
        // Hour 10 already fired yesterday, but today is a new day.
        assert_eq!(outcome.fired_hour, Some(10));
    }

    #[test]
    fn clock_status_and_countdown() {
        let clock = ReminderClock::new(ReminderWindow::default());
        assert_eq!(clock.status(&DailyState::fresh(day()), at(10, 0, 0)), ClockStatus::Paused);
        assert_eq!(clock.status(&active(), at(7, 0, 0)), ClockStatus::OutOfWindow);
        assert_eq!(clock.status(&active(), at(10, 0, 0)), ClockStatus::InWindow);

        assert_eq!(clock.countdown(&active(), at(14, 10, 0)), "00:50:00");
        assert_eq!(clock.countdown(&active(), at(20, 0, 0)), "--:--:--");
        assert_eq!(clock.countdown(&DailyState::fresh(day()), at(14, 10, 0)), "--:--:--");
    }

    #[test]
    fn clock_remembers_previous_tick() {
        let mut clock = ReminderClock::new(ReminderWindow::default());
        let mut state = active();
        let mut now = at(14, 59, 58);
        let mut fired = Vec::new();
        for _ in 0..5 {
            let outcome = clock.tick(&state, now);
            fired.extend(outcome.fired_hour);
            state = outcome.state;
            now += Duration::seconds(1);
        }
        assert_eq!(fired, vec![15]);
        assert_eq!(clock.last_tick(), Some(at(15, 0, 2)));
    }
}
