//! Debounced write-back of the daily state.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::hydration::DailyState;

/// Default debounce between the last mutation and the remote write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

/// Pending state with its debounce deadline.
#[derive(Debug, Clone)]
struct PendingWrite {
    state: DailyState,
    due_at: Instant,
}

/// Single restartable timer: each `schedule` replaces the pending state and
/// pushes the deadline out, so only the freshest state is ever sent.
///
/// A pending state for an earlier date is never replaced. It moves to the
/// carried queue, is due at once, and is handed out before the current day.
#[derive(Debug)]
pub struct WriteBackDebouncer {
    delay: Duration,
    pending: Option<PendingWrite>,
    carried: VecDeque<PendingWrite>,
}

impl WriteBackDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            carried: VecDeque::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending write for the same date and restart the timer.
    pub fn schedule(&mut self, state: DailyState, now: Instant) {
        if let Some(previous) = self.pending.take() {
            if previous.state.date != state.date {
                self.carried.push_back(PendingWrite {
                    state: previous.state,
                    due_at: now,
                });
            }
        }
        self.pending = Some(PendingWrite {
            state,
            due_at: now + self.delay,
        });
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.carried
            .front()
            .or(self.pending.as_ref())
            .map(|p| p.due_at)
    }

    pub fn is_pending(&self) -> bool {
        !self.carried.is_empty() || self.pending.is_some()
    }

    /// Take the next state whose deadline has passed, earlier dates first.
    pub fn take_due(&mut self, now: Instant) -> Option<DailyState> {
        if let Some(carried) = self.carried.pop_front() {
            return Some(carried.state);
        }
        match &self.pending {
            Some(pending) if pending.due_at <= now => self.pending.take().map(|p| p.state),
            _ => None,
        }
    }

    /// Take the next state regardless of its deadline, earlier dates first.
    pub fn take_now(&mut self) -> Option<DailyState> {
        if let Some(carried) = self.carried.pop_front() {
            return Some(carried.state);
        }
        self.pending.take().map(|p| p.state)
    }
}

impl Default for WriteBackDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn state(count: u8) -> DailyState {
        DailyState {
            glass_count: count,
            ..DailyState::fresh(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap())
        }
    }

    #[test]
    fn test_not_due_before_delay() {
        let start = Instant::now();
        let mut debouncer = WriteBackDebouncer::default();
        debouncer.schedule(state(1), start);

        assert!(debouncer.take_due(start + Duration::from_millis(1199)).is_none());
        assert!(debouncer.is_pending());
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(1200)),
            Some(state(1))
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_schedule_restarts_timer_and_keeps_latest() {
        let start = Instant::now();
        let mut debouncer = WriteBackDebouncer::default();
        debouncer.schedule(state(1), start);
        debouncer.schedule(state(2), start + Duration::from_millis(500));
        debouncer.schedule(state(3), start + Duration::from_millis(1000));

        // First deadline has passed, but the timer was restarted.
        assert!(debouncer.take_due(start + Duration::from_millis(1300)).is_none());
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(2200))
        );
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(2200)),
            Some(state(3))
        );
        assert!(debouncer.take_due(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_new_date_carries_previous_day() {
        let start = Instant::now();
        let mut debouncer = WriteBackDebouncer::default();
        debouncer.schedule(state(2), start);

        let tomorrow = DailyState::fresh(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        debouncer.schedule(tomorrow.clone(), start + Duration::from_millis(300));

        // Yesterday is due immediately, today still waits for its timer.
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(300)));
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(300)),
            Some(state(2))
        );
        assert!(debouncer.take_due(start + Duration::from_millis(300)).is_none());
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.take_now(), Some(tomorrow));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_take_now_ignores_deadline() {
        let mut debouncer = WriteBackDebouncer::default();
        debouncer.schedule(state(4), Instant::now());
        assert_eq!(debouncer.take_now(), Some(state(4)));
        assert!(debouncer.take_now().is_none());
    }
}
