//! Hydration service: the reminder loop.
//!
//! `HydrationService` owns the state store, the reminder clock, the alert
//! channels and the time source. Everything it does happens on one task:
//!
//! ```text
//! select! {
//!     1 s interval      -> tick()
//!     user command      -> handle(command)
//!     debounce deadline -> spawn write-back
//!     sync outcome      -> store.apply_outcome()
//! }
//! ```
//!
//! Remote calls are spawned and report back over a channel, so a slow
//! remote never delays a tick.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::alerts::{Reminder, ReminderAlerts};
use crate::events::Event;
use crate::hydration::{DailyState, DailyStateStore, SyncJob, MAX_GLASSES};
use crate::reminder::{ReminderClock, ReminderWindow, TimeSource};
use crate::sync::{RemoteStore, SyncOutcome};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// User actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AddGlass,
    ResetCount,
    ToggleReminders,
    SetReminders(bool),
    /// "I drank" on the check-in prompt.
    ConfirmCheckIn,
    DismissCheckIn,
    Snapshot,
}

pub struct HydrationService<R: RemoteStore, T: TimeSource> {
    store: DailyStateStore<R>,
    clock: ReminderClock,
    alerts: ReminderAlerts,
    time: T,
    /// Hour of the reminder whose check-in is still open.
    pending_check_in: Option<u8>,
}

impl<R: RemoteStore, T: TimeSource> HydrationService<R, T> {
    pub fn new(
        store: DailyStateStore<R>,
        window: ReminderWindow,
        alerts: ReminderAlerts,
        time: T,
    ) -> Self {
        Self {
            store,
            clock: ReminderClock::new(window),
            alerts,
            time,
            pending_check_in: None,
        }
    }

    pub fn store(&self) -> &DailyStateStore<R> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DailyStateStore<R> {
        &mut self.store
    }

    pub fn state(&self) -> &DailyState {
        self.store.state()
    }

    pub fn pending_check_in(&self) -> Option<u8> {
        self.pending_check_in
    }

    pub fn alerts(&self) -> &ReminderAlerts {
        &self.alerts
    }

    /// One clock step: rollover, then reminder evaluation.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.time.now();
        let outcome = self.clock.tick(self.store.state(), now);
        let mut events = Vec::new();

        if let Some(from) = outcome.rolled_over_from {
            info!(%from, to = %outcome.state.date, "day rolled over");
            self.pending_check_in = None;
            events.push(Event::DayRolledOver {
                from,
                to: outcome.state.date,
            });
        }

        let fired = outcome.fired_hour;
        let next = outcome.state;
        self.store.mutate(move |_| next);

        if let Some(hour) = fired {
            info!(hour, "hydration reminder");
            events.push(Event::ReminderFired { hour, at: now });
            let report = self.alerts.fire(&Reminder { hour });
            debug!(delivered = ?report.delivered, skipped = report.skipped.len(), "alerts dispatched");
            self.pending_check_in = Some(hour);
        }

        events.extend(self.store.take_events());
        events
    }

    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        let now = self.time.now();
        let mut events = Vec::new();
        self.roll_over_if_needed(now, &mut events);

        match command {
            Command::AddGlass => {
                if self.store.mutate(DailyState::with_glass_added) {
                    events.push(Event::GlassLogged {
                        glass_count: self.store.state().glass_count,
                        at: now,
                    });
                } else {
                    debug!(max = MAX_GLASSES, "daily goal already reached");
                }
            }
            Command::ResetCount => {
                if self.store.mutate(DailyState::with_count_reset) {
                    events.push(Event::CountReset { at: now });
                }
            }
            Command::ToggleReminders => {
                let on = !self.store.state().is_active;
                self.set_reminders(on, now, &mut events);
            }
            Command::SetReminders(on) => self.set_reminders(on, now, &mut events),
            Command::ConfirmCheckIn => {
                if self.pending_check_in.take().is_some() {
                    self.store.mutate(DailyState::with_glass_added);
                    events.push(Event::CheckInConfirmed {
                        glass_count: self.store.state().glass_count,
                        at: now,
                    });
                }
            }
            Command::DismissCheckIn => {
                if self.pending_check_in.take().is_some() {
                    events.push(Event::CheckInDismissed { at: now });
                }
            }
            Command::Snapshot => events.push(self.snapshot_at(now)),
        }

        events.extend(self.store.take_events());
        events
    }

    fn set_reminders(&mut self, on: bool, now: NaiveDateTime, events: &mut Vec<Event>) {
        if self.store.mutate(|s| s.with_active(on)) {
            events.push(Event::RemindersToggled {
                is_active: on,
                at: now,
            });
        }
        if on {
            if let Some(permission) = self.alerts.request_permissions() {
                events.push(Event::NotificationPermissionChanged { permission });
            }
        }
    }

    fn roll_over_if_needed(&mut self, now: NaiveDateTime, events: &mut Vec<Event>) {
        let from = self.store.state().date;
        let today = now.date();
        if from != today && self.store.mutate(|s| s.rolled_over(today)) {
            self.pending_check_in = None;
            events.push(Event::DayRolledOver { from, to: today });
        }
    }

    pub fn snapshot(&self) -> Event {
        self.snapshot_at(self.time.now())
    }

    fn snapshot_at(&self, now: NaiveDateTime) -> Event {
        let state = self.store.state();
        let status = self.store.status();
        Event::StateSnapshot {
            date: state.date,
            glass_count: state.glass_count,
            max_glasses: MAX_GLASSES,
            is_active: state.is_active,
            last_reminder_hour: state.last_reminder_hour,
            clock: self.clock.status(state, now),
            countdown: self.clock.countdown(state, now),
            next_reminder_at: self.clock.next_reminder_time(now),
            connectivity: status.connectivity,
            last_error: status.last_error.clone(),
            last_sync_at: status.last_sync_at,
            pending_check_in: self.pending_check_in,
            at: now,
        }
    }

    /// Drive the service until `commands` closes.
    ///
    /// Starts the fetch-on-load, emits an initial snapshot, and on shutdown
    /// waits for in-flight remote calls before flushing the pending write.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<SyncOutcome>();
        let mut in_flight = 0usize;

        if let Some(job) = self.store.fetch_job() {
            spawn_job(job, &outcome_tx);
            in_flight += 1;
        }
        emit(&events, self.store.take_events());
        emit(&events, vec![self.snapshot()]);

        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.store.write_back_deadline();
            tokio::select! {
                _ = interval.tick() => {
                    let produced = self.tick();
                    emit(&events, produced);
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        let produced = self.handle(command);
                        emit(&events, produced);
                    }
                    None => break,
                },
                Some(outcome) = outcome_rx.recv() => {
                    in_flight = in_flight.saturating_sub(1);
                    let produced = self.store.apply_outcome(outcome);
                    emit(&events, produced);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(job) = self.store.take_due_write_back(Instant::now()) {
                        spawn_job(job, &outcome_tx);
                        in_flight += 1;
                    }
                    emit(&events, self.store.take_events());
                }
            }
        }

        debug!(in_flight, "command channel closed, draining remote calls");
        while in_flight > 0 {
            match outcome_rx.recv().await {
                Some(outcome) => {
                    in_flight -= 1;
                    let produced = self.store.apply_outcome(outcome);
                    emit(&events, produced);
                }
                None => break,
            }
        }
        let produced = self.store.flush().await;
        emit(&events, produced);
        self
    }
}

fn spawn_job(job: SyncJob, outcomes: &mpsc::UnboundedSender<SyncOutcome>) {
    let tx = outcomes.clone();
    tokio::spawn(async move {
        let _ = tx.send(job.await);
    });
}

fn emit(sink: &mpsc::UnboundedSender<Event>, events: Vec<Event>) {
    for event in events {
        if sink.send(event).is_err() {
            break;
        }
    }
}
