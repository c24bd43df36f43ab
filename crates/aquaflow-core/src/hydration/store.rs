//! The single owner of today's `DailyState`.
//!
//! Every change goes through [`DailyStateStore::mutate`], which writes the
//! local cache synchronously and schedules a debounced remote write. Remote
//! calls are handed out as [`SyncJob`] futures; the caller spawns them and
//! feeds the resulting [`SyncOutcome`] back through
//! [`DailyStateStore::apply_outcome`].
//!
//! ```text
//! open_local -> fetch_job (loading) -> apply_outcome(Fetched) -> connected | degraded
//! mutate -> debounce -> take_due_write_back (syncing) -> apply_outcome(Written)
//! ```
//!
//! A fetch result is adopted only while the store is still at the generation
//! the fetch started from, i.e. no local mutation and no rollover happened in
//! between. Only one write is in flight at a time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::state::DailyState;
use crate::events::Event;
use crate::storage::Database;
use crate::sync::{
    ConnectivityStatus, RemoteStore, SyncError, SyncOutcome, SyncStatus, WriteBackDebouncer,
    DEFAULT_DEBOUNCE,
};

/// Local cache key holding the JSON-encoded state.
pub const STORAGE_KEY: &str = "daily_state";

/// A remote call ready to be spawned.
pub type SyncJob = Pin<Box<dyn Future<Output = SyncOutcome> + Send + 'static>>;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Partition key for remote records.
    pub user_key: String,
    pub debounce: Duration,
}

impl StoreOptions {
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

pub struct DailyStateStore<R: RemoteStore> {
    db: Database,
    remote: Option<Arc<R>>,
    user_key: String,
    state: DailyState,
    status: SyncStatus,
    /// Bumped on every local change.
    generation: u64,
    write_back: WriteBackDebouncer,
    writing: bool,
    loading: bool,
    events: Vec<Event>,
}

impl<R: RemoteStore> DailyStateStore<R> {
    /// Build the store from the local cache alone.
    ///
    /// A cached state for `today` is used as is. A cached state for another
    /// day, an unreadable cache or a malformed value all start a fresh day.
    pub fn open_local(
        db: Database,
        remote: Option<Arc<R>>,
        options: StoreOptions,
        today: NaiveDate,
    ) -> Self {
        let state = match read_cached(&db) {
            Some(cached) if cached.date == today => cached,
            Some(cached) => {
                debug!(cached = %cached.date, %today, "cached state is from another day");
                DailyState::fresh(today)
            }
            None => DailyState::fresh(today),
        };

        let connectivity = if remote.is_some() {
            ConnectivityStatus::Loading
        } else {
            ConnectivityStatus::LocalOnly
        };

        let store = Self {
            db,
            remote,
            user_key: options.user_key,
            state,
            status: SyncStatus::new(connectivity),
            generation: 0,
            write_back: WriteBackDebouncer::new(options.debounce),
            writing: false,
            loading: false,
            events: Vec::new(),
        };
        store.persist_local();
        store
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &DailyState {
        &self.state
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_writing(&self) -> bool {
        self.writing
    }

    pub fn has_pending_write_back(&self) -> bool {
        self.write_back.is_pending()
    }

    /// When the next write should start. `None` while a write is in flight,
    /// since the pending one waits for it.
    pub fn write_back_deadline(&self) -> Option<Instant> {
        if self.writing {
            None
        } else {
            self.write_back.deadline()
        }
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Apply a transition. Returns whether the state changed.
    ///
    /// A change is cached locally right away and scheduled for write-back.
    pub fn mutate<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&DailyState) -> DailyState,
    {
        let next = f(&self.state);
        if next == self.state {
            return false;
        }
        self.state = next;
        self.generation += 1;
        self.persist_local();
        if self.remote.is_some() {
            self.write_back.schedule(self.state.clone(), Instant::now());
        }
        true
    }

    // ── Remote jobs ──────────────────────────────────────────────────

    /// Fetch-on-load for today's record. `None` when running local-only.
    ///
    /// The job ensures the remote schema first.
    pub fn fetch_job(&mut self) -> Option<SyncJob> {
        let remote = self.remote.clone()?;
        let user_key = self.user_key.clone();
        let date = self.state.date;
        let generation = self.generation;

        self.loading = true;
        self.set_status(ConnectivityStatus::Loading, None);

        Some(Box::pin(async move {
            let result = fetch_with_schema(remote.as_ref(), &user_key, date).await;
            SyncOutcome::Fetched {
                date,
                generation,
                result,
            }
        }))
    }

    /// Fetch inline and apply the outcome.
    pub async fn load(&mut self) -> Vec<Event> {
        if let Some(job) = self.fetch_job() {
            let outcome = job.await;
            self.apply_outcome(outcome)
        } else {
            self.take_events()
        }
    }

    /// Start the pending write if its debounce deadline has passed.
    pub fn take_due_write_back(&mut self, now: Instant) -> Option<SyncJob> {
        if self.writing {
            return None;
        }
        let state = self.write_back.take_due(now)?;
        self.write_job(state)
    }

    /// Start the pending write without waiting for its deadline.
    pub fn take_pending_write_back(&mut self) -> Option<SyncJob> {
        if self.writing {
            return None;
        }
        let state = self.write_back.take_now()?;
        self.write_job(state)
    }

    /// Send any pending write now and wait for it.
    ///
    /// A write already in flight elsewhere is not awaited; its outcome must
    /// still be applied by whoever spawned it.
    pub async fn flush(&mut self) -> Vec<Event> {
        let mut events = self.take_events();
        while let Some(job) = self.take_pending_write_back() {
            let outcome = job.await;
            events.extend(self.apply_outcome(outcome));
        }
        events
    }

    fn write_job(&mut self, state: DailyState) -> Option<SyncJob> {
        let remote = self.remote.clone()?;
        let user_key = self.user_key.clone();
        let date = state.date;
        let record = state.to_remote();

        self.writing = true;
        self.set_status(ConnectivityStatus::Syncing, self.status.last_error.clone());
        debug!(%date, count = record.count, "writing back daily state");

        Some(Box::pin(async move {
            let result = remote.upsert(&user_key, date, &record).await;
            SyncOutcome::Written { date, result }
        }))
    }

    /// Fold a finished remote call into the store.
    pub fn apply_outcome(&mut self, outcome: SyncOutcome) -> Vec<Event> {
        match outcome {
            SyncOutcome::Fetched {
                date,
                generation,
                result,
            } => {
                self.loading = false;
                match result {
                    Ok(Some(record)) => {
                        if generation == self.generation && date == self.state.date {
                            self.adopt_remote(&record);
                        } else {
                            debug!(
                                %date,
                                started_at = generation,
                                now_at = self.generation,
                                "local state changed during fetch, keeping local"
                            );
                        }
                        self.mark_success();
                    }
                    Ok(None) => {
                        debug!(%date, "no remote record for today");
                        self.mark_success();
                    }
                    Err(e) => self.mark_failure("fetch", &e),
                }
            }
            SyncOutcome::Written { date, result } => {
                self.writing = false;
                match result {
                    Ok(()) => {
                        debug!(%date, "write-back complete");
                        self.mark_success();
                    }
                    Err(e) => self.mark_failure("write-back", &e),
                }
            }
        }
        self.take_events()
    }

    fn adopt_remote(&mut self, record: &crate::sync::RemoteRecord) {
        let adopted = self.state.with_remote(record);
        if adopted == self.state {
            return;
        }
        info!(
            count = adopted.glass_count,
            is_active = adopted.is_active,
            "adopted remote state"
        );
        self.state = adopted;
        self.persist_local();
        self.events.push(Event::RemoteStateAdopted {
            glass_count: self.state.glass_count,
            is_active: self.state.is_active,
            last_reminder_hour: self.state.last_reminder_hour,
        });
    }

    fn mark_success(&mut self) {
        self.status.last_sync_at = Some(Utc::now());
        let connectivity = self.busy_status().unwrap_or(ConnectivityStatus::Connected);
        self.set_status(connectivity, None);
    }

    fn mark_failure(&mut self, operation: &str, err: &SyncError) {
        warn!(operation, error = %err, "remote store unavailable, continuing locally");
        let connectivity = self.busy_status().unwrap_or(ConnectivityStatus::Degraded);
        self.set_status(connectivity, Some(format!("{operation}: {err}")));
    }

    fn busy_status(&self) -> Option<ConnectivityStatus> {
        if self.writing {
            Some(ConnectivityStatus::Syncing)
        } else if self.loading {
            Some(ConnectivityStatus::Loading)
        } else {
            None
        }
    }

    fn set_status(&mut self, connectivity: ConnectivityStatus, last_error: Option<String>) {
        if self.status.connectivity == connectivity && self.status.last_error == last_error {
            return;
        }
        self.status.connectivity = connectivity;
        self.status.last_error = last_error.clone();
        self.events.push(Event::SyncStatusChanged {
            connectivity,
            last_error,
        });
    }

    // ── Local cache ──────────────────────────────────────────────────

    fn persist_local(&self) {
        let json = match serde_json::to_string(&self.state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode daily state");
                return;
            }
        };
        if let Err(e) = self.db.kv_set(STORAGE_KEY, &json) {
            warn!(error = %e, "failed to write local cache");
        }
    }
}

async fn fetch_with_schema<R: RemoteStore>(
    remote: &R,
    user_key: &str,
    date: NaiveDate,
) -> Result<Option<crate::sync::RemoteRecord>, SyncError> {
    remote.ensure_schema().await?;
    remote.fetch(user_key, date).await
}

/// Read the cached state, discarding anything unreadable or out of domain.
pub fn read_cached(db: &Database) -> Option<DailyState> {
    let raw = match db.kv_get(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "failed to read local cache");
            return None;
        }
    };

    let state: DailyState = match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "discarding malformed cached state");
            return None;
        }
    };

    if let Err(e) = state.validate() {
        warn!(error = %e, "discarding out-of-range cached state");
        return None;
    }
    Some(state)
}
