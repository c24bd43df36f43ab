//! Tests for the daily state store: load, write-back and degraded operation.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;
    use tokio::time::Instant;

    use super::super::state::DailyState;
    use super::super::store::*;
    use crate::events::Event;
    use crate::storage::Database;
    use crate::sync::{ConnectivityStatus, InMemoryRemoteStore, RemoteRecord};

    const USER: &str = "aquaflow-test";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn cached(db: &Database, state: &DailyState) {
        db.kv_set(STORAGE_KEY, &serde_json::to_string(state).unwrap())
            .unwrap();
    }

    fn remote_record(count: u8) -> RemoteRecord {
        RemoteRecord {
            count,
            is_active: true,
            last_reminder_hour: Some(10),
            updated_at: None,
        }
    }

    fn open(
        db: Database,
        remote: Option<Arc<InMemoryRemoteStore>>,
    ) -> DailyStateStore<InMemoryRemoteStore> {
        DailyStateStore::open_local(db, remote, StoreOptions::new(USER), today())
    }

    #[tokio::test]
    async fn test_load_adopts_remote_values() {
        let db = Database::open_in_memory().unwrap();
        cached(&db, &DailyState { glass_count: 1, ..DailyState::fresh(today()) });
        let remote = Arc::new(InMemoryRemoteStore::new().with_record(USER, today(), remote_record(5)));

        let mut store = open(db, Some(remote.clone()));
        assert_eq!(store.status().connectivity, ConnectivityStatus::Loading);
        let events = store.load().await;

        assert_eq!(store.state().glass_count, 5);
        assert!(store.state().is_active);
        assert_eq!(store.state().last_reminder_hour, Some(10));
        assert_eq!(store.status().connectivity, ConnectivityStatus::Connected);
        assert!(store.status().last_sync_at.is_some());
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::RemoteStateAdopted { glass_count: 5, .. })));

        // Adopted values reach the cache but are not echoed back.
        assert!(!store.has_pending_write_back());
        assert!(remote.upserts().is_empty());
    }

    #[tokio::test]
    async fn test_adopted_state_is_cached() {
        let remote = Arc::new(InMemoryRemoteStore::new().with_record(USER, today(), remote_record(4)));
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        let mut store = DailyStateStore::open_local(
            Database::open_at(&path).unwrap(),
            Some(remote),
            StoreOptions::new(USER),
            today(),
        );
        store.load().await;
        drop(store);

        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(read_cached(&reopened).unwrap().glass_count, 4);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_cached_state() {
        let db = Database::open_in_memory().unwrap();
        cached(&db, &DailyState { glass_count: 3, ..DailyState::fresh(today()) });
        let remote = Arc::new(InMemoryRemoteStore::new().with_record(USER, today(), remote_record(7)));
        remote.set_offline(true);

        let mut store = open(db, Some(remote));
        let events = store.load().await;

        assert_eq!(store.state().glass_count, 3);
        assert_eq!(store.status().connectivity, ConnectivityStatus::Degraded);
        assert!(store.status().last_error.as_deref().unwrap().starts_with("fetch"));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::SyncStatusChanged {
                connectivity: ConnectivityStatus::Degraded,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_load_with_no_remote_record_keeps_local() {
        let db = Database::open_in_memory().unwrap();
        cached(&db, &DailyState { glass_count: 2, ..DailyState::fresh(today()) });
        let remote = Arc::new(InMemoryRemoteStore::new());

        let mut store = open(db, Some(remote.clone()));
        store.load().await;

        assert_eq!(store.state().glass_count, 2);
        assert_eq!(store.status().connectivity, ConnectivityStatus::Connected);
        assert_eq!(remote.fetch_count(), 1);
    }

    #[test]
    fn test_malformed_cache_is_discarded() {
        let db = Database::open_in_memory().unwrap();
        db.kv_set(STORAGE_KEY, "{not json").unwrap();

        let store = open(db, None);
        assert_eq!(store.state(), &DailyState::fresh(today()));
    }

    #[test]
    fn test_out_of_range_cache_is_discarded() {
        let db = Database::open_in_memory().unwrap();
        db.kv_set(
            STORAGE_KEY,
            r#"{"date":"2026-10-15","glass_count":12,"is_active":true,"last_reminder_hour":null}"#,
        )
        .unwrap();

        let store = open(db, None);
        assert_eq!(store.state().glass_count, 0);
        assert!(!store.state().is_active);
    }

    #[test]
    fn test_stale_cache_starts_fresh_day() {
        let db = Database::open_in_memory().unwrap();
        cached(
            &db,
            &DailyState {
                date: today().pred_opt().unwrap(),
                glass_count: 6,
                is_active: true,
                last_reminder_hour: Some(17),
            },
        );

        let store = open(db, None);
        assert_eq!(store.state(), &DailyState::fresh(today()));
    }

    #[tokio::test]
    async fn test_local_only_store() {
        let mut store = open(Database::open_in_memory().unwrap(), None);
        assert_eq!(store.status().connectivity, ConnectivityStatus::LocalOnly);
        assert!(store.fetch_job().is_none());
        assert!(store.load().await.is_empty());

        assert!(store.mutate(DailyState::with_glass_added));
        assert_eq!(store.state().glass_count, 1);
        assert!(store.write_back_deadline().is_none());
        assert!(store.take_pending_write_back().is_none());
        assert_eq!(store.status().connectivity, ConnectivityStatus::LocalOnly);
    }

    #[test]
    fn test_mutation_is_cached_immediately() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        let mut store: DailyStateStore<InMemoryRemoteStore> = DailyStateStore::open_local(
            Database::open_at(&path).unwrap(),
            None,
            StoreOptions::new(USER),
            today(),
        );
        store.mutate(DailyState::with_glass_added);
        store.mutate(|s| s.with_active(true));

        let cached = read_cached(&Database::open_at(&path).unwrap()).unwrap();
        assert_eq!(cached.glass_count, 1);
        assert!(cached.is_active);
    }

    #[test]
    fn test_noop_mutation_does_not_schedule() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote));
        let generation = store.generation();

        assert!(!store.mutate(DailyState::with_count_reset));
        assert_eq!(store.generation(), generation);
        assert!(!store.has_pending_write_back());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_mutations_writes_once_with_latest() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));
        store.load().await;

        store.mutate(DailyState::with_glass_added);
        tokio::time::advance(Duration::from_millis(400)).await;
        store.mutate(DailyState::with_glass_added);
        tokio::time::advance(Duration::from_millis(400)).await;
        store.mutate(DailyState::with_glass_added);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(store.take_due_write_back(Instant::now()).is_none());

        tokio::time::advance(Duration::from_millis(200)).await;
        let job = store.take_due_write_back(Instant::now()).unwrap();
        assert_eq!(store.status().connectivity, ConnectivityStatus::Syncing);
        let outcome = job.await;
        store.apply_outcome(outcome);

        let upserts = remote.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].2.count, 3);
        assert_eq!(store.status().connectivity, ConnectivityStatus::Connected);
    }

    #[tokio::test]
    async fn test_write_failure_degrades_and_keeps_state() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));
        store.load().await;

        remote.set_offline(true);
        store.mutate(DailyState::with_glass_added);
        let events = store.flush().await;

        assert_eq!(store.state().glass_count, 1);
        assert_eq!(store.status().connectivity, ConnectivityStatus::Degraded);
        assert!(store
            .status()
            .last_error
            .as_deref()
            .unwrap()
            .starts_with("write-back"));
        assert!(!events.is_empty());
        assert!(!store.is_writing());

        // The next mutation is the next attempt.
        remote.set_offline(false);
        store.mutate(DailyState::with_glass_added);
        store.flush().await;
        assert_eq!(store.status().connectivity, ConnectivityStatus::Connected);
        assert_eq!(store.status().last_error, None);
        assert_eq!(remote.record(USER, today()).unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_fetch_after_local_mutation_is_ignored() {
        let remote = Arc::new(InMemoryRemoteStore::new().with_record(USER, today(), remote_record(5)));
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));

        let job = store.fetch_job().unwrap();
        assert!(store.is_loading());
        store.mutate(DailyState::with_glass_added);
        let outcome = job.await;
        let events = store.apply_outcome(outcome);
        assert!(!store.is_loading());

        assert_eq!(store.state().glass_count, 1);
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::RemoteStateAdopted { .. })));
        assert!(store.has_pending_write_back());

        store.flush().await;
        assert_eq!(remote.record(USER, today()).unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_pending_write_waits_for_in_flight_write() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));
        store.load().await;

        store.mutate(DailyState::with_glass_added);
        let first = store.take_pending_write_back().unwrap();
        assert!(store.is_writing());

        store.mutate(DailyState::with_glass_added);
        assert!(store.take_pending_write_back().is_none());
        assert!(store.write_back_deadline().is_none());

        let outcome = first.await;
        store.apply_outcome(outcome);
        assert!(store.write_back_deadline().is_some());

        let second = store.take_pending_write_back().unwrap();
        let outcome = second.await;
        store.apply_outcome(outcome);

        let counts: Vec<u8> = remote.upserts().iter().map(|u| u.2.count).collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollover_sends_previous_day_first() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));
        store.load().await;

        store.mutate(DailyState::with_glass_added);
        store.mutate(DailyState::with_glass_added);
        let tomorrow = today().succ_opt().unwrap();
        store.mutate(|s| s.rolled_over(tomorrow));

        // The previous day does not wait for the debounce.
        let job = store.take_due_write_back(Instant::now()).unwrap();
        let outcome = job.await;
        store.apply_outcome(outcome);
        assert_eq!(remote.record(USER, today()).unwrap().count, 2);
        assert!(store.take_due_write_back(Instant::now()).is_none());

        tokio::time::advance(Duration::from_millis(1200)).await;
        let job = store.take_due_write_back(Instant::now()).unwrap();
        let outcome = job.await;
        store.apply_outcome(outcome);

        let dates: Vec<NaiveDate> = remote.upserts().iter().map(|u| u.1).collect();
        assert_eq!(dates, vec![today(), tomorrow]);
    }

    #[tokio::test]
    async fn test_write_uses_date_of_mutated_state() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let mut store = open(Database::open_in_memory().unwrap(), Some(remote.clone()));
        store.load().await;

        let tomorrow = today().succ_opt().unwrap();
        store.mutate(|s| s.with_active(true).rolled_over(tomorrow));
        store.flush().await;

        let upserts = remote.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].1, tomorrow);
        assert!(upserts[0].2.is_active);
    }
}
