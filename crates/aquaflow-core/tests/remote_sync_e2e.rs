//! E2E tests for the remote record store.
//!
//! A real record server is bound to an ephemeral port and the state store
//! talks to it through `HttpRemoteStore`.

use std::sync::Arc;

use aquaflow_core::hydration::StoreOptions;
use aquaflow_core::sync::{server, RecordDb, RemoteRecord};
use aquaflow_core::{
    ConnectivityStatus, DailyState, DailyStateStore, Database, HttpRemoteStore, RemoteStore,
};
use chrono::NaiveDate;
use tokio::net::TcpListener;

const USER: &str = "aquaflow-e2e";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = RecordDb::open_in_memory().unwrap();
    tokio::spawn(async move {
        let _ = server::serve(listener, db).await;
    });
    format!("http://{addr}")
}

fn record(count: u8, hour: Option<u8>) -> RemoteRecord {
    RemoteRecord {
        count,
        is_active: true,
        last_reminder_hour: hour,
        updated_at: None,
    }
}

#[tokio::test]
async fn test_client_against_server_roundtrip() {
    let endpoint = start_server().await;
    let remote = HttpRemoteStore::new(&endpoint).unwrap();

    remote.ensure_schema().await.unwrap();
    remote.ensure_schema().await.unwrap();
    assert_eq!(remote.fetch(USER, day()).await.unwrap(), None);

    remote.upsert(USER, day(), &record(3, Some(14))).await.unwrap();
    remote.upsert(USER, day(), &record(3, Some(14))).await.unwrap();

    let stored = remote.fetch(USER, day()).await.unwrap().unwrap();
    assert!(stored.same_values(&record(3, Some(14))));
    assert!(stored.updated_at.is_some());

    // Other users and other days are separate rows.
    assert_eq!(remote.fetch("aquaflow-other", day()).await.unwrap(), None);
    assert_eq!(
        remote
            .fetch(USER, day().succ_opt().unwrap())
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_server_rejects_out_of_domain_record() {
    let endpoint = start_server().await;
    let remote = HttpRemoteStore::new(&endpoint).unwrap();

    let err = remote
        .upsert(USER, day(), &record(42, None))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("400"), "{err}");
    assert_eq!(remote.fetch(USER, day()).await.unwrap(), None);
}

#[tokio::test]
async fn test_two_devices_share_the_day() {
    let endpoint = start_server().await;

    let mut laptop = DailyStateStore::open_local(
        Database::open_in_memory().unwrap(),
        Some(Arc::new(HttpRemoteStore::new(&endpoint).unwrap())),
        StoreOptions::new(USER),
        day(),
    );
    laptop.load().await;
    assert_eq!(laptop.status().connectivity, ConnectivityStatus::Connected);
    laptop.mutate(DailyState::with_glass_added);
    laptop.mutate(DailyState::with_glass_added);
    laptop.mutate(|s| s.with_active(true));
    laptop.flush().await;

    let mut phone = DailyStateStore::open_local(
        Database::open_in_memory().unwrap(),
        Some(Arc::new(HttpRemoteStore::new(&endpoint).unwrap())),
        StoreOptions::new(USER),
        day(),
    );
    phone.load().await;

    assert_eq!(phone.state().glass_count, 2);
    assert!(phone.state().is_active);
    assert_eq!(phone.status().connectivity, ConnectivityStatus::Connected);
}

#[tokio::test]
async fn test_unreachable_server_degrades_store() {
    // Bind and drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut store = DailyStateStore::open_local(
        Database::open_in_memory().unwrap(),
        Some(Arc::new(HttpRemoteStore::new(&format!("http://{addr}")).unwrap())),
        StoreOptions::new(USER),
        day(),
    );
    store.load().await;
    assert_eq!(store.status().connectivity, ConnectivityStatus::Degraded);

    store.mutate(DailyState::with_glass_added);
    store.flush().await;
    assert_eq!(store.state().glass_count, 1);
    assert_eq!(store.status().connectivity, ConnectivityStatus::Degraded);
}
