//! The contract the state store requires of a remote record store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chrono::{NaiveDate, Utc};

use super::types::{RemoteRecord, SyncError};

/// A key-value record store reachable over a request/response protocol.
///
/// Implementations must be safe to call concurrently; the store spawns
/// remote calls onto the runtime and only awaits their outcomes.
pub trait RemoteStore: Send + Sync + 'static {
    /// Idempotently make sure the backing table exists.
    fn ensure_schema(&self) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Record for `(user_key, date)`, or `None` when absent.
    fn fetch(
        &self,
        user_key: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<RemoteRecord>, SyncError>> + Send;

    /// Insert or fully overwrite the record for `(user_key, date)`.
    fn upsert(
        &self,
        user_key: &str,
        date: NaiveDate,
        record: &RemoteRecord,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: HashMap<(String, NaiveDate), RemoteRecord>,
    offline: bool,
    upserts: Vec<(String, NaiveDate, RemoteRecord)>,
    fetches: usize,
}

/// Process-local remote store with failure injection.
#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    inner: Mutex<MemoryInner>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record.
    pub fn with_record(self, user_key: &str, date: NaiveDate, record: RemoteRecord) -> Self {
        self.lock()
            .records
            .insert((user_key.to_string(), date), record);
        self
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn record(&self, user_key: &str, date: NaiveDate) -> Option<RemoteRecord> {
        self.lock()
            .records
            .get(&(user_key.to_string(), date))
            .cloned()
    }

    /// Every successful upsert, in arrival order.
    pub fn upserts(&self) -> Vec<(String, NaiveDate, RemoteRecord)> {
        self.lock().upserts.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(inner: &MemoryInner) -> Result<(), SyncError> {
        if inner.offline {
            Err(SyncError::Unavailable("remote store offline".into()))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for InMemoryRemoteStore {
    async fn ensure_schema(&self) -> Result<(), SyncError> {
        Self::check_online(&self.lock())
    }

    async fn fetch(
        &self,
        user_key: &str,
        date: NaiveDate,
    ) -> Result<Option<RemoteRecord>, SyncError> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        inner.fetches += 1;
        Ok(inner.records.get(&(user_key.to_string(), date)).cloned())
    }

    async fn upsert(
        &self,
        user_key: &str,
        date: NaiveDate,
        record: &RemoteRecord,
    ) -> Result<(), SyncError> {
        let mut inner = self.lock();
        Self::check_online(&inner)?;
        let stored = RemoteRecord {
            updated_at: Some(Utc::now()),
            ..record.clone()
        };
        inner
            .records
            .insert((user_key.to_string(), date), stored.clone());
        inner.upserts.push((user_key.to_string(), date, stored));
        Ok(())
    }
}
