//! Today's hydration state and the state store that persists it.

mod state;
mod store;

pub use state::{DailyState, MAX_GLASSES};
pub use store::{read_cached, DailyStateStore, StoreOptions, SyncJob, STORAGE_KEY};

#[cfg(test)]
mod store_tests;
