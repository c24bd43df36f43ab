//! # AquaFlow Core Library
//!
//! This library provides the core logic for the AquaFlow hydration reminder.
//! It follows a CLI-first layout: every operation is available from the
//! standalone `aquaflow` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Hydration**: today's `DailyState` and the store that caches it locally
//!   and mirrors it to a remote record store with debounced write-back
//! - **Reminder**: an hourly clock that the caller ticks once per second
//! - **Alerts**: capability-checked side effects (chime, desktop notification)
//! - **Sync**: the remote record store contract, its HTTP client, and the
//!   server that holds the record database
//! - **Storage**: SQLite local cache and TOML configuration
//!
//! ## Key Components
//!
//! - [`DailyStateStore`]: single owner of the day state
//! - [`ReminderClock`]: once-per-hour reminder decisions
//! - [`HydrationService`]: the 1-second event loop tying it all together
//! - [`Config`]: application configuration management

pub mod alerts;
pub mod error;
pub mod events;
pub mod hydration;
pub mod reminder;
pub mod service;
pub mod storage;
pub mod sync;

pub use alerts::{AlertChannel, Capability, NotificationPermission, ReminderAlerts};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use hydration::{DailyState, DailyStateStore, StoreOptions, MAX_GLASSES};
pub use reminder::{format_countdown, ClockStatus, ReminderClock, ReminderWindow, TimeSource};
pub use service::{Command, HydrationService};
pub use storage::{Config, Database};
pub use sync::{ConnectivityStatus, HttpRemoteStore, RemoteStore, SyncStatus};
