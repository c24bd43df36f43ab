//! Remote synchronization layer.
//!
//! The daily state is mirrored to a record server keyed by
//! `(user_key, date)`. The client side is `HttpRemoteStore`; the server side
//! is `RecordDb` behind the axum router in `server`.

pub mod http_client;
pub mod record_db;
pub mod remote;
pub mod server;
pub mod types;
pub mod user_key;
pub mod write_back;


pub use http_client::HttpRemoteStore;
pub use record_db::RecordDb;
pub use remote::{InMemoryRemoteStore, RemoteStore};
pub use types::{ConnectivityStatus, RemoteRecord, SyncError, SyncOutcome, SyncStatus};
pub use user_key::{get_or_create_user_key_at, is_valid_user_key, UserKeyError};
pub use write_back::{WriteBackDebouncer, DEFAULT_DEBOUNCE};
