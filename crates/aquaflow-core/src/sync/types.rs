//! Core types for remote synchronization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::hydration::MAX_GLASSES;

/// Remote representation of one user's day, keyed by `(user_key, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub count: u8,
    pub is_active: bool,
    pub last_reminder_hour: Option<u8>,
    /// Audit timestamp set by the record store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.count > MAX_GLASSES {
            return Err(ValidationError::GlassCountOutOfRange {
                count: self.count,
                max: MAX_GLASSES,
            });
        }
        match self.last_reminder_hour {
            Some(hour) if hour > 23 => Err(ValidationError::HourOutOfRange(hour)),
            _ => Ok(()),
        }
    }

    /// Compare the value columns, ignoring audit timestamps.
    pub fn same_values(&self, other: &RemoteRecord) -> bool {
        self.count == other.count
            && self.is_active == other.is_active
            && self.last_reminder_hour == other.last_reminder_hour
    }
}

/// Connectivity of the state store to its remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    /// Fetch-on-load in flight.
    Loading,
    /// A write-back is in flight.
    Syncing,
    Connected,
    /// Last remote operation failed; running on local state.
    Degraded,
    /// No remote endpoint configured.
    LocalOnly,
}

impl ConnectivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityStatus::Loading => "loading",
            ConnectivityStatus::Syncing => "syncing",
            ConnectivityStatus::Connected => "connected",
            ConnectivityStatus::Degraded => "degraded",
            ConnectivityStatus::LocalOnly => "local_only",
        }
    }
}

/// Current sync status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub connectivity: ConnectivityStatus,
    /// Short diagnostic for the last failure.
    pub last_error: Option<String>,
    /// Last successful remote round-trip.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn new(connectivity: ConnectivityStatus) -> Self {
        Self {
            connectivity,
            last_error: None,
            last_sync_at: None,
        }
    }
}

/// Completion report of a spawned remote operation.
#[derive(Debug)]
pub enum SyncOutcome {
    Fetched {
        date: NaiveDate,
        /// Store generation when the fetch started.
        generation: u64,
        result: Result<Option<RemoteRecord>, SyncError>,
    },
    Written {
        date: NaiveDate,
        result: Result<(), SyncError>,
    },
}

/// Sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_record_wire_shape() {
        let record = RemoteRecord {
            count: 3,
            is_active: true,
            last_reminder_hour: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"count": 3, "is_active": true, "last_reminder_hour": null})
        );
    }

    #[test]
    fn test_remote_record_validate() {
        let mut record = RemoteRecord {
            count: 9,
            is_active: false,
            last_reminder_hour: None,
            updated_at: None,
        };
        assert!(record.validate().is_err());
        record.count = 8;
        assert!(record.validate().is_ok());
        record.last_reminder_hour = Some(24);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_connectivity_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectivityStatus::LocalOnly).unwrap();
        assert_eq!(json, "\"local_only\"");
    }
}
