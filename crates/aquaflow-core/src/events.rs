use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::NotificationPermission;
use crate::reminder::ClockStatus;
use crate::sync::ConnectivityStatus;

/// Every state change in the system produces an Event.
/// Front ends render them; the CLI prints them as JSON lines.
///
/// Timestamps named `at` are local wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    GlassLogged {
        glass_count: u8,
        at: NaiveDateTime,
    },
    CountReset {
        at: NaiveDateTime,
    },
    RemindersToggled {
        is_active: bool,
        at: NaiveDateTime,
    },
    ReminderFired {
        hour: u8,
        at: NaiveDateTime,
    },
    /// User answered the check-in with "I drank".
    CheckInConfirmed {
        glass_count: u8,
        at: NaiveDateTime,
    },
    CheckInDismissed {
        at: NaiveDateTime,
    },
    DayRolledOver {
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Fetch-on-load replaced local values with the remote record.
    RemoteStateAdopted {
        glass_count: u8,
        is_active: bool,
        last_reminder_hour: Option<u8>,
    },
    SyncStatusChanged {
        connectivity: ConnectivityStatus,
        last_error: Option<String>,
    },
    NotificationPermissionChanged {
        permission: NotificationPermission,
    },
    StateSnapshot {
        date: NaiveDate,
        glass_count: u8,
        max_glasses: u8,
        is_active: bool,
        last_reminder_hour: Option<u8>,
        clock: ClockStatus,
        /// `HH:MM:SS`, or `--:--:--` outside the window.
        countdown: String,
        next_reminder_at: NaiveDateTime,
        connectivity: ConnectivityStatus,
        last_error: Option<String>,
        last_sync_at: Option<DateTime<Utc>>,
        /// Hour of a check-in awaiting an answer.
        pending_check_in: Option<u8>,
        at: NaiveDateTime,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::DayRolledOver {
            from: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "DayRolledOver");
        assert_eq!(json["to"], "2026-10-15");
    }

    #[test]
    fn sync_status_event_uses_snake_case_connectivity() {
        let event = Event::SyncStatusChanged {
            connectivity: ConnectivityStatus::Degraded,
            last_error: Some("boom".into()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"connectivity\":\"degraded\""));
    }
}
