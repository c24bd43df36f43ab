//! Reminder window and countdown helpers.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_START_HOUR: u8 = 9;
/// Inclusive: reminders still fire during this hour.
pub const DEFAULT_END_HOUR: u8 = 18;

/// Hours of the day, both ends inclusive, in which reminders fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderWindow {
    start_hour: u8,
    end_hour: u8,
}

impl ReminderWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, ValidationError> {
        if start_hour > 23 {
            return Err(ValidationError::HourOutOfRange(start_hour));
        }
        if end_hour > 23 {
            return Err(ValidationError::HourOutOfRange(end_hour));
        }
        if start_hour > end_hour {
            return Err(ValidationError::InvertedWindow {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub fn contains_hour(&self, hour: u8) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.contains_hour(at.hour() as u8)
    }

    /// When the next reminder is expected, for display.
    ///
    /// Before the window: window start today. At or after the end hour:
    /// window start tomorrow. Otherwise: top of the next hour.
    pub fn next_reminder_time(&self, now: NaiveDateTime) -> NaiveDateTime {
        let hour = now.hour() as u8;
        let start = NaiveTime::from_hms_opt(u32::from(self.start_hour), 0, 0)
            .unwrap_or(NaiveTime::MIN);

        if hour < self.start_hour {
            now.date().and_time(start)
        } else if hour >= self.end_hour {
            (now.date() + Duration::days(1)).and_time(start)
        } else {
            let top_of_hour = now
                .date()
                .and_hms_opt(now.hour(), 0, 0)
                .unwrap_or(now);
            top_of_hour + Duration::hours(1)
        }
    }
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

/// Render a millisecond duration as `HH:MM:SS`. Negative values render as zero.
pub fn format_countdown(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
