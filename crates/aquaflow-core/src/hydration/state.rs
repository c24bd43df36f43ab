//! The per-day hydration record.
//!
//! `DailyState` is a plain value. Every transition returns a new value so the
//! store can apply it through a single mutation path.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sync::RemoteRecord;

/// Daily goal and upper bound for `glass_count`.
pub const MAX_GLASSES: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyState {
    /// Calendar day this state belongs to.
    pub date: NaiveDate,
    pub glass_count: u8,
    /// Whether the user has turned reminders on.
    pub is_active: bool,
    /// Hour of day whose reminder was already delivered.
    #[serde(default)]
    pub last_reminder_hour: Option<u8>,
}

impl DailyState {
    /// Fresh state for a day nobody has touched yet.
    pub fn fresh(date: NaiveDate) -> Self {
        Self {
            date,
            glass_count: 0,
            is_active: false,
            last_reminder_hour: None,
        }
    }

    /// Check the domain invariants of a value read from outside the process.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.glass_count > MAX_GLASSES {
            return Err(ValidationError::GlassCountOutOfRange {
                count: self.glass_count,
                max: MAX_GLASSES,
            });
        }
        match self.last_reminder_hour {
            Some(hour) if hour > 23 => Err(ValidationError::HourOutOfRange(hour)),
            _ => Ok(()),
        }
    }

    pub fn is_full(&self) -> bool {
        self.glass_count >= MAX_GLASSES
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// One more glass, clamped at `MAX_GLASSES`.
    pub fn with_glass_added(&self) -> Self {
        Self {
            glass_count: self.glass_count.saturating_add(1).min(MAX_GLASSES),
            ..self.clone()
        }
    }

    pub fn with_count_reset(&self) -> Self {
        Self {
            glass_count: 0,
            ..self.clone()
        }
    }

    pub fn with_active(&self, is_active: bool) -> Self {
        Self {
            is_active,
            ..self.clone()
        }
    }

    pub fn toggled(&self) -> Self {
        self.with_active(!self.is_active)
    }

    pub fn with_reminder_fired(&self, hour: u8) -> Self {
        Self {
            last_reminder_hour: Some(hour),
            ..self.clone()
        }
    }

    /// Advance to `today`, keeping only the active flag.
    pub fn rolled_over(&self, today: NaiveDate) -> Self {
        Self {
            date: today,
            glass_count: 0,
            is_active: self.is_active,
            last_reminder_hour: None,
        }
    }

    /// Overwrite the value fields with a remote record. The date stays ours.
    pub fn with_remote(&self, record: &RemoteRecord) -> Self {
        Self {
            date: self.date,
            glass_count: record.count.min(MAX_GLASSES),
            is_active: record.is_active,
            last_reminder_hour: record.last_reminder_hour.filter(|h| *h <= 23),
        }
    }

    pub fn to_remote(&self) -> RemoteRecord {
        RemoteRecord {
            count: self.glass_count,
            is_active: self.is_active,
            last_reminder_hour: self.last_reminder_hour,
            updated_at: None,
        }
    }
}
