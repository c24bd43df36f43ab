//! Reminder side effects.
//!
//! Each effect is an [`AlertChannel`] that reports its own capability.
//! [`ReminderAlerts`] calls every available channel on a firing and logs
//! the rest; nothing here can change the day state.

mod chime;
mod desktop;

pub use chime::{encode_wav, synthesize_chime, ChimeChannel, CHIME_SAMPLE_RATE};
pub use desktop::DesktopNotifier;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Whether a channel can deliver right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Available,
    Unavailable,
    /// The user refused this channel.
    Denied,
}

/// Remembered answer to the notification permission prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Never asked.
    #[default]
    Default,
}

impl NotificationPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPermission::Granted => "granted",
            NotificationPermission::Denied => "denied",
            NotificationPermission::Default => "default",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// One reminder firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub hour: u8,
}

impl Reminder {
    pub fn title(&self) -> &'static str {
        "Time to drink water!"
    }

    pub fn body(&self) -> String {
        format!(
            "It's {:02}:00. Take a break and have a glass of water.",
            self.hour
        )
    }
}

/// A way of telling the user that a reminder fired.
pub trait AlertChannel: Send {
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    /// Permission state for channels that have one.
    fn permission(&self) -> Option<NotificationPermission> {
        None
    }

    /// Ask for permission. Returns the new state for channels that have one.
    fn request_permission(&mut self) -> Option<NotificationPermission> {
        None
    }

    fn deliver(&mut self, reminder: &Reminder) -> Result<(), AlertError>;
}

/// What happened to each channel on one firing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertReport {
    pub delivered: Vec<&'static str>,
    pub skipped: Vec<(&'static str, Capability)>,
    pub failed: Vec<(&'static str, String)>,
}

/// The set of channels a firing goes out on.
#[derive(Default)]
pub struct ReminderAlerts {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl ReminderAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: impl AlertChannel + 'static) -> Self {
        self.push(channel);
        self
    }

    pub fn push(&mut self, channel: impl AlertChannel + 'static) {
        self.channels.push(Box::new(channel));
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn capabilities(&self) -> Vec<(&'static str, Capability)> {
        self.channels
            .iter()
            .map(|c| (c.name(), c.capability()))
            .collect()
    }

    /// Permission of the first channel that has one.
    pub fn permission(&self) -> Option<NotificationPermission> {
        self.channels.iter().find_map(|c| c.permission())
    }

    /// Ask every permission-bearing channel that has not been asked yet.
    ///
    /// Returns the resulting permission when it changed.
    pub fn request_permissions(&mut self) -> Option<NotificationPermission> {
        let mut changed = None;
        for channel in &mut self.channels {
            if channel.permission() != Some(NotificationPermission::Default) {
                continue;
            }
            if let Some(permission) = channel.request_permission() {
                if permission != NotificationPermission::Default {
                    debug!(channel = channel.name(), permission = permission.as_str(), "permission answered");
                    changed = Some(permission);
                }
            }
        }
        changed
    }

    /// Deliver on every available channel. Failures are logged, never returned.
    pub fn fire(&mut self, reminder: &Reminder) -> AlertReport {
        let mut report = AlertReport::default();
        for channel in &mut self.channels {
            let name = channel.name();
            match channel.capability() {
                Capability::Available => match channel.deliver(reminder) {
                    Ok(()) => report.delivered.push(name),
                    Err(e) => {
                        warn!(channel = name, error = %e, "reminder alert failed");
                        report.failed.push((name, e.to_string()));
                    }
                },
                other => {
                    debug!(channel = name, capability = ?other, "skipping alert channel");
                    report.skipped.push((name, other));
                }
            }
        }
        report
    }
}

/// Channel that records deliveries in memory. Clones share the log.
#[derive(Debug, Clone)]
pub struct RecordingChannel {
    name: &'static str,
    capability: Capability,
    fail: bool,
    delivered: Arc<Mutex<Vec<Reminder>>>,
}

impl RecordingChannel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            capability: Capability::Available,
            fail: false,
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Make every delivery return an error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn delivered(&self) -> Vec<Reminder> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AlertChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn deliver(&mut self, reminder: &Reminder) -> Result<(), AlertError> {
        if self.fail {
            return Err(AlertError::Unavailable(format!("{} is failing", self.name)));
        }
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*reminder);
        Ok(())
    }
}
