use notify_rust::Notification;
use tracing::warn;

use super::{AlertChannel, AlertError, Capability, NotificationPermission, Reminder};

/// Desktop notification through the platform notification service.
///
/// Desktop platforms have no permission prompt of their own, so the
/// permission is remembered in configuration and a request grants it.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    permission: NotificationPermission,
}

impl DesktopNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl AlertChannel for DesktopNotifier {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn capability(&self) -> Capability {
        match self.permission {
            NotificationPermission::Granted => Capability::Available,
            NotificationPermission::Denied => Capability::Denied,
            NotificationPermission::Default => Capability::Unavailable,
        }
    }

    fn permission(&self) -> Option<NotificationPermission> {
        Some(self.permission)
    }

    fn request_permission(&mut self) -> Option<NotificationPermission> {
        if self.permission == NotificationPermission::Default {
            self.permission = NotificationPermission::Granted;
        }
        Some(self.permission)
    }

    fn deliver(&mut self, reminder: &Reminder) -> Result<(), AlertError> {
        let title = reminder.title();
        let body = reminder.body();
        std::thread::Builder::new()
            .name("aquaflow-notify".into())
            .spawn(move || {
                if let Err(e) = Notification::new()
                    .summary(title)
                    .body(&body)
                    .appname("aquaflow")
                    .icon("dialog-information")
                    .show()
                {
                    warn!(error = %e, "desktop notification failed");
                }
            })
            .map_err(|e| AlertError::Notification(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_follows_permission() {
        assert_eq!(
            DesktopNotifier::new(NotificationPermission::Granted).capability(),
            Capability::Available
        );
        assert_eq!(
            DesktopNotifier::new(NotificationPermission::Denied).capability(),
            Capability::Denied
        );
        assert_eq!(
            DesktopNotifier::new(NotificationPermission::Default).capability(),
            Capability::Unavailable
        );
    }

    #[test]
    fn request_does_not_override_denial() {
        let mut notifier = DesktopNotifier::new(NotificationPermission::Denied);
        assert_eq!(
            notifier.request_permission(),
            Some(NotificationPermission::Denied)
        );
    }
}
