use aquaflow_core::alerts::Reminder;
use aquaflow_core::storage::data_dir;
use aquaflow_core::{Config, NotificationPermission};
use chrono::{Local, Timelike};
use clap::Subcommand;

use super::{build_alerts, save_permission, CliResult};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Show the notification permission and each alert channel's capability
    Status,
    /// Allow desktop notifications
    Grant,
    /// Refuse desktop notifications
    Deny,
    /// Fire a reminder on every available channel now
    Test,
}

pub fn run(action: NotifyAction) -> CliResult {
    match action {
        NotifyAction::Status => {
            let config = Config::load()?;
            let alerts = build_alerts(&config, &data_dir()?);
            let channels: Vec<_> = alerts
                .capabilities()
                .into_iter()
                .map(|(name, capability)| serde_json::json!({ "name": name, "capability": capability }))
                .collect();
            let json = serde_json::json!({
                "enabled": config.notifications.enabled,
                "permission": config.notifications.permission,
                "channels": channels,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        NotifyAction::Grant => {
            save_permission(NotificationPermission::Granted)?;
            println!("notifications granted");
        }
        NotifyAction::Deny => {
            save_permission(NotificationPermission::Denied)?;
            println!("notifications denied");
        }
        NotifyAction::Test => {
            let config = Config::load()?;
            let mut alerts = build_alerts(&config, &data_dir()?);
            let report = alerts.fire(&Reminder {
                hour: Local::now().hour() as u8,
            });
            println!("delivered: {:?}", report.delivered);
            for (name, capability) in &report.skipped {
                println!("skipped: {name} ({capability:?})");
            }
            for (name, error) in &report.failed {
                println!("failed: {name}: {error}");
            }
        }
    }
    Ok(())
}
