pub mod config;
pub mod glass;
pub mod notify;
pub mod reminders;
pub mod run;
pub mod serve;
pub mod status;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use aquaflow_core::alerts::{ChimeChannel, DesktopNotifier};
use aquaflow_core::reminder::SystemTimeSource;
use aquaflow_core::storage::data_dir;
use aquaflow_core::sync::{get_or_create_user_key_at, is_valid_user_key};
use aquaflow_core::{
    Command, Config, ConfigError, DailyStateStore, Database, Event, HttpRemoteStore,
    HydrationService, NotificationPermission, ReminderAlerts, StoreOptions,
};
use chrono::Local;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

pub type Service = HydrationService<HttpRemoteStore, SystemTimeSource>;

/// Single-threaded runtime for one-shot commands.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn user_key(config: &Config, dir: &std::path::Path) -> aquaflow_core::Result<String> {
    match config.sync.user_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            if !is_valid_user_key(key) {
                return Err(ConfigError::InvalidValue {
                    key: "sync.user_key".into(),
                    message: format!("'{key}' is not a valid user key"),
                }
                .into());
            }
            Ok(key.to_string())
        }
        _ => Ok(get_or_create_user_key_at(dir)?),
    }
}

pub fn build_alerts(config: &Config, dir: &std::path::Path) -> ReminderAlerts {
    let notifications = &config.notifications;
    let mut alerts = ReminderAlerts::new().with_channel(ChimeChannel::new(
        dir,
        notifications.enabled && notifications.sound,
        notifications.custom_sound.as_ref().map(PathBuf::from),
    ));
    if notifications.enabled {
        alerts.push(DesktopNotifier::new(notifications.permission));
    }
    alerts
}

/// Wire the service from configuration and the local cache.
pub fn build_service(config: &Config) -> aquaflow_core::Result<Service> {
    let dir = data_dir()?;
    let remote = match config.sync_endpoint() {
        Some(endpoint) => Some(Arc::new(HttpRemoteStore::new(endpoint)?)),
        None => None,
    };
    let options = StoreOptions::new(user_key(config, &dir)?).with_debounce(config.debounce());
    let store = DailyStateStore::open_local(
        Database::open()?,
        remote,
        options,
        Local::now().date_naive(),
    );

    Ok(HydrationService::new(
        store,
        config.reminder_window()?,
        build_alerts(config, &dir),
        SystemTimeSource,
    ))
}

/// Load, apply one command, push the change to the remote, and return
/// the events plus a final snapshot.
pub fn one_shot(command: Option<Command>) -> CliResult<Vec<Event>> {
    let config = Config::load()?;
    let mut service = build_service(&config)?;

    let events = runtime()?.block_on(async {
        let mut events = service.store_mut().load().await;
        if let Some(command) = command {
            events.extend(service.handle(command));
        }
        events.extend(service.store_mut().flush().await);
        events.push(service.snapshot());
        events
    });

    remember_permission(&events)?;
    Ok(events)
}

/// Persist a permission answer carried by `events`.
pub fn remember_permission(events: &[Event]) -> CliResult {
    let answered = events.iter().rev().find_map(|e| match e {
        Event::NotificationPermissionChanged { permission } => Some(*permission),
        _ => None,
    });
    if let Some(permission) = answered {
        save_permission(permission)?;
    }
    Ok(())
}

pub fn save_permission(permission: NotificationPermission) -> CliResult {
    let mut config = Config::load()?;
    config.set("notifications.permission", permission.as_str())?;
    Ok(())
}

/// The trailing snapshot of a one-shot run.
pub fn print_snapshot(events: &[Event]) -> CliResult {
    if let Some(snapshot) = events
        .iter()
        .rev()
        .find(|e| matches!(e, Event::StateSnapshot { .. }))
    {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    }
    Ok(())
}
