//! Foreground reminder loop.
//!
//! Reads single-word commands from stdin and prints events as they happen.
//! The loop ends on `quit`, end of input or Ctrl-C, after pending writes are
//! flushed.

use std::future::Future;
use std::time::Duration;

use aquaflow_core::{Command, Config, Event, MAX_GLASSES};
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{build_service, save_permission, CliResult};

const HELP: &str = "commands: add | reset | toggle | yes | no | status | help | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "a" | "add" | "+" => Some(Command::AddGlass),
        "r" | "reset" => Some(Command::ResetCount),
        "t" | "toggle" => Some(Command::ToggleReminders),
        "on" => Some(Command::SetReminders(true)),
        "off" => Some(Command::SetReminders(false)),
        "y" | "yes" => Some(Command::ConfirmCheckIn),
        "n" | "no" => Some(Command::DismissCheckIn),
        "s" | "status" => Some(Command::Snapshot),
        _ => None,
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::GlassLogged { glass_count, .. } => format!("glass {glass_count}/{MAX_GLASSES}"),
        Event::CountReset { .. } => "count reset".to_string(),
        Event::RemindersToggled { is_active, .. } => {
            format!("reminders {}", if *is_active { "on" } else { "off" })
        }
        Event::ReminderFired { hour, .. } => {
            format!("{hour:02}:00 time to drink water! did you drink? [yes/no]")
        }
        Event::CheckInConfirmed { glass_count, .. } => {
            format!("nice, glass {glass_count}/{MAX_GLASSES}")
        }
        Event::CheckInDismissed { .. } => "check-in dismissed".to_string(),
        Event::DayRolledOver { to, .. } => format!("new day {to}"),
        Event::RemoteStateAdopted { glass_count, .. } => {
            format!("synced from remote: glass {glass_count}/{MAX_GLASSES}")
        }
        Event::SyncStatusChanged {
            connectivity,
            last_error,
        } => match last_error {
            Some(err) => format!("sync {}: {err}", connectivity.as_str()),
            None => format!("sync {}", connectivity.as_str()),
        },
        Event::NotificationPermissionChanged { permission } => {
            format!("notifications {}", permission.as_str())
        }
        Event::StateSnapshot {
            glass_count,
            clock,
            countdown,
            connectivity,
            ..
        } => format!(
            "glass {glass_count}/{MAX_GLASSES} | {} | next {countdown} | {}",
            clock.as_str(),
            connectivity.as_str()
        ),
    }
}

/// Forward stdin commands until `quit`, end of input or `shutdown`.
///
/// Returning drops `commands`, which lets the service drain and flush.
async fn forward_commands<I, S>(input: I, shutdown: S, commands: mpsc::Sender<Command>)
where
    I: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                debug!("interrupted, flushing before exit");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            },
        };
        let word = line.trim();
        if word.is_empty() {
            continue;
        }
        if matches!(word, "q" | "quit" | "exit") {
            break;
        }
        match parse_command(word) {
            Some(command) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            None => eprintln!("{HELP}"),
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

pub fn run(args: RunArgs) -> CliResult {
    let config = Config::load()?;
    let service = build_service(&config)?;
    let json = args.json;

    let runtime = super::runtime()?;
    runtime.block_on(async move {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        if !json {
            println!("{HELP}");
        }

        let printer = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if let Event::NotificationPermissionChanged { permission } = &event {
                    if let Err(e) = save_permission(*permission) {
                        warn!(error = %e, "failed to remember notification permission");
                    }
                }
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "failed to encode event"),
                    }
                } else {
                    println!("{}", describe(&event));
                }
            }
        });

        let reader = tokio::spawn(forward_commands(
            BufReader::new(tokio::io::stdin()),
            interrupted(),
            cmd_tx,
        ));

        service.run(cmd_rx, event_tx).await;
        reader.abort();
        let _ = printer.await;
    });
    // A stdin read may still be parked on the blocking pool.
    runtime.shutdown_timeout(Duration::from_millis(100));
    Ok(())
}
