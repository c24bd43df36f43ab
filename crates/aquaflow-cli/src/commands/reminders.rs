use clap::Subcommand;
use aquaflow_core::Command;

use super::{one_shot, print_snapshot, CliResult};

#[derive(Subcommand)]
pub enum RemindersAction {
    /// Start hourly reminders
    On,
    /// Pause reminders
    Off,
    /// Flip the current setting
    Toggle,
}

pub fn run(action: RemindersAction) -> CliResult {
    let command = match action {
        RemindersAction::On => Command::SetReminders(true),
        RemindersAction::Off => Command::SetReminders(false),
        RemindersAction::Toggle => Command::ToggleReminders,
    };
    let events = one_shot(Some(command))?;
    print_snapshot(&events)
}
