use clap::Subcommand;
use aquaflow_core::Command;

use super::{one_shot, print_snapshot, CliResult};

#[derive(Subcommand)]
pub enum GlassAction {
    /// Log one glass (stops at the daily goal)
    Add,
    /// Set today's count back to zero
    Reset,
}

pub fn run(action: GlassAction) -> CliResult {
    let command = match action {
        GlassAction::Add => Command::AddGlass,
        GlassAction::Reset => Command::ResetCount,
    };
    let events = one_shot(Some(command))?;
    print_snapshot(&events)
}
