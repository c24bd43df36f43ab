use super::{one_shot, print_snapshot, CliResult};

/// Print today's state, refreshed from the remote when one is configured.
pub fn run() -> CliResult {
    let events = one_shot(None)?;
    print_snapshot(&events)
}
