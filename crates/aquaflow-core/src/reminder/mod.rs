mod clock;
mod time_source;
mod window;

pub use clock::{evaluate, hour_boundary_crossed, status_at, ClockStatus, ReminderClock, TickOutcome};
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use window::{format_countdown, ReminderWindow, DEFAULT_END_HOUR, DEFAULT_START_HOUR};
