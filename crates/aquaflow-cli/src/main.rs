use std::env;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "aquaflow", version, about = "AquaFlow hydration reminder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder loop in the foreground
    Run(commands::run::RunArgs),
    /// Print today's state as JSON
    Status,
    /// Glass counter
    Glass {
        #[command(subcommand)]
        action: commands::glass::GlassAction,
    },
    /// Turn hourly reminders on or off
    Reminders {
        #[command(subcommand)]
        action: commands::reminders::RemindersAction,
    },
    /// Notification permission and alert channels
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Serve the record database over HTTP
    Serve(commands::serve::ServeArgs),
}

fn init_logging(default_level: &str) {
    let debug_enabled = env::var("AQUAFLOW_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    });

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Status => commands::status::run(),
        Commands::Glass { action } => commands::glass::run(action),
        Commands::Reminders { action } => commands::reminders::run(action),
        Commands::Notify { action } => commands::notify::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Serve(args) => commands::serve::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
