use std::path::PathBuf;

use aquaflow_core::storage::data_dir;
use aquaflow_core::sync::{server, RecordDb};
use aquaflow_core::Config;
use clap::Args;
use tokio::net::TcpListener;

use super::CliResult;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on [default: server.bind]
    #[arg(long)]
    bind: Option<String>,
    /// Record database file [default: server.database or <data_dir>/records.db]
    #[arg(long)]
    database: Option<PathBuf>,
}

pub fn run(args: ServeArgs) -> CliResult {
    let config = Config::load()?;
    let bind = args.bind.unwrap_or(config.server.bind);
    let database = match args.database.or(config.server.database.map(PathBuf::from)) {
        Some(path) => path,
        None => data_dir()?.join("records.db"),
    };

    let db = RecordDb::open(&database)?;
    tracing::info!(database = %database.display(), "opened record database");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = TcpListener::bind(&bind).await?;
        server::serve(listener, db).await
    })?;
    Ok(())
}
