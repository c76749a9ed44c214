mod app_dir;
mod cli;
mod config;
mod error;
mod storage;
mod tile_worker;

use std::process::ExitCode;

use tracing::debug;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting BlueMarble {}", env!("CARGO_PKG_VERSION"));
    cli::run()
}
