#![cfg(not(tarpaulin_include))]

use attendance::{app, config::Config};

/// Main entry point for the attendance server
///
/// Reads configuration from the environment (see [`Config`]), opens the
/// configured database and serves the REST API until Ctrl+C or SIGTERM.
///
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    app::run(config).await
}
