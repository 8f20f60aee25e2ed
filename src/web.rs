#![cfg(not(tarpaulin_include))]

use clap::Parser;
use data_vision::app;
use data_vision::config::{self, Config};

/// Main entry point for the web application
///
/// Reads the server configuration from flags and environment, installs the
/// logger, and serves the API (plus the front end, when built) until the
/// process receives Ctrl-C or SIGTERM.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_logging();
    let config = Config::parse();

    app::run(config).await
}
