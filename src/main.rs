//! Studyflow - command-line client
//!
#![doc = "Studyflow - command-line client"]
#![doc = "Main entry point for the studyflow application."]

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use studyflow::auth::{self, AuthSession, GuardOutcome};
use studyflow::cli::Cli;
use studyflow::commands;
use studyflow::config::Config;
use studyflow::logging::init_logging;
use studyflow::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load and validate configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!(api_url = %config.server.api_url, "Configuration loaded");

    let api = ApiClient::new(
        &config.server.api_url,
        Duration::from_secs(config.server.request_timeout_seconds),
    )?;
    let mut session = AuthSession::new(api, auth::build_token_store(&config)?);

    // A broken token store should not stop `login` from working.
    if let Err(e) = session.restore().await {
        tracing::warn!("Could not restore session: {}", e);
    }

    // Execute command
    if let Err(err) = commands::dispatch(cli.command, &config, &mut session).await {
        if let Some(GuardOutcome::Redirect(route)) = session.handle_error(&err).await {
            eprintln!(
                "{} Run {} to sign in ({}).",
                "You are not logged in.".yellow(),
                "studyflow login".cyan(),
                route
            );
        }
        return Err(err);
    }
    Ok(())
}
