//! DriveSink daemon - one-way drive-to-bucket mirroring service
//!
//! This binary wires the adapters to the sync engine and exposes three
//! commands:
//! - `login` - interactive OAuth2 PKCE flow, stores the token set
//! - `once` - runs exactly one sync cycle and exits
//! - `run` - polls at the configured interval until SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon builds the Graph drive provider and the S3 bucket store,
//! hands them to the [`DeltaOrchestrator`], and runs the polling loop
//! under a `CancellationToken` that is cancelled on shutdown signals.

mod alert;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alert::{ChannelAlertSink, LogAlertSink};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivesink_core::config::Config;
use drivesink_core::ports::{IAlertSink, IDriveProvider, IObjectStore};
use drivesink_graph::auth::{FileTokenStore, GraphAuthenticator, OAuthConfig, PkceFlow};
use drivesink_graph::client::GraphClient;
use drivesink_graph::provider::GraphDriveProvider;
use drivesink_graph::token_manager::TokenManager;
use drivesink_s3::bucket::BucketStore;
use drivesink_sync::cursor::FileCursorStore;
use drivesink_sync::engine::{CycleOutcome, DeltaOrchestrator};
use drivesink_sync::reconcile::{Reconciler, TransferSettings};
use drivesink_sync::retry::RetryPolicy;
use drivesink_sync::scheduler::PollScheduler;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "drivesink", version, about = "One-way OneDrive to S3 mirror")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authorize against the drive provider and store the token set
    Login,
    /// Run a single sync cycle and exit
    Once,
    /// Run the polling daemon until interrupted
    Run,
}

// ============================================================================
// Wiring
// ============================================================================

/// Builds the OAuth configuration, requiring a configured app id
fn oauth_config(config: &Config) -> Result<OAuthConfig> {
    let app_id = config
        .drive
        .app_id
        .clone()
        .context("drive.app_id is not configured; register an app and set it in the config file")?;
    Ok(OAuthConfig::new(
        app_id,
        config.drive.redirect_uri.clone(),
        config.drive.scopes.clone(),
    ))
}

/// Wires adapters and engine into an orchestrator
async fn build_orchestrator(
    config: &Config,
    alerts: Arc<dyn IAlertSink>,
) -> Result<Arc<DeltaOrchestrator>> {
    let errors = config.validate();
    if !errors.is_empty() {
        for err in &errors {
            error!(field = err.field.as_str(), "{}", err.message);
        }
        anyhow::bail!("configuration is invalid ({} error(s))", errors.len());
    }

    let token_store = Arc::new(FileTokenStore::new(config.state.token_path.clone()));
    let flow = PkceFlow::new(&oauth_config(config)?)?;
    let tokens = Arc::new(TokenManager::new(
        flow,
        token_store,
        chrono::Duration::seconds(config.auth.refresh_margin_secs as i64),
    ));

    let client = GraphClient::new(Duration::from_secs(config.http.timeout_secs))?;
    let drive: Arc<dyn IDriveProvider> =
        Arc::new(GraphDriveProvider::new(client, tokens.clone()));

    let bucket: Arc<dyn IObjectStore> = Arc::new(
        BucketStore::from_env(config.bucket.name.clone(), config.bucket.region.clone()).await,
    );

    let retry = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        base_delay: Duration::from_millis(config.retry.base_delay_ms),
        max_delay: Duration::from_millis(config.retry.max_delay_ms),
    };
    let settings = TransferSettings {
        multipart_threshold: config.multipart_threshold_bytes(),
        part_size: config.part_size_bytes(),
        max_parts: config.transfer.max_parts,
    };
    let reconciler = Arc::new(Reconciler::new(drive.clone(), bucket, settings, retry));
    let cursors = Arc::new(FileCursorStore::new(config.state.cursor_path.clone()));

    Ok(Arc::new(DeltaOrchestrator::new(
        drive,
        tokens,
        reconciler,
        cursors,
        alerts,
        config.bucket.key_prefix.clone(),
        config.sync.workers as usize,
    )))
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_login(config: &Config) -> Result<()> {
    let oauth = oauth_config(config)?;
    let flow = PkceFlow::new(&oauth)?;
    let store = Arc::new(FileTokenStore::new(config.state.token_path.clone()));
    let manager = TokenManager::new(
        flow,
        store,
        chrono::Duration::seconds(config.auth.refresh_margin_secs as i64),
    );

    let authenticator = GraphAuthenticator::new(oauth);
    let tokens = authenticator.login().await?;
    manager.install(tokens).await?;

    info!(
        token_path = %config.state.token_path.display(),
        "Login complete, token set stored"
    );
    Ok(())
}

async fn cmd_once(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config, Arc::new(LogAlertSink)).await?;
    match orchestrator.run_cycle().await? {
        CycleOutcome::Completed(report) => {
            info!(
                entries = report.entries,
                uploaded = report.uploaded,
                skipped = report.skipped,
                filtered = report.filtered,
                failed = report.failed,
                "Cycle finished"
            );
            if report.failed > 0 {
                anyhow::bail!("{} entries failed to sync", report.failed);
            }
            Ok(())
        }
        CycleOutcome::SkippedNotAuthorized => {
            anyhow::bail!("not authorized; run `drivesink login` first")
        }
        CycleOutcome::Halted => anyhow::bail!("refresh token rejected; run `drivesink login`"),
    }
}

async fn cmd_run(config: &Config) -> Result<()> {
    let (alerts, alert_rx) = ChannelAlertSink::new();
    ChannelAlertSink::spawn_log_consumer(alert_rx);

    let orchestrator = build_orchestrator(config, Arc::new(alerts)).await?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let scheduler = PollScheduler::new(
        orchestrator,
        Duration::from_secs(config.sync.poll_interval),
        shutdown,
    );
    scheduler.run().await
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "Loaded configuration");

    let result = match cli.command {
        Command::Login => cmd_login(&config).await,
        Command::Once => cmd_once(&config).await,
        Command::Run => cmd_run(&config).await,
    };

    match &result {
        Ok(()) => info!("drivesink finished"),
        Err(e) => error!(error = format!("{e:#}"), "drivesink exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["drivesink", "once"]).unwrap();
        assert!(matches!(cli.command, Command::Once));

        let cli = Cli::try_parse_from(["drivesink", "--config", "/tmp/c.yaml", "run"]).unwrap();
        assert_eq!(cli.config.unwrap(), PathBuf::from("/tmp/c.yaml"));
    }

    #[test]
    fn test_oauth_config_requires_app_id() {
        let config = Config::default();
        assert!(oauth_config(&config).is_err());

        let mut config = Config::default();
        config.drive.app_id = Some("app-123".to_string());
        let oauth = oauth_config(&config).unwrap();
        assert_eq!(oauth.app_id, "app-123");
    }

    #[test]
    fn test_cancellation_token_cancel_propagates() {
        let token = CancellationToken::new();
        let child = token.child_token();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(child.is_cancelled());
    }
}
