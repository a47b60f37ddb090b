//! agentgate server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use agentgate::config::{self, Config, OauthConfig};
use agentgate::server::{self, AppState};

/// HTTP front-end relaying chat messages to an external agent service.
#[derive(Parser, Debug)]
#[command(name = "agentgate", author, version, about, long_about = None)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "AGENTGATE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Base URL of the upstream agent service
    #[arg(long, env = "AGENTGATE_AGENT_URL")]
    agent_url: String,

    /// Conversation history database path (default: ~/.agentgate/data/history.db)
    #[arg(long, env = "AGENTGATE_HISTORY_DB")]
    history_db: Option<PathBuf>,

    /// Audit log database path (default: ~/.agentgate/data/logs.db)
    #[arg(long, env = "AGENTGATE_LOGS_DB")]
    logs_db: Option<PathBuf>,

    /// Verification token expected on slash-command webhooks
    #[arg(long, env = "AGENTGATE_SLACK_TOKEN")]
    slack_verification_token: Option<String>,

    /// Verify token for the messenger subscription handshake
    #[arg(long, env = "AGENTGATE_MESSENGER_TOKEN")]
    messenger_verify_token: Option<String>,

    /// OAuth2 token endpoint for authenticating upstream calls
    #[arg(long, env = "AGENTGATE_OAUTH_TOKEN_URL")]
    oauth_token_url: Option<String>,

    /// OAuth2 client id
    #[arg(long, env = "AGENTGATE_OAUTH_CLIENT_ID")]
    oauth_client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(long, env = "AGENTGATE_OAUTH_CLIENT_SECRET")]
    oauth_client_secret: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = resolve_config(cli)?;
    config.ensure_data_dirs()?;

    let state = Arc::new(AppState::new(&config));
    let addr = server::start_server(config.listen, Arc::clone(&state))
        .await
        .with_context(|| format!("Failed to start server on {}", config.listen))?;
    tracing::info!("agentgate listening on {addr}, relaying to {}", config.agent_url);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    state.shutdown().await;

    Ok(())
}

fn resolve_config(cli: Cli) -> anyhow::Result<Config> {
    let history_db = config::resolve_history_db_path(cli.history_db.as_deref())
        .context("Could not determine a history database path")?;
    let logs_db = config::resolve_logs_db_path(cli.logs_db.as_deref())
        .context("Could not determine a logs database path")?;
    let oauth = OauthConfig::from_parts(
        cli.oauth_token_url,
        cli.oauth_client_id,
        cli.oauth_client_secret,
    )?;

    Ok(Config {
        listen: cli.listen,
        agent_url: cli.agent_url,
        history_db,
        logs_db,
        slack_verification_token: cli.slack_verification_token,
        messenger_verify_token: cli.messenger_verify_token,
        oauth,
    })
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
