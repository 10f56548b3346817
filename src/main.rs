//! vault-chat - main entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vault_chat::{
    agent::Agent,
    channels::{Dashboard, ReplChannel, web::server::DashboardState},
    cli::{Cli, Command},
    config::{Config, REQUIRED_ENV_VARS},
    error::ConfigError,
    llm::create_llm_provider,
    observability::create_observer,
    vault::VaultClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvVar(var)) => {
            eprintln!("Error: {var} is not set.");
            eprintln!();
            eprintln!("Please set the following environment variables (or add them to .env):");
            for required in REQUIRED_ENV_VARS {
                eprintln!("  {required}");
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let repl = cli.should_run_repl();

    // REPL output shares the terminal, so keep it quiet unless asked.
    let default_filter = if repl { "warn" } else { "vault_chat=info,tower_http=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let vault = VaultClient::new(config.vault.clone());
    let llm = create_llm_provider(&config.llm);
    let observer = create_observer(&config.observability);
    tracing::info!(
        model = llm.model_name(),
        gateway = vault.gateway_url(),
        observer = observer.name(),
        "Starting vault-chat"
    );

    if repl {
        let channel = match cli.message {
            Some(msg) => ReplChannel::with_message(msg),
            None => ReplChannel::new(),
        };
        let mut agent = Agent::new(llm, vault)
            .with_config(config.agent.clone())
            .with_observer(observer.clone());
        channel.run(&mut agent).await?;
        observer.flush();
        return Ok(ExitCode::SUCCESS);
    }

    let mut dashboard_config = config.dashboard.clone();
    if let Some(Command::Serve { host, port }) = cli.command {
        if let Some(host) = host {
            dashboard_config.host = host;
        }
        if let Some(port) = port {
            dashboard_config.port = port;
        }
    }

    let state = DashboardState::new(llm, vault)
        .with_agent_config(config.agent.clone())
        .with_observer(observer.clone())
        .with_session_limits(dashboard_config.sessions);
    let dashboard = Dashboard::new(dashboard_config, state);
    let addr = dashboard.start().await?;

    tracing::info!("Dashboard listening on http://{addr}");
    println!("Dashboard: http://{addr}");
    println!("Auth token: {}", dashboard.auth_token());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl-C, shutting down");
    dashboard.shutdown().await?;
    observer.flush();

    Ok(ExitCode::SUCCESS)
}
