use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vigil_agent::agent::Agent;
use vigil_agent::config::AgentConfig;
use vigil_agent::identity::AgentIdentity;
use vigil_agent::jobs::ScannerExecutor;
use vigil_agent::shutdown::install_shutdown_handler;
use vigil_agent::transport::HttpTransport;
use vigil_agent::AGENT_VERSION;

#[derive(Parser, Debug)]
#[command(name = "vigil-agent")]
#[command(version)]
#[command(about = "Host-resident vulnerability scanning agent")]
struct Args {
    /// Path to the configuration file
    #[arg(long, short = 'c', default_value = AgentConfig::default_path())]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match AgentConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG overrides the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    tracing::info!(path = %args.config.display(), "Configuration loaded");

    let identity = AgentIdentity::establish(&config);

    tracing::info!(
        version = AGENT_VERSION,
        agent_id = %identity.agent_id,
        hostname = %identity.hostname,
        operating_system = %identity.operating_system,
        architecture = %identity.architecture,
        ip_addresses = ?identity.ip_addresses,
        controller_url = %config.controller.url,
        heartbeat_interval_secs = config.heartbeat.interval_in_seconds,
        "Starting vigil-agent"
    );

    let transport = match HttpTransport::new(
        &config.controller.url,
        &config.controller.auth_token,
        &identity.agent_id,
    ) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            tracing::error!(error = %err, "Failed to initialize transport");
            return ExitCode::FAILURE;
        }
    };
    let executor = Arc::new(ScannerExecutor::new(config.scanner.command.clone()));

    let shutdown = install_shutdown_handler();
    let agent = Agent::new(&config, identity, transport, executor);
    agent.run(shutdown).await;

    ExitCode::SUCCESS
}
