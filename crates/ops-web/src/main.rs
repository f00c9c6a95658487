//! ops-web: Main Entry Point
//!
//! Chat server in front of the deployed operations agent.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use ops_agent::BedrockAgent;
use ops_core::{config, logging, Settings};
use ops_web::{create_router, AppState, SessionSigner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = config::load_environment();
    let settings = Settings::from_env()?;

    logging::init("info,ops_web=debug", settings.log_format);
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path);
    }

    let agent = BedrockAgent::from_settings(&settings).await?;
    let signer = SessionSigner::from_settings(&settings)?;
    let state = Arc::new(AppState::new(Arc::new(agent), signer));

    info!(
        agent_id = %state.agent.agent_id(),
        region = %settings.aws_region,
        "Agent client ready"
    );

    let static_dir = settings.static_dir.as_ref().map(PathBuf::from);
    let app = create_router(state, static_dir);

    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
