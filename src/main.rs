use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    handlers::router,
    mailer::ResendSender,
    rate_limit::cleanup_task,
    AppState, Args, Config,
};

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing(args.log_json);

    let port = args.port;
    let config = Config::from(args);

    info!(
        port,
        receiver = ?config.receiver,
        api_key_set = config.api_key.is_some(),
        allowed_origins = ?config.allowed_origins,
        rate_limit = config.rate_limit,
        rate_window_secs = config.rate_window.as_secs(),
        "Starting contact relay"
    );
    if config.api_key.is_none() {
        warn!("RESEND_API_KEY is not set, submissions will fail until it is");
    }

    let sender = ResendSender::new(config.resend_url.clone(), config.email_timeout)?;
    let cleanup_every = config.cleanup_interval;

    // creating shared state
    let state = Arc::new(AppState::new(config, Arc::new(sender)));

    // spawn the background sweeper
    let limiter = Arc::clone(&state.rate_limiter);
    tokio::spawn(async move {
        cleanup_task(limiter, cleanup_every).await;
    });

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Contact relay listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Contact relay stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }
}

// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
