use std::net::SocketAddr;

use pricewatch::{AppState, config, routes};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "pricewatch startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let settings = config::load();

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("bad HOST {}: {e}", settings.host))?;
    let addr = SocketAddr::from((ip, settings.port));

    let state = AppState::from_settings(settings)
        .await
        .map_err(|e| e.to_string())?;

    state.scheduler.start();

    let app = routes::app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| e.to_string())?;
    info!("listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| e.to_string());

    state.scheduler.stop();
    served
}
