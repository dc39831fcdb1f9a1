use chrono::Local;
use sales_dashboard::{router, AppState, Config, CrmGateway, FileStorage};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let backend = Arc::new(FileStorage::new(&config.data_dir, config.storage_quota));

    let gateway = match &config.crm {
        Some(crm) => Some(CrmGateway::new(crm)?),
        None => {
            warn!("CRM_URL or CRM_API_KEY not set, CRM routes are disabled");
            None
        }
    };

    let state = AppState::load(backend, gateway, Local::now().date_naive()).await;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
