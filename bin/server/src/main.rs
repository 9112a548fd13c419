use std::sync::Arc;
use tollgate_auth::ProviderRegistry;
use tollgate_server::{auth::AppState, config::ServerConfig, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(provider = config.auth.provider(), "Loaded configuration");

    let registry = ProviderRegistry::with_defaults();
    let provider = match registry.build(&config.auth) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(
                error = %e.current_context(),
                available = ?registry.names(),
                "Failed to configure auth provider"
            );
            std::process::exit(1);
        }
    };

    let app = router(Arc::new(AppState::new(provider, config.secure_cookies)));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
