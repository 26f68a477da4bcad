//! Gateway server library.
//!
//! Provides a reusable server function to serve the gateway either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod cors;
mod health;

use std::net::SocketAddr;

use anyhow::anyhow;
use axum::{Router, routing::get};
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use tokio::net::TcpListener;

/// Configuration for serving the gateway.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized gateway TOML configuration.
    pub config: Config,
}

/// Starts and runs the gateway server with the provided configuration.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    serve_listener(listener, config).await
}

/// Runs the gateway on an already bound listener.
pub async fn serve_listener(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    let listen_address = listener.local_addr()?;
    let app = router(&config);

    let scheme = if config.server.tls.is_some() { "https" } else { "http" };

    if config.llm.enabled() {
        log::info!("AI endpoint available at: {scheme}://{listen_address}{}", config.llm.path);
    } else {
        log::warn!("The chat gateway is disabled, only the health endpoint is served");
    }

    if config.server.health.enabled {
        log::info!(
            "Health check endpoint exposed at {scheme}://{listen_address}{}",
            config.server.health.path
        );
    }

    // Peer addresses key the per-IP rate limit.
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .serve(service)
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            axum::serve(listener, service)
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}

fn router(config: &Config) -> Router {
    let cors = cors::generate(&config.server.cors);
    let mut app = Router::new();

    if config.llm.enabled() {
        app = app.merge(llm::router(config.llm.clone()).layer(cors.clone()));
    }

    if config.server.health.enabled {
        let health_router = Router::new()
            .route(&config.server.health.path, get(health::health))
            .layer(cors);

        app = app.merge(health_router);
    }

    app
}
