mod bot;
mod config;
mod service;
mod web;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use bot::TelegramConnector;
use config::ConfigStore;
use service::Service;

#[tokio::main]
async fn main() {
    let config_path = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "config.json".to_string()),
    );

    // Setup logging
    let log_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("threadwarden.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting threadwarden...");

    let port: u16 = match std::env::var("PORT") {
        Ok(p) => p.parse().unwrap_or_else(|_| {
            warn!("Invalid PORT {p:?}, using 3000");
            3000
        }),
        Err(_) => 3000,
    };

    let service = Arc::new(Service::new(
        ConfigStore::new(&config_path),
        Arc::new(TelegramConnector),
    ));

    match service.load_persisted().await {
        Ok(true) => {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.initialize().await });
        }
        Ok(false) => info!("Waiting for configuration via POST /configure"),
        Err(e) => error!("Failed to load saved configuration: {e}"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server running on port {port}");

    let app = web::router(service);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
    {
        error!("Server error: {e}");
    }
}
