//! FleetDesk dashboard server.
//!
//! Loads configuration, connects the backend client and the notification
//! broker, then serves the dashboard until Ctrl+C.

use std::{path::PathBuf, sync::Arc};

use anyhow::Error;
use fd_server::{
    api,
    config::{ConfigOverrides, ServerConfig},
    logging, metrics,
};
use fleetdesk::{
    HttpBackend, NotificationHub,
    notifications::{BrokerConnector, ChannelConnector, MqttConnector},
};
use log::{info, warn};
use pico_args::Arguments;

const HELP: &str = "\
Run the FleetDesk dashboard server

USAGE:
  fd_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --backend-url  URL       Backend REST API base URL   [default: env BACKEND_URL]
  --broker-host  HOST      MQTT broker host            [default: env BROKER_HOST or localhost]
  --static-dir   PATH      Prebuilt dashboard assets   [default: env STATIC_DIR]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  BACKEND_URL              Backend REST API base URL (required)
  BROKER_ENABLED           Connect to the MQTT broker (default: true)
  COOKIE_SECURE            Mark session cookies Secure
  SUPPORTED_LOCALES        Comma separated page locales (default: en,ar)
  METRICS_BIND             Prometheus exporter address (optional)
  RUST_LOG                 Log filter
  (See .env.example for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        backend_url: pargs.opt_value_from_str("--backend-url")?,
        broker_host: pargs.opt_value_from_str("--broker-host")?,
        static_dir: pargs.opt_value_from_os_str("--static-dir", |s| {
            Ok::<PathBuf, std::convert::Infallible>(PathBuf::from(s))
        })?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    info!("Starting FleetDesk server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{}/metrics", addr);
    }

    let backend = HttpBackend::new(&config.backend.base_url, config.backend.timeout())
        .map_err(|e| anyhow::anyhow!("Failed to build backend client: {}", e))?;
    info!("Proxying to backend at {}", backend.base_url());

    let connector: Arc<dyn BrokerConnector> = if config.broker.enabled {
        info!(
            "Notifications from MQTT broker {}:{}",
            config.broker.mqtt.host, config.broker.mqtt.port
        );
        Arc::new(MqttConnector::new(config.broker.mqtt.clone()))
    } else {
        warn!("Broker disabled, notifications are in-process only");
        Arc::new(ChannelConnector::new())
    };
    let hub = Arc::new(NotificationHub::new(connector));

    match &config.static_dir {
        Some(dir) => info!("Serving dashboard pages from {}", dir.display()),
        None => warn!("No STATIC_DIR configured, page requests will 404 after the gate"),
    }

    let bind = config.bind;
    let state = api::AppState::new(Arc::new(backend), hub.clone(), config);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at http://{}. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    hub.shutdown().await;
    info!("All notification subscriptions stopped");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
