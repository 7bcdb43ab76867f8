use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use weatherdash::config::{DashboardConfig, LoggingConfig};
use weatherdash::service::WeatherService;
use weatherdash::web;

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!(version = weatherdash::VERSION, "starting weatherdash");

    let service =
        Arc::new(WeatherService::new(&config).context("failed to build weather service")?);

    web::run(config.server.port, service).await
}
