use std::sync::Arc;

use backend::{
    build_rocket,
    config::{server_figment, system_hostname, AppConfig, StoreBackend},
    processor::VoteProcessor,
    routes::AppState,
    store::{CounterStore, MemoryStore, RedisStore},
    telemetry::{AppInsightsTelemetry, ConnectionString, Telemetry, TracingTelemetry},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn CounterStore>, Box<dyn std::error::Error>> {
    match config.store {
        StoreBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.redis_url).await?)),
        StoreBackend::Memory => {
            warn!("Using in-memory store - votes will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_telemetry(config: &AppConfig) -> Arc<dyn Telemetry> {
    match config.instrumentation_key.as_deref().and_then(ConnectionString::parse) {
        Some(connection) => Arc::new(AppInsightsTelemetry::spawn(connection)),
        None => {
            warn!("INSTRUMENTATION_KEY not set - telemetry will only be logged locally");
            Arc::new(TracingTelemetry::new())
        }
    }
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("🚀 Starting vote server");

    let config = AppConfig::load().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;
    let settings = config.resolve_settings(system_hostname)?;
    info!(
        "Voting on {} vs {} under title {:?}",
        settings.options.first, settings.options.second, settings.title
    );

    let store = connect_store(&config).await.map_err(|e| {
        error!("Failed to connect to store: {}", e);
        e
    })?;
    let telemetry = build_telemetry(&config);

    let processor = VoteProcessor::new(store, telemetry, settings);
    processor.initialize().await.map_err(|e| {
        error!("Failed to initialize counters: {}", e);
        e
    })?;
    info!("📋 Counters ready");

    let _rocket = build_rocket(server_figment(), AppState::new(processor))
        .launch()
        .await?;

    Ok(())
}
