//! Argus service binary.
//!
//! Reads `.env`, loads the YAML file named by `ARGUS_CONFIG` (default
//! `argus.yaml`), registers the configured subscriptions and watches until
//! Ctrl+C.

use argus::{ArgusConfig, ArgusError, LoggingYamlConfig, build_manager};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "argus.yaml";

#[tokio::main]
async fn main() -> Result<(), ArgusError> {
    let _ = dotenvy::dotenv();
    let path = std::env::var("ARGUS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let (config, missing) = match ArgusConfig::from_file(&path) {
        Ok(config) => (config, false),
        Err(err) if err.is_missing_file() => (ArgusConfig::default(), true),
        Err(err) => return Err(err.into()),
    };
    init_tracing(&config.logging);
    if missing {
        warn!(path = %path, "config_missing_using_defaults");
    }

    let manager = build_manager(&config)?;
    for request in &config.subscriptions {
        match manager.create_job(request.clone()).await {
            Ok(subscription) => info!(
                url = %subscription.document.url,
                client = %subscription.client().url,
                "boot_subscription_registered"
            ),
            Err(err) => warn!(
                url = %request.document_url,
                client = %request.client_url,
                error = %err,
                "boot_subscription_rejected"
            ),
        }
    }

    info!(
        name = config.name.as_deref().unwrap_or("argus"),
        watched = manager.watched().len(),
        pool_size = config.parser.pool_size,
        "argus_started"
    );

    tokio::signal::ctrl_c().await?;
    manager.shutdown();
    info!("argus_stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingYamlConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
