//! Check server binary

use anyhow::Context;
use checks_server::{CheckServer, Config, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing is not initialized yet, so config problems go to stderr.
    let yaml_config = match Config::load() {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Using default configuration");
            None
        }
    };

    let (log_level, json_logs) = yaml_config
        .as_ref()
        .map(|cfg| (cfg.log_level().to_string(), cfg.json_logs()))
        .unwrap_or_else(|| ("info".to_string(), false));

    if json_logs {
        common::logging::init_json(&log_level);
    } else {
        common::logging::init(&log_level);
    }

    tracing::info!("Check server starting");

    let server_config = yaml_config
        .map(|cfg| {
            tracing::info!("Configuration loaded successfully");
            cfg.to_server_config()
        })
        .unwrap_or_else(|| {
            tracing::warn!("Using default configuration");
            ServerConfig::default()
        });

    let snapshot_path = server_config.snapshot_path.clone();
    CheckServer::new(server_config)
        .run()
        .await
        .with_context(|| format!("check server failed (snapshot at '{}')", snapshot_path.display()))?;

    Ok(())
}
