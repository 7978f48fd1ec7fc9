use anyhow::{Context, Result};
use clap::Parser;
use solaxd::cli::Options;
use solaxd::config::Config;
use solaxd::engine::InverterEngine;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::parse();

    let mut config = Config::load(options.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    options.apply_to(&mut config);
    config.validate()?;

    solaxd::logging::init_logging(&config.logging)?;
    info!("SolaXd {} starting up", env!("APP_VERSION"));

    let transport = solaxd::transport::open(&config).context("Failed to open transport")?;
    let mut engine = InverterEngine::new(&config.inverter, transport);

    let snapshot_rx = engine.subscribe();
    let host = config.web.host.clone();
    let port = config.web.port;
    let web_task = tokio::spawn(async move {
        if let Err(e) = solaxd::web::serve(snapshot_rx, &host, port).await {
            error!("Web server error: {}", e);
        }
    });

    let result = engine
        .run(Duration::from_millis(config.poll_interval_ms))
        .await;
    web_task.abort();

    match result {
        Ok(()) => {
            info!("SolaXd shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Engine stopped: {}", e);
            Err(anyhow::anyhow!("Engine error: {}", e))
        }
    }
}
