//! `agromind serve` — Start the HTTP API server.

use super::load_config;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🌾 AgroMind");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {} ({})", config.store.backend, config.store.url);
    println!(
        "   Advisory:  {}",
        if config.has_api_key() { "enabled" } else { "disabled (no API key)" }
    );

    agromind_gateway::start(config).await?;

    Ok(())
}
