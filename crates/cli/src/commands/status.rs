//! `agromind status` — Show the effective configuration.

use super::load_config;
use agromind_config::AppConfig;
use std::path::Path;

fn on_off(enabled: bool) -> &'static str {
    if enabled { "configured" } else { "not configured" }
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);

    println!("🌾 AgroMind Status");
    println!("==================");
    println!("  Config file:  {}", path.display());
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Store:        {} ({})", config.store.backend, config.store.url);
    println!("  Provider:     {}", config.provider.name);
    println!("  Model:        {}", config.provider.model);
    println!("  Temperature:  {}", config.provider.temperature);
    println!("  API key:      {}", on_off(config.has_api_key()));
    println!(
        "  Weather:      {}",
        on_off(config.sources.openweather_api_key.is_some())
    );
    println!(
        "  Market:       {}",
        on_off(config.sources.market_api_key.is_some())
    );
    println!("  Soil:         {}", config.sources.soil_provider);
    println!(
        "  History:      last {} turns replayed, {} kept",
        config.advisory.history_window,
        match config.advisory.retention() {
            Some(n) => n.to_string(),
            None => "all".into(),
        }
    );

    if path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — using defaults (run `agromind onboard`)");
    }

    Ok(())
}
