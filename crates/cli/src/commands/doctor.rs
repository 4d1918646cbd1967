//! `agromind doctor` — Diagnose configuration and store health.

use agromind_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 AgroMind Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Ok(());
        }
    };

    match agromind_store::open_from_config(&config.store).await {
        Ok(store) => match store.find_farmer("doctor-probe").await {
            Ok(_) => println!("  ✅ Store reachable ({})", store.name()),
            Err(e) => {
                println!("  ❌ Store query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Store could not be opened: {e}");
            issues += 1;
        }
    }

    match agromind_providers::build_from_config(&config) {
        Ok(Some(provider)) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Model provider configured ({})", provider.name()),
            Ok(false) | Err(_) => {
                println!("  ⚠️  Model provider {} did not pass its health check", provider.name());
                issues += 1;
            }
        },
        Ok(None) => {
            println!("  ⚠️  No API key — set OPENAI_API_KEY to enable advisory queries");
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ Model provider misconfigured: {e}");
            issues += 1;
        }
    }

    match agromind_sources::build_from_config(&config) {
        Ok(sources) => {
            let report = [
                ("Weather", sources.weather.is_some(), "OPENWEATHER_API_KEY"),
                ("Market", sources.market.is_some(), "DATA_GOV_API_KEY"),
                ("Soil", sources.soil.is_some(), "sources.soil_provider"),
            ];
            for (feature, enabled, hint) in report {
                if enabled {
                    println!("  ✅ {feature} sync enabled");
                } else {
                    println!("  ⚠️  {feature} sync disabled — set {hint}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Data sources misconfigured: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
