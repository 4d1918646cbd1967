//! `agromind onboard` — Write a default config file.

use agromind_config::AppConfig;
use std::path::Path;

/// Write the default config to `path` unless a file is already there.
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);

    println!("🌾 AgroMind — First-Time Setup");
    println!("==============================\n");

    if write_default_config(&path)? {
        println!("✅ Created {}", path.display());
        println!("\n📝 Next steps:");
        println!("   1. Put OPENAI_API_KEY, OPENWEATHER_API_KEY and DATA_GOV_API_KEY in .env");
        println!("   2. Run: agromind doctor");
        println!("   3. Run: agromind serve\n");
    } else {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("agromind.toml");

        assert!(write_default_config(&path).unwrap());
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn leaves_an_existing_config_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agromind.toml");
        std::fs::write(&path, "[gateway]\nport = 8080\n").unwrap();

        assert!(!write_default_config(&path).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[gateway]\nport = 8080\n"
        );
    }
}
