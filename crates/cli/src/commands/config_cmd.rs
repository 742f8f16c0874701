//! `clawloop config`: print the effective configuration.

use clawloop_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", config_path().display());
    if config.has_api_key() {
        println!("# provider.api_key is set (hidden)");
    }
    println!("{}", config.to_toml_redacted());
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path().display());
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = super::config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
    }
}
