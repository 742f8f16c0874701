//! `clawloop doctor`: Diagnose system health.

use clawloop_config::AppConfig;
use clawloop_core::model::ModelClient;
use clawloop_providers::{OpenAiCompatClient, TierModels};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ClawLoop Doctor — System Diagnostics");
    println!("====================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid ({})", config_path.display());
            } else {
                println!("  ⚠️  No config file, using defaults");
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            return Err("configuration is invalid".into());
        }
    };

    // Check API key and backend
    if config.has_api_key() {
        println!("  ✅ API key configured");
        match OpenAiCompatClient::from_config(&config.provider, TierModels::from(&config.tiers)) {
            Ok(client) => match client.health_check().await {
                Ok(true) => println!("  ✅ Backend reachable ({})", config.provider.base_url),
                Ok(false) => {
                    println!("  ⚠️  Backend answered but reported unhealthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Backend unreachable: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Model client: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key configured — set CLAWLOOP_API_KEY or add provider.api_key");
        issues += 1;
    }

    // Check storage directories
    for (label, dir) in [("Todo", &config.todos.dir), ("Summary", &config.summaries.dir)] {
        match std::fs::create_dir_all(dir) {
            Ok(()) => println!("  ✅ {label} directory writable ({})", dir.display()),
            Err(e) => {
                println!("  ❌ {label} directory {}: {e}", dir.display());
                issues += 1;
            }
        }
    }

    // Check project instructions
    let cwd = std::env::current_dir()?;
    let instructions = cwd.join(&config.workspace.instructions_file);
    if instructions.exists() {
        println!("  ✅ Project instructions found");
    } else {
        println!("  ℹ️  No project instructions at {}", instructions.display());
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
