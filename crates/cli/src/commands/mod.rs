pub mod chat;
pub mod gateway;
pub mod onboard;
pub mod tools;

use std::path::Path;

use stepwise_config::AppConfig;

/// Load config, or fail with setup instructions when no API key is set.
pub fn load_with_key(config_path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in a .env file):");
        eprintln!("    STEPWISE_API_KEY=sk-ant-...    (highest priority)");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!("    CLAUDE_API_KEY=sk-ant-...");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!("    {}", path.display());
        eprintln!();
        eprintln!("  Run `stepwise onboard` to create a default config.");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}
