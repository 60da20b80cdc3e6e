//! `stepwise tools`: List the built-in tools.

use std::path::Path;

use stepwise_config::AppConfig;
use stepwise_tools::{ToolRegistry, ToolSettings};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = ToolRegistry::new(ToolSettings::from(&config.tools));

    println!("🔧 Available tools ({}):", registry.tools().len());
    for tool in registry.tools() {
        println!("   {:<12} {}", tool.name(), tool.description());
    }
    println!();
    println!("   Weather service: {}", config.tools.weather_url);
    println!("   File directory:  {}", config.tools.workspace_dir.display());

    Ok(())
}
