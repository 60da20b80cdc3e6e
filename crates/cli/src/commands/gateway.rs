//! `stepwise gateway`: Serve the browser chat UI.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_with_key(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🧭 Stepwise Gateway");
    println!("   Open:  http://{}:{}/", config.gateway.host, config.gateway.port);
    println!("   Model: {}", config.model);
    println!("   Files: {}", config.tools.workspace_dir.display());

    stepwise_gateway::start(config).await?;

    Ok(())
}
