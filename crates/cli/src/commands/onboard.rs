//! `stepwise onboard`: First-time setup.

use std::path::Path;

use stepwise_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("🧭 Stepwise — First-Time Setup");
    println!("==============================\n");

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("✅ Created config directory: {}", dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Add `api_key = \"sk-ant-...\"` to {}", config_path.display());
    println!("      (or export ANTHROPIC_API_KEY)");
    println!("   2. Run: stepwise chat");
    println!("   3. Or:  stepwise gateway, then open the printed URL\n");

    Ok(())
}
