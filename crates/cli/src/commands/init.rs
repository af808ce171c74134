//! `parley init` — First-time setup.

use parley_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Parley — First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config file already exists: {}", config_path.display());
        println!("Leaving it untouched.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config file: {}", config_path.display());

    println!();
    println!("Next steps:");
    println!("  1. Set an API key:      export GROQ_API_KEY=gsk_...");
    println!("  2. Optional web search: export TAVILY_API_KEY=tvly-...");
    println!("  3. Start chatting:      parley chat");

    Ok(())
}
