//! `parley status` — Show configuration and provider health.

use parley_config::AppConfig;
use parley_core::CompletionClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Parley status");
    println!("=============");
    println!("Config dir:        {}", AppConfig::config_dir().display());
    println!("Provider:          {}", config.default_provider);
    println!("Model:             {}", config.default_model);
    println!("Classifier model:  {}", config.classifier_model());
    println!("Store backend:     {} ({})", config.store.backend, config.store_path().display());
    println!(
        "API key:           {}",
        if config.has_api_key() { "configured" } else { "MISSING" }
    );
    println!(
        "Search key:        {}",
        if config.search.api_key.is_some() { "configured" } else { "not set (search disabled)" }
    );

    if config.has_api_key() {
        let capabilities = parley_providers::build_from_config(&config);
        print!("Provider health:   ");
        match capabilities.completion.health_check().await {
            Ok(true) => println!("ok"),
            Ok(false) => println!("unreachable"),
            Err(e) => println!("error ({e})"),
        }
    }

    Ok(())
}
