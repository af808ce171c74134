//! `parley chat` — Interactive or single-message chat mode.

use parley_config::AppConfig;
use parley_core::ChatStore;
use parley_pipeline::{ChatPipeline, ChatRequest, ModeFlags};
use std::io::{BufRead, Write};
use std::sync::Arc;

pub async fn run(
    message: Option<String>,
    search: bool,
    deep: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if config.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GROQ_API_KEY=gsk_...        (recommended)");
        eprintln!("    export OPENAI_API_KEY=sk-...       (for OpenAI direct)");
        eprintln!("    export PARLEY_API_KEY=...          (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!(
            "    {}",
            AppConfig::config_dir().join("config.toml").display()
        );
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    if search && config.search.api_key.is_none() {
        eprintln!("  WARNING: --search requested but TAVILY_API_KEY is not set;");
        eprintln!("  turns will degrade to no-search.");
    }

    let capabilities = parley_providers::build_from_config(&config);

    let store: Arc<dyn ChatStore> = match config.store.backend.as_str() {
        "in_memory" => Arc::new(parley_store::InMemoryStore::new()),
        _ => {
            let path = config.store_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Arc::new(
                parley_store::SqliteStore::new(&format!("sqlite://{}", path.display())).await?,
            )
        }
    };

    let pipeline = ChatPipeline::new(
        capabilities.completion,
        capabilities.classifier,
        capabilities.search,
        store.clone(),
        &config.default_model,
    )
    .with_temperature(config.default_temperature)
    .with_max_tokens(config.default_max_tokens);

    let conversation = store.create("local", "").await?;
    let flags = ModeFlags {
        search_requested: search,
        deep_reasoning_requested: deep,
    };

    let send = |text: String| ChatRequest {
        owner_id: "local".into(),
        conversation_id: conversation.id.clone(),
        text,
        file_names: vec![],
        document_data: String::new(),
        flags,
    };

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let outcome = pipeline.run(send(msg)).await?;
        eprint!("\r              \r");
        println!("{}", outcome.assistant_turn.content);
        return Ok(());
    }

    // Interactive mode
    println!("Parley interactive chat — model {} (Ctrl-D to exit)", config.default_model);
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match pipeline.run(send(line.to_string())).await {
            Ok(outcome) => {
                if outcome.used_history {
                    tracing::debug!("Extended conversational memory was injected");
                }
                println!("{}\n", outcome.assistant_turn.content);
            }
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}
