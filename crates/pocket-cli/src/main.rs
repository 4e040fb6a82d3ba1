use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pocket_cli::{config::Config, render, repl};
use pocket_llm::{ChatClient, ClientFactory, ProviderConfig};
use pocket_persist::ThreadRepositoryBuilder;
use pocket_session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Pocket");
    tracing::info!(
        provider = config.llm.provider.display_name(),
        model = %config.llm.model,
        storage = %config.storage.dir.display(),
        "Config loaded"
    );

    // Initialize chat client (absent without a key)
    let chat_client = build_chat_client(&config)?;

    // Initialize thread storage
    let repository = ThreadRepositoryBuilder::new()
        .storage_dir(&config.storage.dir)
        .key(&config.storage.key)
        .build()?;

    let mut store = SessionStore::builder()
        .maybe_chat_client(chat_client)
        .repository(repository)
        .config(config.session_config())
        .build()?;

    store.initialize().await;

    // Greet right away; a failure is shown as a banner
    if store.is_configured() {
        println!("{}", render::TYPING_INDICATOR);
    }
    if let Err(e) = store.start_new_thread().await {
        tracing::warn!(error = %e, "Could not start the first chat");
    }

    repl::run(&mut store, BufReader::new(tokio::io::stdin())).await
}

fn build_chat_client(config: &Config) -> anyhow::Result<Option<Arc<dyn ChatClient>>> {
    let Some(api_key) = &config.api_key else {
        tracing::warn!(
            "{} is not set; chatting is disabled",
            config.llm.provider.api_key_env()
        );
        return Ok(None);
    };

    tracing::info!("Initializing {} client", config.llm.provider.display_name());
    let provider = ProviderConfig::for_provider(
        config.llm.provider,
        api_key.clone(),
        config.llm.base_url.clone(),
    );
    Ok(Some(ClientFactory::create_chat_client(provider)?))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so they never interleave with the conversation
    match config.log.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
