use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use misaki_bot::application::commands::{self as bot_commands, Commands as BotCommands};
use misaki_bot::application::errors::{ConfigError, StartupError};
use misaki_bot::application::messaging::{CommandParser, Router};
use misaki_bot::application::services::LedgerService;
use misaki_bot::domain::traits::{Bot, Store};
use misaki_bot::infrastructure::adapters::console::ConsoleAdapter;
use misaki_bot::infrastructure::adapters::telegram::TelegramAdapter;
use misaki_bot::infrastructure::config::{Config, StorageDriver};
use misaki_bot::infrastructure::database::Database;
use misaki_bot::infrastructure::media::YtDlpDownloader;
use misaki_bot::infrastructure::storage::MemoryStore;

#[derive(Parser)]
#[command(name = "misaki-bot")]
#[command(about = "Telegram bot for splitting shared bills", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to $CONFIG_PATH or ./config/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Read commands from stdin instead of Telegram
        #[arg(long)]
        console: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { console } => {
            if let Err(e) = run_bot(cli.config, cli.token, console).await {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("misaki-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            if let Err(e) = init_config() {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(path: Option<PathBuf>, token: Option<String>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(Config::default_path);
    let config = if path.exists() {
        Config::load(&path)?
    } else {
        tracing::warn!("Config {} not found, using defaults", path.display());
        Config::default()
    };

    let mut config = config.apply_env()?;
    if token.is_some() {
        config.telegram.token = token;
    }
    Ok(config)
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, StartupError> {
    let store: Arc<dyn Store> = match config.database.driver {
        StorageDriver::Sqlite => {
            Arc::new(Database::open(config.database.path.clone(), config.database.max_conn).await?)
        }
        StorageDriver::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

fn build_router(config: &Config, service: LedgerService, bot: Arc<dyn Bot>) -> Router {
    let mut commands = BotCommands::new(service, bot).with_owner(config.telegram.owner_id);
    if config.media.enabled {
        commands = commands.with_downloader(Arc::new(YtDlpDownloader::new(&config.media)));
    }

    let mut builder = Router::builder();
    bot_commands::register_routes(&mut builder, Arc::new(commands));
    builder.build()
}

async fn run_bot(config_path: Option<PathBuf>, token: Option<String>, console: bool) -> Result<(), StartupError> {
    let config = load_config(config_path, token)?;
    tracing::info!("Starting misaki-bot: {}", config.bot.name);

    let service = LedgerService::new(open_store(&config).await?);

    if console {
        let adapter = Arc::new(ConsoleAdapter::new(config.console.clone()));
        let router = build_router(&config, service, adapter.clone());
        adapter.run(&router).await?;
        return Ok(());
    }

    let token = config
        .telegram
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField("telegram.token (or BOT_TOKEN)".to_string()))?;

    let mut adapter = TelegramAdapter::new(token);
    adapter.fetch_bot_info().await?;
    let info = adapter.bot_info();
    tracing::info!("Bot connected: {} (@{})", info.name, info.username);

    let adapter = Arc::new(adapter);
    let router = build_router(&config, service, adapter.clone());

    if let Err(e) = adapter.register_commands(router.commands()).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    poll_updates(adapter, router, &config).await;
    Ok(())
}

/// Long-poll Telegram and dispatch every command on its own task
async fn poll_updates(bot: Arc<TelegramAdapter>, router: Router, config: &Config) {
    let parser = CommandParser::default().with_bot_username(bot.bot_info().username);
    let timeout_seconds = config.telegram.poll_timeout;
    let mut offset: i64 = 0;

    tracing::info!("Starting message loop...");

    loop {
        let updates = tokio::select! {
            result = bot.get_updates(offset, timeout_seconds) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return;
            }
        };

        match updates {
            Ok(updates) => {
                if !updates.is_empty() {
                    tracing::info!("Received {} updates", updates.len());
                }
                for update in &updates {
                    if config.telegram.debug {
                        tracing::info!("Update: {:?}", update);
                    }
                    let Some(event) = TelegramAdapter::event_from_update(&parser, update) else {
                        continue;
                    };
                    let router = router.clone();
                    tokio::spawn(async move {
                        router.dispatch(event).await;
                    });
                }

                offset = TelegramAdapter::next_offset(offset, &updates);
            }
            Err(e) => {
                tracing::error!("Failed to get updates: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        }
    }
}

fn init_config() -> Result<(), serde_yaml::Error> {
    let config = Config::default();
    let yaml = serde_yaml::to_string(&config)?;
    println!("{}", yaml);
    println!("\nSave this to {} and adjust as needed.", Config::default_path().display());
    Ok(())
}
