//! Binary entrypoint for the Bomzh game server.
//!
//! Commands:
//! - `start [--port <n>]` - run the HTTP server (and bot webhook when configured)
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - print configuration, catalog and player counts
//!
//! See the library crate docs for module-level details: `bomzh::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use bomzh::config::Config;
use bomzh::game::catalog::BattleCatalog;
use bomzh::storage::PlayerStore;

#[derive(Parser)]
#[command(name = "bomzh")]
#[command(about = "Persistent street-life game server with turn-based boss battles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Start {
        /// Listen port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a default configuration file
    Init,
    /// Show configuration and data summary
    Status,
}

/// Config file if present, defaults otherwise; environment overrides applied on top.
async fn load_config(path: &str) -> Result<Config> {
    let mut config = if std::path::Path::new(path).exists() {
        Config::load(path).await?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port } => {
            let mut config = load_config(&cli.config).await?;
            if let Some(port) = port {
                config.server.port = port;
            }
            init_logging(&Some(config.clone()), cli.verbose);
            if !std::path::Path::new(&cli.config).exists() {
                warn!("{} not found; running with defaults", cli.config);
            }
            info!("Starting Bomzh v{}", env!("CARGO_PKG_VERSION"));

            let router = bomzh::app::build_router(&config).await?;
            if config.bot.should_register() {
                let client = reqwest::Client::new();
                if let Err(e) = bomzh::bot::register::register_webhook(&client, &config.bot).await {
                    warn!("webhook registration failed, updates may not arrive: {}", e);
                }
            }
            let listener = tokio::net::TcpListener::bind(config.listen_addr()?).await?;
            bomzh::http::serve(listener, router, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for ctrl-c: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new configuration");
            if std::path::Path::new(&cli.config).exists() {
                warn!("{} already exists; leaving it untouched", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                info!("Configuration file created at {}", cli.config);
            }
            let config = load_config(&cli.config).await?;
            tokio::fs::create_dir_all(&config.storage.data_dir).await?;
            info!("Data directory ready at {}", config.storage.data_dir);
        }
        Commands::Status => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let catalog = BattleCatalog::load(&config.game.moves_file, &config.game.bosses_file);
            let store = PlayerStore::open(&config.storage.data_dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open player store: {}", e))?;
            let in_battle = store.players().filter(|p| p.has_active_battle()).count();
            println!("Bomzh v{}", env!("CARGO_PKG_VERSION"));
            println!("  listen:   {}:{}", config.server.bind, config.server.port);
            println!("  data:     {}", store.path().display());
            println!("  players:  {} ({} fighting)", store.len(), in_battle);
            println!(
                "  catalog:  {} moves, {} bosses",
                catalog.moves().len(),
                catalog.bosses().len()
            );
            println!(
                "  bot:      {}",
                if config.bot.should_register() {
                    "webhook (registered at startup)"
                } else if config.bot.webhook_enabled() {
                    "webhook"
                } else {
                    "disabled"
                }
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Tee to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
