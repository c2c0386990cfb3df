//! static-guard
//!
//! Serves the `assets/` folder compiled into the binary.
//!
//! ```text
//!   Client ──▶ request id ─▶ trace ─▶ timeout ─▶ StaticHandler::serve
//!                                                  │
//!              rate limit ─▶ redirect/specific ─▶ path guard ─▶ lookup
//!                                                  │
//!              304 / MIME policy ─▶ body (memory or spooled temp file)
//!                                                  │
//!              security events ─▶ callbacks, webhook (sync, async, batched)
//! ```

use clap::{Parser, Subcommand};
use rust_embed::RustEmbed;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use static_guard::config::watcher::{apply_updates, ConfigWatcher};
use static_guard::config::{load_config, ConfigError, ServerConfig};
use static_guard::http::HttpServer;
use static_guard::lifecycle::{forward_signals, Shutdown};
use static_guard::observability::{logging, metrics};
use static_guard::StaticHandler;

#[derive(RustEmbed)]
#[folder = "assets/"]
#[prefix = "assets/"]
struct Assets;

#[derive(Parser)]
#[command(name = "static-guard")]
#[command(about = "Embedded static file server with request security checks", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the embedded files (default)
    Serve {
        /// Reload the config file when it changes (also `hot_reload = true`)
        #[arg(long)]
        watch: bool,
    },
    /// List the embedded files below a directory, with their sizes
    List {
        /// Directory inside the tree; every base path when omitted
        #[arg(default_value = "")]
        root: String,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve { watch: false });

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(ConfigError::Validation(errors)) => {
                for error in &errors {
                    eprintln!("{}: {}", path.display(), error);
                }
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    match command {
        Commands::CheckConfig => {
            println!("configuration ok");
            Ok(())
        }
        Commands::List { root } => {
            let handler = StaticHandler::from_embed::<Assets>(&[]);
            handler.apply_config(&config);
            for path in handler.list(&root)? {
                let size = handler.info(&path).map(|i| i.size).unwrap_or(0);
                println!("{:>10}  {}", size, path);
            }
            Ok(())
        }
        Commands::Serve { watch } => {
            let watch = watch || config.hot_reload;
            serve(config, cli.config, watch).await
        }
    }
}

async fn serve(
    config: ServerConfig,
    config_path: Option<PathBuf>,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "static-guard starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let handler = Arc::new(StaticHandler::from_embed::<Assets>(&[]));
    handler.apply_config(&config);
    if let Err(e) = handler.status_health() {
        tracing::warn!(error = %e, "Base path missing from embedded tree");
    }

    let shutdown = Shutdown::new();

    // The watcher must stay alive for as long as the server runs.
    let _watcher = match (watch, config_path) {
        (true, Some(path)) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            let watcher = watcher.run()?;
            tokio::spawn(apply_updates(Arc::clone(&handler), updates, shutdown.subscribe()));
            Some(watcher)
        }
        (true, None) => {
            tracing::warn!("--watch ignored without --config");
            None
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        route = %config.mount.route,
        files = handler.list("")?.len(),
        "Listening for connections"
    );

    let server = HttpServer::new(config, Arc::clone(&handler));
    let server_shutdown = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move { forward_signals(&signals).await });

    server.run(listener, server_shutdown).await?;

    handler.flush_security_events().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
