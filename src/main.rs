//! WolfRouter - Primary/Replica Broadcast Router
//!
//! Serves the cars REST API over a primary and its read replicas.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfrouter::api::{CarService, HttpServer};
use wolfrouter::config::RouterConfig;
use wolfrouter::driver::MockDriver;
use wolfrouter::error::Result;
use wolfrouter::router::Router;

/// WolfRouter - Primary/Replica Broadcast Router
#[derive(Parser)]
#[command(name = "wolfrouter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfrouter.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open every node and serve the HTTP API
    Serve {
        /// Use the in-process mock driver instead of the configured one
        #[arg(long)]
        mock: bool,
    },

    /// Open every node and ping it
    Ping {
        /// Use the in-process mock driver instead of the configured one
        #[arg(long)]
        mock: bool,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfrouter.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The config file may not exist yet (init), so its level is best effort
    let level = cli.log_level.clone().unwrap_or_else(|| {
        RouterConfig::from_file(&cli.config)
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    });
    init_logging(&level);

    match cli.command {
        Commands::Serve { mock } => run_serve(cli.config, mock).await,
        Commands::Ping { mock } => run_ping(cli.config, mock).await,
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open the router described by the configuration
async fn open_router(config: &RouterConfig, mock: bool) -> Result<Router> {
    if mock {
        tracing::warn!("Using mock driver; no database will be contacted");
        return Router::open_with(Arc::new(MockDriver::new()), &config.database.data_source_names())
            .await;
    }
    Router::from_config(&config.database).await
}

/// Open every node, check it, and serve the HTTP API until Ctrl+C
async fn run_serve(config_path: PathBuf, mock: bool) -> Result<()> {
    tracing::info!("Starting WolfRouter...");

    let config = match RouterConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(e);
        }
    };

    let router = Arc::new(open_router(&config, mock).await?);

    if let Err(e) = router.ping().await {
        if e.is_connectivity() {
            tracing::error!("Some physical database is unreachable: {}", e);
        } else {
            tracing::error!("Startup ping failed: {}", e);
        }
        close_quietly(&router).await;
        return Err(e);
    }
    tracing::info!("All {} node(s) reachable", router.len());

    if config.api.ensure_schema {
        if let Err(e) = CarService::new(Arc::clone(&router)).ensure_schema().await {
            tracing::error!("Failed to create schema: {}", e);
            close_quietly(&router).await;
            return Err(e);
        }
    }

    let server = HttpServer::new(config.api.clone(), Arc::clone(&router));
    let served = server
        .start(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
        })
        .await;

    tracing::info!("Shutting down...");
    let closed = router.close().await;
    if let Err(e) = &closed {
        tracing::error!("Failed to close every node cleanly: {}", e);
    }

    served.and(closed)
}

/// Close the router on a startup failure path, keeping the original error
async fn close_quietly(router: &Router) {
    if let Err(e) = router.close().await {
        tracing::warn!("Failed to close every node after startup failure: {}", e);
    }
}

/// Open every node and report whether all of them answer
async fn run_ping(config_path: PathBuf, mock: bool) -> Result<()> {
    let config = RouterConfig::from_file(&config_path)?;
    let router = open_router(&config, mock).await?;

    let result = router.ping().await;
    match &result {
        Ok(()) => {
            println!("✓ All {} node(s) reachable", router.len());
            for (i, descriptor) in router.descriptors().iter().enumerate() {
                let role = if i == 0 { "primary" } else { "replica" };
                println!("  [{}] {:<8} {}", i, role, descriptor);
            }
        }
        Err(e) => eprintln!("✗ Ping failed: {}", e),
    }

    router.close().await?;
    result
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    std::fs::write(&output, RouterConfig::sample())?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit the file to configure your primary and replica databases.");
    println!("Then start with: wolfrouter --config {} serve", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match RouterConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Driver:   {}", config.database.driver);
            println!("  Primary:  {}", wolfrouter::driver::redact(&config.database.primary));
            for (i, replica) in config.database.replicas.iter().enumerate() {
                println!("  Replica {}: {}", i + 1, wolfrouter::driver::redact(replica));
            }
            println!("  Pool Size: {}", config.database.pool_size);
            if config.api.enabled {
                println!("  API:      {}", config.api.bind_address);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
