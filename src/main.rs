//! freeapi-control CLI - Track free AI API sites and their balances.

use anyhow::Context;
use clap::{Parser, Subcommand};
use freeapi_control::api::{create_router, AppState};
use freeapi_control::balance::BalanceResolver;
use freeapi_control::config::{Config, LogVerbosity};
use freeapi_control::poller::EntryOutcome;
use freeapi_control::service::SiteService;
use freeapi_control::store::open_store;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser)]
#[command(name = "freeapi-control")]
#[command(about = "Track free AI API sites and poll their balances")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard API server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Log verbosity level
        #[arg(short, long, value_enum)]
        log_level: Option<LogLevel>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check balances from the terminal
    Check {
        /// Only check the site with this id
        #[arg(long)]
        id: Option<String>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogLevel {
    Minimal,
    Compact,
    Verbose,
}

impl From<LogLevel> for LogVerbosity {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Minimal => LogVerbosity::Minimal,
            LogLevel::Compact => LogVerbosity::Compact,
            LogLevel::Verbose => LogVerbosity::Verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, log_level, config }) => {
            run_server(port, log_level, config).await?;
        }
        Some(Commands::Check { id, config }) => {
            run_check(id, config).await?;
        }
        Some(Commands::Config { path }) => {
            show_config(path)?;
        }
        None => {
            run_server(None, None, None).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config.with_env_overrides())
}

fn build_service(config: &Config) -> anyhow::Result<SiteService> {
    let store = open_store(&config.storage)
        .with_context(|| format!("opening site store at {}", config.storage.path.display()))?;
    let resolver = BalanceResolver::with_options(&config.polling.client_options())
        .context("building HTTP client")?;

    if config.polling.accept_invalid_certs {
        tracing::warn!("TLS certificate validation is disabled for balance polling");
    }

    Ok(SiteService::new(store, resolver))
}

async fn run_server(
    port_override: Option<u16>,
    log_level: Option<LogLevel>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(level) = log_level {
        config.logging.verbosity = level.into();
    }
    freeapi_control::logging::init(&config.logging);

    let port = port_override.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, port))?;

    let service = build_service(&config)?;
    if config.auth.admin_token.is_none() {
        tracing::info!("no admin token configured, API is open");
    }
    let state = AppState::new(service).with_admin_token(config.auth.admin_token.clone());
    let app = create_router(state);

    tracing::info!(
        address = %addr,
        storage = ?config.storage.backend,
        data = %config.storage.path.display(),
        "freeapi-control v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn run_check(id: Option<String>, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    freeapi_control::logging::init(&config.logging);
    let service = build_service(&config)?;

    match id {
        Some(id) => match service.check_one(&id).await {
            Ok(data) => {
                println!(
                    "✓ {}  ${:.2}  {} models",
                    id,
                    data.balance,
                    data.model_count()
                );
            }
            Err(e @ freeapi_control::error::AppError::Resolution(_)) => {
                println!("✗ {}  {}", id, e);
            }
            Err(e) => return Err(e.into()),
        },
        None => {
            let report = service.check_all().await?;
            for entry in &report.results {
                match &entry.outcome {
                    EntryOutcome::Success { balance, model_count } => {
                        println!("✓ {}  ${:.2}  {} models", entry.name, balance, model_count);
                    }
                    EntryOutcome::Failure { message } => {
                        println!("✗ {}  {}", entry.name, message);
                    }
                }
            }
            println!(
                "{} checked, {} ok, {} failed",
                report.summary.total, report.summary.succeeded, report.summary.failed
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

fn show_config(show_path: bool) -> anyhow::Result<()> {
    if show_path {
        println!("{}", Config::default_path().display());
        return Ok(());
    }

    let config = Config::load()?.with_env_overrides();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
