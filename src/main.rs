// proc-status-page - version 0.1.0
// Live HTML status page with cached process listing and tracing logging
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, Level};

use proc_status_page::cli::{Args, Commands, LogLevel};
use proc_status_page::commands::{command_collect, command_config, show_config};
use proc_status_page::config::{resolve_config, validate_effective_config, Config};
use proc_status_page::handlers;
use proc_status_page::state::build_state;

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Loads and validates the effective config, exiting with code 1 when invalid
fn effective_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("Configuration invalid: {:#}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves when SIGINT or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.show_config || args.check_config {
        let config = effective_config(&args)?;
        if args.check_config {
            println!("Configuration is valid");
            return Ok(());
        }
        return show_config(&config, &args.config_format);
    }

    setup_logging(&args);

    if let Some(command) = &args.command {
        return match command {
            Commands::Config { output, format } => command_config(output.as_deref(), format),
            Commands::Collect { listing_only } => {
                command_collect(effective_config(&args)?, *listing_only).await
            }
        };
    }

    let config = effective_config(&args)?;
    info!("Starting proc-status-page");

    let addr = config.socket_addr()?;
    info!(
        "Status data cached for {}s, listing timeout {}s",
        config.stale_after().as_secs(),
        config.listing_timeout().as_secs()
    );

    let state = build_state(config)?;
    let app = handlers::router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("proc-status-page listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("proc-status-page stopped gracefully");
    Ok(())
}
