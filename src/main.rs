//! crop-support: farmer support API server
//!
//! Serves disease detection, mandi prices, government schemes, weather and
//! admin analytics over HTTP, and keeps price and scheme data fresh with
//! periodic background tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crop_support::config::{Config, DEV_JWT_SECRET};
use crop_support::routes::create_router;
use crop_support::AppContext;

#[derive(Parser)]
#[command(name = "crop-support")]
#[command(about = "Farmer support API: disease detection, mandi prices and government schemes")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "crop-support.toml")]
    config: String,

    /// HTTP port (overrides config file)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Deployment environment (overrides config file)
    #[arg(long, env = "CROP_SUPPORT_ENV")]
    environment: Option<String>,

    /// Session token signing secret (overrides config file)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Do not start the periodic update tasks
    #[arg(long)]
    no_scheduler: bool,

    /// Emit logs as JSON
    #[arg(long, env = "CROP_SUPPORT_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::from_default_env().add_directive("crop_support=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting crop-support");
    info!("Config file: {}", cli.config);

    // Load or create default config
    let mut config = if std::path::Path::new(&cli.config).exists() {
        let content = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&content)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    // Apply CLI overrides
    if let Some(port) = cli.port {
        config.server.http_port = port;
    }
    if let Some(environment) = cli.environment {
        config.server.environment = environment;
    }
    if let Some(secret) = cli.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if cli.no_scheduler {
        config.scheduler.enabled = false;
    }

    if !config.is_development() && config.auth.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the development JWT secret outside development; set JWT_SECRET");
    }

    info!("Environment: {}", config.server.environment);

    let port = config.server.http_port;
    let ctx = Arc::new(AppContext::new(config).await?);
    ctx.register_tasks().await;

    let app = create_router(ctx.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("API listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
    }

    ctx.tasks.stop_all().await;
    info!("crop-support stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
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
}
