//! Elevate for Humanity license service.
//!
//! Issues and checks HMAC-signed license keys. The service keeps no database:
//! keys are self-describing and validated from their own contents.
//!
//! Usage:
//!   elevate-license-server serve --port 3001
//!   elevate-license-server generate --email a@b.com --product prod_X --days 365
//!   elevate-license-server inspect <KEY>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elevate_license::{DEFAULT_DURATION_DAYS, LicenseManager, codec::format_timestamp};
use elevate_license_server::{AppState, ServerConfig, ValidationResponse, build_router};
use serde_json::json;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "elevate-license-server")]
#[command(about = "Elevate for Humanity license key service")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001", env = "PORT")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
    /// Issue a license key and print it as JSON
    Generate {
        #[arg(long)]
        email: String,

        #[arg(long)]
        product: String,

        /// Validity in days; negative values produce an expired key
        #[arg(long, default_value_t = DEFAULT_DURATION_DAYS, allow_negative_numbers = true)]
        days: i64,
    },
    /// Validate a license key and print the result as JSON
    Inspect {
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    match args.command {
        Command::Serve { port, host } => serve(config, &host, port).await,
        Command::Generate {
            email,
            product,
            days,
        } => {
            let manager = LicenseManager::new(config.keyring);
            let issued = manager
                .generate(&email, &product, days)
                .context("Failed to generate license")?;
            let out = json!({
                "licenseKey": issued.key,
                "email": issued.payload.email,
                "productId": issued.payload.product_id,
                "issuedAt": format_timestamp(&issued.payload.issued_at),
                "expiresAt": format_timestamp(&issued.payload.expires_at),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Command::Inspect { key } => {
            let manager = LicenseManager::new(config.keyring);
            let response = ValidationResponse::from(manager.validate(&key));
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder().with_target(false).compact();
    if std::env::var_os("RUST_LOG").is_some() {
        builder.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        builder.with_max_level(level).init();
    }
}

async fn serve(config: ServerConfig, host: &str, port: u16) -> Result<()> {
    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY not set, admin routes are disabled");
    }
    info!(
        production = config.production,
        secrets = config.keyring.secret_count(),
        "License service starting..."
    );

    let app = build_router(AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("HTTP server failed")
}
