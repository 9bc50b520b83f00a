use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use citycontext_core::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "citycontext-server",
    about = "HTTP API for the 3D city model database"
)]
struct Args {
    /// Host to bind, overriding HOST from the environment
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding PORT from the environment
    #[arg(long)]
    port: Option<u16>,
}

/// Merge CLI overrides with the env-derived bind address.
fn resolve_bind(
    default: SocketAddr,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if host.is_none() && port.is_none() {
        return Ok(default);
    }

    let host = host.unwrap_or_else(|| default.ip().to_string());
    let port = port.unwrap_or_else(|| default.port());
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address: {host}:{port}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    settings.bind_addr = resolve_bind(settings.bind_addr, args.host, args.port)?;

    citycontext_server::serve(settings).await
}
