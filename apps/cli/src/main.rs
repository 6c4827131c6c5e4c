//! Roomcast command-line client entry point.
//!
//! Usage: `roomcast <room> [file ...]`

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = app::Args::parse(std::env::args().skip(1))?;

    let mut config = config::Config::load()?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server_url,
        username = %config.username,
        "starting roomcast"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, args))?;

    tracing::info!("roomcast shut down cleanly");
    Ok(())
}
