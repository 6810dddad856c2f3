//! Runnable impostor party server.
//!
//! ```text
//! cargo run -p party-server
//! IMPOSTOR_CONFIG=server.json IMPOSTOR_PACKS=packs.json RUST_LOG=debug cargo run -p party-server
//! ```
//!
//! Without `IMPOSTOR_PACKS` the server plays with the built-in packs
//! from `packs.json` next to this crate's manifest.

use impostor::prelude::*;
use tracing_subscriber::EnvFilter;

const BUILTIN_PACKS: &str = include_str!("../packs.json");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,impostor=debug")),
        )
        .init();

    let config = match std::env::var("IMPOSTOR_CONFIG") {
        Ok(path) => ServerConfig::from_json(&std::fs::read_to_string(&path)?)?,
        Err(_) => ServerConfig {
            bind_addr: "0.0.0.0:8080".to_string(),
            ..ServerConfig::default()
        },
    };
    let packs = match std::env::var("IMPOSTOR_PACKS") {
        Ok(path) => InMemoryWordPacks::from_json(&std::fs::read_to_string(&path)?)?,
        Err(_) => InMemoryWordPacks::from_json(BUILTIN_PACKS)?,
    };
    tracing::info!(packs = packs.len(), bind = %config.bind_addr, "starting party server");

    let server = ImpostorServerBuilder::new().config(config).build(packs).await?;
    server.run().await?;
    Ok(())
}
