#![forbid(unsafe_code)]
//! HTTP server exposing `/register` and `/login` over the credential ledger,
//! plus the image archive endpoints

use clap::Parser;
use credchain::api::{run_api_server, AppState};
use credchain::blockchain::verify_chain;
use credchain::cli::{
    init_tracing, load_config_with_overrides, open_image_store, open_service, open_store,
};
use credchain::persistence::Persistence;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ledger file (overrides ledger.path)
    #[arg(short, long)]
    ledger: Option<PathBuf>,

    /// Listen host (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of static front-end files
    #[arg(long)]
    static_dir: Option<String>,

    /// Verbose HTTP logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config_with_overrides(args.config.as_deref(), args.ledger)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.static_dir.is_some() {
        config.server.static_dir = args.static_dir;
    }
    config.server.debug |= args.debug;

    init_tracing(&config);

    // Fail fast on an unreadable ledger instead of on the first request.
    let store = open_store(&config);
    let chain = store.load_chain()?;
    if !verify_chain(&chain) {
        tracing::warn!(path = %config.ledger.path, "ledger linkage is broken");
    }
    tracing::info!(path = %config.ledger.path, blocks = chain.len(), "ledger opened");

    let state = Arc::new(
        AppState::with_debug(open_service(&config), config.server.debug)
            .with_images(open_image_store(&config)),
    );
    run_api_server(state, &config).await
}
