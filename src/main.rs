//! # ninjaone-mcp
//!
//! MCP (Model Context Protocol) server exposing the NinjaOne RMM public API
//! as tools. Runs as a stdio JSON-RPC server by default, for launching from
//! an AI agent host, or over HTTP/SSE with `--mode`.
//!
//! ## Architecture
//!
//! ```text
//! main.rs    - entry point, config loading, tracing setup, transport launch
//! config.rs  - JSON file / env-var configuration loading
//! regions.rs - region directory and base URL normalization
//! auth.rs    - OAuth2 token lifecycle and endpoint auto-detection
//! client.rs  - authenticated request executor and NinjaOne API methods
//! error.rs   - client error types
//! mcp.rs     - MCP JSON-RPC protocol handler (stdio loop)
//! http.rs    - HTTP and SSE transports
//! tools.rs   - tool definitions and handlers
//! ```
//!
//! ## Endpoint selection
//!
//! NinjaOne tenants live in one of several regional instances. An explicit
//! `NINJA_BASE_URL` or `NINJA_REGION` is used as-is; otherwise the first
//! token request tries each candidate in turn and locks in the first one that
//! accepts the credentials. The `set_region` and `set_base_url` tools switch
//! endpoints at runtime.

mod auth;
mod client;
mod config;
mod error;
mod http;
mod mcp;
mod regions;
mod tools;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use auth::NinjaSession;
use client::NinjaClient;
use config::{Cli, TransportMode};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let resolved = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ninjaone-mcp: configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // stdout carries JSON-RPC in stdio mode, so logs always go to stderr.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| resolved.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    info!("ninjaone-mcp v{} starting", env!("CARGO_PKG_VERSION"));
    for warning in &resolved.warnings {
        warn!("{warning}");
    }

    let session = NinjaSession::new(resolved.session);
    let endpoint = session.endpoint().await;
    match endpoint.base_url.as_deref() {
        Some(url) if endpoint.explicit => info!("Using NinjaOne endpoint {url}"),
        _ => info!(
            candidates = session.candidates().len(),
            "NinjaOne endpoint will be auto-detected on first request"
        ),
    }

    let client = Arc::new(NinjaClient::new(session));

    match resolved.mode {
        TransportMode::Stdio => {
            info!("Serving MCP on stdio");
            mcp::run_stdio(&client).await;
        }
        TransportMode::Http | TransportMode::Sse => {
            let state = http::AppState::new(client);
            let app = if resolved.mode == TransportMode::Http {
                http::http_router(state)
            } else {
                http::sse_router(state)
            };
            info!(mode = ?resolved.mode, "Serving MCP over HTTP");
            let addr = SocketAddr::new(resolved.http_host, resolved.http_port);
            if let Err(e) = http::serve(app, addr).await {
                error!("HTTP server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
