//! Configuration loading for ninjaone-mcp.
//!
//! Configuration is resolved from three fallback sources (tried in order):
//!
//! 1. **JSON file** via `--config <path>` CLI flag
//! 2. **JSON file** via `NINJA_CONFIG` environment variable
//! 3. **Environment variables**: `NINJA_CLIENT_ID`, `NINJA_CLIENT_SECRET`,
//!    `NINJA_REFRESH_TOKEN`, `NINJA_BASE_URL`, `NINJA_REGION`,
//!    `NINJA_BASE_URLS`, `NINJA_LOG_LEVEL`, `MCP_MODE`, `HTTP_HOST`, `HTTP_PORT`
//!
//! The file keys are the env names in snake case without the prefix
//! (`client_id`, `base_urls`, `http_port`, ...). `--mode`, `--host` and
//! `--port` override whichever source was used. The HTTP transports listen on
//! loopback unless a host is given.
//!
//! Missing credentials are not an error: the server starts and every tool call
//! reports the problem. Problems that do not stop startup are collected in
//! [`ResolvedConfig::warnings`] so they can be logged once tracing is up.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::auth::{Credentials, Grant, SessionConfig};
use crate::regions::{self, Region};

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_HTTP_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_LOG_LEVEL: &str = "info";

/// CLI arguments parsed by `clap`.
#[derive(Parser)]
#[command(
    name = "ninjaone-mcp",
    about = "MCP server for the NinjaOne RMM API",
    version
)]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Transport to serve MCP on
    #[arg(long, value_enum)]
    pub mode: Option<TransportMode>,

    /// Listen address for the http and sse transports
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Listen port for the http and sse transports
    #[arg(long)]
    pub port: Option<u16>,
}

/// How MCP messages reach the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Line-delimited JSON-RPC on stdin/stdout
    #[default]
    Stdio,
    /// `POST /mcp`
    Http,
    /// `GET /sse` + `POST /messages`
    Sse,
}

/// `base_urls` may be a JSON array or a comma-separated string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CandidateList {
    List(Vec<String>),
    Csv(String),
}

impl CandidateList {
    fn into_candidates(self) -> Option<Vec<String>> {
        match self {
            CandidateList::List(urls) => regions::parse_candidate_list(&urls.join(",")),
            CandidateList::Csv(raw) => regions::parse_candidate_list(&raw),
        }
    }
}

/// Raw configuration, as read from a JSON file or the environment.
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub region: Option<String>,
    pub base_urls: Option<CandidateList>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub log_level: Option<String>,
    pub mode: Option<TransportMode>,
    pub http_host: Option<IpAddr>,
    pub http_port: Option<u16>,
}

/// Validated configuration ready for use by `main`.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub session: SessionConfig,
    pub mode: TransportMode,
    pub http_host: IpAddr,
    pub http_port: u16,
    pub log_level: String,
    pub warnings: Vec<String>,
}

/// Load and validate configuration from CLI args, a config file, or env vars.
pub fn load_config(cli: &Cli) -> Result<ResolvedConfig, String> {
    let raw = if let Some(path) = &cli.config {
        load_from_file(&expand_tilde(path))?
    } else if let Ok(path) = std::env::var("NINJA_CONFIG") {
        load_from_file(&expand_tilde(Path::new(&path)))?
    } else {
        load_from_env(|key| std::env::var(key).ok())?
    };
    Ok(resolve(raw, cli))
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn load_from_file(path: &Path) -> Result<FileConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))
}

/// Read configuration through `get`, normally `std::env::var`.
fn load_from_env(get: impl Fn(&str) -> Option<String>) -> Result<FileConfig, String> {
    let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    let mode = var("MCP_MODE")
        .map(|v| {
            TransportMode::from_str(v.trim(), true)
                .map_err(|_| format!("Invalid MCP_MODE '{v}' (expected stdio, http, or sse)"))
        })
        .transpose()?;
    let http_host = var("HTTP_HOST")
        .map(|v| {
            v.trim()
                .parse::<IpAddr>()
                .map_err(|_| format!("Invalid HTTP_HOST '{v}' (expected an IP address)"))
        })
        .transpose()?;
    let http_port = var("HTTP_PORT")
        .map(|v| {
            v.trim()
                .parse::<u16>()
                .map_err(|_| format!("Invalid HTTP_PORT '{v}'"))
        })
        .transpose()?;

    Ok(FileConfig {
        base_url: var("NINJA_BASE_URL"),
        region: var("NINJA_REGION"),
        base_urls: var("NINJA_BASE_URLS").map(CandidateList::Csv),
        client_id: var("NINJA_CLIENT_ID"),
        client_secret: var("NINJA_CLIENT_SECRET"),
        refresh_token: var("NINJA_REFRESH_TOKEN"),
        log_level: var("NINJA_LOG_LEVEL"),
        mode,
        http_host,
        http_port,
    })
}

fn resolve(raw: FileConfig, cli: &Cli) -> ResolvedConfig {
    let mut warnings = Vec::new();
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let region = match non_empty(raw.region) {
        Some(key) => match key.parse::<Region>() {
            Ok(region) => Some(region),
            Err(e) => {
                warnings.push(format!("{e}. Falling back to endpoint auto-detection."));
                None
            }
        },
        None => None,
    };

    let credentials = match (non_empty(raw.client_id), non_empty(raw.client_secret)) {
        (Some(client_id), Some(client_secret)) => Some(Credentials {
            client_id,
            client_secret,
            grant: match non_empty(raw.refresh_token) {
                Some(token) => Grant::RefreshToken(token),
                None => Grant::ClientCredentials,
            },
        }),
        (Some(_), None) => {
            warnings.push("NINJA_CLIENT_ID is set but NINJA_CLIENT_SECRET is missing".into());
            None
        }
        (None, Some(_)) => {
            warnings.push("NINJA_CLIENT_SECRET is set but NINJA_CLIENT_ID is missing".into());
            None
        }
        (None, None) => {
            warnings.push(
                "NinjaOne credentials are not configured; tool calls will fail until \
                 NINJA_CLIENT_ID and NINJA_CLIENT_SECRET are set"
                    .into(),
            );
            None
        }
    };

    ResolvedConfig {
        session: SessionConfig {
            base_url: non_empty(raw.base_url),
            region,
            candidates: raw.base_urls.and_then(CandidateList::into_candidates),
            credentials,
        },
        mode: cli.mode.or(raw.mode).unwrap_or_default(),
        http_host: cli.host.or(raw.http_host).unwrap_or(DEFAULT_HTTP_HOST),
        http_port: cli.port.or(raw.http_port).unwrap_or(DEFAULT_HTTP_PORT),
        log_level: non_empty(raw.log_level).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        warnings,
    }
}
