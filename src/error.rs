//! Error types for the NinjaOne client.

use std::fmt;

use thiserror::Error;

/// Why a single OAuth2 token exchange against one base URL failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeFailure {
    /// The token endpoint answered with a non-2xx status.
    Status { status: u16, body: String },
    /// Connection refused, DNS failure, timeout, TLS error, etc.
    Transport(String),
    /// 2xx response whose body lacked `access_token` / `expires_in`.
    InvalidPayload(String),
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeFailure::Status { status, body } if body.is_empty() => {
                write!(f, "HTTP {status}")
            }
            ExchangeFailure::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            ExchangeFailure::Transport(msg) => write!(f, "network error: {msg}"),
            ExchangeFailure::InvalidPayload(msg) => write!(f, "invalid token response: {msg}"),
        }
    }
}

/// One rejected candidate during endpoint auto-detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub base_url: String,
    pub reason: ExchangeFailure,
}

/// Errors returned by [`NinjaSession`](crate::auth::NinjaSession) and
/// [`NinjaClient`](crate::client::NinjaClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials missing, or an unknown region key was supplied.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No candidate base URL accepted the configured credentials.
    #[error(
        "Could not find a NinjaOne endpoint that accepts these credentials. Tried: {}",
        format_probes(.attempts)
    )]
    EndpointDiscovery { attempts: Vec<ProbeFailure> },

    /// Token exchange against an explicit endpoint failed.
    #[error("Authentication against {base_url} failed: {reason}")]
    Auth {
        base_url: String,
        reason: ExchangeFailure,
    },

    /// A data endpoint returned a non-2xx status.
    #[error("NinjaOne API error (HTTP {status} {status_text}): {body}")]
    ApiRequest {
        status: u16,
        status_text: String,
        body: String,
    },

    /// HTTP transport error on a data request.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A base URL or path could not be turned into a request URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Candidate URLs tried during a failed auto-detection, in order.
    #[cfg(test)]
    pub fn attempted_candidates(&self) -> Vec<&str> {
        match self {
            ClientError::EndpointDiscovery { attempts } => {
                attempts.iter().map(|a| a.base_url.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn format_probes(attempts: &[ProbeFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.base_url, a.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_error_lists_candidates_with_reasons() {
        let err = ClientError::EndpointDiscovery {
            attempts: vec![
                ProbeFailure {
                    base_url: "https://x.test".into(),
                    reason: ExchangeFailure::Status {
                        status: 401,
                        body: String::new(),
                    },
                },
                ProbeFailure {
                    base_url: "https://y.test".into(),
                    reason: ExchangeFailure::Transport("connection refused".into()),
                },
            ],
        };
        assert_eq!(err.attempted_candidates(), vec!["https://x.test", "https://y.test"]);
        let msg = err.to_string();
        assert!(msg.contains("https://x.test (HTTP 401)"));
        assert!(msg.contains("https://y.test (network error: connection refused)"));
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = ClientError::ApiRequest {
            status: 404,
            status_text: "Not Found".into(),
            body: "{\"error\":\"device not found\"}".into(),
        };
        assert_eq!(
            err.to_string(),
            "NinjaOne API error (HTTP 404 Not Found): {\"error\":\"device not found\"}"
        );
    }
}
