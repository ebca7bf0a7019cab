//! OAuth2 session for the NinjaOne API.
//!
//! [`NinjaSession`] owns the two pieces of mutable client state: the resolved
//! API endpoint and the cached access token. Everything that talks to
//! NinjaOne goes through [`NinjaSession::authorize`], which hands back a
//! bearer token together with the base URL it was issued for.
//!
//! ## Endpoint resolution
//!
//! 1. An explicit base URL (`NINJA_BASE_URL`) wins.
//! 2. Otherwise a region key (`NINJA_REGION`) is mapped through
//!    [`Region::base_url`].
//! 3. Otherwise the endpoint is left unresolved and the first token fetch
//!    auto-detects it: each candidate is tried in order, and the first one
//!    that accepts the credentials is locked in for the rest of the session.
//!
//! ## Token lifetime
//!
//! Tokens are reused until they are within [`EXPIRY_MARGIN`] of expiring.
//! Concurrent callers that find no usable token queue on a refresh lock, so
//! only one exchange is in flight at a time; the rest pick up its result.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ExchangeFailure, ProbeFailure};
use crate::regions::{self, Region, RegionInfo};

/// Path of the OAuth2 token endpoint, relative to the base URL.
pub const TOKEN_PATH: &str = "/ws/oauth/token";

/// Scope requested by the client-credentials grant.
pub const TOKEN_SCOPE: &str = "monitoring management control";

/// A cached token is treated as stale this long before it actually expires.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest token-endpoint error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// Full token endpoint URL for a base URL.
pub fn token_url(base_url: &str) -> String {
    format!("{base_url}{TOKEN_PATH}")
}

/// OAuth2 grant used for the token exchange.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    ClientCredentials,
    /// Legacy deployments authenticate with a long-lived refresh token.
    RefreshToken(String),
}

/// API client credentials, fixed for the lifetime of a session.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub grant: Grant,
}

impl Credentials {
    /// Form fields for the token request.
    fn form(&self) -> Vec<(&'static str, &str)> {
        match &self.grant {
            Grant::ClientCredentials => vec![
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("scope", TOKEN_SCOPE),
            ],
            Grant::RefreshToken(refresh_token) => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ],
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grant = match self.grant {
            Grant::ClientCredentials => "client_credentials",
            Grant::RefreshToken(_) => "refresh_token",
        };
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("grant", &grant)
            .finish()
    }
}

/// Everything a [`NinjaSession`] needs at construction.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Explicit base URL; takes precedence over `region`.
    pub base_url: Option<String>,
    pub region: Option<Region>,
    /// Auto-detection candidates. `None` means the built-in region list.
    pub candidates: Option<Vec<String>>,
    /// `None` leaves the session unconfigured: every call fails fast.
    pub credentials: Option<Credentials>,
}

/// The base URL in use and whether it has been confirmed.
///
/// `explicit` is set by configuration, by an override, or by a successful
/// auto-detection. An explicit endpoint is never re-probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub base_url: Option<String>,
    pub explicit: bool,
}

impl ResolvedEndpoint {
    fn from_config(base_url: Option<&str>, region: Option<Region>) -> Self {
        match (base_url, region) {
            (Some(url), _) => Self::explicit(regions::normalize_base_url(url)),
            (None, Some(region)) => Self::explicit(region.base_url().to_string()),
            (None, None) => Self {
                base_url: None,
                explicit: false,
            },
        }
    }

    fn explicit(base_url: String) -> Self {
        Self {
            base_url: Some(base_url),
            explicit: true,
        }
    }
}

/// A bearer token together with the endpoint that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub token: String,
    pub base_url: String,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct SessionState {
    endpoint: ResolvedEndpoint,
    token: Option<AccessToken>,
}

/// Authenticated session against one NinjaOne tenant.
pub struct NinjaSession {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    candidates: Vec<String>,
    state: RwLock<SessionState>,
    /// Held for the duration of a token exchange or endpoint override.
    refresh_lock: Mutex<()>,
}

impl NinjaSession {
    /// Create a session. No network traffic happens until the first
    /// [`authorize`](Self::authorize) call.
    pub fn new(config: SessionConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ninjaone-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        let candidates = config
            .candidates
            .map(|c| {
                c.iter()
                    .map(|u| regions::normalize_base_url(u))
                    .collect::<Vec<_>>()
            })
            .filter(|c| !c.is_empty())
            .unwrap_or_else(regions::default_candidates);

        let endpoint = ResolvedEndpoint::from_config(config.base_url.as_deref(), config.region);

        Self {
            http,
            credentials: config.credentials,
            candidates,
            state: RwLock::new(SessionState {
                endpoint,
                token: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Shared HTTP client (30s request timeout).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Whether client credentials were supplied.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Auto-detection candidates, in try order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Snapshot of the current endpoint.
    pub async fn endpoint(&self) -> ResolvedEndpoint {
        self.state.read().await.endpoint.clone()
    }

    /// The built-in region directory.
    pub fn list_regions(&self) -> Vec<RegionInfo> {
        regions::list_regions()
    }

    /// Switch to a known region. Drops the cached token.
    pub async fn set_region(&self, key: &str) -> Result<RegionInfo, ClientError> {
        let region: Region = key.parse()?;
        self.set_endpoint(region.base_url().to_string()).await;
        Ok(RegionInfo {
            region: region.key(),
            base_url: region.base_url(),
        })
    }

    /// Switch to an arbitrary base URL. Drops the cached token.
    ///
    /// Returns the normalized URL.
    pub async fn set_base_url(&self, url: &str) -> String {
        let base_url = regions::normalize_base_url(url);
        self.set_endpoint(base_url.clone()).await;
        base_url
    }

    async fn set_endpoint(&self, base_url: String) {
        // Wait out any in-flight exchange so its token can't land after the switch.
        let _refresh = self.refresh_lock.lock().await;
        let mut state = self.state.write().await;
        info!(base_url = %base_url, "NinjaOne endpoint overridden");
        state.endpoint = ResolvedEndpoint::explicit(base_url);
        state.token = None;
    }

    /// Drop the cached token if it is still `stale`.
    ///
    /// Used after the API rejects a token with 401; the endpoint stays locked.
    pub async fn invalidate_token(&self, stale: &str) {
        let mut state = self.state.write().await;
        if state.token.as_ref().is_some_and(|t| t.value == stale) {
            debug!("Dropping rejected access token");
            state.token = None;
        }
    }

    /// A valid access token, fetching a new one if needed.
    #[cfg(test)]
    pub async fn access_token(&self) -> Result<String, ClientError> {
        self.authorize().await.map(|a| a.token)
    }

    /// A valid access token and the base URL it belongs to.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Configuration`] when credentials are missing
    /// - [`ClientError::EndpointDiscovery`] when auto-detection exhausts all candidates
    /// - [`ClientError::Auth`] when the exchange against a known endpoint fails
    pub async fn authorize(&self) -> Result<Authorization, ClientError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ClientError::Configuration(
                "NinjaOne credentials are not configured. \
                 Set NINJA_CLIENT_ID and NINJA_CLIENT_SECRET."
                    .into(),
            )
        })?;

        if let Some(auth) = self.cached_authorization().await {
            return Ok(auth);
        }

        let _refresh = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(auth) = self.cached_authorization().await {
            return Ok(auth);
        }

        let endpoint = self.endpoint().await;
        let (base_url, token) = match endpoint.base_url {
            Some(url) if endpoint.explicit => {
                let token = self.exchange(&url, credentials).await.map_err(|reason| {
                    warn!(base_url = %url, %reason, "Token exchange failed");
                    ClientError::Auth {
                        base_url: url.clone(),
                        reason,
                    }
                })?;
                (url, token)
            }
            _ => self.discover(credentials).await?,
        };

        let authorization = Authorization {
            token: token.value.clone(),
            base_url: base_url.clone(),
        };
        let mut state = self.state.write().await;
        state.endpoint = ResolvedEndpoint::explicit(base_url);
        state.token = Some(token);
        Ok(authorization)
    }

    async fn cached_authorization(&self) -> Option<Authorization> {
        let state = self.state.read().await;
        let token = state.token.as_ref().filter(|t| t.is_fresh(Instant::now()))?;
        let base_url = state.endpoint.base_url.clone()?;
        Some(Authorization {
            token: token.value.clone(),
            base_url,
        })
    }

    /// Try each candidate in order; the first accepted exchange wins and no
    /// further candidates are contacted. Every rejection is recorded so the
    /// final error can list them all.
    async fn discover(
        &self,
        credentials: &Credentials,
    ) -> Result<(String, AccessToken), ClientError> {
        let mut attempts = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            debug!(candidate = %candidate, "Probing NinjaOne endpoint");
            match self.exchange(candidate, credentials).await {
                Ok(token) => {
                    info!(
                        base_url = %candidate,
                        rejected = attempts.len(),
                        "NinjaOne endpoint auto-detected"
                    );
                    return Ok((candidate.clone(), token));
                }
                Err(reason) => {
                    debug!(candidate = %candidate, %reason, "Candidate rejected credentials");
                    attempts.push(ProbeFailure {
                        base_url: candidate.clone(),
                        reason,
                    });
                }
            }
        }
        warn!(
            tried = attempts.len(),
            "No NinjaOne endpoint accepted the configured credentials"
        );
        Err(ClientError::EndpointDiscovery { attempts })
    }

    /// `POST {base_url}/ws/oauth/token` with the configured grant.
    async fn exchange(
        &self,
        base_url: &str,
        credentials: &Credentials,
    ) -> Result<AccessToken, ExchangeFailure> {
        let resp = self
            .http
            .post(token_url(base_url))
            .timeout(TOKEN_TIMEOUT)
            .form(&credentials.form())
            .send()
            .await
            .map_err(|e| ExchangeFailure::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(ExchangeFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ExchangeFailure::InvalidPayload(e.to_string()))?;

        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(payload.expires_in))
            .ok_or_else(|| {
                ExchangeFailure::InvalidPayload(format!(
                    "expires_in {} is out of range",
                    payload.expires_in
                ))
            })?;

        Ok(AccessToken {
            value: payload.access_token,
            expires_at,
        })
    }
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            grant: Grant::ClientCredentials,
        }
    }

    fn explicit_session(base_url: &str) -> NinjaSession {
        NinjaSession::new(SessionConfig {
            base_url: Some(base_url.to_string()),
            credentials: Some(credentials()),
            ..Default::default()
        })
    }

    fn detecting_session(candidates: Vec<String>) -> NinjaSession {
        NinjaSession::new(SessionConfig {
            candidates: Some(candidates),
            credentials: Some(credentials()),
            ..Default::default()
        })
    }

    fn token_response(token: &str, expires_in: u64) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": expires_in,
        }))
    }

    async fn mount_token(server: &MockServer, response: ResponseTemplate, expected: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(response)
            .expect(expected)
            .mount(server)
            .await;
    }

    #[test]
    fn token_freshness_respects_safety_margin() {
        let now = Instant::now();
        let fresh = AccessToken {
            value: "t".into(),
            expires_at: now + EXPIRY_MARGIN + Duration::from_secs(1),
        };
        let borderline = AccessToken {
            value: "t".into(),
            expires_at: now + EXPIRY_MARGIN,
        };
        assert!(fresh.is_fresh(now));
        assert!(!borderline.is_fresh(now));
        assert!(!fresh.is_fresh(now + Duration::from_secs(1)));
    }

    #[test]
    fn token_url_for_eu_region() {
        assert_eq!(
            token_url(Region::Eu.base_url()),
            "https://eu.ninjarmm.com/ws/oauth/token"
        );
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let printed = format!("{:?}", credentials());
        assert!(printed.contains("client-id"));
        assert!(!printed.contains("client-secret"));
    }

    #[tokio::test]
    async fn explicit_base_url_wins_over_region() {
        let session = NinjaSession::new(SessionConfig {
            base_url: Some("custom.example.com/".into()),
            region: Some(Region::Eu),
            ..Default::default()
        });
        assert_eq!(
            session.endpoint().await,
            ResolvedEndpoint {
                base_url: Some("https://custom.example.com".into()),
                explicit: true
            }
        );
    }

    #[tokio::test]
    async fn region_resolves_to_explicit_endpoint() {
        let session = NinjaSession::new(SessionConfig {
            region: Some(Region::Eu),
            ..Default::default()
        });
        assert_eq!(
            session.endpoint().await,
            ResolvedEndpoint {
                base_url: Some("https://eu.ninjarmm.com".into()),
                explicit: true
            }
        );
    }

    #[tokio::test]
    async fn unresolved_endpoint_uses_default_candidates() {
        let session = NinjaSession::new(SessionConfig::default());
        assert_eq!(
            session.endpoint().await,
            ResolvedEndpoint {
                base_url: None,
                explicit: false
            }
        );
        assert_eq!(session.candidates(), regions::default_candidates().as_slice());
    }

    #[tokio::test]
    async fn empty_candidate_override_falls_back_to_defaults() {
        let session = detecting_session(vec![]);
        assert_eq!(session.candidates().len(), 5);
    }

    #[tokio::test]
    async fn cached_token_is_reused() {
        let server = MockServer::start().await;
        mount_token(&server, token_response("tok1", 3600), 1).await;

        let session = explicit_session(&server.uri());
        assert_eq!(session.access_token().await.unwrap(), "tok1");
        assert_eq!(session.access_token().await.unwrap(), "tok1");
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let server = MockServer::start().await;
        // Expires exactly at the margin, so it is stale as soon as it arrives.
        mount_token(&server, token_response("short", 300), 2).await;

        let session = explicit_session(&server.uri());
        session.access_token().await.unwrap();
        session.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            token_response("shared", 3600).set_delay(Duration::from_millis(100)),
            1,
        )
        .await;

        let session = explicit_session(&server.uri());
        let (a, b, c) = tokio::join!(
            session.access_token(),
            session.access_token(),
            session.access_token()
        );
        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(c.unwrap(), "shared");
    }

    #[tokio::test]
    async fn client_credentials_form_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("client_secret=client-secret"))
            .and(body_string_contains("scope=monitoring+management+control"))
            .respond_with(token_response("tok", 3600))
            .expect(1)
            .mount(&server)
            .await;

        explicit_session(&server.uri()).access_token().await.unwrap();
    }

    #[tokio::test]
    async fn refresh_token_grant_form_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=legacy-refresh"))
            .and(body_string_contains("client_id=client-id"))
            .respond_with(token_response("tok", 3600))
            .expect(1)
            .mount(&server)
            .await;

        let session = NinjaSession::new(SessionConfig {
            base_url: Some(server.uri()),
            credentials: Some(Credentials {
                grant: Grant::RefreshToken("legacy-refresh".into()),
                ..credentials()
            }),
            ..Default::default()
        });
        session.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn detection_stops_at_first_accepting_candidate() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        let c = MockServer::start().await;
        mount_token(&a, ResponseTemplate::new(401), 1).await;
        // Short-lived so the second call must exchange again.
        mount_token(&b, token_response("from-b", 300), 2).await;
        mount_token(&c, token_response("from-c", 3600), 0).await;

        let session = detecting_session(vec![a.uri(), b.uri(), c.uri()]);
        assert_eq!(session.access_token().await.unwrap(), "from-b");
        assert_eq!(
            session.endpoint().await,
            ResolvedEndpoint {
                base_url: Some(b.uri()),
                explicit: true
            }
        );

        // Locked in: the refresh goes straight to B without re-probing A.
        assert_eq!(session.access_token().await.unwrap(), "from-b");
    }

    #[tokio::test]
    async fn exhausted_detection_lists_every_candidate_in_order() {
        let a = MockServer::start().await;
        let b = MockServer::start().await;
        mount_token(&a, ResponseTemplate::new(401), 1).await;
        mount_token(&b, ResponseTemplate::new(500).set_body_string("boom"), 1).await;
        let unreachable = "http://127.0.0.1:1".to_string();

        let session = detecting_session(vec![a.uri(), unreachable.clone(), b.uri()]);
        let err = session.access_token().await.unwrap_err();

        let ClientError::EndpointDiscovery { attempts } = &err else {
            panic!("expected discovery error, got {err:?}");
        };
        assert_eq!(err.attempted_candidates(), vec![a.uri(), unreachable, b.uri()]);
        assert_eq!(
            attempts[0].reason,
            ExchangeFailure::Status {
                status: 401,
                body: String::new()
            }
        );
        assert!(matches!(attempts[1].reason, ExchangeFailure::Transport(_)));
        assert_eq!(
            attempts[2].reason,
            ExchangeFailure::Status {
                status: 500,
                body: "boom".into()
            }
        );

        // Still unresolved, so the next call probes again.
        assert!(!session.endpoint().await.explicit);
    }

    #[tokio::test]
    async fn explicit_endpoint_failure_is_auth_error() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            ResponseTemplate::new(401).set_body_string("invalid_client"),
            1,
        )
        .await;

        let err = explicit_session(&server.uri()).access_token().await.unwrap_err();
        match err {
            ClientError::Auth { base_url, reason } => {
                assert_eq!(base_url, server.uri());
                assert_eq!(
                    reason,
                    ExchangeFailure::Status {
                        status: 401,
                        body: "invalid_client".into()
                    }
                );
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_token_payload_is_rejected() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({ "token": "x" })),
            1,
        )
        .await;

        let err = explicit_session(&server.uri()).access_token().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Auth {
                reason: ExchangeFailure::InvalidPayload(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn oversized_token_lifetime_is_rejected() {
        let server = MockServer::start().await;
        mount_token(&server, token_response("t", u64::MAX), 1).await;

        let err = explicit_session(&server.uri()).access_token().await.unwrap_err();
        match err {
            ClientError::Auth {
                reason: ExchangeFailure::InvalidPayload(msg),
                ..
            } => assert!(msg.contains("expires_in")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn base_url_override_invalidates_cached_token() {
        let old = MockServer::start().await;
        let new = MockServer::start().await;
        mount_token(&old, token_response("old-token", 3600), 1).await;
        mount_token(&new, token_response("new-token", 3600), 1).await;

        let session = explicit_session(&old.uri());
        assert_eq!(session.access_token().await.unwrap(), "old-token");

        session.set_base_url(&new.uri()).await;
        let auth = session.authorize().await.unwrap();
        assert_eq!(auth.token, "new-token");
        assert_eq!(auth.base_url, new.uri());
    }

    #[tokio::test]
    async fn set_region_switches_endpoint() {
        let session = NinjaSession::new(SessionConfig::default());
        let info = session.set_region("oc").await.unwrap();
        assert_eq!(info.base_url, "https://oc.ninjarmm.com");
        assert_eq!(
            session.endpoint().await,
            ResolvedEndpoint {
                base_url: Some("https://oc.ninjarmm.com".into()),
                explicit: true
            }
        );
    }

    #[tokio::test]
    async fn unknown_region_is_rejected_without_side_effects() {
        let session = NinjaSession::new(SessionConfig {
            region: Some(Region::Ca),
            ..Default::default()
        });
        let err = session.set_region("xx").await.unwrap_err();
        assert!(matches!(err, ClientError::Configuration(ref m) if m.contains("'xx'")));
        assert_eq!(
            session.endpoint().await.base_url.as_deref(),
            Some("https://ca.ninjarmm.com")
        );
    }

    #[tokio::test]
    async fn unconfigured_session_fails_without_network() {
        let server = MockServer::start().await;
        mount_token(&server, token_response("never", 3600), 0).await;

        let session = NinjaSession::new(SessionConfig {
            base_url: Some(server.uri()),
            ..Default::default()
        });
        assert!(!session.is_configured());
        for _ in 0..2 {
            let err = session.access_token().await.unwrap_err();
            assert!(matches!(err, ClientError::Configuration(_)));
        }
    }

    #[tokio::test]
    async fn invalidate_ignores_superseded_token() {
        let server = MockServer::start().await;
        mount_token(&server, token_response("current", 3600), 1).await;

        let session = explicit_session(&server.uri());
        session.access_token().await.unwrap();
        session.invalidate_token("something-older").await;
        assert_eq!(session.access_token().await.unwrap(), "current");
    }

    #[test]
    fn truncation_respects_utf8() {
        let mut s = "é".repeat(10);
        truncate_at_char_boundary(&mut s, 5);
        assert_eq!(s, "éé");
    }
}
