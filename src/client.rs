//! HTTP client for the NinjaOne v2 REST API.
//!
//! [`NinjaClient`] wraps a [`NinjaSession`] and provides typed methods for
//! each NinjaOne endpoint the MCP tools expose. All responses are returned as
//! `serde_json::Value`; the tools layer handles formatting for the AI agent.
//!
//! ## Authentication
//!
//! Every call goes through [`NinjaClient::request`], which obtains a bearer
//! token from the session (auto-detecting the regional endpoint on first use)
//! and sends it as `Authorization: Bearer <token>`.
//!
//! ## Response normalization
//!
//! Several write endpoints answer with an empty or non-JSON body. Those are
//! reported as `{"success": true}` rather than as errors. Non-2xx responses
//! become [`ClientError::ApiRequest`] carrying status and raw body.

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::NinjaSession;
use crate::error::ClientError;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Reboot mode for [`NinjaClient::reboot_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootMode {
    Normal,
    Forced,
}

impl RebootMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RebootMode::Normal => "NORMAL",
            RebootMode::Forced => "FORCED",
        }
    }
}

/// Patch kind for scan/apply operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Os,
    Software,
}

impl PatchKind {
    fn segment(self) -> &'static str {
        match self {
            PatchKind::Os => "os",
            PatchKind::Software => "software",
        }
    }
}

/// Fleet-wide report under `/v2/queries/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    AntivirusStatus,
    DeviceHealth,
    OperatingSystems,
    Software,
    Volumes,
    OsPatches,
    SoftwarePatches,
    Processors,
    NetworkInterfaces,
    WindowsServices,
    LoggedOnUsers,
}

impl Report {
    fn path(self) -> &'static str {
        match self {
            Report::AntivirusStatus => "/v2/queries/antivirus-status",
            Report::DeviceHealth => "/v2/queries/device-health",
            Report::OperatingSystems => "/v2/queries/operating-systems",
            Report::Software => "/v2/queries/software",
            Report::Volumes => "/v2/queries/volumes",
            Report::OsPatches => "/v2/queries/os-patches",
            Report::SoftwarePatches => "/v2/queries/software-patches",
            Report::Processors => "/v2/queries/processors",
            Report::NetworkInterfaces => "/v2/queries/network-interfaces",
            Report::WindowsServices => "/v2/queries/windows-services",
            Report::LoggedOnUsers => "/v2/queries/logged-on-users",
        }
    }
}

/// Query-string builder that skips absent optional parameters.
#[derive(Default)]
struct Query(Vec<(&'static str, String)>);

impl Query {
    fn new() -> Self {
        Self::default()
    }

    fn add(mut self, key: &'static str, value: impl ToString) -> Self {
        self.0.push((key, value.to_string()));
        self
    }

    fn opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.add(key, v),
            None => self,
        }
    }
}

/// Paging arguments shared by the list endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub page_size: Option<u32>,
    /// Cursor: return entries after this id.
    pub after: Option<u64>,
}

/// Client for one NinjaOne tenant.
pub struct NinjaClient {
    session: NinjaSession,
}

impl NinjaClient {
    pub fn new(session: NinjaSession) -> Self {
        Self { session }
    }

    /// The underlying session (endpoint + token state).
    pub fn session(&self) -> &NinjaSession {
        &self.session
    }

    /// Issue an authenticated request to `path` (relative to the base URL).
    ///
    /// `body` is sent as JSON for `POST`, `PUT` and `PATCH`.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        self.send(method, path, Query::new(), body).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let auth = self.session.authorize().await?;
        let url = request_url(&auth.base_url, path, &query)?;

        debug!(%method, %url, "NinjaOne request");
        let mut req = self
            .session
            .http()
            .request(method.clone(), url)
            .bearer_auth(&auth.token);
        if let Some(body) = body {
            if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
                req = req.json(body);
            }
        }

        let resp = req.send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate_token(&auth.token).await;
        }
        Self::handle_response(&method, resp).await
    }

    /// Turn an HTTP response into a JSON value or a [`ClientError::ApiRequest`].
    async fn handle_response(
        method: &Method,
        resp: reqwest::Response,
    ) -> Result<Value, ClientError> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::ApiRequest {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        if *method == Method::DELETE && status == StatusCode::NO_CONTENT {
            return Ok(success());
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(success());
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            // NinjaOne acknowledges some fire-and-forget actions (reboots,
            // patch runs) with a 2xx and a plain-text body.
            Err(e) => {
                debug!(%status, error = %e, "Non-JSON success body, reporting success");
                Ok(success())
            }
        }
    }

    async fn get(&self, path: &str, query: Query) -> Result<Value, ClientError> {
        self.send(Method::GET, path, query, None).await
    }

    // --- Devices ---

    /// `GET /v2/devices`: device list, optionally filtered by `df`.
    pub async fn get_devices(&self, df: Option<&str>, page: Page) -> Result<Value, ClientError> {
        self.get("/v2/devices", device_list_query(df, page)).await
    }

    /// `GET /v2/devices-detailed`: device list with full detail.
    pub async fn get_devices_detailed(
        &self,
        df: Option<&str>,
        page: Page,
    ) -> Result<Value, ClientError> {
        self.get("/v2/devices-detailed", device_list_query(df, page))
            .await
    }

    /// `GET /v2/devices/search`: free-text device search.
    pub async fn search_devices(&self, q: &str, limit: Option<u32>) -> Result<Value, ClientError> {
        let query = Query::new().add("q", q).opt("limit", limit);
        self.get("/v2/devices/search", query).await
    }

    /// `GET /v2/device/:id`
    pub async fn get_device(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}"), Query::new()).await
    }

    /// `GET /v2/device/:id/activities`
    pub async fn get_device_activities(
        &self,
        id: u64,
        page_size: Option<u32>,
        older_than: Option<u64>,
    ) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("pageSize", page_size)
            .opt("olderThan", older_than);
        self.get(&format!("/v2/device/{id}/activities"), query).await
    }

    /// `GET /v2/device/:id/alerts`
    pub async fn get_device_alerts(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/alerts"), Query::new()).await
    }

    /// `GET /v2/device/:id/jobs`
    pub async fn get_device_jobs(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/jobs"), Query::new()).await
    }

    /// `GET /v2/device/:id/software`
    pub async fn get_device_software(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/software"), Query::new()).await
    }

    /// `GET /v2/device/:id/os-patches` or `/software-patches`.
    pub async fn get_device_patches(
        &self,
        id: u64,
        kind: PatchKind,
        status: Option<&str>,
    ) -> Result<Value, ClientError> {
        let query = Query::new().opt("status", status);
        self.get(&format!("/v2/device/{id}/{}-patches", kind.segment()), query)
            .await
    }

    /// `GET /v2/device/:id/disks`
    pub async fn get_device_disks(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/disks"), Query::new()).await
    }

    /// `GET /v2/device/:id/volumes`
    pub async fn get_device_volumes(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/volumes"), Query::new()).await
    }

    /// `GET /v2/device/:id/processors`
    pub async fn get_device_processors(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/processors"), Query::new()).await
    }

    /// `GET /v2/device/:id/network-interfaces`
    pub async fn get_device_network_interfaces(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/network-interfaces"), Query::new())
            .await
    }

    /// `GET /v2/device/:id/last-logged-on-user`
    pub async fn get_device_last_logged_on_user(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/device/{id}/last-logged-on-user"), Query::new())
            .await
    }

    /// `POST /v2/device/:id/reboot/:mode`
    pub async fn reboot_device(
        &self,
        id: u64,
        mode: RebootMode,
        reason: Option<&str>,
    ) -> Result<Value, ClientError> {
        let mut body = json!({});
        if let Some(r) = reason {
            body["reason"] = json!(r);
        }
        self.request(
            &format!("/v2/device/{id}/reboot/{}", mode.as_str()),
            Method::POST,
            Some(&body),
        )
        .await
    }

    /// `PUT /v2/device/:id/maintenance`: schedule a maintenance window.
    ///
    /// `start` and `end` are epoch seconds; `start` defaults to now on the
    /// NinjaOne side when omitted.
    pub async fn set_device_maintenance(
        &self,
        id: u64,
        disabled_features: &[String],
        start: Option<u64>,
        end: u64,
    ) -> Result<Value, ClientError> {
        let mut body = json!({
            "disabledFeatures": disabled_features,
            "end": end,
        });
        if let Some(s) = start {
            body["start"] = json!(s);
        }
        self.request(
            &format!("/v2/device/{id}/maintenance"),
            Method::PUT,
            Some(&body),
        )
        .await
    }

    /// `DELETE /v2/device/:id/maintenance`
    pub async fn remove_device_maintenance(&self, id: u64) -> Result<Value, ClientError> {
        self.request(&format!("/v2/device/{id}/maintenance"), Method::DELETE, None)
            .await
    }

    // --- Patching ---

    /// `POST /v2/device/:id/patch/:kind/scan`
    pub async fn scan_device_patches(&self, id: u64, kind: PatchKind) -> Result<Value, ClientError> {
        self.request(
            &format!("/v2/device/{id}/patch/{}/scan", kind.segment()),
            Method::POST,
            None,
        )
        .await
    }

    /// `POST /v2/device/:id/patch/:kind/apply`
    pub async fn apply_device_patches(
        &self,
        id: u64,
        kind: PatchKind,
    ) -> Result<Value, ClientError> {
        self.request(
            &format!("/v2/device/{id}/patch/{}/apply", kind.segment()),
            Method::POST,
            None,
        )
        .await
    }

    // --- Organizations ---

    /// `GET /v2/organizations`
    pub async fn get_organizations(&self, page: Page) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("pageSize", page.page_size)
            .opt("after", page.after);
        self.get("/v2/organizations", query).await
    }

    /// `GET /v2/organizations-detailed`
    pub async fn get_organizations_detailed(&self, page: Page) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("pageSize", page.page_size)
            .opt("after", page.after);
        self.get("/v2/organizations-detailed", query).await
    }

    /// `GET /v2/organization/:id`
    pub async fn get_organization(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/organization/{id}"), Query::new()).await
    }

    /// `GET /v2/organization/:id/locations`
    pub async fn get_organization_locations(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/organization/{id}/locations"), Query::new())
            .await
    }

    /// `GET /v2/organization/:id/devices`
    pub async fn get_organization_devices(
        &self,
        id: u64,
        page: Page,
    ) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("pageSize", page.page_size)
            .opt("after", page.after);
        self.get(&format!("/v2/organization/{id}/devices"), query).await
    }

    /// `POST /v2/organizations`: create an organization, optionally copying
    /// settings from a template organization.
    pub async fn create_organization(
        &self,
        organization: &Value,
        template_organization_id: Option<u64>,
    ) -> Result<Value, ClientError> {
        let query = Query::new().opt("templateOrganizationId", template_organization_id);
        self.send(Method::POST, "/v2/organizations", query, Some(organization))
            .await
    }

    // --- Alerts ---

    /// `GET /v2/alerts`
    pub async fn get_alerts(
        &self,
        df: Option<&str>,
        source_type: Option<&str>,
    ) -> Result<Value, ClientError> {
        let query = Query::new().opt("df", df).opt("sourceType", source_type);
        self.get("/v2/alerts", query).await
    }

    /// `DELETE /v2/alert/:uid`: reset (acknowledge) an alert.
    pub async fn reset_alert(&self, uid: &str) -> Result<Value, ClientError> {
        let path = format!("/v2/alert/{}", path_segment(uid)?);
        self.request(&path, Method::DELETE, None).await
    }

    // --- Queries ---

    /// `GET /v2/queries/:report`: fleet-wide report.
    pub async fn query(
        &self,
        report: Report,
        df: Option<&str>,
        page_size: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("df", df)
            .opt("pageSize", page_size)
            .opt("cursor", cursor);
        self.get(report.path(), query).await
    }

    // --- Contacts ---

    /// `GET /v2/contacts`
    pub async fn get_contacts(&self) -> Result<Value, ClientError> {
        self.get("/v2/contacts", Query::new()).await
    }

    /// `GET /v2/contact/:id`
    pub async fn get_contact(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("/v2/contact/{id}"), Query::new()).await
    }

    /// `POST /v2/contacts`
    pub async fn create_contact(&self, contact: &Value) -> Result<Value, ClientError> {
        self.request("/v2/contacts", Method::POST, Some(contact)).await
    }

    /// `PATCH /v2/contact/:id`
    pub async fn update_contact(&self, id: u64, contact: &Value) -> Result<Value, ClientError> {
        self.request(&format!("/v2/contact/{id}"), Method::PATCH, Some(contact))
            .await
    }

    /// `DELETE /v2/contact/:id`
    pub async fn delete_contact(&self, id: u64) -> Result<Value, ClientError> {
        self.request(&format!("/v2/contact/{id}"), Method::DELETE, None)
            .await
    }

    // --- Users ---

    /// `GET /v2/user/end-users`
    pub async fn get_end_users(&self) -> Result<Value, ClientError> {
        self.get("/v2/user/end-users", Query::new()).await
    }

    /// `GET /v2/user/technicians`
    pub async fn get_technicians(&self) -> Result<Value, ClientError> {
        self.get("/v2/user/technicians", Query::new()).await
    }

    // --- Policies, activities, jobs, roles ---

    /// `GET /v2/policies`
    pub async fn get_policies(&self) -> Result<Value, ClientError> {
        self.get("/v2/policies", Query::new()).await
    }

    /// `GET /v2/activities`
    pub async fn get_activities(
        &self,
        df: Option<&str>,
        activity_type: Option<&str>,
        page_size: Option<u32>,
        older_than: Option<u64>,
    ) -> Result<Value, ClientError> {
        let query = Query::new()
            .opt("df", df)
            .opt("type", activity_type)
            .opt("pageSize", page_size)
            .opt("olderThan", older_than);
        self.get("/v2/activities", query).await
    }

    /// `GET /v2/jobs`: currently running jobs.
    pub async fn get_jobs(
        &self,
        df: Option<&str>,
        job_type: Option<&str>,
    ) -> Result<Value, ClientError> {
        let query = Query::new().opt("df", df).opt("jobType", job_type);
        self.get("/v2/jobs", query).await
    }

    /// `GET /v2/roles`: device roles.
    pub async fn get_roles(&self) -> Result<Value, ClientError> {
        self.get("/v2/roles", Query::new()).await
    }
}

/// `base_url` + `path` with `query` appended.
fn request_url(base_url: &str, path: &str, query: &Query) -> Result<reqwest::Url, ClientError> {
    let mut url = reqwest::Url::parse(&format!("{base_url}{path}"))
        .map_err(|e| ClientError::InvalidUrl(format!("{base_url}{path}: {e}")))?;
    if !query.0.is_empty() {
        url.query_pairs_mut().extend_pairs(&query.0);
    }
    Ok(url)
}

/// Escape a caller-supplied value for use as exactly one path segment.
///
/// `.` and `..` are rejected since URL parsing would resolve them away.
fn path_segment(raw: &str) -> Result<String, ClientError> {
    match raw {
        "" | "." | ".." => Err(ClientError::InvalidUrl(format!(
            "'{raw}' is not a valid path segment"
        ))),
        _ => Ok(urlencoding::encode(raw).into_owned()),
    }
}

fn device_list_query(df: Option<&str>, page: Page) -> Query {
    Query::new()
        .opt("df", df)
        .add("pageSize", page.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
        .opt("after", page.after)
}

/// Synthetic result for 2xx responses without a JSON body.
fn success() -> Value {
    json!({ "success": true })
}
