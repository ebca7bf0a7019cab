//! MCP tool definitions and handlers.
//!
//! Each tool is defined as a JSON schema (returned by [`all_tool_definitions`])
//! and dispatched by name from [`handle_tool_call`] to one
//! [`NinjaClient`] method.
//!
//! ## Tool categories
//!
//! - **Endpoint**: `list_regions`, `set_region`, `set_base_url`
//! - **Devices**: `get_devices`, `get_devices_detailed`, `search_devices`,
//!   `get_device` and the per-device detail tools, `reboot_device`,
//!   `set_device_maintenance`, `remove_device_maintenance`
//! - **Patching**: `scan_device_*_patches`, `apply_device_*_patches`
//! - **Organizations**: `get_organizations*`, `get_organization*`,
//!   `create_organization`
//! - **Alerts**: `get_alerts`, `reset_alert`
//! - **Queries** (`query_*`): fleet-wide reports
//! - **Contacts & users**: `*_contact*`, `get_end_users`, `get_technicians`
//! - **Misc**: `get_policies`, `get_activities`, `get_jobs`, `get_roles`

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::client::{NinjaClient, Page, PatchKind, RebootMode, Report};
use crate::error::ClientError;

/// Query tools: name, report, description.
const QUERY_TOOLS: [(&str, Report, &str); 11] = [
    (
        "query_antivirus_status",
        Report::AntivirusStatus,
        "Antivirus product status (installed, enabled, up to date) across devices.",
    ),
    (
        "query_device_health",
        Report::DeviceHealth,
        "Device health summary: offline, pending reboot, failed patches, threats, alerts.",
    ),
    (
        "query_operating_systems",
        Report::OperatingSystems,
        "Operating system name, version, and build for each device.",
    ),
    (
        "query_software",
        Report::Software,
        "Installed software inventory across devices.",
    ),
    (
        "query_volumes",
        Report::Volumes,
        "Disk volumes with capacity and free space across devices.",
    ),
    (
        "query_os_patches",
        Report::OsPatches,
        "Pending, failed, and rejected operating system patches across devices.",
    ),
    (
        "query_software_patches",
        Report::SoftwarePatches,
        "Pending, failed, and rejected third-party software patches across devices.",
    ),
    (
        "query_processors",
        Report::Processors,
        "Processor model, cores, and clock speed for each device.",
    ),
    (
        "query_network_interfaces",
        Report::NetworkInterfaces,
        "Network interfaces with MAC and IP addresses for each device.",
    ),
    (
        "query_windows_services",
        Report::WindowsServices,
        "Windows services with state and start type across devices.",
    ),
    (
        "query_logged_on_users",
        Report::LoggedOnUsers,
        "Users currently logged on to each device.",
    ),
];

/// Returns all tool definitions.
pub fn all_tool_definitions() -> Vec<Value> {
    let mut tools = endpoint_tool_definitions();
    tools.extend(device_tool_definitions());
    tools.extend(organization_tool_definitions());
    tools.extend(alert_tool_definitions());
    tools.extend(QUERY_TOOLS.iter().map(|(name, _, description)| {
        tool(
            name,
            description,
            json!({ "df": df_schema(), "pageSize": page_size_schema(), "cursor": {
                "type": "string",
                "description": "Cursor name returned by a previous call, for the next page."
            } }),
            &[],
        )
    }));
    tools.extend(contact_tool_definitions());
    tools.extend(misc_tool_definitions());
    tools
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        }
    })
}

fn id_schema(what: &str) -> Value {
    json!({ "type": "integer", "description": format!("{what} ID.") })
}

fn df_schema() -> Value {
    json!({
        "type": "string",
        "description": "Device filter expression, e.g. 'org = 12 AND class in (WINDOWS_SERVER)'. Passed to NinjaOne unchanged."
    })
}

fn page_size_schema() -> Value {
    json!({ "type": "integer", "description": "Maximum number of entries to return." })
}

fn after_schema() -> Value {
    json!({ "type": "integer", "description": "Return entries after this ID (cursor paging)." })
}

fn endpoint_tool_definitions() -> Vec<Value> {
    vec![
        tool(
            "list_regions",
            "List the known NinjaOne regions and their API base URLs.",
            json!({}),
            &[],
        ),
        tool(
            "set_region",
            "Switch the API endpoint to a NinjaOne region. Clears the cached access token.",
            json!({
                "region": {
                    "type": "string",
                    "description": "Region key.",
                    "enum": ["us", "us2", "eu", "ca", "oc"]
                }
            }),
            &["region"],
        ),
        tool(
            "set_base_url",
            "Switch the API endpoint to an explicit base URL (e.g. a private instance). Clears the cached access token.",
            json!({
                "baseUrl": {
                    "type": "string",
                    "description": "Base URL. A bare hostname is treated as https://."
                }
            }),
            &["baseUrl"],
        ),
    ]
}

fn device_tool_definitions() -> Vec<Value> {
    let device_id = || json!({ "id": id_schema("Device") });
    let mut tools = vec![
        tool(
            "get_devices",
            "List devices. Returns at most pageSize devices (default 50); use 'after' with the last ID to page.",
            json!({ "df": df_schema(), "pageSize": page_size_schema(), "after": after_schema() }),
            &[],
        ),
        tool(
            "get_devices_detailed",
            "List devices with full detail (OS, hardware, policy, last contact).",
            json!({ "df": df_schema(), "pageSize": page_size_schema(), "after": after_schema() }),
            &[],
        ),
        tool(
            "search_devices",
            "Search devices by name, IP, MAC address, or logged-on user.",
            json!({
                "q": { "type": "string", "description": "Search text." },
                "limit": { "type": "integer", "description": "Maximum number of results." }
            }),
            &["q"],
        ),
        tool("get_device", "Get a single device by ID.", device_id(), &["id"]),
        tool(
            "get_device_activities",
            "Activity log for a device, newest first.",
            json!({
                "id": id_schema("Device"),
                "pageSize": page_size_schema(),
                "olderThan": { "type": "integer", "description": "Return activities older than this activity ID." }
            }),
            &["id"],
        ),
    ];

    let details = [
        ("get_device_alerts", "Active alerts (triggered conditions) for a device."),
        ("get_device_jobs", "Running jobs for a device."),
        ("get_device_software", "Installed software on a device."),
        ("get_device_disks", "Physical disks of a device."),
        ("get_device_volumes", "Disk volumes of a device."),
        ("get_device_processors", "Processors of a device."),
        ("get_device_network_interfaces", "Network interfaces of a device."),
        ("get_device_last_logged_on_user", "Last user logged on to a device."),
    ];
    tools.extend(
        details
            .iter()
            .map(|(name, description)| tool(name, description, device_id(), &["id"])),
    );

    let patch_status = json!({
        "type": "string",
        "description": "Filter by patch status.",
        "enum": ["MANUAL", "APPROVED", "FAILED", "REJECTED"]
    });
    tools.push(tool(
        "get_device_os_patches",
        "Pending, failed, and rejected OS patches for a device.",
        json!({ "id": id_schema("Device"), "status": patch_status.clone() }),
        &["id"],
    ));
    tools.push(tool(
        "get_device_software_patches",
        "Pending, failed, and rejected software patches for a device.",
        json!({ "id": id_schema("Device"), "status": patch_status }),
        &["id"],
    ));

    tools.push(tool(
        "reboot_device",
        "Reboot a device. FORCED reboots do not wait for users to save work.",
        json!({
            "id": id_schema("Device"),
            "mode": {
                "type": "string",
                "description": "Reboot mode. Default NORMAL.",
                "enum": ["NORMAL", "FORCED"]
            },
            "reason": { "type": "string", "description": "Reason recorded in the activity log." }
        }),
        &["id"],
    ));
    tools.push(tool(
        "set_device_maintenance",
        "Put a device into maintenance mode, suppressing the listed features until 'end'.",
        json!({
            "id": id_schema("Device"),
            "disabledFeatures": {
                "type": "array",
                "description": "Features to suppress.",
                "items": { "type": "string", "enum": ["ALERTS", "PATCHING", "AVSCANS", "TASKS"] }
            },
            "start": { "type": "integer", "description": "Window start, epoch seconds. Default now." },
            "end": { "type": "integer", "description": "Window end, epoch seconds." }
        }),
        &["id", "disabledFeatures", "end"],
    ));
    tools.push(tool(
        "remove_device_maintenance",
        "End maintenance mode for a device.",
        device_id(),
        &["id"],
    ));

    let patch_actions = [
        ("scan_device_os_patches", "Start an OS patch scan on a device."),
        ("apply_device_os_patches", "Apply approved OS patches on a device."),
        ("scan_device_software_patches", "Start a software patch scan on a device."),
        ("apply_device_software_patches", "Apply approved software patches on a device."),
    ];
    tools.extend(
        patch_actions
            .iter()
            .map(|(name, description)| tool(name, description, device_id(), &["id"])),
    );

    tools
}

fn organization_tool_definitions() -> Vec<Value> {
    let paging = || json!({ "pageSize": page_size_schema(), "after": after_schema() });
    vec![
        tool("get_organizations", "List organizations (clients).", paging(), &[]),
        tool(
            "get_organizations_detailed",
            "List organizations with locations, policies, and settings.",
            paging(),
            &[],
        ),
        tool(
            "get_organization",
            "Get a single organization by ID.",
            json!({ "id": id_schema("Organization") }),
            &["id"],
        ),
        tool(
            "get_organization_locations",
            "List the locations of an organization.",
            json!({ "id": id_schema("Organization") }),
            &["id"],
        ),
        tool(
            "get_organization_devices",
            "List the devices of an organization.",
            json!({
                "id": id_schema("Organization"),
                "pageSize": page_size_schema(),
                "after": after_schema()
            }),
            &["id"],
        ),
        tool(
            "create_organization",
            "Create an organization, optionally copying policies and settings from a template organization.",
            json!({
                "name": { "type": "string", "description": "Organization name." },
                "description": { "type": "string", "description": "Free-text description." },
                "nodeApprovalMode": {
                    "type": "string",
                    "description": "How new devices are approved.",
                    "enum": ["AUTOMATIC", "MANUAL", "REJECT"]
                },
                "templateOrganizationId": {
                    "type": "integer",
                    "description": "Organization to copy settings from."
                }
            }),
            &["name"],
        ),
    ]
}

fn alert_tool_definitions() -> Vec<Value> {
    vec![
        tool(
            "get_alerts",
            "List active alerts (triggered conditions).",
            json!({
                "df": df_schema(),
                "sourceType": { "type": "string", "description": "Filter by alert source type, e.g. CONDITION_CPU." }
            }),
            &[],
        ),
        tool(
            "reset_alert",
            "Reset (acknowledge) an alert.",
            json!({ "uid": { "type": "string", "description": "Alert UID." } }),
            &["uid"],
        ),
    ]
}

fn contact_tool_definitions() -> Vec<Value> {
    let contact_fields = || {
        json!({
            "firstName": { "type": "string" },
            "lastName": { "type": "string" },
            "email": { "type": "string" },
            "phone": { "type": "string" },
            "jobTitle": { "type": "string" },
            "organizationId": { "type": "integer" }
        })
    };
    let mut update_fields = contact_fields();
    update_fields["id"] = id_schema("Contact");

    vec![
        tool("get_contacts", "List contacts.", json!({}), &[]),
        tool(
            "get_contact",
            "Get a single contact by ID.",
            json!({ "id": id_schema("Contact") }),
            &["id"],
        ),
        tool(
            "create_contact",
            "Create a contact for an organization.",
            contact_fields(),
            &["organizationId", "firstName", "lastName", "email"],
        ),
        tool(
            "update_contact",
            "Update fields of an existing contact. Omitted fields are unchanged.",
            update_fields,
            &["id"],
        ),
        tool(
            "delete_contact",
            "Delete a contact.",
            json!({ "id": id_schema("Contact") }),
            &["id"],
        ),
        tool("get_end_users", "List end users.", json!({}), &[]),
        tool("get_technicians", "List technicians.", json!({}), &[]),
    ]
}

fn misc_tool_definitions() -> Vec<Value> {
    vec![
        tool("get_policies", "List policies.", json!({}), &[]),
        tool(
            "get_activities",
            "List activities across all devices, newest first.",
            json!({
                "df": df_schema(),
                "type": { "type": "string", "description": "Activity type, e.g. ACTION, CONDITION, SYSTEM." },
                "pageSize": page_size_schema(),
                "olderThan": { "type": "integer", "description": "Return activities older than this activity ID." }
            }),
            &[],
        ),
        tool(
            "get_jobs",
            "List running jobs.",
            json!({
                "df": df_schema(),
                "jobType": { "type": "string", "description": "Job type filter." }
            }),
            &[],
        ),
        tool("get_roles", "List device roles.", json!({}), &[]),
    ]
}

/// Result of an MCP tool call, ready to be serialized into a JSON-RPC response.
pub struct ToolResult {
    /// MCP content blocks (a single `{"type":"text","text":"..."}` entry).
    pub content: Vec<Value>,
    /// Whether the tool call failed (maps to `isError` in the MCP response).
    pub is_error: bool,
}

impl ToolResult {
    fn success(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_default();
        Self {
            content: vec![json!({ "type": "text", "text": text })],
            is_error: false,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![json!({ "type": "text", "text": message })],
            is_error: true,
        }
    }
}

#[derive(Debug, Error)]
enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Handle a tool call and return MCP content.
pub async fn handle_tool_call(name: &str, args: &Value, client: &NinjaClient) -> ToolResult {
    match dispatch(name, args, client).await {
        Ok(value) => ToolResult::success(&value),
        Err(e) => ToolResult::error(e.to_string()),
    }
}

async fn dispatch(name: &str, args: &Value, client: &NinjaClient) -> Result<Value, ToolError> {
    if let Some((_, report, _)) = QUERY_TOOLS.iter().find(|(n, _, _)| *n == name) {
        return Ok(client
            .query(
                *report,
                opt_str(args, "df"),
                opt_u32(args, "pageSize")?,
                opt_str(args, "cursor"),
            )
            .await?);
    }

    let value = match name {
        "list_regions" => json!({ "regions": client.session().list_regions() }),
        "set_region" => {
            let info = client.session().set_region(req_str(args, "region")?).await?;
            json!({ "region": info.region, "baseUrl": info.base_url })
        }
        "set_base_url" => {
            let base_url = client.session().set_base_url(req_str(args, "baseUrl")?).await;
            json!({ "baseUrl": base_url })
        }

        "get_devices" => client.get_devices(opt_str(args, "df"), page(args)?).await?,
        "get_devices_detailed" => {
            client
                .get_devices_detailed(opt_str(args, "df"), page(args)?)
                .await?
        }
        "search_devices" => {
            client
                .search_devices(req_str(args, "q")?, opt_u32(args, "limit")?)
                .await?
        }
        "get_device" => client.get_device(req_id(args, "id")?).await?,
        "get_device_activities" => {
            client
                .get_device_activities(
                    req_id(args, "id")?,
                    opt_u32(args, "pageSize")?,
                    opt_u64(args, "olderThan")?,
                )
                .await?
        }
        "get_device_alerts" => client.get_device_alerts(req_id(args, "id")?).await?,
        "get_device_jobs" => client.get_device_jobs(req_id(args, "id")?).await?,
        "get_device_software" => client.get_device_software(req_id(args, "id")?).await?,
        "get_device_os_patches" => {
            client
                .get_device_patches(req_id(args, "id")?, PatchKind::Os, opt_str(args, "status"))
                .await?
        }
        "get_device_software_patches" => {
            client
                .get_device_patches(
                    req_id(args, "id")?,
                    PatchKind::Software,
                    opt_str(args, "status"),
                )
                .await?
        }
        "get_device_disks" => client.get_device_disks(req_id(args, "id")?).await?,
        "get_device_volumes" => client.get_device_volumes(req_id(args, "id")?).await?,
        "get_device_processors" => client.get_device_processors(req_id(args, "id")?).await?,
        "get_device_network_interfaces" => {
            client
                .get_device_network_interfaces(req_id(args, "id")?)
                .await?
        }
        "get_device_last_logged_on_user" => {
            client
                .get_device_last_logged_on_user(req_id(args, "id")?)
                .await?
        }
        "reboot_device" => {
            let mode = match opt_str(args, "mode") {
                None | Some("NORMAL") => RebootMode::Normal,
                Some("FORCED") => RebootMode::Forced,
                Some(other) => {
                    return Err(ToolError::InvalidParameter {
                        name: "mode",
                        reason: format!("expected NORMAL or FORCED, got '{other}'"),
                    })
                }
            };
            client
                .reboot_device(req_id(args, "id")?, mode, opt_str(args, "reason"))
                .await?
        }
        "set_device_maintenance" => {
            let features: Vec<String> = args
                .get("disabledFeatures")
                .cloned()
                .ok_or(ToolError::MissingParameter("disabledFeatures"))
                .and_then(|v| {
                    serde_json::from_value(v).map_err(|e| ToolError::InvalidParameter {
                        name: "disabledFeatures",
                        reason: e.to_string(),
                    })
                })?;
            client
                .set_device_maintenance(
                    req_id(args, "id")?,
                    &features,
                    opt_u64(args, "start")?,
                    req_id(args, "end")?,
                )
                .await?
        }
        "remove_device_maintenance" => {
            client
                .remove_device_maintenance(req_id(args, "id")?)
                .await?
        }

        "scan_device_os_patches" => {
            client
                .scan_device_patches(req_id(args, "id")?, PatchKind::Os)
                .await?
        }
        "apply_device_os_patches" => {
            client
                .apply_device_patches(req_id(args, "id")?, PatchKind::Os)
                .await?
        }
        "scan_device_software_patches" => {
            client
                .scan_device_patches(req_id(args, "id")?, PatchKind::Software)
                .await?
        }
        "apply_device_software_patches" => {
            client
                .apply_device_patches(req_id(args, "id")?, PatchKind::Software)
                .await?
        }

        "get_organizations" => client.get_organizations(page(args)?).await?,
        "get_organizations_detailed" => client.get_organizations_detailed(page(args)?).await?,
        "get_organization" => client.get_organization(req_id(args, "id")?).await?,
        "get_organization_locations" => {
            client
                .get_organization_locations(req_id(args, "id")?)
                .await?
        }
        "get_organization_devices" => {
            client
                .get_organization_devices(req_id(args, "id")?, page(args)?)
                .await?
        }
        "create_organization" => {
            req_str(args, "name")?;
            let template = opt_u64(args, "templateOrganizationId")?;
            let body = pick(args, &["name", "description", "nodeApprovalMode"]);
            client.create_organization(&body, template).await?
        }

        "get_alerts" => {
            client
                .get_alerts(opt_str(args, "df"), opt_str(args, "sourceType"))
                .await?
        }
        "reset_alert" => client.reset_alert(req_str(args, "uid")?).await?,

        "get_contacts" => client.get_contacts().await?,
        "get_contact" => client.get_contact(req_id(args, "id")?).await?,
        "create_contact" => {
            req_id(args, "organizationId")?;
            for field in ["firstName", "lastName", "email"] {
                if opt_str(args, field).is_none() {
                    return Err(ToolError::MissingParameter(field));
                }
            }
            client.create_contact(&pick(args, CONTACT_FIELDS)).await?
        }
        "update_contact" => {
            let id = req_id(args, "id")?;
            client.update_contact(id, &pick(args, CONTACT_FIELDS)).await?
        }
        "delete_contact" => client.delete_contact(req_id(args, "id")?).await?,
        "get_end_users" => client.get_end_users().await?,
        "get_technicians" => client.get_technicians().await?,

        "get_policies" => client.get_policies().await?,
        "get_activities" => {
            client
                .get_activities(
                    opt_str(args, "df"),
                    opt_str(args, "type"),
                    opt_u32(args, "pageSize")?,
                    opt_u64(args, "olderThan")?,
                )
                .await?
        }
        "get_jobs" => {
            client
                .get_jobs(opt_str(args, "df"), opt_str(args, "jobType"))
                .await?
        }
        "get_roles" => client.get_roles().await?,

        _ => return Err(ToolError::UnknownTool(name.to_string())),
    };
    Ok(value)
}

const CONTACT_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "email",
    "phone",
    "jobTitle",
    "organizationId",
];

/// Copy the listed keys (when present) into a fresh object.
fn pick(args: &Value, keys: &[&str]) -> Value {
    let mut out = Map::new();
    for key in keys {
        if let Some(v) = args.get(*key).filter(|v| !v.is_null()) {
            out.insert((*key).to_string(), v.clone());
        }
    }
    Value::Object(out)
}

fn opt_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn req_str<'a>(args: &'a Value, name: &'static str) -> Result<&'a str, ToolError> {
    opt_str(args, name).ok_or(ToolError::MissingParameter(name))
}

/// Integer argument; numeric strings are accepted since some clients send IDs as text.
fn opt_u64(args: &Value, name: &'static str) -> Result<Option<u64>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| ToolError::InvalidParameter {
            name,
            reason: format!("expected a non-negative integer, got {n}"),
        }),
        Some(Value::String(s)) => {
            s.trim()
                .parse()
                .map(Some)
                .map_err(|_| ToolError::InvalidParameter {
                    name,
                    reason: format!("expected a non-negative integer, got '{s}'"),
                })
        }
        Some(other) => Err(ToolError::InvalidParameter {
            name,
            reason: format!("expected a non-negative integer, got {other}"),
        }),
    }
}

fn opt_u32(args: &Value, name: &'static str) -> Result<Option<u32>, ToolError> {
    opt_u64(args, name)?
        .map(|v| {
            u32::try_from(v).map_err(|_| ToolError::InvalidParameter {
                name,
                reason: format!("{v} is too large"),
            })
        })
        .transpose()
}

fn req_id(args: &Value, name: &'static str) -> Result<u64, ToolError> {
    opt_u64(args, name)?.ok_or(ToolError::MissingParameter(name))
}

fn page(args: &Value) -> Result<Page, ToolError> {
    Ok(Page {
        page_size: opt_u32(args, "pageSize")?,
        after: opt_u64(args, "after")?,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{Credentials, Grant, NinjaSession, SessionConfig, TOKEN_PATH};

    fn unconfigured_client() -> NinjaClient {
        NinjaClient::new(NinjaSession::new(SessionConfig::default()))
    }

    async fn client_with_server() -> (NinjaClient, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
            )
            .mount(&server)
            .await;
        let client = NinjaClient::new(NinjaSession::new(SessionConfig {
            base_url: Some(server.uri()),
            credentials: Some(Credentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                grant: Grant::ClientCredentials,
            }),
            ..Default::default()
        }));
        (client, server)
    }

    fn text(result: &ToolResult) -> &str {
        result.content[0]["text"].as_str().unwrap()
    }

    #[test]
    fn tool_names_are_unique() {
        let defs = all_tool_definitions();
        let names: HashSet<&str> = defs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names.len(), defs.len());
    }

    #[test]
    fn required_fields_are_declared_properties() {
        for def in all_tool_definitions() {
            let schema = &def["inputSchema"];
            for field in schema["required"].as_array().unwrap() {
                let field = field.as_str().unwrap();
                assert!(
                    schema["properties"].get(field).is_some(),
                    "{} requires undeclared {field}",
                    def["name"]
                );
            }
        }
    }

    #[tokio::test]
    async fn every_defined_tool_is_dispatched() {
        // Without credentials each known tool fails on configuration or on a
        // missing argument, never as an unknown tool.
        let client = unconfigured_client();
        for def in all_tool_definitions() {
            let name = def["name"].as_str().unwrap();
            let result = handle_tool_call(name, &json!({}), &client).await;
            assert!(
                !text(&result).starts_with("Unknown tool"),
                "{name} is not dispatched"
            );
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let result = handle_tool_call("format_disk", &json!({}), &unconfigured_client()).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "Unknown tool: format_disk");
    }

    #[tokio::test]
    async fn missing_id_is_reported() {
        let result = handle_tool_call("get_device", &json!({}), &unconfigured_client()).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "Missing required parameter: id");
    }

    #[tokio::test]
    async fn unconfigured_client_reports_configuration_error() {
        let result =
            handle_tool_call("get_device", &json!({ "id": 1 }), &unconfigured_client()).await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Configuration error"));
    }

    #[tokio::test]
    async fn list_regions_needs_no_credentials() {
        let result = handle_tool_call("list_regions", &json!({}), &unconfigured_client()).await;
        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(parsed["regions"][0]["region"], "us");
        assert_eq!(parsed["regions"][0]["baseUrl"], "https://app.ninjarmm.com");
    }

    #[tokio::test]
    async fn set_region_rejects_unknown_key() {
        let result =
            handle_tool_call("set_region", &json!({ "region": "moon" }), &unconfigured_client())
                .await;
        assert!(result.is_error);
        assert!(text(&result).contains("'moon'"));
    }

    #[tokio::test]
    async fn set_base_url_normalizes() {
        let client = unconfigured_client();
        let result =
            handle_tool_call("set_base_url", &json!({ "baseUrl": "ninja.example.com" }), &client)
                .await;
        assert!(!result.is_error);
        assert_eq!(
            client.session().endpoint().await.base_url.as_deref(),
            Some("https://ninja.example.com")
        );
    }

    #[tokio::test]
    async fn string_ids_are_accepted() {
        let (client, server) = client_with_server().await;
        Mock::given(method("GET"))
            .and(path("/v2/organization/17/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
            .expect(1)
            .mount(&server)
            .await;

        let result =
            handle_tool_call("get_organization_locations", &json!({ "id": "17" }), &client).await;
        assert!(!result.is_error, "{}", text(&result));
    }

    #[tokio::test]
    async fn negative_id_is_rejected() {
        let result =
            handle_tool_call("get_device", &json!({ "id": -4 }), &unconfigured_client()).await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("Invalid parameter id"));
    }

    #[tokio::test]
    async fn query_tool_forwards_filter() {
        let (client, server) = client_with_server().await;
        Mock::given(method("GET"))
            .and(path("/v2/queries/volumes"))
            .and(query_param("df", "org = 4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let result = handle_tool_call("query_volumes", &json!({ "df": "org = 4" }), &client).await;
        assert!(!result.is_error, "{}", text(&result));
    }

    #[tokio::test]
    async fn create_contact_sends_only_contact_fields() {
        let (client, server) = client_with_server().await;
        Mock::given(method("POST"))
            .and(path("/v2/contacts"))
            .and(body_json(json!({
                "organizationId": 2,
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
            .expect(1)
            .mount(&server)
            .await;

        let result = handle_tool_call(
            "create_contact",
            &json!({
                "organizationId": 2,
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "unrelated": true
            }),
            &client,
        )
        .await;
        assert!(!result.is_error, "{}", text(&result));
    }

    #[tokio::test]
    async fn reboot_rejects_unknown_mode() {
        let result = handle_tool_call(
            "reboot_device",
            &json!({ "id": 1, "mode": "GENTLE" }),
            &unconfigured_client(),
        )
        .await;
        assert!(result.is_error);
        assert!(text(&result).contains("GENTLE"));
    }

    #[tokio::test]
    async fn api_errors_surface_status_and_body() {
        let (client, server) = client_with_server().await;
        Mock::given(method("GET"))
            .and(path("/v2/device/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"resultCode\":\"NOT_FOUND\"}"))
            .mount(&server)
            .await;

        let result = handle_tool_call("get_device", &json!({ "id": 404 }), &client).await;
        assert!(result.is_error);
        assert_eq!(
            text(&result),
            "NinjaOne API error (HTTP 404 Not Found): {\"resultCode\":\"NOT_FOUND\"}"
        );
    }
}
