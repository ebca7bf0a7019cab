//! MCP (Model Context Protocol) JSON-RPC handler.
//!
//! [`handle_line`] and [`handle_message`] are transport independent; the stdio
//! loop below and the HTTP/SSE routes in [`crate::http`] all feed them.
//!
//! ## Supported methods
//!
//! | Method              | Description                      |
//! |---------------------|----------------------------------|
//! | `initialize`        | Handshake, returns capabilities  |
//! | `tools/list`        | List available tool definitions  |
//! | `tools/call`        | Execute a tool and return result |
//! | `ping`              | Liveness check                   |
//!
//! Notifications (messages without an `id`) never get a response.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

use crate::client::NinjaClient;
use crate::tools;

const SERVER_NAME: &str = "ninjaone-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

/// Run the MCP server on stdio, processing JSON-RPC requests until EOF.
pub async fn run_stdio(client: &NinjaClient) {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        }

        if let Some(response) = handle_line(&line, client).await {
            write_response(&mut stdout, &response).await;
        }
    }
    debug!("stdin closed, shutting down");
}

/// Handle one raw JSON-RPC message. Blank lines and notifications yield `None`.
pub async fn handle_line(line: &str, client: &NinjaClient) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(request) => handle_message(&request, client).await,
        Err(e) => Some(error_response(
            Value::Null,
            PARSE_ERROR,
            format!("Parse error: {e}"),
        )),
    }
}

/// Handle a parsed JSON-RPC message.
pub async fn handle_message(request: &Value, client: &NinjaClient) -> Option<Value> {
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        return Some(error_response(
            id,
            INVALID_REQUEST,
            "Invalid request: missing method".into(),
        ));
    };

    // Notifications (no id)
    let Some(id) = request.get("id").cloned() else {
        match method {
            "notifications/initialized" | "notifications/cancelled" => {}
            _ => debug!(method, "ignoring unknown notification"),
        }
        return None;
    };

    let response = match method {
        "initialize" => handle_initialize(),
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tools_call(request, client).await,
        "ping" => json!({ "jsonrpc": "2.0", "result": {} }),
        _ => {
            warn!(method, "method not found");
            error_response(
                Value::Null,
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            )
        }
    };
    Some(inject_id(response, id))
}

/// Handle `initialize`: return protocol version, capabilities, and server info.
fn handle_initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }
    })
}

fn handle_tools_list() -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "tools": tools::all_tool_definitions()
        }
    })
}

/// Handle `tools/call`: dispatch to the matching tool handler.
async fn handle_tools_call(request: &Value, client: &NinjaClient) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    debug!(tool = name, "tools/call");
    let result = tools::handle_tool_call(name, &args, client).await;
    if result.is_error {
        warn!(tool = name, "tool call failed");
    }

    let mut response_result = json!({
        "content": result.content
    });
    if result.is_error {
        response_result["isError"] = json!(true);
    }

    json!({
        "jsonrpc": "2.0",
        "result": response_result
    })
}

fn error_response(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Inject the request `id` into a response object.
fn inject_id(mut response: Value, id: Value) -> Value {
    response["id"] = id;
    response
}

/// Write a JSON-RPC response to stdout (one line, flushed immediately).
async fn write_response(stdout: &mut tokio::io::Stdout, response: &Value) {
    let mut output = serde_json::to_string(response).unwrap_or_default();
    output.push('\n');
    if let Err(e) = stdout.write_all(output.as_bytes()).await {
        error!("stdout write error: {e}");
    }
    if let Err(e) = stdout.flush().await {
        error!("stdout flush error: {e}");
    }
}
