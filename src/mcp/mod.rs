//! JSON-RPC 2.0 server for songflow over stdio
//!
//! Methods: `initialize`, `tools/list` and `tools/call`. Every tool call
//! names its acting user in `arguments.actor`. Workflow failures come back
//! as JSON-RPC errors whose `data.kind` is the error class
//! (permission, validation, conflict, not_found, storage).

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

use crate::config::{Config, SongflowPaths};
use crate::workflow::{ErrorKind, SongWorkflow, WorkflowError};

mod tools;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const WORKFLOW_ERROR: i32 = -32000;

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Failure of a method call, before it is turned into a JSON-RPC error
#[derive(Debug)]
enum CallError {
    MethodNotFound(String),
    InvalidParams(String),
    Tool(anyhow::Error),
}

impl From<CallError> for JsonRpcError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::MethodNotFound(method) => JsonRpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
                data: None,
            },
            CallError::InvalidParams(message) => JsonRpcError {
                code: INVALID_PARAMS,
                message,
                data: Some(json!({ "kind": ErrorKind::Validation })),
            },
            CallError::Tool(e) => {
                // Argument errors from the tools are plain anyhow errors
                let kind = e
                    .downcast_ref::<WorkflowError>()
                    .map_or(ErrorKind::Validation, WorkflowError::kind);
                JsonRpcError {
                    code: WORKFLOW_ERROR,
                    message: format!("{:#}", e),
                    data: Some(json!({ "kind": kind })),
                }
            }
        }
    }
}

/// JSON-RPC server over one workflow connection
pub struct McpServer {
    workflow: SongWorkflow,
    name: String,
}

impl McpServer {
    pub fn new(paths: &SongflowPaths, config: &Config) -> Result<Self> {
        let workflow = SongWorkflow::open(paths, config)?;
        Ok(Self::with_workflow(workflow, &config.server.name))
    }

    pub fn with_workflow(workflow: SongWorkflow, name: &str) -> Self {
        Self {
            workflow,
            name: name.to_string(),
        }
    }

    /// Run the server until stdin closes
    pub async fn run(&mut self) -> Result<()> {
        info!(
            server = %self.name,
            tools = tools::TOOLS.len(),
            "JSON-RPC server listening on stdio"
        );

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_request(&line).await;
            let response_json = serde_json::to_string(&response)?;
            writeln!(stdout, "{}", response_json)?;
            stdout.flush()?;
        }

        info!("stdin closed, server stopping");
        Ok(())
    }

    /// Handle a single JSON-RPC request line
    async fn handle_request(&mut self, request_str: &str) -> JsonRpcResponse {
        let request: JsonRpcRequest = match serde_json::from_str(request_str) {
            Ok(req) => req,
            Err(e) => {
                return JsonRpcResponse::failure(
                    None,
                    JsonRpcError {
                        code: PARSE_ERROR,
                        message: format!("Parse error: {}", e),
                        data: None,
                    },
                );
            }
        };

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::failure(
                request.id,
                JsonRpcError {
                    code: INVALID_REQUEST,
                    message: "Invalid Request: jsonrpc must be '2.0'".to_string(),
                    data: None,
                },
            );
        }

        debug!(method = %request.method, "request");
        let result = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "tools/list" => Ok(tools::tool_list()),
            "tools/call" => self.handle_tool_call(request.params).await,
            _ => Err(CallError::MethodNotFound(request.method.clone())),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(err) => {
                if let CallError::Tool(e) = &err {
                    warn!(method = %request.method, error = %format!("{:#}", e), "call failed");
                }
                JsonRpcResponse::failure(request.id, err.into())
            }
        }
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": self.name,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        })
    }

    async fn handle_tool_call(&mut self, params: Option<Value>) -> Result<Value, CallError> {
        let params = params.ok_or_else(|| CallError::InvalidParams("Missing params".to_string()))?;
        let tool_name = params["name"]
            .as_str()
            .ok_or_else(|| CallError::InvalidParams("Missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let actor_id = arguments["actor"].as_str().ok_or_else(|| {
            CallError::InvalidParams("Missing 'actor' argument".to_string())
        })?;
        let actor = self
            .workflow
            .resolve_actor(actor_id)
            .map_err(|e| CallError::Tool(e.into()))?;

        let result = tools::call(&self.workflow, &actor, tool_name, &arguments)
            .map_err(CallError::Tool)?;
        result.ok_or_else(|| CallError::Tool(anyhow!("Unknown tool: {}", tool_name)))
    }
}
