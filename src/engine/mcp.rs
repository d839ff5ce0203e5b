//! Minimal synchronous MCP client using JSON-RPC over stdio.
//!
//! Messages are newline-delimited JSON objects. Only the client side of
//! `initialize` and `tools/call` is implemented.

use crate::error::{Result, SerenaError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use tracing::{debug, instrument, warn};

/// MCP protocol version
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Client information
const CLIENT_NAME: &str = "serena-cli";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC request or notification sent by the client
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// Any message the server writes: a response, a notification or a request
#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Result payload of `tools/call`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

/// One content block of a tool result
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ToolResult {
    /// Concatenated text blocks, one per line
    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|c| match c {
            Content::Text { text } => Some(text.as_str()),
            Content::Other => None,
        })
    }

    /// Decode the JSON carried in text blocks into individual records.
    ///
    /// Arrays are flattened, objects kept as-is. Serena reports some
    /// failures ("answer too long", "no active project") as plain text on
    /// a successful result: when no block decodes to records, that text is
    /// returned as an engine error. Otherwise it is logged and skipped.
    pub fn records(&self) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut messages = Vec::new();

        for text in self.texts() {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => records.extend(items),
                Ok(obj @ Value::Object(_)) => records.push(obj),
                Ok(Value::String(message)) => messages.push(message),
                Ok(other) => messages.push(other.to_string()),
                Err(_) => messages.push(text.trim().to_string()),
            }
        }

        let messages: Vec<String> = messages.into_iter().filter(|m| !m.is_empty()).collect();
        if records.is_empty() && !messages.is_empty() {
            return Err(SerenaError::engine(messages.join("\n")));
        }
        for message in &messages {
            warn!("Ignoring non-record response: {}", message);
        }
        Ok(records)
    }
}

/// A client session over a pair of byte streams
pub struct McpSession<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
}

impl<R: BufRead, W: Write> McpSession<R, W> {
    /// Wrap the server's output (`reader`) and input (`writer`)
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
        }
    }

    /// Perform the `initialize` handshake
    #[instrument(skip(self))]
    pub fn initialize(&mut self) -> Result<Value> {
        let server_info = self.request(
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": CLIENT_NAME,
                    "version": CLIENT_VERSION
                }
            }),
        )?;
        debug!("Server initialized: {}", server_info);

        self.notify("notifications/initialized", None)?;
        Ok(server_info)
    }

    /// Invoke a tool and return its raw result
    #[instrument(skip(self, arguments))]
    pub fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult> {
        let result = self.request(
            "tools/call",
            json!({
                "name": name,
                "arguments": arguments
            }),
        )?;

        serde_json::from_value(result)
            .map_err(|e| SerenaError::protocol_with_source("malformed tools/call result", e))
    }

    /// Send a request and block until its response arrives
    fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params: Some(params),
        })?;

        loop {
            let message = self.receive()?;

            if let Some(server_method) = message.method {
                // Server-initiated traffic: answer requests, drop notifications
                match message.id {
                    Some(server_id) => self.answer_server_request(server_id, &server_method)?,
                    None => debug!("Notification from server: {}", server_method),
                }
                continue;
            }

            if message.id != Some(Value::from(id)) {
                debug!("Skipping response for id {:?}", message.id);
                continue;
            }

            if let Some(error) = message.error {
                debug!("JSON-RPC error code {}", error.code);
                return Err(SerenaError::engine(error.message));
            }

            return Ok(message.result.unwrap_or(Value::Null));
        }
    }

    fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params,
        })
    }

    fn answer_server_request(&mut self, id: Value, method: &str) -> Result<()> {
        let response = if method == "ping" {
            json!({ "jsonrpc": "2.0", "id": id, "result": {} })
        } else {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {method}") }
            })
        };
        self.send(&response)
    }

    fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let line = serde_json::to_string(message)
            .map_err(|e| SerenaError::protocol_with_source("cannot encode request", e))?;
        debug!("-> {}", line);

        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| SerenaError::protocol_with_source("cannot write to engine", e))
    }

    fn receive(&mut self) -> Result<JsonRpcMessage> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| SerenaError::protocol_with_source("cannot read from engine", e))?;
            if read == 0 {
                return Err(SerenaError::protocol("engine closed the connection"));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!("<- {}", trimmed);

            match serde_json::from_str(trimmed) {
                Ok(message) => return Ok(message),
                Err(e) => debug!("Skipping non-JSON-RPC line ({}): {}", e, trimmed),
            }
        }
    }
}
