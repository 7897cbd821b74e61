//! Server role: read a request line, dispatch it, write the response line.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::watch;

use crate::error::{Result, ToolError};
use crate::framing::{self, Frame, MAX_LINE_SIZE};
use crate::protocol::{
    InitializeResult, JsonRpcError, METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    ServerResponse,
};
use crate::registry::ToolRegistry;

/// Where the dispatch loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for the next request line.
    Listening,
    /// Computing the response to one request.
    Dispatching,
    /// Input closed; the loop has exited.
    Stopped,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Requests that produced a response.
    pub handled: u64,
    /// Lines discarded without a response: not JSON, not UTF-8, or over
    /// the line cap.
    pub dropped: u64,
}

/// Why a request could not produce a result.
///
/// `UnknownMethod` and `UnknownTool` both go out as `-32601`, which keeps
/// the wire compatible with existing clients.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Tool(#[from] ToolError),

    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    fn into_rpc_error(self) -> JsonRpcError {
        match self {
            DispatchError::UnknownMethod(_) | DispatchError::UnknownTool(_) => {
                JsonRpcError::method_not_found()
            }
            DispatchError::Tool(e) => JsonRpcError::internal_error(e),
            DispatchError::Internal(message) => JsonRpcError::internal_error(message),
        }
    }
}

/// A tool server bound to one registry.
///
/// The loop publishes its [`ServerState`] on a watch channel, so other
/// tasks can follow it while `run` is in progress.
pub struct Server {
    registry: ToolRegistry,
    state: watch::Sender<ServerState>,
}

impl Server {
    pub fn new(registry: ToolRegistry) -> Self {
        let (state, _) = watch::channel(ServerState::Listening);
        Self { registry, state }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Current state of the dispatch loop.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Follow state changes of the dispatch loop.
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serve requests on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<ServeStats> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Serve requests from `reader` until it reaches end of stream.
    ///
    /// Lines that are not valid JSON, not UTF-8, or longer than
    /// [`MAX_LINE_SIZE`] are dropped without a response. Only I/O failures
    /// end the loop with an error: a failed write means the client is gone.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<ServeStats>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut stats = ServeStats::default();
        tracing::info!(tools = self.registry.len(), "server listening");

        loop {
            self.state.send_replace(ServerState::Listening);
            let Some(frame) = framing::read_frame(&mut reader, MAX_LINE_SIZE).await? else {
                break;
            };

            self.state.send_replace(ServerState::Dispatching);
            match self.handle_frame(frame) {
                Some(response) => {
                    framing::write_message(&mut writer, &response).await?;
                    stats.handled += 1;
                }
                None => stats.dropped += 1,
            }
        }

        self.state.send_replace(ServerState::Stopped);
        tracing::info!(
            handled = stats.handled,
            dropped = stats.dropped,
            "input closed, server stopped"
        );
        Ok(stats)
    }

    fn handle_frame(&self, frame: Frame) -> Option<ServerResponse> {
        match frame {
            Frame::Line(bytes) => match String::from_utf8(bytes) {
                Ok(line) => self.handle_line(&line),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping request line that is not UTF-8");
                    None
                }
            },
            Frame::TooLarge { size } => {
                tracing::warn!(size, max = MAX_LINE_SIZE, "dropping oversized request line");
                None
            }
        }
    }

    /// Handle one raw request line.
    ///
    /// Returns `None` for input that is not JSON at all. The client gets no
    /// reply in that case and will keep waiting, so senders must only write
    /// complete messages.
    pub fn handle_line(&self, line: &str) -> Option<ServerResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(request)) => Some(self.handle_request(&request)),
            Ok(_) => Some(ServerResponse::failure(
                Value::Null,
                JsonRpcError::internal_error("request must be a JSON object"),
            )),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed request line");
                None
            }
        }
    }

    /// Dispatch a decoded request and build its response.
    pub fn handle_request(&self, request: &Map<String, Value>) -> ServerResponse {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = request
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        tracing::debug!(%id, method, "dispatching");
        match self.dispatch(method, params) {
            Ok(result) => ServerResponse::success(id, result),
            Err(e) => {
                tracing::debug!(%id, method, error = %e, "request failed");
                ServerResponse::failure(id, e.into_rpc_error())
            }
        }
    }

    fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, DispatchError> {
        match method {
            METHOD_INITIALIZE => to_value(InitializeResult::default()),
            METHOD_TOOLS_LIST => Ok(json!({ "tools": self.registry.descriptors() })),
            METHOD_TOOLS_CALL => self.call_tool(params),
            other => Err(DispatchError::UnknownMethod(other.to_string())),
        }
    }

    /// Run a registered tool.
    ///
    /// A name that is missing or not a string cannot match a registered
    /// tool, so it is reported like any other unknown tool. `input` may be
    /// absent or `null`; anything other than an object is rejected.
    fn call_tool(&self, params: Value) -> std::result::Result<Value, DispatchError> {
        let name = match params.get("name") {
            Some(Value::String(name)) => name.as_str(),
            other => {
                let shown = other.map(Value::to_string).unwrap_or_default();
                return Err(DispatchError::UnknownTool(shown));
            }
        };

        let handler = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let input = match params.get("input") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(input)) => input.clone(),
            Some(other) => {
                return Err(DispatchError::Internal(format!(
                    "tool input must be a JSON object, got {other}"
                )));
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler.call(input))) {
            Ok(result) => Ok(result?),
            Err(panic) => Err(DispatchError::Tool(ToolError::new(format!(
                "tool {name} panicked: {}",
                panic_message(panic.as_ref())
            )))),
        }
    }
}

fn to_value(value: impl serde::Serialize) -> std::result::Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::Internal(e.to_string()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
