//! Client role: numbered requests over a [`Transport`], one in flight.
//!
//! Every call writes one request and then waits for the next line, so the
//! response correlates only while a single request is outstanding. The
//! `in_flight` guard enforces that even when the client is shared between
//! tasks. Serving concurrent callers on one session would need a pending
//! map keyed by request id and a dedicated reader task that demultiplexes
//! responses.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, RequestId, Tool,
};
use crate::transport::{ServerConfig, Transport};

/// Tunables for a [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Per-request deadline. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Handle to one server session.
pub struct Client {
    transport: Transport,
    last_id: AtomicI64,
    in_flight: Mutex<()>,
    options: ClientOptions,
}

impl Client {
    /// Launch a server and connect to it.
    pub async fn spawn(config: ServerConfig) -> Result<Self> {
        Self::spawn_with(config, ClientOptions::default()).await
    }

    /// Launch a server with explicit client options.
    pub async fn spawn_with(config: ServerConfig, options: ClientOptions) -> Result<Self> {
        let transport = Transport::start(config).await?;
        Ok(Self::new(transport, options))
    }

    /// Wrap an already started transport.
    pub fn new(transport: Transport, options: ClientOptions) -> Self {
        Self {
            transport,
            last_id: AtomicI64::new(0),
            in_flight: Mutex::new(()),
            options,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        self.transport.name()
    }

    /// The id of the most recent request, 0 before the first one.
    pub fn last_request_id(&self) -> i64 {
        self.last_id.load(Ordering::SeqCst)
    }

    /// Perform the `initialize` handshake.
    ///
    /// Must succeed before the other operations are meaningful.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self.request(METHOD_INITIALIZE, Map::new()).await?;
        tracing::info!(
            server = %self.name(),
            protocol_version = %result.protocol_version,
            "initialized"
        );
        Ok(result)
    }

    /// Query the server's tools, in the order the server lists them.
    ///
    /// Nothing is cached here; every call re-queries the server.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result: ListToolsResult = self.request(METHOD_TOOLS_LIST, Map::new()).await?;
        Ok(result.tools)
    }

    /// Call a tool by name and return its result verbatim.
    pub async fn call_tool(&self, name: &str, input: Map<String, Value>) -> Result<Value> {
        let params = CallToolParams {
            name: name.to_string(),
            input,
        };
        self.request(METHOD_TOOLS_CALL, params).await
    }

    /// Terminate the server process.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }

    /// Send one request and wait for its response.
    ///
    /// Params that fail to serialize are rejected before an id is taken.
    /// Any error that leaves the pipe pair out of step closes the session,
    /// so later calls fail at once instead of reading stale responses.
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let mut request = JsonRpcRequest::new(0i64, method)
            .with_params(params)
            .map_err(Error::Serialize)?;

        let _guard = self.in_flight.lock().await;
        request.id = self.next_request_id();

        let response = match self.round_trip(&request).await {
            Ok(response) => response,
            Err(e) if e.is_session_terminal() => return Err(self.end_session(e).await),
            Err(e) => return Err(e),
        };

        let id = &request.id;
        let value = response.into_result().inspect_err(|e| {
            tracing::debug!(server = %self.name(), %id, method, error = %e, "remote error");
        })?;

        serde_json::from_value(value)
            .map_err(|e| Error::UnexpectedResult(format!("{method}: {e}")))
    }

    /// Write `request` and read the response that answers it.
    async fn round_trip(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = &request.id;
        let method = request.method.as_str();
        tracing::debug!(server = %self.name(), %id, method, "sending request");
        self.transport.send(request).await?;

        let response: JsonRpcResponse = match self.options.timeout {
            Some(limit) => timeout(limit, self.transport.receive())
                .await
                .map_err(|_| Error::Timeout)??,
            None => self.transport.receive().await?,
        };

        match &response.id {
            Some(got) if got != id => Err(Error::InvalidResponse(format!(
                "response ID mismatch: expected {id}, got {got}"
            ))),
            // A null-id error belongs to the only outstanding request.
            None if response.error.is_none() => Err(Error::InvalidResponse(format!(
                "response to {method} has no ID"
            ))),
            _ => Ok(response),
        }
    }

    async fn end_session(&self, error: Error) -> Error {
        if !self.transport.is_closed() {
            tracing::warn!(server = %self.name(), %error, "session out of step, closing");
        }
        if let Err(close_err) = self.transport.close().await {
            tracing::warn!(server = %self.name(), error = %close_err, "failed to close session");
        }
        error
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
