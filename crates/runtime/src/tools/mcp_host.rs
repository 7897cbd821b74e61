//! MCP-backed tool host.

use super::{ToolCall, ToolError, ToolHost, ToolSpec};
use crate::Result;
use mcp::{Client, ClientOptions, ServerConfig};
use serde_json::{Map, Value};

/// Tool host backed by one MCP server session.
///
/// Tool specs are discovered once at spawn time; only those names are
/// accepted by `execute`.
pub struct McpToolHost {
    client: Client,
    specs: Vec<ToolSpec>,
}

impl McpToolHost {
    /// Spawn the server, initialize it, and cache its tool specs.
    pub async fn spawn(config: ServerConfig, options: ClientOptions) -> Result<Self> {
        let client = Client::spawn_with(config, options).await?;

        let specs = match discover(&client).await {
            Ok(specs) => specs,
            Err(e) => {
                if let Err(close_err) = client.close().await {
                    tracing::warn!(
                        server = %client.name(),
                        error = %close_err,
                        "failed to close server after discovery error"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            server = %client.name(),
            tools = specs.len(),
            "discovered tools"
        );
        Ok(Self { client, specs })
    }

    /// Shut down the server process.
    pub async fn shutdown(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

async fn discover(client: &Client) -> mcp::Result<Vec<ToolSpec>> {
    client.initialize().await?;
    let tools = client.list_tools().await?;
    Ok(tools.into_iter().map(ToolSpec::from).collect())
}

impl ToolHost for McpToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall) -> std::result::Result<Value, ToolError> {
        if self.spec(&call.name).is_none() {
            return Err(ToolError::NotFound(call.name.clone()));
        }

        let input = match &call.input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidInput(format!(
                    "expected an object, got {other}"
                )));
            }
        };

        Ok(self.client.call_tool(&call.name, input).await?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn discovery_failure_reports_the_discovery_error() {
        let config = ServerConfig::new("sh", "sh").arg("-c").arg("read line; exit 0");
        let err = McpToolHost::spawn(config, ClientOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Mcp(mcp::Error::EndOfStream)));
    }

    #[tokio::test]
    async fn remote_error_during_discovery_is_reported() {
        let config = ServerConfig::new("sh", "sh").arg("-c").arg(
            r#"read line; echo '{"error":{"code":-32601,"message":"Method not found"},"id":1}'; cat > /dev/null"#,
        );
        let err = McpToolHost::spawn(config, ClientOptions::default())
            .await
            .err()
            .unwrap();
        match err {
            Error::Mcp(e) => assert_eq!(e.remote_code(), Some(-32601)),
        }
    }
}
