//! End-to-end tests against a spawned `toolpipe serve`.

use std::process::Stdio;

use chrono::NaiveDateTime;
use mcp::{Client, Error, ServerConfig};
use runtime::{McpToolHost, ToolCall, ToolError, ToolHost, ToolResult, execute_all};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const BIN: &str = env!("CARGO_BIN_EXE_toolpipe");

fn server_config() -> ServerConfig {
    ServerConfig::new("toolpipe", BIN).arg("serve")
}

/// Raw line-level access to a server, for exact wire assertions.
struct RawServer {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl RawServer {
    fn spawn() -> Self {
        let mut child = Command::new(BIN)
            .arg("serve")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().unwrap()).lines();
        Self {
            child,
            stdin,
            stdout,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().unwrap();
        stdin.write_all(line.as_bytes()).await.unwrap();
        stdin.write_all(b"\n").await.unwrap();
        stdin.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = self.stdout.next_line().await.unwrap().expect("server closed stdout");
        serde_json::from_str(&line).unwrap()
    }

    async fn round_trip(&mut self, line: &str) -> Value {
        self.send_raw(line).await;
        self.recv().await
    }

    /// Close stdin and collect every remaining response line.
    async fn finish(mut self) -> Vec<Value> {
        drop(self.stdin.take());
        let mut rest = Vec::new();
        while let Some(line) = self.stdout.next_line().await.unwrap() {
            rest.push(serde_json::from_str(&line).unwrap());
        }
        let status = self.child.wait().await.unwrap();
        assert!(status.success());
        rest
    }
}

fn assert_time_format(value: &Value) {
    let text = value.as_str().expect("expected a string result");
    assert_eq!(text.len(), 19, "unexpected timestamp {text:?}");
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap();
}

#[tokio::test]
async fn initialize_scenario() {
    let mut server = RawServer::spawn();
    let response = server
        .round_trip(r#"{"id":1,"method":"initialize","params":{}}"#)
        .await;
    assert_eq!(
        response,
        json!({"id": 1, "result": {"protocolVersion": "2025-03-26", "capabilities": {}}})
    );
    assert!(server.finish().await.is_empty());
}

#[tokio::test]
async fn tools_list_scenario() {
    let mut server = RawServer::spawn();
    let response = server.round_trip(r#"{"id":2,"method":"tools/list"}"#).await;

    assert_eq!(response["id"], 2);
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "get_current_time");
    assert_eq!(tools[0]["description"], "Get the current date and time");
    assert_eq!(tools[0]["input_schema"]["type"], "object");
}

#[tokio::test]
async fn tools_call_scenario() {
    let mut server = RawServer::spawn();
    let response = server
        .round_trip(r#"{"id":3,"method":"tools/call","params":{"name":"get_current_time","input":{}}}"#)
        .await;

    assert_eq!(response["id"], 3);
    assert!(response.get("error").is_none());
    assert_time_format(&response["result"]);
}

#[tokio::test]
async fn unknown_tool_scenario() {
    let mut server = RawServer::spawn();
    let response = server
        .round_trip(r#"{"id":4,"method":"tools/call","params":{"name":"bogus","input":{}}}"#)
        .await;
    assert_eq!(
        response,
        json!({"id": 4, "error": {"code": -32601, "message": "Method not found"}})
    );
}

#[tokio::test]
async fn malformed_line_gets_no_response() {
    let mut server = RawServer::spawn();
    server.send_raw("{this is not json").await;
    server.send_raw(r#"{"id":9,"method":"initialize","params":{}}"#).await;

    let responses = server.finish().await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 9);
}

#[tokio::test]
async fn non_utf8_and_bad_tool_name_keep_the_server_alive() {
    let mut server = RawServer::spawn();
    {
        let stdin = server.stdin.as_mut().unwrap();
        stdin.write_all(b"\xff\xfe\x00 not text\n").await.unwrap();
        stdin.flush().await.unwrap();
    }
    let response = server
        .round_trip(r#"{"id":5,"method":"tools/call","params":{"name":42,"input":{}}}"#)
        .await;
    assert_eq!(
        response,
        json!({"id": 5, "error": {"code": -32601, "message": "Method not found"}})
    );

    server.send_raw(r#"{"id":6,"method":"initialize"}"#).await;
    let rest = server.finish().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["id"], 6);
}

#[tokio::test]
async fn client_session_round_trip() {
    let client = Client::spawn(server_config()).await.unwrap();

    let init = client.initialize().await.unwrap();
    assert_eq!(init.protocol_version, "2025-03-26");
    assert!(init.capabilities.is_empty());
    assert_eq!(client.last_request_id(), 1);

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_current_time");
    assert_eq!(client.last_request_id(), 2);

    let now = client.call_tool("get_current_time", Map::new()).await.unwrap();
    assert_time_format(&now);
    assert_eq!(client.last_request_id(), 3);

    let err = client.call_tool("bogus", Map::new()).await.unwrap_err();
    assert_eq!(err.remote_code(), Some(-32601));
    assert_eq!(client.last_request_id(), 4);

    // The session survives a remote error.
    let again = client.call_tool("get_current_time", Map::new()).await.unwrap();
    assert_time_format(&again);

    client.close().await.unwrap();
    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, Error::Write(_)));
}

#[tokio::test]
async fn independent_sessions_number_independently() {
    let first = Client::spawn(server_config()).await.unwrap();
    let second = Client::spawn(server_config()).await.unwrap();

    first.initialize().await.unwrap();
    first.list_tools().await.unwrap();
    second.initialize().await.unwrap();

    assert_eq!(first.last_request_id(), 2);
    assert_eq!(second.last_request_id(), 1);

    first.close().await.unwrap();
    second.close().await.unwrap();
}

#[tokio::test]
async fn tool_host_keeps_partial_failures_separate() {
    let host = McpToolHost::spawn(server_config(), Default::default())
        .await
        .unwrap();
    assert_eq!(host.specs().len(), 1);

    let calls = [
        ToolCall {
            id: "toolu_a".to_string(),
            name: "get_current_time".to_string(),
            input: json!({}),
        },
        ToolCall {
            id: "toolu_b".to_string(),
            name: "bogus".to_string(),
            input: json!({}),
        },
        ToolCall {
            id: "toolu_c".to_string(),
            name: "get_current_time".to_string(),
            input: Value::Null,
        },
    ];

    let results = execute_all(&host, &calls).await;
    assert_eq!(results.len(), 3);

    match &results[0] {
        ToolResult::Success { tool_call_id, output } => {
            assert_eq!(tool_call_id, "toolu_a");
            assert_time_format(output);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(
        results[1],
        ToolResult::Failure {
            tool_call_id: "toolu_b".to_string(),
            error: ToolError::NotFound("bogus".to_string()),
        }
    );
    assert!(results[2].is_success());

    host.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_server_binary_is_launch_error() {
    let config = ServerConfig::new("missing", "/nonexistent/toolpipe");
    let err = Client::spawn(config).await.err().unwrap();
    assert!(matches!(err, Error::Launch(_)));
}

#[test]
fn call_command_prints_time() {
    let output = std::process::Command::new(BIN)
        .args(["call", "get_current_time"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_time_format(&Value::String(stdout.trim().to_string()));
}

#[test]
fn call_command_fails_for_unknown_tool() {
    let output = std::process::Command::new(BIN)
        .args(["call", "bogus"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Method not found"));
}

#[test]
fn tools_command_lists_clock() {
    let output = std::process::Command::new(BIN).arg("tools").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("get_current_time"));
}
