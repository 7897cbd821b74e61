mod config;
mod error;
mod tools;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mcp::{Client, Server};
use runtime::{McpToolHost, ToolCall, ToolHost, execute_all};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::Config;
use error::{Error, Result};

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "toolpipe")]
#[command(about = "Tool server and client speaking line-delimited JSON-RPC over pipes", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./toolpipe.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the built-in tools on stdin/stdout
    Serve,
    /// Launch the configured server and list its tools
    Tools,
    /// Launch the configured server and call one tool
    Call {
        /// Tool name
        name: String,
        /// Tool input as a JSON object
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Interactive loop: each line is `<tool> [json input]`
    Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::discover(cli.config.as_deref())?;
    init_tracing(config.log.filter.as_deref());

    match cli.command {
        Commands::Serve => cmd_serve().await,
        Commands::Tools => cmd_tools(&config).await,
        Commands::Call { name, input } => cmd_call(&config, &name, input.as_deref()).await,
        Commands::Shell => cmd_shell(&config).await,
    }
}

/// Logs go to stderr: stdout carries the protocol in `serve`.
fn init_tracing(filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_LOG_FILTER)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn cmd_serve() -> Result<()> {
    let server = Server::new(tools::registry()?);
    server.serve_stdio().await?;
    Ok(())
}

async fn cmd_tools(config: &Config) -> Result<()> {
    let client = Client::spawn_with(config.server_config()?, config.client_options()).await?;

    let outcome: mcp::Result<_> = async {
        client.initialize().await?;
        client.list_tools().await
    }
    .await;
    client.close().await?;

    let tools = outcome?;
    if tools.is_empty() {
        println!("No tools available.");
        return Ok(());
    }

    for tool in tools {
        println!("{:<24}  {}", tool.name, tool.description);
    }
    Ok(())
}

async fn cmd_call(config: &Config, name: &str, input: Option<&str>) -> Result<()> {
    let input = parse_input(input)?;
    let client = Client::spawn_with(config.server_config()?, config.client_options()).await?;

    let outcome: mcp::Result<_> = async {
        client.initialize().await?;
        client.call_tool(name, input).await
    }
    .await;
    client.close().await?;

    println!("{}", render(&outcome?));
    Ok(())
}

async fn cmd_shell(config: &Config) -> Result<()> {
    let host = McpToolHost::spawn(config.server_config()?, config.client_options()).await?;

    let names: Vec<&str> = host.specs().iter().map(|s| s.name.as_str()).collect();
    println!("Available tools: {names:?}");
    println!("Type '<tool> [json input]', or 'exit' to quit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let call = match parse_call_line(line) {
            Ok(call) => call,
            Err(e) => {
                eprintln!("Error: {e}\n");
                continue;
            }
        };

        for result in execute_all(&host, &[call]).await {
            let block = result.to_content_block();
            println!("{}\n", serde_json::to_string_pretty(&block).unwrap_or_default());
        }
    }

    host.shutdown().await?;
    Ok(())
}

/// Parse `<tool> [json input]` into a call with a fresh id.
fn parse_call_line(line: &str) -> Result<ToolCall> {
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest)),
        None => (line, None),
    };

    Ok(ToolCall {
        id: format!("toolu_{}", Uuid::new_v4().simple()),
        name: name.to_string(),
        input: Value::Object(parse_input(rest)?),
    })
}

fn parse_input(text: Option<&str>) -> Result<Map<String, Value>> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::InvalidInput(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(Error::InvalidInput(e.to_string())),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_line_without_input() {
        let call = parse_call_line("get_current_time").unwrap();
        assert_eq!(call.name, "get_current_time");
        assert_eq!(call.input, json!({}));
        assert!(call.id.starts_with("toolu_"));
    }

    #[test]
    fn call_line_with_input() {
        let call = parse_call_line(r#"echo {"text": "hi there"}"#).unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(call.input, json!({"text": "hi there"}));
    }

    #[test]
    fn call_ids_are_unique() {
        let a = parse_call_line("t").unwrap();
        let b = parse_call_line("t").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(matches!(parse_input(Some("[1]")), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_input(Some("{oops")), Err(Error::InvalidInput(_))));
        assert!(parse_input(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn render_strings_raw() {
        assert_eq!(render(&json!("2025-03-26 12:00:00")), "2025-03-26 12:00:00");
        assert_eq!(render(&json!({"a": 1})), "{\n  \"a\": 1\n}");
    }
}
