//! Configuration loading from toolpipe.toml.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mcp::{ClientOptions, ServerConfig};
use serde::Deserialize;

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "toolpipe.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Server process to launch for client commands.
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub log: LogSection,
}

/// Server launch configuration.
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Program to run. Defaults to this executable with `serve`.
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            command: None,
            args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientSection {
    /// Per-request deadline in seconds. Unset waits indefinitely.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogSection {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: Option<String>,
}

fn default_server_name() -> String {
    "toolpipe".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `explicit` if given, else `toolpipe.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Build the launch configuration for the server process.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let (command, args) = match &self.server.command {
            Some(command) => (command.clone(), self.server.args.clone()),
            None => {
                let exe = std::env::current_exe().map_err(ConfigError::CurrentExe)?;
                (exe.display().to_string(), vec!["serve".to_string()])
            }
        };

        Ok(ServerConfig {
            name: self.server.name.clone(),
            command,
            args,
            env: self.server.env.clone(),
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.client.timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("cannot locate the toolpipe executable: {0}")]
    CurrentExe(std::io::Error),
}
