//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # WebSocket server
//! [workflows]              # workflow catalog and start-up workflow
//! [backend]                # backend selection
//! [logging]                # log output
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default port for the WebSocket server.
pub const DEFAULT_PORT: u16 = 8765;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default length above which published messages are truncated in debug logs.
pub const DEFAULT_MAX_LOGGED_MESSAGE_LEN: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumyConfig {
    pub server: Option<ServerConfig>,
    pub workflows: Option<WorkflowsConfig>,
    pub backend: Option<BackendConfig>,
    pub logging: Option<LoggingConfig>,
}

impl LumyConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, except `workflows.dirs` which accumulate
    /// across layers.
    pub fn merge(&mut self, other: LumyConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if let Some(next) = other.workflows {
            match self.workflows.as_mut() {
                Some(current) => {
                    let mut dirs = std::mem::take(&mut current.dirs);
                    for dir in &next.dirs {
                        if !dirs.contains(dir) {
                            dirs.push(dir.clone());
                        }
                    }
                    *current = WorkflowsConfig { dirs, ..next };
                }
                None => self.workflows = Some(next),
            }
        }

        if other.backend.is_some() {
            self.backend = other.backend;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective server section.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Effective workflows section.
    pub fn workflows(&self) -> WorkflowsConfig {
        self.workflows.clone().unwrap_or_default()
    }

    /// Effective backend section.
    pub fn backend(&self) -> BackendConfig {
        self.backend.clone().unwrap_or_default()
    }

    /// Effective logging section.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable HTTP request tracing.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Resolve `bind:port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.bind".to_string(),
                message: e.to_string(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflows Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Workflow catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// Directory of workflows shipped with the installation, listed first.
    pub bundled: Option<PathBuf>,
    /// Additional workflow directories, listed after the bundled ones.
    pub dirs: Vec<PathBuf>,
    /// Workflow file loaded at start-up.
    pub default: Option<PathBuf>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which backend implementation serves the protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process processing engine.
    #[default]
    Local,
    /// Page-level value store without an engine.
    Mock,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(BackendKind::Local),
            "mock" => Ok(BackendKind::Mock),
            other => Err(ConfigError::InvalidValue {
                field: "backend.kind".to_string(),
                message: format!("unknown backend '{other}' (expected 'local' or 'mock')"),
            }),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Run processing after every accepted input update.
    pub auto_process: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Local,
            auto_process: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Published messages longer than this are truncated in debug logs.
    pub max_message_len: usize,
    /// Write a rolling JSON log file under the config directory.
    pub file: bool,
    /// Override the log directory.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_LOGGED_MESSAGE_LEN,
            file: true,
            dir: None,
        }
    }
}
