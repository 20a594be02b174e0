//! Configuration system for the `Taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeId, OwnerId};
use url::Url;

use crate::net::BoardConfig;
use crate::view::ViewOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A URL setting is not a valid URL for its role.
    #[error("invalid {field}: {reason}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A setting required to connect was not given anywhere.
    #[error("missing required setting: {0}")]
    MissingField(&'static str),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    view: ViewFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    api_url: Option<String>,
    push_url: Option<String>,
    owner_id: Option<u64>,
    employee_id: Option<u64>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
    max_frame_size: Option<usize>,
    reconnect_attempts: Option<u32>,
    reconnect_delay_ms: Option<u64>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    query: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Server --
    /// Base URL of the task service REST API.
    pub api_url: Option<String>,
    /// WebSocket URL of the push hub. Derived from `api_url` when unset.
    pub push_url: Option<String>,
    /// Admin whose team board to show.
    pub owner_id: Option<u64>,
    /// Employee whose own board to show. Takes precedence over `owner_id`.
    pub employee_id: Option<u64>,
    /// Per-request REST timeout.
    pub request_timeout: Duration,
    /// Timeout for opening the push connection.
    pub connect_timeout: Duration,
    /// Capacity of the event, command, and update channels.
    pub channel_capacity: usize,
    /// Largest accepted push frame (bytes).
    pub max_frame_size: usize,
    /// Resubscribe attempts after the push channel drops.
    pub reconnect_attempts: u32,
    /// Pause before each resubscribe attempt.
    pub reconnect_delay: Duration,

    // -- View --
    /// Initial search query.
    pub query: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let view = ViewOptions::default();
        Self {
            api_url: None,
            push_url: None,
            owner_id: None,
            employee_id: None,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            max_frame_size: 64 * 1024,
            reconnect_attempts: view.reconnect_attempts,
            reconnect_delay: view.reconnect_delay,
            query: String::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// Otherwise the default path (`~/.config/taskboard/config.toml`) is
    /// tried and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            api_url: cli
                .api_url
                .clone()
                .or_else(|| file.server.api_url.clone()),
            push_url: cli
                .push_url
                .clone()
                .or_else(|| file.server.push_url.clone()),
            owner_id: cli.owner.or(file.server.owner_id),
            employee_id: cli.employee.or(file.server.employee_id),
            request_timeout: file
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .server
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            max_frame_size: file
                .server
                .max_frame_size
                .unwrap_or(defaults.max_frame_size),
            reconnect_attempts: file
                .server
                .reconnect_attempts
                .unwrap_or(defaults.reconnect_attempts),
            reconnect_delay: file
                .server
                .reconnect_delay_ms
                .map_or(defaults.reconnect_delay, Duration::from_millis),
            query: cli
                .query
                .clone()
                .or_else(|| file.view.query.clone())
                .unwrap_or(defaults.query),
        }
    }

    /// The board scope: an employee's own board if `employee_id` is set,
    /// otherwise the admin's team board.
    #[must_use]
    pub fn scope(&self) -> Option<Topic> {
        self.employee_id
            .map(|id| Topic::Employee(EmployeeId::new(id)))
            .or_else(|| self.owner_id.map(|id| Topic::Owner(OwnerId::new(id))))
    }

    /// Reconnect tunables for the board view.
    #[must_use]
    pub const fn to_view_options(&self) -> ViewOptions {
        ViewOptions {
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: self.reconnect_delay,
        }
    }

    /// Build a [`BoardConfig`] with validated URLs.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingField`] if the API URL or the scope is unset.
    /// - [`ConfigError::InvalidUrl`] if a URL does not parse or has the
    ///   wrong scheme.
    pub fn to_board_config(&self) -> Result<BoardConfig, ConfigError> {
        let api_raw = self
            .api_url
            .as_deref()
            .ok_or(ConfigError::MissingField("api_url"))?;
        let api_url = parse_url("api_url", api_raw, &["http", "https"])?;
        let push_url = match self.push_url.as_deref() {
            Some(raw) => parse_url("push_url", raw, &["ws", "wss"])?,
            None => derive_push_url(&api_url)?,
        };
        let scope = self
            .scope()
            .ok_or(ConfigError::MissingField("owner_id or employee_id"))?;

        Ok(BoardConfig {
            api_url,
            push_url,
            scope,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            channel_capacity: self.channel_capacity,
            max_frame_size: self.max_frame_size,
            view: self.to_view_options(),
            query: self.query.clone(),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal task board for teams")]
pub struct CliArgs {
    /// Base URL of the task service (e.g. `http://127.0.0.1:9400`).
    #[arg(long, env = "TASKBOARD_API_URL")]
    pub api_url: Option<String>,

    /// WebSocket URL of the push hub (default: `<api_url>/ws`).
    #[arg(long, env = "TASKBOARD_PUSH_URL")]
    pub push_url: Option<String>,

    /// Admin id: show the whole team's board.
    #[arg(long, env = "TASKBOARD_OWNER")]
    pub owner: Option<u64>,

    /// Employee id: show only this employee's board.
    #[arg(long, env = "TASKBOARD_EMPLOYEE")]
    pub employee: Option<u64>,

    /// Initial search query.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_url(field: &'static str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(url)
}

/// `http://host:port/...` becomes `ws://host:port/ws`.
fn derive_push_url(api_url: &Url) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field: "push_url",
        reason,
    };
    let mut push = api_url.join("/ws").map_err(|e| invalid(e.to_string()))?;
    let scheme = if api_url.scheme() == "https" { "wss" } else { "ws" };
    push.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot derive {scheme} URL from {api_url}")))?;
    Ok(push)
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
