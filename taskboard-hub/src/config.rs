//! Configuration for the `Taskboard` hub.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard-hub/config.toml`)
//! 4. Compiled defaults
//!
//! The file may also list `[[employees]]` to preload at startup.

use std::path::PathBuf;

use taskboard_proto::employee::EmployeeDraft;

/// Errors that can occur when loading hub configuration.
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
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct HubConfigFile {
    server: ServerFileConfig,
    employees: Vec<EmployeeDraft>,
}

/// `[server]` section of the hub config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_frame_size: Option<usize>,
    single_session: Option<bool>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the hub.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskboard task service and push hub")]
pub struct HubCliArgs {
    /// Address to bind the hub to.
    #[arg(short, long, env = "HUB_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskboard-hub/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum accepted push-channel frame in bytes.
    #[arg(long)]
    pub max_frame_size: Option<usize>,

    /// Allow only one live connection per owner board.
    #[arg(long)]
    pub single_session: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "HUB_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:9400`).
    pub bind_addr: String,
    /// Maximum accepted push-channel frame in bytes.
    pub max_frame_size: usize,
    /// Whether a new owner connection displaces older ones.
    pub single_session: bool,
    /// Employees created at startup.
    pub employees: Vec<EmployeeDraft>,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9400".to_string(),
            max_frame_size: 64 * 1024,
            single_session: false,
            employees: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl HubConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &HubCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &HubCliArgs, file: HubConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            max_frame_size: cli
                .max_frame_size
                .or(file.server.max_frame_size)
                .unwrap_or(defaults.max_frame_size),
            single_session: cli.single_session
                || file.server.single_session.unwrap_or(defaults.single_session),
            employees: file.employees,
            log_level: cli.log_level.clone(),
        }
    }
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<HubConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(HubConfigFile::default());
        };
        config_dir.join("taskboard-hub").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HubConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
