//! Configuration for the Tether core process.
//!
//! Read from `~/.tether/config.toml`. Every section is optional; a missing
//! file is not an error.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:3000";

/// `true` switches the core to TCP and waits for one connection.
pub const DEVELOPMENT_ENV: &str = "TETHER_DEVELOPMENT";
pub const TCP_ADDR_ENV: &str = "TETHER_TCP_ADDR";

pub const PROMPT_LOG_FILE_NAME: &str = "prompts.log";

#[derive(Debug, Default, Deserialize)]
pub struct TetherConfig {
    pub transport: Option<TransportConfig>,
    pub autocomplete: Option<AutocompleteConfig>,
    pub generator: Option<GeneratorConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Frames over stdin/stdout to the parent process.
    #[default]
    Ipc,
    /// Listen on a TCP socket and wait for one peer.
    Tcp,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransportConfig {
    pub mode: Option<TransportMode>,
    pub tcp_addr: Option<String>,
    pub max_frame_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteConfig {
    #[serde(default)]
    pub stop_tokens: Vec<String>,
    #[serde(default)]
    pub multiline: bool,
}

/// External command that produces completions on stdout.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl GeneratorConfig {
    /// `args` with `${VAR}` references expanded.
    #[must_use]
    pub fn expanded_args(&self) -> Vec<String> {
        self.args.iter().map(|arg| expand_env_vars(arg)).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"info,tether_bus=debug"`.
    pub filter: Option<String>,
    /// Append every generator prompt to [`prompt_log_path`].
    #[serde(default)]
    pub prompts: bool,
}

/// Transport choice after environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub mode: TransportMode,
    pub tcp_addr: String,
    pub max_frame_bytes: Option<usize>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl TetherConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn transport_settings(&self) -> TransportSettings {
        self.transport_settings_with(|key| env::var(key).ok())
    }

    fn transport_settings_with(&self, var: impl Fn(&str) -> Option<String>) -> TransportSettings {
        let section = self.transport.as_ref();
        let development = var(DEVELOPMENT_ENV).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let mode = if development {
            TransportMode::Tcp
        } else {
            section.and_then(|t| t.mode).unwrap_or_default()
        };
        let tcp_addr = var(TCP_ADDR_ENV)
            .or_else(|| section.and_then(|t| t.tcp_addr.clone()))
            .unwrap_or_else(|| DEFAULT_TCP_ADDR.to_string());

        TransportSettings {
            mode,
            tcp_addr,
            max_frame_bytes: section.and_then(|t| t.max_frame_bytes),
        }
    }

    #[must_use]
    pub fn stop_tokens(&self) -> &[String] {
        self.autocomplete
            .as_ref()
            .map(|a| a.stop_tokens.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn multiline(&self) -> bool {
        self.autocomplete.as_ref().is_some_and(|a| a.multiline)
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref().and_then(|l| l.filter.as_deref())
    }

    #[must_use]
    pub fn log_prompts(&self) -> bool {
        self.log.as_ref().is_some_and(|l| l.prompts)
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tether").join("config.toml"))
}

/// `~/.tether/logs`, or `./.tether/logs` when there is no home directory.
#[must_use]
pub fn log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tether")
        .join("logs")
}

#[must_use]
pub fn prompt_log_path() -> PathBuf {
    log_dir().join(PROMPT_LOG_FILE_NAME)
}
