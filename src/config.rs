//! Reconciler configuration (`agentsync.toml`) and the environment
//! variable names the client/credential chain reads (§6.6).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::model::{RECONCILER_ID, SUPPORTED_API_VERSION};

// ---------------------------------------------------------------------------
// Environment variables consumed (§6.6)
// ---------------------------------------------------------------------------

/// API key credential.
pub const ENV_API_KEY: &str = "AGENTSYNC_API_KEY";
/// Base URL of the remote platform tenant.
pub const ENV_API_URL: &str = "AGENTSYNC_API_URL";
/// Password for a self-hosted endpoint.
pub const ENV_SERVER_PASSWORD: &str = "AGENTSYNC_SERVER_PASSWORD";
/// Default model used when an agent manifest omits one.
pub const ENV_DEFAULT_MODEL: &str = "AGENTSYNC_DEFAULT_MODEL";
/// Credential-helper binary path.
pub const ENV_AUTH_HELPER: &str = "AGENTSYNC_AUTH_HELPER";
/// Space-separated args passed to the credential helper.
pub const ENV_AUTH_HELPER_ARGS: &str = "AGENTSYNC_AUTH_HELPER_ARGS";
/// `tracing_subscriber::EnvFilter` directive string.
pub const ENV_LOG_LEVEL: &str = "AGENTSYNC_LOG_LEVEL";
/// Non-empty to switch log output to newline-delimited JSON.
pub const ENV_LOG_JSON: &str = "AGENTSYNC_LOG_JSON";
/// Default project scope for role resolution.
pub const ENV_PROJECT: &str = "AGENTSYNC_PROJECT";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level reconciler configuration, parsed from `agentsync.toml`.
///
/// Missing fields use sensible defaults. A missing file is not an error —
/// [`AgentSyncConfig::load`] returns all defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSyncConfig {
    /// Client/request settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Default role/channel scoping for upgrade/batch runs.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl Default for AgentSyncConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Remote-client request settings (§5 Suspension points, §6.3).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Per-request timeout. Defaults to 30s per §5.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of retry attempts for retryable errors. Defaults to 3 per §5.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base exponential-backoff delay in milliseconds. Defaults to 1000 per §5.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum backoff delay in milliseconds. Defaults to 30_000 per §5.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// Jitter factor applied to computed backoff delays. Defaults to 0.1 per §5.
    #[serde(default = "default_retry_jitter_factor")]
    pub retry_jitter_factor: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            retry_jitter_factor: default_retry_jitter_factor(),
        }
    }
}

impl ClientConfig {
    /// The configured per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured backoff base delay as a [`Duration`].
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// The configured backoff cap as a [`Duration`].
    #[must_use]
    pub const fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_retry_base_delay_ms() -> u64 {
    1_000
}

const fn default_retry_max_delay_ms() -> u64 {
    30_000
}

const fn default_retry_jitter_factor() -> f64 {
    0.1
}

// ---------------------------------------------------------------------------
// DefaultsConfig
// ---------------------------------------------------------------------------

/// Default scoping applied when a CLI invocation doesn't override it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Default org scope.
    #[serde(default)]
    pub org: Option<String>,

    /// Default project scope.
    #[serde(default)]
    pub project: Option<String>,
}

// ---------------------------------------------------------------------------
// Literals
// ---------------------------------------------------------------------------

impl AgentSyncConfig {
    /// The reconciler id stamped into `managed:<id>` tags and
    /// `managed_by` metadata. Not configurable — a fleet of reconcilers
    /// with different ids would no longer agree on ownership.
    #[must_use]
    pub const fn reconciler_id() -> &'static str {
        RECONCILER_ID
    }

    /// The only `apiVersion` string manifests may declare.
    #[must_use]
    pub const fn supported_api_version() -> &'static str {
        SUPPORTED_API_VERSION
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a reconciler configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded, if available.
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl AgentSyncConfig {
    /// Load configuration from a TOML file.
    ///
    /// If the file does not exist, returns all defaults (not an error).
    ///
    /// # Errors
    /// Returns [`ConfigError`] on I/O errors (other than not-found) or
    /// parse errors, including unknown fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start].chars().filter(|&c| c == '\n').count() + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError { path: None, message }
        })
    }
}
