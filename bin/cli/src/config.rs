//! Process configuration.
//!
//! Loaded once at startup via the `config` crate: an optional
//! `roundtable.toml` in the working directory, overridden by environment
//! variables (`OLLAMA__BASE_URL` sets `ollama.base_url`).
//!
//! Secrets are never printed; `Debug` output redacts them.

use roundtable_ai::OllamaConfig;
use roundtable_trigger::DEFAULT_SUBJECT_PREFIX;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// File name (without extension) of the optional configuration file.
pub const CONFIG_FILE: &str = "roundtable";

const REDACTED: &str = "<redacted>";

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key is absent or empty.
    Missing { key: &'static str },
    /// A key is present but unusable.
    Invalid { key: &'static str, reason: String },
    /// The sources could not be read or deserialized.
    Load { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing required configuration: {key}"),
            Self::Invalid { key, reason } => write!(f, "invalid {key}: {reason}"),
            Self::Load { reason } => write!(f, "failed to load configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Gnosis,
    Sepolia,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gnosis => write!(f, "gnosis"),
            Self::Sepolia => write!(f, "sepolia"),
        }
    }
}

impl FromStr for Chain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gnosis" => Ok(Self::Gnosis),
            "sepolia" => Ok(Self::Sepolia),
            other => Err(ConfigError::Invalid {
                key: "CHAIN",
                reason: format!("expected 'gnosis' or 'sepolia', got '{other}'"),
            }),
        }
    }
}

/// Raw configuration as read from the sources.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub pimlico_api_key: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub pinata_jwt: Option<String>,
    #[serde(default)]
    pub pinata_gateway: Option<String>,

    /// Inference daemon settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Root directory of the local archive.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// NATS server; when unset, notifications stay in-process.
    #[serde(default)]
    pub nats_url: Option<String>,

    /// Subject prefix for file-added notifications.
    #[serde(default = "default_subject_prefix")]
    pub nats_subject_prefix: String,
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("./archive")
}

fn default_subject_prefix() -> String {
    DEFAULT_SUBJECT_PREFIX.to_string()
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_deref().map(mask)
}

fn mask(_secret: &str) -> &'static str {
    REDACTED
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("chain", &self.chain)
            .field("private_key", &redact(&self.private_key))
            .field("pimlico_api_key", &redact(&self.pimlico_api_key))
            .field("namespace", &self.namespace)
            .field("pinata_jwt", &redact(&self.pinata_jwt))
            .field("pinata_gateway", &self.pinata_gateway)
            .field("ollama", &self.ollama)
            .field("archive_dir", &self.archive_dir)
            .field("nats_url", &self.nats_url)
            .field("nats_subject_prefix", &self.nats_subject_prefix)
            .finish()
    }
}

/// Validated settings every command starts from.
#[derive(Clone)]
pub struct Settings {
    pub chain: Chain,
    pub private_key: String,
    pub pimlico_api_key: String,
    pub namespace: String,
    pub pinata_jwt: String,
    pub pinata_gateway: String,
    pub ollama: OllamaConfig,
    pub archive_dir: PathBuf,
    pub nats_url: Option<String>,
    pub nats_subject_prefix: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("chain", &self.chain)
            .field("private_key", &mask(&self.private_key))
            .field("pimlico_api_key", &mask(&self.pimlico_api_key))
            .field("namespace", &self.namespace)
            .field("pinata_jwt", &mask(&self.pinata_jwt))
            .field("pinata_gateway", &self.pinata_gateway)
            .field("ollama", &self.ollama)
            .field("archive_dir", &self.archive_dir)
            .field("nats_url", &self.nats_url)
            .field("nats_subject_prefix", &self.nats_subject_prefix)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from `roundtable.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or decoded.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            config::Config::builder()
                .add_source(config::File::with_name(CONFIG_FILE).required(false))
                .add_source(environment()),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load {
                reason: e.to_string(),
            })
    }

    /// Checks every required key and returns typed settings.
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid key.
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let chain: Chain = required("CHAIN", &self.chain)?.parse()?;

        let private_key = required("PRIVATE_KEY", &self.private_key)?;
        validate_private_key(private_key)?;

        let pimlico_api_key = required("PIMLICO_API_KEY", &self.pimlico_api_key)?;
        let namespace = required("NAMESPACE", &self.namespace)?;
        let pinata_jwt = required("PINATA_JWT", &self.pinata_jwt)?;

        let pinata_gateway = required("PINATA_GATEWAY", &self.pinata_gateway)?;
        if pinata_gateway.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "PINATA_GATEWAY",
                reason: "must be a host name or URL".to_string(),
            });
        }

        if self.ollama.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "OLLAMA__TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Settings {
            chain,
            private_key: private_key.to_string(),
            pimlico_api_key: pimlico_api_key.to_string(),
            namespace: namespace.to_string(),
            pinata_jwt: pinata_jwt.to_string(),
            pinata_gateway: pinata_gateway.to_string(),
            ollama: self.ollama.clone(),
            archive_dir: self.archive_dir.clone(),
            nats_url: self.nats_url.clone().filter(|url| !url.trim().is_empty()),
            nats_subject_prefix: self.nats_subject_prefix.clone(),
        })
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .try_parsing(true)
}

fn required<'a>(key: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { key }),
    }
}

fn validate_private_key(key: &str) -> Result<(), ConfigError> {
    let hex = key.strip_prefix("0x").ok_or_else(|| ConfigError::Invalid {
        key: "PRIVATE_KEY",
        reason: "must start with 0x".to_string(),
    })?;

    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Invalid {
            key: "PRIVATE_KEY",
            reason: "must be 32 bytes of hex".to_string(),
        });
    }
    Ok(())
}
