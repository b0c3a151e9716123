use assetgate_manifest::{Alias, AliasError, AliasTable, DEFAULT_PRESET};
use assetgate_store::{OriginConfig, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "assetgate.toml";
pub const DEFAULT_MANIFEST_PATH: &str = "/.vite/manifest.json";

/// Preset name that starts the alias table empty.
pub const NO_PRESET: &str = "none";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid alias: {0}")]
    Alias(#[from] AliasError),
    #[error("invalid origin: {0}")]
    Origin(#[from] StoreError),
    #[error("{0}")]
    Invalid(String),
}

/// How a resolved alias is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStrategy {
    /// 302 to the hashed path.
    #[default]
    Redirect,
    /// Fetch the hashed file and return it under the alias URL.
    Proxy,
}

impl fmt::Display for ResponseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect => f.write_str("redirect"),
            Self::Proxy => f.write_str("proxy"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub manifest: ManifestSection,
    #[serde(default)]
    pub response: ResponseSection,
    #[serde(default)]
    pub aliases: AliasesSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSection {
    #[serde(default = "default_manifest_path")]
    pub path: String,
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            cache_ttl_secs: 0,
        }
    }
}

impl ManifestSection {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseSection {
    #[serde(default)]
    pub strategy: ResponseStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasesSection {
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default, rename = "entry")]
    pub entries: Vec<Alias>,
}

impl Default for AliasesSection {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            entries: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8787
}

fn default_workers() -> usize {
    4
}

fn default_manifest_path() -> String {
    DEFAULT_MANIFEST_PATH.to_owned()
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_owned()
}

impl GatewayConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, else `assetgate.toml` in the working directory
    /// if it exists, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The preset's aliases with `[[aliases.entry]]` overrides applied.
    pub fn alias_table(&self) -> Result<AliasTable, ConfigError> {
        let mut table = if self.aliases.preset == NO_PRESET {
            AliasTable::new()
        } else {
            AliasTable::from_preset(&self.aliases.preset)?
        };
        for alias in &self.aliases.entries {
            table.insert(alias.clone())?;
        }
        Ok(table)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin.validate()?;
        if !self.manifest.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "manifest.path must start with '/': '{}'",
                self.manifest.path
            )));
        }
        if self.server.workers == 0 {
            return Err(ConfigError::Invalid(
                "server.workers must be at least 1".to_owned(),
            ));
        }
        self.alias_table()?;
        Ok(())
    }
}
