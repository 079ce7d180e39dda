//! Settings loading: TOML file, then environment and flags.
//!
//! ```toml
//! [instance]
//! base_url = "https://dev1234.service-now.com/api/x_acme_store/store"
//! progress_path = "/progress"
//!
//! [instance.auth]
//! type = "basic"
//! username = "admin"
//! password = "..."
//!
//! [poller]
//! interval_ms = 2000
//! max_attempts = 150
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storetrack_client::{Auth, ClientConfig};
use storetrack_progress::PollerConfig;
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_FILE: &str = "storetrack.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("No instance URL configured; set instance.base_url, --url or STORETRACK_URL")]
    MissingUrl,

    #[error("User {0} has no password; set --password or STORETRACK_PASSWORD")]
    MissingPassword(String),

    #[error("Invalid poller settings: {0}")]
    Poller(#[from] storetrack_progress::ConfigError),
}

/// `[instance]` section. Every field may come from elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
}

/// Everything the CLI needs to reach an instance and poll it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub instance: InstanceSection,
    #[serde(default)]
    pub poller: PollerConfig,
}

/// Values from flags and environment, which win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl Settings {
    /// Load `path`, or `storetrack.toml` if present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer flag and environment values on top.
    pub fn apply(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(url) = &overrides.url {
            self.instance.base_url = Some(url.clone());
        }

        if let Some(token) = &overrides.token {
            self.instance.auth = Some(Auth::Bearer {
                token: token.clone(),
            });
        } else if let Some(user) = &overrides.user {
            let password = match (&overrides.password, &self.instance.auth) {
                (Some(password), _) => password.clone(),
                (None, Some(Auth::Basic { password, .. })) => password.clone(),
                _ => return Err(ConfigError::MissingPassword(user.clone())),
            };
            self.instance.auth = Some(Auth::Basic {
                username: user.clone(),
                password,
            });
        } else if let (Some(password), Some(Auth::Basic { password: current, .. })) =
            (&overrides.password, self.instance.auth.as_mut())
        {
            *current = password.clone();
        }

        if let Some(interval_ms) = overrides.interval_ms {
            self.poller.interval_ms = interval_ms;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.poller.max_attempts = max_attempts;
        }

        self.poller.validate()?;
        Ok(self)
    }

    /// Resolve the client configuration.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let base_url = self
            .instance
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingUrl)?;

        let mut config = ClientConfig::new(base_url);
        if let Some(path) = &self.instance.install_path {
            config.install_path = path.clone();
        }
        if let Some(path) = &self.instance.update_path {
            config.update_path = path.clone();
        }
        if let Some(path) = &self.instance.progress_path {
            config.progress_path = path.clone();
        }
        if let Some(secs) = self.instance.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(auth) = &self.instance.auth {
            config.auth = auth.clone();
        }
        Ok(config)
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        settings.instance.auth = match settings.instance.auth.take() {
            Some(Auth::Basic { username, .. }) => Some(Auth::Basic {
                username,
                password: "********".to_string(),
            }),
            Some(Auth::Bearer { .. }) => Some(Auth::Bearer {
                token: "********".to_string(),
            }),
            other => other,
        };
        settings
    }
}
