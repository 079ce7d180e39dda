//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How requests authenticate against the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    /// No credentials
    #[default]
    None,
    /// HTTP basic authentication
    Basic {
        /// Instance user name
        username: String,
        /// Password
        password: String,
    },
    /// OAuth bearer token
    Bearer {
        /// Access token
        token: String,
    },
}

/// Store API client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the store REST resource, e.g.
    /// `https://dev1234.service-now.com/api/x_acme_store/store`
    pub base_url: String,

    /// Path of the install trigger endpoint
    #[serde(default = "default_install_path")]
    pub install_path: String,

    /// Path of the update trigger endpoint
    #[serde(default = "default_update_path")]
    pub update_path: String,

    /// Path of the status endpoint; the tracking id is appended
    #[serde(default = "default_progress_path")]
    pub progress_path: String,

    /// Credentials
    #[serde(default)]
    pub auth: Auth,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_install_path() -> String {
    "/install".to_string()
}

fn default_update_path() -> String {
    "/update".to_string()
}

fn default_progress_path() -> String {
    "/progress".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Configuration with default paths for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            install_path: default_install_path(),
            update_path: default_update_path(),
            progress_path: default_progress_path(),
            auth: Auth::None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Set credentials.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join the base URL and an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("https://dev1.service-now.com/api/x/store");
        assert_eq!(config.install_path, "/install");
        assert_eq!(config.progress_path, "/progress");
        assert_eq!(config.auth, Auth::None);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = ClientConfig::new("https://dev1.service-now.com/api/x/store/");
        assert_eq!(
            config.endpoint("/progress"),
            "https://dev1.service-now.com/api/x/store/progress"
        );
        assert_eq!(
            config.endpoint("install"),
            "https://dev1.service-now.com/api/x/store/install"
        );
    }

    #[test]
    fn test_client_config_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            base_url = "https://dev1.service-now.com/api/x/store"
            progress_path = "/sync_apps"

            [auth]
            type = "basic"
            username = "admin"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.progress_path, "/sync_apps");
        assert_eq!(config.update_path, "/update");
        assert_eq!(
            config.auth,
            Auth::Basic {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }
        );
    }
}
