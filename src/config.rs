//! Host configuration resolved from the environment.
//!
//! | Variable              | Effect                                        |
//! |-----------------------|-----------------------------------------------|
//! | `NODE_ENV`            | `production` selects the production policy    |
//! | `OPEN_DEVTOOLS`       | `1`/`true`/`yes` opens devtools on new windows |
//! | `ELECTRON_DEV_SERVER` | dev server URL windows load instead of assets |

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const ENV_NODE_ENV: &str = "NODE_ENV";
pub const ENV_OPEN_DEVTOOLS: &str = "OPEN_DEVTOOLS";
pub const ENV_DEV_SERVER: &str = "ELECTRON_DEV_SERVER";

/// Default maximum concurrent handler tasks.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 256;

/// Default capacity of the window → host message queue.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1024;

/// Runtime environment; selects the security policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Anything other than `production` (case-insensitive) is development.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Screen area used to center windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub environment: Environment,
    pub open_devtools: bool,
    pub dev_server_url: Option<String>,
    pub app_name: String,
    pub app_version: String,
    pub screen: ScreenSize,
    pub max_concurrent_handlers: usize,
    pub inbound_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            open_devtools: false,
            dev_server_url: None,
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            screen: ScreenSize::default(),
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

fn parse_flag(name: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(BridgeError::Config(format!(
            "{name} must be a boolean flag, got '{other}'"
        ))),
    }
}

impl HostConfig {
    /// Resolve from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::from_node_env(lookup(ENV_NODE_ENV).as_deref());
        let open_devtools = parse_flag(ENV_OPEN_DEVTOOLS, lookup(ENV_OPEN_DEVTOOLS))?;

        let dev_server_url = match lookup(ENV_DEV_SERVER).filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let parsed = url::Url::parse(raw.trim()).map_err(|e| {
                    BridgeError::Config(format!("{ENV_DEV_SERVER} is not a valid URL: {e}"))
                })?;
                Some(parsed.to_string())
            }
            None => None,
        };

        Ok(Self {
            environment,
            open_devtools,
            dev_server_url,
            ..Self::default()
        })
    }

    /// Devtools open in development or when explicitly requested.
    pub fn devtools_enabled(&self) -> bool {
        self.open_devtools || !self.environment.is_production()
    }

    /// Content-Security-Policy for a page load with the given nonce.
    pub fn content_security_policy(&self, nonce: &str) -> String {
        crate::security::content_security_policy(self.environment, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let cfg = HostConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert!(!cfg.open_devtools);
        assert!(cfg.dev_server_url.is_none());
        assert!(cfg.devtools_enabled());
    }

    #[test]
    fn test_production_environment() {
        let cfg = HostConfig::from_lookup(lookup(&[("NODE_ENV", "Production")])).unwrap();
        assert!(cfg.environment.is_production());
        assert!(!cfg.devtools_enabled());

        let cfg = HostConfig::from_lookup(lookup(&[
            ("NODE_ENV", "production"),
            ("OPEN_DEVTOOLS", "1"),
        ]))
        .unwrap();
        assert!(cfg.devtools_enabled());
    }

    #[test]
    fn test_unknown_node_env_is_development() {
        assert_eq!(
            Environment::from_node_env(Some("staging")),
            Environment::Development
        );
    }

    #[test]
    fn test_bad_devtools_flag() {
        let result = HostConfig::from_lookup(lookup(&[("OPEN_DEVTOOLS", "maybe")]));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_dev_server_url() {
        let cfg =
            HostConfig::from_lookup(lookup(&[("ELECTRON_DEV_SERVER", "http://localhost:5173")]))
                .unwrap();
        assert_eq!(cfg.dev_server_url.as_deref(), Some("http://localhost:5173/"));

        let result = HostConfig::from_lookup(lookup(&[("ELECTRON_DEV_SERVER", "not a url")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Environment::Production).unwrap(),
            serde_json::json!("production")
        );
    }
}
