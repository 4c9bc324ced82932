//! Follower configuration.
//!
//! # Example
//!
//! ```rust
//! use chainfollow_core::config::FollowerConfigBuilder;
//!
//! let config = FollowerConfigBuilder::new()
//!     .host("relay.local")
//!     .port(1337)
//!     .database_url("postgresql://localhost/chainfollow")
//!     .log_level("debug")
//!     .build();
//! assert_eq!(config.connection.url(), "ws://relay.local:1337");
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::FollowerError;

/// Where the chain-sync transport connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use a TLS (`wss://`) connection.
    #[serde(default)]
    pub tls: bool,
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    1337
}

impl ConnectionConfig {
    /// WebSocket URL for this connection.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
        }
    }
}

/// Database used by the Postgres store and job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgresql://[user[:password]@][host][:port][/dbname]`. Hosts use the
    /// Postgres backends when set and in-memory backends otherwise.
    #[serde(default)]
    pub url: Option<String>,
    /// Reported to Postgres as `application_name`.
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_application_name() -> String {
    "chainfollow".into()
}
fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            application_name: default_application_name(),
            max_connections: default_max_connections(),
        }
    }
}

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl LogConfig {
    /// Filter directives, e.g. `"info,chainfollow_core=debug"`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Top-level configuration of a follower process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl FollowerConfig {
    /// Parse a JSON config document.
    pub fn from_json(s: &str) -> Result<Self, FollowerError> {
        serde_json::from_str(s).map_err(|e| FollowerError::Config(e.to_string()))
    }
}

/// Fluent builder for [`FollowerConfig`].
#[derive(Default)]
pub struct FollowerConfigBuilder {
    config: FollowerConfig,
}

impl FollowerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain-sync host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.connection.host = host.into();
        self
    }

    /// Set the chain-sync port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.connection.port = port;
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.config.connection.tls = tls;
        self
    }

    /// Use Postgres backends at this URL.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.database.application_name = name.into();
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.database.max_connections = n;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log.level = level.into();
        self
    }

    pub fn json_logs(mut self, json: bool) -> Self {
        self.config.log.json = json;
        self
    }

    pub fn build(self) -> FollowerConfig {
        self.config
    }
}
