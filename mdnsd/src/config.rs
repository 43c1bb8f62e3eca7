use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::DEFAULT_TTL;
use shared::{ServiceRecord, ServiceRegistry};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub responder: ResponderConfig,
    /// `[[service]]` tables, registered in file order
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponderConfig {
    /// Interface to answer on; `--interface` wins
    pub interface: Option<String>,
    /// Hostname to answer for instead of the system hostname
    pub hostname: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub reply: ReplyMode,
    #[serde(default = "default_cache_flush")]
    pub cache_flush: bool,
}

/// Where answers are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Back to the address the query came from
    #[default]
    Source,
    /// To the mDNS group
    Multicast,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_cache_flush() -> bool {
    true
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            interface: None,
            hostname: None,
            ttl: default_ttl(),
            reply: ReplyMode::default(),
            cache_flush: default_cache_flush(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Feed every configured service into `registry`. Rejected services are
    /// logged and skipped. Returns how many were registered.
    pub fn register_services(&self, registry: &mut ServiceRegistry) -> usize {
        let mut loaded = 0;
        for service in &self.services {
            match registry.register(service.clone()) {
                Ok(()) => {
                    tracing::info!(
                        "Registered service: {}:{}",
                        service.key(),
                        service.port
                    );
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Config: failed to register service '{}': {}", service.key(), e);
                }
            }
        }
        loaded
    }
}
