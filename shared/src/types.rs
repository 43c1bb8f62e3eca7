use std::net::{Ipv4Addr, Ipv6Addr};
use serde::{Serialize, Deserialize};
use crate::protocol::{DEFAULT_TTL, LOCAL_DOMAIN};

/// The single question carried by an incoming query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsQuestion {
    /// Decoded dotted name, without a trailing dot ("." for the root)
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// Identity of the answering node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    /// Always ends with `.local`, never with a dot
    hostname: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub ttl: u32,
}

impl HostRecord {
    /// Build a host record, normalizing `hostname` to its `.local` form.
    pub fn new(hostname: &str, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>, ttl: u32) -> Self {
        Self {
            hostname: normalize_local_name(hostname),
            ipv4,
            ipv6,
            ttl,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns this record if `name` (trailing dot ignored) is our hostname.
    pub fn lookup(&self, name: &str) -> Option<&HostRecord> {
        let name = strip_trailing_dot(name);
        if name.eq_ignore_ascii_case(&self.hostname) {
            Some(self)
        } else {
            None
        }
    }
}

/// One advertised service instance.
///
/// Deserializes straight from a `[[service]]` table of the daemon config.
/// Missing keys come through empty or zero and are rejected by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Display name, e.g. "My Printer"
    #[serde(default)]
    pub instance: String,

    /// Service type, e.g. "_http._tcp"
    #[serde(default, rename = "type")]
    pub service_type: String,

    #[serde(default = "default_domain")]
    pub domain: String,

    #[serde(default)]
    pub priority: u16,

    #[serde(default)]
    pub weight: u16,

    #[serde(default)]
    pub port: u16,

    /// Host the SRV record points at, e.g. "nas.local"
    #[serde(default, rename = "target")]
    pub target_host: String,

    /// `key=value` strings, written verbatim as TXT character-strings
    #[serde(default)]
    pub txt: Vec<String>,

    /// TTL in seconds, 0 means the default
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl ServiceRecord {
    /// Registry identity and owner name of the SRV/TXT answers: `instance.service_type.domain`.
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.instance, self.service_type, self.domain)
    }

    pub fn effective_ttl(&self) -> u32 {
        if self.ttl == 0 {
            DEFAULT_TTL
        } else {
            self.ttl
        }
    }
}

fn default_domain() -> String {
    LOCAL_DOMAIN.to_string()
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

pub(crate) fn strip_trailing_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn normalize_local_name(name: &str) -> String {
    let name = strip_trailing_dot(name);
    let suffix = ".local";
    let has_suffix = name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix);

    if has_suffix {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}
