//! In-memory catalog of locally advertised service instances.
//!
//! Records are kept in insertion order and identified by the
//! case-insensitive key `instance.service_type.domain`. The registry is owned
//! by whoever runs the responder; the query path only borrows it.

use thiserror::Error;
use crate::protocol::{DEFAULT_TTL, LOCAL_DOMAIN};
use crate::types::ServiceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("domain {0:?} is not \"local\"")]
    DomainNotLocal(String),

    #[error("service type {0:?} must start with '_'")]
    ServiceTypeUnderscore(String),

    #[error("port must not be zero")]
    ZeroPort,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid service record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("service {0} is already registered")]
    Conflict(String),

    #[error("service {0} is not registered")]
    NotFound(String),
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceRecord>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new service. An existing entry with the same key is never replaced.
    pub fn register(&mut self, mut record: ServiceRecord) -> Result<(), RegistryError> {
        validate(&record)?;

        let key = record.key();
        if self.position(&key).is_some() {
            return Err(RegistryError::Conflict(key));
        }

        if record.ttl == 0 {
            record.ttl = DEFAULT_TTL;
        }
        tracing::debug!("Registered service {} on port {}", key, record.port);
        self.services.push(record);
        Ok(())
    }

    /// Replace target, priority, weight, port, ttl and TXT of an existing service.
    /// Instance, type and domain are the identity and stay as registered.
    pub fn update(&mut self, record: ServiceRecord) -> Result<(), RegistryError> {
        validate(&record)?;

        let key = record.key();
        let idx = self
            .position(&key)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))?;

        let existing = &mut self.services[idx];
        existing.target_host = record.target_host;
        existing.priority = record.priority;
        existing.weight = record.weight;
        existing.port = record.port;
        existing.ttl = if record.ttl == 0 { DEFAULT_TTL } else { record.ttl };
        existing.txt = record.txt;

        tracing::debug!("Updated service {}", key);
        Ok(())
    }

    /// Remove the service with `key`, keeping the order of the rest.
    pub fn unregister(&mut self, key: &str) -> Result<ServiceRecord, RegistryError> {
        let idx = self
            .position(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;
        Ok(self.services.remove(idx))
    }

    /// Services in registration order, at most `limit`.
    pub fn list(&self, limit: usize) -> Vec<&ServiceRecord> {
        self.services.iter().take(limit).collect()
    }

    pub fn find_by_fqdn(&self, key: &str) -> Option<&ServiceRecord> {
        self.position(key).map(|idx| &self.services[idx])
    }

    /// Services whose type and domain both match, ignoring case, in registration order.
    pub fn find_by_type(&self, service_type: &str, domain: &str, limit: usize) -> Vec<&ServiceRecord> {
        self.services
            .iter()
            .filter(|svc| {
                svc.service_type.eq_ignore_ascii_case(service_type)
                    && svc.domain.eq_ignore_ascii_case(domain)
            })
            .take(limit)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.services.clear();
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.services
            .iter()
            .position(|svc| svc.key().eq_ignore_ascii_case(key))
    }
}

fn validate(record: &ServiceRecord) -> Result<(), ValidationError> {
    let required = [
        ("instance", &record.instance),
        ("service type", &record.service_type),
        ("domain", &record.domain),
        ("target host", &record.target_host),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
        return Err(ValidationError::EmptyField(*field));
    }

    if !record.domain.eq_ignore_ascii_case(LOCAL_DOMAIN) {
        return Err(ValidationError::DomainNotLocal(record.domain.clone()));
    }
    if !record.service_type.starts_with('_') {
        return Err(ValidationError::ServiceTypeUnderscore(record.service_type.clone()));
    }
    if record.port == 0 {
        return Err(ValidationError::ZeroPort);
    }
    Ok(())
}
