use crate::protocol::{MAX_SERVICE_ANSWERS, TYPE_A, TYPE_AAAA, TYPE_SRV};
use crate::registry::ServiceRegistry;
use crate::types::{strip_trailing_dot, DnsQuestion, HostRecord, ServiceRecord};

/// What, if anything, a question should be answered with.
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A or AAAA for our own hostname
    Host(&'a HostRecord),
    /// SRV for one instance or every instance of a type
    Services(Vec<&'a ServiceRecord>),
    /// Supported type, but nothing here matches the name
    NoMatch,
    /// Query type the responder does not serve
    Unsupported(u16),
}

/// Decide how to answer `question`. Never mutates the registry.
pub fn resolve<'a>(
    question: &DnsQuestion,
    host: &'a HostRecord,
    registry: &'a ServiceRegistry,
) -> Resolution<'a> {
    match question.qtype {
        TYPE_A | TYPE_AAAA => match host.lookup(&question.name) {
            Some(host) => Resolution::Host(host),
            None => Resolution::NoMatch,
        },
        TYPE_SRV => {
            let services = find_services(&question.name, registry);
            if services.is_empty() {
                Resolution::NoMatch
            } else {
                Resolution::Services(services)
            }
        }
        other => Resolution::Unsupported(other),
    }
}

fn find_services<'a>(name: &str, registry: &'a ServiceRegistry) -> Vec<&'a ServiceRecord> {
    if name.starts_with('_') {
        match split_service_type(name) {
            Some((service_type, domain)) => {
                registry.find_by_type(service_type, domain, MAX_SERVICE_ANSWERS)
            }
            None => Vec::new(),
        }
    } else {
        registry
            .find_by_fqdn(strip_trailing_dot(name))
            .into_iter()
            .collect()
    }
}

/// Split a general query name `_service._proto.domain` into
/// (`_service._proto`, `domain`), dropping a trailing dot from the domain.
pub fn split_service_type(name: &str) -> Option<(&str, &str)> {
    if !name.starts_with('_') {
        return None;
    }

    // the dot ending `_service` must be followed by an underscore label
    let first_dot = name[1..].find('.')? + 1;
    if !name[first_dot + 1..].starts_with('_') {
        return None;
    }
    let second_dot = name[first_dot + 1..].find('.')? + first_dot + 1;

    let service_type = &name[..second_dot];
    let domain = strip_trailing_dot(&name[second_dot + 1..]);
    Some((service_type, domain))
}
