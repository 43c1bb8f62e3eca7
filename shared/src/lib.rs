//! Multicast DNS protocol core shared by `mdnsd` and `mdns-client`.
//!
//! The responder path is: [`wire::parse_query`] → [`resolve::resolve`] →
//! [`wire::build_host_response`] / [`wire::build_service_response`].

pub mod error;
pub mod protocol;
pub mod registry;
pub mod resolve;
pub mod transport;
pub mod types;
pub mod wire;

pub use error::WireError;
pub use registry::{RegistryError, ServiceRegistry, ValidationError};
pub use resolve::{resolve, Resolution};
pub use types::{DnsQuestion, HostRecord, ServiceRecord};
