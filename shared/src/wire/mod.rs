//! DNS wire format: names, message parsing and response building.

pub mod message;
pub mod name;
pub mod response;
pub mod writer;

pub use message::{parse_message, parse_query, Header, Message, RData, ResourceRecord};
pub use name::{decode_name, encode_name};
pub use response::{
    build_host_response, build_query, build_service_response, BuildOutcome, ResponseOptions,
};
pub use writer::PacketWriter;
