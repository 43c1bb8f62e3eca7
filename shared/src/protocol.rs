use std::net::Ipv6Addr;

/// mDNS UDP port
pub const MDNS_PORT: u16 = 5353;

/// Link-local mDNS group (`ff02::fb`)
pub const MDNS_GROUP_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// Largest datagram the responder and client handle
pub const MAX_PACKET: usize = 1500;

/// Fixed DNS header length; the question section always starts here
pub const HEADER_LEN: usize = 12;

/// Longest decoded or encoded domain name
pub const MAX_NAME_LEN: usize = 255;

/// Longest single label
pub const MAX_LABEL_LEN: usize = 63;

/// TTL used for records that do not carry their own
pub const DEFAULT_TTL: u32 = 120;

/// Upper bound on services gathered for one general type query
pub const MAX_SERVICE_ANSWERS: usize = 32;

/// The only domain services may be registered under
pub const LOCAL_DOMAIN: &str = "local";

pub const TYPE_A: u16 = 1;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const TYPE_SRV: u16 = 33;

pub const CLASS_IN: u16 = 1;

/// Top class bit. On answers it means "cache flush", on questions "unicast response wanted".
pub const CLASS_TOP_BIT: u16 = 0x8000;

pub const FLAG_RESPONSE: u16 = 0x8000;
pub const FLAG_AUTHORITATIVE: u16 = 0x0400;

/// Name field of every host answer: a pointer back to the question name at offset 12
pub const QUESTION_NAME_POINTER: u16 = 0xC000 | HEADER_LEN as u16;

/// Human readable mnemonic for the record types this crate knows about.
pub fn type_name(rtype: u16) -> &'static str {
    match rtype {
        TYPE_A => "A",
        TYPE_PTR => "PTR",
        TYPE_TXT => "TXT",
        TYPE_AAAA => "AAAA",
        TYPE_SRV => "SRV",
        _ => "UNKNOWN",
    }
}
