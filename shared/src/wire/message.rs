use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use serde::Serialize;
use crate::error::WireError;
use crate::protocol::{
    CLASS_TOP_BIT, FLAG_RESPONSE, HEADER_LEN, TYPE_A, TYPE_AAAA, TYPE_PTR, TYPE_SRV, TYPE_TXT,
};
use crate::types::DnsQuestion;
use super::name::decode_name;

/// The fixed 12-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub fn parse(packet: &[u8]) -> Result<Self, WireError> {
        if packet.len() < HEADER_LEN {
            return Err(WireError::PacketTooShort {
                expected: HEADER_LEN,
                actual: packet.len(),
            });
        }

        Ok(Self {
            id: read_u16(packet, 0)?,
            flags: read_u16(packet, 2)?,
            qdcount: read_u16(packet, 4)?,
            ancount: read_u16(packet, 6)?,
            nscount: read_u16(packet, 8)?,
            arcount: read_u16(packet, 10)?,
        })
    }

    pub fn is_response(&self) -> bool {
        self.flags & FLAG_RESPONSE != 0
    }
}

/// Extract the question of a query packet.
///
/// `Ok(None)` means the packet carries no question (QDCOUNT 0), which is not
/// an error: it is typically a response seen on the shared socket.
pub fn parse_query(packet: &[u8]) -> Result<Option<DnsQuestion>, WireError> {
    let header = Header::parse(packet)?;
    if header.qdcount == 0 {
        return Ok(None);
    }

    let (question, _) = read_question(packet, HEADER_LEN)?;
    Ok(Some(question))
}

/// Type-specific payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt(Vec<String>),
    /// Anything else, or a known type with an unexpected length
    Other(Vec<u8>),
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::Aaaa(addr) => write!(f, "{}", addr),
            RData::Ptr(name) => write!(f, "-> {}", name),
            RData::Srv { priority, weight, port, target } => write!(
                f,
                "port={} priority={} weight={} target={}",
                port, priority, weight, target
            ),
            RData::Txt(strings) => write!(f, "\"{}\"", strings.join("; ")),
            RData::Other(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    /// Class with the cache-flush bit removed
    pub class: u16,
    pub cache_flush: bool,
    pub ttl: u32,
    pub data: RData,
}

/// A fully walked message: header, questions and every record section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// All records in wire order.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
    }
}

/// Walk an entire message, typically a response received by the client.
pub fn parse_message(packet: &[u8]) -> Result<Message, WireError> {
    let header = Header::parse(packet)?;
    let mut offset = HEADER_LEN;

    let mut questions = Vec::new();
    for _ in 0..header.qdcount {
        let (question, next) = read_question(packet, offset)?;
        questions.push(question);
        offset = next;
    }

    let mut sections = [Vec::new(), Vec::new(), Vec::new()];
    let counts = [header.ancount, header.nscount, header.arcount];
    for (section, count) in sections.iter_mut().zip(counts) {
        for _ in 0..count {
            let (record, next) = read_record(packet, offset)?;
            section.push(record);
            offset = next;
        }
    }

    let [answers, authority, additional] = sections;
    Ok(Message {
        header,
        questions,
        answers,
        authority,
        additional,
    })
}

fn read_question(packet: &[u8], offset: usize) -> Result<(DnsQuestion, usize), WireError> {
    let (name, next) = decode_name(packet, offset)?;
    let qtype = read_u16(packet, next)?;
    let qclass = read_u16(packet, next + 2)?;
    Ok((DnsQuestion { name, qtype, qclass }, next + 4))
}

fn read_record(packet: &[u8], offset: usize) -> Result<(ResourceRecord, usize), WireError> {
    let (name, next) = decode_name(packet, offset)?;
    let rtype = read_u16(packet, next)?;
    let raw_class = read_u16(packet, next + 2)?;
    let ttl = read_u32(packet, next + 4)?;
    let rdlength = usize::from(read_u16(packet, next + 8)?);

    let rdata_start = next + 10;
    let rdata_end = rdata_start + rdlength;
    let rdata = packet.get(rdata_start..rdata_end).ok_or(WireError::PacketTooShort {
        expected: rdata_end,
        actual: packet.len(),
    })?;

    // A record with unreadable RDATA is kept as raw bytes; RDLENGTH still
    // tells us where the next record starts.
    let data = decode_rdata(packet, rtype, rdata_start, rdata_end).unwrap_or_else(|e| {
        tracing::debug!("Undecodable {} RDATA for {}: {}", rtype, name, e);
        RData::Other(rdata.to_vec())
    });

    let record = ResourceRecord {
        name,
        rtype,
        class: raw_class & !CLASS_TOP_BIT,
        cache_flush: raw_class & CLASS_TOP_BIT != 0,
        ttl,
        data,
    };
    Ok((record, rdata_end))
}

fn decode_rdata(
    packet: &[u8],
    rtype: u16,
    rdata_start: usize,
    rdata_end: usize,
) -> Result<RData, WireError> {
    let rdata = &packet[rdata_start..rdata_end];
    let data = match (rtype, rdata.len()) {
        (TYPE_A, 4) => RData::A(Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3])),
        (TYPE_AAAA, 16) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rdata);
            RData::Aaaa(Ipv6Addr::from(octets))
        }
        (TYPE_PTR, _) => RData::Ptr(read_rdata_name(packet, rdata_start, rdata_end)?),
        (TYPE_SRV, len) if len >= 6 => RData::Srv {
            priority: read_u16(rdata, 0)?,
            weight: read_u16(rdata, 2)?,
            port: read_u16(rdata, 4)?,
            target: read_rdata_name(packet, rdata_start + 6, rdata_end)?,
        },
        (TYPE_TXT, _) => RData::Txt(read_character_strings(rdata, rdata_start)?),
        _ => RData::Other(rdata.to_vec()),
    };
    Ok(data)
}

/// A name embedded in RDATA may point anywhere in the packet, but its own
/// bytes must end by `rdata_end`.
fn read_rdata_name(packet: &[u8], offset: usize, rdata_end: usize) -> Result<String, WireError> {
    if offset >= rdata_end {
        return Err(WireError::RdataOverrun { offset });
    }
    let (name, next) = decode_name(packet, offset)?;
    if next > rdata_end {
        return Err(WireError::RdataOverrun { offset });
    }
    Ok(name)
}

/// Split TXT RDATA into its length-prefixed strings. `base` is only used for error offsets.
fn read_character_strings(rdata: &[u8], base: usize) -> Result<Vec<String>, WireError> {
    let mut strings = Vec::new();
    let mut pos = 0;

    while pos < rdata.len() {
        let len = usize::from(rdata[pos]);
        let start = pos + 1;
        let bytes = rdata
            .get(start..start + len)
            .ok_or(WireError::RdataOverrun { offset: base + pos })?;
        if !bytes.is_empty() {
            strings.push(String::from_utf8_lossy(bytes).into_owned());
        }
        pos = start + len;
    }

    Ok(strings)
}

fn read_u16(packet: &[u8], offset: usize) -> Result<u16, WireError> {
    match packet.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(WireError::PacketTooShort {
            expected: offset + 2,
            actual: packet.len(),
        }),
    }
}

fn read_u32(packet: &[u8], offset: usize) -> Result<u32, WireError> {
    match packet.get(offset..offset + 4) {
        Some(bytes) => Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        None => Err(WireError::PacketTooShort {
            expected: offset + 4,
            actual: packet.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CLASS_IN;
    use crate::wire::name::encode_name;

    fn query_packet(name: &str, qtype: u16) -> Vec<u8> {
        let mut packet = vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        packet.extend(encode_name(name).unwrap());
        packet.extend_from_slice(&qtype.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet
    }

    #[test]
    fn test_parse_query() {
        let packet = query_packet("nas.local", TYPE_A);
        let question = parse_query(&packet).unwrap().unwrap();

        assert_eq!(question.name, "nas.local");
        assert_eq!(question.qtype, TYPE_A);
        assert_eq!(question.qclass, CLASS_IN);
    }

    #[test]
    fn test_parse_query_short_header() {
        assert_eq!(
            parse_query(&[0u8; 11]),
            Err(WireError::PacketTooShort { expected: 12, actual: 11 })
        );
    }

    #[test]
    fn test_parse_query_without_question() {
        let packet = [0u8; 12];
        assert_eq!(parse_query(&packet), Ok(None));
    }

    #[test]
    fn test_parse_query_missing_type_and_class() {
        let mut packet = query_packet("nas.local", TYPE_A);
        packet.truncate(packet.len() - 3);
        assert!(matches!(parse_query(&packet), Err(WireError::PacketTooShort { .. })));
    }

    #[test]
    fn test_parse_query_bad_name() {
        let mut packet = vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        packet.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);
        assert!(matches!(parse_query(&packet), Err(WireError::PointerLoop { .. })));
    }

    #[test]
    fn test_header_flags() {
        let mut packet = [0u8; 12];
        assert!(!Header::parse(&packet).unwrap().is_response());
        packet[2] = 0x84;
        assert!(Header::parse(&packet).unwrap().is_response());
    }

    #[test]
    fn test_walk_records() {
        // header: 1 answer (PTR) + 1 additional (TXT), no question
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 1];
        let owner_at = packet.len();
        packet.extend(encode_name("_http._tcp.local").unwrap());
        packet.extend_from_slice(&TYPE_PTR.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet.extend_from_slice(&4500u32.to_be_bytes());
        // "web" + pointer to the owner name
        packet.extend_from_slice(&6u16.to_be_bytes());
        let instance_at = packet.len();
        packet.extend_from_slice(&[3, b'w', b'e', b'b', 0xC0, owner_at as u8]);

        packet.extend_from_slice(&[0xC0, instance_at as u8]);
        packet.extend_from_slice(&TYPE_TXT.to_be_bytes());
        packet.extend_from_slice(&(CLASS_IN | CLASS_TOP_BIT).to_be_bytes());
        packet.extend_from_slice(&120u32.to_be_bytes());
        packet.extend_from_slice(&9u16.to_be_bytes());
        packet.extend_from_slice(b"\x03a=1\x00\x03b=2");

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers.len(), 1);
        assert_eq!(message.additional.len(), 1);

        let ptr = &message.answers[0];
        assert_eq!(ptr.name, "_http._tcp.local");
        assert_eq!(ptr.data, RData::Ptr("web._http._tcp.local".to_string()));
        assert_eq!(ptr.ttl, 4500);
        assert!(!ptr.cache_flush);

        let txt = &message.additional[0];
        assert_eq!(txt.name, "web._http._tcp.local");
        assert!(txt.cache_flush);
        assert_eq!(txt.class, CLASS_IN);
        assert_eq!(txt.data, RData::Txt(vec!["a=1".to_string(), "b=2".to_string()]));
        assert_eq!(txt.data.to_string(), "\"a=1; b=2\"");
    }

    #[test]
    fn test_walk_rejects_rdata_past_end() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        packet.extend(encode_name("nas.local").unwrap());
        packet.extend_from_slice(&TYPE_A.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet.extend_from_slice(&120u32.to_be_bytes());
        packet.extend_from_slice(&4u16.to_be_bytes());
        packet.extend_from_slice(&[10, 0]);

        assert!(matches!(parse_message(&packet), Err(WireError::PacketTooShort { .. })));
    }

    fn record_header(packet: &mut Vec<u8>, name: &str, rtype: u16, rdlength: u16) {
        packet.extend(encode_name(name).unwrap());
        packet.extend_from_slice(&rtype.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet.extend_from_slice(&120u32.to_be_bytes());
        packet.extend_from_slice(&rdlength.to_be_bytes());
    }

    #[test]
    fn test_txt_overrun_is_kept_raw() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        record_header(&mut packet, "x.local", TYPE_TXT, 3);
        packet.extend_from_slice(&[5, b'a', b'b']);

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers[0].data, RData::Other(vec![5, b'a', b'b']));
    }

    #[test]
    fn test_empty_ptr_does_not_borrow_next_record() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 2, 0, 0, 0, 0];
        record_header(&mut packet, "_http._tcp.local", TYPE_PTR, 0);
        record_header(&mut packet, "nas.local", TYPE_A, 4);
        packet.extend_from_slice(&[10, 0, 0, 2]);

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers[0].data, RData::Other(Vec::new()));
        assert_eq!(message.answers[1].name, "nas.local");
        assert_eq!(message.answers[1].data, RData::A(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_bad_ptr_pointer_keeps_later_records() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 2, 0, 0, 0, 0];
        record_header(&mut packet, "_http._tcp.local", TYPE_PTR, 2);
        packet.extend_from_slice(&[0xC0, 0xFF]);
        record_header(&mut packet, "nas.local", TYPE_A, 4);
        packet.extend_from_slice(&[10, 0, 0, 2]);

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers[0].data, RData::Other(vec![0xC0, 0xFF]));
        assert_eq!(message.answers[1].data, RData::A(Ipv4Addr::new(10, 0, 0, 2)));
    }

    #[test]
    fn test_srv_target_must_end_inside_rdata() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 2, 0, 0, 0, 0];
        // the target pointer's second byte is outside RDLENGTH
        record_header(&mut packet, "web._http._tcp.local", TYPE_SRV, 7);
        packet.extend_from_slice(&[0, 0, 0, 0, 0, 80, 0xC0]);
        record_header(&mut packet, "nas.local", TYPE_A, 4);
        packet.extend_from_slice(&[10, 0, 0, 2]);

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers[0].data, RData::Other(vec![0, 0, 0, 0, 0, 80, 0xC0]));
        assert_eq!(message.answers[1].name, "nas.local");
    }

    #[test]
    fn test_huge_counts_fail_without_allocating() {
        let packet = [0, 0, 0x84, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(parse_message(&packet).is_err());
    }

    #[test]
    fn test_odd_length_address_is_other() {
        let mut packet = vec![0, 0, 0x84, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        packet.extend(encode_name("nas.local").unwrap());
        packet.extend_from_slice(&TYPE_A.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet.extend_from_slice(&120u32.to_be_bytes());
        packet.extend_from_slice(&2u16.to_be_bytes());
        packet.extend_from_slice(&[10, 0]);

        let message = parse_message(&packet).unwrap();
        assert_eq!(message.answers[0].data, RData::Other(vec![10, 0]));
    }
}
