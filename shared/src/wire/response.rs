use std::net::IpAddr;
use crate::error::WireError;
use crate::protocol::{
    CLASS_IN, CLASS_TOP_BIT, FLAG_AUTHORITATIVE, FLAG_RESPONSE, QUESTION_NAME_POINTER, TYPE_A,
    TYPE_AAAA, TYPE_SRV, TYPE_TXT,
};
use crate::types::{DnsQuestion, HostRecord, ServiceRecord};
use super::name::{encode_name, write_name};
use super::writer::PacketWriter;

const ANCOUNT_OFFSET: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Set the mDNS cache-flush bit on answer classes
    pub cache_flush: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self { cache_flush: true }
    }
}

impl ResponseOptions {
    fn answer_class(&self) -> u16 {
        if self.cache_flush {
            CLASS_IN | CLASS_TOP_BIT
        } else {
            CLASS_IN
        }
    }
}

/// What a builder left in the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every answer was written.
    Complete { len: usize, answers: u16 },
    /// The buffer ran out; only the first `answers` were kept.
    Truncated { len: usize, answers: u16 },
    /// Nothing to say; the buffer holds no response.
    NoAnswers,
}

impl BuildOutcome {
    /// Length of the response to send, if there is one.
    pub fn response_len(&self) -> Option<usize> {
        match *self {
            BuildOutcome::Complete { len, .. } | BuildOutcome::Truncated { len, .. } => Some(len),
            BuildOutcome::NoAnswers => None,
        }
    }

    pub fn answers(&self) -> u16 {
        match *self {
            BuildOutcome::Complete { answers, .. } | BuildOutcome::Truncated { answers, .. } => answers,
            BuildOutcome::NoAnswers => 0,
        }
    }
}

/// Answer an A or AAAA question from `host`.
///
/// Produces [`BuildOutcome::NoAnswers`] without touching `out` when the host
/// lacks the requested address family.
pub fn build_host_response(
    out: &mut [u8],
    question: &DnsQuestion,
    host: &HostRecord,
    options: ResponseOptions,
) -> Result<BuildOutcome, WireError> {
    let address = match (question.qtype, host.ipv4, host.ipv6) {
        (TYPE_A, Some(v4), _) => IpAddr::V4(v4),
        (TYPE_AAAA, _, Some(v6)) => IpAddr::V6(v6),
        _ => return Ok(BuildOutcome::NoAnswers),
    };

    let mut w = PacketWriter::new(out);
    write_header_and_question(&mut w, question)?;

    w.put_u16(QUESTION_NAME_POINTER)?;
    match address {
        IpAddr::V4(v4) => {
            w.put_u16(TYPE_A)?;
            w.put_u16(options.answer_class())?;
            w.put_u32(host.ttl)?;
            w.put_u16(4)?;
            w.put_slice(&v4.octets())?;
        }
        IpAddr::V6(v6) => {
            w.put_u16(TYPE_AAAA)?;
            w.put_u16(options.answer_class())?;
            w.put_u32(host.ttl)?;
            w.put_u16(16)?;
            w.put_slice(&v6.octets())?;
        }
    }

    w.patch_u16(ANCOUNT_OFFSET, 1);
    Ok(BuildOutcome::Complete {
        len: w.position(),
        answers: 1,
    })
}

/// Answer an SRV question with an SRV and a TXT record per service.
///
/// A service's two records are committed together: if the buffer fills up
/// part way through one, it is rolled back and the response ends with the
/// previous service. A service whose names cannot be encoded is skipped.
pub fn build_service_response(
    out: &mut [u8],
    question: &DnsQuestion,
    services: &[&ServiceRecord],
    options: ResponseOptions,
) -> Result<BuildOutcome, WireError> {
    if services.is_empty() {
        return Ok(BuildOutcome::NoAnswers);
    }

    let mut w = PacketWriter::new(out);
    write_header_and_question(&mut w, question)?;

    let class = options.answer_class();
    let mut answers: u16 = 0;
    let mut truncated = false;

    for svc in services {
        let commit = w.position();
        match write_service_answers(&mut w, svc, class) {
            Ok(()) => answers += 2,
            Err(WireError::BufferFull) => {
                w.truncate(commit);
                truncated = true;
                break;
            }
            Err(e) => {
                w.truncate(commit);
                tracing::warn!("Skipping service {} in response: {}", svc.key(), e);
            }
        }
    }

    if answers == 0 {
        return if truncated {
            Err(WireError::BufferFull)
        } else {
            Ok(BuildOutcome::NoAnswers)
        };
    }

    w.patch_u16(ANCOUNT_OFFSET, answers);
    let len = w.position();
    Ok(if truncated {
        BuildOutcome::Truncated { len, answers }
    } else {
        BuildOutcome::Complete { len, answers }
    })
}

/// Build a one-question query. `unicast` sets the QU bit on the question class.
pub fn build_query(name: &str, qtype: u16, unicast: bool) -> Result<Vec<u8>, WireError> {
    let mut packet = Vec::with_capacity(32 + name.len());
    // id, flags, qdcount, ancount, nscount, arcount
    packet.extend_from_slice(&[0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    packet.extend(encode_name(name)?);

    let qclass = if unicast { CLASS_IN | CLASS_TOP_BIT } else { CLASS_IN };
    packet.extend_from_slice(&qtype.to_be_bytes());
    packet.extend_from_slice(&qclass.to_be_bytes());
    Ok(packet)
}

fn write_header_and_question(w: &mut PacketWriter<'_>, question: &DnsQuestion) -> Result<(), WireError> {
    w.put_u16(0)?; // id
    w.put_u16(FLAG_RESPONSE | FLAG_AUTHORITATIVE)?;
    w.put_u16(1)?; // qdcount
    w.put_u16(0)?; // ancount, patched once known
    w.put_u16(0)?;
    w.put_u16(0)?;

    write_name(w, &question.name)?;
    w.put_u16(question.qtype)?;
    w.put_u16(question.qclass)
}

fn write_service_answers(
    w: &mut PacketWriter<'_>,
    svc: &ServiceRecord,
    class: u16,
) -> Result<(), WireError> {
    let owner = svc.key();
    let ttl = svc.effective_ttl();

    write_record(w, &owner, TYPE_SRV, class, ttl, |w| {
        w.put_u16(svc.priority)?;
        w.put_u16(svc.weight)?;
        w.put_u16(svc.port)?;
        write_name(w, &svc.target_host)
    })?;

    write_record(w, &owner, TYPE_TXT, class, ttl, |w| write_txt(w, &svc.txt))
}

/// Write one record, reserving RDLENGTH and patching it once RDATA is down.
fn write_record<F>(
    w: &mut PacketWriter<'_>,
    owner: &str,
    rtype: u16,
    class: u16,
    ttl: u32,
    rdata: F,
) -> Result<(), WireError>
where
    F: FnOnce(&mut PacketWriter<'_>) -> Result<(), WireError>,
{
    write_name(w, owner)?;
    w.put_u16(rtype)?;
    w.put_u16(class)?;
    w.put_u32(ttl)?;

    let rdlength_at = w.reserve_u16()?;
    let rdata_start = w.position();
    rdata(w)?;

    let rdlength = u16::try_from(w.position() - rdata_start).map_err(|_| WireError::BufferFull)?;
    w.patch_u16(rdlength_at, rdlength);
    Ok(())
}

/// TXT RDATA is never empty: no entries means one zero-length string.
fn write_txt(w: &mut PacketWriter<'_>, entries: &[String]) -> Result<(), WireError> {
    if entries.is_empty() {
        return w.put_u8(0);
    }

    for entry in entries {
        let len = u8::try_from(entry.len()).map_err(|_| WireError::TxtTooLong { len: entry.len() })?;
        w.put_u8(len)?;
        w.put_slice(entry.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use crate::protocol::{MAX_PACKET, TYPE_PTR};
    use crate::wire::message::{parse_message, RData};

    fn question(name: &str, qtype: u16) -> DnsQuestion {
        DnsQuestion {
            name: name.to_string(),
            qtype,
            qclass: CLASS_IN,
        }
    }

    fn service(instance: &str, txt: &[&str]) -> ServiceRecord {
        ServiceRecord {
            instance: instance.to_string(),
            service_type: "_http._tcp".to_string(),
            domain: "local".to_string(),
            priority: 0,
            weight: 5,
            port: 8080,
            target_host: "nas.local".to_string(),
            txt: txt.iter().map(|s| s.to_string()).collect(),
            ttl: 120,
        }
    }

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_be_bytes([buf[at], buf[at + 1]])
    }

    #[test]
    fn test_a_response_layout() {
        let host = HostRecord::new("foo", Some(Ipv4Addr::new(10, 0, 0, 5)), None, 120);
        let q = question("foo.local", TYPE_A);
        let mut buf = [0u8; MAX_PACKET];

        let outcome = build_host_response(&mut buf, &q, &host, ResponseOptions::default()).unwrap();
        let len = outcome.response_len().unwrap();
        let packet = &buf[..len];

        assert_eq!(outcome.answers(), 1);
        assert_eq!(u16_at(packet, 0), 0, "id");
        assert_eq!(u16_at(packet, 2), FLAG_RESPONSE | FLAG_AUTHORITATIVE);
        assert_eq!(u16_at(packet, 4), 1, "qdcount");
        assert_eq!(u16_at(packet, 6), 1, "ancount");

        // header + "\x03foo\x05local\x00" + qtype/qclass
        let answer = 12 + 11 + 4;
        assert_eq!(&packet[answer..answer + 2], &[0xC0, 0x0C]);
        assert_eq!(u16_at(packet, answer + 2), TYPE_A);
        assert_eq!(u16_at(packet, answer + 4), CLASS_IN | CLASS_TOP_BIT);
        assert_eq!(u16_at(packet, answer + 10), 4, "rdlength");
        assert_eq!(&packet[answer + 12..], &[10, 0, 0, 5]);
    }

    #[test]
    fn test_aaaa_response_parses_back() {
        let v6: Ipv6Addr = "fd00::1".parse().unwrap();
        let host = HostRecord::new("foo", None, Some(v6), 60);
        let q = question("FOO.local", TYPE_AAAA);
        let mut buf = [0u8; MAX_PACKET];

        let outcome = build_host_response(&mut buf, &q, &host, ResponseOptions { cache_flush: false }).unwrap();
        let message = parse_message(&buf[..outcome.response_len().unwrap()]).unwrap();

        assert_eq!(message.questions[0].name, "FOO.local");
        assert_eq!(message.answers.len(), 1);
        let answer = &message.answers[0];
        assert_eq!(answer.name, "FOO.local");
        assert_eq!(answer.ttl, 60);
        assert!(!answer.cache_flush);
        assert_eq!(answer.data, RData::Aaaa(v6));
    }

    #[test]
    fn test_missing_family_is_no_answers() {
        let host = HostRecord::new("foo", Some(Ipv4Addr::new(10, 0, 0, 5)), None, 120);
        let mut buf = [0u8; MAX_PACKET];

        let aaaa = build_host_response(&mut buf, &question("foo.local", TYPE_AAAA), &host, ResponseOptions::default());
        assert_eq!(aaaa, Ok(BuildOutcome::NoAnswers));

        let ptr = build_host_response(&mut buf, &question("foo.local", TYPE_PTR), &host, ResponseOptions::default());
        assert_eq!(ptr, Ok(BuildOutcome::NoAnswers));
    }

    #[test]
    fn test_host_response_buffer_too_small() {
        let host = HostRecord::new("foo", Some(Ipv4Addr::new(10, 0, 0, 5)), None, 120);
        let mut buf = [0u8; 30];

        let result = build_host_response(&mut buf, &question("foo.local", TYPE_A), &host, ResponseOptions::default());
        assert_eq!(result, Err(WireError::BufferFull));
    }

    #[test]
    fn test_service_response_counts_and_rdlengths() {
        let a = service("alpha", &["path=/", "v=1"]);
        let b = service("beta", &[]);
        let q = question("_http._tcp.local", TYPE_SRV);
        let mut buf = [0u8; MAX_PACKET];

        let outcome = build_service_response(&mut buf, &q, &[&a, &b], ResponseOptions::default()).unwrap();
        let len = outcome.response_len().unwrap();
        assert!(matches!(outcome, BuildOutcome::Complete { answers: 4, .. }));
        assert_eq!(u16_at(&buf, 6), 4);

        // parse_message only succeeds if every RDLENGTH lines up with its RDATA
        let message = parse_message(&buf[..len]).unwrap();
        assert_eq!(message.answers.len(), 4);

        assert_eq!(message.answers[0].name, "alpha._http._tcp.local");
        assert_eq!(
            message.answers[0].data,
            RData::Srv { priority: 0, weight: 5, port: 8080, target: "nas.local".to_string() }
        );
        assert_eq!(
            message.answers[1].data,
            RData::Txt(vec!["path=/".to_string(), "v=1".to_string()])
        );
        assert_eq!(message.answers[2].name, "beta._http._tcp.local");
        assert_eq!(message.answers[3].rtype, TYPE_TXT);
    }

    #[test]
    fn test_empty_txt_is_single_zero_length_string() {
        let svc = service("beta", &[]);
        let q = question("beta._http._tcp.local", TYPE_SRV);
        let mut buf = [0u8; MAX_PACKET];

        let len = build_service_response(&mut buf, &q, &[&svc], ResponseOptions::default())
            .unwrap()
            .response_len()
            .unwrap();

        // the TXT record is last: rdlength 1 followed by a zero byte
        assert_eq!(&buf[len - 3..len], &[0, 1, 0]);
    }

    #[test]
    fn test_truncates_to_whole_services() {
        let services = [service("one", &["k=v"]), service("two", &["k=v"]), service("six", &["k=v"])];
        let refs: Vec<&ServiceRecord> = services.iter().collect();
        let q = question("_http._tcp.local", TYPE_SRV);

        let mut big = [0u8; MAX_PACKET];
        let one_pair = build_service_response(&mut big, &q, &refs[..1], ResponseOptions::default())
            .unwrap()
            .response_len()
            .unwrap();

        let mut small = vec![0u8; one_pair + 10];
        let outcome = build_service_response(&mut small, &q, &refs, ResponseOptions::default()).unwrap();

        assert_eq!(outcome, BuildOutcome::Truncated { len: one_pair, answers: 2 });
        assert_eq!(u16_at(&small, 6), 2);
        assert_eq!(&small[..one_pair], &big[..one_pair]);
        assert_eq!(parse_message(&small[..one_pair]).unwrap().answers.len(), 2);
    }

    #[test]
    fn test_nothing_fits_is_an_error() {
        let svc = service("alpha", &[]);
        let q = question("_http._tcp.local", TYPE_SRV);
        let mut buf = [0u8; 40];

        let result = build_service_response(&mut buf, &q, &[&svc], ResponseOptions::default());
        assert_eq!(result, Err(WireError::BufferFull));
    }

    #[test]
    fn test_no_services_is_no_answers() {
        let q = question("_http._tcp.local", TYPE_SRV);
        let mut buf = [0u8; MAX_PACKET];
        assert_eq!(
            build_service_response(&mut buf, &q, &[], ResponseOptions::default()),
            Ok(BuildOutcome::NoAnswers)
        );
    }

    #[test]
    fn test_unencodable_service_is_skipped() {
        let bad = service(&"x".repeat(64), &[]);
        let good = service("good", &[]);
        let q = question("_http._tcp.local", TYPE_SRV);
        let mut buf = [0u8; MAX_PACKET];

        let outcome = build_service_response(&mut buf, &q, &[&bad, &good], ResponseOptions::default()).unwrap();
        let message = parse_message(&buf[..outcome.response_len().unwrap()]).unwrap();

        assert_eq!(outcome.answers(), 2);
        assert_eq!(message.answers[0].name, "good._http._tcp.local");
    }

    #[test]
    fn test_build_query() {
        let packet = build_query("_http._tcp.local", TYPE_PTR, true).unwrap();
        let message = parse_message(&packet).unwrap();

        assert!(!message.header.is_response());
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].name, "_http._tcp.local");
        assert_eq!(message.questions[0].qtype, TYPE_PTR);
        assert_eq!(message.questions[0].qclass, CLASS_IN | CLASS_TOP_BIT);
    }

    #[test]
    fn test_outcome_accessors() {
        let complete = BuildOutcome::Complete { len: 40, answers: 2 };
        assert_eq!(complete.response_len(), Some(40));
        assert_eq!(complete.answers(), 2);
        assert_eq!(BuildOutcome::NoAnswers.response_len(), None);
        assert_eq!(BuildOutcome::NoAnswers.answers(), 0);
    }
}
