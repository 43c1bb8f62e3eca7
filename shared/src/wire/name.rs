//! Domain names in DNS wire format.
//!
//! Names are sequences of length-prefixed labels closed by a zero byte.
//! Decoding follows compression pointers (RFC 1035 §4.1.4); encoding never
//! produces them.

use crate::error::WireError;
use crate::protocol::{MAX_LABEL_LEN, MAX_NAME_LEN};
use crate::types::strip_trailing_dot;
use super::writer::PacketWriter;

const LABEL_TYPE_MASK: u8 = 0xC0;
const LABEL_LITERAL: u8 = 0x00;
const LABEL_POINTER: u8 = 0xC0;

/// Decode the name starting at `offset`.
///
/// Returns the dotted name (no trailing dot, `"."` for the root) and the
/// offset just past the name as it appears at `offset`. When the name ends
/// in a compression pointer that is the byte after the first pointer, no
/// matter how many further pointers were followed.
pub fn decode_name(packet: &[u8], offset: usize) -> Result<(String, usize), WireError> {
    let mut name = String::new();
    let mut pos = offset;
    let mut resume_at: Option<usize> = None;
    let mut hops = 0usize;

    loop {
        let len_byte = *packet
            .get(pos)
            .ok_or(WireError::LabelOverrun { offset: pos })?;

        match len_byte & LABEL_TYPE_MASK {
            LABEL_LITERAL if len_byte == 0 => {
                if name.is_empty() {
                    name.push('.');
                }
                return Ok((name, resume_at.unwrap_or(pos + 1)));
            }
            LABEL_LITERAL => {
                let len = len_byte as usize;
                let start = pos + 1;
                let raw = packet
                    .get(start..start + len)
                    .ok_or(WireError::LabelOverrun { offset: pos })?;

                let separator = usize::from(!name.is_empty());
                if name.len() + separator + len > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong { max: MAX_NAME_LEN });
                }
                let label = std::str::from_utf8(raw)
                    .map_err(|_| WireError::InvalidUtf8 { offset: start })?;

                if separator == 1 {
                    name.push('.');
                }
                name.push_str(label);
                pos = start + len;
            }
            LABEL_POINTER => {
                let low = *packet
                    .get(pos + 1)
                    .ok_or(WireError::LabelOverrun { offset: pos })?;
                let target = (usize::from(len_byte & !LABEL_TYPE_MASK) << 8) | usize::from(low);

                if target >= packet.len() {
                    return Err(WireError::PointerOutOfRange { offset: pos, target });
                }
                hops += 1;
                if hops > packet.len() {
                    return Err(WireError::PointerLoop { offset: pos });
                }

                resume_at.get_or_insert(pos + 2);
                pos = target;
            }
            _ => return Err(WireError::BadLabelType { offset: pos, byte: len_byte }),
        }
    }
}

/// Encode `name` as uncompressed labels plus the zero terminator.
pub fn encode_name(name: &str) -> Result<Vec<u8>, WireError> {
    let labels = split_labels(name)?;
    let mut out = Vec::with_capacity(name.len() + 2);
    for label in labels {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(out)
}

/// Same encoding as [`encode_name`], written straight into `w`.
pub fn write_name(w: &mut PacketWriter<'_>, name: &str) -> Result<(), WireError> {
    for label in split_labels(name)? {
        w.put_u8(label.len() as u8)?;
        w.put_slice(label.as_bytes())?;
    }
    w.put_u8(0)
}

/// Validate and split a dotted name. One trailing dot is accepted; the root
/// (`"."` or `""`) has no labels.
fn split_labels(name: &str) -> Result<Vec<&str>, WireError> {
    let name = strip_trailing_dot(name);
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let labels: Vec<&str> = name.split('.').collect();
    if let Some(bad) = labels
        .iter()
        .find(|label| label.is_empty() || label.len() > MAX_LABEL_LEN)
    {
        return Err(WireError::InvalidLabel { label: bad.to_string() });
    }

    let encoded_len: usize = labels.iter().map(|label| label.len() + 1).sum::<usize>() + 1;
    if encoded_len > MAX_NAME_LEN {
        return Err(WireError::NameTooLong { max: MAX_NAME_LEN });
    }

    Ok(labels)
}
