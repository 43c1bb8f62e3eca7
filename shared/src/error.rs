use thiserror::Error;

/// Failures while reading or writing DNS wire data.
///
/// Everything here is non-fatal: a packet that fails to parse is dropped and
/// a response that fails to build is not sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("reserved label type 0x{byte:02x} at offset {offset}")]
    BadLabelType { offset: usize, byte: u8 },

    #[error("label at offset {offset} runs past the end of the packet")]
    LabelOverrun { offset: usize },

    #[error("compression pointer at offset {offset} targets {target}, outside the packet")]
    PointerOutOfRange { offset: usize, target: usize },

    #[error("compression pointer loop detected at offset {offset}")]
    PointerLoop { offset: usize },

    #[error("domain name exceeds {max} bytes")]
    NameTooLong { max: usize },

    #[error("invalid UTF-8 in label at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("invalid label {label:?}: length must be 1..=63")]
    InvalidLabel { label: String },

    #[error("TXT string of {len} bytes exceeds 255")]
    TxtTooLong { len: usize },

    #[error("record data at offset {offset} overruns its length field")]
    RdataOverrun { offset: usize },

    #[error("output buffer full")]
    BufferFull,
}
