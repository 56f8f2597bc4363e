use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("input truncated: needed {needed} more bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("malformed content: {0}")]
    MalformedContent(String),

    #[error("value {value} does not fit in a {width}-byte field")]
    ValueOutOfRange { value: u64, width: usize },

    #[error("unrecognized format: leading byte 0x{marker:02x}")]
    UnrecognizedFormat { marker: u8 },

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
