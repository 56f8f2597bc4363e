//! Wire formats for the SMSBridge payload protocol.
//!
//! Inbound messages arrive as base64 text decoding to one of several
//! coexisting binary envelope generations: the original unmarked legacy
//! format (a switch byte in 0..=3) and the marker-versioned formats that
//! followed it. The decrypted content inside an envelope has its own
//! generations, from delimited text up to bitmap-flagged fields with
//! chunked image attachments. Outbound replies use a separate envelope
//! wrapped in a fixed SMS banner.
//!
//! Everything here is a pure, synchronous function over in-memory
//! buffers; encryption, transport and per-platform bridge behavior live
//! elsewhere. Every length prefix is checked against the remaining input
//! before any allocation it sizes.

pub mod content;
pub mod cursor;
pub mod detect;
pub mod envelope;
pub mod error;
pub mod reply;
pub mod types;

pub use content::{ContentGeneration, ContentRecord, ImageAttachment, ImageSegment};
pub use detect::{LegacyKind, MarkerTable, PayloadKind, Version, VersionedKind};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use reply::{FieldLengths, ReplyEnvelope, ReplyGeneration, ReplyRecord, REPLY_BANNER};
pub use types::{BridgeLetter, LanguageCode};
