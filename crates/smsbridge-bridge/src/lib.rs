//! Bridge dispatch for the SMS payload protocol.
//!
//! [`smsbridge_protocol`] gets payloads on and off the wire; this crate
//! decides what they mean. It routes decoded content records to a
//! platform [`Bridge`] by letter, assembles outbound reply SMS text,
//! and carries the deployment-facing pieces around that core: the
//! bridge manifest, reply-text localization, and the session cipher
//! seam.

pub mod bridge;
pub mod cipher;
pub mod email;
pub mod error;
pub mod locale;
pub mod manifest;
pub mod pipeline;
pub mod registry;

pub use bridge::{Bridge, DomainMessage, EmailMessage};
pub use cipher::SessionCipher;
pub use email::{EmailBridge, EMAIL_BRIDGE_LETTER};
pub use error::BridgeError;
pub use locale::{Localization, KEY_REPLY_PROMPT};
pub use manifest::{BridgeManifest, BridgeManifestEntry};
pub use pipeline::{mask_sensitive, Handshake, InboundMessage, InboundOutcome, Pipeline};
pub use registry::BridgeRegistry;
