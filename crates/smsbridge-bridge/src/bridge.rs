use smsbridge_protocol::{BridgeLetter, ContentRecord, ImageAttachment};

use crate::error::BridgeError;

/// A platform message decoded from a content record.
///
/// One variant per supported platform family; bridges produce and
/// consume these without knowing anything about envelopes or ciphers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainMessage {
    Email(EmailMessage),
}

/// An outgoing email assembled from a decrypted content record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<ImageAttachment>,
}

/// Capability registered for one bridge letter.
///
/// Both directions are pure: a record in, a domain message out, and the
/// exact inverse for replies. Transport and delivery live behind the
/// registry, outside this crate.
pub trait Bridge: Send + Sync {
    /// The letter this bridge claims in envelopes.
    fn letter(&self) -> BridgeLetter;

    /// Human-readable bridge name, for logs and error messages.
    fn name(&self) -> &str;

    fn decode(&self, record: &ContentRecord) -> Result<DomainMessage, BridgeError>;

    fn encode(&self, message: &DomainMessage) -> Result<ContentRecord, BridgeError>;
}

impl std::fmt::Debug for dyn Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("letter", &self.letter())
            .field("name", &self.name())
            .finish()
    }
}
