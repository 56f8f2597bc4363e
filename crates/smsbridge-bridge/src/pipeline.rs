use smsbridge_protocol::{
    BridgeLetter, ContentGeneration, ContentRecord, Envelope, LanguageCode, MarkerTable,
    ReplyEnvelope, ReplyGeneration, ReplyRecord, Version,
};
use tracing::debug;

use crate::bridge::DomainMessage;
use crate::cipher::SessionCipher;
use crate::error::BridgeError;
use crate::locale::{Localization, KEY_REPLY_PROMPT};
use crate::registry::BridgeRegistry;

/// Handshake material accompanying a versioned content payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub public_key: Vec<u8>,
    pub server_key_id: u8,
}

/// A fully decoded inbound content payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub version: Version,
    pub bridge_letter: BridgeLetter,
    pub language: Option<LanguageCode>,
    pub message: DomainMessage,
}

/// What an inbound SMS payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Legacy handshake opener; nothing to dispatch.
    AuthRequest { public_key: Vec<u8> },

    /// Legacy out-of-band verification code; nothing to dispatch.
    AuthCode { auth_code: String },

    /// Dispatched content, possibly accompanied by handshake material
    /// (versioned handshake) or a verification code (legacy switch 3).
    Message {
        message: InboundMessage,
        handshake: Option<Handshake>,
        auth_code: Option<String>,
    },
}

/// Inbound decode/dispatch and outbound reply assembly.
///
/// Every method is a pure function over its arguments; the pipeline
/// holds only the marker activation table and the bridge registry, both
/// immutable after startup.
pub struct Pipeline {
    registry: BridgeRegistry,
    markers: MarkerTable,
}

impl Pipeline {
    pub fn new(registry: BridgeRegistry, markers: MarkerTable) -> Self {
        Self { registry, markers }
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    /// Run one inbound SMS payload through detection, envelope decode,
    /// decryption, content decode and bridge dispatch.
    pub fn process_inbound(
        &self,
        content: &str,
        cipher: &dyn SessionCipher,
    ) -> Result<InboundOutcome, BridgeError> {
        let envelope = Envelope::from_base64(content, &self.markers)?;
        debug!(
            version = ?envelope.version(),
            kind = ?envelope.payload_kind(),
            "decoded inbound envelope"
        );

        match envelope {
            Envelope::AuthRequest { public_key } => Ok(InboundOutcome::AuthRequest { public_key }),
            Envelope::AuthCode { auth_code } => Ok(InboundOutcome::AuthCode { auth_code }),
            Envelope::LegacyContent {
                bridge_letter,
                ciphertext,
            } => {
                let message =
                    self.dispatch(Version::LegacyV0, bridge_letter, None, &ciphertext, cipher)?;
                Ok(InboundOutcome::Message {
                    message,
                    handshake: None,
                    auth_code: None,
                })
            }
            Envelope::AuthCodeWithContent {
                auth_code,
                bridge_letter,
                ciphertext,
            } => {
                let message =
                    self.dispatch(Version::LegacyV0, bridge_letter, None, &ciphertext, cipher)?;
                Ok(InboundOutcome::Message {
                    message,
                    handshake: None,
                    auth_code: Some(auth_code),
                })
            }
            Envelope::AuthRequestWithContent {
                version,
                public_key,
                server_key_id,
                bridge_letter,
                ciphertext,
                language,
            } => {
                let message = self.dispatch(version, bridge_letter, language, &ciphertext, cipher)?;
                Ok(InboundOutcome::Message {
                    message,
                    handshake: Some(Handshake {
                        public_key,
                        server_key_id,
                    }),
                    auth_code: None,
                })
            }
            Envelope::Content {
                version,
                bridge_letter,
                ciphertext,
                language,
            } => {
                let message = self.dispatch(version, bridge_letter, language, &ciphertext, cipher)?;
                Ok(InboundOutcome::Message {
                    message,
                    handshake: None,
                    auth_code: None,
                })
            }
        }
    }

    fn dispatch(
        &self,
        version: Version,
        bridge_letter: BridgeLetter,
        language: Option<LanguageCode>,
        ciphertext: &[u8],
        cipher: &dyn SessionCipher,
    ) -> Result<InboundMessage, BridgeError> {
        let bridge = self.registry.get(bridge_letter)?;
        let plaintext = cipher.decrypt(ciphertext)?;
        let record = ContentRecord::decode(&plaintext, ContentGeneration::for_version(version))?;
        let message = bridge.decode(&record)?;
        debug!(
            bridge = bridge.name(),
            to = record.to.as_deref().map(mask_sensitive).unwrap_or_default(),
            "dispatched inbound content"
        );
        Ok(InboundMessage {
            version,
            bridge_letter,
            language,
            message,
        })
    }

    /// Build the outbound reply SMS text for a platform reply.
    pub fn build_reply(
        &self,
        record: &ReplyRecord,
        bridge_letter: BridgeLetter,
        cipher: &dyn SessionCipher,
        locale: &Localization,
        generation: ReplyGeneration,
        timestamp: u64,
    ) -> Result<String, BridgeError> {
        // The letter must resolve even though the reply carries no record
        // to decode; an unroutable reply is caught here, not at the client.
        let bridge = self.registry.get(bridge_letter)?;

        let lengths = record.lengths()?;
        let ciphertext = cipher.encrypt(&record.plaintext())?;
        let envelope = ReplyEnvelope {
            lengths,
            bridge_letter,
            ciphertext,
        };
        let prompt = locale.translate(KEY_REPLY_PROMPT)?;
        let text = envelope.to_sms_text(generation, prompt, timestamp)?;
        debug!(
            bridge = bridge.name(),
            address = mask_sensitive(&record.address),
            locale = locale.active(),
            "built reply SMS"
        );
        Ok(text)
    }
}

/// Mask all but the last three characters of a sensitive value.
pub fn mask_sensitive(value: &str) -> String {
    let chars = value.chars().count();
    if chars <= 3 {
        return value.to_owned();
    }
    let tail: String = value.chars().skip(chars - 3).collect();
    format!("{}{tail}", "*".repeat(chars - 3))
}
