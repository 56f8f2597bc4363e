use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cursor::{Reader, Width, Writer};
use crate::error::ProtocolError;
use crate::types::BridgeLetter;

/// First line of every reply SMS, followed by the localized prompt.
pub const REPLY_BANNER: &str = "SMSBridge Reply";

/// Wire generation of the outbound reply envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyGeneration {
    /// 4-byte ciphertext length, no trailing timestamp line.
    Legacy,
    /// 2-byte ciphertext length, trailing unix-timestamp line.
    Current,
}

impl ReplyGeneration {
    fn ciphertext_width(self) -> Width {
        match self {
            ReplyGeneration::Legacy => Width::U32,
            ReplyGeneration::Current => Width::U16,
        }
    }
}

/// Declared lengths of the six reply fields.
///
/// Travels in the clear ahead of the ciphertext so the client can split
/// the decrypted concatenation without any in-band delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLengths {
    pub address: u8,
    pub sender: u8,
    pub cc: u8,
    pub bcc: u8,
    pub subject: u8,
    pub body: u16,
}

impl FieldLengths {
    pub fn total(&self) -> usize {
        self.address as usize
            + self.sender as usize
            + self.cc as usize
            + self.bcc as usize
            + self.subject as usize
            + self.body as usize
    }

    fn write(&self, w: &mut Writer) {
        w.write_u8(self.address);
        w.write_u8(self.sender);
        w.write_u8(self.cc);
        w.write_u8(self.bcc);
        w.write_u8(self.subject);
        // Body is the only field long enough to need two bytes.
        w.write_uint(Width::U16, self.body as u64)
            .expect("u16 always fits its own width");
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            address: r.read_u8()?,
            sender: r.read_u8()?,
            cc: r.read_u8()?,
            bcc: r.read_u8()?,
            subject: r.read_u8()?,
            body: r.read_u16()?,
        })
    }
}

/// Outbound reply content before encryption.
///
/// The six values are concatenated without delimiters to form the
/// plaintext handed to the session cipher; `lengths()` describes how the
/// client cuts the decrypted text back apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyRecord {
    pub address: String,
    pub sender: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
}

impl ReplyRecord {
    /// The plaintext to encrypt: all six fields, back to back.
    pub fn plaintext(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.address.len()
                + self.sender.len()
                + self.cc.len()
                + self.bcc.len()
                + self.subject.len()
                + self.body.len(),
        );
        for field in [
            &self.address,
            &self.sender,
            &self.cc,
            &self.bcc,
            &self.subject,
            &self.body,
        ] {
            out.extend_from_slice(field.as_bytes());
        }
        out
    }

    /// Length descriptor for this record.
    ///
    /// Fails with `ValueOutOfRange` when a field exceeds its prefix
    /// width instead of silently truncating.
    pub fn lengths(&self) -> Result<FieldLengths, ProtocolError> {
        let narrow = |len: usize| -> Result<u8, ProtocolError> {
            u8::try_from(len).map_err(|_| ProtocolError::ValueOutOfRange {
                value: len as u64,
                width: 1,
            })
        };
        let body = u16::try_from(self.body.len()).map_err(|_| ProtocolError::ValueOutOfRange {
            value: self.body.len() as u64,
            width: 2,
        })?;
        Ok(FieldLengths {
            address: narrow(self.address.len())?,
            sender: narrow(self.sender.len())?,
            cc: narrow(self.cc.len())?,
            bcc: narrow(self.bcc.len())?,
            subject: narrow(self.subject.len())?,
            body,
        })
    }

    /// Rebuild a record from decrypted plaintext and its descriptor.
    pub fn from_plaintext(
        lengths: &FieldLengths,
        plaintext: &[u8],
    ) -> Result<Self, ProtocolError> {
        if lengths.total() != plaintext.len() {
            return Err(ProtocolError::MalformedContent(format!(
                "declared lengths sum to {}, plaintext is {} bytes",
                lengths.total(),
                plaintext.len()
            )));
        }
        let mut r = Reader::new(plaintext);
        let mut next = |len: usize| -> Result<String, ProtocolError> {
            let bytes = r.read_bytes(len)?;
            String::from_utf8(bytes.to_vec()).map_err(|_| {
                ProtocolError::MalformedContent("reply field is not valid UTF-8".into())
            })
        };
        Ok(Self {
            address: next(lengths.address as usize)?,
            sender: next(lengths.sender as usize)?,
            cc: next(lengths.cc as usize)?,
            bcc: next(lengths.bcc as usize)?,
            subject: next(lengths.subject as usize)?,
            body: next(lengths.body as usize)?,
        })
    }
}

/// The binary body of an outbound reply SMS.
///
/// Wire format:
/// ```text
/// [address: u8] [sender: u8] [cc: u8] [bcc: u8] [subject: u8] [body: u16 LE]
/// [len_ct: u16 LE (current) | u32 LE (legacy)] [bridge_letter: u8] [ciphertext]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub lengths: FieldLengths,
    pub bridge_letter: BridgeLetter,
    pub ciphertext: Vec<u8>,
}

impl ReplyEnvelope {
    pub fn encode(&self, generation: ReplyGeneration) -> Result<Vec<u8>, ProtocolError> {
        let mut w = Writer::with_capacity(16 + self.ciphertext.len());
        self.lengths.write(&mut w);
        w.write_uint(generation.ciphertext_width(), self.ciphertext.len() as u64)?;
        w.write_u8(self.bridge_letter.as_byte());
        w.write_bytes(&self.ciphertext);
        Ok(w.into_bytes())
    }

    pub fn decode(bytes: &[u8], generation: ReplyGeneration) -> Result<Self, ProtocolError> {
        let mut r = Reader::new(bytes);
        let lengths = FieldLengths::read(&mut r)?;
        let len_ct = r.read_uint(generation.ciphertext_width())? as usize;
        let bridge_letter = BridgeLetter::new(r.read_u8()?)?;
        let ciphertext = r.read_bytes(len_ct)?.to_vec();
        if !r.is_empty() {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "{} leftover bytes after reply ciphertext",
                r.remaining()
            )));
        }
        Ok(Self {
            lengths,
            bridge_letter,
            ciphertext,
        })
    }

    /// Render the full SMS text: banner + prompt, base64 body and, for
    /// the current generation, the timestamp line.
    pub fn to_sms_text(
        &self,
        generation: ReplyGeneration,
        prompt: &str,
        timestamp: u64,
    ) -> Result<String, ProtocolError> {
        let body = BASE64.encode(self.encode(generation)?);
        Ok(match generation {
            ReplyGeneration::Legacy => format!("{REPLY_BANNER} {prompt}\n{body}"),
            ReplyGeneration::Current => format!("{REPLY_BANNER} {prompt}\n{body}\n{timestamp}"),
        })
    }

    /// Strict inverse of [`to_sms_text`]; the timestamp line may be
    /// absent regardless of generation, for traffic from older senders.
    ///
    /// [`to_sms_text`]: Self::to_sms_text
    pub fn from_sms_text(
        text: &str,
        generation: ReplyGeneration,
    ) -> Result<(Self, Option<u64>), ProtocolError> {
        let mut lines = text.lines();
        let banner = lines
            .next()
            .filter(|line| line.starts_with(REPLY_BANNER))
            .ok_or_else(|| {
                ProtocolError::MalformedEnvelope("reply SMS is missing its banner line".into())
            })?;
        let _prompt = banner[REPLY_BANNER.len()..].trim_start();

        let body = lines.next().ok_or_else(|| {
            ProtocolError::MalformedEnvelope("reply SMS is missing its payload line".into())
        })?;
        let envelope = Self::decode(&BASE64.decode(body.trim())?, generation)?;

        let timestamp = match lines.next() {
            None => None,
            Some(line) => Some(line.trim().parse::<u64>().map_err(|_| {
                ProtocolError::MalformedEnvelope(format!("bad timestamp line {line:?}"))
            })?),
        };
        if lines.next().is_some() {
            return Err(ProtocolError::MalformedEnvelope(
                "unexpected extra lines in reply SMS".into(),
            ));
        }
        Ok((envelope, timestamp))
    }
}
