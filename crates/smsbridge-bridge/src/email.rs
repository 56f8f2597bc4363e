use smsbridge_protocol::{BridgeLetter, ContentRecord};

use crate::bridge::{Bridge, DomainMessage, EmailMessage};
use crate::error::BridgeError;

/// Letter the email bridge has always claimed on the wire.
pub const EMAIL_BRIDGE_LETTER: char = 'e';

/// The email platform bridge.
///
/// A record must name at least one recipient and carry a body; the other
/// fields default to empty. Optional fields that arrive present-but-empty
/// are treated the same as absent ones here, since an empty cc header is
/// meaningless to a mail composer.
pub struct EmailBridge {
    letter: BridgeLetter,
}

impl EmailBridge {
    pub fn new() -> Self {
        Self {
            letter: BridgeLetter::from_char(EMAIL_BRIDGE_LETTER)
                .expect("'e' is printable ASCII"),
        }
    }
}

impl Default for EmailBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge for EmailBridge {
    fn letter(&self) -> BridgeLetter {
        self.letter
    }

    fn name(&self) -> &str {
        "email"
    }

    fn decode(&self, record: &ContentRecord) -> Result<DomainMessage, BridgeError> {
        let to = record
            .to
            .as_deref()
            .filter(|to| !to.is_empty())
            .ok_or(BridgeError::MissingField { field: "to" })?;
        let body = record
            .body
            .as_deref()
            .ok_or(BridgeError::MissingField { field: "body" })?;

        Ok(DomainMessage::Email(EmailMessage {
            to: to.to_owned(),
            cc: record.cc.clone().unwrap_or_default(),
            bcc: record.bcc.clone().unwrap_or_default(),
            subject: record.subject.clone().unwrap_or_default(),
            body: body.to_owned(),
            attachment: record.image.clone(),
        }))
    }

    fn encode(&self, message: &DomainMessage) -> Result<ContentRecord, BridgeError> {
        let DomainMessage::Email(email) = message;
        if email.to.is_empty() {
            return Err(BridgeError::MissingField { field: "to" });
        }
        let optional = |value: &String| {
            if value.is_empty() {
                None
            } else {
                Some(value.clone())
            }
        };
        Ok(ContentRecord {
            from: None,
            to: Some(email.to.clone()),
            cc: optional(&email.cc),
            bcc: optional(&email.bcc),
            subject: optional(&email.subject),
            body: Some(email.body.clone()),
            image: email.attachment.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsbridge_protocol::{ImageAttachment, ImageSegment};

    #[test]
    fn decode_full_record() {
        let record = ContentRecord {
            to: Some("a@x.com".into()),
            cc: Some("b@x.com".into()),
            subject: Some("Hi".into()),
            body: Some("Hello".into()),
            ..Default::default()
        };
        let DomainMessage::Email(email) = EmailBridge::new().decode(&record).unwrap();
        assert_eq!(email.to, "a@x.com");
        assert_eq!(email.cc, "b@x.com");
        assert_eq!(email.bcc, "");
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.body, "Hello");
        assert!(email.attachment.is_none());
    }

    #[test]
    fn decode_requires_recipient_and_body() {
        let bridge = EmailBridge::new();

        let record = ContentRecord {
            body: Some("orphan".into()),
            ..Default::default()
        };
        assert!(matches!(
            bridge.decode(&record).unwrap_err(),
            BridgeError::MissingField { field: "to" }
        ));

        let record = ContentRecord {
            to: Some("a@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            bridge.decode(&record).unwrap_err(),
            BridgeError::MissingField { field: "body" }
        ));
    }

    #[test]
    fn encode_roundtrips_through_decode() {
        let message = DomainMessage::Email(EmailMessage {
            to: "a@x.com".into(),
            subject: "Re: ping".into(),
            body: "pong".into(),
            ..Default::default()
        });
        let bridge = EmailBridge::new();
        let record = bridge.encode(&message).unwrap();
        assert_eq!(record.cc, None);
        assert_eq!(bridge.decode(&record).unwrap(), message);
    }

    #[test]
    fn attachment_passes_through() {
        let message = DomainMessage::Email(EmailMessage {
            to: "a@x.com".into(),
            body: "see attached".into(),
            attachment: Some(ImageAttachment {
                session: 9,
                segment: ImageSegment { index: 0, total: 1 },
                data: vec![1, 2, 3],
            }),
            ..Default::default()
        });
        let bridge = EmailBridge::new();
        let record = bridge.encode(&message).unwrap();
        assert!(record.image.is_some());
        assert_eq!(bridge.decode(&record).unwrap(), message);
    }

    #[test]
    fn encode_rejects_empty_recipient() {
        let message = DomainMessage::Email(EmailMessage {
            body: "no one to send to".into(),
            ..Default::default()
        });
        assert!(EmailBridge::new().encode(&message).is_err());
    }
}
