use crate::cursor::{Reader, Width, Writer};
use crate::detect::{LegacyKind, MarkerTable, PayloadKind, Version, VersionedKind};
use crate::error::ProtocolError;
use crate::types::{BridgeLetter, LanguageCode};

/// A decoded inbound envelope.
///
/// One variant per (version, payload type) layout; which optional fields
/// are populated is fixed by the variant, never by the data.
///
/// Legacy (V0) wire formats, selected by the switch byte:
/// ```text
/// [0x00] [len: u32 LE] [client_public_key]
/// [0x01] [len: u8] [auth_code]
/// [0x02] [bridge_letter: u8] [ciphertext...]
/// [0x03] [len: u8] [auth_code] [bridge_letter: u8] [ciphertext...]
/// ```
///
/// Marker-versioned wire formats (V1 = 0x0A, V2 = 0x02, V3 = 0x03,
/// V4 = 0x04; byte 1 selects the kind):
/// ```text
/// [marker] [0x00] [len_pk: u8] [len_ct: u16 LE] [bridge_letter: u8]
///          [server_key_id: u8] [public_key] [ciphertext] [language: 2 bytes, optional]
/// [marker] [0x01] [len_ct: u16 LE] [bridge_letter: u8] [ciphertext]
///          [language: 2 bytes, optional]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Legacy handshake: the client's public key, nothing else.
    AuthRequest { public_key: Vec<u8> },

    /// Legacy out-of-band verification code.
    AuthCode { auth_code: String },

    /// Legacy content: bridge letter plus ciphertext to the end of input.
    LegacyContent {
        bridge_letter: BridgeLetter,
        ciphertext: Vec<u8>,
    },

    /// Legacy verification code combined with a first content payload.
    AuthCodeWithContent {
        auth_code: String,
        bridge_letter: BridgeLetter,
        ciphertext: Vec<u8>,
    },

    /// Versioned handshake carrying the first content payload alongside
    /// the client public key and the server key the client ratcheted to.
    AuthRequestWithContent {
        version: Version,
        public_key: Vec<u8>,
        server_key_id: u8,
        bridge_letter: BridgeLetter,
        ciphertext: Vec<u8>,
        language: Option<LanguageCode>,
    },

    /// Versioned content payload.
    Content {
        version: Version,
        bridge_letter: BridgeLetter,
        ciphertext: Vec<u8>,
        language: Option<LanguageCode>,
    },
}

impl Envelope {
    /// Decode an inbound SMS payload still in its base64 text form.
    pub fn from_base64(content: &str, table: &MarkerTable) -> Result<Self, ProtocolError> {
        use base64::Engine;
        let payload = base64::engine::general_purpose::STANDARD.decode(content.trim())?;
        Self::decode(&payload, table)
    }

    /// Decode a raw (post-base64) envelope, classifying it first.
    pub fn decode(payload: &[u8], table: &MarkerTable) -> Result<Self, ProtocolError> {
        let (version, kind) = table.classify(payload)?;
        match kind {
            PayloadKind::Legacy(kind) => Self::decode_legacy(kind, &payload[1..]),
            PayloadKind::Versioned(kind) => Self::decode_versioned(version, kind, &payload[2..]),
        }
    }

    fn decode_legacy(kind: LegacyKind, body: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = Reader::new(body);
        let envelope = match kind {
            LegacyKind::AuthRequest => {
                let len = r.read_u32()? as usize;
                let public_key = r.read_bytes(len)?.to_vec();
                Envelope::AuthRequest { public_key }
            }
            LegacyKind::AuthCode => {
                let len = r.read_u8()? as usize;
                let auth_code = read_utf8(&mut r, len, "auth code")?;
                Envelope::AuthCode { auth_code }
            }
            LegacyKind::Content => {
                let bridge_letter = BridgeLetter::new(r.read_u8()?)?;
                let ciphertext = r.take_rest().to_vec();
                Envelope::LegacyContent {
                    bridge_letter,
                    ciphertext,
                }
            }
            LegacyKind::AuthCodeWithContent => {
                let len = r.read_u8()? as usize;
                let auth_code = read_utf8(&mut r, len, "auth code")?;
                let bridge_letter = BridgeLetter::new(r.read_u8()?)?;
                let ciphertext = r.take_rest().to_vec();
                Envelope::AuthCodeWithContent {
                    auth_code,
                    bridge_letter,
                    ciphertext,
                }
            }
        };
        expect_consumed(&r)?;
        Ok(envelope)
    }

    fn decode_versioned(
        version: Version,
        kind: VersionedKind,
        body: &[u8],
    ) -> Result<Self, ProtocolError> {
        let mut r = Reader::new(body);
        let envelope = match kind {
            VersionedKind::AuthRequestWithContent => {
                let len_pk = r.read_u8()? as usize;
                let len_ct = r.read_u16()? as usize;
                let bridge_letter = BridgeLetter::new(r.read_u8()?)?;
                let server_key_id = r.read_u8()?;
                let public_key = r.read_bytes(len_pk)?.to_vec();
                let ciphertext = r.read_bytes(len_ct)?.to_vec();
                let language = read_trailing_language(&mut r)?;
                Envelope::AuthRequestWithContent {
                    version,
                    public_key,
                    server_key_id,
                    bridge_letter,
                    ciphertext,
                    language,
                }
            }
            VersionedKind::Content => {
                let len_ct = r.read_u16()? as usize;
                let bridge_letter = BridgeLetter::new(r.read_u8()?)?;
                let ciphertext = r.read_bytes(len_ct)?.to_vec();
                let language = read_trailing_language(&mut r)?;
                Envelope::Content {
                    version,
                    bridge_letter,
                    ciphertext,
                    language,
                }
            }
        };
        expect_consumed(&r)?;
        Ok(envelope)
    }

    /// Encode the envelope back to its exact wire form.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut w = Writer::new();
        match self {
            Envelope::AuthRequest { public_key } => {
                w.write_u8(LegacyKind::AuthRequest as u8);
                w.write_uint(Width::U32, public_key.len() as u64)?;
                w.write_bytes(public_key);
            }
            Envelope::AuthCode { auth_code } => {
                w.write_u8(LegacyKind::AuthCode as u8);
                w.write_uint(Width::U8, auth_code.len() as u64)?;
                w.write_bytes(auth_code.as_bytes());
            }
            Envelope::LegacyContent {
                bridge_letter,
                ciphertext,
            } => {
                w.write_u8(LegacyKind::Content as u8);
                w.write_u8(bridge_letter.as_byte());
                w.write_bytes(ciphertext);
            }
            Envelope::AuthCodeWithContent {
                auth_code,
                bridge_letter,
                ciphertext,
            } => {
                w.write_u8(LegacyKind::AuthCodeWithContent as u8);
                w.write_uint(Width::U8, auth_code.len() as u64)?;
                w.write_bytes(auth_code.as_bytes());
                w.write_u8(bridge_letter.as_byte());
                w.write_bytes(ciphertext);
            }
            Envelope::AuthRequestWithContent {
                version,
                public_key,
                server_key_id,
                bridge_letter,
                ciphertext,
                language,
            } => {
                w.write_u8(marker_of(*version)?);
                w.write_u8(VersionedKind::AuthRequestWithContent as u8);
                w.write_uint(Width::U8, public_key.len() as u64)?;
                w.write_uint(Width::U16, ciphertext.len() as u64)?;
                w.write_u8(bridge_letter.as_byte());
                w.write_u8(*server_key_id);
                w.write_bytes(public_key);
                w.write_bytes(ciphertext);
                if let Some(lang) = language {
                    w.write_bytes(lang.as_bytes());
                }
            }
            Envelope::Content {
                version,
                bridge_letter,
                ciphertext,
                language,
            } => {
                w.write_u8(marker_of(*version)?);
                w.write_u8(VersionedKind::Content as u8);
                w.write_uint(Width::U16, ciphertext.len() as u64)?;
                w.write_u8(bridge_letter.as_byte());
                w.write_bytes(ciphertext);
                if let Some(lang) = language {
                    w.write_bytes(lang.as_bytes());
                }
            }
        }
        Ok(w.into_bytes())
    }

    /// Wire-format generation of this envelope.
    pub fn version(&self) -> Version {
        match self {
            Envelope::AuthRequest { .. }
            | Envelope::AuthCode { .. }
            | Envelope::LegacyContent { .. }
            | Envelope::AuthCodeWithContent { .. } => Version::LegacyV0,
            Envelope::AuthRequestWithContent { version, .. }
            | Envelope::Content { version, .. } => *version,
        }
    }

    /// Payload type, matching what the detector reports for these bytes.
    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Envelope::AuthRequest { .. } => PayloadKind::Legacy(LegacyKind::AuthRequest),
            Envelope::AuthCode { .. } => PayloadKind::Legacy(LegacyKind::AuthCode),
            Envelope::LegacyContent { .. } => PayloadKind::Legacy(LegacyKind::Content),
            Envelope::AuthCodeWithContent { .. } => {
                PayloadKind::Legacy(LegacyKind::AuthCodeWithContent)
            }
            Envelope::AuthRequestWithContent { .. } => {
                PayloadKind::Versioned(VersionedKind::AuthRequestWithContent)
            }
            Envelope::Content { .. } => PayloadKind::Versioned(VersionedKind::Content),
        }
    }

    pub fn bridge_letter(&self) -> Option<BridgeLetter> {
        match self {
            Envelope::AuthRequest { .. } | Envelope::AuthCode { .. } => None,
            Envelope::LegacyContent { bridge_letter, .. }
            | Envelope::AuthCodeWithContent { bridge_letter, .. }
            | Envelope::AuthRequestWithContent { bridge_letter, .. }
            | Envelope::Content { bridge_letter, .. } => Some(*bridge_letter),
        }
    }

    pub fn ciphertext(&self) -> Option<&[u8]> {
        match self {
            Envelope::AuthRequest { .. } | Envelope::AuthCode { .. } => None,
            Envelope::LegacyContent { ciphertext, .. }
            | Envelope::AuthCodeWithContent { ciphertext, .. }
            | Envelope::AuthRequestWithContent { ciphertext, .. }
            | Envelope::Content { ciphertext, .. } => Some(ciphertext),
        }
    }

    pub fn language(&self) -> Option<LanguageCode> {
        match self {
            Envelope::AuthRequestWithContent { language, .. }
            | Envelope::Content { language, .. } => *language,
            _ => None,
        }
    }
}

fn marker_of(version: Version) -> Result<u8, ProtocolError> {
    version.marker().ok_or_else(|| {
        ProtocolError::MalformedEnvelope(
            "versioned envelope cannot carry the unmarked legacy version".into(),
        )
    })
}

fn read_utf8(r: &mut Reader<'_>, len: usize, what: &str) -> Result<String, ProtocolError> {
    let bytes = r.read_bytes(len)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ProtocolError::MalformedEnvelope(format!("{what} is not valid UTF-8")))
}

/// The versioned layouts may end with a 2-byte language tag. Exactly zero
/// or two trailing bytes are legal; anything else is a framing error.
fn read_trailing_language(r: &mut Reader<'_>) -> Result<Option<LanguageCode>, ProtocolError> {
    match r.remaining() {
        0 => Ok(None),
        2 => {
            let bytes = r.read_bytes(2)?;
            Ok(Some(LanguageCode::new([bytes[0], bytes[1]])?))
        }
        n => Err(ProtocolError::MalformedEnvelope(format!(
            "{n} trailing bytes after declared fields"
        ))),
    }
}

fn expect_consumed(r: &Reader<'_>) -> Result<(), ProtocolError> {
    if !r.is_empty() {
        return Err(ProtocolError::MalformedEnvelope(format!(
            "{} leftover bytes after decoding",
            r.remaining()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MarkerTable {
        MarkerTable::current()
    }

    #[test]
    fn legacy_auth_request_known_bytes() {
        // [0x00][0x0E,0x00,0x00,0x00]["client_pub_key"]
        let envelope = Envelope::AuthRequest {
            public_key: b"client_pub_key".to_vec(),
        };
        let bytes = envelope.encode().unwrap();
        let mut expected = vec![0x00, 0x0E, 0x00, 0x00, 0x00];
        expected.extend_from_slice(b"client_pub_key");
        assert_eq!(bytes, expected);

        let decoded = Envelope::decode(&bytes, &table()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(
            decoded.payload_kind(),
            PayloadKind::Legacy(LegacyKind::AuthRequest)
        );
    }

    #[test]
    fn legacy_auth_code_roundtrip() {
        let envelope = Envelope::AuthCode {
            auth_code: "123456".into(),
        };
        let bytes = envelope.encode().unwrap();
        assert_eq!(&bytes[..2], &[0x01, 0x06]);
        assert_eq!(Envelope::decode(&bytes, &table()).unwrap(), envelope);
    }

    #[test]
    fn legacy_content_consumes_rest() {
        let bytes = [&[0x02, b'e'][..], b"ciphertext"].concat();
        let decoded = Envelope::decode(&bytes, &table()).unwrap();
        match &decoded {
            Envelope::LegacyContent {
                bridge_letter,
                ciphertext,
            } => {
                assert_eq!(bridge_letter.as_char(), 'e');
                assert_eq!(ciphertext, b"ciphertext");
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(decoded.encode().unwrap(), bytes);
    }

    #[test]
    fn legacy_auth_code_with_content_roundtrip() {
        // Only reachable when 0x03 is not an active marker.
        let table = MarkerTable::new([0x0A]).unwrap();
        let envelope = Envelope::AuthCodeWithContent {
            auth_code: "987654".into(),
            bridge_letter: BridgeLetter::from_char('e').unwrap(),
            ciphertext: vec![0xDE, 0xAD],
        };
        let bytes = envelope.encode().unwrap();
        assert_eq!(bytes[0], 0x03);
        assert_eq!(Envelope::decode(&bytes, &table).unwrap(), envelope);
    }

    #[test]
    fn versioned_handshake_known_bytes() {
        // [0x0A][0x00][len_pk=5][len_ct=10 LE]['e'][skid=2]["key12"]["ciphertext"]
        let bytes = [
            &[0x0A, 0x00, 0x05, 0x0A, 0x00, b'e', 0x02][..],
            b"key12",
            b"ciphertext",
        ]
        .concat();
        let decoded = Envelope::decode(&bytes, &table()).unwrap();
        match &decoded {
            Envelope::AuthRequestWithContent {
                version,
                public_key,
                server_key_id,
                bridge_letter,
                ciphertext,
                language,
            } => {
                assert_eq!(*version, Version::V1);
                assert_eq!(public_key, b"key12");
                assert_eq!(*server_key_id, 2);
                assert_eq!(bridge_letter.as_char(), 'e');
                assert_eq!(ciphertext, b"ciphertext");
                assert_eq!(*language, None);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(decoded.encode().unwrap(), bytes);
    }

    #[test]
    fn versioned_content_with_language() {
        // [0x0A][0x01][len_ct=4 LE]['e']["data"]["fr"]
        let bytes = [&[0x0A, 0x01, 0x04, 0x00, b'e'][..], b"data", b"fr"].concat();
        let decoded = Envelope::decode(&bytes, &table()).unwrap();
        match &decoded {
            Envelope::Content {
                version,
                bridge_letter,
                ciphertext,
                language,
            } => {
                assert_eq!(*version, Version::V1);
                assert_eq!(bridge_letter.as_char(), 'e');
                assert_eq!(ciphertext, b"data");
                assert_eq!(language.unwrap().as_str(), "fr");
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert_eq!(decoded.encode().unwrap(), bytes);
    }

    #[test]
    fn versioned_content_without_language() {
        let bytes = [&[0x03, 0x01, 0x06, 0x00, b't'][..], b"abcdef"].concat();
        let decoded = Envelope::decode(&bytes, &table()).unwrap();
        assert_eq!(decoded.version(), Version::V3);
        assert_eq!(decoded.language(), None);
        assert_eq!(decoded.ciphertext().unwrap(), b"abcdef");
    }

    #[test]
    fn one_trailing_byte_is_malformed() {
        let bytes = [&[0x0A, 0x01, 0x04, 0x00, b'e'][..], b"data", b"f"].concat();
        assert!(matches!(
            Envelope::decode(&bytes, &table()).unwrap_err(),
            ProtocolError::MalformedEnvelope(_)
        ));
    }

    #[test]
    fn legacy_leftover_bytes_are_malformed() {
        // Declared key length 2, three key bytes supplied.
        let bytes = [0x00, 0x02, 0x00, 0x00, 0x00, b'a', b'b', b'c'];
        assert!(matches!(
            Envelope::decode(&bytes, &table()).unwrap_err(),
            ProtocolError::MalformedEnvelope(_)
        ));
    }

    #[test]
    fn truncation_by_one_byte_always_fails() {
        let envelopes = vec![
            Envelope::AuthRequest {
                public_key: b"client_pub_key".to_vec(),
            },
            Envelope::AuthCode {
                auth_code: "123456".into(),
            },
            Envelope::AuthRequestWithContent {
                version: Version::V1,
                public_key: b"pk".to_vec(),
                server_key_id: 1,
                bridge_letter: BridgeLetter::from_char('e').unwrap(),
                ciphertext: b"ct".to_vec(),
                language: Some(LanguageCode::parse("en").unwrap()),
            },
            Envelope::Content {
                version: Version::V4,
                bridge_letter: BridgeLetter::from_char('m').unwrap(),
                ciphertext: b"payload".to_vec(),
                language: None,
            },
        ];
        for envelope in envelopes {
            let bytes = envelope.encode().unwrap();
            let truncated = &bytes[..bytes.len() - 1];
            assert!(
                Envelope::decode(truncated, &table()).is_err(),
                "truncated {envelope:?} decoded"
            );
        }
    }

    #[test]
    fn declared_length_beyond_buffer_is_truncated_input() {
        // len_ct says 100 bytes, only 4 present. Must fail before allocating.
        let bytes = [&[0x0A, 0x01, 0x64, 0x00, b'e'][..], b"data"].concat();
        assert!(matches!(
            Envelope::decode(&bytes, &table()).unwrap_err(),
            ProtocolError::TruncatedInput { .. }
        ));
    }

    #[test]
    fn oversized_field_rejected_at_encode() {
        let envelope = Envelope::AuthCode {
            auth_code: "x".repeat(300),
        };
        assert!(matches!(
            envelope.encode().unwrap_err(),
            ProtocolError::ValueOutOfRange { .. }
        ));

        let envelope = Envelope::Content {
            version: Version::V1,
            bridge_letter: BridgeLetter::from_char('e').unwrap(),
            ciphertext: vec![0; 70_000],
            language: None,
        };
        assert!(matches!(
            envelope.encode().unwrap_err(),
            ProtocolError::ValueOutOfRange { .. }
        ));
    }

    #[test]
    fn legacy_version_cannot_be_encoded_as_versioned() {
        let envelope = Envelope::Content {
            version: Version::LegacyV0,
            bridge_letter: BridgeLetter::from_char('e').unwrap(),
            ciphertext: vec![1],
            language: None,
        };
        assert!(envelope.encode().is_err());
    }

    #[test]
    fn roundtrip_all_versioned_markers() {
        let table = MarkerTable::new([0x0A, 0x02, 0x03, 0x04]).unwrap();
        for version in [Version::V1, Version::V2, Version::V3, Version::V4] {
            let envelope = Envelope::Content {
                version,
                bridge_letter: BridgeLetter::from_char('e').unwrap(),
                ciphertext: b"opaque".to_vec(),
                language: Some(LanguageCode::parse("de").unwrap()),
            };
            let bytes = envelope.encode().unwrap();
            assert_eq!(Envelope::decode(&bytes, &table).unwrap(), envelope);
        }
    }

    #[test]
    fn from_base64_roundtrip() {
        use base64::Engine;
        let envelope = Envelope::Content {
            version: Version::V1,
            bridge_letter: BridgeLetter::from_char('e').unwrap(),
            ciphertext: b"opaque".to_vec(),
            language: None,
        };
        let text = base64::engine::general_purpose::STANDARD.encode(envelope.encode().unwrap());
        assert_eq!(Envelope::from_base64(&text, &table()).unwrap(), envelope);
        assert!(matches!(
            Envelope::from_base64("!!not base64!!", &table()).unwrap_err(),
            ProtocolError::Base64(_)
        ));
    }

    #[test]
    fn empty_ciphertext_is_legal() {
        let envelope = Envelope::Content {
            version: Version::V1,
            bridge_letter: BridgeLetter::from_char('e').unwrap(),
            ciphertext: Vec::new(),
            language: None,
        };
        let bytes = envelope.encode().unwrap();
        assert_eq!(Envelope::decode(&bytes, &table()).unwrap(), envelope);
    }
}
