use crate::error::ProtocolError;

/// Single-character identifier selecting the target platform bridge.
///
/// Carried as one byte at a fixed position in every content-bearing
/// envelope; must be printable ASCII so it survives text transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeLetter(u8);

impl BridgeLetter {
    pub fn new(byte: u8) -> Result<Self, ProtocolError> {
        if !byte.is_ascii_graphic() {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "bridge letter 0x{byte:02x} is not printable ASCII"
            )));
        }
        Ok(Self(byte))
    }

    pub fn from_char(c: char) -> Result<Self, ProtocolError> {
        if !c.is_ascii() {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "bridge letter {c:?} is not ASCII"
            )));
        }
        Self::new(c as u8)
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl std::fmt::Display for BridgeLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Two-character ISO 639-1 language tag trailing versioned envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageCode([u8; 2]);

impl LanguageCode {
    pub fn new(bytes: [u8; 2]) -> Result<Self, ProtocolError> {
        if !bytes.iter().all(|b| b.is_ascii_lowercase()) {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "language tag {:02x}{:02x} is not two lowercase ASCII letters",
                bytes[0], bytes[1]
            )));
        }
        Ok(Self(bytes))
    }

    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let bytes: [u8; 2] = s.as_bytes().try_into().map_err(|_| {
            ProtocolError::MalformedEnvelope(format!("language tag {s:?} must be 2 characters"))
        })?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Constructor guarantees lowercase ASCII.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_letter_accepts_printable_ascii() {
        let letter = BridgeLetter::new(b'e').unwrap();
        assert_eq!(letter.as_char(), 'e');
        assert_eq!(letter.as_byte(), 0x65);
    }

    #[test]
    fn bridge_letter_rejects_control_bytes() {
        assert!(BridgeLetter::new(0x00).is_err());
        assert!(BridgeLetter::new(0x0A).is_err());
        assert!(BridgeLetter::from_char('é').is_err());
    }

    #[test]
    fn language_code_roundtrip() {
        let lang = LanguageCode::parse("fr").unwrap();
        assert_eq!(lang.as_str(), "fr");
        assert_eq!(lang.as_bytes(), b"fr");
    }

    #[test]
    fn language_code_rejects_bad_tags() {
        assert!(LanguageCode::parse("f").is_err());
        assert!(LanguageCode::parse("fra").is_err());
        assert!(LanguageCode::parse("FR").is_err());
        assert!(LanguageCode::new([0x00, 0x01]).is_err());
    }
}
