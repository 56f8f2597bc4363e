use crate::error::ProtocolError;

/// Wire-format generation of an inbound envelope.
///
/// `LegacyV0` is the original unmarked format, recognized only by a small
/// switch byte in 0..=3. Every later generation announces itself with a
/// marker byte; the marker values deployed so far are listed below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    LegacyV0,
    V1,
    V2,
    V3,
    V4,
}

impl Version {
    /// Marker byte announcing this version, `None` for the unmarked legacy.
    pub fn marker(self) -> Option<u8> {
        match self {
            Version::LegacyV0 => None,
            Version::V1 => Some(0x0A),
            Version::V2 => Some(0x02),
            Version::V3 => Some(0x03),
            Version::V4 => Some(0x04),
        }
    }

    fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0x0A => Some(Version::V1),
            0x02 => Some(Version::V2),
            0x03 => Some(Version::V3),
            0x04 => Some(Version::V4),
            _ => None,
        }
    }
}

/// Payload-type switch of a legacy (V0) envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LegacyKind {
    AuthRequest = 0,
    AuthCode = 1,
    Content = 2,
    AuthCodeWithContent = 3,
}

impl LegacyKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::AuthRequest),
            1 => Some(Self::AuthCode),
            2 => Some(Self::Content),
            3 => Some(Self::AuthCodeWithContent),
            _ => None,
        }
    }
}

/// Payload-type switch of a marker-versioned envelope (byte 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VersionedKind {
    AuthRequestWithContent = 0,
    Content = 1,
}

impl VersionedKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::AuthRequestWithContent),
            1 => Some(Self::Content),
            _ => None,
        }
    }
}

/// Payload type of a classified envelope, per version family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Legacy(LegacyKind),
    Versioned(VersionedKind),
}

/// Ordered activation list of version markers.
///
/// Marker values overlap with legacy switch values (0x02 and 0x03 have
/// shipped as both), so precedence cannot be inferred from the bytes.
/// A marker listed here shadows the legacy switch of the same value; a
/// deployment still serving legacy traffic on a value keeps that marker
/// out of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    active: Vec<u8>,
}

impl MarkerTable {
    /// Build a table from an ordered marker list.
    ///
    /// Rejects bytes that were never deployed as markers and duplicates.
    pub fn new(markers: impl IntoIterator<Item = u8>) -> Result<Self, ProtocolError> {
        let mut active = Vec::new();
        for marker in markers {
            if Version::from_marker(marker).is_none() {
                return Err(ProtocolError::UnrecognizedFormat { marker });
            }
            if active.contains(&marker) {
                return Err(ProtocolError::MalformedEnvelope(format!(
                    "duplicate marker 0x{marker:02x} in activation list"
                )));
            }
            active.push(marker);
        }
        Ok(Self { active })
    }

    /// The current deployment: V1, V3 and V4 active; 0x02 retired so that
    /// legacy switch 2 still classifies as LegacyV0.
    pub fn current() -> Self {
        Self {
            active: vec![0x0A, 0x03, 0x04],
        }
    }

    pub fn active_markers(&self) -> &[u8] {
        &self.active
    }

    /// Classify a raw envelope's leading bytes.
    ///
    /// Byte 0 is matched against the activation list first; only when no
    /// active marker claims it does the legacy switch range 0..=3 apply.
    /// Identical input always yields an identical classification.
    pub fn classify(&self, payload: &[u8]) -> Result<(Version, PayloadKind), ProtocolError> {
        let marker = *payload.first().ok_or(ProtocolError::TruncatedInput {
            needed: 1,
            remaining: 0,
        })?;

        if self.active.contains(&marker) {
            // Guaranteed by the MarkerTable constructor.
            let version = Version::from_marker(marker)
                .ok_or(ProtocolError::UnrecognizedFormat { marker })?;
            let switch = *payload.get(1).ok_or(ProtocolError::TruncatedInput {
                needed: 1,
                remaining: 0,
            })?;
            let kind = VersionedKind::from_byte(switch)
                .ok_or(ProtocolError::UnrecognizedFormat { marker: switch })?;
            tracing::trace!(marker, switch, ?version, "classified versioned envelope");
            return Ok((version, PayloadKind::Versioned(kind)));
        }

        if let Some(kind) = LegacyKind::from_byte(marker) {
            tracing::trace!(switch = marker, ?kind, "classified legacy envelope");
            return Ok((Version::LegacyV0, PayloadKind::Legacy(kind)));
        }

        Err(ProtocolError::UnrecognizedFormat { marker })
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::current()
    }
}
