use crate::cursor::{Reader, Width, Writer};
use crate::detect::Version;
use crate::error::ProtocolError;

/// Delimiter of the generation-0 plaintext format.
const GEN0_DELIMITER: char = ':';

/// Presence bits of the bitmapped generations, LSB first.
const BIT_FROM: u8 = 1 << 0;
const BIT_TO: u8 = 1 << 1;
const BIT_CC: u8 = 1 << 2;
const BIT_BCC: u8 = 1 << 3;
const BIT_SUBJECT: u8 = 1 << 4;
const BIT_BODY: u8 = 1 << 5;
const BIT_IMAGE: u8 = 1 << 6;

/// Plaintext layout generation of a decrypted content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentGeneration {
    /// Five delimited text fields.
    Delimited,
    /// Presence bitmap plus length-prefixed values.
    Bitmap,
    /// Bitmap generation extended with a chunked image attachment.
    BitmapWithImage,
}

impl ContentGeneration {
    /// The content generation an envelope of the given version carries.
    pub fn for_version(version: Version) -> Self {
        match version {
            Version::LegacyV0 => ContentGeneration::Delimited,
            Version::V1 | Version::V2 => ContentGeneration::Bitmap,
            Version::V3 | Version::V4 => ContentGeneration::BitmapWithImage,
        }
    }

    fn allowed_bits(self) -> u8 {
        match self {
            ContentGeneration::Delimited => 0,
            ContentGeneration::Bitmap => {
                BIT_FROM | BIT_TO | BIT_CC | BIT_BCC | BIT_SUBJECT | BIT_BODY
            }
            ContentGeneration::BitmapWithImage => {
                BIT_FROM | BIT_TO | BIT_CC | BIT_BCC | BIT_SUBJECT | BIT_BODY | BIT_IMAGE
            }
        }
    }
}

/// Position of one chunk of an image split across envelopes.
///
/// Packed into a single descriptor byte on the wire: chunk index in the
/// high nibble, chunk total in the low nibble. Reassembly happens in the
/// bridge layer; this codec only carries the descriptor through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSegment {
    pub index: u8,
    pub total: u8,
}

impl ImageSegment {
    pub fn to_byte(self) -> Result<u8, ProtocolError> {
        if self.index > 0x0F || self.total > 0x0F {
            return Err(ProtocolError::ValueOutOfRange {
                value: self.index.max(self.total) as u64,
                width: 1,
            });
        }
        Ok((self.index << 4) | self.total)
    }

    pub fn from_byte(b: u8) -> Result<Self, ProtocolError> {
        let segment = Self {
            index: b >> 4,
            total: b & 0x0F,
        };
        if segment.total == 0 || segment.index >= segment.total {
            return Err(ProtocolError::MalformedContent(format!(
                "segment descriptor 0x{b:02x}: index {} of {}",
                segment.index, segment.total
            )));
        }
        Ok(segment)
    }
}

/// One chunk of an image attachment, keyed by a transfer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub session: u16,
    pub segment: ImageSegment,
    pub data: Vec<u8>,
}

/// A decrypted application payload.
///
/// `None` means the field was absent from the record; `Some("")` means it
/// was present and empty. The two are distinct on the wire and stay
/// distinct here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRecord {
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub image: Option<ImageAttachment>,
}

impl ContentRecord {
    /// Decode a plaintext record of the given generation.
    pub fn decode(plaintext: &[u8], generation: ContentGeneration) -> Result<Self, ProtocolError> {
        match generation {
            ContentGeneration::Delimited => Self::decode_delimited(plaintext),
            ContentGeneration::Bitmap | ContentGeneration::BitmapWithImage => {
                Self::decode_bitmapped(plaintext, generation)
            }
        }
    }

    fn decode_delimited(plaintext: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(plaintext)
            .map_err(|_| ProtocolError::MalformedContent("record is not valid UTF-8".into()))?;
        let delimiters = text.matches(GEN0_DELIMITER).count();
        if delimiters != 4 {
            return Err(ProtocolError::MalformedContent(format!(
                "expected 4 delimiters, found {delimiters}"
            )));
        }
        let mut parts = text.split(GEN0_DELIMITER).map(str::to_owned);
        Ok(Self {
            from: None,
            to: parts.next(),
            cc: parts.next(),
            bcc: parts.next(),
            subject: parts.next(),
            body: parts.next(),
            image: None,
        })
    }

    fn decode_bitmapped(
        plaintext: &[u8],
        generation: ContentGeneration,
    ) -> Result<Self, ProtocolError> {
        let mut r = Reader::new(plaintext);
        let bitmap = r.read_u8()?;

        let unknown = bitmap & !generation.allowed_bits();
        if unknown != 0 {
            return Err(ProtocolError::MalformedContent(format!(
                "bitmap 0x{bitmap:02x} sets unsupported bits 0x{unknown:02x}"
            )));
        }

        let mut record = Self {
            from: read_field(&mut r, bitmap, BIT_FROM, Width::U8)?,
            to: read_field(&mut r, bitmap, BIT_TO, Width::U16)?,
            cc: read_field(&mut r, bitmap, BIT_CC, Width::U16)?,
            bcc: read_field(&mut r, bitmap, BIT_BCC, Width::U16)?,
            subject: read_field(&mut r, bitmap, BIT_SUBJECT, Width::U8)?,
            body: read_field(&mut r, bitmap, BIT_BODY, Width::U16)?,
            image: None,
        };

        if bitmap & BIT_IMAGE != 0 {
            let session = r.read_u16()?;
            let segment = ImageSegment::from_byte(r.read_u8()?)?;
            let len = r.read_u16()? as usize;
            let data = r.read_bytes(len)?.to_vec();
            record.image = Some(ImageAttachment {
                session,
                segment,
                data,
            });
        }

        if !r.is_empty() {
            return Err(ProtocolError::MalformedContent(format!(
                "{} leftover bytes after declared fields",
                r.remaining()
            )));
        }
        Ok(record)
    }

    /// Encode the record; the bitmap is computed from which fields are
    /// `Some`, so presence and zero-length stay independent.
    pub fn encode(&self, generation: ContentGeneration) -> Result<Vec<u8>, ProtocolError> {
        match generation {
            ContentGeneration::Delimited => self.encode_delimited(),
            ContentGeneration::Bitmap | ContentGeneration::BitmapWithImage => {
                self.encode_bitmapped(generation)
            }
        }
    }

    fn encode_delimited(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.from.is_some() || self.image.is_some() {
            return Err(ProtocolError::MalformedContent(
                "delimited generation carries neither sender nor image".into(),
            ));
        }
        let fields = [
            ("to", &self.to),
            ("cc", &self.cc),
            ("bcc", &self.bcc),
            ("subject", &self.subject),
            ("body", &self.body),
        ];
        let mut values = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let value = value.as_deref().ok_or_else(|| {
                ProtocolError::MalformedContent(format!(
                    "delimited generation requires the {name} field"
                ))
            })?;
            if value.contains(GEN0_DELIMITER) {
                return Err(ProtocolError::MalformedContent(format!(
                    "{name} contains the field delimiter"
                )));
            }
            values.push(value);
        }
        Ok(values.join(&GEN0_DELIMITER.to_string()).into_bytes())
    }

    fn encode_bitmapped(&self, generation: ContentGeneration) -> Result<Vec<u8>, ProtocolError> {
        if self.image.is_some() && generation == ContentGeneration::Bitmap {
            return Err(ProtocolError::MalformedContent(
                "image attachment requires the image-capable generation".into(),
            ));
        }

        let mut bitmap = 0u8;
        for (bit, value) in [
            (BIT_FROM, &self.from),
            (BIT_TO, &self.to),
            (BIT_CC, &self.cc),
            (BIT_BCC, &self.bcc),
            (BIT_SUBJECT, &self.subject),
            (BIT_BODY, &self.body),
        ] {
            if value.is_some() {
                bitmap |= bit;
            }
        }
        if self.image.is_some() {
            bitmap |= BIT_IMAGE;
        }

        let mut w = Writer::new();
        w.write_u8(bitmap);
        write_field(&mut w, &self.from, Width::U8)?;
        write_field(&mut w, &self.to, Width::U16)?;
        write_field(&mut w, &self.cc, Width::U16)?;
        write_field(&mut w, &self.bcc, Width::U16)?;
        write_field(&mut w, &self.subject, Width::U8)?;
        write_field(&mut w, &self.body, Width::U16)?;

        if let Some(image) = &self.image {
            w.write_uint(Width::U16, image.session as u64)?;
            w.write_u8(image.segment.to_byte()?);
            w.write_uint(Width::U16, image.data.len() as u64)?;
            w.write_bytes(&image.data);
        }
        Ok(w.into_bytes())
    }
}

fn read_field(
    r: &mut Reader<'_>,
    bitmap: u8,
    bit: u8,
    width: Width,
) -> Result<Option<String>, ProtocolError> {
    if bitmap & bit == 0 {
        return Ok(None);
    }
    let len = r.read_uint(width)? as usize;
    let bytes = r.read_bytes(len)?;
    let value = String::from_utf8(bytes.to_vec())
        .map_err(|_| ProtocolError::MalformedContent("field is not valid UTF-8".into()))?;
    Ok(Some(value))
}

fn write_field(
    w: &mut Writer,
    value: &Option<String>,
    width: Width,
) -> Result<(), ProtocolError> {
    if let Some(value) = value {
        w.write_uint(width, value.len() as u64)?;
        w.write_bytes(value.as_bytes());
    }
    Ok(())
}
