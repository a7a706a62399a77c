//! Head-byte decomposition and canonical composition.
//!
//! Every item starts with one head byte: the top 3 bits select the [`MajorType`], the low 5 bits
//! ("additional info") either carry a literal value (0..=23), select how many big-endian bytes of
//! argument follow (24..=27), are reserved (28..=30) or mark an indefinite length (31).

use crate::{CborError, ErrorCode};

/// Head byte of the "break" marker that terminates indefinite-length items.
pub const BREAK: u8 = 0xff;

/// Additional-info value marking an indefinite length.
pub const AI_INDEFINITE: u8 = 31;

/// The 8-way top-level kind of an encoded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MajorType {
    /// Major type 0.
    UnsignedInteger = 0,
    /// Major type 1, storing `-1 - value`.
    NegativeInteger = 1,
    /// Major type 2.
    ByteString = 2,
    /// Major type 3 (UTF-8).
    TextString = 3,
    /// Major type 4 (array).
    Sequence = 4,
    /// Major type 5 (map).
    Dictionary = 5,
    /// Major type 6: a tag number followed by exactly one item.
    SemanticTag = 6,
    /// Major type 7: floats, booleans, null, undefined and other simple values.
    FloatingPointOrSimple = 7,
}

impl MajorType {
    /// Extract the major type from a head byte.
    #[inline]
    #[must_use]
    pub const fn from_head(byte: u8) -> Self {
        match byte >> 5 {
            0 => Self::UnsignedInteger,
            1 => Self::NegativeInteger,
            2 => Self::ByteString,
            3 => Self::TextString,
            4 => Self::Sequence,
            5 => Self::Dictionary,
            6 => Self::SemanticTag,
            _ => Self::FloatingPointOrSimple,
        }
    }

    /// The 3-bit wire value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Whether items of this major type may use indefinite-length encoding.
    #[inline]
    #[must_use]
    pub const fn supports_indefinite(self) -> bool {
        matches!(
            self,
            Self::ByteString | Self::TextString | Self::Sequence | Self::Dictionary
        )
    }

    /// Whether this major type holds child items.
    #[inline]
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Sequence | Self::Dictionary)
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnsignedInteger => "unsigned integer",
            Self::NegativeInteger => "negative integer",
            Self::ByteString => "byte string",
            Self::TextString => "text string",
            Self::Sequence => "sequence",
            Self::Dictionary => "dictionary",
            Self::SemanticTag => "semantic tag",
            Self::FloatingPointOrSimple => "floating point or simple",
        }
    }
}

/// The additional-info bucket of a head byte, with reserved values excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Additional {
    /// Literal value 0..=23 stored in the head byte itself.
    Literal(u8),
    /// One argument byte follows.
    OneByte,
    /// Two argument bytes follow.
    TwoByte,
    /// Four argument bytes follow.
    FourByte,
    /// Eight argument bytes follow.
    EightByte,
    /// Indefinite length, terminated by [`BREAK`].
    Indefinite,
}

impl Additional {
    /// Classify the low 5 bits of a head byte. Returns `None` for reserved values 28..=30.
    #[inline]
    #[must_use]
    pub const fn from_bits(ai: u8) -> Option<Self> {
        match ai & 0x1f {
            v @ 0..=23 => Some(Self::Literal(v)),
            24 => Some(Self::OneByte),
            25 => Some(Self::TwoByte),
            26 => Some(Self::FourByte),
            27 => Some(Self::EightByte),
            AI_INDEFINITE => Some(Self::Indefinite),
            _ => None,
        }
    }

    /// The 5-bit wire value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Literal(v) => v,
            Self::OneByte => 24,
            Self::TwoByte => 25,
            Self::FourByte => 26,
            Self::EightByte => 27,
            Self::Indefinite => AI_INDEFINITE,
        }
    }

    /// Number of argument bytes following the head byte.
    #[inline]
    #[must_use]
    pub const fn extra_bytes(self) -> usize {
        match self {
            Self::Literal(_) | Self::Indefinite => 0,
            Self::OneByte => 1,
            Self::TwoByte => 2,
            Self::FourByte => 4,
            Self::EightByte => 8,
        }
    }
}

/// A decomposed head byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Head {
    /// Major type (top 3 bits).
    pub major: MajorType,
    /// Additional-info bucket (low 5 bits).
    pub additional: Additional,
}

impl Head {
    /// Whether the head byte is the break marker.
    #[inline]
    #[must_use]
    pub const fn is_break(self) -> bool {
        matches!(self.major, MajorType::FloatingPointOrSimple)
            && matches!(self.additional, Additional::Indefinite)
    }

    /// Total header size (head byte plus argument bytes).
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        1 + self.additional.extra_bytes()
    }
}

/// Decompose a head byte read at `offset`.
///
/// # Errors
///
/// Returns `ReservedAdditionalInfo` for additional-info values 28..=30.
#[inline]
pub const fn decompose(byte: u8, offset: usize) -> Result<Head, CborError> {
    match Additional::from_bits(byte) {
        Some(additional) => Ok(Head {
            major: MajorType::from_head(byte),
            additional,
        }),
        None => Err(CborError::new(ErrorCode::ReservedAdditionalInfo, offset)),
    }
}

/// Length argument to [`compose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// A known length, count or value.
    Definite(u64),
    /// Unknown length: emit the indefinite marker.
    Indefinite,
}

/// An encoded header: one head byte plus up to eight argument bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadBytes {
    buf: [u8; 9],
    len: u8,
}

impl HeadBytes {
    /// The encoded header bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..usize::from(self.len)]
    }

    /// Encoded header length.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Always `false`: a header holds at least its head byte.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Compose the canonical header for `major` and `length`.
///
/// The smallest bucket able to hold the value is always chosen: literal for `<= 23`, then 1, 2, 4
/// or 8 argument bytes. [`Length::Indefinite`] yields the indefinite marker.
#[must_use]
pub fn compose(major: MajorType, length: Length) -> HeadBytes {
    let mut buf = [0u8; 9];
    let mt = major.bits() << 5;
    let value = match length {
        Length::Definite(v) => v,
        Length::Indefinite => {
            buf[0] = mt | AI_INDEFINITE;
            return HeadBytes { buf, len: 1 };
        }
    };

    let len = if let Ok(v8) = u8::try_from(value) {
        if v8 < 24 {
            buf[0] = mt | v8;
            1
        } else {
            buf[0] = mt | 24;
            buf[1] = v8;
            2
        }
    } else if let Ok(v16) = u16::try_from(value) {
        buf[0] = mt | 25;
        buf[1..3].copy_from_slice(&v16.to_be_bytes());
        3
    } else if let Ok(v32) = u32::try_from(value) {
        buf[0] = mt | 26;
        buf[1..5].copy_from_slice(&v32.to_be_bytes());
        5
    } else {
        buf[0] = mt | 27;
        buf[1..9].copy_from_slice(&value.to_be_bytes());
        9
    };

    HeadBytes { buf, len }
}

/// Length of the canonical header for a definite `value`.
#[inline]
#[must_use]
pub const fn canonical_head_len(value: u64) -> usize {
    if value < 24 {
        1
    } else if value <= 0xff {
        2
    } else if value <= 0xffff {
        3
    } else if value <= 0xffff_ffff {
        5
    } else {
        9
    }
}
