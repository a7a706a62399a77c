//! Semantic value types.
//!
//! [`ValueType`] refines [`MajorType`] into a shallow identity hierarchy. Every type has at most one
//! parent, and [`ValueType::matches`] walks the parent chain:
//!
//! ```text
//! Any ─┬─ Number ─┬─ Int ─┬─ UInt
//!      │          │       └─ NInt
//!      │          └─ Float
//!      ├─ String ─┬─ ByteString
//!      │          └─ TextString
//!      ├─ Tag ─┬─ DateTime, Timestamp, Uri, EncodedItem
//!      │       └─ BigNum ─┬─ UBigNum
//!      │                  └─ NBigNum
//!      └─ Sequence, Dictionary, Bool, Null, Undefined, Simple
//! ```

use crate::head::{decompose, Additional, MajorType};
use crate::length::read_argument;
use crate::source::ByteSource;
use crate::tags::TagRegistry;
use crate::{CborError, ErrorCode};

/// Semantic type of an encoded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValueType {
    /// Root of the hierarchy; every type matches it.
    Any,
    /// Any numeric item.
    Number,
    /// Integer of either sign.
    Int,
    /// Major type 0.
    UInt,
    /// Major type 1.
    NInt,
    /// Half, single or double precision float.
    Float,
    /// Byte or text string.
    String,
    /// Major type 2.
    ByteString,
    /// Major type 3.
    TextString,
    /// Major type 4.
    Sequence,
    /// Major type 5.
    Dictionary,
    /// Any semantic tag.
    Tag,
    /// Tag 0: date/time text.
    DateTime,
    /// Tag 1: epoch-based timestamp.
    Timestamp,
    /// Tag 2 or 3.
    BigNum,
    /// Tag 2: unsigned bignum.
    UBigNum,
    /// Tag 3: negative bignum.
    NBigNum,
    /// Tag 32: URI text.
    Uri,
    /// Tag 24: a byte string holding an encoded item.
    EncodedItem,
    /// Simple values `false`/`true`.
    Bool,
    /// Simple value `null`.
    Null,
    /// Simple value `undefined`.
    Undefined,
    /// Any other simple value.
    Simple,
}

impl ValueType {
    /// The immediate parent in the identity hierarchy.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Any => None,
            Self::Int | Self::Float => Some(Self::Number),
            Self::UInt | Self::NInt => Some(Self::Int),
            Self::ByteString | Self::TextString => Some(Self::String),
            Self::UBigNum | Self::NBigNum => Some(Self::BigNum),
            Self::DateTime | Self::Timestamp | Self::BigNum | Self::Uri | Self::EncodedItem => {
                Some(Self::Tag)
            }
            Self::Number
            | Self::String
            | Self::Sequence
            | Self::Dictionary
            | Self::Tag
            | Self::Bool
            | Self::Null
            | Self::Undefined
            | Self::Simple => Some(Self::Any),
        }
    }

    /// Returns `true` if `self` is `other` or a descendant of it.
    #[must_use]
    pub fn matches(self, other: Self) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t == other {
                return true;
            }
            cur = t.parent();
        }
        false
    }

    /// Returns `true` if `self` matches any of `set`.
    #[must_use]
    pub fn matches_any(self, set: &[Self]) -> bool {
        set.iter().any(|&t| self.matches(t))
    }

    /// Coarse type implied by a major type alone (tags and simple values are not refined).
    #[must_use]
    pub const fn of_major(major: MajorType) -> Self {
        match major {
            MajorType::UnsignedInteger => Self::UInt,
            MajorType::NegativeInteger => Self::NInt,
            MajorType::ByteString => Self::ByteString,
            MajorType::TextString => Self::TextString,
            MajorType::Sequence => Self::Sequence,
            MajorType::Dictionary => Self::Dictionary,
            MajorType::SemanticTag => Self::Tag,
            MajorType::FloatingPointOrSimple => Self::Simple,
        }
    }

    /// Resolve the type of the item at `offset`, consulting `tags` for semantic tags.
    ///
    /// # Errors
    ///
    /// Returns `ReservedAdditionalInfo`, `UnexpectedBreak` for a break byte, or `OutOfRange`.
    pub fn resolve(
        src: &dyn ByteSource,
        offset: usize,
        tags: &TagRegistry,
    ) -> Result<(MajorType, Self), CborError> {
        let head = decompose(src.read_u8(offset)?, offset)?;
        let vt = match head.major {
            MajorType::SemanticTag => {
                let arg = read_argument(src, offset)?;
                match arg.value {
                    Some(tag) => tags.value_type(tag).unwrap_or(Self::Tag),
                    None => return Err(CborError::new(ErrorCode::IllegalIndefinite, offset)),
                }
            }
            MajorType::FloatingPointOrSimple => match head.additional {
                Additional::Literal(20 | 21) => Self::Bool,
                Additional::Literal(22) => Self::Null,
                Additional::Literal(23) => Self::Undefined,
                Additional::TwoByte | Additional::FourByte | Additional::EightByte => Self::Float,
                Additional::Indefinite => {
                    return Err(CborError::new(ErrorCode::UnexpectedBreak, offset))
                }
                Additional::Literal(_) | Additional::OneByte => Self::Simple,
            },
            other => Self::of_major(other),
        };
        Ok((head.major, vt))
    }

    /// Stable lowercase name, used in error messages and by textual query vocabularies.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Number => "number",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::NInt => "nint",
            Self::Float => "float",
            Self::String => "string",
            Self::ByteString => "bytes",
            Self::TextString => "text",
            Self::Sequence => "sequence",
            Self::Dictionary => "dictionary",
            Self::Tag => "tag",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::BigNum => "bignum",
            Self::UBigNum => "ubignum",
            Self::NBigNum => "nbignum",
            Self::Uri => "uri",
            Self::EncodedItem => "encoded",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Simple => "simple",
        }
    }

    /// Look up a type by its [`ValueType::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|t| t.name() == name)
    }
}

const ALL: [ValueType; 23] = [
    ValueType::Any,
    ValueType::Number,
    ValueType::Int,
    ValueType::UInt,
    ValueType::NInt,
    ValueType::Float,
    ValueType::String,
    ValueType::ByteString,
    ValueType::TextString,
    ValueType::Sequence,
    ValueType::Dictionary,
    ValueType::Tag,
    ValueType::DateTime,
    ValueType::Timestamp,
    ValueType::BigNum,
    ValueType::UBigNum,
    ValueType::NBigNum,
    ValueType::Uri,
    ValueType::EncodedItem,
    ValueType::Bool,
    ValueType::Null,
    ValueType::Undefined,
    ValueType::Simple,
];

/// A type assertion used by the type-match query stage.
///
/// A *required* spec turns a mismatch into a type-mismatch error; a *nullable* spec turns it into a
/// null result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    value_type: ValueType,
    nullable: bool,
}

impl TypeSpec {
    /// A mismatch raises an error.
    #[must_use]
    pub const fn required(value_type: ValueType) -> Self {
        Self {
            value_type,
            nullable: false,
        }
    }

    /// A mismatch yields null.
    #[must_use]
    pub const fn nullable(value_type: ValueType) -> Self {
        Self {
            value_type,
            nullable: true,
        }
    }

    /// The asserted type.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        self.value_type
    }

    /// Whether a mismatch degrades to null.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        self.nullable
    }

    /// Whether an item of type `actual` satisfies this spec.
    #[must_use]
    pub fn accepts(self, actual: ValueType) -> bool {
        actual.matches(self.value_type)
    }

    /// Parse `"<name>"` (required) or `"<name>?"` (nullable).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.strip_suffix('?') {
            Some(name) => ValueType::from_name(name).map(Self::nullable),
            None => ValueType::from_name(text).map(Self::required),
        }
    }
}
