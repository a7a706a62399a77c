//! Semantic tag decoding.
//!
//! A [`TagRegistry`] is an ordered list of [`TagDecoder`]s consulted first-match-wins. The default
//! registry knows the tags listed below; callers can put their own decoders in front of them with
//! [`crate::Codec::with_tag_decoder`].
//!
//! | tag   | value type         | decoded as                 |
//! |-------|--------------------|----------------------------|
//! | 0     | `DateTime`         | [`TagValue::DateTime`]     |
//! | 1     | `Timestamp`        | [`TagValue::Timestamp`]    |
//! | 2, 3  | `UBigNum`/`NBigNum`| [`TagValue::BigNum`]       |
//! | 24    | `EncodedItem`      | [`TagValue::Encoded`]      |
//! | 32    | `Uri`              | [`TagValue::Uri`]          |

use std::fmt;
use std::sync::Arc;

use crate::lazy::LazyValue;
use crate::length::read_argument;
use crate::primitive::{decode_bytes, decode_text, decode_value};
use crate::source::ByteSource;
use crate::types::ValueType;
use crate::value::{BigNum, Number, Value};
use crate::{CborError, Codec, ErrorCode};

/// Tag 0: RFC 3339 date/time text.
pub const TAG_DATE_TIME: u64 = 0;
/// Tag 1: seconds since the epoch.
pub const TAG_TIMESTAMP: u64 = 1;
/// Tag 2: unsigned bignum.
pub const TAG_UNSIGNED_BIGNUM: u64 = 2;
/// Tag 3: negative bignum.
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
/// Tag 24: embedded encoded item.
pub const TAG_ENCODED_ITEM: u64 = 24;
/// Tag 32: URI text.
pub const TAG_URI: u64 = 32;
/// Tag 55799: self-describe magic; marks the start of a stream and wraps no semantics.
pub const TAG_SELF_DESCRIBE: u64 = 55799;

/// The interpreted value of a tagged item.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Tag 0.
    DateTime(String),
    /// Tag 1.
    Timestamp(Number),
    /// Tag 2 or 3.
    BigNum(BigNum),
    /// Tag 24: the embedded item's bytes.
    Encoded(Vec<u8>),
    /// Tag 32.
    Uri(String),
    /// A tag no registered decoder handles.
    Other {
        /// Tag number.
        tag: u64,
        /// The tagged item, fully decoded.
        value: Value,
    },
}

/// A decoder for one family of tags.
pub trait TagDecoder: Send + Sync {
    /// Whether this decoder interprets `tag`.
    fn handles(&self, tag: u64) -> bool;

    /// The semantic type this decoder assigns to items carrying `tag`.
    fn value_type(&self, tag: u64) -> ValueType;

    /// Decode the tagged item whose tag header starts at `offset` and spans `len` bytes in total.
    ///
    /// # Errors
    ///
    /// Returns an error if the tagged content has an unexpected shape or is malformed.
    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        len: usize,
    ) -> Result<TagValue, CborError>;
}

/// Ordered, first-match-wins list of tag decoders.
#[derive(Clone)]
pub struct TagRegistry {
    decoders: Vec<Arc<dyn TagDecoder>>,
}

impl TagRegistry {
    /// A registry that handles no tags.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Put `decoder` in front of every decoder already registered.
    pub fn push_front(&mut self, decoder: Arc<dyn TagDecoder>) {
        self.decoders.insert(0, decoder);
    }

    /// Append `decoder` after every decoder already registered.
    pub fn push_back(&mut self, decoder: Arc<dyn TagDecoder>) {
        self.decoders.push(decoder);
    }

    /// The first decoder handling `tag`.
    #[must_use]
    pub fn find(&self, tag: u64) -> Option<&dyn TagDecoder> {
        self.decoders
            .iter()
            .find(|d| d.handles(tag))
            .map(AsRef::as_ref)
    }

    /// The semantic type assigned to `tag`, if a decoder handles it.
    #[must_use]
    pub fn value_type(&self, tag: u64) -> Option<ValueType> {
        self.find(tag).map(|d| d.value_type(tag))
    }

    /// Number of registered decoders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns `true` if no decoders are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self {
            decoders: vec![
                Arc::new(DateTimeDecoder),
                Arc::new(TimestampDecoder),
                Arc::new(BigNumDecoder),
                Arc::new(EncodedItemDecoder),
                Arc::new(UriDecoder),
            ],
        }
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

/// Offset of the item wrapped by the tag at `offset`.
///
/// # Errors
///
/// Returns a type mismatch if `offset` does not hold a tag.
pub fn tagged_offset(src: &dyn ByteSource, offset: usize) -> Result<usize, CborError> {
    let arg = read_argument(src, offset)?;
    if arg.head.major != crate::head::MajorType::SemanticTag {
        return Err(CborError::type_mismatch(
            ValueType::Tag,
            ValueType::of_major(arg.head.major),
            offset,
        ));
    }
    offset
        .checked_add(arg.header_len)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))
}

struct DateTimeDecoder;

impl TagDecoder for DateTimeDecoder {
    fn handles(&self, tag: u64) -> bool {
        tag == TAG_DATE_TIME
    }

    fn value_type(&self, _tag: u64) -> ValueType {
        ValueType::DateTime
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let inner = tagged_offset(src, offset)?;
        let (text, _) = decode_text(codec.length(), src, inner)?;
        Ok(TagValue::DateTime(text.into_owned()))
    }
}

struct TimestampDecoder;

impl TagDecoder for TimestampDecoder {
    fn handles(&self, tag: u64) -> bool {
        tag == TAG_TIMESTAMP
    }

    fn value_type(&self, _tag: u64) -> ValueType {
        ValueType::Timestamp
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let inner = tagged_offset(src, offset)?;
        let number = LazyValue::at(src, codec, inner)?
            .number()?
            .ok_or_else(|| CborError::type_mismatch(ValueType::Number, ValueType::Null, inner))?;
        Ok(TagValue::Timestamp(number))
    }
}

struct BigNumDecoder;

impl TagDecoder for BigNumDecoder {
    fn handles(&self, tag: u64) -> bool {
        matches!(tag, TAG_UNSIGNED_BIGNUM | TAG_NEGATIVE_BIGNUM)
    }

    fn value_type(&self, tag: u64) -> ValueType {
        if tag == TAG_NEGATIVE_BIGNUM {
            ValueType::NBigNum
        } else {
            ValueType::UBigNum
        }
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let negative = read_argument(src, offset)?.value == Some(TAG_NEGATIVE_BIGNUM);
        let inner = tagged_offset(src, offset)?;
        let (magnitude, _) = decode_bytes(codec.length(), src, inner)?;
        Ok(TagValue::BigNum(BigNum::new(negative, magnitude.into_owned())))
    }
}

struct EncodedItemDecoder;

impl TagDecoder for EncodedItemDecoder {
    fn handles(&self, tag: u64) -> bool {
        tag == TAG_ENCODED_ITEM
    }

    fn value_type(&self, _tag: u64) -> ValueType {
        ValueType::EncodedItem
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let inner = tagged_offset(src, offset)?;
        let (bytes, _) = decode_bytes(codec.length(), src, inner)?;
        Ok(TagValue::Encoded(bytes.into_owned()))
    }
}

struct UriDecoder;

impl TagDecoder for UriDecoder {
    fn handles(&self, tag: u64) -> bool {
        tag == TAG_URI
    }

    fn value_type(&self, _tag: u64) -> ValueType {
        ValueType::Uri
    }

    fn decode(
        &self,
        codec: &Codec,
        src: &dyn ByteSource,
        offset: usize,
        _len: usize,
    ) -> Result<TagValue, CborError> {
        let inner = tagged_offset(src, offset)?;
        let (text, _) = decode_text(codec.length(), src, inner)?;
        Ok(TagValue::Uri(text.into_owned()))
    }
}

/// Decode an unregistered tag structurally.
pub(crate) fn decode_other(
    codec: &Codec,
    src: &dyn ByteSource,
    offset: usize,
) -> Result<TagValue, CborError> {
    let inner = tagged_offset(src, offset)?;
    let tag = read_argument(src, offset)?.value.unwrap_or_default();
    let (value, _) = decode_value(codec.length(), src, inner)?;
    Ok(TagValue::Other { tag, value })
}
