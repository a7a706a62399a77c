//! Lazy, offset-bound item views.
//!
//! A [`LazyValue`] records only where an item starts and what type its head resolves to. Nothing
//! past the header is validated until an extractor asks for it. Every extractor follows the same
//! order:
//!
//! 1. a `null` item yields `Ok(None)` whatever was requested;
//! 2. an item of the wrong type yields a type-mismatch error carrying the offset and both types;
//! 3. tagged items are interpreted through the codec's tag registry;
//! 4. anything else is decoded from the bytes.

use std::borrow::Cow;
use std::fmt;

use crate::head::MajorType;
use crate::length::read_argument;
use crate::predicate::Predicate;
use crate::primitive::{decode_bool, decode_bytes, decode_float, decode_integer, decode_text};
use crate::source::ByteSource;
use crate::tags::{tagged_offset, TagValue};
use crate::types::ValueType;
use crate::utf8;
use crate::value::{Number, Value};
use crate::{CborError, Codec, ErrorCode};

/// A relocatable view over one item of a [`ByteSource`].
#[derive(Clone, Copy)]
pub struct LazyValue<'a> {
    src: &'a dyn ByteSource,
    codec: &'a Codec,
    offset: usize,
    major: MajorType,
    value_type: ValueType,
}

impl fmt::Debug for LazyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("offset", &self.offset)
            .field("major", &self.major)
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

impl<'a> LazyValue<'a> {
    /// Bind a view to the item at `offset`, resolving its type from the head.
    ///
    /// # Errors
    ///
    /// Returns an error if the head cannot be read or is malformed.
    pub fn at(src: &'a dyn ByteSource, codec: &'a Codec, offset: usize) -> Result<Self, CborError> {
        let (major, value_type) = ValueType::resolve(src, offset, codec.tags())?;
        Ok(Self {
            src,
            codec,
            offset,
            major,
            value_type,
        })
    }

    /// Rebind this view to another item of the same source.
    ///
    /// # Errors
    ///
    /// Same as [`LazyValue::at`]; on error the view is left unchanged.
    pub fn relocate(&mut self, offset: usize) -> Result<(), CborError> {
        let (major, value_type) = ValueType::resolve(self.src, offset, self.codec.tags())?;
        self.offset = offset;
        self.major = major;
        self.value_type = value_type;
        Ok(())
    }

    /// Offset of the head byte.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Major type of the head byte.
    #[inline]
    #[must_use]
    pub const fn major_type(&self) -> MajorType {
        self.major
    }

    /// Resolved semantic type.
    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The underlying source.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'a dyn ByteSource {
        self.src
    }

    /// The codec this view decodes with.
    #[inline]
    #[must_use]
    pub const fn codec(&self) -> &'a Codec {
        self.codec
    }

    /// Returns `true` for the `null` literal.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value_type == ValueType::Null
    }

    /// Encoded size of the whole item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is malformed or truncated.
    pub fn byte_len(&self) -> Result<usize, CborError> {
        self.codec.length().item_byte_size(self.src, self.offset)
    }

    /// The item's encoded bytes, borrowed from the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is malformed or truncated.
    pub fn raw(&self) -> Result<&'a [u8], CborError> {
        self.src.read_slice(self.offset, self.byte_len()?)
    }

    fn expect(&self, expected: ValueType) -> Result<bool, CborError> {
        if self.is_null() {
            return Ok(false);
        }
        if self.value_type.matches(expected) {
            Ok(true)
        } else {
            Err(CborError::type_mismatch(
                expected,
                self.value_type,
                self.offset,
            ))
        }
    }

    fn expect_any(&self, expected: ValueType, also: &[ValueType]) -> Result<bool, CborError> {
        if self.is_null() {
            return Ok(false);
        }
        if self.value_type.matches(expected) || self.value_type.matches_any(also) {
            Ok(true)
        } else {
            Err(CborError::type_mismatch(
                expected,
                self.value_type,
                self.offset,
            ))
        }
    }

    /// Any numeric item: integers, floats and bignums.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-numeric items.
    pub fn number(&self) -> Result<Option<Number>, CborError> {
        if !self.expect_any(ValueType::Number, &[ValueType::BigNum])? {
            return Ok(None);
        }
        let n = if self.value_type.matches(ValueType::Int) {
            Number::Integer(decode_integer(self.src, self.offset)?)
        } else if self.value_type == ValueType::Float {
            Number::Float(decode_float(self.src, self.offset)?)
        } else {
            match self.tag()? {
                Some(TagValue::BigNum(b)) => Number::Big(b),
                _ => {
                    return Err(CborError::type_mismatch(
                        ValueType::Number,
                        self.value_type,
                        self.offset,
                    ))
                }
            }
        };
        Ok(Some(n))
    }

    /// An integer, including bignums that fit in `i128`.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-integers and `LengthOverflow` for bignums beyond `i128`.
    pub fn integer(&self) -> Result<Option<i128>, CborError> {
        if !self.expect_any(ValueType::Int, &[ValueType::BigNum])? {
            return Ok(None);
        }
        match self.number()? {
            Some(n) => n
                .as_i128()
                .map(Some)
                .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, self.offset)),
            None => Ok(None),
        }
    }

    /// A float; integers are widened.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-numeric items.
    pub fn float(&self) -> Result<Option<f64>, CborError> {
        Ok(self.number()?.and_then(|n| n.as_f64()))
    }

    /// Text content of a text string, an ASCII byte string, or a date/time or URI tag.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for other items and `Utf8Invalid` for bad payloads.
    pub fn string(&self) -> Result<Option<Cow<'a, str>>, CborError> {
        if !self.expect_any(ValueType::String, &[ValueType::DateTime, ValueType::Uri])? {
            return Ok(None);
        }
        let model = self.codec.length();
        let text = match self.value_type {
            ValueType::TextString => decode_text(model, self.src, self.offset)?.0,
            ValueType::ByteString => match decode_bytes(model, self.src, self.offset)?.0 {
                Cow::Borrowed(b) => Cow::Borrowed(utf8::validate(b, self.offset)?),
                Cow::Owned(v) => Cow::Owned(utf8::validate_owned(v, self.offset)?),
            },
            _ => match self.tag()? {
                Some(TagValue::DateTime(s) | TagValue::Uri(s)) => Cow::Owned(s),
                _ => {
                    return Err(CborError::type_mismatch(
                        ValueType::String,
                        self.value_type,
                        self.offset,
                    ))
                }
            },
        };
        Ok(Some(text))
    }

    /// Raw payload of a byte or text string.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-strings.
    pub fn bytes(&self) -> Result<Option<Cow<'a, [u8]>>, CborError> {
        if !self.expect(ValueType::String)? {
            return Ok(None);
        }
        Ok(Some(decode_bytes(self.codec.length(), self.src, self.offset)?.0))
    }

    /// A boolean.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-booleans.
    pub fn bool(&self) -> Result<Option<bool>, CborError> {
        if !self.expect(ValueType::Bool)? {
            return Ok(None);
        }
        decode_bool(self.src, self.offset).map(Some)
    }

    /// A sequence view.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-sequences.
    pub fn sequence(&self) -> Result<Option<SequenceView<'a>>, CborError> {
        if !self.expect(ValueType::Sequence)? {
            return Ok(None);
        }
        let len = self
            .codec
            .length()
            .element_count(self.src, self.offset, ValueType::Sequence)?;
        Ok(Some(SequenceView { value: *self, len }))
    }

    /// A dictionary view.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-dictionaries.
    pub fn dictionary(&self) -> Result<Option<DictionaryView<'a>>, CborError> {
        if !self.expect(ValueType::Dictionary)? {
            return Ok(None);
        }
        let len = self
            .codec
            .length()
            .element_count(self.src, self.offset, ValueType::Dictionary)?;
        Ok(Some(DictionaryView { value: *self, len }))
    }

    /// The tag interpreted through the registry.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for untagged items, or the tag decoder's error.
    pub fn tag(&self) -> Result<Option<TagValue>, CborError> {
        if !self.expect(ValueType::Tag)? {
            return Ok(None);
        }
        self.codec.decode_tag(self.src, self.offset).map(Some)
    }

    /// The tag number.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for untagged items.
    pub fn tag_number(&self) -> Result<Option<u64>, CborError> {
        if !self.expect(ValueType::Tag)? {
            return Ok(None);
        }
        Ok(read_argument(self.src, self.offset)?.value)
    }

    /// A view over the item wrapped by a tag.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for untagged items.
    pub fn tagged(&self) -> Result<Option<Self>, CborError> {
        if !self.expect(ValueType::Tag)? {
            return Ok(None);
        }
        let inner = tagged_offset(self.src, self.offset)?;
        Self::at(self.src, self.codec, inner).map(Some)
    }

    /// Fully decode the item.
    ///
    /// # Errors
    ///
    /// Returns any decode error of the item or its children.
    pub fn to_value(&self) -> Result<Value, CborError> {
        self.codec.decode(self.src, self.offset)
    }
}

/// A lazily scanned sequence.
#[derive(Debug, Clone, Copy)]
pub struct SequenceView<'a> {
    value: LazyValue<'a>,
    len: usize,
}

impl<'a> SequenceView<'a> {
    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the sequence has no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element at `index`, or `None` past the end.
    ///
    /// # Errors
    ///
    /// Returns an error if a preceding element is malformed.
    pub fn get(&self, index: usize) -> Result<Option<LazyValue<'a>>, CborError> {
        if index >= self.len {
            return Ok(None);
        }
        let v = &self.value;
        let mut children = v.codec.length().children(v.src, v.offset, ValueType::Sequence)?;
        match children.nth(index) {
            Some(pos) => LazyValue::at(v.src, v.codec, pos?).map(Some),
            None => Ok(None),
        }
    }

    /// Iterate over the elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence header is malformed.
    pub fn iter(
        &self,
    ) -> Result<impl Iterator<Item = Result<LazyValue<'a>, CborError>> + 'a, CborError> {
        let v = self.value;
        let children = v.codec.length().children(v.src, v.offset, ValueType::Sequence)?;
        Ok(children.map(move |pos| LazyValue::at(v.src, v.codec, pos?)))
    }
}

/// A lazily scanned dictionary.
#[derive(Debug, Clone, Copy)]
pub struct DictionaryView<'a> {
    value: LazyValue<'a>,
    len: usize,
}

impl<'a> DictionaryView<'a> {
    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the dictionary has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over `(key, value)` pairs in encoded order.
    ///
    /// # Errors
    ///
    /// Returns an error if the dictionary header is malformed.
    pub fn iter(&self) -> Result<DictionaryIter<'a>, CborError> {
        let v = self.value;
        Ok(DictionaryIter {
            children: v
                .codec
                .length()
                .children(v.src, v.offset, ValueType::Dictionary)?,
            src: v.src,
            codec: v.codec,
        })
    }

    /// The value of the first entry whose key satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed or a custom predicate fails.
    pub fn get(&self, predicate: &Predicate) -> Result<Option<LazyValue<'a>>, CborError> {
        for entry in self.iter()? {
            let (k, v) = entry?;
            if predicate.test(&k)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// The value stored under a text key.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is malformed.
    pub fn get_text(&self, key: &str) -> Result<Option<LazyValue<'a>>, CborError> {
        self.get(&Predicate::TextEquals(key.into()))
    }
}

/// Iterator returned by [`DictionaryView::iter`].
pub struct DictionaryIter<'a> {
    children: crate::length::Children<'a>,
    src: &'a dyn ByteSource,
    codec: &'a Codec,
}

impl<'a> Iterator for DictionaryIter<'a> {
    type Item = Result<(LazyValue<'a>, LazyValue<'a>), CborError>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = match self.children.next()? {
            Ok(pos) => pos,
            Err(e) => return Some(Err(e)),
        };
        let value = match self.children.next() {
            Some(Ok(pos)) => pos,
            Some(Err(e)) => return Some(Err(e)),
            None => {
                return Some(Err(CborError::new(
                    ErrorCode::OddDictionary,
                    self.children.container_offset(),
                )))
            }
        };
        let pair = LazyValue::at(self.src, self.codec, key)
            .and_then(|k| Ok((k, LazyValue::at(self.src, self.codec, value)?)));
        Some(pair)
    }
}
