//! Projection strategies and query results.
//!
//! The pipeline drives a [`Strategy`] through a fixed protocol:
//!
//! ```text
//! begin_select
//!   begin_dictionary
//!     put_dictionary_key  (put_dictionary_value | put_dictionary_null_value | begin_* .. end_*)
//!     ...
//!   end_dictionary
//! finalize_select
//! ```
//!
//! Sequences follow the same shape with `put_sequence_value`. A nested `begin_*` inside a
//! dictionary frame becomes the value of the pending key; inside a sequence frame it becomes the
//! next element. Both built-in strategies produce results that decode to the same [`Value`].

use crate::lazy::LazyValue;
use crate::length::LengthModel;
use crate::primitive::decode_value;
use crate::source::ByteSource;
use crate::stage::KeyLiteral;
use crate::value::Value;
use crate::{CborError, Codec};

/// Materialization policy for projected query output.
pub trait Strategy<'a> {
    /// Reset state for a new result.
    fn begin_select(&mut self);

    /// Open a dictionary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn begin_dictionary(&mut self) -> Result<(), CborError>;

    /// Close the innermost dictionary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn end_dictionary(&mut self) -> Result<(), CborError>;

    /// Open a sequence frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn begin_sequence(&mut self) -> Result<(), CborError>;

    /// Close the innermost sequence frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn end_sequence(&mut self) -> Result<(), CborError>;

    /// Write the key of the next entry of the innermost dictionary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn put_dictionary_key(&mut self, key: &KeyLiteral) -> Result<(), CborError>;

    /// Write the value of the pending entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be read or output cannot be written.
    fn put_dictionary_value(&mut self, value: LazyValue<'a>) -> Result<(), CborError>;

    /// Write `null` as the value of the pending entry.
    ///
    /// # Errors
    ///
    /// Returns an error if output cannot be written.
    fn put_dictionary_null_value(&mut self) -> Result<(), CborError>;

    /// Append an element (`None` writes `null`) to the innermost sequence frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be read or output cannot be written.
    fn put_sequence_value(&mut self, value: Option<LazyValue<'a>>) -> Result<(), CborError>;

    /// Produce the result. `current` is the item the select stage was reached with; it is the
    /// result when nothing was projected.
    ///
    /// # Errors
    ///
    /// Returns an error if the accumulated output cannot be materialized.
    fn finalize_select(
        &mut self,
        current: Option<LazyValue<'a>>,
    ) -> Result<Selection<'a>, CborError>;
}

/// One query result.
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    /// Nothing was found.
    Null,
    /// An item of the queried source.
    Item(LazyValue<'a>),
    /// A projection re-encoded into a fresh buffer.
    Encoded(EncodedValue),
    /// A projection held as an object graph.
    Object(ObjectValue<'a>),
}

impl Selection<'_> {
    /// Returns `true` for [`Selection::Null`] or a `null` item.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null | Self::Object(ObjectValue::Null) => true,
            Self::Item(v) | Self::Object(ObjectValue::Item(v)) => v.is_null(),
            Self::Encoded(_) | Self::Object(_) => false,
        }
    }

    /// Fully decode the result.
    ///
    /// # Errors
    ///
    /// Returns any decode error of the underlying bytes.
    pub fn to_value(&self) -> Result<Value, CborError> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Item(v) => v.to_value(),
            Self::Encoded(e) => e.to_value(),
            Self::Object(o) => o.to_value(),
        }
    }
}

/// A projection written by the binary strategy: one encoded item with canonical headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValue {
    bytes: Vec<u8>,
    model: LengthModel,
}

impl EncodedValue {
    pub(crate) const fn new(bytes: Vec<u8>, model: LengthModel) -> Self {
        Self { bytes, model }
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// A lazy view over the encoded item.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer's head byte is malformed.
    pub fn value<'s>(&'s self, codec: &'s Codec) -> Result<LazyValue<'s>, CborError> {
        LazyValue::at(self, codec, 0)
    }

    /// Fully decode the encoded item.
    ///
    /// # Errors
    ///
    /// Returns any decode error of the buffer.
    pub fn to_value(&self) -> Result<Value, CborError> {
        decode_value(&self.model, self, 0).map(|(v, _)| v)
    }

    /// Compute the SHA-256 digest of the encoded bytes.
    #[cfg(feature = "sha2")]
    #[cfg_attr(docsrs, doc(cfg(feature = "sha2")))]
    #[must_use]
    pub fn sha256(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        h.update(&self.bytes);
        let out = h.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(out.as_slice());
        digest
    }
}

impl ByteSource for EncodedValue {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read_u8(&self, offset: usize) -> Result<u8, CborError> {
        self.bytes.as_slice().read_u8(offset)
    }

    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError> {
        self.bytes.as_slice().read_slice(offset, len)
    }
}

/// A projection built by the object strategy.
#[derive(Debug, Clone)]
pub enum ObjectValue<'a> {
    /// A missing value.
    Null,
    /// An item of the queried source.
    Item(LazyValue<'a>),
    /// A projected sequence.
    Sequence(Vec<ObjectValue<'a>>),
    /// A projected dictionary, in projection order.
    Dictionary(Vec<(KeyLiteral, ObjectValue<'a>)>),
}

impl<'a> ObjectValue<'a> {
    /// The entry under a text key of a projected dictionary.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dictionary(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, KeyLiteral::Text(t) if &**t == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// The element at `i` of a projected sequence.
    #[must_use]
    pub fn index(&self, i: usize) -> Option<&Self> {
        match self {
            Self::Sequence(items) => items.get(i),
            _ => None,
        }
    }

    /// The source item, if this is a leaf.
    #[must_use]
    pub const fn item(&self) -> Option<&LazyValue<'a>> {
        match self {
            Self::Item(v) => Some(v),
            _ => None,
        }
    }

    /// Fully decode the graph.
    ///
    /// # Errors
    ///
    /// Returns any decode error of a leaf item.
    pub fn to_value(&self) -> Result<Value, CborError> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Item(v) => v.to_value(),
            Self::Sequence(items) => items
                .iter()
                .map(Self::to_value)
                .collect::<Result<_, _>>()
                .map(Value::Sequence),
            Self::Dictionary(entries) => entries
                .iter()
                .map(|(k, v)| Ok((Value::from(k), v.to_value()?)))
                .collect::<Result<_, CborError>>()
                .map(Value::Dictionary),
        }
    }
}
