use std::sync::Arc;

use crate::head::MajorType;
use crate::lazy::LazyValue;
use crate::length::{read_argument, LengthModel};
use crate::primitive::decode_value;
use crate::source::ByteSource;
use crate::tags::{decode_other, TagDecoder, TagRegistry, TagValue};
use crate::types::ValueType;
use crate::value::Value;
use crate::{CborError, DecodeLimits, ErrorCode};

/// Decoding configuration shared by every view and query execution: the [`LengthModel`] (which
/// carries the [`DecodeLimits`]) and the tag-decoder registry.
///
/// A `Codec` is immutable once built and can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    length: LengthModel,
    tags: TagRegistry,
}

impl Codec {
    /// Default limits and the built-in tag decoders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the decode limits.
    #[must_use]
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.length = LengthModel::new(limits);
        self
    }

    /// Register `decoder` ahead of all previously registered decoders.
    #[must_use]
    pub fn with_tag_decoder<D: TagDecoder + 'static>(mut self, decoder: D) -> Self {
        self.tags.push_front(Arc::new(decoder));
        self
    }

    /// Replace the whole tag registry.
    #[must_use]
    pub fn with_tags(mut self, tags: TagRegistry) -> Self {
        self.tags = tags;
        self
    }

    /// The length model.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> &LengthModel {
        &self.length
    }

    /// The tag registry.
    #[inline]
    #[must_use]
    pub const fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// The configured limits.
    #[inline]
    #[must_use]
    pub const fn limits(&self) -> DecodeLimits {
        self.length.limits()
    }

    /// A lazy view over the item at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the head byte at `offset` cannot be read or is reserved.
    pub fn value_at<'a>(
        &'a self,
        src: &'a dyn ByteSource,
        offset: usize,
    ) -> Result<LazyValue<'a>, CborError> {
        LazyValue::at(src, self, offset)
    }

    /// Interpret the tag at `offset` with the first matching decoder, or structurally if none
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch if `offset` does not hold a tag, or the decoder's error.
    pub fn decode_tag(&self, src: &dyn ByteSource, offset: usize) -> Result<TagValue, CborError> {
        let arg = read_argument(src, offset)?;
        if arg.head.major != MajorType::SemanticTag {
            return Err(CborError::type_mismatch(
                ValueType::Tag,
                ValueType::of_major(arg.head.major),
                offset,
            ));
        }
        let tag = arg
            .value
            .ok_or_else(|| CborError::new(ErrorCode::IllegalIndefinite, offset))?;
        match self.tags.find(tag) {
            Some(decoder) => {
                let len = self.length.item_byte_size(src, offset)?;
                decoder.decode(self, src, offset, len)
            }
            None => decode_other(self, src, offset),
        }
    }

    /// Fully decode the item at `offset`.
    ///
    /// # Errors
    ///
    /// Returns any decode error of the item or its children.
    pub fn decode(&self, src: &dyn ByteSource, offset: usize) -> Result<Value, CborError> {
        decode_value(&self.length, src, offset).map(|(v, _)| v)
    }
}
