//! # cbor-skipscan
//!
//! Navigate, validate and re-project encoded CBOR without fully decoding it.
//!
//! ## Design principles
//!
//! - **Skip, don't decode.**
//!   [`LengthModel`] computes the byte size of any item from its headers alone, so a query jumps
//!   straight over everything it does not need.
//! - **Views are offsets.**
//!   A [`LazyValue`] is a source borrow plus a head-byte offset. Payloads are read only when an
//!   extractor asks for them, and `null` answers every extractor with `Ok(None)`.
//! - **Queries are immutable trees.**
//!   [`Query::builder`] produces a [`Stage`] tree once; a [`Parser`] evaluates it against any
//!   number of sources, each execution with its own context and projection [`Strategy`].
//! - **Misses are data, malformed input is an error.**
//!   A lookup that finds nothing yields `null`; reserved header bits, truncation and required type
//!   assertions fail with a [`CborError`] carrying the byte offset.
//!
//! ## Quick start
//!
//! ```
//! use cbor_skipscan::{Encoder, Parser, Query, StrategyKind, Value};
//!
//! let mut enc = Encoder::new();
//! enc.dictionary(2, |d| {
//!     d.text_entry("id", |e| e.uint(7))?;
//!     d.text_entry("tags", |e| {
//!         e.sequence(2, |s| {
//!             s.text("a")?;
//!             s.text("b")
//!         })
//!     })
//! })
//! .unwrap();
//! let bytes = enc.into_vec();
//!
//! let query = Query::builder()
//!     .dictionary(|d| d.entry("first", |p| p.key("tags").index(0)))
//!     .build()
//!     .unwrap();
//!
//! for kind in [StrategyKind::Binary, StrategyKind::Object] {
//!     let parser = Parser::new().with_strategy(kind);
//!     let out = parser.select(&bytes, &query).unwrap().to_value().unwrap();
//!     assert_eq!(out.get("first"), Some(&Value::from("a")));
//! }
//! ```
//!
//! ## Feature flags
//!
//! - `sha2` *(default)*: enables [`EncodedValue::sha256`] for re-encoded projection output.
//! - `serde`: implements `Serialize`/`Deserialize` for [`Value`].
//! - `simdutf8`: enables SIMD-accelerated UTF-8 validation where supported.
//!
//! ## Logging
//!
//! Query execution emits [`tracing`] events: a `cbor_query` debug span per execution, `trace!`
//! events for lookup misses, and a `debug!` event when the execution finishes. The crate never
//! installs a subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

mod binary;
mod builder;
mod codec;
mod encode;
mod error;
pub mod float;
pub mod head;
mod lazy;
mod length;
mod limits;
mod object;
mod parser;
mod pipeline;
mod predicate;
pub mod primitive;
#[cfg(feature = "serde")]
mod serde_impl;
mod source;
mod stage;
mod strategy;
mod tags;
mod types;
pub(crate) mod utf8;
mod value;

pub use crate::binary::BinaryStrategy;
pub use crate::builder::{DictionaryBuilder, PathBuilder, Query, SequenceBuilder};
pub use crate::codec::Codec;
pub use crate::encode::{DictionaryEncoder, Encoder, SequenceEncoder};
pub use crate::error::{CborError, ErrorCode, ErrorKind};
pub use crate::head::MajorType;
pub use crate::lazy::{DictionaryIter, DictionaryView, LazyValue, SequenceView};
pub use crate::length::{read_argument, Argument, Children, LengthModel};
pub use crate::limits::{
    DecodeLimits, DEFAULT_MAX_CONTAINER_LEN, DEFAULT_MAX_DEPTH, DEFAULT_MAX_STRING_LEN,
};
pub use crate::object::ObjectStrategy;
pub use crate::parser::{Parser, ParserOptions, StrategyKind};
pub use crate::predicate::{CustomPredicate, Predicate};
pub use crate::source::{ByteSink, ByteSource};
pub use crate::stage::{KeyLiteral, Op, Stage, VisitResult};
pub use crate::strategy::{EncodedValue, ObjectValue, Selection, Strategy};
pub use crate::tags::{
    tagged_offset, TagDecoder, TagRegistry, TagValue, TAG_DATE_TIME, TAG_ENCODED_ITEM,
    TAG_NEGATIVE_BIGNUM, TAG_SELF_DESCRIBE, TAG_TIMESTAMP, TAG_UNSIGNED_BIGNUM, TAG_URI,
};
pub use crate::types::{TypeSpec, ValueType};
pub use crate::value::{BigNum, Number, Value};
