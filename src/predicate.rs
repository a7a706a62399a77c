use std::fmt;
use std::sync::Arc;

use crate::head::MajorType;
use crate::lazy::LazyValue;
use crate::length::read_argument;
use crate::primitive::{decode_bool, decode_bytes, decode_float, decode_integer};
use crate::types::ValueType;
use crate::CborError;

type PredicateFn = dyn Fn(&LazyValue<'_>) -> Result<bool, CborError> + Send + Sync;

/// A caller-supplied predicate. Two custom predicates are equal only if they share the same
/// closure allocation.
#[derive(Clone)]
pub struct CustomPredicate {
    name: Arc<str>,
    f: Arc<PredicateFn>,
}

impl CustomPredicate {
    /// Wrap `f` under a descriptive `name` (used by `Debug`).
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&LazyValue<'_>) -> Result<bool, CborError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// The descriptive name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomPredicate").field(&self.name).finish()
    }
}

/// A test applied to one item: a dictionary key during lookups, or a sequence element while
/// filtering.
///
/// Items of a different type than the predicate expects simply do not match.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A byte or text string whose payload equals the given text.
    TextEquals(Box<str>),
    /// An integer equal to the given value.
    IntEquals(i128),
    /// A float equal to the given value.
    FloatEquals(f64),
    /// A boolean equal to the given value.
    BoolEquals(bool),
    /// The `null` literal.
    IsNull,
    /// A caller-supplied test.
    Custom(CustomPredicate),
}

impl Predicate {
    /// Build a [`Predicate::Custom`].
    pub fn custom<F>(name: &str, f: F) -> Self
    where
        F: Fn(&LazyValue<'_>) -> Result<bool, CborError> + Send + Sync + 'static,
    {
        Self::Custom(CustomPredicate::new(name, f))
    }

    /// Evaluate against `value`.
    ///
    /// Text comparisons of definite strings compare the payload borrowed from the source without
    /// decoding it.
    ///
    /// # Errors
    ///
    /// Returns decode errors from the item, or the error of a custom predicate.
    pub fn test(&self, value: &LazyValue<'_>) -> Result<bool, CborError> {
        let src = value.source();
        let offset = value.offset();
        match self {
            Self::TextEquals(expected) => {
                if !matches!(
                    value.major_type(),
                    MajorType::ByteString | MajorType::TextString
                ) {
                    return Ok(false);
                }
                let arg = read_argument(src, offset)?;
                if let Some(len) = arg.value {
                    if usize::try_from(len).ok() != Some(expected.len()) {
                        return Ok(false);
                    }
                }
                let (payload, _) = decode_bytes(value.codec().length(), src, offset)?;
                Ok(&*payload == expected.as_bytes())
            }
            Self::IntEquals(expected) => {
                if !value.value_type().matches(ValueType::Int) {
                    return Ok(false);
                }
                Ok(decode_integer(src, offset)? == *expected)
            }
            Self::FloatEquals(expected) => {
                if value.value_type() != ValueType::Float {
                    return Ok(false);
                }
                #[allow(clippy::float_cmp)]
                let eq = decode_float(src, offset)? == *expected;
                Ok(eq)
            }
            Self::BoolEquals(expected) => {
                if value.value_type() != ValueType::Bool {
                    return Ok(false);
                }
                Ok(decode_bool(src, offset)? == *expected)
            }
            Self::IsNull => Ok(value.is_null()),
            Self::Custom(c) => (c.f)(value),
        }
    }
}

impl From<&str> for Predicate {
    fn from(s: &str) -> Self {
        Self::TextEquals(s.into())
    }
}

impl From<String> for Predicate {
    fn from(s: String) -> Self {
        Self::TextEquals(s.into_boxed_str())
    }
}

impl From<i64> for Predicate {
    fn from(v: i64) -> Self {
        Self::IntEquals(i128::from(v))
    }
}

impl From<bool> for Predicate {
    fn from(v: bool) -> Self {
        Self::BoolEquals(v)
    }
}

impl From<f64> for Predicate {
    fn from(v: f64) -> Self {
        Self::FloatEquals(v)
    }
}
