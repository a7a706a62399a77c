use crate::encode::Encoder;
use crate::CborError;

/// An arbitrary-precision integer carried by tag 2 (unsigned) or tag 3 (negative).
///
/// The represented value is `magnitude` for unsigned bignums and `-1 - magnitude` for negative
/// ones, with `magnitude` read as a big-endian unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigNum {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigNum {
    /// Construct a bignum from sign and big-endian magnitude bytes.
    #[must_use]
    pub const fn new(negative: bool, magnitude: Vec<u8>) -> Self {
        Self {
            negative,
            magnitude,
        }
    }

    /// Construct the bignum representation of `v` with a minimal magnitude.
    #[must_use]
    pub fn from_i128(v: i128) -> Self {
        let negative = v < 0;
        let n = if negative { !v } else { v };
        let bytes = n.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Self {
            negative,
            magnitude: bytes[first..].to_vec(),
        }
    }

    /// `true` for tag 3.
    #[inline]
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    /// Big-endian magnitude bytes.
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> &[u8] {
        &self.magnitude
    }

    /// The tag number that carries this bignum.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u64 {
        if self.negative {
            3
        } else {
            2
        }
    }

    /// The value as an `i128`, if it fits.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        let digits = match self.magnitude.iter().position(|&b| b != 0) {
            Some(i) => &self.magnitude[i..],
            None => return Some(if self.negative { -1 } else { 0 }),
        };
        if digits.len() > 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf[16 - digits.len()..].copy_from_slice(digits);
        let m = u128::from_be_bytes(buf);
        let m = i128::try_from(m).ok()?;
        Some(if self.negative { !m } else { m })
    }
}

/// A decoded number.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    /// Major type 0 or 1.
    Integer(i128),
    /// Half, single or double precision float widened to `f64`.
    Float(f64),
    /// Tag 2 or 3.
    Big(BigNum),
}

impl Number {
    /// The value as an `i128` if it is integral and fits.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Big(b) => b.to_i128(),
            Self::Float(_) => None,
        }
    }

    /// The value as an `f64` (integers may lose precision).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Big(b) => b.to_i128().map(|i| i as f64),
        }
    }
}

/// An owned, fully decoded item.
///
/// Integers are held as `i128` so every major type 0/1 argument is represented exactly. Tags are
/// kept structurally; semantic interpretation goes through the tag registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Major type 0 or 1.
    Integer(i128),
    /// Any float width.
    Float(f64),
    /// Major type 2.
    Bytes(Vec<u8>),
    /// Major type 3.
    Text(String),
    /// Major type 4.
    Sequence(Vec<Value>),
    /// Major type 5, in encoded order.
    Dictionary(Vec<(Value, Value)>),
    /// Major type 6.
    Tag(u64, Box<Value>),
    /// `false` / `true`.
    Bool(bool),
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
    /// Any other simple value.
    Simple(u8),
}

impl Value {
    /// Look up a dictionary entry by text key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dictionary(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Self::Text(t) if t == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Index into a sequence.
    #[must_use]
    pub fn index(&self, i: usize) -> Option<&Self> {
        match self {
            Self::Sequence(items) => items.get(i),
            _ => None,
        }
    }

    /// Integer payload.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Encode into a fresh buffer using canonical headers.
    ///
    /// # Errors
    ///
    /// Returns an error if allocation fails or a [`Value::Simple`] holds an unencodable value
    /// (20..=31).
    pub fn encode(&self) -> Result<Vec<u8>, CborError> {
        let mut enc = Encoder::new();
        enc.value(self)?;
        Ok(enc.into_vec())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(i) => Self::Integer(i),
            Number::Float(f) => Self::Float(f),
            Number::Big(b) => {
                let tag = b.tag();
                Self::Tag(tag, Box::new(Self::Bytes(b.magnitude)))
            }
        }
    }
}
