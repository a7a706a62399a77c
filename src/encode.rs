use crate::float::{shortest, FloatWidth};
use crate::head::{compose, Length, MajorType, BREAK};
use crate::source::ByteSink;
use crate::value::{BigNum, Value};
use crate::{CborError, ErrorCode};

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const UNDEFINED: u8 = 0xf7;

/// Streaming encoder that writes canonical headers into any [`ByteSink`].
///
/// Every header goes through [`compose`], so lengths and integer arguments always use the
/// narrowest bucket. The encoder keeps its own write position; with a `Vec<u8>` sink it appends.
#[derive(Debug, Clone, Default)]
pub struct Encoder<K: ByteSink = Vec<u8>> {
    sink: K,
    pos: usize,
}

impl Encoder<Vec<u8>> {
    /// Create an encoder over a new growable buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sink: Vec::new(),
            pos: 0,
        }
    }

    /// Create an encoder with pre-allocated capacity.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the buffer cannot be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self, CborError> {
        let mut sink = Vec::new();
        sink.try_reserve(capacity)
            .map_err(|_| CborError::new(ErrorCode::AllocationFailed, 0))?;
        Ok(Self { sink, pos: 0 })
    }

    /// Borrow the bytes emitted so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.sink[..self.pos.min(self.sink.len())]
    }

    /// Consume and return the encoded bytes.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<u8> {
        self.sink.truncate(self.pos);
        self.sink
    }

    /// Discard everything written so far, keeping the allocation.
    pub fn clear(&mut self) {
        self.sink.clear();
        self.pos = 0;
    }

    /// Insert the canonical header for a definite container of `len` elements at `at`, shifting
    /// the bytes already written after it.
    pub(crate) fn insert_head(
        &mut self,
        at: usize,
        major: MajorType,
        len: usize,
    ) -> Result<(), CborError> {
        let head = compose(major, Length::Definite(self.len_arg(len)?));
        if at > self.pos {
            return Err(CborError::new(ErrorCode::OutOfRange, at));
        }
        self.sink.truncate(self.pos);
        self.sink
            .try_reserve(head.len())
            .map_err(|_| CborError::new(ErrorCode::AllocationFailed, at))?;
        self.sink.splice(at..at, head.as_bytes().iter().copied());
        self.pos += head.len();
        Ok(())
    }
}

impl<K: ByteSink> Encoder<K> {
    /// Create an encoder writing into `sink` from offset 0.
    pub const fn on(sink: K) -> Self {
        Self { sink, pos: 0 }
    }

    /// Create an encoder writing into `sink` from `offset`.
    pub const fn at(sink: K, offset: usize) -> Self {
        Self { sink, pos: offset }
    }

    /// Current write offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes written so far (for encoders created with [`Encoder::on`]).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pos
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Release the sink.
    pub fn into_inner(self) -> K {
        self.sink
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), CborError> {
        let n = self.sink.write(self.pos, bytes, bytes.len())?;
        self.pos += n;
        Ok(())
    }

    fn write_u8(&mut self, byte: u8) -> Result<(), CborError> {
        self.sink.write_u8(self.pos, byte)?;
        self.pos += 1;
        Ok(())
    }

    fn len_arg(&self, len: usize) -> Result<u64, CborError> {
        u64::try_from(len).map_err(|_| CborError::new(ErrorCode::LengthOverflow, self.pos))
    }

    /// Write a canonical header.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn head(&mut self, major: MajorType, length: Length) -> Result<(), CborError> {
        self.write(compose(major, length).as_bytes())
    }

    /// Encode an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn uint(&mut self, v: u64) -> Result<(), CborError> {
        self.head(MajorType::UnsignedInteger, Length::Definite(v))
    }

    /// Encode the negative integer `-1 - n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn nint(&mut self, n: u64) -> Result<(), CborError> {
        self.head(MajorType::NegativeInteger, Length::Definite(n))
    }

    /// Encode a signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    #[allow(clippy::cast_sign_loss)]
    pub fn int(&mut self, v: i64) -> Result<(), CborError> {
        if v >= 0 {
            self.uint(v as u64)
        } else {
            self.nint(!v as u64)
        }
    }

    /// Encode any `i128`, falling back to a bignum tag when the magnitude exceeds 64 bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn integer(&mut self, v: i128) -> Result<(), CborError> {
        let negative = v < 0;
        let m = if negative { !v } else { v };
        match u64::try_from(m) {
            Ok(m) if negative => self.nint(m),
            Ok(m) => self.uint(m),
            Err(_) => self.bignum(&BigNum::from_i128(v)),
        }
    }

    /// Encode a bignum as tag 2/3 wrapping its magnitude bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn bignum(&mut self, b: &BigNum) -> Result<(), CborError> {
        self.tag(b.tag())?;
        self.bytes(b.magnitude())
    }

    /// Encode a float using the shortest width that holds it exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn float(&mut self, v: f64) -> Result<(), CborError> {
        match shortest(v) {
            FloatWidth::Half(h) => self.float16_bits(h),
            FloatWidth::Single(s) => self.float32(s),
            FloatWidth::Double(d) => self.float64(d),
        }
    }

    /// Encode a raw half-precision bit pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn float16_bits(&mut self, bits: u16) -> Result<(), CborError> {
        let [a, b] = bits.to_be_bytes();
        self.write(&[0xf9, a, b])
    }

    /// Encode a single-precision float.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn float32(&mut self, v: f32) -> Result<(), CborError> {
        let mut buf = [0xfa; 5];
        buf[1..].copy_from_slice(&v.to_bits().to_be_bytes());
        self.write(&buf)
    }

    /// Encode a double-precision float.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn float64(&mut self, v: f64) -> Result<(), CborError> {
        let mut buf = [0xfb; 9];
        buf[1..].copy_from_slice(&v.to_bits().to_be_bytes());
        self.write(&buf)
    }

    /// Encode a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn bool(&mut self, v: bool) -> Result<(), CborError> {
        self.write_u8(if v { TRUE } else { FALSE })
    }

    /// Encode `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn null(&mut self) -> Result<(), CborError> {
        self.write_u8(NULL)
    }

    /// Encode `undefined`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn undefined(&mut self) -> Result<(), CborError> {
        self.write_u8(UNDEFINED)
    }

    /// Encode a simple value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedSimple` for 20..=23 (use [`Encoder::bool`], [`Encoder::null`] or
    /// [`Encoder::undefined`]) and 24..=31 (not encodable as a simple value), and sink errors.
    pub fn simple(&mut self, v: u8) -> Result<(), CborError> {
        match v {
            0..=19 => self.write_u8(0xe0 | v),
            20..=31 => Err(CborError::new(ErrorCode::MalformedSimple, self.pos)),
            _ => self.write(&[0xf8, v]),
        }
    }

    /// Encode a definite byte string.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn bytes(&mut self, b: &[u8]) -> Result<(), CborError> {
        let len = self.len_arg(b.len())?;
        self.head(MajorType::ByteString, Length::Definite(len))?;
        self.write(b)
    }

    /// Encode a definite text string.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn text(&mut self, s: &str) -> Result<(), CborError> {
        let len = self.len_arg(s.len())?;
        self.head(MajorType::TextString, Length::Definite(len))?;
        self.write(s.as_bytes())
    }

    /// Encode text as a byte string when it is pure ASCII, otherwise as a text string.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn string(&mut self, s: &str) -> Result<(), CborError> {
        if s.is_ascii() {
            self.bytes(s.as_bytes())
        } else {
            self.text(s)
        }
    }

    /// Encode a tag header; the tagged item must be written next.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn tag(&mut self, tag: u64) -> Result<(), CborError> {
        self.head(MajorType::SemanticTag, Length::Definite(tag))
    }

    /// Splice already encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the write.
    pub fn raw(&mut self, bytes: &[u8]) -> Result<(), CborError> {
        self.write(bytes)
    }

    /// Encode an owned value tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects a write.
    pub fn value(&mut self, v: &Value) -> Result<(), CborError> {
        match v {
            Value::Integer(i) => self.integer(*i),
            Value::Float(f) => self.float(*f),
            Value::Bytes(b) => self.bytes(b),
            Value::Text(s) => self.text(s),
            Value::Sequence(items) => self.sequence(items.len(), |s| {
                items.iter().try_for_each(|item| s.value(item))
            }),
            Value::Dictionary(entries) => self.dictionary(entries.len(), |d| {
                entries
                    .iter()
                    .try_for_each(|(k, v)| d.entry(|e| e.value(k), |e| e.value(v)))
            }),
            Value::Tag(tag, inner) => {
                self.tag(*tag)?;
                self.value(inner)
            }
            Value::Bool(b) => self.bool(*b),
            Value::Null => self.null(),
            Value::Undefined => self.undefined(),
            Value::Simple(s) => self.simple(*s),
        }
    }

    /// Encode a definite-length sequence and fill it via the provided builder.
    ///
    /// # Errors
    ///
    /// Returns `SequenceLenMismatch` if the builder emits a different number of elements, or any
    /// error raised by the builder. On error the write position is rewound to the header.
    pub fn sequence<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut SequenceEncoder<'_, K>) -> Result<(), CborError>,
    {
        let start = self.pos;
        let res = self.sequence_inner(len, f);
        if res.is_err() {
            self.pos = start;
        }
        res
    }

    fn sequence_inner<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut SequenceEncoder<'_, K>) -> Result<(), CborError>,
    {
        let n = self.len_arg(len)?;
        self.head(MajorType::Sequence, Length::Definite(n))?;
        let mut s = SequenceEncoder {
            enc: self,
            remaining: Some(len),
        };
        f(&mut s)?;
        if s.remaining != Some(0) {
            return Err(CborError::new(ErrorCode::SequenceLenMismatch, self.pos));
        }
        Ok(())
    }

    /// Encode a definite-length dictionary and fill it via the provided builder.
    ///
    /// # Errors
    ///
    /// Returns `DictionaryLenMismatch` if the builder emits a different number of entries, or any
    /// error raised by the builder. On error the write position is rewound to the header.
    pub fn dictionary<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut DictionaryEncoder<'_, K>) -> Result<(), CborError>,
    {
        let start = self.pos;
        let res = self.dictionary_inner(len, f);
        if res.is_err() {
            self.pos = start;
        }
        res
    }

    fn dictionary_inner<F>(&mut self, len: usize, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut DictionaryEncoder<'_, K>) -> Result<(), CborError>,
    {
        let n = self.len_arg(len)?;
        self.head(MajorType::Dictionary, Length::Definite(n))?;
        let mut d = DictionaryEncoder {
            enc: self,
            remaining: Some(len),
        };
        f(&mut d)?;
        if d.remaining != Some(0) {
            return Err(CborError::new(ErrorCode::DictionaryLenMismatch, self.pos));
        }
        Ok(())
    }

    /// Encode an indefinite-length sequence, terminated by a break byte.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the builder or the sink.
    pub fn indefinite_sequence<F>(&mut self, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut SequenceEncoder<'_, K>) -> Result<(), CborError>,
    {
        self.head(MajorType::Sequence, Length::Indefinite)?;
        f(&mut SequenceEncoder {
            enc: self,
            remaining: None,
        })?;
        self.write_u8(BREAK)
    }

    /// Encode an indefinite-length dictionary, terminated by a break byte.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the builder or the sink.
    pub fn indefinite_dictionary<F>(&mut self, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut DictionaryEncoder<'_, K>) -> Result<(), CborError>,
    {
        self.head(MajorType::Dictionary, Length::Indefinite)?;
        f(&mut DictionaryEncoder {
            enc: self,
            remaining: None,
        })?;
        self.write_u8(BREAK)
    }

    /// Encode an indefinite byte string from definite chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects a write.
    pub fn indefinite_bytes(&mut self, chunks: &[&[u8]]) -> Result<(), CborError> {
        self.head(MajorType::ByteString, Length::Indefinite)?;
        for chunk in chunks {
            self.bytes(chunk)?;
        }
        self.write_u8(BREAK)
    }

    /// Encode an indefinite text string from definite chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects a write.
    pub fn indefinite_text(&mut self, chunks: &[&str]) -> Result<(), CborError> {
        self.head(MajorType::TextString, Length::Indefinite)?;
        for chunk in chunks {
            self.text(chunk)?;
        }
        self.write_u8(BREAK)
    }
}

/// Builder for writing sequence elements.
///
/// Definite sequences reject elements beyond the declared count.
pub struct SequenceEncoder<'e, K: ByteSink> {
    enc: &'e mut Encoder<K>,
    remaining: Option<usize>,
}

impl<K: ByteSink> SequenceEncoder<'_, K> {
    fn consume_one(&mut self) -> Result<(), CborError> {
        match self.remaining {
            Some(0) => Err(CborError::new(
                ErrorCode::SequenceLenMismatch,
                self.enc.position(),
            )),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Write one element with the full encoder API.
    ///
    /// The closure must write exactly one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence length is exceeded or if encoding fails.
    pub fn element<F>(&mut self, f: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut Encoder<K>) -> Result<(), CborError>,
    {
        self.consume_one()?;
        f(self.enc)
    }

    /// Encode an owned value as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence length is exceeded or if encoding fails.
    pub fn value(&mut self, v: &Value) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.value(v)
    }

    /// Encode an integer as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence length is exceeded or if encoding fails.
    pub fn int(&mut self, v: i64) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.int(v)
    }

    /// Encode text as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence length is exceeded or if encoding fails.
    pub fn text(&mut self, s: &str) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.text(s)
    }

    /// Encode `null` as the next element.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence length is exceeded or if encoding fails.
    pub fn null(&mut self) -> Result<(), CborError> {
        self.consume_one()?;
        self.enc.null()
    }
}

/// Builder for writing dictionary entries.
pub struct DictionaryEncoder<'e, K: ByteSink> {
    enc: &'e mut Encoder<K>,
    remaining: Option<usize>,
}

impl<K: ByteSink> DictionaryEncoder<'_, K> {
    /// Write one entry: `key` then `value` must each write exactly one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the dictionary length is exceeded or if encoding fails.
    pub fn entry<FK, FV>(&mut self, key: FK, value: FV) -> Result<(), CborError>
    where
        FK: FnOnce(&mut Encoder<K>) -> Result<(), CborError>,
        FV: FnOnce(&mut Encoder<K>) -> Result<(), CborError>,
    {
        match self.remaining {
            Some(0) => {
                return Err(CborError::new(
                    ErrorCode::DictionaryLenMismatch,
                    self.enc.position(),
                ))
            }
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        key(self.enc)?;
        value(self.enc)
    }

    /// Write an entry under a text key.
    ///
    /// # Errors
    ///
    /// Returns an error if the dictionary length is exceeded or if encoding fails.
    pub fn text_entry<F>(&mut self, key: &str, value: F) -> Result<(), CborError>
    where
        F: FnOnce(&mut Encoder<K>) -> Result<(), CborError>,
    {
        self.entry(|e| e.text(key), value)
    }
}
