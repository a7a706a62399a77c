use core::fmt;

use crate::types::ValueType;

/// The high-level class of an error.
///
/// The codec distinguishes:
/// - **Out-of-range** errors: reads or writes past the valid region of a source or sink.
/// - **Illegal encoding** errors: bytes that are not a well-formed item (reserved additional
///   info, unsupported lengths, malformed simple values, misplaced break bytes).
/// - **Type mismatch** errors: the item at an offset does not have the requested shape.
/// - **Encode** errors: the encoder was driven inconsistently (e.g. wrong element count).
/// - **Query definition** errors: a query tree could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access outside a source or sink.
    OutOfRange,
    /// Malformed encoding.
    IllegalEncoding,
    /// Requested shape does not match the decoded type.
    TypeMismatch,
    /// Encoder misuse.
    Encode,
    /// Query preparation failure.
    QueryDefinition,
}

/// A structured error code identifying the reason an operation was rejected.
///
/// This enum is string-free and `Copy` to remain hot-path friendly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Read or write outside the valid region of a byte source or sink.
    OutOfRange,
    /// Destination buffer is smaller than the requested read length.
    DestinationTooSmall,
    /// Arithmetic overflow while computing a length/offset.
    LengthOverflow,
    /// Memory allocation failed while building owned output.
    AllocationFailed,

    /// Reserved additional-info value (28..30) was used.
    ReservedAdditionalInfo,
    /// A string declared an eight-byte length.
    UnsupportedLength,
    /// Indefinite-length encoding on a major type that cannot carry it.
    IllegalIndefinite,
    /// A simple value that is not a valid boolean (or other expected literal).
    MalformedSimple,
    /// A break byte appeared where an item was expected.
    UnexpectedBreak,
    /// A chunk of an indefinite string is not a definite string of the same major type.
    IllegalChunk,
    /// An indefinite dictionary holds an odd number of items.
    OddDictionary,
    /// Invalid UTF-8 in a text string.
    Utf8Invalid,

    /// Nesting depth limit exceeded.
    DepthLimitExceeded,
    /// Container element count exceeds limits.
    ContainerLenLimitExceeded,
    /// String byte length exceeds limits.
    StringLenLimitExceeded,

    /// The item does not have the requested type.
    TypeMismatch {
        /// The type the caller asked for.
        expected: ValueType,
        /// The type actually found at the offset.
        actual: ValueType,
    },

    /// A definite sequence was written with a different number of elements than declared.
    SequenceLenMismatch,
    /// A definite dictionary was written with a different number of entries than declared.
    DictionaryLenMismatch,

    /// A query tree could not be built from the given steps.
    InvalidQuery,
}

impl ErrorCode {
    /// Returns the taxonomy class of this code.
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::OutOfRange | Self::DestinationTooSmall => ErrorKind::OutOfRange,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::SequenceLenMismatch | Self::DictionaryLenMismatch | Self::AllocationFailed => {
                ErrorKind::Encode
            }
            Self::InvalidQuery => ErrorKind::QueryDefinition,
            Self::LengthOverflow
            | Self::ReservedAdditionalInfo
            | Self::UnsupportedLength
            | Self::IllegalIndefinite
            | Self::MalformedSimple
            | Self::UnexpectedBreak
            | Self::IllegalChunk
            | Self::OddDictionary
            | Self::Utf8Invalid
            | Self::DepthLimitExceeded
            | Self::ContainerLenLimitExceeded
            | Self::StringLenLimitExceeded => ErrorKind::IllegalEncoding,
        }
    }
}

/// An error with a stable code and the byte offset where it was detected.
///
/// For decode errors the offset is the head byte of the offending item. For encode errors it is the
/// sink write position at the time of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CborError {
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset where the error was detected.
    pub offset: usize,
}

impl CborError {
    /// Construct an error at `offset`.
    #[inline]
    #[must_use]
    pub const fn new(code: ErrorCode, offset: usize) -> Self {
        Self { code, offset }
    }

    /// Construct a type-mismatch error at `offset`.
    #[inline]
    #[must_use]
    pub const fn type_mismatch(expected: ValueType, actual: ValueType, offset: usize) -> Self {
        Self::new(ErrorCode::TypeMismatch { expected, actual }, offset)
    }

    /// Returns the taxonomy class of this error.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        self.code.kind()
    }

    /// Returns true iff this is a type-mismatch error.
    #[inline]
    #[must_use]
    pub const fn is_type_mismatch(self) -> bool {
        matches!(self.code, ErrorCode::TypeMismatch { .. })
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self.code {
            ErrorCode::OutOfRange => "offset outside the valid region",
            ErrorCode::DestinationTooSmall => "destination smaller than requested length",
            ErrorCode::LengthOverflow => "length overflow",
            ErrorCode::AllocationFailed => "allocation failed",

            ErrorCode::ReservedAdditionalInfo => "reserved additional info value",
            ErrorCode::UnsupportedLength => "eight-byte string length is unsupported",
            ErrorCode::IllegalIndefinite => "indefinite length not allowed for this major type",
            ErrorCode::MalformedSimple => "malformed simple value",
            ErrorCode::UnexpectedBreak => "unexpected break byte",
            ErrorCode::IllegalChunk => "indefinite string chunk has the wrong type",
            ErrorCode::OddDictionary => "dictionary holds an odd number of items",
            ErrorCode::Utf8Invalid => "text must be valid UTF-8",

            ErrorCode::DepthLimitExceeded => "nesting depth limit exceeded",
            ErrorCode::ContainerLenLimitExceeded => "container length exceeds decode limits",
            ErrorCode::StringLenLimitExceeded => "string length exceeds decode limits",

            ErrorCode::TypeMismatch { expected, actual } => {
                return write!(
                    f,
                    "cbor type mismatch at {}: expected {}, found {}",
                    self.offset,
                    expected.name(),
                    actual.name()
                );
            }

            ErrorCode::SequenceLenMismatch => "sequence element count differs from header",
            ErrorCode::DictionaryLenMismatch => "dictionary entry count differs from header",

            ErrorCode::InvalidQuery => "invalid query definition",
        };

        match self.kind() {
            ErrorKind::Encode => write!(f, "cbor encode failed at {}: {msg}", self.offset),
            ErrorKind::QueryDefinition => write!(f, "cbor query definition failed: {msg}"),
            _ => write!(f, "cbor decode failed at {}: {msg}", self.offset),
        }
    }
}

impl std::error::Error for CborError {}
