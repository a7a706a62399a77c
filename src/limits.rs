/// Default maximum nesting depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum container length limit for sequences/dictionaries.
///
/// This is a safety limit; adjust explicitly for your deployment.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1 << 24;

/// Default maximum string length in bytes.
pub const DEFAULT_MAX_STRING_LEN: usize = 1 << 30;

/// Decode-time resource limits for skip-scanning and decoding.
///
/// Limits are enforced deterministically while headers are read; they never depend on timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum nesting depth followed by the length model and the full decoder.
    pub max_depth: usize,
    /// Maximum declared element count of a sequence, or entry count of a dictionary.
    pub max_container_len: usize,
    /// Maximum declared byte length of a string (or of one chunk of an indefinite string).
    pub max_string_len: usize,
}

impl DecodeLimits {
    /// Construct conservative limits derived from a maximum message size.
    ///
    /// No well-formed item inside `max_message_bytes` can declare a string longer than the message
    /// or more elements than it has bytes, so both are capped by it.
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_container_len: max_message_bytes.min(DEFAULT_MAX_CONTAINER_LEN),
            max_string_len: max_message_bytes.min(DEFAULT_MAX_STRING_LEN),
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_container_len: DEFAULT_MAX_CONTAINER_LEN,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}
