#[cfg(feature = "simdutf8")]
use simdutf8::basic as simd_utf8;

use crate::{CborError, ErrorCode};

/// Validates UTF-8 bytes of the text string at `offset` and returns a borrowed `&str`.
#[inline]
pub fn validate(bytes: &[u8], offset: usize) -> Result<&str, CborError> {
    #[cfg(feature = "simdutf8")]
    {
        simd_utf8::from_utf8(bytes).map_err(|_| CborError::new(ErrorCode::Utf8Invalid, offset))
    }

    #[cfg(not(feature = "simdutf8"))]
    {
        core::str::from_utf8(bytes).map_err(|_| CborError::new(ErrorCode::Utf8Invalid, offset))
    }
}

/// Validates an owned buffer, reusing its allocation.
#[inline]
pub fn validate_owned(bytes: Vec<u8>, offset: usize) -> Result<String, CborError> {
    validate(&bytes, offset)?;
    String::from_utf8(bytes).map_err(|_| CborError::new(ErrorCode::Utf8Invalid, offset))
}
