//! Random-access byte containers.
//!
//! The codec never assumes a concrete buffer type: everything reads through [`ByteSource`] and the
//! encoder writes through [`ByteSink`]. In-memory implementations are provided for slices, arrays
//! and vectors. Implementations must be safe for concurrent reads if a source is shared between
//! query executions on different threads.

use crate::{CborError, ErrorCode};

/// A read-only, random-access byte container.
pub trait ByteSource {
    /// Number of readable bytes.
    fn len(&self) -> usize;

    /// Returns `true` if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `offset` addresses a readable byte.
    fn offset_valid(&self, offset: usize) -> bool {
        offset < self.len()
    }

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `offset` is outside the valid region.
    fn read_u8(&self, offset: usize) -> Result<u8, CborError>;

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if any requested byte is outside the valid region.
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError>;

    /// Copy `len` bytes starting at `offset` into `dst`, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns `DestinationTooSmall` if `dst` is shorter than `len`, and `OutOfRange` if any
    /// requested byte is outside the valid region.
    fn read_into(&self, offset: usize, dst: &mut [u8], len: usize) -> Result<usize, CborError> {
        if dst.len() < len {
            return Err(CborError::new(ErrorCode::DestinationTooSmall, offset));
        }
        let src = self.read_slice(offset, len)?;
        dst[..len].copy_from_slice(src);
        Ok(len)
    }
}

/// A writable, random-access byte container.
pub trait ByteSink {
    /// Number of bytes that may be addressed by writes (`usize::MAX` for growable sinks).
    fn capacity(&self) -> usize;

    /// Write one byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `offset` cannot be written.
    fn write_u8(&mut self, offset: usize, byte: u8) -> Result<(), CborError>;

    /// Write the first `len` bytes of `bytes` at `offset`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DestinationTooSmall` if `bytes` is shorter than `len`, and `OutOfRange` if the
    /// written range does not fit the sink.
    fn write(&mut self, offset: usize, bytes: &[u8], len: usize) -> Result<usize, CborError>;
}

#[inline]
fn checked_end(offset: usize, len: usize) -> Result<usize, CborError> {
    offset
        .checked_add(len)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))
}

impl ByteSource for [u8] {
    #[inline]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    #[inline]
    fn read_u8(&self, offset: usize) -> Result<u8, CborError> {
        self.get(offset)
            .copied()
            .ok_or_else(|| CborError::new(ErrorCode::OutOfRange, offset))
    }

    #[inline]
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError> {
        let end = checked_end(offset, len)?;
        self.get(offset..end)
            .ok_or_else(|| CborError::new(ErrorCode::OutOfRange, offset))
    }
}

impl<const N: usize> ByteSource for [u8; N] {
    #[inline]
    fn len(&self) -> usize {
        N
    }

    #[inline]
    fn read_u8(&self, offset: usize) -> Result<u8, CborError> {
        self.as_slice().read_u8(offset)
    }

    #[inline]
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError> {
        self.as_slice().read_slice(offset, len)
    }
}

impl ByteSource for Vec<u8> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn read_u8(&self, offset: usize) -> Result<u8, CborError> {
        self.as_slice().read_u8(offset)
    }

    #[inline]
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError> {
        self.as_slice().read_slice(offset, len)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn offset_valid(&self, offset: usize) -> bool {
        (**self).offset_valid(offset)
    }

    #[inline]
    fn read_u8(&self, offset: usize) -> Result<u8, CborError> {
        (**self).read_u8(offset)
    }

    #[inline]
    fn read_slice(&self, offset: usize, len: usize) -> Result<&[u8], CborError> {
        (**self).read_slice(offset, len)
    }
}

impl ByteSink for [u8] {
    fn capacity(&self) -> usize {
        <[u8]>::len(self)
    }

    fn write_u8(&mut self, offset: usize, byte: u8) -> Result<(), CborError> {
        let slot = self
            .get_mut(offset)
            .ok_or_else(|| CborError::new(ErrorCode::OutOfRange, offset))?;
        *slot = byte;
        Ok(())
    }

    fn write(&mut self, offset: usize, bytes: &[u8], len: usize) -> Result<usize, CborError> {
        let src = bytes
            .get(..len)
            .ok_or_else(|| CborError::new(ErrorCode::DestinationTooSmall, offset))?;
        let end = checked_end(offset, len)?;
        let dst = self
            .get_mut(offset..end)
            .ok_or_else(|| CborError::new(ErrorCode::OutOfRange, offset))?;
        dst.copy_from_slice(src);
        Ok(len)
    }
}

/// A growable sink: writes may overwrite existing bytes or append at the end, but never leave a gap.
impl ByteSink for Vec<u8> {
    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn write_u8(&mut self, offset: usize, byte: u8) -> Result<(), CborError> {
        match offset.cmp(&self.len()) {
            core::cmp::Ordering::Less => {
                self[offset] = byte;
                Ok(())
            }
            core::cmp::Ordering::Equal => {
                self.try_reserve(1)
                    .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))?;
                self.push(byte);
                Ok(())
            }
            core::cmp::Ordering::Greater => Err(CborError::new(ErrorCode::OutOfRange, offset)),
        }
    }

    fn write(&mut self, offset: usize, bytes: &[u8], len: usize) -> Result<usize, CborError> {
        let src = bytes
            .get(..len)
            .ok_or_else(|| CborError::new(ErrorCode::DestinationTooSmall, offset))?;
        if offset > self.len() {
            return Err(CborError::new(ErrorCode::OutOfRange, offset));
        }
        let end = checked_end(offset, len)?;
        let overlap = end.min(self.len());
        self[offset..overlap].copy_from_slice(&src[..overlap - offset]);
        let rest = &src[overlap - offset..];
        if !rest.is_empty() {
            self.try_reserve(rest.len())
                .map_err(|_| CborError::new(ErrorCode::AllocationFailed, offset))?;
            self.extend_from_slice(rest);
        }
        Ok(len)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn write_u8(&mut self, offset: usize, byte: u8) -> Result<(), CborError> {
        (**self).write_u8(offset, byte)
    }

    fn write(&mut self, offset: usize, bytes: &[u8], len: usize) -> Result<usize, CborError> {
        (**self).write(offset, bytes, len)
    }
}
