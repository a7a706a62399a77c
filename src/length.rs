//! Skip-scan length model.
//!
//! Computes header sizes, item byte sizes and container element counts purely from headers,
//! recursing into children only where a length is not declared up front (containers and
//! indefinite strings). Nothing is cached: sizes are recomputed on every call.

use crate::head::{decompose, Additional, Head, MajorType, BREAK};
use crate::source::ByteSource;
use crate::types::ValueType;
use crate::{CborError, DecodeLimits, ErrorCode};

/// A decoded header: the head byte plus its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argument {
    /// The decomposed head byte.
    pub head: Head,
    /// Literal or following argument value; `None` for indefinite lengths.
    pub value: Option<u64>,
    /// Header size in bytes (head byte plus argument bytes).
    pub header_len: usize,
}

/// Read the header at `offset`.
///
/// # Errors
///
/// Returns `ReservedAdditionalInfo` for reserved buckets and `OutOfRange` if the header is
/// truncated.
pub fn read_argument(src: &dyn ByteSource, offset: usize) -> Result<Argument, CborError> {
    let head = decompose(src.read_u8(offset)?, offset)?;
    let value = match head.additional {
        Additional::Literal(v) => Some(u64::from(v)),
        Additional::Indefinite => None,
        other => {
            let n = other.extra_bytes();
            let s = src.read_slice(add(offset, 1, offset)?, n)?;
            let mut buf = [0u8; 8];
            buf[8 - n..].copy_from_slice(s);
            Some(u64::from_be_bytes(buf))
        }
    };
    Ok(Argument {
        head,
        value,
        header_len: head.size(),
    })
}

#[inline]
fn add(a: usize, b: usize, off: usize) -> Result<usize, CborError> {
    a.checked_add(b)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, off))
}

/// Read the header of a container item whose coarse type matches `container`.
fn container_argument(
    src: &dyn ByteSource,
    offset: usize,
    container: ValueType,
) -> Result<Argument, CborError> {
    let arg = read_argument(src, offset)?;
    let actual = ValueType::of_major(arg.head.major);
    if arg.head.major.is_container() && actual.matches(container) {
        Ok(arg)
    } else {
        Err(CborError::type_mismatch(container, actual, offset))
    }
}

#[inline]
fn is_break_at(src: &dyn ByteSource, pos: usize) -> Result<bool, CborError> {
    Ok(src.read_u8(pos)? == BREAK)
}

/// Header-driven size and count computations, bounded by [`DecodeLimits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LengthModel {
    limits: DecodeLimits,
}

impl LengthModel {
    /// Construct a length model enforcing `limits`.
    #[must_use]
    pub const fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// The limits enforced by this model.
    #[must_use]
    pub const fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Size of the header at `offset`: 1 + {0, 1, 2, 4, 8}.
    ///
    /// # Errors
    ///
    /// Returns `ReservedAdditionalInfo` for reserved buckets and `OutOfRange` past the source end.
    pub fn head_byte_size(&self, src: &dyn ByteSource, offset: usize) -> Result<usize, CborError> {
        Ok(decompose(src.read_u8(offset)?, offset)?.size())
    }

    /// Total encoded size of the item at `offset`, including nested children.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is malformed, truncated or exceeds the configured limits.
    pub fn item_byte_size(&self, src: &dyn ByteSource, offset: usize) -> Result<usize, CborError> {
        self.item_size(src, offset, 0)
    }

    /// Offset just past the item at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`LengthModel::item_byte_size`].
    pub fn skip(&self, src: &dyn ByteSource, offset: usize) -> Result<usize, CborError> {
        add(offset, self.item_size(src, offset, 0)?, offset)
    }

    /// Offset just past `n` consecutive items starting at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`LengthModel::item_byte_size`].
    pub fn skip_items(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        n: usize,
    ) -> Result<usize, CborError> {
        let mut pos = offset;
        for _ in 0..n {
            pos = self.skip(src, pos)?;
        }
        Ok(pos)
    }

    /// Number of logical elements of the container at `offset`.
    ///
    /// Sequences count one element per item; dictionaries count one element per key/value pair.
    /// Indefinite containers are scanned up to their break byte. `container` is the type the
    /// caller accepts: [`ValueType::Sequence`], [`ValueType::Dictionary`] or [`ValueType::Any`].
    ///
    /// # Errors
    ///
    /// Returns a type mismatch naming `container` for any other item, and decode errors for
    /// malformed children.
    pub fn element_count(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        container: ValueType,
    ) -> Result<usize, CborError> {
        let arg = container_argument(src, offset, container)?;
        let major = arg.head.major;
        match arg.value {
            Some(n) => self.checked_container_len(n, offset),
            None => {
                let first = add(offset, arg.header_len, offset)?;
                let (items, _) = self.scan_until_break(src, first, 1)?;
                if major == MajorType::Dictionary {
                    if items % 2 != 0 {
                        return Err(CborError::new(ErrorCode::OddDictionary, offset));
                    }
                    Ok(items / 2)
                } else {
                    Ok(items)
                }
            }
        }
    }

    /// Iterate over the item slots of the container at `offset` (keys and values alternate for
    /// dictionaries). `container` is accepted as in [`LengthModel::element_count`].
    ///
    /// # Errors
    ///
    /// Returns a type mismatch naming `container` for any other item, and decode errors for a
    /// malformed header.
    pub fn children<'s>(
        &self,
        src: &'s dyn ByteSource,
        offset: usize,
        container: ValueType,
    ) -> Result<Children<'s>, CborError> {
        let arg = container_argument(src, offset, container)?;
        let major = arg.head.major;
        let remaining = match arg.value {
            Some(n) => Some(self.container_slots(major, n, offset)?),
            None => None,
        };
        Ok(Children {
            src,
            model: *self,
            pos: add(offset, arg.header_len, offset)?,
            remaining,
            offset,
        })
    }

    fn item_size(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        depth: usize,
    ) -> Result<usize, CborError> {
        if depth > self.limits.max_depth {
            return Err(CborError::new(ErrorCode::DepthLimitExceeded, offset));
        }
        let arg = read_argument(src, offset)?;
        match arg.head.major {
            MajorType::UnsignedInteger | MajorType::NegativeInteger => match arg.value {
                Some(_) => Ok(arg.header_len),
                None => Err(CborError::new(ErrorCode::IllegalIndefinite, offset)),
            },
            MajorType::ByteString | MajorType::TextString => self.string_size(src, offset, arg),
            MajorType::Sequence | MajorType::Dictionary => {
                self.container_size(src, offset, arg, depth)
            }
            MajorType::SemanticTag => {
                if arg.value.is_none() {
                    return Err(CborError::new(ErrorCode::IllegalIndefinite, offset));
                }
                let inner = add(offset, arg.header_len, offset)?;
                add(arg.header_len, self.item_size(src, inner, depth + 1)?, offset)
            }
            MajorType::FloatingPointOrSimple => match arg.head.additional {
                Additional::Indefinite => {
                    let start = add(offset, 1, offset)?;
                    let (_, end) = self.scan_until_break(src, start, depth + 1)?;
                    Ok(end - offset)
                }
                _ => Ok(arg.header_len),
            },
        }
    }

    fn string_size(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        arg: Argument,
    ) -> Result<usize, CborError> {
        let Some(len) = arg.value else {
            let mut pos = add(offset, 1, offset)?;
            loop {
                if is_break_at(src, pos)? {
                    return Ok(pos + 1 - offset);
                }
                let chunk = read_argument(src, pos)?;
                let Some(chunk_len) = chunk.value else {
                    return Err(CborError::new(ErrorCode::IllegalChunk, pos));
                };
                if chunk.head.major != arg.head.major {
                    return Err(CborError::new(ErrorCode::IllegalChunk, pos));
                }
                let size = self.definite_string_size(src, pos, chunk, chunk_len)?;
                pos = add(pos, size, pos)?;
            }
        };
        self.definite_string_size(src, offset, arg, len)
    }

    fn definite_string_size(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        arg: Argument,
        len: u64,
    ) -> Result<usize, CborError> {
        let len = self.checked_string_len(arg, len, offset)?;
        let size = add(arg.header_len, len, offset)?;
        let end = add(offset, size, offset)?;
        if end > src.len() {
            return Err(CborError::new(ErrorCode::OutOfRange, offset));
        }
        Ok(size)
    }

    fn container_size(
        &self,
        src: &dyn ByteSource,
        offset: usize,
        arg: Argument,
        depth: usize,
    ) -> Result<usize, CborError> {
        let first = add(offset, arg.header_len, offset)?;
        match arg.value {
            Some(n) => {
                let slots = self.container_slots(arg.head.major, n, offset)?;
                let mut pos = first;
                for _ in 0..slots {
                    let size = self.item_size(src, pos, depth + 1)?;
                    pos = add(pos, size, pos)?;
                }
                Ok(pos - offset)
            }
            None => {
                let (items, end) = self.scan_until_break(src, first, depth + 1)?;
                if arg.head.major == MajorType::Dictionary && items % 2 != 0 {
                    return Err(CborError::new(ErrorCode::OddDictionary, offset));
                }
                Ok(end - offset)
            }
        }
    }

    /// Walk items from `start` until a break byte; returns the item count and the offset just past
    /// the break byte.
    fn scan_until_break(
        &self,
        src: &dyn ByteSource,
        start: usize,
        depth: usize,
    ) -> Result<(usize, usize), CborError> {
        let mut pos = start;
        let mut items = 0usize;
        loop {
            if is_break_at(src, pos)? {
                return Ok((items, add(pos, 1, pos)?));
            }
            let size = self.item_size(src, pos, depth)?;
            pos = add(pos, size, pos)?;
            items += 1;
        }
    }

    pub(crate) fn checked_string_len(
        &self,
        arg: Argument,
        len: u64,
        offset: usize,
    ) -> Result<usize, CborError> {
        if arg.head.additional == Additional::EightByte {
            return Err(CborError::new(ErrorCode::UnsupportedLength, offset));
        }
        let len = usize::try_from(len)
            .map_err(|_| CborError::new(ErrorCode::LengthOverflow, offset))?;
        if len > self.limits.max_string_len {
            return Err(CborError::new(ErrorCode::StringLenLimitExceeded, offset));
        }
        Ok(len)
    }

    fn checked_container_len(&self, n: u64, offset: usize) -> Result<usize, CborError> {
        let n = usize::try_from(n).map_err(|_| CborError::new(ErrorCode::LengthOverflow, offset))?;
        if n > self.limits.max_container_len {
            return Err(CborError::new(ErrorCode::ContainerLenLimitExceeded, offset));
        }
        Ok(n)
    }

    fn container_slots(&self, major: MajorType, n: u64, offset: usize) -> Result<usize, CborError> {
        let n = self.checked_container_len(n, offset)?;
        if major == MajorType::Dictionary {
            n.checked_mul(2)
                .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, offset))
        } else {
            Ok(n)
        }
    }
}

/// Iterator over the item offsets of one container.
///
/// Definite containers yield exactly their declared number of slots; indefinite containers yield
/// items until the break byte. Each step skip-scans the yielded item to find the next one.
pub struct Children<'s> {
    src: &'s dyn ByteSource,
    model: LengthModel,
    pos: usize,
    remaining: Option<usize>,
    offset: usize,
}

impl std::fmt::Debug for Children<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Children")
            .field("model", &self.model)
            .field("pos", &self.pos)
            .field("remaining", &self.remaining)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl Children<'_> {
    /// Offset of the container head byte.
    #[must_use]
    pub const fn container_offset(&self) -> usize {
        self.offset
    }

    /// Offset of the next slot (or of the break byte once exhausted).
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    fn step(&mut self) -> Result<Option<usize>, CborError> {
        match self.remaining {
            Some(0) => return Ok(None),
            Some(ref mut n) => *n -= 1,
            None => {
                if is_break_at(self.src, self.pos)? {
                    self.remaining = Some(0);
                    return Ok(None);
                }
            }
        }
        let start = self.pos;
        let size = self.model.item_size(self.src, start, 1)?;
        self.pos = add(start, size, start)?;
        Ok(Some(start))
    }
}

impl Iterator for Children<'_> {
    type Item = Result<usize, CborError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(pos)) => Some(Ok(pos)),
            Ok(None) => None,
            Err(e) => {
                self.remaining = Some(0);
                Some(Err(e))
            }
        }
    }
}
