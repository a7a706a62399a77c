//! Scalar decoding and full recursive decode.
//!
//! The scalar decoders read one item at an offset and never look past it. [`decode_value`] walks a
//! whole item tree and reports the offset where it stopped, which is computed by consuming bytes
//! rather than by asking the [`LengthModel`].

use std::borrow::Cow;

use crate::float::half_to_f64;
use crate::head::{Additional, MajorType, BREAK};
use crate::length::{read_argument, Argument, LengthModel};
use crate::source::ByteSource;
use crate::types::ValueType;
use crate::utf8;
use crate::value::Value;
use crate::{CborError, ErrorCode};

#[inline]
fn next(pos: usize, n: usize) -> Result<usize, CborError> {
    pos.checked_add(n)
        .ok_or_else(|| CborError::new(ErrorCode::LengthOverflow, pos))
}

fn mismatch(expected: ValueType, arg: &Argument, offset: usize) -> CborError {
    CborError::type_mismatch(expected, ValueType::of_major(arg.head.major), offset)
}

/// Decode an unsigned integer (major type 0).
///
/// # Errors
///
/// Returns a type mismatch for any other major type.
pub fn decode_unsigned(src: &dyn ByteSource, offset: usize) -> Result<u64, CborError> {
    let arg = read_argument(src, offset)?;
    match (arg.head.major, arg.value) {
        (MajorType::UnsignedInteger, Some(v)) => Ok(v),
        (MajorType::UnsignedInteger, None) => {
            Err(CborError::new(ErrorCode::IllegalIndefinite, offset))
        }
        _ => Err(mismatch(ValueType::UInt, &arg, offset)),
    }
}

/// Decode a signed integer (major type 0 or 1).
///
/// Both major types share one extraction path: the argument is XOR-ed with a mask that is all ones
/// for major type 1 and zero for major type 0, turning `m` into `-1 - m`.
///
/// # Errors
///
/// Returns a type mismatch for any other major type.
pub fn decode_integer(src: &dyn ByteSource, offset: usize) -> Result<i128, CborError> {
    let arg = read_argument(src, offset)?;
    let major = arg.head.major;
    if !matches!(
        major,
        MajorType::UnsignedInteger | MajorType::NegativeInteger
    ) {
        return Err(mismatch(ValueType::Int, &arg, offset));
    }
    let m = arg
        .value
        .ok_or_else(|| CborError::new(ErrorCode::IllegalIndefinite, offset))?;
    let mask = -i128::from(major.bits() & 1);
    Ok(i128::from(m) ^ mask)
}

/// Decode a float of any width; the width comes from the additional-info bucket.
///
/// # Errors
///
/// Returns a type mismatch if the item is not a half, single or double float.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_float(src: &dyn ByteSource, offset: usize) -> Result<f64, CborError> {
    let arg = read_argument(src, offset)?;
    if arg.head.major != MajorType::FloatingPointOrSimple {
        return Err(mismatch(ValueType::Float, &arg, offset));
    }
    let bits = arg.value.unwrap_or_default();
    match arg.head.additional {
        Additional::TwoByte => Ok(half_to_f64(bits as u16)),
        Additional::FourByte => Ok(f64::from(f32::from_bits(bits as u32))),
        Additional::EightByte => Ok(f64::from_bits(bits)),
        _ => Err(CborError::type_mismatch(
            ValueType::Float,
            ValueType::Simple,
            offset,
        )),
    }
}

/// Decode `false`/`true`.
///
/// # Errors
///
/// Returns `MalformedSimple` for other simple values and a type mismatch for other major types.
pub fn decode_bool(src: &dyn ByteSource, offset: usize) -> Result<bool, CborError> {
    match src.read_u8(offset)? {
        0xf4 => Ok(false),
        0xf5 => Ok(true),
        b if b >> 5 == 7 => Err(CborError::new(ErrorCode::MalformedSimple, offset)),
        b => Err(CborError::type_mismatch(
            ValueType::Bool,
            ValueType::of_major(MajorType::from_head(b)),
            offset,
        )),
    }
}

/// Payload of the string at `offset` plus the offset just past it.
///
/// Definite strings are borrowed from the source; indefinite strings are concatenated from their
/// chunks, which must all be definite strings of the opening major type.
///
/// # Errors
///
/// Returns a type mismatch for non-strings and `IllegalChunk` for bad chunks.
pub fn decode_bytes<'s>(
    model: &LengthModel,
    src: &'s dyn ByteSource,
    offset: usize,
) -> Result<(Cow<'s, [u8]>, usize), CborError> {
    let arg = read_argument(src, offset)?;
    let major = arg.head.major;
    if !matches!(major, MajorType::ByteString | MajorType::TextString) {
        return Err(mismatch(ValueType::String, &arg, offset));
    }
    let start = next(offset, arg.header_len)?;
    if let Some(len) = arg.value {
        let len = model.checked_string_len(arg, len, offset)?;
        let payload = src.read_slice(start, len)?;
        return Ok((Cow::Borrowed(payload), next(start, len)?));
    }

    let mut out = Vec::new();
    let mut pos = start;
    loop {
        if src.read_u8(pos)? == BREAK {
            return Ok((Cow::Owned(out), next(pos, 1)?));
        }
        let chunk = read_argument(src, pos)?;
        let (Some(len), true) = (chunk.value, chunk.head.major == major) else {
            return Err(CborError::new(ErrorCode::IllegalChunk, pos));
        };
        let len = model.checked_string_len(chunk, len, pos)?;
        let body = next(pos, chunk.header_len)?;
        let payload = src.read_slice(body, len)?;
        out.try_reserve(len)
            .map_err(|_| CborError::new(ErrorCode::AllocationFailed, pos))?;
        out.extend_from_slice(payload);
        pos = next(body, len)?;
    }
}

/// Decode a text string, plus the offset just past it.
///
/// # Errors
///
/// Returns a type mismatch for anything but major type 3, and `Utf8Invalid` for bad payloads.
pub fn decode_text<'s>(
    model: &LengthModel,
    src: &'s dyn ByteSource,
    offset: usize,
) -> Result<(Cow<'s, str>, usize), CborError> {
    let head = src.read_u8(offset)?;
    if MajorType::from_head(head) != MajorType::TextString {
        return Err(CborError::type_mismatch(
            ValueType::TextString,
            ValueType::of_major(MajorType::from_head(head)),
            offset,
        ));
    }
    let (payload, end) = decode_bytes(model, src, offset)?;
    let text = match payload {
        Cow::Borrowed(b) => Cow::Borrowed(utf8::validate(b, offset)?),
        Cow::Owned(v) => Cow::Owned(utf8::validate_owned(v, offset)?),
    };
    Ok((text, end))
}

/// Fully decode the item at `offset` into an owned [`Value`], returning it with the offset just
/// past the consumed bytes.
///
/// # Errors
///
/// Returns any decode error of the item or its children, including `DepthLimitExceeded`.
pub fn decode_value(
    model: &LengthModel,
    src: &dyn ByteSource,
    offset: usize,
) -> Result<(Value, usize), CborError> {
    decode_at(model, src, offset, 0)
}

fn decode_at(
    model: &LengthModel,
    src: &dyn ByteSource,
    offset: usize,
    depth: usize,
) -> Result<(Value, usize), CborError> {
    if depth > model.limits().max_depth {
        return Err(CborError::new(ErrorCode::DepthLimitExceeded, offset));
    }
    let arg = read_argument(src, offset)?;
    let after_head = next(offset, arg.header_len)?;
    match arg.head.major {
        MajorType::UnsignedInteger | MajorType::NegativeInteger => {
            Ok((Value::Integer(decode_integer(src, offset)?), after_head))
        }
        MajorType::ByteString => {
            let (b, end) = decode_bytes(model, src, offset)?;
            Ok((Value::Bytes(b.into_owned()), end))
        }
        MajorType::TextString => {
            let (t, end) = decode_text(model, src, offset)?;
            Ok((Value::Text(t.into_owned()), end))
        }
        MajorType::Sequence => {
            let mut items = Vec::new();
            let mut pos = after_head;
            match arg.value {
                Some(n) => {
                    for _ in 0..container_len(model, n, offset)? {
                        let (v, end) = decode_at(model, src, pos, depth + 1)?;
                        items.push(v);
                        pos = end;
                    }
                }
                None => {
                    while src.read_u8(pos)? != BREAK {
                        let (v, end) = decode_at(model, src, pos, depth + 1)?;
                        items.push(v);
                        pos = end;
                    }
                    pos = next(pos, 1)?;
                }
            }
            Ok((Value::Sequence(items), pos))
        }
        MajorType::Dictionary => {
            let mut entries = Vec::new();
            let mut pos = after_head;
            match arg.value {
                Some(n) => {
                    for _ in 0..container_len(model, n, offset)? {
                        let (k, end) = decode_at(model, src, pos, depth + 1)?;
                        let (v, end) = decode_at(model, src, end, depth + 1)?;
                        entries.push((k, v));
                        pos = end;
                    }
                }
                None => {
                    while src.read_u8(pos)? != BREAK {
                        let (k, end) = decode_at(model, src, pos, depth + 1)?;
                        if src.read_u8(end)? == BREAK {
                            return Err(CborError::new(ErrorCode::OddDictionary, offset));
                        }
                        let (v, end) = decode_at(model, src, end, depth + 1)?;
                        entries.push((k, v));
                        pos = end;
                    }
                    pos = next(pos, 1)?;
                }
            }
            Ok((Value::Dictionary(entries), pos))
        }
        MajorType::SemanticTag => {
            let tag = arg
                .value
                .ok_or_else(|| CborError::new(ErrorCode::IllegalIndefinite, offset))?;
            let (inner, end) = decode_at(model, src, after_head, depth + 1)?;
            Ok((Value::Tag(tag, Box::new(inner)), end))
        }
        MajorType::FloatingPointOrSimple => {
            let v = match arg.head.additional {
                Additional::Literal(20) => Value::Bool(false),
                Additional::Literal(21) => Value::Bool(true),
                Additional::Literal(22) => Value::Null,
                Additional::Literal(23) => Value::Undefined,
                Additional::Literal(v) => Value::Simple(v),
                Additional::OneByte => {
                    let v = arg.value.and_then(|v| u8::try_from(v).ok());
                    match v {
                        Some(v) if v >= 32 => Value::Simple(v),
                        _ => return Err(CborError::new(ErrorCode::MalformedSimple, offset)),
                    }
                }
                Additional::TwoByte | Additional::FourByte | Additional::EightByte => {
                    Value::Float(decode_float(src, offset)?)
                }
                Additional::Indefinite => {
                    return Err(CborError::new(ErrorCode::UnexpectedBreak, offset))
                }
            };
            Ok((v, after_head))
        }
    }
}

fn container_len(model: &LengthModel, n: u64, offset: usize) -> Result<usize, CborError> {
    let n = usize::try_from(n).map_err(|_| CborError::new(ErrorCode::LengthOverflow, offset))?;
    if n > model.limits().max_container_len {
        return Err(CborError::new(ErrorCode::ContainerLenLimitExceeded, offset));
    }
    Ok(n)
}
