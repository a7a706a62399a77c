use crate::encode::Encoder;
use crate::head::MajorType;
use crate::lazy::LazyValue;
use crate::length::LengthModel;
use crate::stage::KeyLiteral;
use crate::strategy::{EncodedValue, Selection, Strategy};
use crate::CborError;

#[derive(Debug, Clone, Copy)]
struct Frame {
    major: MajorType,
    start: usize,
    count: usize,
}

/// Projection strategy that re-encodes output into one growable buffer.
///
/// Keys are written as text or integers, projected values are copied byte for byte from the
/// source, and each container's definite header is inserted at its start once the element count is
/// known. Nothing is allocated per entry.
#[derive(Debug, Default)]
pub struct BinaryStrategy {
    enc: Encoder,
    frames: Vec<Frame>,
    model: LengthModel,
}

impl BinaryStrategy {
    /// A strategy whose results decode with `model`.
    #[must_use]
    pub fn new(model: LengthModel) -> Self {
        Self {
            enc: Encoder::new(),
            frames: Vec::new(),
            model,
        }
    }

    fn count_in_sequence(&mut self) {
        if let Some(f) = self.frames.last_mut() {
            if f.major == MajorType::Sequence {
                f.count += 1;
            }
        }
    }

    fn begin(&mut self, major: MajorType) {
        self.count_in_sequence();
        self.frames.push(Frame {
            major,
            start: self.enc.position(),
            count: 0,
        });
    }

    fn end(&mut self) -> Result<(), CborError> {
        match self.frames.pop() {
            Some(f) => self.enc.insert_head(f.start, f.major, f.count),
            None => Ok(()),
        }
    }

    fn copy(&mut self, value: &LazyValue<'_>) -> Result<(), CborError> {
        self.enc.raw(value.raw()?)
    }
}

impl<'a> Strategy<'a> for BinaryStrategy {
    fn begin_select(&mut self) {
        self.enc.clear();
        self.frames.clear();
    }

    fn begin_dictionary(&mut self) -> Result<(), CborError> {
        self.begin(MajorType::Dictionary);
        Ok(())
    }

    fn end_dictionary(&mut self) -> Result<(), CborError> {
        self.end()
    }

    fn begin_sequence(&mut self) -> Result<(), CborError> {
        self.begin(MajorType::Sequence);
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<(), CborError> {
        self.end()
    }

    fn put_dictionary_key(&mut self, key: &KeyLiteral) -> Result<(), CborError> {
        if let Some(f) = self.frames.last_mut() {
            f.count += 1;
        }
        match key {
            KeyLiteral::Text(s) => self.enc.text(s),
            KeyLiteral::Int(i) => self.enc.int(*i),
        }
    }

    fn put_dictionary_value(&mut self, value: LazyValue<'a>) -> Result<(), CborError> {
        self.copy(&value)
    }

    fn put_dictionary_null_value(&mut self) -> Result<(), CborError> {
        self.enc.null()
    }

    fn put_sequence_value(&mut self, value: Option<LazyValue<'a>>) -> Result<(), CborError> {
        self.count_in_sequence();
        match value {
            Some(v) => self.copy(&v),
            None => self.enc.null(),
        }
    }

    fn finalize_select(
        &mut self,
        current: Option<LazyValue<'a>>,
    ) -> Result<Selection<'a>, CborError> {
        while !self.frames.is_empty() {
            self.end()?;
        }
        if self.enc.is_empty() {
            return Ok(current.map_or(Selection::Null, Selection::Item));
        }
        let bytes = std::mem::take(&mut self.enc).into_vec();
        Ok(Selection::Encoded(EncodedValue::new(bytes, self.model)))
    }
}
