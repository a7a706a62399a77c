use crate::lazy::LazyValue;
use crate::stage::KeyLiteral;
use crate::strategy::{ObjectValue, Selection, Strategy};
use crate::CborError;

#[derive(Debug)]
enum Frame<'a> {
    Sequence(Vec<ObjectValue<'a>>),
    Dictionary {
        entries: Vec<(KeyLiteral, ObjectValue<'a>)>,
        pending: Option<KeyLiteral>,
    },
}

/// Projection strategy that builds an in-memory graph of [`ObjectValue`]s.
///
/// Leaves stay [`LazyValue`]s over the queried source, so no bytes are copied or re-encoded.
#[derive(Debug, Default)]
pub struct ObjectStrategy<'a> {
    frames: Vec<Frame<'a>>,
    root: Option<ObjectValue<'a>>,
}

impl<'a> ObjectStrategy<'a> {
    /// An empty strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, value: ObjectValue<'a>) {
        match self.frames.last_mut() {
            Some(Frame::Sequence(items)) => items.push(value),
            Some(Frame::Dictionary { entries, pending }) => {
                if let Some(key) = pending.take() {
                    entries.push((key, value));
                }
            }
            None => self.root = Some(value),
        }
    }

    fn close(&mut self) {
        let value = match self.frames.pop() {
            Some(Frame::Sequence(items)) => ObjectValue::Sequence(items),
            Some(Frame::Dictionary { entries, .. }) => ObjectValue::Dictionary(entries),
            None => return,
        };
        self.attach(value);
    }
}

impl<'a> Strategy<'a> for ObjectStrategy<'a> {
    fn begin_select(&mut self) {
        self.frames.clear();
        self.root = None;
    }

    fn begin_dictionary(&mut self) -> Result<(), CborError> {
        self.frames.push(Frame::Dictionary {
            entries: Vec::new(),
            pending: None,
        });
        Ok(())
    }

    fn end_dictionary(&mut self) -> Result<(), CborError> {
        self.close();
        Ok(())
    }

    fn begin_sequence(&mut self) -> Result<(), CborError> {
        self.frames.push(Frame::Sequence(Vec::new()));
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<(), CborError> {
        self.close();
        Ok(())
    }

    fn put_dictionary_key(&mut self, key: &KeyLiteral) -> Result<(), CborError> {
        if let Some(Frame::Dictionary { pending, .. }) = self.frames.last_mut() {
            *pending = Some(key.clone());
        }
        Ok(())
    }

    fn put_dictionary_value(&mut self, value: LazyValue<'a>) -> Result<(), CborError> {
        self.attach(ObjectValue::Item(value));
        Ok(())
    }

    fn put_dictionary_null_value(&mut self) -> Result<(), CborError> {
        self.attach(ObjectValue::Null);
        Ok(())
    }

    fn put_sequence_value(&mut self, value: Option<LazyValue<'a>>) -> Result<(), CborError> {
        self.attach(value.map_or(ObjectValue::Null, ObjectValue::Item));
        Ok(())
    }

    fn finalize_select(
        &mut self,
        current: Option<LazyValue<'a>>,
    ) -> Result<Selection<'a>, CborError> {
        while !self.frames.is_empty() {
            self.close();
        }
        Ok(match self.root.take() {
            Some(root) => Selection::Object(root),
            None => current.map_or(Selection::Null, Selection::Item),
        })
    }
}
