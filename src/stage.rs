//! The immutable query tree.
//!
//! A [`Stage`] is one node: an [`Op`] plus the child stages it delegates to. Trees are produced by
//! [`crate::Query::builder`] (or by any front end that emits the same shape) and are never mutated
//! afterwards, so one tree can be evaluated concurrently against many sources.

use crate::predicate::Predicate;
use crate::types::TypeSpec;
use crate::value::Value;

/// Control signal returned by every stage evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    /// Proceed with the next sibling.
    Continue,
    /// Abandon the current subtree; an enclosing loop moves on to its next candidate.
    Break,
    /// Abandon the whole execution.
    Exit,
}

/// A literal dictionary key written by projections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyLiteral {
    /// A text key.
    Text(Box<str>),
    /// An integer key.
    Int(i64),
}

impl From<&str> for KeyLiteral {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for KeyLiteral {
    fn from(s: String) -> Self {
        Self::Text(s.into_boxed_str())
    }
}

impl From<i64> for KeyLiteral {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&KeyLiteral> for Value {
    fn from(k: &KeyLiteral) -> Self {
        match k {
            KeyLiteral::Text(s) => Self::Text(s.to_string()),
            KeyLiteral::Int(i) => Self::Integer(i128::from(*i)),
        }
    }
}

/// The operation performed by one stage.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Op {
    /// Root: skips a leading self-describe tag, then runs the children.
    Base,
    /// Skip `n` whole items of a multi-item stream.
    StreamIndex(usize),
    /// Run the children once per item of a multi-item stream.
    EachStream,
    /// Descend into one sequence element.
    SequenceIndex(usize),
    /// Run the children once per sequence element.
    SequenceAll,
    /// Run the children once per sequence element satisfying the predicate.
    SequenceMatch(Predicate),
    /// Descend into the value of the first entry whose key satisfies the predicate.
    DictionaryLookup(Predicate),
    /// Run the children only if the current item has the given type.
    TypeMatch(TypeSpec),
    /// Gather the values emitted by the children into one sequence.
    Collect,
    /// Project a dictionary; every child is a [`Op::DictionaryEntry`].
    AsDictionary,
    /// Write the key, then the value produced by the children (null if they produce none).
    DictionaryEntry(KeyLiteral),
    /// Project a sequence; every child is a [`Op::SequenceElement`].
    AsSequence,
    /// Write the value produced by the children (null if they produce none).
    SequenceElement,
    /// Write the current item into the enclosing projection.
    Emit,
    /// Terminal: materialize the result and hand it to the consumer.
    Select,
}

/// One node of a query tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    op: Op,
    children: Vec<Stage>,
}

impl Stage {
    /// A node running `op` and delegating to `children`.
    #[must_use]
    pub const fn new(op: Op, children: Vec<Self>) -> Self {
        Self { op, children }
    }

    /// A node without children.
    #[must_use]
    pub const fn leaf(op: Op) -> Self {
        Self::new(op, Vec::new())
    }

    /// The operation.
    #[must_use]
    pub const fn op(&self) -> &Op {
        &self.op
    }

    /// The child stages, in evaluation order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }
}
