//! Fluent construction of query trees.
//!
//! ```
//! use cbor_skipscan::{Query, TypeSpec, ValueType};
//!
//! // users[*] -> {"name": .name, "first_tag": .tags[0]}
//! let query = Query::builder()
//!     .key("users")
//!     .all()
//!     .expect(TypeSpec::nullable(ValueType::Dictionary))
//!     .dictionary(|d| {
//!         d.entry("name", |p| p.key("name"))
//!             .entry("first_tag", |p| p.key("tags").index(0))
//!     })
//!     .build()
//!     .unwrap();
//! # let _ = query;
//! ```
//!
//! Path steps compose left to right. At most one projection ([`PathBuilder::dictionary`] or
//! [`PathBuilder::sequence`]) may end a path; any step after it is rejected by `build`. Inside a
//! projection, a path that iterates (`all`/`filter`) gathers every value it reaches into a
//! sequence.

use crate::predicate::Predicate;
use crate::stage::{KeyLiteral, Op, Stage};
use crate::types::TypeSpec;
use crate::{CborError, ErrorCode};

fn invalid() -> CborError {
    CborError::new(ErrorCode::InvalidQuery, 0)
}

/// A prepared, immutable query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    root: Stage,
}

impl Query {
    /// Start a top-level path.
    #[must_use]
    pub fn builder() -> PathBuilder {
        PathBuilder::new(false)
    }

    /// Wrap a tree produced by another front end.
    ///
    /// The tree must have the shape [`Query::builder`] produces: a [`Op::Base`] root, stream steps
    /// only as its leading run, every top-level path ending in one [`Op::Select`], projections only
    /// under `Select` or inside an entry, and [`Op::Emit`]/[`Op::Collect`] only inside entries.
    /// Inside an entry, iteration must be wrapped in `Collect` so the entry is written once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` for any other shape.
    pub fn from_stage(root: Stage) -> Result<Self, CborError> {
        if !matches!(root.op(), Op::Base) {
            return Err(invalid());
        }
        validate_path(root.children(), Scope::Stream)?;
        Ok(Self { root })
    }

    /// The root stage.
    #[must_use]
    pub const fn root(&self) -> &Stage {
        &self.root
    }
}

/// Builder for one path: a chain of navigation steps, optionally ending in a projection.
#[derive(Debug, Clone)]
#[must_use]
pub struct PathBuilder {
    ops: Vec<Op>,
    projection: Option<Stage>,
    nested: bool,
    error: Option<CborError>,
}

impl PathBuilder {
    fn new(nested: bool) -> Self {
        Self {
            ops: Vec::new(),
            projection: None,
            nested,
            error: None,
        }
    }

    fn fail(mut self) -> Self {
        self.error.get_or_insert_with(invalid);
        self
    }

    fn step(mut self, op: Op) -> Self {
        if self.projection.is_some() {
            return self.fail();
        }
        self.ops.push(op);
        self
    }

    fn stream_step(self, op: Op) -> Self {
        let only_streams = self
            .ops
            .iter()
            .all(|o| matches!(o, Op::StreamIndex(_) | Op::EachStream));
        if self.nested || !only_streams {
            return self.fail();
        }
        self.step(op)
    }

    /// Select the `n`-th top-level item of a multi-item stream.
    pub fn stream_index(self, n: usize) -> Self {
        self.stream_step(Op::StreamIndex(n))
    }

    /// Run the rest of the path once per top-level item of a multi-item stream.
    pub fn each_stream(self) -> Self {
        self.stream_step(Op::EachStream)
    }

    /// Descend into sequence element `i`.
    pub fn index(self, i: usize) -> Self {
        self.step(Op::SequenceIndex(i))
    }

    /// Descend into the value stored under a text key.
    pub fn key(self, key: &str) -> Self {
        self.step(Op::DictionaryLookup(Predicate::from(key)))
    }

    /// Descend into the value stored under an integer key.
    pub fn key_int(self, key: i64) -> Self {
        self.step(Op::DictionaryLookup(Predicate::from(key)))
    }

    /// Descend into the value of the first entry whose key satisfies `predicate`.
    pub fn key_matching(self, predicate: Predicate) -> Self {
        self.step(Op::DictionaryLookup(predicate))
    }

    /// Visit every sequence element.
    pub fn all(self) -> Self {
        self.step(Op::SequenceAll)
    }

    /// Visit the sequence elements satisfying `predicate`.
    pub fn filter(self, predicate: impl Into<Predicate>) -> Self {
        self.step(Op::SequenceMatch(predicate.into()))
    }

    /// Assert the current item's type.
    pub fn expect(self, spec: TypeSpec) -> Self {
        self.step(Op::TypeMatch(spec))
    }

    /// End the path with a dictionary projection.
    pub fn dictionary<F>(mut self, f: F) -> Self
    where
        F: FnOnce(DictionaryBuilder) -> DictionaryBuilder,
    {
        if self.projection.is_some() {
            return self.fail();
        }
        let d = f(DictionaryBuilder::default());
        if let Some(e) = d.error {
            self.error.get_or_insert(e);
        }
        self.projection = Some(Stage::new(Op::AsDictionary, d.entries));
        self
    }

    /// End the path with a sequence projection.
    pub fn sequence<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SequenceBuilder) -> SequenceBuilder,
    {
        if self.projection.is_some() {
            return self.fail();
        }
        let s = f(SequenceBuilder::default());
        if let Some(e) = s.error {
            self.error.get_or_insert(e);
        }
        self.projection = Some(Stage::new(Op::AsSequence, s.elements));
        self
    }

    /// Finish a top-level path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuery` if a step followed a projection, a stream step was misplaced, or this
    /// builder belongs to a projection entry.
    pub fn build(self) -> Result<Query, CborError> {
        if self.nested {
            return Err(invalid());
        }
        if let Some(e) = self.error {
            return Err(e);
        }
        let select = Stage::new(Op::Select, self.projection.into_iter().collect());
        let chain = chain(self.ops, select, false);
        Ok(Query {
            root: Stage::new(Op::Base, vec![chain]),
        })
    }

    fn into_entry_chain(self) -> Result<Stage, CborError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let terminal = self
            .projection
            .unwrap_or_else(|| Stage::leaf(Op::Emit));
        Ok(chain(self.ops, terminal, true))
    }
}

/// Fold `ops` right to left around `terminal`. With `collect`, a [`Op::Collect`] stage is put in
/// front of the first iterating step.
fn chain(ops: Vec<Op>, terminal: Stage, collect: bool) -> Stage {
    let collect_at = if collect {
        ops.iter()
            .position(|op| matches!(op, Op::SequenceAll | Op::SequenceMatch(_)))
    } else {
        None
    };
    let mut stage = terminal;
    for (i, op) in ops.into_iter().enumerate().rev() {
        stage = Stage::new(op, vec![stage]);
        if collect_at == Some(i) {
            stage = Stage::new(Op::Collect, vec![stage]);
        }
    }
    stage
}

/// Where a stage sits in a tree, which decides the operations allowed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Under `Base` or a stream step.
    Stream,
    /// A top-level path past its stream steps.
    Path,
    /// Inside a projection entry; `collected` once a `Collect` encloses the stage.
    Entry { collected: bool },
}

/// The continuation of a path step. Uncollected entries must not fan out.
fn validate_path(children: &[Stage], scope: Scope) -> Result<(), CborError> {
    match children.len() {
        0 => return Err(invalid()),
        1 => {}
        _ if scope == (Scope::Entry { collected: false }) => return Err(invalid()),
        _ => {}
    }
    children.iter().try_for_each(|c| validate(c, scope))
}

fn validate(stage: &Stage, scope: Scope) -> Result<(), CborError> {
    let in_entry = matches!(scope, Scope::Entry { .. });
    let path = if scope == Scope::Stream {
        Scope::Path
    } else {
        scope
    };
    match stage.op() {
        Op::StreamIndex(_) | Op::EachStream if scope == Scope::Stream => {
            validate_path(stage.children(), Scope::Stream)
        }
        Op::SequenceIndex(_) | Op::DictionaryLookup(_) | Op::TypeMatch(_) => {
            validate_path(stage.children(), path)
        }
        Op::SequenceAll | Op::SequenceMatch(_) if scope != (Scope::Entry { collected: false }) => {
            validate_path(stage.children(), path)
        }
        Op::Collect if in_entry => {
            validate_path(stage.children(), Scope::Entry { collected: true })
        }
        Op::Select if !in_entry => match stage.children() {
            [] => Ok(()),
            [projection] => validate_projection(projection),
            _ => Err(invalid()),
        },
        Op::AsDictionary | Op::AsSequence if in_entry => validate_projection(stage),
        Op::Emit if in_entry && stage.children().is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

fn validate_projection(stage: &Stage) -> Result<(), CborError> {
    for slot in stage.children() {
        match (stage.op(), slot.op()) {
            (Op::AsDictionary, Op::DictionaryEntry(_)) | (Op::AsSequence, Op::SequenceElement) => {
                validate_path(slot.children(), Scope::Entry { collected: false })?;
            }
            _ => return Err(invalid()),
        }
    }
    if matches!(stage.op(), Op::AsDictionary | Op::AsSequence) {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Builder for the entries of a dictionary projection.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct DictionaryBuilder {
    entries: Vec<Stage>,
    error: Option<CborError>,
}

impl DictionaryBuilder {
    /// Add an entry under `key` whose value is produced by the path built in `f`, relative to the
    /// projected item. A path that reaches nothing yields `null`.
    pub fn entry<K, F>(mut self, key: K, f: F) -> Self
    where
        K: Into<KeyLiteral>,
        F: FnOnce(PathBuilder) -> PathBuilder,
    {
        match f(PathBuilder::new(true)).into_entry_chain() {
            Ok(chain) => self
                .entries
                .push(Stage::new(Op::DictionaryEntry(key.into()), vec![chain])),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }
}

/// Builder for the elements of a sequence projection.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct SequenceBuilder {
    elements: Vec<Stage>,
    error: Option<CborError>,
}

impl SequenceBuilder {
    /// Add an element produced by the path built in `f`, relative to the projected item. A path
    /// that reaches nothing yields `null`.
    pub fn element<F>(mut self, f: F) -> Self
    where
        F: FnOnce(PathBuilder) -> PathBuilder,
    {
        match f(PathBuilder::new(true)).into_entry_chain() {
            Ok(chain) => self
                .elements
                .push(Stage::new(Op::SequenceElement, vec![chain])),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }
}
