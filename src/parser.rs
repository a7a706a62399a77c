use std::ops::ControlFlow;

use tracing::{debug, debug_span};

use crate::binary::BinaryStrategy;
use crate::builder::Query;
use crate::lazy::LazyValue;
use crate::object::ObjectStrategy;
use crate::pipeline::{visit, Context};
use crate::source::ByteSource;
use crate::strategy::{Selection, Strategy};
use crate::{CborError, Codec};

/// Which projection strategy a [`Parser`] materializes results with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Re-encode projections into one fresh buffer ([`BinaryStrategy`]).
    #[default]
    Binary,
    /// Build projections as an object graph over the source ([`ObjectStrategy`]).
    Object,
}

impl StrategyKind {
    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Object => "object",
        }
    }
}

/// Execution options of a [`Parser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    /// Projection strategy.
    pub strategy: StrategyKind,
    /// With [`PathBuilder::each_stream`](crate::PathBuilder::each_stream), deliver a
    /// [`Selection::Null`] for every stream item that produced no value instead of skipping it.
    pub null_on_stream_miss: bool,
}

/// Runs prepared [`Query`] trees against byte sources.
///
/// A parser is immutable; one instance can serve any number of concurrent executions as long as
/// each has its own source borrow. Every execution gets a fresh context and strategy.
///
/// ```
/// use cbor_skipscan::{Parser, Query};
///
/// // {"a": 1, "b": 2}
/// let bytes = [0xa2, 0x61, b'a', 0x01, 0x61, b'b', 0x02];
/// let query = Query::builder().key("b").build().unwrap();
/// let parser = Parser::new();
/// let hit = parser.select(&bytes, &query).unwrap();
/// assert_eq!(hit.to_value().unwrap().as_integer(), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    codec: Codec,
    options: ParserOptions,
}

impl Parser {
    /// A parser with the default codec and the binary strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the projection strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.options.strategy = strategy;
        self
    }

    /// Replace all options.
    #[must_use]
    pub const fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the codec (limits and tag decoders).
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// The codec used by every execution.
    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The execution options.
    #[must_use]
    pub const fn options(&self) -> ParserOptions {
        self.options
    }

    /// A lazy view over the item at `offset` of `src`, decoded with this parser's codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the head byte at `offset` cannot be read or is reserved.
    pub fn value_at<'a>(
        &'a self,
        src: &'a dyn ByteSource,
        offset: usize,
    ) -> Result<LazyValue<'a>, CborError> {
        self.codec.value_at(src, offset)
    }

    /// The first result of `query`, or [`Selection::Null`] if the query reached nothing.
    ///
    /// # Errors
    ///
    /// Returns decode errors and required type-assertion failures.
    pub fn select<'a>(
        &'a self,
        src: &'a dyn ByteSource,
        query: &Query,
    ) -> Result<Selection<'a>, CborError> {
        let mut first = None;
        self.select_each(src, query, |s| {
            first = Some(s);
            ControlFlow::Break(())
        })?;
        Ok(first.unwrap_or(Selection::Null))
    }

    /// Every result of `query`, in source order.
    ///
    /// # Errors
    ///
    /// Returns decode errors and required type-assertion failures.
    pub fn select_all<'a>(
        &'a self,
        src: &'a dyn ByteSource,
        query: &Query,
    ) -> Result<Vec<Selection<'a>>, CborError> {
        let mut out = Vec::new();
        self.select_each(src, query, |s| {
            out.push(s);
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    /// Hand every result of `query` to `consumer` until it returns [`ControlFlow::Break`].
    ///
    /// Returns the number of results delivered.
    ///
    /// # Errors
    ///
    /// Returns decode errors and required type-assertion failures. Results delivered before the
    /// error stay delivered.
    pub fn select_each<'a, F>(
        &'a self,
        src: &'a dyn ByteSource,
        query: &Query,
        mut consumer: F,
    ) -> Result<usize, CborError>
    where
        F: FnMut(Selection<'a>) -> ControlFlow<()>,
    {
        let kind = self.options.strategy;
        match kind {
            StrategyKind::Binary => {
                let mut strategy = BinaryStrategy::new(*self.codec.length());
                self.run(src, query, kind.name(), &mut strategy, &mut consumer)
            }
            StrategyKind::Object => {
                let mut strategy = ObjectStrategy::new();
                self.run(src, query, kind.name(), &mut strategy, &mut consumer)
            }
        }
    }

    /// Like [`Parser::select_each`], with a caller-supplied strategy instead of the configured one.
    ///
    /// # Errors
    ///
    /// Returns decode errors, required type-assertion failures and strategy errors.
    pub fn select_with<'a, F>(
        &'a self,
        src: &'a dyn ByteSource,
        query: &Query,
        strategy: &mut dyn Strategy<'a>,
        mut consumer: F,
    ) -> Result<usize, CborError>
    where
        F: FnMut(Selection<'a>) -> ControlFlow<()>,
    {
        self.run(src, query, "custom", strategy, &mut consumer)
    }

    fn run<'a>(
        &'a self,
        src: &'a dyn ByteSource,
        query: &Query,
        strategy_name: &'static str,
        strategy: &mut dyn Strategy<'a>,
        consumer: &mut dyn FnMut(Selection<'a>) -> ControlFlow<()>,
    ) -> Result<usize, CborError> {
        let span = debug_span!("cbor_query", strategy = strategy_name, source_len = src.len());
        let _enter = span.enter();
        let mut ctx = Context::new(
            src,
            &self.codec,
            strategy,
            consumer,
            self.options.null_on_stream_miss,
        );
        let outcome = visit(query.root(), &mut ctx)?;
        debug!(results = ctx.delivered(), ?outcome, "query finished");
        Ok(ctx.delivered())
    }
}
