//! Stage evaluation.
//!
//! Every stage starts with `Context::offset` at the head byte of its current item and hands its
//! children the item they should see. `None` is the null offset: it marks a lookup that found
//! nothing and is always paired with [`VisitResult::Break`].

use std::ops::ControlFlow;

use tracing::trace;

use crate::head::MajorType;
use crate::lazy::LazyValue;
use crate::length::read_argument;
use crate::predicate::Predicate;
use crate::source::ByteSource;
use crate::stage::{Op, Stage, VisitResult};
use crate::strategy::{Selection, Strategy};
use crate::tags::TAG_SELF_DESCRIBE;
use crate::types::ValueType;
use crate::{CborError, Codec, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Dictionary,
    Sequence,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    filled: bool,
    collect: bool,
}

/// Per-execution state. Never shared between executions.
pub(crate) struct Context<'a, 'r> {
    src: &'a dyn ByteSource,
    codec: &'a Codec,
    offset: Option<usize>,
    strategy: &'r mut dyn Strategy<'a>,
    frames: Vec<Frame>,
    consumer: &'r mut dyn FnMut(Selection<'a>) -> ControlFlow<()>,
    null_on_stream_miss: bool,
    delivered: usize,
}

impl<'a, 'r> Context<'a, 'r> {
    pub(crate) fn new(
        src: &'a dyn ByteSource,
        codec: &'a Codec,
        strategy: &'r mut dyn Strategy<'a>,
        consumer: &'r mut dyn FnMut(Selection<'a>) -> ControlFlow<()>,
        null_on_stream_miss: bool,
    ) -> Self {
        Self {
            src,
            codec,
            offset: Some(0),
            strategy,
            frames: Vec::new(),
            consumer,
            null_on_stream_miss,
            delivered: 0,
        }
    }

    /// Number of results handed to the consumer.
    pub(crate) const fn delivered(&self) -> usize {
        self.delivered
    }

    fn current(&self) -> Result<usize, CborError> {
        self.offset
            .ok_or_else(|| CborError::new(ErrorCode::OutOfRange, self.src.len()))
    }

    fn miss(&mut self, stage: &'static str, at: usize) -> VisitResult {
        trace!(offset = at, stage, "no item");
        self.offset = None;
        VisitResult::Break
    }

    fn deliver(&mut self, selection: Selection<'a>) -> VisitResult {
        self.delivered += 1;
        match (self.consumer)(selection) {
            ControlFlow::Continue(()) => VisitResult::Continue,
            ControlFlow::Break(()) => VisitResult::Exit,
        }
    }

    fn resolve(&self, offset: usize) -> Result<ValueType, CborError> {
        ValueType::resolve(self.src, offset, self.codec.tags()).map(|(_, vt)| vt)
    }

    fn expect_container(&self, offset: usize, expected: ValueType) -> Result<(), CborError> {
        let actual = self.resolve(offset)?;
        if actual == expected {
            Ok(())
        } else {
            Err(CborError::type_mismatch(expected, actual, offset))
        }
    }
}

/// Evaluate `stage` and its subtree.
pub(crate) fn visit(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    match stage.op() {
        Op::Base => visit_base(stage, ctx),
        Op::StreamIndex(n) => visit_stream_index(stage, ctx, *n),
        Op::EachStream => visit_each_stream(stage, ctx),
        Op::SequenceIndex(i) => visit_sequence_index(stage, ctx, *i),
        Op::SequenceAll => visit_sequence_loop(stage, ctx, None),
        Op::SequenceMatch(p) => visit_sequence_loop(stage, ctx, Some(p)),
        Op::DictionaryLookup(p) => visit_dictionary_lookup(stage, ctx, p),
        Op::TypeMatch(spec) => {
            let at = ctx.current()?;
            let actual = ctx.resolve(at)?;
            if spec.accepts(actual) {
                visit_children(stage, ctx)
            } else if spec.is_nullable() {
                trace!(
                    offset = at,
                    expected = spec.value_type().name(),
                    actual = actual.name(),
                    "type mismatch degraded to null"
                );
                Ok(ctx.miss("type_match", at))
            } else {
                Err(CborError::type_mismatch(spec.value_type(), actual, at))
            }
        }
        Op::Collect => visit_collect(stage, ctx),
        Op::AsDictionary => visit_projection(stage, ctx, FrameKind::Dictionary),
        Op::AsSequence => visit_projection(stage, ctx, FrameKind::Sequence),
        Op::DictionaryEntry(key) => {
            ctx.strategy.put_dictionary_key(key)?;
            visit_entry(stage, ctx)
        }
        Op::SequenceElement => visit_entry(stage, ctx),
        Op::Emit => visit_emit(ctx),
        Op::Select => visit_select(stage, ctx),
    }
}

/// Run every child from the same starting offset; stop at the first `Break` or `Exit`.
fn visit_children(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    let start = ctx.offset;
    for child in stage.children() {
        ctx.offset = start;
        match visit(child, ctx)? {
            VisitResult::Continue => {}
            other => return Ok(other),
        }
    }
    Ok(VisitResult::Continue)
}

fn visit_base(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    if let Some(at) = ctx.offset {
        if ctx.src.offset_valid(at) {
            let arg = read_argument(ctx.src, at)?;
            if arg.head.major == MajorType::SemanticTag && arg.value == Some(TAG_SELF_DESCRIBE) {
                ctx.offset = Some(at + arg.header_len);
            }
        }
    }
    visit_children(stage, ctx)
}

fn visit_stream_index(
    stage: &Stage,
    ctx: &mut Context<'_, '_>,
    n: usize,
) -> Result<VisitResult, CborError> {
    let mut pos = ctx.current()?;
    for _ in 0..n {
        if !ctx.src.offset_valid(pos) {
            return Ok(ctx.miss("stream_index", pos));
        }
        pos = ctx.codec.length().skip(ctx.src, pos)?;
    }
    if !ctx.src.offset_valid(pos) {
        return Ok(ctx.miss("stream_index", pos));
    }
    ctx.offset = Some(pos);
    visit_children(stage, ctx)
}

fn visit_each_stream(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    let mut pos = ctx.current()?;
    while ctx.src.offset_valid(pos) {
        ctx.offset = Some(pos);
        match visit_children(stage, ctx)? {
            VisitResult::Exit => return Ok(VisitResult::Exit),
            VisitResult::Break => {
                trace!(offset = pos, "stream item produced no value");
                if ctx.null_on_stream_miss && ctx.deliver(Selection::Null) == VisitResult::Exit {
                    return Ok(VisitResult::Exit);
                }
            }
            VisitResult::Continue => {}
        }
        pos = ctx.codec.length().skip(ctx.src, pos)?;
    }
    Ok(VisitResult::Continue)
}

fn visit_sequence_index(
    stage: &Stage,
    ctx: &mut Context<'_, '_>,
    index: usize,
) -> Result<VisitResult, CborError> {
    let at = ctx.current()?;
    ctx.expect_container(at, ValueType::Sequence)?;
    let (src, model) = (ctx.src, ctx.codec.length());
    let count = model.element_count(src, at, ValueType::Sequence)?;
    if index >= count {
        return Ok(ctx.miss("sequence_index", at));
    }
    let first = at + read_argument(src, at)?.header_len;
    ctx.offset = Some(model.skip_items(src, first, index)?);
    visit_children(stage, ctx)
}

fn visit_sequence_loop<'a>(
    stage: &Stage,
    ctx: &mut Context<'a, '_>,
    predicate: Option<&Predicate>,
) -> Result<VisitResult, CborError> {
    let at = ctx.current()?;
    ctx.expect_container(at, ValueType::Sequence)?;
    let (src, codec) = (ctx.src, ctx.codec);
    let mut candidate: Option<LazyValue<'a>> = None;
    for pos in codec.length().children(src, at, ValueType::Sequence)? {
        let pos = pos?;
        if let Some(p) = predicate {
            let v = relocated(&mut candidate, src, codec, pos)?;
            if !p.test(&v)? {
                continue;
            }
        }
        ctx.offset = Some(pos);
        if visit_children(stage, ctx)? == VisitResult::Exit {
            return Ok(VisitResult::Exit);
        }
    }
    Ok(VisitResult::Continue)
}

/// Move the scan cursor to `pos`, reusing the view from the previous candidate.
fn relocated<'a>(
    slot: &mut Option<LazyValue<'a>>,
    src: &'a dyn ByteSource,
    codec: &'a Codec,
    pos: usize,
) -> Result<LazyValue<'a>, CborError> {
    match slot {
        Some(v) => {
            v.relocate(pos)?;
            Ok(*v)
        }
        None => {
            let v = LazyValue::at(src, codec, pos)?;
            *slot = Some(v);
            Ok(v)
        }
    }
}

fn visit_dictionary_lookup<'a>(
    stage: &Stage,
    ctx: &mut Context<'a, '_>,
    predicate: &Predicate,
) -> Result<VisitResult, CborError> {
    let at = ctx.current()?;
    ctx.expect_container(at, ValueType::Dictionary)?;
    let (src, codec) = (ctx.src, ctx.codec);
    let mut slots = codec.length().children(src, at, ValueType::Dictionary)?;
    let mut key: Option<LazyValue<'a>> = None;
    while let Some(key_pos) = slots.next() {
        let key_pos = key_pos?;
        let k = relocated(&mut key, src, codec, key_pos)?;
        let matched = predicate.test(&k)?;
        let value_pos = slots
            .next()
            .ok_or_else(|| CborError::new(ErrorCode::OddDictionary, at))??;
        if matched {
            ctx.offset = Some(value_pos);
            return visit_children(stage, ctx);
        }
    }
    Ok(ctx.miss("dictionary_lookup", at))
}

fn visit_collect(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    ctx.strategy.begin_sequence()?;
    ctx.frames.push(Frame {
        kind: FrameKind::Sequence,
        filled: false,
        collect: true,
    });
    let res = visit_children(stage, ctx);
    ctx.frames.pop();
    ctx.strategy.end_sequence()?;
    mark_filled(ctx);
    match res? {
        VisitResult::Exit => Ok(VisitResult::Exit),
        VisitResult::Break | VisitResult::Continue => Ok(VisitResult::Continue),
    }
}

fn visit_projection(
    stage: &Stage,
    ctx: &mut Context<'_, '_>,
    kind: FrameKind,
) -> Result<VisitResult, CborError> {
    match kind {
        FrameKind::Dictionary => ctx.strategy.begin_dictionary()?,
        FrameKind::Sequence => ctx.strategy.begin_sequence()?,
    }
    ctx.frames.push(Frame {
        kind,
        filled: false,
        collect: false,
    });
    let res = visit_children(stage, ctx);
    ctx.frames.pop();
    match kind {
        FrameKind::Dictionary => ctx.strategy.end_dictionary()?,
        FrameKind::Sequence => ctx.strategy.end_sequence()?,
    }
    mark_filled(ctx);
    res
}

fn mark_filled(ctx: &mut Context<'_, '_>) {
    if let Some(f) = ctx.frames.last_mut() {
        f.filled = true;
    }
}

/// A dictionary entry or sequence element: run the value path and substitute `null` if it
/// produced nothing.
fn visit_entry(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    if let Some(f) = ctx.frames.last_mut() {
        f.filled = false;
    }
    let res = visit_children(stage, ctx)?;
    let (kind, filled) = match ctx.frames.last() {
        Some(f) => (f.kind, f.filled),
        None => return Err(CborError::new(ErrorCode::InvalidQuery, 0)),
    };
    if !filled {
        match kind {
            FrameKind::Dictionary => ctx.strategy.put_dictionary_null_value()?,
            FrameKind::Sequence => ctx.strategy.put_sequence_value(None)?,
        }
    }
    Ok(match res {
        VisitResult::Exit => VisitResult::Exit,
        VisitResult::Break | VisitResult::Continue => VisitResult::Continue,
    })
}

fn visit_emit(ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    let at = ctx.offset.unwrap_or_default();
    let Some(frame) = ctx.frames.last().copied() else {
        return Err(CborError::new(ErrorCode::InvalidQuery, at));
    };
    if frame.filled && !frame.collect {
        return Err(CborError::new(ErrorCode::InvalidQuery, at));
    }
    let value = match ctx.offset {
        Some(at) => Some(LazyValue::at(ctx.src, ctx.codec, at)?),
        None => None,
    };
    match (frame.kind, value) {
        (FrameKind::Dictionary, Some(v)) => ctx.strategy.put_dictionary_value(v)?,
        (FrameKind::Dictionary, None) => ctx.strategy.put_dictionary_null_value()?,
        (FrameKind::Sequence, v) => ctx.strategy.put_sequence_value(v)?,
    }
    mark_filled(ctx);
    Ok(VisitResult::Continue)
}

fn visit_select(stage: &Stage, ctx: &mut Context<'_, '_>) -> Result<VisitResult, CborError> {
    let start = ctx.offset;
    ctx.strategy.begin_select();
    if visit_children(stage, ctx)? == VisitResult::Exit {
        return Ok(VisitResult::Exit);
    }
    let current = match start {
        Some(at) => Some(LazyValue::at(ctx.src, ctx.codec, at)?),
        None => None,
    };
    let selection = ctx.strategy.finalize_select(current)?;
    Ok(ctx.deliver(selection))
}
