//! Lazy transformation pipeline
//!
//! Every combinator returns a new [`Lazy`] node holding its parent's source
//! and a stage factory. Nothing runs until a terminal operation (`force`,
//! `first`, `each`, `next`) realizes the chain. Each realization drives the
//! parent's push iteration, passing every element through a freshly built
//! stage which emits zero or more elements downstream and may stop the
//! parent early.

use crate::enumerator::{Blueprint, Enumerator, Pull, Size, Source};
use crate::error::{EnumError, EnumResult, Halt};
use crate::pattern::Pattern;
use crate::producer::{Block, Producer};
use crate::value::Value;
use crate::yielder::Yielder;
use std::sync::Arc;

/// Verdict of a stage for one upstream element
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Nothing (more) to hand downstream for this element
    Continue,
    /// Hand this values pack downstream
    Emit(Vec<Value>),
    /// End the parent's iteration
    Stop,
}

/// Per-realization stage state
pub type StageFn = dyn FnMut(&mut Yielder<'_, '_>, Vec<Value>) -> Result<Flow, Halt>;

type StageFactory = dyn Fn() -> Box<StageFn> + Send + Sync;

fn stage<F>(f: F) -> Box<StageFn>
where
    F: FnMut(&mut Yielder<'_, '_>, Vec<Value>) -> Result<Flow, Halt> + 'static,
{
    Box::new(f)
}

/// Producer behind every lazy node
struct Stage {
    parent: Arc<Source>,
    factory: Box<StageFactory>,
}

impl Producer for Stage {
    fn call(&self, _method: &str, args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        let mut step = (self.factory)();
        let mut yielder = Yielder::new(block);
        self.parent.drive(args, &mut |values| match step(&mut yielder, values)? {
            Flow::Continue => Ok(Value::Nil),
            Flow::Emit(values) => yielder.yield_(values),
            Flow::Stop => Err(Halt::Stop),
        })
    }
}

/// Something `Lazy::zip` pairs elements with: a list accessed by
/// position, or an enumerator pulled one element at a time
pub struct ZipSource(ZipKind);

enum ZipKind {
    List(Vec<Value>),
    Pull(Blueprint),
}

impl From<Vec<Value>> for ZipSource {
    fn from(items: Vec<Value>) -> Self {
        ZipSource(ZipKind::List(items))
    }
}

impl From<&Enumerator> for ZipSource {
    fn from(enumerator: &Enumerator) -> Self {
        ZipSource(ZipKind::Pull(enumerator.blueprint()))
    }
}

impl From<&Lazy> for ZipSource {
    fn from(lazy: &Lazy) -> Self {
        ZipSource(ZipKind::Pull(lazy.enumerator.blueprint()))
    }
}

/// Lazily evaluated chain of transformations
pub struct Lazy {
    enumerator: Enumerator,
}

impl Lazy {
    pub(crate) fn new(enumerator: Enumerator) -> Self {
        Self { enumerator }
    }

    fn chain<F>(&self, size: Size, factory: F) -> Lazy
    where
        F: Fn() -> Box<StageFn> + Send + Sync + 'static,
    {
        let stage = Stage {
            parent: Arc::clone(self.enumerator.source()),
            factory: Box::new(factory),
        };
        let enumerator = Enumerator::new(Arc::new(stage), "each", Vec::new())
            .with_size(size)
            .with_config_opt(self.enumerator.config_override().cloned());
        Lazy { enumerator }
    }

    fn parent_size(&self) -> Size {
        self.enumerator.size_descriptor().clone()
    }

    /// At most `n` elements.
    pub fn take(&self, n: impl Into<Value>) -> EnumResult<Lazy> {
        let n = n.into().to_count("take")?;
        let size = self.parent_size().derive(move |s| Some(s.map_or(n, |s| s.min(n))));
        Ok(self.chain(size, move || {
            let mut taken = 0usize;
            stage(move |y, values| {
                if taken >= n {
                    return Ok(Flow::Stop);
                }
                taken += 1;
                y.yield_(values)?;
                Ok(if taken == n { Flow::Stop } else { Flow::Continue })
            })
        }))
    }

    /// Everything after the first `n` elements.
    pub fn drop(&self, n: impl Into<Value>) -> EnumResult<Lazy> {
        let n = n.into().to_count("drop")?;
        let size = self.parent_size().derive(move |s| s.map(|s| s.saturating_sub(n)));
        Ok(self.chain(size, move || {
            let mut dropped = 0usize;
            stage(move |_, values| {
                if dropped < n {
                    dropped += 1;
                    Ok(Flow::Continue)
                } else {
                    Ok(Flow::Emit(values))
                }
            })
        }))
    }

    /// Elements up to, not including, the first one failing `pred`.
    pub fn take_while<F>(&self, pred: F) -> Lazy
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let pred = Arc::new(pred);
        self.chain(Size::Unknown, move || {
            let pred = Arc::clone(&pred);
            stage(move |_, values| {
                if pred(&Value::pack(values.clone())) {
                    Ok(Flow::Emit(values))
                } else {
                    Ok(Flow::Stop)
                }
            })
        })
    }

    /// Elements from the first one failing `pred` onwards.
    pub fn drop_while<F>(&self, pred: F) -> Lazy
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let pred = Arc::new(pred);
        self.chain(Size::Unknown, move || {
            let pred = Arc::clone(&pred);
            let mut dropping = true;
            stage(move |_, values| {
                if dropping && pred(&Value::pack(values.clone())) {
                    return Ok(Flow::Continue);
                }
                dropping = false;
                Ok(Flow::Emit(values))
            })
        })
    }

    pub fn select<F>(&self, pred: F) -> Lazy
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.try_select(move |v| Ok(pred(v)))
    }

    pub fn reject<F>(&self, pred: F) -> Lazy
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.try_select(move |v| Ok(!pred(v)))
    }

    /// `select` with a fallible predicate; its errors reach the caller.
    pub fn try_select<F>(&self, pred: F) -> Lazy
    where
        F: Fn(&Value) -> EnumResult<bool> + Send + Sync + 'static,
    {
        let pred = Arc::new(pred);
        self.chain(Size::Unknown, move || {
            let pred = Arc::clone(&pred);
            stage(move |_, values| {
                if pred(&Value::pack(values.clone()))? {
                    Ok(Flow::Emit(values))
                } else {
                    Ok(Flow::Continue)
                }
            })
        })
    }

    /// Elements matching `pattern`.
    pub fn grep<P>(&self, pattern: P) -> Lazy
    where
        P: Pattern + 'static,
    {
        self.grep_map(pattern, |v| v)
    }

    /// Elements matching `pattern`, each passed through `f`.
    pub fn grep_map<P, F>(&self, pattern: P, f: F) -> Lazy
    where
        P: Pattern + 'static,
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let shared = Arc::new((pattern, f));
        self.chain(Size::Unknown, move || {
            let shared = Arc::clone(&shared);
            stage(move |_, values| {
                let (pattern, f) = &*shared;
                let value = Value::pack(values);
                if pattern.matches(&value) {
                    Ok(Flow::Emit(vec![f(value)]))
                } else {
                    Ok(Flow::Continue)
                }
            })
        })
    }

    pub fn map<F>(&self, f: F) -> Lazy
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.try_map(move |v| Ok(f(v)))
    }

    /// `map` with a fallible transform; its errors reach the caller.
    pub fn try_map<F>(&self, f: F) -> Lazy
    where
        F: Fn(Value) -> EnumResult<Value> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.chain(self.parent_size(), move || {
            let f = Arc::clone(&f);
            stage(move |_, values| Ok(Flow::Emit(vec![f(Value::pack(values))?])))
        })
    }

    /// Map each element; `List` results are spliced in element by element.
    pub fn flat_map<F>(&self, f: F) -> Lazy
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.chain(Size::Unknown, move || {
            let f = Arc::clone(&f);
            stage(move |y, values| match f(Value::pack(values)) {
                Value::List(items) => {
                    for item in items {
                        y.yield_(vec![item])?;
                    }
                    Ok(Flow::Continue)
                }
                other => Ok(Flow::Emit(vec![other])),
            })
        })
    }

    /// Pair each element with the same position of every source.
    ///
    /// Sources that run out contribute `Nil`.
    pub fn zip(&self, sources: Vec<ZipSource>) -> Lazy {
        let sources = Arc::new(sources);
        self.chain(self.parent_size(), move || {
            let mut cursors: Vec<Cursor> = sources
                .iter()
                .map(|source| match &source.0 {
                    ZipKind::List(items) => Cursor::List(items.clone()),
                    ZipKind::Pull(blueprint) => Cursor::Pull(blueprint.build()),
                })
                .collect();
            let mut index = 0usize;
            stage(move |_, values| {
                let mut row = Vec::with_capacity(cursors.len() + 1);
                row.push(Value::pack(values));
                for cursor in cursors.iter_mut() {
                    row.push(cursor.at(index)?);
                }
                index += 1;
                Ok(Flow::Emit(vec![Value::List(row)]))
            })
        })
    }

    /// Identity: already lazy.
    pub fn lazy(self) -> Lazy {
        self
    }

    /// Realize the whole chain.
    pub fn force(&self) -> EnumResult<Vec<Value>> {
        self.enumerator.to_vec()
    }

    /// Realize at most `n` elements.
    pub fn first(&self, n: impl Into<Value>) -> EnumResult<Vec<Value>> {
        self.take(n)?.force()
    }

    /// The first element, if any.
    pub fn first_value(&self) -> EnumResult<Option<Value>> {
        Ok(self.first(1)?.into_iter().next())
    }

    pub fn each<F>(&self, block: F) -> EnumResult<Value>
    where
        F: FnMut(Value) -> EnumResult<Value>,
    {
        self.enumerator.each(block)
    }

    pub fn next(&mut self) -> EnumResult<Value> {
        self.enumerator.next()
    }

    pub fn peek(&mut self) -> EnumResult<Value> {
        self.enumerator.peek()
    }

    pub fn next_values(&mut self) -> EnumResult<Vec<Value>> {
        self.enumerator.next_values()
    }

    pub fn peek_values(&mut self) -> EnumResult<Vec<Value>> {
        self.enumerator.peek_values()
    }

    /// See [`Enumerator::feed`].
    pub fn feed(&self, value: impl Into<Value>) -> EnumResult<()> {
        self.enumerator.feed(value)
    }

    pub fn rewind(&mut self) -> &mut Self {
        self.enumerator.rewind();
        self
    }

    pub fn size(&self) -> Option<usize> {
        self.enumerator.size()
    }

    pub fn iter(&mut self) -> Pull<'_> {
        self.enumerator.iter()
    }

    pub fn into_enumerator(self) -> Enumerator {
        self.enumerator
    }
}

impl std::fmt::Debug for Lazy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lazy")
            .field("size", &self.enumerator.size())
            .finish()
    }
}

/// Zip source state for one realization
enum Cursor {
    List(Vec<Value>),
    Pull(Enumerator),
}

impl Cursor {
    fn at(&mut self, index: usize) -> Result<Value, Halt> {
        match self {
            Cursor::List(items) => Ok(items.get(index).cloned().unwrap_or_default()),
            Cursor::Pull(enumerator) => match enumerator.next() {
                Ok(value) => Ok(value),
                Err(EnumError::IterationEnded { .. }) => Ok(Value::Nil),
                Err(err) => Err(err.into()),
            },
        }
    }
}
