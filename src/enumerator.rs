//! External iteration over push-style producers
//!
//! An [`Enumerator`] binds a [`Producer`] to an iteration method and its
//! arguments. Pushing (`each`) drives the producer directly; pulling (`next`,
//! `peek`) goes through a lazily created [`GeneratorStrategy`].

use crate::config::{self, EnumeratorConfig, StrategyKind};
use crate::error::{EnumError, EnumResult, Halt};
use crate::generator::{self, GeneratorStrategy};
use crate::lazy::Lazy;
use crate::producer::{Block, FromFn, Producer};
use crate::value::Value;
use crate::yielder::Yielder;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// How an enumerator reports its size
#[derive(Clone)]
pub enum Size {
    Known(usize),
    Unknown,
    /// Re-evaluated on every query, never cached
    Dynamic(Arc<dyn Fn() -> Option<usize> + Send + Sync>),
}

impl Size {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> Option<usize> + Send + Sync + 'static,
    {
        Size::Dynamic(Arc::new(f))
    }

    pub fn eval(&self) -> Option<usize> {
        match self {
            Size::Known(n) => Some(*n),
            Size::Unknown => None,
            Size::Dynamic(f) => f(),
        }
    }

    /// Apply `rule` to this size, staying dynamic if this size is.
    pub(crate) fn derive<F>(&self, rule: F) -> Size
    where
        F: Fn(Option<usize>) -> Option<usize> + Send + Sync + 'static,
    {
        let to_size = |n: Option<usize>| n.map_or(Size::Unknown, Size::Known);
        match self {
            Size::Known(n) => to_size(rule(Some(*n))),
            Size::Unknown => to_size(rule(None)),
            Size::Dynamic(f) => {
                let f = Arc::clone(f);
                Size::dynamic(move || rule(f()))
            }
        }
    }
}

impl fmt::Debug for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Known(n) => write!(f, "Known({})", n),
            Size::Unknown => write!(f, "Unknown"),
            Size::Dynamic(_) => write!(f, "Dynamic"),
        }
    }
}

impl From<usize> for Size {
    fn from(n: usize) -> Self {
        Size::Known(n)
    }
}

impl From<Option<usize>> for Size {
    fn from(n: Option<usize>) -> Self {
        n.map_or(Size::Unknown, Size::Known)
    }
}

/// Producer bound to a method and arguments, plus the pending feed value.
///
/// Shared between an enumerator, its pull strategy and any lazy children.
pub(crate) struct Source {
    producer: Arc<dyn Producer>,
    method: String,
    args: Vec<Value>,
    feed: Mutex<Option<Value>>,
}

impl Source {
    fn new(producer: Arc<dyn Producer>, method: String, args: Vec<Value>) -> Self {
        Self {
            producer,
            method,
            args,
            feed: Mutex::new(None),
        }
    }

    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn native_generator(&self) -> Option<Box<dyn GeneratorStrategy>> {
        self.producer.native_generator(&self.method, &self.args)
    }

    /// Run the producer's push iteration with `extra` appended to the bound
    /// arguments. A pending feed value replaces what `block` returned.
    pub(crate) fn drive(&self, extra: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        let mut args = self.args.clone();
        args.extend_from_slice(extra);
        self.producer.call(&self.method, &args, &mut |values| {
            let ret = block(values)?;
            Ok(self.take_feed().unwrap_or(ret))
        })
    }

    fn feed_slot(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_feed(&self) -> Option<Value> {
        self.feed_slot().take()
    }

    fn store_feed(&self, value: Value) -> EnumResult<()> {
        let mut slot = self.feed_slot();
        if slot.is_some() {
            return Err(EnumError::FeedAlreadyPending);
        }
        *slot = Some(value);
        Ok(())
    }
}

/// Everything needed to build a fresh enumerator over the same source
#[derive(Clone)]
pub(crate) struct Blueprint {
    source: Arc<Source>,
    size: Size,
    config: Option<EnumeratorConfig>,
}

impl Blueprint {
    pub(crate) fn build(&self) -> Enumerator {
        Enumerator {
            source: Arc::clone(&self.source),
            size: self.size.clone(),
            config: self.config.clone(),
            lookahead: None,
            generator: None,
        }
    }
}

/// External iterator over a push-style producer
pub struct Enumerator {
    source: Arc<Source>,
    size: Size,
    config: Option<EnumeratorConfig>,
    lookahead: Option<Vec<Value>>,
    generator: Option<Box<dyn GeneratorStrategy>>,
}

impl Enumerator {
    /// Enumerate `producer.method(*args)`.
    pub fn new(producer: Arc<dyn Producer>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            source: Arc::new(Source::new(producer, method.into(), args)),
            size: Size::Unknown,
            config: None,
            lookahead: None,
            generator: None,
        }
    }

    /// Enumerate the elements a block yields through its [`Yielder`].
    pub fn from_fn<F>(body: F) -> Self
    where
        F: Fn(&mut Yielder<'_, '_>, &[Value]) -> Result<Value, Halt> + Send + Sync + 'static,
    {
        Self::new(Arc::new(FromFn::new(body)), "each", Vec::new())
    }

    /// Enumerate a fixed list of values.
    pub fn from_values<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let len = items.len();
        Self::new(Arc::new(items), "each", Vec::new()).with_size(Size::Known(len))
    }

    pub fn with_size(mut self, size: impl Into<Size>) -> Self {
        self.size = size.into();
        self
    }

    /// Use `config` instead of the process-wide configuration.
    pub fn with_config(mut self, config: EnumeratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shorthand for overriding only the strategy policy.
    pub fn with_strategy(self, strategy: StrategyKind) -> Self {
        let config = self.config().clone().strategy(strategy);
        self.with_config(config)
    }

    pub fn config(&self) -> &EnumeratorConfig {
        self.config.as_ref().unwrap_or_else(|| config::current())
    }

    pub fn method(&self) -> &str {
        self.source.method()
    }

    pub fn args(&self) -> &[Value] {
        &self.source.args
    }

    pub(crate) fn config_override(&self) -> Option<&EnumeratorConfig> {
        self.config.as_ref()
    }

    pub(crate) fn size_descriptor(&self) -> &Size {
        &self.size
    }

    pub(crate) fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub(crate) fn blueprint(&self) -> Blueprint {
        Blueprint {
            source: Arc::clone(&self.source),
            size: self.size.clone(),
            config: self.config.clone(),
        }
    }

    /// A new enumerator with `extra` appended to the bound arguments.
    pub fn with_args(&self, extra: Vec<Value>) -> Enumerator {
        let mut args = self.source.args.clone();
        args.extend(extra);
        let source = Source::new(Arc::clone(&self.source.producer), self.source.method.clone(), args);
        Enumerator {
            source: Arc::new(source),
            size: self.size.clone(),
            config: self.config.clone(),
            lookahead: None,
            generator: None,
        }
    }

    /// Drive the producer directly, calling `block` with each element.
    ///
    /// Returns the producer's final result.
    pub fn each<F>(&self, mut block: F) -> EnumResult<Value>
    where
        F: FnMut(Value) -> EnumResult<Value>,
    {
        self.each_values(&[], |values| block(Value::pack(values)))
    }

    /// Like [`each`](Enumerator::each) with `extra` arguments for this run only.
    pub fn each_with_args<F>(&self, extra: &[Value], mut block: F) -> EnumResult<Value>
    where
        F: FnMut(Value) -> EnumResult<Value>,
    {
        self.each_values(extra, |values| block(Value::pack(values)))
    }

    /// Push iteration handing over raw values packs.
    pub fn each_values<F>(&self, extra: &[Value], mut block: F) -> EnumResult<Value>
    where
        F: FnMut(Vec<Value>) -> EnumResult<Value>,
    {
        let outcome = self
            .source
            .drive(extra, &mut |values| block(values).map_err(Halt::from));
        Halt::settle(outcome)
    }

    pub fn each_with_index<F>(&self, block: F) -> EnumResult<Value>
    where
        F: FnMut(Value, usize) -> EnumResult<Value>,
    {
        self.with_index(0, block)
    }

    /// Push iteration with a running index starting at `offset`.
    pub fn with_index<F>(&self, offset: impl Into<Value>, mut block: F) -> EnumResult<Value>
    where
        F: FnMut(Value, usize) -> EnumResult<Value>,
    {
        let mut index = offset.into().to_count("offset")?;
        self.each(|value| {
            let ret = block(value, index)?;
            index += 1;
            Ok(ret)
        })
    }

    /// Enumerator of `[element, index]` pairs, indices starting at `offset`.
    pub fn indexed(&self, offset: impl Into<Value>) -> EnumResult<Enumerator> {
        let offset = offset.into().to_count("offset")?;
        let producer = Indexed {
            source: Arc::clone(&self.source),
            offset,
        };
        Ok(Enumerator::new(Arc::new(producer), "each", Vec::new())
            .with_size(self.size.clone())
            .with_config_opt(self.config.clone()))
    }

    pub(crate) fn with_config_opt(mut self, config: Option<EnumeratorConfig>) -> Self {
        self.config = config;
        self
    }

    /// Next element, packed as a single value.
    pub fn next(&mut self) -> EnumResult<Value> {
        self.next_values().map(Value::pack)
    }

    /// Next element as its raw values pack.
    pub fn next_values(&mut self) -> EnumResult<Vec<Value>> {
        if let Some(values) = self.lookahead.take() {
            return Ok(values);
        }

        let source = &self.source;
        let config = self.config.as_ref().unwrap_or_else(|| config::current());
        let strategy = self
            .generator
            .get_or_insert_with(|| generator::select(source, config));

        if strategy.has_next() {
            if let Some(values) = strategy.next()? {
                return Ok(values);
            }
        }
        Err(EnumError::IterationEnded {
            result: strategy.result(),
        })
    }

    /// The element `next` would return, without consuming it.
    pub fn peek(&mut self) -> EnumResult<Value> {
        self.peek_values().map(Value::pack)
    }

    pub fn peek_values(&mut self) -> EnumResult<Vec<Value>> {
        if let Some(values) = &self.lookahead {
            return Ok(values.clone());
        }
        let values = self.next_values()?;
        self.lookahead = Some(values.clone());
        Ok(values)
    }

    /// Start over: clear lookahead and feed, reset the producer, and discard
    /// the pull strategy along with any background worker.
    pub fn rewind(&mut self) -> &mut Self {
        log::debug!("Rewinding enumerator over `{}`", self.source.method);
        self.source.producer.rewind();
        if let Some(mut strategy) = self.generator.take() {
            strategy.rewind();
        }
        self.lookahead = None;
        self.source.feed_slot().take();
        self
    }

    pub fn size(&self) -> Option<usize> {
        self.size.eval()
    }

    /// Set the value the in-flight yield call returns when resumed.
    pub fn feed(&self, value: impl Into<Value>) -> EnumResult<()> {
        self.source.store_feed(value.into())
    }

    /// Realize every element via push iteration.
    pub fn to_vec(&self) -> EnumResult<Vec<Value>> {
        let mut out = Vec::new();
        self.each(|value| {
            out.push(value);
            Ok(Value::Nil)
        })?;
        Ok(out)
    }

    /// Lazy pipeline rooted at a fresh copy of this enumerator.
    pub fn lazy(&self) -> Lazy {
        Lazy::new(self.blueprint().build())
    }

    /// Pull elements through the Rust `Iterator` protocol.
    pub fn iter(&mut self) -> Pull<'_> {
        Pull { enumerator: self }
    }
}

impl fmt::Debug for Enumerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enumerator")
            .field("method", &self.source.method)
            .field("args", &self.source.args)
            .field("size", &self.size)
            .field("lookahead", &self.lookahead)
            .field("started", &self.generator.is_some())
            .finish()
    }
}

/// Iterator adapter over [`Enumerator::next`], ending at `IterationEnded`
pub struct Pull<'a> {
    enumerator: &'a mut Enumerator,
}

impl Iterator for Pull<'_> {
    type Item = EnumResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.enumerator.next() {
            Err(err) if err.is_iteration_ended() => None,
            other => Some(other),
        }
    }
}

/// Producer behind [`Enumerator::indexed`]
struct Indexed {
    source: Arc<Source>,
    offset: usize,
}

impl Producer for Indexed {
    fn call(&self, _method: &str, args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        let mut index = self.offset;
        self.source.drive(args, &mut |values| {
            let ret = block(vec![Value::pack(values), Value::from(index)])?;
            index += 1;
            Ok(ret)
        })
    }

    fn rewind(&self) {
        self.source.producer.rewind();
    }
}
