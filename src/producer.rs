//! The push-style producer capability and a few built-in producers

use crate::error::{EnumError, Halt};
use crate::generator::GeneratorStrategy;
use crate::value::Value;
use crate::yielder::Yielder;
use std::sync::Arc;

/// Per-element callback handed to a producer.
///
/// Its return value is what the producer's yield call evaluates to.
pub type Block<'a> = dyn FnMut(Vec<Value>) -> Result<Value, Halt> + 'a;

/// Anything that iterates internally, calling a block once per element.
///
/// Implementations must propagate a `Halt` returned by the block with `?`:
/// that is how early termination and cancellation reach the producer's loop.
/// An endless producer that swallows it (`let _ = block(..)`) never stops, so
/// dropping or rewinding a thread-driven enumerator over it blocks forever.
pub trait Producer: Send + Sync {
    /// Run iteration method `method` with `args`, calling `block` per element,
    /// and return the final result.
    fn call(&self, method: &str, args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt>;

    /// Reset any internal position. Called by `Enumerator::rewind`.
    fn rewind(&self) {}

    /// A strategy of the producer's own, preempting the built-in ones.
    fn native_generator(
        &self,
        _method: &str,
        _args: &[Value],
    ) -> Option<Box<dyn GeneratorStrategy>> {
        None
    }
}

impl Producer for Vec<Value> {
    fn call(&self, method: &str, args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        match method {
            "each" => {
                for item in self {
                    block(vec![item.clone()])?;
                }
            }
            "reverse_each" => {
                for item in self.iter().rev() {
                    block(vec![item.clone()])?;
                }
            }
            "each_slice" => {
                let n = args.first().cloned().unwrap_or_default().to_count("slice size")?;
                if n == 0 {
                    return Err(EnumError::InvalidArgument("invalid slice size".into()).into());
                }
                for chunk in self.chunks(n) {
                    block(vec![Value::List(chunk.to_vec())])?;
                }
                return Ok(Value::Nil);
            }
            other => return Err(EnumError::NoMethod(other.to_string()).into()),
        }
        Ok(Value::List(self.clone()))
    }
}

/// Endless integer sequence: `start`, `start + step`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub start: i64,
    pub step: i64,
}

impl Counter {
    pub fn starting_at(start: i64) -> Self {
        Self { start, step: 1 }
    }

    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }
}

impl Producer for Counter {
    fn call(&self, method: &str, _args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        if method != "each" {
            return Err(EnumError::NoMethod(method.to_string()).into());
        }
        let mut n = self.start;
        loop {
            block(vec![Value::Int(n)])?;
            n = n.wrapping_add(self.step);
        }
    }
}

/// Body of a block-built producer
pub type ProducerFn =
    dyn Fn(&mut Yielder<'_, '_>, &[Value]) -> Result<Value, Halt> + Send + Sync;

/// Producer built from a bare block receiving a [`Yielder`].
///
/// The method name is ignored; any `each` arguments are passed to the block.
#[derive(Clone)]
pub struct FromFn {
    body: Arc<ProducerFn>,
}

impl FromFn {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut Yielder<'_, '_>, &[Value]) -> Result<Value, Halt> + Send + Sync + 'static,
    {
        Self { body: Arc::new(body) }
    }
}

impl Producer for FromFn {
    fn call(&self, _method: &str, args: &[Value], block: &mut Block<'_>) -> Result<Value, Halt> {
        let mut yielder = Yielder::new(block);
        (self.body)(&mut yielder, args)
    }
}
