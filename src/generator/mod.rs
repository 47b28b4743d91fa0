//! Pull strategies over push-style producers
//!
//! A strategy suspends a producer's internal loop at each element so the
//! caller can pull elements one at a time. Two built-in strategies exist:
//! a stackful coroutine on the caller's thread and a lockstep worker thread.

#[cfg(feature = "cooperative")]
pub mod cooperative;
pub mod thread;

#[cfg(feature = "cooperative")]
pub use cooperative::CooperativeGenerator;
pub use thread::ThreadGenerator;

use crate::config::{EnumeratorConfig, StrategyKind};
use crate::enumerator::Source;
use crate::error::EnumResult;
use crate::value::Value;
use std::sync::Arc;

/// Pull interface over a suspended producer
pub trait GeneratorStrategy: Send {
    /// Resume the producer until it yields the next values pack.
    ///
    /// Returns `Ok(None)` once the producer has finished; from then on the
    /// strategy stays done until [`rewind`](GeneratorStrategy::rewind).
    /// A producer failure is returned once as its error, a producer panic as
    /// `EnumError::WorkerPanicked`; either leaves the strategy done.
    fn next(&mut self) -> EnumResult<Option<Vec<Value>>>;

    /// False once done. Reaps background resources on the way.
    fn has_next(&mut self) -> bool;

    /// Discard suspended state; the next pull starts the producer over.
    fn rewind(&mut self);

    /// The producer's final result, `Nil` until done
    fn result(&self) -> Value;
}

/// What a suspended producer hands back on each resumption
#[derive(Debug)]
pub(crate) enum Resume {
    Yielded(Vec<Value>),
    Finished(Value),
    Failed(crate::error::EnumError),
}

impl Resume {
    pub(crate) fn from_outcome(outcome: EnumResult<Value>) -> Self {
        match outcome {
            Ok(result) => Resume::Finished(result),
            Err(err) => Resume::Failed(err),
        }
    }
}

/// Pick a strategy: the producer's own first, then the configured policy.
pub(crate) fn select(source: &Arc<Source>, config: &EnumeratorConfig) -> Box<dyn GeneratorStrategy> {
    if let Some(native) = source.native_generator() {
        log::debug!("Using native generator for `{}`", source.method());
        return native;
    }

    match config.strategy {
        #[cfg(feature = "cooperative")]
        StrategyKind::Cooperative => {
            log::debug!("Using cooperative generator for `{}`", source.method());
            Box::new(CooperativeGenerator::new(
                Arc::clone(source),
                config.coroutine_stack_size,
            ))
        }
        #[cfg(not(feature = "cooperative"))]
        StrategyKind::Cooperative => {
            log::warn!("Cooperative generator not compiled in, falling back to a worker thread");
            Box::new(ThreadGenerator::new(Arc::clone(source), config.worker_name.clone()))
        }
        StrategyKind::Thread => {
            log::debug!("Using thread generator for `{}`", source.method());
            Box::new(ThreadGenerator::new(Arc::clone(source), config.worker_name.clone()))
        }
    }
}
