//! Coroutine-backed generator
//!
//! The producer runs on its own stack but on the caller's thread: each
//! element suspends the coroutine, each `next` resumes it. Nothing runs
//! concurrently, so no locking is involved.

use super::{GeneratorStrategy, Resume};
use crate::enumerator::Source;
use crate::error::{EnumError, EnumResult, Halt};
use crate::value::Value;
use ::generator::{Generator, Gn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub struct CooperativeGenerator {
    source: Arc<Source>,
    stack_size: usize,
    coroutine: Option<Generator<'static, (), Resume>>,
    done: bool,
    result: Value,
}

impl CooperativeGenerator {
    pub(crate) fn new(source: Arc<Source>, stack_size: usize) -> Self {
        Self {
            source,
            stack_size,
            coroutine: None,
            done: false,
            result: Value::Nil,
        }
    }

    fn spawn(&self) -> Generator<'static, (), Resume> {
        let source = Arc::clone(&self.source);
        Gn::<()>::new_scoped_opt(self.stack_size, move |mut scope| {
            let outcome = source.drive(&[], &mut |values| {
                scope.yield_(Resume::Yielded(values));
                Ok(Value::Nil)
            });
            Resume::from_outcome(Halt::settle(outcome))
        })
    }

    fn finish(&mut self, result: Value) {
        self.done = true;
        self.result = result;
        self.coroutine = None;
    }
}

impl GeneratorStrategy for CooperativeGenerator {
    fn next(&mut self) -> EnumResult<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }
        if self.coroutine.is_none() {
            self.coroutine = Some(self.spawn());
        }

        let resumed = match self.coroutine.as_mut() {
            Some(co) => panic::catch_unwind(AssertUnwindSafe(|| co.resume())),
            None => Ok(None),
        };
        let resumed = match resumed {
            Ok(resumed) => resumed,
            Err(_) => {
                log::error!("Producer panicked inside coroutine for `{}`", self.source.method());
                self.finish(Value::Nil);
                return Err(EnumError::WorkerPanicked);
            }
        };

        match resumed {
            Some(Resume::Yielded(values)) => Ok(Some(values)),
            Some(Resume::Finished(result)) => {
                self.finish(result);
                Ok(None)
            }
            Some(Resume::Failed(err)) => {
                self.finish(Value::Nil);
                Err(err)
            }
            None => {
                self.finish(Value::Nil);
                Ok(None)
            }
        }
    }

    fn has_next(&mut self) -> bool {
        !self.done
    }

    fn rewind(&mut self) {
        // Dropping a suspended coroutine unwinds its stack.
        self.coroutine = None;
        self.done = false;
        self.result = Value::Nil;
    }

    fn result(&self) -> Value {
        self.result.clone()
    }
}
