//! Worker-thread generator with lockstep handoff
//!
//! The producer runs on a dedicated thread. Two single-slot channels keep it
//! in step with the consumer: the consumer grants a permit, the worker runs
//! the producer up to the next element and deposits it, then parks until the
//! next permit. The worker is never more than one element ahead.
//!
//! Pulling may happen on a tokio runtime thread, where tokio forbids blocking
//! channel calls. The handoff then moves out of the runtime's way: through
//! `block_in_place` on a multi-thread runtime, or onto a short-lived helper
//! thread on a current-thread runtime.

use super::{GeneratorStrategy, Resume};
use crate::enumerator::Source;
use crate::error::{EnumError, EnumResult, Halt};
use crate::value::Value;
use std::sync::Arc;
use std::panic;
use std::thread::{self, JoinHandle};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

/// Run a blocking handoff so tokio's in-runtime blocking check never fires.
fn off_runtime<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Err(_) => f(),
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        Ok(_) => {
            log::trace!("Handing off through a helper thread");
            thread::scope(|scope| scope.spawn(f).join())
                .unwrap_or_else(|payload| panic::resume_unwind(payload))
        }
    }
}

/// Live worker and the consumer's ends of its two channels
struct Worker {
    permits: mpsc::Sender<()>,
    results: mpsc::Receiver<Resume>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn(source: Arc<Source>, name: &str) -> EnumResult<Self> {
        let (permits, mut permit_rx) = mpsc::channel::<()>(1);
        let (result_tx, results) = mpsc::channel::<Resume>(1);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Nothing runs until the first element is asked for.
                if permit_rx.blocking_recv().is_none() {
                    return;
                }

                let outcome = source.drive(&[], &mut |values| {
                    log::trace!("Worker handing off {} value(s)", values.len());
                    if result_tx.blocking_send(Resume::Yielded(values)).is_err() {
                        return Err(Halt::Stop);
                    }
                    // A dropped permit sender means the consumer is gone.
                    match permit_rx.blocking_recv() {
                        Some(()) => Ok(Value::Nil),
                        None => Err(Halt::Stop),
                    }
                });

                // The final permit was taken by the last yield (or before the
                // start), so the sentinel always has a waiting consumer.
                let _ = result_tx.blocking_send(Resume::from_outcome(Halt::settle(outcome)));
            })
            .map_err(|e| EnumError::custom(format!("failed to spawn generator worker: {}", e)))?;

        Ok(Self {
            permits,
            results,
            handle,
        })
    }

    /// Grant one permit and wait for the worker's answer.
    ///
    /// `None` means the worker is gone without depositing a sentinel.
    fn exchange(&mut self) -> Option<Resume> {
        self.permits.blocking_send(()).ok()?;
        self.results.blocking_recv()
    }

    /// Close both channels and wait for the worker to exit.
    fn shutdown(self) -> thread::Result<()> {
        let Worker {
            permits,
            results,
            handle,
        } = self;
        drop(permits);
        drop(results);
        handle.join()
    }
}

/// Generator running the producer on a dedicated worker thread.
///
/// Dropping or rewinding it closes both channels, so the worker's pending
/// yield returns `Halt::Stop`, then joins the thread. A producer that
/// discards that `Halt` instead of returning it keeps running, and the join
/// blocks until it ends on its own.
pub struct ThreadGenerator {
    source: Arc<Source>,
    worker_name: String,
    worker: Option<Worker>,
    done: bool,
    result: Value,
}

impl ThreadGenerator {
    pub(crate) fn new(source: Arc<Source>, worker_name: String) -> Self {
        Self {
            source,
            worker_name,
            worker: None,
            done: false,
            result: Value::Nil,
        }
    }

    fn reap(&mut self) -> EnumResult<()> {
        match self.worker.take() {
            Some(worker) => {
                log::debug!("Reaping generator worker `{}`", self.worker_name);
                worker.shutdown().map_err(|_| EnumError::WorkerPanicked)
            }
            None => Ok(()),
        }
    }
}

impl GeneratorStrategy for ThreadGenerator {
    fn next(&mut self) -> EnumResult<Option<Vec<Value>>> {
        if self.done {
            return Ok(None);
        }
        if self.worker.is_none() {
            log::debug!("Spawning generator worker `{}`", self.worker_name);
            self.worker = Some(Worker::spawn(Arc::clone(&self.source), &self.worker_name)?);
        }

        let handoff = self
            .worker
            .as_mut()
            .and_then(|worker| off_runtime(|| worker.exchange()));
        match handoff {
            Some(Resume::Yielded(values)) => Ok(Some(values)),
            Some(Resume::Finished(result)) => {
                self.done = true;
                self.result = result;
                Ok(None)
            }
            Some(Resume::Failed(err)) => {
                self.done = true;
                self.reap()?;
                Err(err)
            }
            None => {
                self.done = true;
                self.reap()?;
                Ok(None)
            }
        }
    }

    fn has_next(&mut self) -> bool {
        if self.done {
            if let Err(err) = self.reap() {
                log::warn!("Generator worker ended abnormally: {}", err);
            }
            return false;
        }
        true
    }

    fn rewind(&mut self) {
        if let Err(err) = self.reap() {
            log::warn!("Generator worker ended abnormally: {}", err);
        }
        self.done = false;
        self.result = Value::Nil;
    }

    fn result(&self) -> Value {
        self.result.clone()
    }
}

impl Drop for ThreadGenerator {
    fn drop(&mut self) {
        if let Err(err) = self.reap() {
            log::warn!("Generator worker ended abnormally: {}", err);
        }
    }
}
