//! Async bridge: pull an enumerator as a `Stream`
//!
//! Each pull runs on tokio's blocking pool, since both pull strategies park
//! the calling thread until the producer hands over an element.

use crate::enumerator::Enumerator;
use crate::error::{EnumError, EnumResult};
use crate::lazy::Lazy;
use crate::value::Value;
use async_stream::stream;
use futures_util::stream::BoxStream;

/// Stream the elements of `enumerator`, ending after the last one.
///
/// A producer failure is yielded once as an `Err` and ends the stream.
pub fn into_stream(enumerator: Enumerator) -> BoxStream<'static, EnumResult<Value>> {
    let stream = stream! {
        let mut slot = Some(enumerator);
        while let Some(mut enumerator) = slot.take() {
            let pulled = tokio::task::spawn_blocking(move || {
                let next = enumerator.next();
                (enumerator, next)
            })
            .await;

            match pulled {
                Ok((enumerator, Ok(value))) => {
                    slot = Some(enumerator);
                    yield Ok(value);
                }
                Ok((_, Err(err))) if err.is_iteration_ended() => {
                    log::trace!("Enumerator stream exhausted");
                }
                Ok((_, Err(err))) => {
                    yield Err(err);
                }
                Err(join_err) => {
                    log::error!("Enumerator pull task failed: {}", join_err);
                    yield Err(EnumError::WorkerPanicked);
                }
            }
        }
    };

    Box::pin(stream)
}

/// Extension trait turning pull sources into streams
pub trait IntoEnumStream {
    fn into_stream(self) -> BoxStream<'static, EnumResult<Value>>;
}

impl IntoEnumStream for Enumerator {
    fn into_stream(self) -> BoxStream<'static, EnumResult<Value>> {
        into_stream(self)
    }
}

impl IntoEnumStream for Lazy {
    fn into_stream(self) -> BoxStream<'static, EnumResult<Value>> {
        into_stream(self.into_enumerator())
    }
}
