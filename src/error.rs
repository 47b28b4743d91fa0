//! Error types and handling for enumerators
//!
//! This module provides the errors surfaced by pull and push iteration,
//! and the internal `Halt` signal that travels through producer callbacks.

use crate::value::Value;

/// Main error type for enumerator operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnumError {
    /// The sequence is exhausted; carries the producer's final result
    #[error("iteration reached an end")]
    IterationEnded { result: Value },
    /// `feed` was called while a previous feed value is still unconsumed
    #[error("feed value already set")]
    FeedAlreadyPending,
    /// Negative or non-integral count or offset
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The producer does not know the requested iteration method
    #[error("undefined iteration method `{0}`")]
    NoMethod(String),
    /// The producer panicked while being pulled
    #[error("producer panicked during pull")]
    WorkerPanicked,
    /// The process-wide configuration was installed twice
    #[error("enumerator configuration already installed")]
    AlreadyConfigured,
    /// Failure raised by a producer or a user-supplied transform
    #[error("enumerator error: {0}")]
    Custom(String),
}

impl EnumError {
    /// Shorthand for a producer-side failure
    pub fn custom(msg: impl Into<String>) -> Self {
        EnumError::Custom(msg.into())
    }

    /// True for the exhaustion signal
    pub fn is_iteration_ended(&self) -> bool {
        matches!(self, EnumError::IterationEnded { .. })
    }

    /// The final result carried by `IterationEnded`
    pub fn result(&self) -> Option<&Value> {
        match self {
            EnumError::IterationEnded { result } => Some(result),
            _ => None,
        }
    }
}

/// Result type for enumerator operations
pub type EnumResult<T> = Result<T, EnumError>;

/// Control signal returned from a producer's per-element callback.
///
/// Producers propagate it with `?`. `Stop` asks the producer to end its loop
/// early and never reaches callers of the public API: it is absorbed at the
/// point where a chain is realized.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// Downstream wants no more elements
    Stop,
    /// A genuine failure
    Error(EnumError),
}

impl From<EnumError> for Halt {
    fn from(err: EnumError) -> Self {
        Halt::Error(err)
    }
}

impl Halt {
    /// Absorb `Stop` as a `Nil` result, surface everything else.
    pub(crate) fn settle(outcome: Result<Value, Halt>) -> EnumResult<Value> {
        match outcome {
            Ok(value) => Ok(value),
            Err(Halt::Stop) => Ok(Value::Nil),
            Err(Halt::Error(err)) => Err(err),
        }
    }
}
