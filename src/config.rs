//! Configuration types for enumerator pull strategies
//!
//! The strategy policy is chosen once at startup with [`install`]; every
//! enumerator that does not carry its own configuration reads [`current`].

use crate::error::{EnumError, EnumResult};
use once_cell::sync::OnceCell;

/// Which generator strategy drives an enumerator's pull interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Stackful coroutine on the calling thread
    Cooperative,
    /// Dedicated worker thread with lockstep handoff
    Thread,
}

impl Default for StrategyKind {
    fn default() -> Self {
        if cfg!(feature = "cooperative") {
            StrategyKind::Cooperative
        } else {
            StrategyKind::Thread
        }
    }
}

/// Configuration for pull strategies
#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratorConfig {
    pub strategy: StrategyKind,
    /// Coroutine stack size in machine words
    pub coroutine_stack_size: usize,
    /// Name given to thread generator workers
    pub worker_name: String,
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            coroutine_stack_size: 0x4000, // 128KiB on 64-bit targets
            worker_name: "enumerator-worker".to_string(),
        }
    }
}

impl EnumeratorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy policy
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the coroutine stack size
    pub fn coroutine_stack_size(mut self, words: usize) -> Self {
        self.coroutine_stack_size = words;
        self
    }

    /// Set the worker thread name
    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }
}

static GLOBAL_CONFIG: OnceCell<EnumeratorConfig> = OnceCell::new();

/// Install the process-wide configuration. Succeeds at most once.
pub fn install(config: EnumeratorConfig) -> EnumResult<()> {
    log::debug!("Installing enumerator configuration: {:?}", config);
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| EnumError::AlreadyConfigured)
}

/// The process-wide configuration, defaulted on first read
pub fn current() -> &'static EnumeratorConfig {
    GLOBAL_CONFIG.get_or_init(EnumeratorConfig::default)
}
