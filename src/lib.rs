pub mod config;
pub mod enumerator;
pub mod error;
pub mod generator;
pub mod lazy;
pub mod pattern;
pub mod producer;
pub mod stream;
pub mod value;
pub mod yielder;

// Re-export the everyday surface at the crate root
pub use config::{EnumeratorConfig, StrategyKind};
pub use enumerator::{Enumerator, Pull, Size};
pub use error::{EnumError, EnumResult, Halt};
pub use crate::generator::GeneratorStrategy;
pub use lazy::{Flow, Lazy, ZipSource};
pub use pattern::{matching, Pattern};
pub use producer::{Block, Counter, FromFn, Producer};
pub use stream::{into_stream, IntoEnumStream};
pub use value::Value;
pub use yielder::Yielder;
