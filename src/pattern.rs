//! Case-equality patterns for `Lazy::grep`

use crate::value::Value;
use regex::Regex;
use std::ops::RangeInclusive;

/// Something an element can be tested against
pub trait Pattern: Send + Sync {
    fn matches(&self, value: &Value) -> bool;
}

/// Plain equality
impl Pattern for Value {
    fn matches(&self, value: &Value) -> bool {
        self == value
    }
}

/// Strings the expression finds a match in
impl Pattern for Regex {
    fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.is_match(s))
    }
}

/// Integers inside the range
impl Pattern for RangeInclusive<i64> {
    fn matches(&self, value: &Value) -> bool {
        value.as_int().is_some_and(|i| self.contains(&i))
    }
}

/// Pattern defined by a predicate function
pub struct Predicate<F>(pub F);

impl<F> Pattern for Predicate<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn matches(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

/// Wrap a predicate as a [`Pattern`].
pub fn matching<F>(f: F) -> Predicate<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    Predicate(f)
}
