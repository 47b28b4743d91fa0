use crate::error::Halt;
use crate::producer::Block;
use crate::value::Value;

/// Producer-facing handle that forwards each produced element downstream.
pub struct Yielder<'y, 'b> {
    block: &'y mut Block<'b>,
}

impl<'y, 'b> Yielder<'y, 'b> {
    pub fn new(block: &'y mut Block<'b>) -> Self {
        Self { block }
    }

    /// Hand `values` to the stored callback and return what it returned.
    pub fn yield_(&mut self, values: Vec<Value>) -> Result<Value, Halt> {
        (self.block)(values)
    }

    /// Yield a single value, returning the yielder for chaining.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<&mut Self, Halt> {
        self.yield_(vec![value.into()])?;
        Ok(self)
    }
}
