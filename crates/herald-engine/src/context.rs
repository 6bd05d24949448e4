//! Out-of-band event snapshots
//!
//! An [`EventContext`] carries a packed copy of a broadcast's arguments to
//! receive hooks, and lets script-side callers build argument lists for
//! [`crate::EventCenter::broadcast_dynamic`]. Values are read positionally
//! with bounds and type checks.

use herald_sdk::{
    DynamicTuple, EventParam, EventResult, Name, ObjectRef, Signature, Text, TypeRegistry,
};

/// Positional, type-checked access to a packed argument list
#[derive(Debug, Default)]
pub struct EventContext {
    tuple: DynamicTuple,
}

impl EventContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context that links descriptors through `types`
    pub fn with_types(types: TypeRegistry) -> Self {
        Self {
            tuple: DynamicTuple::with_types(types),
        }
    }

    /// Wrap an already packed frame
    pub fn from_tuple(tuple: DynamicTuple) -> Self {
        Self { tuple }
    }

    /// Replace the packed frame, dropping the previous values
    pub fn reset(&mut self, tuple: DynamicTuple) {
        self.tuple = tuple;
    }

    /// Borrow the packed frame
    pub fn tuple(&self) -> &DynamicTuple {
        &self.tuple
    }

    /// Mutably borrow the packed frame
    pub fn tuple_mut(&mut self) -> &mut DynamicTuple {
        &mut self.tuple
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.tuple.len()
    }

    /// Check if the context holds no arguments
    pub fn is_empty(&self) -> bool {
        self.tuple.is_empty()
    }

    /// Signature of the packed arguments
    pub fn signature(&self) -> &Signature {
        self.tuple.signature()
    }

    // ========================================================================
    // Adders
    // ========================================================================

    /// Append a typed value
    pub fn add<T: EventParam>(&mut self, value: &T) -> &mut Self {
        self.tuple.push(value);
        self
    }

    /// Append a bool
    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.add(&value)
    }

    /// Append an i32
    pub fn add_i32(&mut self, value: i32) -> &mut Self {
        self.add(&value)
    }

    /// Append an i64
    pub fn add_i64(&mut self, value: i64) -> &mut Self {
        self.add(&value)
    }

    /// Append an f32
    pub fn add_f32(&mut self, value: f32) -> &mut Self {
        self.add(&value)
    }

    /// Append an f64
    pub fn add_f64(&mut self, value: f64) -> &mut Self {
        self.add(&value)
    }

    /// Append a string
    pub fn add_string(&mut self, value: impl Into<String>) -> &mut Self {
        self.add(&value.into())
    }

    /// Append a name
    pub fn add_name(&mut self, value: impl Into<Name>) -> &mut Self {
        self.add(&value.into())
    }

    /// Append display text
    pub fn add_text(&mut self, value: impl Into<Text>) -> &mut Self {
        self.add(&value.into())
    }

    /// Append an object reference
    pub fn add_object(&mut self, value: ObjectRef) -> &mut Self {
        self.add(&value)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Read argument `index` as `T`
    pub fn get<T: EventParam>(&self, index: usize) -> EventResult<T> {
        self.tuple
            .try_get::<T::Storage>(index)
            .map(T::from_storage)
    }

    /// Read a bool
    pub fn get_bool(&self, index: usize) -> EventResult<bool> {
        self.get(index)
    }

    /// Read an i32
    pub fn get_i32(&self, index: usize) -> EventResult<i32> {
        self.get(index)
    }

    /// Read an i64
    pub fn get_i64(&self, index: usize) -> EventResult<i64> {
        self.get(index)
    }

    /// Read an f32
    pub fn get_f32(&self, index: usize) -> EventResult<f32> {
        self.get(index)
    }

    /// Read an f64
    pub fn get_f64(&self, index: usize) -> EventResult<f64> {
        self.get(index)
    }

    /// Read a string
    pub fn get_string(&self, index: usize) -> EventResult<String> {
        self.get(index)
    }

    /// Read a name
    pub fn get_name(&self, index: usize) -> EventResult<Name> {
        self.get(index)
    }

    /// Read display text
    pub fn get_text(&self, index: usize) -> EventResult<Text> {
        self.get(index)
    }

    /// Read an object reference
    pub fn get_object(&self, index: usize) -> EventResult<ObjectRef> {
        self.get(index)
    }
}

impl From<DynamicTuple> for EventContext {
    fn from(tuple: DynamicTuple) -> Self {
        Self::from_tuple(tuple)
    }
}
