//! Reflected method descriptions
//!
//! A host object exposes callable methods through [`crate::Object::find_method`].
//! Each method is described by a [`ReflectedFunction`]: its name and its formal
//! parameters in argument-frame order.

use crate::descriptor::ParamDescriptor;
use crate::types::ParamFlags;
use std::rc::Rc;

/// Shared handle to a resolved reflected method
pub type MethodHandle = Rc<ReflectedFunction>;

/// One formal parameter of a reflected method
#[derive(Debug, Clone)]
pub struct ReflectedParam {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub descriptor: ParamDescriptor,
    /// Whether this slot carries the return value
    pub is_return: bool,
}

/// Data-driven description of a callable method
#[derive(Debug, Clone)]
pub struct ReflectedFunction {
    name: String,
    params: Vec<ReflectedParam>,
}

impl ReflectedFunction {
    /// Create a method description with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append an input parameter
    pub fn param(mut self, name: impl Into<String>, descriptor: ParamDescriptor) -> Self {
        self.params.push(ReflectedParam {
            name: name.into(),
            descriptor,
            is_return: false,
        });
        self
    }

    /// Append an in/out parameter passed by non-const reference
    pub fn out_param(self, name: impl Into<String>, descriptor: ParamDescriptor) -> Self {
        self.param(name, descriptor.with_flags(ParamFlags::REFERENCE))
    }

    /// Declare a return value
    pub fn returns(mut self, descriptor: ParamDescriptor) -> Self {
        self.params.push(ReflectedParam {
            name: "ReturnValue".to_string(),
            descriptor,
            is_return: true,
        });
        self
    }

    /// Wrap in a shareable handle
    pub fn into_handle(self) -> MethodHandle {
        Rc::new(self)
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formal parameters, return slot included
    pub fn params(&self) -> &[ReflectedParam] {
        &self.params
    }

    /// Number of input parameters
    pub fn num_inputs(&self) -> usize {
        self.params.iter().filter(|p| !p.is_return).count()
    }

    /// Whether the method produces a return value
    pub fn has_return(&self) -> bool {
        self.params.iter().any(|p| p.is_return)
    }
}
