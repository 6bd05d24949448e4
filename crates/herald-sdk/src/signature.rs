//! Ordered parameter-type lists and their compatibility rules

use crate::descriptor::ParamDescriptor;
use crate::reflect::ReflectedFunction;
use crate::types::ParamKind;
use std::fmt;

/// How a signature was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureOrigin {
    /// Built once from a statically known argument tuple
    Generic,
    /// Built by appending descriptors at runtime
    Dynamic,
    /// Built from a reflected method's formal parameters
    Reflected,
}

/// Calling convention implied by a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeType {
    /// Arguments are passed as a typed Rust tuple
    Static,
    /// Arguments are passed through a packed frame
    Dynamic,
}

/// Ordered sequence of parameter descriptors with a derived display name
///
/// Pointer parameters display with a trailing `*`. Exact equality uses a
/// separate key that also encodes each parameter's kind.
#[derive(Clone)]
pub struct Signature {
    name: String,
    key: String,
    params: Vec<ParamDescriptor>,
    origin: SignatureOrigin,
    valid: bool,
}

impl Signature {
    /// Signature for a statically known parameter list
    pub fn generic(params: Vec<ParamDescriptor>) -> Self {
        let mut signature = Self::empty(SignatureOrigin::Generic);
        for param in params {
            signature.push(param);
        }
        signature
    }

    /// Empty signature to be filled at runtime
    pub fn dynamic() -> Self {
        Self::empty(SignatureOrigin::Dynamic)
    }

    /// Signature of a reflected method
    ///
    /// Methods with a return value or a parameter of undefined kind cannot be
    /// listeners; they yield an invalid signature.
    pub fn reflected(function: &ReflectedFunction) -> Self {
        let mut signature = Self::empty(SignatureOrigin::Reflected);
        for param in function.params() {
            if param.is_return {
                tracing::error!(
                    "Function {} is not a valid event listener: listeners cannot return a value",
                    function.name()
                );
                return Self::invalid(SignatureOrigin::Reflected);
            }
            if param.descriptor.kind() == ParamKind::Undefined {
                tracing::error!(
                    "Function {} is not a valid event listener: parameter {} has unsupported type {}",
                    function.name(),
                    param.name,
                    param.descriptor.type_name()
                );
                return Self::invalid(SignatureOrigin::Reflected);
            }
            signature.push(param.descriptor.clone());
        }
        signature
    }

    fn empty(origin: SignatureOrigin) -> Self {
        Self {
            name: String::new(),
            key: String::new(),
            params: Vec::new(),
            origin,
            valid: true,
        }
    }

    fn invalid(origin: SignatureOrigin) -> Self {
        Self {
            valid: false,
            ..Self::empty(origin)
        }
    }

    /// Append a parameter
    pub fn push(&mut self, param: ParamDescriptor) {
        if !self.params.is_empty() {
            self.name.push_str(", ");
        }
        self.name.push_str(&param.to_string());
        self.key.push_str(&format!(
            "{}:{}:{}{};",
            param.kind() as u8,
            param.type_name().len(),
            param.type_name(),
            if param.is_pointer() { "*" } else { "" }
        ));
        self.params.push(param);
    }

    /// Remove all parameters
    pub fn clear(&mut self) {
        self.name.clear();
        self.key.clear();
        self.params.clear();
    }

    /// Display name: parameter type names joined by ", "
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in order
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Parameter at `index`
    pub fn param(&self, index: usize) -> Option<&ParamDescriptor> {
        self.params.get(index)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the signature has no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Whether the signature was built successfully
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// How the signature was produced
    pub fn origin(&self) -> SignatureOrigin {
        self.origin
    }

    /// Calling convention for listeners with this signature
    pub fn invoke_type(&self) -> InvokeType {
        match self.origin {
            SignatureOrigin::Generic => InvokeType::Static,
            SignatureOrigin::Dynamic | SignatureOrigin::Reflected => InvokeType::Dynamic,
        }
    }

    /// Whether any parameter is a non-const reference
    pub fn has_mutable_reference(&self) -> bool {
        self.params.iter().any(ParamDescriptor::is_mutable_reference)
    }

    /// Exact equality
    ///
    /// Compares the derived keys; debug builds cross-check the result against
    /// an element-by-element comparison.
    pub fn equal_to(&self, other: &Signature) -> bool {
        if !self.valid || !other.valid {
            return false;
        }
        let fast = self.key == other.key;
        debug_assert_eq!(
            fast,
            self.equal_to_slow(other),
            "signature key comparison disagrees with element comparison: ({}) vs ({})",
            self.name,
            other.name
        );
        fast
    }

    fn equal_to_slow(&self, other: &Signature) -> bool {
        self.params == other.params
    }

    /// Check whether a listener with this signature accepts arguments described by `source`
    pub fn check_invokeable_from(&self, source: &Signature) -> bool {
        if !self.valid || !source.valid || self.params.len() != source.params.len() {
            return false;
        }
        self.params
            .iter()
            .zip(&source.params)
            .all(|(target, from)| target.check_invoke_convertible_from(from))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("valid", &self.valid)
            .finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
