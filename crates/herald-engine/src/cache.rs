//! Per-shape signature cache

use herald_sdk::{EventArgs, Signature, TypeRegistry};
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

/// One shared [`Signature`] per statically known argument tuple
///
/// Keyed by the `TypeId` of the tuple type. Owned by the event center, so
/// descriptors link against that center's type registry.
#[derive(Debug)]
pub struct SignatureCache {
    types: TypeRegistry,
    signatures: RefCell<FxHashMap<TypeId, Rc<Signature>>>,
}

impl SignatureCache {
    /// Create an empty cache over `types`
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            signatures: RefCell::new(FxHashMap::default()),
        }
    }

    /// Type registry used to describe parameters
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Signature of the argument tuple `A`
    pub fn of<A: EventArgs>(&self) -> Rc<Signature> {
        let key = TypeId::of::<A>();
        let cached = self.signatures.borrow().get(&key).cloned();
        if let Some(signature) = cached {
            return signature;
        }
        let signature = Rc::new(A::signature(&self.types));
        self.signatures.borrow_mut().insert(key, signature.clone());
        signature
    }

    /// Number of cached shapes
    pub fn len(&self) -> usize {
        self.signatures.borrow().len()
    }

    /// Check if no shape has been cached
    pub fn is_empty(&self) -> bool {
        self.signatures.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_sdk::Mut;

    #[test]
    fn test_one_signature_per_shape() {
        let cache = SignatureCache::new(TypeRegistry::new());
        let a = cache.of::<(i32, String)>();
        let b = cache.of::<(i32, String)>();
        let c = cache.of::<(i32, Mut<String>)>();

        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert!(a.equal_to(&c));
        assert_eq!(cache.len(), 2);
    }
}
