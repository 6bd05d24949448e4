//! Managed host objects and the reflected-call contract
//!
//! Objects are owned by the host through `Rc<dyn Object>`. Listener targets
//! are held weakly; the host decides when an object dies.

use crate::reflect::MethodHandle;
use crate::tuple::DynamicTuple;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// A host object that can be the target of reflected calls
pub trait Object: Any {
    /// Class name used in diagnostics
    fn class_name(&self) -> &str;

    /// Resolve a callable method by name
    fn find_method(&self, _name: &str) -> Option<MethodHandle> {
        None
    }

    /// Invoke `method` with `frame` as its argument frame
    ///
    /// In/out parameters are written back into the frame.
    fn process_event(&self, _method: &MethodHandle, _frame: &mut DynamicTuple) {}
}

/// An object type with a static class name
pub trait Class: Object + Sized {
    /// Class name
    const CLASS_NAME: &'static str;
}

/// Nullable strong reference to a host object
#[derive(Clone, Default)]
pub struct ObjectRef(Option<Rc<dyn Object>>);

impl ObjectRef {
    /// Reference an object
    pub fn new<T: Object>(object: Rc<T>) -> Self {
        ObjectRef(Some(object))
    }

    /// The null reference
    pub fn null() -> Self {
        ObjectRef(None)
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the referenced object
    pub fn get(&self) -> Option<&Rc<dyn Object>> {
        self.0.as_ref()
    }

    /// Borrow the object as a concrete type
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        let object: &dyn Any = self.0.as_deref()?;
        object.downcast_ref::<T>()
    }

    /// Strong reference to the object as a concrete type
    pub fn downcast<T: Object>(&self) -> Option<Rc<T>> {
        let object: Rc<dyn Any> = self.0.clone()?;
        object.downcast::<T>().ok()
    }

    /// Weak reference to the same object
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(self.0.as_ref().map(Rc::downgrade))
    }

    /// Address of the referenced object, 0 for null
    pub fn addr(&self) -> usize {
        self.0
            .as_ref()
            .map_or(0, |object| Rc::as_ptr(object) as *const () as usize)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: Object> From<Rc<T>> for ObjectRef {
    fn from(object: Rc<T>) -> Self {
        ObjectRef::new(object)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(object) => write!(f, "ObjectRef({} @ {:#x})", object.class_name(), self.addr()),
            None => f.write_str("ObjectRef(null)"),
        }
    }
}

/// Weak reference to a host object
#[derive(Clone, Default)]
pub struct WeakObjectRef(Option<Weak<dyn Object>>);

impl WeakObjectRef {
    /// Upgrade to a strong reference; null if the object is gone
    pub fn upgrade(&self) -> ObjectRef {
        ObjectRef(self.0.as_ref().and_then(Weak::upgrade))
    }

    /// Whether the object is gone
    pub fn is_expired(&self) -> bool {
        self.0.as_ref().is_none_or(|weak| weak.strong_count() == 0)
    }

    /// Address of the referenced object, 0 for null
    pub fn addr(&self) -> usize {
        self.0
            .as_ref()
            .map_or(0, |weak| Weak::as_ptr(weak) as *const () as usize)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakObjectRef({:#x}, expired: {})", self.addr(), self.is_expired())
    }
}

/// Object reference declared as class `C`
///
/// The referenced object is an instance of `C` or of a class registered as
/// deriving from it, so it is reached through [`ObjectRef`] accessors.
pub struct Obj<C> {
    object: ObjectRef,
    _class: PhantomData<fn() -> C>,
}

impl<C: Class> Obj<C> {
    /// Reference an instance of `C`
    pub fn new(object: Rc<C>) -> Self {
        Self::from_ref(ObjectRef::new(object))
    }

    /// Null reference
    pub fn null() -> Self {
        Self::from_ref(ObjectRef::null())
    }

    /// Wrap an untyped reference
    pub fn from_ref(object: ObjectRef) -> Self {
        Self {
            object,
            _class: PhantomData,
        }
    }

    /// Untyped reference
    pub fn as_object(&self) -> &ObjectRef {
        &self.object
    }

    /// The object as an instance of exactly `C`
    pub fn get(&self) -> Option<Rc<C>> {
        self.object.downcast::<C>()
    }
}

impl<C> Clone for Obj<C> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            _class: PhantomData,
        }
    }
}

impl<C> fmt::Debug for Obj<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.object.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lamp;

    impl Object for Lamp {
        fn class_name(&self) -> &str {
            "Lamp"
        }
    }

    impl Class for Lamp {
        const CLASS_NAME: &'static str = "Lamp";
    }

    struct Door;

    impl Object for Door {
        fn class_name(&self) -> &str {
            "Door"
        }
    }

    #[test]
    fn test_downcast() {
        let object = ObjectRef::new(Rc::new(Lamp));
        assert!(object.downcast_ref::<Lamp>().is_some());
        assert!(object.downcast_ref::<Door>().is_none());
        assert!(object.downcast::<Lamp>().is_some());
        assert!(ObjectRef::null().downcast::<Lamp>().is_none());
    }

    #[test]
    fn test_weak_expires() {
        let lamp = Rc::new(Lamp);
        let object = ObjectRef::new(lamp.clone());
        let weak = object.downgrade();
        assert_eq!(weak.addr(), object.addr());
        assert!(!weak.is_expired());

        drop(object);
        drop(lamp);
        assert!(weak.is_expired());
        assert!(weak.upgrade().is_null());
    }

    #[test]
    fn test_identity() {
        let lamp = Rc::new(Lamp);
        let a = ObjectRef::new(lamp.clone());
        let b = ObjectRef::new(lamp);
        let c = ObjectRef::new(Rc::new(Lamp));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ObjectRef::null().addr(), 0);
    }

    #[test]
    fn test_typed_reference() {
        let lamp = Obj::<Lamp>::new(Rc::new(Lamp));
        assert!(lamp.get().is_some());
        assert!(Obj::<Lamp>::null().get().is_none());
        assert_eq!(lamp.clone().as_object(), lamp.as_object());
    }
}
