//! Statically typed event parameters
//!
//! Every Rust type that can travel through an event implements [`EventParam`].
//! A parameter describes itself with a [`ParamDescriptor`] and names the
//! `Storage` type that represents it inside a [`crate::DynamicTuple`] slot.
//! Parameters whose storage coincide may be converted into each other
//! through a packed frame: `Mut<String>` and `String`, or `Obj<Pawn>` and
//! `Obj<Actor>`.

use crate::descriptor::ParamDescriptor;
use crate::name::{Name, Text};
use crate::object::{Class, Obj, Object, ObjectRef};
use crate::types::{ParamFlags, ParamKind, TypeRegistry};
use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A value that can be passed as an event argument
pub trait EventParam: Sized + 'static {
    /// Value stored in a tuple slot for this parameter
    type Storage: Clone + 'static;

    /// Whether mutations by listeners propagate back to the broadcaster
    const IS_MUT: bool = false;

    /// Describe the parameter, linking registered types
    fn descriptor(types: &TypeRegistry) -> ParamDescriptor;

    /// Copy the value into its slot representation
    fn to_storage(&self) -> Self::Storage;

    /// Rebuild a value from its slot representation
    fn from_storage(storage: &Self::Storage) -> Self;

    /// Write the current value into a slot
    fn store_back(&self, _storage: &mut Self::Storage) {}

    /// Refresh the value from a slot
    fn load_back(&self, _storage: &Self::Storage) {}
}

macro_rules! impl_builtin_param {
    ($($ty:ty => $kind:ident, $name:literal;)*) => {
        $(
            impl EventParam for $ty {
                type Storage = $ty;

                fn descriptor(_types: &TypeRegistry) -> ParamDescriptor {
                    ParamDescriptor::new(ParamKind::$kind, $name)
                }

                fn to_storage(&self) -> $ty {
                    self.clone()
                }

                fn from_storage(storage: &$ty) -> Self {
                    storage.clone()
                }
            }
        )*
    };
}

impl_builtin_param! {
    bool => Boolean, "bool";
    u8 => Byte, "u8";
    i32 => Int32, "i32";
    i64 => Int64, "i64";
    f32 => Float, "f32";
    f64 => Double, "f64";
    String => String, "String";
    Name => Name, "Name";
    Text => Text, "Text";
}

impl<T> EventParam for Vec<T>
where
    T: EventParam<Storage = T> + Clone,
{
    type Storage = Vec<T>;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        let element = T::descriptor(types);
        ParamDescriptor::new(ParamKind::Array, format!("Vec<{}>", element.type_name()))
    }

    fn to_storage(&self) -> Vec<T> {
        self.clone()
    }

    fn from_storage(storage: &Vec<T>) -> Self {
        storage.clone()
    }
}

impl<T> EventParam for HashSet<T>
where
    T: EventParam<Storage = T> + Clone + Eq + Hash,
{
    type Storage = HashSet<T>;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        let element = T::descriptor(types);
        ParamDescriptor::new(ParamKind::Set, format!("HashSet<{}>", element.type_name()))
    }

    fn to_storage(&self) -> HashSet<T> {
        self.clone()
    }

    fn from_storage(storage: &HashSet<T>) -> Self {
        storage.clone()
    }
}

impl<K, V> EventParam for HashMap<K, V>
where
    K: EventParam<Storage = K> + Clone + Eq + Hash,
    V: EventParam<Storage = V> + Clone,
{
    type Storage = HashMap<K, V>;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        let key = K::descriptor(types);
        let value = V::descriptor(types);
        ParamDescriptor::new(
            ParamKind::Map,
            format!("HashMap<{}, {}>", key.type_name(), value.type_name()),
        )
    }

    fn to_storage(&self) -> HashMap<K, V> {
        self.clone()
    }

    fn from_storage(storage: &HashMap<K, V>) -> Self {
        storage.clone()
    }
}

fn object_descriptor(types: &TypeRegistry, class: TypeId, fallback: &'static str) -> ParamDescriptor {
    match types.get(class) {
        Some(info) => ParamDescriptor::from_type_info(info),
        None => ParamDescriptor::new(ParamKind::Object, fallback).with_flags(ParamFlags::POINTER),
    }
}

impl EventParam for ObjectRef {
    type Storage = ObjectRef;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        object_descriptor(types, TypeId::of::<dyn Object>(), "Object")
    }

    fn to_storage(&self) -> ObjectRef {
        self.clone()
    }

    fn from_storage(storage: &ObjectRef) -> Self {
        storage.clone()
    }
}

impl<C: Class> EventParam for Obj<C> {
    type Storage = ObjectRef;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        object_descriptor(types, TypeId::of::<C>(), C::CLASS_NAME)
    }

    fn to_storage(&self) -> ObjectRef {
        self.as_object().clone()
    }

    fn from_storage(storage: &ObjectRef) -> Self {
        Obj::from_ref(storage.clone())
    }
}

/// In/out event parameter
///
/// Listeners receive the argument tuple by shared reference and mutate a
/// `Mut` through its cell. Mutations are visible to later listeners and to
/// the broadcaster, including listeners reached through a packed frame.
#[derive(Debug, Default)]
pub struct Mut<T>(RefCell<T>);

impl<T> Mut<T> {
    /// Wrap a value
    pub fn new(value: T) -> Self {
        Mut(RefCell::new(value))
    }

    /// Borrow the value
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the value
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Replace the value
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Replace the value, returning the old one
    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// Unwrap the value
    pub fn into_inner(self) -> T {
        self.0.into_inner()
    }
}

impl<T: Clone> Mut<T> {
    /// Copy of the current value
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: Clone> Clone for Mut<T> {
    fn clone(&self) -> Self {
        Mut::new(self.get())
    }
}

impl<T: PartialEq> PartialEq for Mut<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.0.borrow() == *other.0.borrow()
    }
}

impl<T: EventParam> EventParam for Mut<T> {
    type Storage = T::Storage;

    const IS_MUT: bool = true;

    fn descriptor(types: &TypeRegistry) -> ParamDescriptor {
        T::descriptor(types).with_flags(ParamFlags::REFERENCE)
    }

    fn to_storage(&self) -> T::Storage {
        self.0.borrow().to_storage()
    }

    fn from_storage(storage: &T::Storage) -> Self {
        Mut::new(T::from_storage(storage))
    }

    fn store_back(&self, storage: &mut T::Storage) {
        *storage = self.0.borrow().to_storage();
    }

    fn load_back(&self, storage: &T::Storage) {
        *self.0.borrow_mut() = T::from_storage(storage);
    }
}

/// Implement [`EventParam`] for a user aggregate or enum
///
/// The type must be `Clone`. If the type is registered in the
/// [`TypeRegistry`], its registry entry supplies name and link.
///
/// ```ignore
/// #[derive(Clone, Default)]
/// struct Vector3 { x: f32, y: f32, z: f32 }
/// event_param!(Vector3, Aggregate, "Vector3");
/// ```
#[macro_export]
macro_rules! event_param {
    ($ty:ty, $kind:ident, $name:literal) => {
        impl $crate::EventParam for $ty {
            type Storage = $ty;

            fn descriptor(types: &$crate::TypeRegistry) -> $crate::ParamDescriptor {
                match types.get(::std::any::TypeId::of::<$ty>()) {
                    Some(info) => $crate::ParamDescriptor::from_type_info(info),
                    None => $crate::ParamDescriptor::new($crate::ParamKind::$kind, $name),
                }
            }

            fn to_storage(&self) -> $ty {
                ::std::clone::Clone::clone(self)
            }

            fn from_storage(storage: &$ty) -> Self {
                ::std::clone::Clone::clone(storage)
            }
        }
    };
}
