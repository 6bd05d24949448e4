//! Type registry for event parameter types
//!
//! The registry maps Rust types (and script-side names) to [`TypeInfo`], the
//! layout and lifecycle contract the dispatch core needs to place values of
//! aggregate, enum and object kinds into a dynamic tuple.

use super::kind::ParamKind;
use crate::error::{EventError, EventResult};
use crate::object::ObjectRef;
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::ptr;
use std::sync::{Arc, Weak};

/// Default-construct a value in place
pub type InitFn = unsafe fn(*mut u8);

/// Assign a copy of `src` over an initialized `dst`
pub type CopyFn = unsafe fn(*mut u8, *const u8);

/// Drop a value in place
pub type DropFn = unsafe fn(*mut u8);

unsafe fn init_value<T: Default>(dst: *mut u8) {
    unsafe { ptr::write(dst as *mut T, T::default()) }
}

unsafe fn copy_value<T: Clone>(dst: *mut u8, src: *const u8) {
    unsafe { (*(dst as *mut T)).clone_from(&*(src as *const T)) }
}

pub(crate) unsafe fn drop_value<T>(dst: *mut u8) {
    unsafe { ptr::drop_in_place(dst as *mut T) }
}

type ReadFn = dyn Fn(*const u8, *mut u8) + Send + Sync;
type WriteFn = dyn Fn(*mut u8, *const u8) + Send + Sync;

/// Conversion between a derived aggregate and one of its ancestors
#[derive(Clone)]
pub(crate) struct Conversion {
    read: Arc<ReadFn>,
    write: Arc<WriteFn>,
}

impl Conversion {
    /// Write a copy of the ancestor part of `src` into uninitialized `dst`
    ///
    /// # Safety
    ///
    /// `src` must address a live value of the derived type and `dst` must be
    /// valid, aligned storage for the ancestor type.
    pub(crate) unsafe fn read(&self, src: *const u8, dst: *mut u8) {
        (*self.read)(src, dst)
    }

    /// Assign the ancestor value at `src` over the ancestor part of `dst`
    ///
    /// # Safety
    ///
    /// `dst` must address a live value of the derived type and `src` a live
    /// value of the ancestor type.
    pub(crate) unsafe fn write(&self, dst: *mut u8, src: *const u8) {
        (*self.write)(dst, src)
    }
}

/// Conversions of `C` to its parent `P` and to every ancestor `P` converts to
fn derived_conversions<C, P>(parent: &TypeInfo) -> FxHashMap<TypeId, Conversion>
where
    C: AsRef<P> + AsMut<P> + 'static,
    P: Clone + 'static,
{
    let mut conversions = FxHashMap::default();
    conversions.insert(
        TypeId::of::<P>(),
        Conversion {
            read: Arc::new(|src: *const u8, dst: *mut u8| unsafe {
                let child = &*(src as *const C);
                ptr::write(dst as *mut P, child.as_ref().clone());
            }),
            write: Arc::new(|dst: *mut u8, src: *const u8| unsafe {
                let child = &mut *(dst as *mut C);
                child.as_mut().clone_from(&*(src as *const P));
            }),
        },
    );
    for (&ancestor, through) in &parent.conversions {
        let read = through.read.clone();
        let write = through.write.clone();
        conversions.insert(
            ancestor,
            Conversion {
                read: Arc::new(move |src: *const u8, dst: *mut u8| unsafe {
                    let child = &*(src as *const C);
                    (*read)(child.as_ref() as *const P as *const u8, dst)
                }),
                write: Arc::new(move |dst: *mut u8, src: *const u8| unsafe {
                    let child = &mut *(dst as *mut C);
                    (*write)(child.as_mut() as *mut P as *mut u8, src)
                }),
            },
        );
    }
    conversions
}

/// Runtime type information for an event parameter type
///
/// Entries are built with [`TypeInfo::value`], [`TypeInfo::class`] or the
/// unchecked [`TypeInfo::from_raw`]; the layout cannot be edited afterwards.
/// Derived aggregates are registered with
/// [`TypeRegistryBuilder::register_derived_value`].
#[derive(Clone)]
pub struct TypeInfo {
    /// Rust type described by this entry (None for script-only types)
    type_id: Option<TypeId>,

    /// Rust type stored in a tuple slot for this entry
    storage_id: Option<TypeId>,

    /// Canonical type name
    name: String,

    /// Kind tag
    kind: ParamKind,

    /// Size of the stored value in bytes
    size: usize,

    /// Alignment requirement of the stored value
    align: usize,

    /// Default construction
    init_fn: InitFn,

    /// Copy assignment
    copy_fn: CopyFn,

    /// Optional drop function
    drop_fn: Option<DropFn>,

    /// Direct supertype, for object and aggregate hierarchies
    parent: Option<Arc<TypeInfo>>,

    /// Conversions to ancestor storage types, keyed by their `TypeId`
    conversions: FxHashMap<TypeId, Conversion>,
}

impl TypeInfo {
    /// Describe a plain value type stored as itself
    pub fn value<T: Default + Clone + 'static>(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            type_id: Some(TypeId::of::<T>()),
            storage_id: Some(TypeId::of::<T>()),
            name: name.into(),
            kind,
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            init_fn: init_value::<T>,
            copy_fn: copy_value::<T>,
            drop_fn: if std::mem::needs_drop::<T>() {
                Some(drop_value::<T>)
            } else {
                None
            },
            parent: None,
            conversions: FxHashMap::default(),
        }
    }

    /// Describe an object class; arguments of this class are stored as [`ObjectRef`]
    pub fn class<C: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            type_id: Some(TypeId::of::<C>()),
            ..Self::value::<ObjectRef>(name, ParamKind::Object)
        }
    }

    /// Describe a type from raw layout and lifecycle operations
    ///
    /// Fails with [`EventError::InvalidLayout`] unless `align` is a power of
    /// two. Values described this way have no Rust storage type, so tuple
    /// slots built from them are only reachable through raw pointers.
    ///
    /// # Safety
    ///
    /// `init_fn`, `copy_fn` and `drop_fn` must be valid for any properly
    /// aligned buffer of `size` bytes.
    pub unsafe fn from_raw(
        name: impl Into<String>,
        kind: ParamKind,
        size: usize,
        align: usize,
        init_fn: InitFn,
        copy_fn: CopyFn,
        drop_fn: Option<DropFn>,
    ) -> EventResult<Self> {
        let name = name.into();
        if !align.is_power_of_two() {
            return Err(EventError::InvalidLayout { name, size, align });
        }
        Ok(Self {
            type_id: None,
            storage_id: None,
            name,
            kind,
            size,
            align,
            init_fn,
            copy_fn,
            drop_fn,
            parent: None,
            conversions: FxHashMap::default(),
        })
    }

    /// Set the direct supertype
    ///
    /// Object arguments convert along this link. Aggregates only record it;
    /// they convert when registered through
    /// [`TypeRegistryBuilder::register_derived_value`].
    pub fn with_parent(mut self, parent: Arc<TypeInfo>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Rust type described by this entry (None for script-only types)
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Rust type stored in a tuple slot for this entry
    pub fn storage_id(&self) -> Option<TypeId> {
        self.storage_id
    }

    /// Canonical type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind tag
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Size of the stored value in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the stored value, always a power of two
    pub fn align(&self) -> usize {
        self.align
    }

    /// Whether values need a drop call
    pub fn has_drop(&self) -> bool {
        self.drop_fn.is_some()
    }

    /// Direct supertype
    pub fn parent(&self) -> Option<&Arc<TypeInfo>> {
        self.parent.as_ref()
    }

    /// Whether values of this type convert to values of `ancestor`
    pub fn converts_to(&self, ancestor: &TypeInfo) -> bool {
        ancestor
            .storage_id
            .is_some_and(|id| self.conversions.contains_key(&id))
    }

    pub(crate) fn conversion_to(&self, storage: TypeId) -> Option<&Conversion> {
        self.conversions.get(&storage)
    }

    /// Check whether both entries describe the same type
    pub fn same_type(&self, other: &TypeInfo) -> bool {
        match (self.type_id, other.type_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.kind == other.kind && self.name == other.name,
        }
    }

    /// Check whether this type is `other` or derives from it
    pub fn is_subtype_of(&self, other: &TypeInfo) -> bool {
        let mut current = Some(self);
        while let Some(info) = current {
            if info.same_type(other) {
                return true;
            }
            current = info.parent.as_deref();
        }
        false
    }

    /// Default-construct a value at `dst`
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `size` bytes and aligned to `align`.
    pub unsafe fn init(&self, dst: *mut u8) {
        unsafe { (self.init_fn)(dst) }
    }

    /// Copy the value at `src` over the initialized value at `dst`
    ///
    /// # Safety
    ///
    /// Both pointers must address initialized values of this type.
    pub unsafe fn copy(&self, dst: *mut u8, src: *const u8) {
        unsafe { (self.copy_fn)(dst, src) }
    }

    /// Drop the value at `dst`
    ///
    /// # Safety
    ///
    /// `dst` must address an initialized value of this type that is not used afterwards.
    pub unsafe fn destroy(&self, dst: *mut u8) {
        if let Some(drop_fn) = self.drop_fn {
            unsafe { drop_fn(dst) }
        }
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("has_drop", &self.drop_fn.is_some())
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("conversions", &self.conversions.len())
            .finish()
    }
}

/// Registry of parameter type information
///
/// Immutable once built; clones share the same tables.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    by_id: Arc<FxHashMap<TypeId, Arc<TypeInfo>>>,
    by_name: Arc<FxHashMap<String, Arc<TypeInfo>>>,
}

impl TypeRegistry {
    /// Create an empty type registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry builder
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Get type information by TypeId
    pub fn get(&self, type_id: TypeId) -> Option<&Arc<TypeInfo>> {
        self.by_id.get(&type_id)
    }

    /// Get type information by canonical name
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<TypeInfo>> {
        self.by_name.get(name)
    }

    /// Weak link to the entry for `T`, if registered
    pub fn link<T: ?Sized + 'static>(&self) -> Option<Weak<TypeInfo>> {
        self.get(TypeId::of::<T>()).map(Arc::downgrade)
    }

    /// Check if a type is registered
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.by_id.contains_key(&type_id)
    }

    /// Get the number of registered types
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Builder for constructing a TypeRegistry
#[derive(Default)]
pub struct TypeRegistryBuilder {
    by_id: FxHashMap<TypeId, Arc<TypeInfo>>,
    by_name: FxHashMap<String, Arc<TypeInfo>>,
}

impl TypeRegistryBuilder {
    /// Register a prepared type entry
    pub fn register(mut self, info: TypeInfo) -> Self {
        let info = Arc::new(info);
        if let Some(type_id) = info.type_id {
            self.by_id.insert(type_id, info.clone());
        }
        self.by_name.insert(info.name.clone(), info);
        self
    }

    /// Register a plain value type
    pub fn register_value<T: Default + Clone + 'static>(
        self,
        name: impl Into<String>,
        kind: ParamKind,
    ) -> Self {
        self.register(TypeInfo::value::<T>(name, kind))
    }

    /// Register a root object class
    pub fn register_class<C: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.register(TypeInfo::class::<C>(name))
    }

    /// Register an object class deriving from the already registered `P`
    pub fn register_subclass<C: ?Sized + 'static, P: ?Sized + 'static>(
        self,
        name: impl Into<String>,
    ) -> Self {
        let mut info = TypeInfo::class::<C>(name);
        match self.by_id.get(&TypeId::of::<P>()) {
            Some(parent) => info.parent = Some(parent.clone()),
            None => tracing::warn!(
                "Parent of class {} is not registered; registering it as a root class",
                info.name
            ),
        }
        self.register(info)
    }

    /// Register an aggregate deriving from the already registered aggregate `P`
    ///
    /// `C` embeds its parent and exposes it through `AsRef`/`AsMut`. A `C`
    /// argument reaches listeners declared with `P` (or any ancestor of `P`)
    /// as a copy of that part, and in/out writes land back in it.
    pub fn register_derived_value<C, P>(self, name: impl Into<String>) -> Self
    where
        C: AsRef<P> + AsMut<P> + Default + Clone + 'static,
        P: Clone + 'static,
    {
        let mut info = TypeInfo::value::<C>(name, ParamKind::Aggregate);
        match self.by_id.get(&TypeId::of::<P>()) {
            Some(parent) if parent.storage_id == Some(TypeId::of::<P>()) => {
                info.conversions = derived_conversions::<C, P>(parent);
                info.parent = Some(parent.clone());
            }
            _ => tracing::warn!(
                "Parent of aggregate {} is not registered; registering it as a root type",
                info.name
            ),
        }
        self.register(info)
    }

    /// Build the registry
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            by_id: Arc::new(self.by_id),
            by_name: Arc::new(self.by_name),
        }
    }
}
