//! Packed heterogeneous argument buffer
//!
//! A [`DynamicTuple`] lays values out back to back the way a `#[repr(C)]`
//! struct of the same field sequence would: each slot starts at the previous
//! slot's end rounded up to the slot's alignment. The buffer itself is
//! aligned to the largest slot alignment, so a reflected call can treat it
//! as a native argument frame.
//!
//! ```text
//! (bool, bool, i32, f64)
//! ┌────┬────┬────┬────┬─────────┬───────────────────┐
//! │ b0 │ b1 │ pad(2)  │ i32     │ f64               │
//! └────┴────┴────┴────┴─────────┴───────────────────┘
//!  0    1    2         4         8                   16
//! ```

use crate::args::EventArgs;
use crate::descriptor::ParamDescriptor;
use crate::error::{EventError, EventResult};
use crate::param::EventParam;
use crate::signature::Signature;
use crate::types::registry::{drop_value, Conversion};
use crate::types::{DropFn, TypeInfo, TypeRegistry};
use std::alloc::{self, Layout};
use std::any::{type_name, TypeId};
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::Arc;

const MIN_CAPACITY: usize = 64;

/// Round `offset` up to a multiple of `align` (a power of two)
#[inline]
pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

/// Zero-initialized, growable byte buffer with a runtime alignment
struct RawBuffer {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    align: usize,
}

impl RawBuffer {
    const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: 0,
            align: 1,
        }
    }

    fn layout(capacity: usize, align: usize) -> Layout {
        Layout::from_size_align(capacity, align)
            .unwrap_or_else(|_| panic!("dynamic tuple capacity overflow ({capacity} bytes)"))
    }

    /// Grow to `end` bytes, zero-filling the new range
    fn extend_to(&mut self, end: usize, align: usize) {
        if self.capacity == 0 || end > self.capacity || align > self.align {
            let new_align = align.max(self.align);
            let new_capacity = end.max(self.capacity * 2).max(MIN_CAPACITY);
            let layout = Self::layout(new_capacity, new_align);
            // SAFETY: layout has non-zero size
            let raw = unsafe { alloc::alloc_zeroed(layout) };
            let Some(new_ptr) = NonNull::new(raw) else {
                alloc::handle_alloc_error(layout);
            };
            if self.capacity > 0 {
                // SAFETY: both regions are at least `len` bytes and distinct allocations.
                // Rust values are relocatable, so moving live slots bytewise is sound.
                unsafe {
                    ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
                    alloc::dealloc(self.ptr.as_ptr(), Self::layout(self.capacity, self.align));
                }
            }
            self.ptr = new_ptr;
            self.capacity = new_capacity;
            self.align = new_align;
        }
        if end > self.len {
            // SAFETY: end <= capacity
            unsafe { self.ptr.as_ptr().add(self.len).write_bytes(0, end - self.len) };
            self.len = end;
        }
    }

    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if self.capacity > 0 {
            // SAFETY: allocated in extend_to with this layout
            unsafe { alloc::dealloc(self.ptr.as_ptr(), Self::layout(self.capacity, self.align)) };
        }
    }
}

enum SlotDrop {
    Trivial,
    Native(DropFn),
    Registered(Arc<TypeInfo>),
}

struct Slot {
    offset: usize,
    size: usize,
    storage: Option<TypeId>,
    drop: SlotDrop,
}

impl Slot {
    /// Run the slot's destructor
    ///
    /// # Safety
    ///
    /// `base + offset` must hold the live value recorded by this slot.
    unsafe fn destroy(&self, base: *mut u8) {
        let value = unsafe { base.add(self.offset) };
        match &self.drop {
            SlotDrop::Trivial => {}
            SlotDrop::Native(drop_fn) => unsafe { drop_fn(value) },
            SlotDrop::Registered(info) => unsafe { info.destroy(value) },
        }
    }
}

/// Packed, type-erased argument buffer
///
/// Move-only; values are dropped exactly once, on [`DynamicTuple::clear`] or
/// when the tuple is dropped.
pub struct DynamicTuple {
    buffer: RawBuffer,
    slots: Vec<Slot>,
    signature: Signature,
    types: TypeRegistry,
}

impl DynamicTuple {
    /// Create an empty tuple with no registered types
    pub fn new() -> Self {
        Self::with_types(TypeRegistry::new())
    }

    /// Create an empty tuple that links descriptors through `types`
    pub fn with_types(types: TypeRegistry) -> Self {
        Self {
            buffer: RawBuffer::new(),
            slots: Vec::new(),
            signature: Signature::dynamic(),
            types,
        }
    }

    /// Pack an argument tuple
    pub fn pack<A: EventArgs>(args: &A, types: &TypeRegistry) -> Self {
        let mut tuple = Self::with_types(types.clone());
        args.pack_into(&mut tuple);
        tuple
    }

    /// Append a typed value
    pub fn push<T: EventParam>(&mut self, value: &T) {
        let descriptor = T::descriptor(&self.types);
        self.push_storage(value.to_storage(), descriptor);
    }

    /// Append a raw slot value with an explicit descriptor
    pub fn push_storage<S: 'static>(&mut self, value: S, descriptor: ParamDescriptor) {
        let offset = self.reserve_slot(std::mem::size_of::<S>(), std::mem::align_of::<S>());
        // SAFETY: reserve_slot made `offset..offset + size_of::<S>()` available and aligned
        unsafe { ptr::write(self.buffer.as_mut_ptr().add(offset) as *mut S, value) };
        self.slots.push(Slot {
            offset,
            size: std::mem::size_of::<S>(),
            storage: Some(TypeId::of::<S>()),
            drop: if std::mem::needs_drop::<S>() {
                SlotDrop::Native(drop_value::<S>)
            } else {
                SlotDrop::Trivial
            },
        });
        self.signature.push(descriptor);
    }

    /// Append a copy of a value described by a registry entry
    ///
    /// The slot is default-constructed with the entry's init operation, then
    /// assigned from `src` with its copy operation.
    ///
    /// # Safety
    ///
    /// `src` must point to a live value of the type `info` describes.
    pub unsafe fn push_reflected(&mut self, info: &Arc<TypeInfo>, src: *const u8) {
        let offset = self.reserve_slot(info.size(), info.align());
        // SAFETY: the slot is reserved and aligned for `info`
        unsafe {
            let dst = self.buffer.as_mut_ptr().add(offset);
            info.init(dst);
            info.copy(dst, src);
        }
        self.slots.push(Slot {
            offset,
            size: info.size(),
            storage: info.storage_id(),
            drop: if info.has_drop() {
                SlotDrop::Registered(info.clone())
            } else {
                SlotDrop::Trivial
            },
        });
        self.signature.push(ParamDescriptor::from_type_info(info));
    }

    fn reserve_slot(&mut self, size: usize, align: usize) -> usize {
        let offset = align_up(self.buffer.len, align);
        self.buffer.extend_to(offset + size, align);
        offset
    }

    /// Borrow slot `index` as `S`
    ///
    /// Returns `None` if the index is out of range or the slot holds another type.
    pub fn get<S: 'static>(&self, index: usize) -> Option<&S> {
        let slot = self.slot_of::<S>(index)?;
        // SAFETY: the slot holds a live, aligned `S`
        Some(unsafe { &*(self.buffer.as_ptr().add(slot.offset) as *const S) })
    }

    /// Mutably borrow slot `index` as `S`
    pub fn get_mut<S: 'static>(&mut self, index: usize) -> Option<&mut S> {
        let offset = self.slot_of::<S>(index)?.offset;
        // SAFETY: the slot holds a live, aligned `S`
        Some(unsafe { &mut *(self.buffer.as_mut_ptr().add(offset) as *mut S) })
    }

    /// Borrow slot `index` as `S`, reporting why it is not available
    pub fn try_get<S: 'static>(&self, index: usize) -> EventResult<&S> {
        if index >= self.slots.len() {
            return Err(EventError::IndexOutOfBounds {
                index,
                len: self.slots.len(),
            });
        }
        self.get::<S>(index).ok_or_else(|| EventError::TypeMismatch {
            index,
            expected: type_name::<S>().to_string(),
            actual: self
                .signature
                .param(index)
                .map_or_else(String::new, |p| p.type_name().to_string()),
        })
    }

    /// Read slot `index` as the event parameter `T`
    pub fn value<T: EventParam>(&self, index: usize) -> Option<T> {
        self.read_with::<T::Storage, _>(index, T::from_storage)
    }

    /// Pass slot `index` to `f` as `S`
    ///
    /// A slot holding a derived aggregate is converted to its ancestor `S`.
    pub fn read_with<S: 'static, R>(&self, index: usize, f: impl FnOnce(&S) -> R) -> Option<R> {
        if let Some(value) = self.get::<S>(index) {
            return Some(f(value));
        }
        let converted = self.converted::<S>(index)?;
        Some(f(&converted))
    }

    /// Let `f` update slot `index` as `S`
    ///
    /// A slot holding a derived aggregate is converted to its ancestor `S`,
    /// and the updated ancestor is written back into it.
    pub fn update_with<S: 'static>(&mut self, index: usize, f: impl FnOnce(&mut S)) -> bool {
        if let Some(value) = self.get_mut::<S>(index) {
            f(value);
            return true;
        }
        let Some((offset, conversion)) = self.conversion_of::<S>(index) else {
            return false;
        };
        let Some(mut value) = self.converted::<S>(index) else {
            return false;
        };
        f(&mut value);
        // SAFETY: the slot holds the derived type `conversion` was registered for
        unsafe {
            conversion.write(
                self.buffer.as_mut_ptr().add(offset),
                &value as *const S as *const u8,
            )
        };
        true
    }

    fn conversion_of<S: 'static>(&self, index: usize) -> Option<(usize, Conversion)> {
        let slot = self.slots.get(index)?;
        let info = self.signature.param(index)?.linked_type()?;
        if slot.storage.is_none() || slot.storage != info.storage_id() {
            return None;
        }
        let conversion = info.conversion_to(TypeId::of::<S>())?.clone();
        Some((slot.offset, conversion))
    }

    fn converted<S: 'static>(&self, index: usize) -> Option<S> {
        let (offset, conversion) = self.conversion_of::<S>(index)?;
        let mut value = MaybeUninit::<S>::uninit();
        // SAFETY: the slot holds the derived type and the conversion writes an `S`
        unsafe {
            conversion.read(self.buffer.as_ptr().add(offset), value.as_mut_ptr() as *mut u8);
            Some(value.assume_init())
        }
    }

    fn slot_of<S: 'static>(&self, index: usize) -> Option<&Slot> {
        self.slots
            .get(index)
            .filter(|slot| slot.storage == Some(TypeId::of::<S>()))
    }

    /// Byte offset of slot `index`
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|slot| slot.offset)
    }

    /// Byte size of slot `index`
    pub fn slot_size(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|slot| slot.size)
    }

    /// Start of the argument frame
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    /// Start of the argument frame, for foreign calls that write in/out values
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.buffer.as_mut_ptr()
    }

    /// Used length of the frame in bytes
    pub fn byte_len(&self) -> usize {
        self.buffer.len
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the tuple holds no values
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Signature built from the pushed values
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Type registry used to describe pushed values
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Drop every value and reset to empty, keeping the allocation
    pub fn clear(&mut self) {
        let slots = std::mem::take(&mut self.slots);
        self.buffer.len = 0;
        self.signature.clear();
        let base = self.buffer.as_mut_ptr();
        for slot in &slots {
            // SAFETY: each slot is destroyed once; the records are gone afterwards
            unsafe { slot.destroy(base) };
        }
    }
}

impl Default for DynamicTuple {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DynamicTuple {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for DynamicTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTuple")
            .field("signature", &self.signature.name())
            .field("len", &self.slots.len())
            .field("byte_len", &self.buffer.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Mut;
    use crate::types::ParamKind;
    use std::cell::Cell;
    use std::mem::offset_of;
    use std::rc::Rc;

    #[allow(dead_code)]
    #[repr(C)]
    struct Four {
        a: bool,
        b: bool,
        c: i32,
        d: f64,
    }

    #[allow(dead_code)]
    #[repr(C)]
    struct Seven {
        a: bool,
        b: bool,
        c: i32,
        d: f64,
        e: bool,
        f: bool,
        g: i32,
    }

    #[derive(Clone)]
    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    crate::event_param!(Tracked, Aggregate, "Tracked");

    fn offsets(tuple: &DynamicTuple) -> Vec<usize> {
        (0..tuple.len()).filter_map(|i| tuple.offset(i)).collect()
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(17, 2), 18);
    }

    #[test]
    fn test_offsets_four() {
        let tuple = DynamicTuple::pack(&(true, false, 3i32, 1.5f64), &TypeRegistry::new());
        assert_eq!(offsets(&tuple), vec![0, 1, 4, 8]);
        assert_eq!(
            offsets(&tuple),
            vec![
                offset_of!(Four, a),
                offset_of!(Four, b),
                offset_of!(Four, c),
                offset_of!(Four, d)
            ]
        );
        assert_eq!(tuple.byte_len(), 16);
    }

    #[test]
    fn test_offsets_seven() {
        let tuple = DynamicTuple::pack(
            &(true, false, 3i32, 1.5f64, true, true, 9i32),
            &TypeRegistry::new(),
        );
        assert_eq!(offsets(&tuple), vec![0, 1, 4, 8, 16, 17, 20]);
        assert_eq!(offset_of!(Seven, e), 16);
        assert_eq!(offset_of!(Seven, g), 20);
        assert_eq!(offset_of!(Seven, f), 17);
        assert_eq!(offset_of!(Seven, d), 8);
    }

    #[test]
    fn test_offsets_double_before_int() {
        let tuple = DynamicTuple::pack(&(true, false, 2.0f64, 4i32), &TypeRegistry::new());
        assert_eq!(offsets(&tuple), vec![0, 1, 8, 16]);
    }

    #[test]
    fn test_frame_alignment() {
        let mut tuple = DynamicTuple::new();
        tuple.push(&true);
        tuple.push(&1.25f64);
        assert_eq!(tuple.as_ptr() as usize % std::mem::align_of::<f64>(), 0);
        assert_eq!(tuple.get::<f64>(1), Some(&1.25));
    }

    #[test]
    fn test_round_trip() {
        let mut tuple = DynamicTuple::new();
        tuple.push(&true);
        tuple.push(&42u8);
        tuple.push(&-7i64);
        tuple.push(&String::from("hello"));
        tuple.push(&vec![1i32, 2, 3]);

        assert_eq!(tuple.len(), 5);
        assert_eq!(tuple.get::<bool>(0), Some(&true));
        assert_eq!(tuple.get::<u8>(1), Some(&42));
        assert_eq!(tuple.get::<i64>(2), Some(&-7));
        assert_eq!(tuple.get::<String>(3).map(String::as_str), Some("hello"));
        assert_eq!(tuple.value::<Vec<i32>>(4), Some(vec![1, 2, 3]));
        assert_eq!(tuple.signature().name(), "bool, u8, i64, String, Vec<i32>");
    }

    #[test]
    fn test_get_checks_type_and_bounds() {
        let mut tuple = DynamicTuple::new();
        tuple.push(&5i32);

        assert!(tuple.get::<i64>(0).is_none());
        assert!(tuple.get::<i32>(1).is_none());
        assert!(matches!(
            tuple.try_get::<i32>(1),
            Err(EventError::IndexOutOfBounds { index: 1, len: 1 })
        ));
        assert!(matches!(
            tuple.try_get::<String>(0),
            Err(EventError::TypeMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_mut_shares_storage_with_value() {
        let mut tuple = DynamicTuple::new();
        tuple.push(&Mut::new(String::from("in")));
        assert!(tuple.signature().param(0).unwrap().is_reference());

        *tuple.get_mut::<String>(0).unwrap() = "out".to_string();
        assert_eq!(tuple.value::<String>(0).as_deref(), Some("out"));
    }

    #[test]
    fn test_clear_drops_each_value_once() {
        let drops = Rc::new(Cell::new(0));
        let value = Tracked(drops.clone());

        let mut tuple = DynamicTuple::new();
        tuple.push(&value);
        tuple.push(&1.0f32);
        tuple.push(&value);
        assert_eq!(drops.get(), 0);

        tuple.clear();
        assert_eq!(drops.get(), 2);
        assert!(tuple.is_empty());
        assert_eq!(tuple.byte_len(), 0);
        assert_eq!(tuple.signature().name(), "");

        tuple.push(&value);
        drop(tuple);
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn test_growth_preserves_values() {
        let mut tuple = DynamicTuple::new();
        for i in 0..64 {
            tuple.push(&format!("value-{i}"));
        }
        tuple.push_storage(7u128, ParamDescriptor::new(ParamKind::Aggregate, "u128"));
        for i in 0..64 {
            assert_eq!(tuple.get::<String>(i), Some(&format!("value-{i}")));
        }
        assert_eq!(tuple.get::<u128>(64), Some(&7));
        assert_eq!(tuple.as_ptr() as usize % std::mem::align_of::<u128>(), 0);
    }

    #[test]
    fn test_push_reflected() {
        let info = Arc::new(TypeInfo::value::<String>("String", ParamKind::String));
        let source = String::from("copied");

        let mut tuple = DynamicTuple::new();
        tuple.push(&true);
        unsafe { tuple.push_reflected(&info, &source as *const String as *const u8) };

        assert_eq!(tuple.offset(1), Some(8));
        assert_eq!(tuple.get::<String>(1), Some(&source));
        assert_eq!(tuple.signature().name(), "bool, String");
    }

    #[test]
    fn test_push_reflected_script_type() {
        unsafe fn init(dst: *mut u8) {
            unsafe { (dst as *mut u32).write(0) }
        }
        unsafe fn copy(dst: *mut u8, src: *const u8) {
            unsafe { (dst as *mut u32).write((src as *const u32).read()) }
        }
        let info = Arc::new(unsafe {
            TypeInfo::from_raw("ScriptColor", ParamKind::Aggregate, 4, 4, init, copy, None).unwrap()
        });
        let color = 0xff00ffu32;

        let mut tuple = DynamicTuple::new();
        unsafe { tuple.push_reflected(&info, &color as *const u32 as *const u8) };

        assert!(tuple.get::<u32>(0).is_none());
        assert_eq!(tuple.slot_size(0), Some(4));
        let raw = unsafe { (tuple.as_ptr() as *const u32).read() };
        assert_eq!(raw, color);
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Shape {
        id: i32,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Circle {
        shape: Shape,
        radius: f64,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ring {
        circle: Circle,
        label: String,
    }

    impl AsRef<Shape> for Circle {
        fn as_ref(&self) -> &Shape {
            &self.shape
        }
    }

    impl AsMut<Shape> for Circle {
        fn as_mut(&mut self) -> &mut Shape {
            &mut self.shape
        }
    }

    impl AsRef<Circle> for Ring {
        fn as_ref(&self) -> &Circle {
            &self.circle
        }
    }

    impl AsMut<Circle> for Ring {
        fn as_mut(&mut self) -> &mut Circle {
            &mut self.circle
        }
    }

    fn shape_types() -> TypeRegistry {
        TypeRegistry::builder()
            .register_value::<Shape>("Shape", ParamKind::Aggregate)
            .register_derived_value::<Circle, Shape>("Circle")
            .register_derived_value::<Ring, Circle>("Ring")
            .build()
    }

    #[test]
    fn test_derived_aggregate_reads_as_ancestor() {
        let types = shape_types();
        let ring = Ring {
            circle: Circle {
                shape: Shape { id: 7 },
                radius: 2.5,
            },
            label: String::from("outer"),
        };
        let descriptor = ParamDescriptor::from_type_info(types.get(TypeId::of::<Ring>()).unwrap());

        let mut tuple = DynamicTuple::with_types(types.clone());
        tuple.push_storage(ring.clone(), descriptor);

        assert!(tuple.get::<Circle>(0).is_none());
        assert_eq!(tuple.read_with(0, |circle: &Circle| circle.clone()), Some(ring.circle.clone()));
        assert_eq!(tuple.read_with(0, |shape: &Shape| shape.id), Some(7));
        assert_eq!(tuple.read_with(0, |_: &String| ()), None);
        assert_eq!(tuple.get::<Ring>(0), Some(&ring));
    }

    #[test]
    fn test_derived_aggregate_update_writes_ancestor_part() {
        let types = shape_types();
        let descriptor = ParamDescriptor::from_type_info(types.get(TypeId::of::<Ring>()).unwrap());
        let mut tuple = DynamicTuple::with_types(types.clone());
        tuple.push_storage(
            Ring {
                label: String::from("kept"),
                ..Ring::default()
            },
            descriptor,
        );

        assert!(tuple.update_with(0, |shape: &mut Shape| shape.id = 42));
        assert!(tuple.update_with(0, |circle: &mut Circle| circle.radius = 1.5));
        assert!(!tuple.update_with(0, |_: &mut i32| {}));

        let ring = tuple.get::<Ring>(0).unwrap();
        assert_eq!(ring.circle.shape.id, 42);
        assert_eq!(ring.circle.radius, 1.5);
        assert_eq!(ring.label, "kept");
    }

    #[test]
    fn test_unregistered_aggregate_does_not_convert() {
        let descriptor = ParamDescriptor::new(ParamKind::Aggregate, "Circle");
        let mut tuple = DynamicTuple::new();
        tuple.push_storage(Circle::default(), descriptor);

        assert_eq!(tuple.read_with(0, |shape: &Shape| shape.id), None);
        assert_eq!(tuple.get::<Circle>(0).map(|circle| circle.radius), Some(0.0));
    }
}
