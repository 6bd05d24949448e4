//! Event listeners
//!
//! An [`Observer`] wraps one callable shape:
//!
//! | Kind           | Target                          | Identity                |
//! |----------------|---------------------------------|-------------------------|
//! | `Function`     | `fn(&A)`                        | function address        |
//! | `RawMethod`    | `*const C` + `fn(&C, &A)`       | target + method address |
//! | `SharedMethod` | `Weak<C>` + `fn(&C, &A)`        | target + method address |
//! | `ObjectMethod` | `Weak<C: Object>` + `fn(&C, &A)`| target + method address |
//! | `Closure`      | `Fn(&A)`                        | none                    |
//! | `Reflected`    | weak object + method handle     | target + method name    |
//!
//! Generic kinds are called directly when the broadcast argument tuple has
//! exactly their Rust type, and through a packed [`DynamicTuple`] otherwise.
//! Reflected observers are always called through the packed frame.

use crate::cache::SignatureCache;
use herald_sdk::{
    DynamicTuple, EventArgs, EventError, EventResult, InvokeType, MethodHandle, Object, ObjectRef,
    Signature, WeakObjectRef,
};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a connected observer
///
/// Unique per process; [`ObserverHandle::EMPTY`] denotes a failed registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObserverHandle(u64);

impl ObserverHandle {
    /// The empty handle
    pub const EMPTY: ObserverHandle = ObserverHandle(0);

    fn generate() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ObserverHandle(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this handle refers to a registration
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Reset to the empty handle
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Callable shape of an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverKind {
    /// Free function
    Function,
    /// Method on an object the caller keeps alive
    RawMethod,
    /// Method on a weakly held `Rc` value
    SharedMethod,
    /// Method on a weakly held managed object
    ObjectMethod,
    /// Closure
    Closure,
    /// Method resolved and called by name
    Reflected,
}

impl ObserverKind {
    /// Whether the observer takes a typed argument tuple
    pub fn is_generic(self) -> bool {
        !matches!(self, ObserverKind::Reflected)
    }
}

/// Type-erased typed call
trait Invoker {
    fn signature(&self, cache: &SignatureCache) -> Rc<Signature>;

    /// Direct call; false if `args` is not this invoker's argument type
    fn invoke(&self, args: &dyn Any) -> bool;

    fn execute_invoke(&self, frame: &mut DynamicTuple);
}

struct TypedInvoker<A, F> {
    call: F,
    _args: PhantomData<fn(&A)>,
}

impl<A, F> TypedInvoker<A, F>
where
    A: EventArgs,
    F: Fn(&A) + 'static,
{
    fn boxed(call: F) -> Box<dyn Invoker> {
        Box::new(Self {
            call,
            _args: PhantomData,
        })
    }
}

impl<A, F> Invoker for TypedInvoker<A, F>
where
    A: EventArgs,
    F: Fn(&A) + 'static,
{
    fn signature(&self, cache: &SignatureCache) -> Rc<Signature> {
        cache.of::<A>()
    }

    fn invoke(&self, args: &dyn Any) -> bool {
        match args.downcast_ref::<A>() {
            Some(args) => {
                (self.call)(args);
                true
            }
            None => false,
        }
    }

    fn execute_invoke(&self, frame: &mut DynamicTuple) {
        match A::unpack(frame) {
            Some(args) => {
                (self.call)(&args);
                if A::HAS_MUT {
                    args.store_back(frame);
                }
            }
            None => tracing::warn!(
                "Argument frame ({}) does not match listener arguments {}",
                frame.signature(),
                std::any::type_name::<A>()
            ),
        }
    }
}

enum Callable {
    Function {
        function: usize,
        invoker: Box<dyn Invoker>,
    },
    RawMethod {
        target: usize,
        method: usize,
        invoker: Box<dyn Invoker>,
    },
    SharedMethod {
        target: usize,
        method: usize,
        invoker: Box<dyn Invoker>,
    },
    ObjectMethod {
        target: usize,
        method: usize,
        invoker: Box<dyn Invoker>,
    },
    Closure {
        invoker: Box<dyn Invoker>,
    },
    Reflected {
        target: WeakObjectRef,
        method: MethodHandle,
        signature: Rc<Signature>,
    },
}

/// One registered listener
pub struct Observer {
    handle: ObserverHandle,
    pending_destroy: Cell<bool>,
    callable: Callable,
}

impl Observer {
    fn from_callable(callable: Callable) -> Self {
        Self {
            handle: ObserverHandle::generate(),
            pending_destroy: Cell::new(false),
            callable,
        }
    }

    /// Listener calling a free function
    ///
    /// Identity is the function's address. Release builds may fold functions
    /// with identical machine code into one address, so two distinct
    /// listeners with the same argument tuple and the same body (typically
    /// empty ones) can compare equal: the second registration is then
    /// rejected as a duplicate and unregistering either removes the other.
    /// Give such listeners distinct bodies, or use [`Observer::closure`] and
    /// remove them by handle.
    pub fn function<A: EventArgs>(function: fn(&A)) -> Self {
        Self::from_callable(Callable::Function {
            function: function as usize,
            invoker: TypedInvoker::<A, _>::boxed(function),
        })
    }

    /// Listener calling a method on an object whose lifetime the caller manages
    ///
    /// Identity is the target address plus the method address, with the same
    /// folding caveat as [`Observer::function`].
    ///
    /// # Safety
    ///
    /// `target` must stay valid until the observer is unregistered and every
    /// broadcast that may reach it has returned.
    pub unsafe fn raw_method<C: 'static, A: EventArgs>(
        target: *const C,
        method: fn(&C, &A),
    ) -> Self {
        Self::from_callable(Callable::RawMethod {
            target: target as usize,
            method: method as usize,
            // SAFETY: upheld by the caller
            invoker: TypedInvoker::<A, _>::boxed(move |args: &A| {
                method(unsafe { &*target }, args)
            }),
        })
    }

    /// Listener calling a method on a weakly held `Rc` value
    ///
    /// Identity as for [`Observer::raw_method`].
    pub fn shared_method<C: 'static, A: EventArgs>(target: &Rc<C>, method: fn(&C, &A)) -> Self {
        let weak = Rc::downgrade(target);
        Self::from_callable(Callable::SharedMethod {
            target: Rc::as_ptr(target) as usize,
            method: method as usize,
            invoker: TypedInvoker::<A, _>::boxed(move |args: &A| {
                if let Some(target) = weak.upgrade() {
                    method(&target, args);
                }
            }),
        })
    }

    /// Listener calling a method on a weakly held managed object
    ///
    /// Identity as for [`Observer::raw_method`].
    pub fn object_method<C: Object, A: EventArgs>(target: &Rc<C>, method: fn(&C, &A)) -> Self {
        let weak = Rc::downgrade(target);
        Self::from_callable(Callable::ObjectMethod {
            target: Rc::as_ptr(target) as usize,
            method: method as usize,
            invoker: TypedInvoker::<A, _>::boxed(move |args: &A| {
                if let Some(target) = weak.upgrade() {
                    method(&target, args);
                }
            }),
        })
    }

    /// Listener calling a closure
    ///
    /// Closures have no identity; remove them by handle.
    pub fn closure<A: EventArgs, F: Fn(&A) + 'static>(closure: F) -> Self {
        Self::from_callable(Callable::Closure {
            invoker: TypedInvoker::<A, _>::boxed(closure),
        })
    }

    /// Listener calling a reflected method resolved by name
    pub fn reflected(target: &ObjectRef, method_name: &str) -> EventResult<Self> {
        let object = target.get().ok_or_else(|| EventError::MethodNotFound {
            object: "null".to_string(),
            method: method_name.to_string(),
        })?;
        let method = object
            .find_method(method_name)
            .ok_or_else(|| EventError::MethodNotFound {
                object: object.class_name().to_string(),
                method: method_name.to_string(),
            })?;
        let signature = Signature::reflected(&method);
        if !signature.is_valid() {
            return Err(EventError::InvalidSignature(method.name().to_string()));
        }
        Ok(Self::from_callable(Callable::Reflected {
            target: target.downgrade(),
            method,
            signature: Rc::new(signature),
        }))
    }

    /// Callable shape
    pub fn kind(&self) -> ObserverKind {
        match &self.callable {
            Callable::Function { .. } => ObserverKind::Function,
            Callable::RawMethod { .. } => ObserverKind::RawMethod,
            Callable::SharedMethod { .. } => ObserverKind::SharedMethod,
            Callable::ObjectMethod { .. } => ObserverKind::ObjectMethod,
            Callable::Closure { .. } => ObserverKind::Closure,
            Callable::Reflected { .. } => ObserverKind::Reflected,
        }
    }

    /// Static for typed callables, dynamic for reflected methods
    pub fn invoke_type(&self) -> InvokeType {
        match self.kind() {
            ObserverKind::Reflected => InvokeType::Dynamic,
            _ => InvokeType::Static,
        }
    }

    /// Registration handle
    pub fn handle(&self) -> ObserverHandle {
        self.handle
    }

    /// Whether the observer was removed during a broadcast
    pub fn is_pending_destroy(&self) -> bool {
        self.pending_destroy.get()
    }

    pub(crate) fn mark_pending_destroy(&self) {
        self.pending_destroy.set(true);
    }

    fn invoker(&self) -> Option<&dyn Invoker> {
        match &self.callable {
            Callable::Function { invoker, .. }
            | Callable::RawMethod { invoker, .. }
            | Callable::SharedMethod { invoker, .. }
            | Callable::ObjectMethod { invoker, .. }
            | Callable::Closure { invoker } => Some(invoker.as_ref()),
            Callable::Reflected { .. } => None,
        }
    }

    /// Parameter signature the observer expects
    pub fn signature(&self, cache: &SignatureCache) -> Rc<Signature> {
        match &self.callable {
            Callable::Reflected { signature, .. } => signature.clone(),
            _ => match self.invoker() {
                Some(invoker) => invoker.signature(cache),
                None => Rc::new(Signature::dynamic()),
            },
        }
    }

    /// Call with a typed argument tuple
    ///
    /// Returns false if the observer needs a packed frame for these arguments.
    pub fn invoke(&self, args: &dyn Any) -> bool {
        self.invoker().is_some_and(|invoker| invoker.invoke(args))
    }

    /// Call with a packed argument frame
    ///
    /// In/out arguments changed by the observer are written back into `frame`.
    pub fn execute_invoke(&self, frame: &mut DynamicTuple) {
        match &self.callable {
            Callable::Reflected { target, method, .. } => {
                if let Some(object) = target.upgrade().get() {
                    object.process_event(method, frame);
                }
            }
            _ => {
                if let Some(invoker) = self.invoker() {
                    invoker.execute_invoke(frame);
                }
            }
        }
    }

    /// Identity comparison within the same kind; closures never compare equal
    pub fn equal_to(&self, other: &Observer) -> bool {
        match (&self.callable, &other.callable) {
            (Callable::Function { function: a, .. }, Callable::Function { function: b, .. }) => a == b,
            (
                Callable::RawMethod { target: ta, method: ma, .. },
                Callable::RawMethod { target: tb, method: mb, .. },
            )
            | (
                Callable::SharedMethod { target: ta, method: ma, .. },
                Callable::SharedMethod { target: tb, method: mb, .. },
            )
            | (
                Callable::ObjectMethod { target: ta, method: ma, .. },
                Callable::ObjectMethod { target: tb, method: mb, .. },
            ) => ta == tb && ma == mb,
            (
                Callable::Reflected { target: ta, method: ma, .. },
                Callable::Reflected { target: tb, method: mb, .. },
            ) => ta.addr() == tb.addr() && ma.name() == mb.name(),
            _ => false,
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("kind", &self.kind())
            .field("handle", &self.handle)
            .field("pending_destroy", &self.is_pending_destroy())
            .finish()
    }
}
