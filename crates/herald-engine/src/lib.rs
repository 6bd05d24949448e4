//! Herald Engine
//!
//! Named multicast events with heterogeneous listeners:
//! - **Observer**: one listener, wrapping a function, a method, a closure or
//!   a reflected method (`observer` module)
//! - **Signal**: the listeners of one event and the broadcast protocol,
//!   including removal while broadcasting (`signal` module)
//! - **EventCenter**: name-keyed signals, signature binding and the
//!   out-of-band receive hooks (`center` module)
//! - **Typed events**: compile-time checked event declarations (`event` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_engine::{EventCenterOptions, HostContext, Mut, Observer};
//!
//! let host = HostContext::new(EventCenterOptions::default());
//! let center = host.event_center();
//!
//! center.register("Door.Opened", Observer::closure(|(door, opened): &(i32, Mut<bool>)| {
//!     opened.set(*door != 0);
//! }));
//!
//! let args = (3, Mut::new(false));
//! assert!(center.broadcast("Door.Opened", &args));
//! assert!(args.1.get());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Per-shape signature cache
pub mod cache;

/// Event center: name-keyed signals and receive hooks
pub mod center;

/// Out-of-band argument snapshots
pub mod context;

/// Declared, statically typed events
pub mod event;

/// Host lifecycle
pub mod host;

/// Listeners
pub mod observer;

/// Listener lists and dispatch
pub mod signal;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::SignatureCache;
pub use center::{EventCenter, EventCenterOptions, HookHandle, ReceiveHook};
pub use context::EventContext;
pub use event::{domain_event_name, EventDefinition, TypedEvent};
pub use host::{ContextRegistry, HostContext, HostContextId};
pub use observer::{Observer, ObserverHandle, ObserverKind};
pub use signal::Signal;

pub use herald_sdk::event_param;
pub use herald_sdk::{
    Class, DynamicTuple, EventArgs, EventError, EventParam, EventResult, InvokeType, MethodHandle,
    Mut, Name, Obj, Object, ObjectRef, ParamDescriptor, ParamFlags, ParamKind, ReflectedFunction,
    Signature, Text, TypeInfo, TypeRegistry, WeakObjectRef,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
