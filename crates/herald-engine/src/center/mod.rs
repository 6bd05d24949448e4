//! Event Center
//!
//! The [`EventCenter`] maps event names to [`Signal`]s. The first register or
//! bind for a name fixes that event's signature; every later listener and
//! broadcast for the name is checked against it.
//!
//! All operations take `&self`, so listeners may register, unregister and
//! broadcast other events while a broadcast is running.
//!
//! # Example
//!
//! ```ignore
//! use herald_engine::{EventCenter, EventCenterOptions, Mut, Observer};
//!
//! let center = EventCenter::new(EventCenterOptions::default());
//! center.register("Player.Damaged", Observer::closure(|args: &(i32, Mut<i32>)| {
//!     args.1.set(args.1.get() - args.0);
//! }));
//!
//! let args = (10, Mut::new(100));
//! center.broadcast("Player.Damaged", &args);
//! assert_eq!(args.1.get(), 90);
//! ```

mod hooks;
mod options;

pub use hooks::{HookHandle, ReceiveHook};
pub use options::EventCenterOptions;

use crate::cache::SignatureCache;
use crate::context::EventContext;
use crate::event::{EventDefinition, TypedEvent};
use crate::host::HostContext;
use crate::observer::{Observer, ObserverHandle};
use crate::signal::Signal;
use herald_sdk::{
    DynamicTuple, EventArgs, EventError, EventResult, Name, ObjectRef, Signature, TypeRegistry,
};
use hooks::ReceiveHooks;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Name-keyed registry of signals
#[derive(Debug)]
pub struct EventCenter {
    signals: RefCell<FxHashMap<Name, Rc<Signal>>>,
    cache: SignatureCache,
    hooks: ReceiveHooks,
    forward_to_hooks: bool,
}

impl Default for EventCenter {
    fn default() -> Self {
        Self::new(EventCenterOptions::default())
    }
}

impl EventCenter {
    /// Create an event center
    pub fn new(options: EventCenterOptions) -> Self {
        Self {
            signals: RefCell::new(FxHashMap::default()),
            cache: SignatureCache::new(options.types),
            hooks: ReceiveHooks::default(),
            forward_to_hooks: options.forward_to_hooks,
        }
    }

    /// Resolve the event center owned by a host context
    pub fn get_instance(host: &HostContext) -> &EventCenter {
        host.event_center()
    }

    /// Type registry used to describe parameters
    pub fn types(&self) -> &TypeRegistry {
        self.cache.types()
    }

    /// Signature cache for statically typed argument tuples
    pub fn signature_cache(&self) -> &SignatureCache {
        &self.cache
    }

    fn find_signal(&self, event: &str) -> Option<Rc<Signal>> {
        self.signals.borrow().get(event).cloned()
    }

    fn find_or_add_signal(&self, event: &str, signature: &Rc<Signature>) -> Rc<Signal> {
        if let Some(signal) = self.find_signal(event) {
            return signal;
        }
        tracing::debug!("Created signal ({}) for event {}", signature, event);
        let signal = Rc::new(Signal::new(signature.clone()));
        self.signals
            .borrow_mut()
            .insert(Name::new(event), signal.clone());
        signal
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a listener
    ///
    /// Returns the empty handle if the listener's signature does not accept
    /// the event's arguments, or if an equal listener is already registered.
    pub fn register(&self, event: &str, observer: Observer) -> ObserverHandle {
        match self.try_register(event, observer) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!("{}", err);
                ObserverHandle::EMPTY
            }
        }
    }

    /// Register a listener, reporting signature mismatches
    ///
    /// A duplicate registration is not an error; it yields the empty handle.
    pub fn try_register(&self, event: &str, observer: Observer) -> EventResult<ObserverHandle> {
        let signature = observer.signature(&self.cache);
        let signal = self.find_or_add_signal(event, &signature);
        if !signature.check_invokeable_from(signal.signature()) {
            return Err(EventError::ListenerMismatch {
                event: event.to_string(),
                expected: signal.signature().to_string(),
                actual: signature.to_string(),
            });
        }
        Ok(signal.connect(observer, &self.cache))
    }

    /// Register a reflected method of `target`, resolved by name
    pub fn register_reflected(&self, event: &str, target: &ObjectRef, method: &str) -> ObserverHandle {
        match Observer::reflected(target, method) {
            Ok(observer) => self.register(event, observer),
            Err(err) => {
                tracing::error!("Failed register listener for event ({}): {}", event, err);
                ObserverHandle::EMPTY
            }
        }
    }

    /// Remove the registered listener equal to `observer`
    ///
    /// Returns false if the event has no signal or no equal listener.
    pub fn unregister(&self, event: &str, observer: &Observer) -> bool {
        self.find_signal(event)
            .is_some_and(|signal| signal.disconnect(observer))
    }

    /// Remove the listener registered under `handle`
    ///
    /// An event without a signal has nothing to remove and reports success.
    pub fn unregister_handle(&self, event: &str, handle: ObserverHandle) -> bool {
        match self.find_signal(event) {
            Some(signal) => signal.disconnect_handle(handle),
            None => true,
        }
    }

    /// Remove a reflected listener registered with [`Self::register_reflected`]
    pub fn unregister_reflected(&self, event: &str, target: &ObjectRef, method: &str) -> bool {
        Observer::reflected(target, method)
            .is_ok_and(|observer| self.unregister(event, &observer))
    }

    // ========================================================================
    // Broadcast
    // ========================================================================

    /// Broadcast to every listener of `event`
    ///
    /// Returns false if the event has no signal, the arguments do not match
    /// its signature, or the event is already broadcasting.
    pub fn broadcast<A: EventArgs>(&self, event: &str, args: &A) -> bool {
        match self.try_broadcast(event, args) {
            Ok(()) => true,
            Err(EventError::UnknownEvent(_)) => false,
            Err(err) => {
                tracing::error!("{}", err);
                false
            }
        }
    }

    /// Broadcast to every listener of `event`, reporting why it failed
    pub fn try_broadcast<A: EventArgs>(&self, event: &str, args: &A) -> EventResult<()> {
        let signal = self
            .find_signal(event)
            .ok_or_else(|| EventError::UnknownEvent(event.to_string()))?;
        let signature = self.cache.of::<A>();
        self.check_broadcast(event, &signal, &signature)?;

        if !signal.raise(args, self.types()) {
            return Err(EventError::Locked(event.to_string()));
        }

        if self.should_forward() {
            let context = EventContext::from_tuple(DynamicTuple::pack(args, self.types()));
            self.hooks.notify(&Name::new(event), &context);
        }
        Ok(())
    }

    /// Broadcast a packed argument list to every listener of `event`
    ///
    /// Listeners write in/out values back into `context`.
    pub fn broadcast_dynamic(&self, event: &str, context: &mut EventContext) -> bool {
        match self.try_broadcast_dynamic(event, context) {
            Ok(()) => true,
            Err(EventError::UnknownEvent(_)) => false,
            Err(err) => {
                tracing::error!("{}", err);
                false
            }
        }
    }

    /// Broadcast a packed argument list, reporting why it failed
    pub fn try_broadcast_dynamic(&self, event: &str, context: &mut EventContext) -> EventResult<()> {
        let signal = self
            .find_signal(event)
            .ok_or_else(|| EventError::UnknownEvent(event.to_string()))?;
        self.check_broadcast(event, &signal, context.signature())?;

        if !signal.execute_raise(context.tuple_mut()) {
            return Err(EventError::Locked(event.to_string()));
        }

        if self.should_forward() {
            self.hooks.notify(&Name::new(event), context);
        }
        Ok(())
    }

    fn check_broadcast(&self, event: &str, signal: &Signal, source: &Signature) -> EventResult<()> {
        if signal.signature().check_invokeable_from(source) {
            Ok(())
        } else {
            Err(EventError::mismatch(
                event,
                signal.signature().name(),
                source.name(),
            ))
        }
    }

    fn should_forward(&self) -> bool {
        self.forward_to_hooks && !self.hooks.is_empty()
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    /// Declare the signature of `event` before any listener registers
    ///
    /// Returns false if the event already has a signal.
    pub fn bind_signature<A: EventArgs>(&self, event: &str) -> bool {
        self.bind_signal(event, self.cache.of::<A>())
    }

    /// Declare a runtime-built signature for `event`
    pub fn bind_dynamic_signature(&self, event: &str, signature: Signature) -> bool {
        if !signature.is_valid() {
            tracing::error!("Cannot bind invalid signature to event {}", event);
            return false;
        }
        self.bind_signal(event, Rc::new(signature))
    }

    fn bind_signal(&self, event: &str, signature: Rc<Signature>) -> bool {
        let mut signals = self.signals.borrow_mut();
        if signals.contains_key(event) {
            return false;
        }
        tracing::debug!("Bound signature ({}) to event {}", signature, event);
        signals.insert(Name::new(event), Rc::new(Signal::new(signature)));
        true
    }

    /// Remove the signal of `event` if it has no listeners
    ///
    /// Returns true if the event is now unbound.
    pub fn unbind_signature(&self, event: &str) -> bool {
        let removed = {
            let mut signals = self.signals.borrow_mut();
            let is_empty = match signals.get(event) {
                Some(signal) => signal.is_empty(),
                None => return true,
            };
            if !is_empty {
                return false;
            }
            signals.remove(event)
        };
        tracing::debug!("Unbound signature of event {}", event);
        drop(removed);
        true
    }

    /// Signature bound to `event`
    pub fn find_signature(&self, event: &str) -> Option<Rc<Signature>> {
        self.find_signal(event)
            .map(|signal| signal.signature().clone())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Remove every listener of `event` and its signal
    pub fn clear_event_observers(&self, event: &str) {
        let removed = self.signals.borrow_mut().remove(event);
        if let Some(signal) = removed {
            signal.disconnect_all();
        }
    }

    /// Check if `event` has a signal
    pub fn has_event(&self, event: &str) -> bool {
        self.signals.borrow().contains_key(event)
    }

    /// Number of listeners of `event`, including those pending removal
    pub fn num_observers(&self, event: &str) -> usize {
        self.find_signal(event).map_or(0, |signal| signal.len())
    }

    /// Number of events with a signal
    pub fn num_events(&self) -> usize {
        self.signals.borrow().len()
    }

    /// Release every listener, signal and receive hook
    ///
    /// Signals that are broadcasting stay alive until their broadcast returns.
    pub fn shutdown(&self) {
        let signals = std::mem::take(&mut *self.signals.borrow_mut());
        tracing::debug!("Shutting down event center with {} events", signals.len());
        for signal in signals.values() {
            signal.disconnect_all();
        }
        drop(signals);
        self.hooks.clear();
    }

    // ========================================================================
    // Out-of-band channel
    // ========================================================================

    /// Install a hook receiving a packed copy of every successful broadcast
    pub fn on_receive_event<F>(&self, hook: F) -> HookHandle
    where
        F: Fn(&Name, &EventContext) + 'static,
    {
        self.hooks.add(Rc::new(hook))
    }

    /// Remove a receive hook
    pub fn remove_receive_hook(&self, handle: HookHandle) -> bool {
        self.hooks.remove(handle)
    }

    /// Whether broadcasts are forwarded to receive hooks
    pub fn forward_to_hooks(&self) -> bool {
        self.forward_to_hooks
    }

    // ========================================================================
    // Typed events
    // ========================================================================

    /// Typed view of a declared event
    pub fn event<E: EventDefinition>(&self) -> TypedEvent<'_, E> {
        TypedEvent::new(self)
    }
}

impl Drop for EventCenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
