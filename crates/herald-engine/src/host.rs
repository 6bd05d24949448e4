//! Host lifecycle
//!
//! Each [`HostContext`] owns one [`EventCenter`]. The context initializes the
//! center when it is created and shuts it down when the host tears down or
//! the context is dropped.

use crate::center::{EventCenter, EventCenterOptions};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a HostContext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostContextId(u64);

impl HostContextId {
    /// Create a new unique context ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        HostContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for HostContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedding context that owns an event center
#[derive(Debug)]
pub struct HostContext {
    id: HostContextId,
    center: EventCenter,
    initialized: Cell<bool>,
}

impl HostContext {
    /// Create and initialize a host context
    pub fn new(options: EventCenterOptions) -> Rc<Self> {
        let context = Rc::new(Self {
            id: HostContextId::new(),
            center: EventCenter::new(options),
            initialized: Cell::new(false),
        });
        context.initialize();
        context
    }

    /// Get the context ID
    pub fn id(&self) -> HostContextId {
        self.id
    }

    /// Mark the context as running
    pub fn initialize(&self) {
        if !self.initialized.replace(true) {
            tracing::debug!("Initialized host context {}", self.id.as_u64());
        }
    }

    /// Whether the context is running
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Shut the event center down
    ///
    /// Only the first call after [`Self::initialize`] has an effect.
    pub fn shutdown(&self) {
        if self.initialized.replace(false) {
            tracing::debug!("Shutting down host context {}", self.id.as_u64());
            self.center.shutdown();
        }
    }

    /// Get the event center
    pub fn event_center(&self) -> &EventCenter {
        &self.center
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Registry of live host contexts
///
/// Holds contexts weakly; a dropped context is no longer returned.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: RefCell<FxHashMap<HostContextId, Weak<HostContext>>>,
}

impl ContextRegistry {
    /// Create a new context registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a context
    pub fn register(&self, context: &Rc<HostContext>) {
        self.contexts
            .borrow_mut()
            .insert(context.id(), Rc::downgrade(context));
    }

    /// Get a context by ID
    pub fn get(&self, id: HostContextId) -> Option<Rc<HostContext>> {
        self.contexts.borrow().get(&id).and_then(Weak::upgrade)
    }

    /// Remove a context
    pub fn remove(&self, id: HostContextId) -> Option<Rc<HostContext>> {
        self.contexts
            .borrow_mut()
            .remove(&id)
            .and_then(|context| context.upgrade())
    }

    /// Get the number of live contexts
    pub fn len(&self) -> usize {
        self.contexts
            .borrow()
            .values()
            .filter(|context| context.strong_count() > 0)
            .count()
    }

    /// Check if no live context is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the IDs of all live contexts
    pub fn all_ids(&self) -> Vec<HostContextId> {
        self.contexts
            .borrow()
            .iter()
            .filter(|(_, context)| context.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Observer;

    #[test]
    fn test_context_id_uniqueness() {
        let id1 = HostContextId::new();
        let id2 = HostContextId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_context_is_initialized() {
        let context = HostContext::new(EventCenterOptions::default());
        assert!(context.is_initialized());
        assert_eq!(EventCenter::get_instance(&context).num_events(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let context = HostContext::new(EventCenterOptions::default());
        let center = EventCenter::get_instance(&context);
        center.register("Tick", Observer::closure(|_: &()| {}));

        context.shutdown();
        assert!(!context.is_initialized());
        assert!(!center.has_event("Tick"));
        context.shutdown();

        context.initialize();
        assert!(center.register("Tick", Observer::closure(|_: &()| {})).is_valid());
    }

    #[test]
    fn test_registry_tracks_live_contexts() {
        let registry = ContextRegistry::new();
        let first = HostContext::new(EventCenterOptions::default());
        let second = HostContext::new(EventCenterOptions::default());
        registry.register(&first);
        registry.register(&second);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(first.id()).is_some());

        let second_id = second.id();
        drop(second);
        assert!(registry.get(second_id).is_none());
        assert_eq!(registry.all_ids(), vec![first.id()]);

        assert!(registry.remove(first.id()).is_some());
        assert!(registry.is_empty());
    }
}
