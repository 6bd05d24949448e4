//! Observer lists and the dispatch protocol
//!
//! A [`Signal`] is unlocked at rest and locked while it broadcasts. While
//! locked, removals only flag observers as pending destroy; the flagged
//! observers are compacted away when the broadcast unlocks the signal.
//! Observers connected during a broadcast are first called by the next one.

use crate::cache::SignatureCache;
use crate::observer::{Observer, ObserverHandle};
use herald_sdk::{DynamicTuple, EventArgs, Signature, TypeRegistry};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Observers registered for one event, sharing one signature
#[derive(Debug)]
pub struct Signal {
    signature: Rc<Signature>,
    observers: RefCell<Vec<Rc<Observer>>>,
    locked: Cell<bool>,
}

/// Unlocks the signal when a broadcast ends, including by unwinding
struct LockGuard<'a> {
    signal: &'a Signal,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.signal.unlock();
    }
}

impl Signal {
    /// Create an empty signal
    pub fn new(signature: Rc<Signature>) -> Self {
        Self {
            signature,
            observers: RefCell::new(Vec::new()),
            locked: Cell::new(false),
        }
    }

    /// Signature every observer and broadcast must be compatible with
    pub fn signature(&self) -> &Rc<Signature> {
        &self.signature
    }

    /// Whether a broadcast is in progress
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Number of observers, including those pending destroy
    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Check if the signal has no observers
    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }

    fn lock(&self) -> Option<LockGuard<'_>> {
        debug_assert!(
            !self.locked.get(),
            "signal ({}) is already broadcasting",
            self.signature
        );
        if self.locked.get() {
            return None;
        }
        self.locked.set(true);
        Some(LockGuard { signal: self })
    }

    fn unlock(&self) {
        self.locked.set(false);
        let removed = {
            let mut observers = self.observers.borrow_mut();
            let (keep, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut *observers)
                .into_iter()
                .partition(|observer| !observer.is_pending_destroy());
            *observers = keep;
            removed
        };
        drop(removed);
    }

    fn observer_at(&self, index: usize) -> Option<Rc<Observer>> {
        self.observers.borrow().get(index).cloned()
    }

    /// Add an observer
    ///
    /// Returns the empty handle if the observer's signature cannot be invoked
    /// from this signal's, or if an equal live observer is already connected.
    pub fn connect(&self, observer: Observer, cache: &SignatureCache) -> ObserverHandle {
        let observer_signature = observer.signature(cache);
        if !observer_signature.check_invokeable_from(&self.signature) {
            tracing::warn!(
                "Failed connect signal({}) with observer({})",
                self.signature,
                observer_signature
            );
            return ObserverHandle::EMPTY;
        }

        let duplicate = self
            .observers
            .borrow()
            .iter()
            .any(|existing| !existing.is_pending_destroy() && existing.equal_to(&observer));
        if duplicate {
            return ObserverHandle::EMPTY;
        }

        let handle = observer.handle();
        self.observers.borrow_mut().push(Rc::new(observer));
        handle
    }

    /// Remove the first live observer equal to `observer`
    pub fn disconnect(&self, observer: &Observer) -> bool {
        self.disconnect_where(|existing| existing.equal_to(observer))
    }

    /// Remove the live observer registered under `handle`
    pub fn disconnect_handle(&self, handle: ObserverHandle) -> bool {
        handle.is_valid() && self.disconnect_where(|existing| existing.handle() == handle)
    }

    fn disconnect_where(&self, matches: impl Fn(&Observer) -> bool) -> bool {
        let locked = self.locked.get();
        let mut removed = Vec::new();
        let mut found = false;
        {
            let mut observers = self.observers.borrow_mut();
            let mut index = 0;
            while index < observers.len() {
                let observer = &observers[index];
                if observer.is_pending_destroy() {
                    if !locked {
                        removed.push(observers.remove(index));
                        continue;
                    }
                } else if matches(observer) {
                    if locked {
                        observer.mark_pending_destroy();
                    } else {
                        removed.push(observers.remove(index));
                    }
                    found = true;
                    break;
                }
                index += 1;
            }
        }
        drop(removed);
        found
    }

    /// Remove every observer
    pub fn disconnect_all(&self) {
        if self.locked.get() {
            for observer in self.observers.borrow().iter() {
                observer.mark_pending_destroy();
            }
        } else {
            let removed = std::mem::take(&mut *self.observers.borrow_mut());
            drop(removed);
        }
    }

    /// Call every live observer with a typed argument tuple
    ///
    /// Observers taking exactly `A` are called directly. The others share one
    /// packed frame, rebuilt when a direct call may have changed an in/out
    /// argument; after each packed call, in/out values are copied back into
    /// `args`. Returns false if the signal is already broadcasting.
    pub fn raise<A: EventArgs>(&self, args: &A, types: &TypeRegistry) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(_guard) = self.lock() else {
            return false;
        };

        let mut frame: Option<DynamicTuple> = None;
        let mut maybe_changed = false;
        let count = self.len();
        for index in 0..count {
            let Some(observer) = self.observer_at(index) else {
                break;
            };
            if observer.is_pending_destroy() {
                continue;
            }
            if observer.invoke(args) {
                maybe_changed = A::HAS_MUT;
                continue;
            }

            if frame.is_none() || maybe_changed {
                frame = Some(DynamicTuple::pack(args, types));
                maybe_changed = false;
            }
            if let Some(frame) = frame.as_mut() {
                observer.execute_invoke(frame);
                if A::HAS_MUT {
                    args.load_back(frame);
                }
            }
        }
        true
    }

    /// Call every live observer with a packed argument frame
    ///
    /// Returns false if the signal is already broadcasting.
    pub fn execute_raise(&self, frame: &mut DynamicTuple) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(_guard) = self.lock() else {
            return false;
        };

        let count = self.len();
        for index in 0..count {
            let Some(observer) = self.observer_at(index) else {
                break;
            };
            if !observer.is_pending_destroy() {
                observer.execute_invoke(frame);
            }
        }
        true
    }
}
