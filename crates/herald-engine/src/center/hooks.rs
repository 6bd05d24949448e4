//! Receive hooks for out-of-band consumers

use crate::context::EventContext;
use herald_sdk::Name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback receiving every successful broadcast
pub type ReceiveHook = Rc<dyn Fn(&Name, &EventContext)>;

/// Identifier of an installed receive hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Multicast list of receive hooks
///
/// Hooks may be added or removed while a notification is running; the
/// change applies from the next notification.
#[derive(Default)]
pub(crate) struct ReceiveHooks {
    hooks: RefCell<Vec<(HookHandle, ReceiveHook)>>,
    next_id: Cell<u64>,
}

impl ReceiveHooks {
    pub(crate) fn add(&self, hook: ReceiveHook) -> HookHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = HookHandle(id);
        self.hooks.borrow_mut().push((handle, hook));
        handle
    }

    pub(crate) fn remove(&self, handle: HookHandle) -> bool {
        let removed = {
            let mut hooks = self.hooks.borrow_mut();
            hooks
                .iter()
                .position(|(existing, _)| *existing == handle)
                .map(|index| hooks.remove(index))
        };
        removed.is_some()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.borrow().is_empty()
    }

    pub(crate) fn clear(&self) {
        let removed = std::mem::take(&mut *self.hooks.borrow_mut());
        drop(removed);
    }

    pub(crate) fn notify(&self, event: &Name, context: &EventContext) {
        let snapshot: Vec<ReceiveHook> = self
            .hooks
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();
        for hook in snapshot {
            hook(event, context);
        }
    }
}

impl fmt::Debug for ReceiveHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveHooks")
            .field("len", &self.hooks.borrow().len())
            .finish()
    }
}
