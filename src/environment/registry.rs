//! Observer registry with stable handles.
//!
//! Replaces the ad-hoc add/remove-by-identity observer list: every
//! registration gets a unique handle, removal is by handle, and dispatch
//! iterates over a snapshot so adding or removing entries from inside a
//! callback is well-defined (the change applies from the next dispatch).

/// Stable identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u64);

/// Ordered registry of callbacks.
pub struct CallbackRegistry<T> {
    next_handle: u64,
    entries: Vec<(CallbackHandle, T)>,
}

impl<T: Clone> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            entries: Vec::new(),
        }
    }

    /// Register a callback; the handle stays valid until removed.
    pub fn add(&mut self, callback: T) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, callback));
        handle
    }

    /// Remove a registration. Returns whether the handle was present.
    pub fn remove(&mut self, handle: CallbackHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(h, _)| *h != handle);
        self.entries.len() != before
    }

    /// Snapshot of the current callbacks in registration order.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().map(|(_, cb)| cb.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
