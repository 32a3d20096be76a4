//! Session Handle Table
//!
//! Maps opaque non-zero `u32` handles to session values (streaming hash
//! state, compiled filters, parsed documents, matrices, filters). Handle `0`
//! is never issued, so hosts can use it as "no session".
//!
//! The table itself is a plain data structure; the ABI layer decides how it
//! is shared (a `parking_lot::Mutex` for `Send` sessions, a thread-local for
//! the rest).

use std::collections::HashMap;

/// Opaque session handle as seen by the host
pub type Handle = u32;

/// Table of live sessions of one kind
#[derive(Debug)]
pub struct HandleTable<T> {
    entries: HashMap<Handle, T>,
    next: Handle,
    kind: &'static str,
}

impl<T> HandleTable<T> {
    /// Create an empty table; `kind` names the session type in log messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            entries: HashMap::new(),
            next: 1,
            kind,
        }
    }

    /// Name of the session kind held by this table
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Store a session and return its handle
    pub fn insert(&mut self, value: T) -> Handle {
        // Skip 0 and anything still live after the counter wraps
        while self.next == 0 || self.entries.contains_key(&self.next) {
            self.next = self.next.wrapping_add(1);
        }
        let handle = self.next;
        self.next = self.next.wrapping_add(1);
        self.entries.insert(handle, value);
        tracing::debug!(kind = self.kind, handle, "session created");
        handle
    }

    /// Borrow a session
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.entries.get(&handle)
    }

    /// Borrow a session mutably
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.entries.get_mut(&handle)
    }

    /// Run `f` against a session
    pub fn with<F, R>(&self, handle: Handle, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.entries.get(&handle).map(f)
    }

    /// Run `f` against a session, mutably
    pub fn with_mut<F, R>(&mut self, handle: Handle, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.entries.get_mut(&handle).map(f)
    }

    /// Remove a session. A second removal of the same handle returns `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let removed = self.entries.remove(&handle);
        if removed.is_some() {
            tracing::debug!(kind = self.kind, handle, "session destroyed");
        } else {
            tracing::warn!(kind = self.kind, handle, "destroy of unknown session ignored");
        }
        removed
    }

    /// Check if a handle refers to a live session
    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no sessions are live
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_nonzero_and_distinct() {
        let mut table = HandleTable::new("test");
        let a = table.insert("a");
        let b = table.insert("b");
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.with(a, |v| *v), Some("a"));
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut table = HandleTable::new("test");
        let h = table.insert(42u32);
        assert_eq!(table.remove(h), Some(42));
        assert_eq!(table.remove(h), None);
        assert!(!table.contains(h));
        assert!(table.get(h).is_none());
    }

    #[test]
    fn test_zero_handle_never_resolves() {
        let mut table = HandleTable::new("test");
        table.insert(1u8);
        assert!(table.get(0).is_none());
        assert_eq!(table.with_mut(0, |v| *v += 1), None);
    }

    #[test]
    fn test_counter_wrap_skips_zero_and_live_handles() {
        let mut table = HandleTable::new("test");
        let first = table.insert('x');
        assert_eq!(first, 1);
        table.next = u32::MAX;
        assert_eq!(table.insert('y'), u32::MAX);
        // Wraps past 0 and past the still-live handle 1
        assert_eq!(table.insert('z'), 2);
    }

    #[test]
    fn test_with_mut_updates_in_place() {
        let mut table = HandleTable::new("counter");
        let h = table.insert(0i32);
        table.with_mut(h, |v| *v += 5);
        assert_eq!(table.get(h), Some(&5));
        assert_eq!(table.kind(), "counter");
    }
}
