//! The contract a pooled resource must fulfil.
//!
//! The pool never knows a resource's concrete shape. It only needs to be able
//! to put a returned resource back into its default state before handing it
//! to the next caller, and to tear it down when it is discarded.

use std::collections::{HashMap, VecDeque};

/// Result of resetting a returned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The resource is back in its default state and can be reused
    Reuse,

    /// The resource cannot be safely reused; the pool closes and drops it
    /// and its slot is rebuilt on a later shortage
    Discard,
}

/// A trait for resources that can be pooled
pub trait Resource: Send + 'static {
    /// Reset the resource for reuse.
    ///
    /// Must be idempotent and must leave the resource in the same state no
    /// matter how it was mutated while leased. Resetting cannot fail: a
    /// resource that cannot be restored reports [`ResetOutcome::Discard`]
    /// instead of returning to the pool in a corrupt state.
    fn reset(&mut self) -> ResetOutcome;

    /// Close the resource when it's no longer needed.
    ///
    /// Called when the resource is discarded or the pool shuts down.
    fn close(&mut self) {}
}

impl<T: Send + 'static> Resource for Vec<T> {
    fn reset(&mut self) -> ResetOutcome {
        self.clear();
        ResetOutcome::Reuse
    }
}

impl<T: Send + 'static> Resource for VecDeque<T> {
    fn reset(&mut self) -> ResetOutcome {
        self.clear();
        ResetOutcome::Reuse
    }
}

impl Resource for String {
    fn reset(&mut self) -> ResetOutcome {
        self.clear();
        ResetOutcome::Reuse
    }
}

impl<K: Send + 'static, V: Send + 'static> Resource for HashMap<K, V> {
    fn reset(&mut self) -> ResetOutcome {
        self.clear();
        ResetOutcome::Reuse
    }
}
