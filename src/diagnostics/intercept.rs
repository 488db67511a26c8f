// SPDX-License-Identifier: MPL-2.0
//! Replaceable entry points with restorable wrappers.
//!
//! A [`Slot`] holds the implementation callers reach through. Interceptors
//! wrap the current implementation and get back an [`Interception`] guard
//! that can put the original back.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, swappable entry point.
pub struct Slot<T: ?Sized> {
    current: RwLock<Arc<T>>,
}

impl<T: ?Sized> Slot<T> {
    #[must_use]
    pub fn new(initial: Arc<T>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Returns the implementation currently installed.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace(&self, next: Arc<T>) -> Arc<T> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Installs `wrap(current)` in place of the current implementation.
    ///
    /// The original stays alive inside the returned guard. Dropping the guard
    /// without calling [`Interception::restore`] leaves the wrapper installed.
    pub fn intercept<F>(slot: &Arc<Self>, wrap: F) -> Interception<T>
    where
        F: FnOnce(Arc<T>) -> Arc<T>,
    {
        let original = slot.get();
        let installed = wrap(Arc::clone(&original));
        slot.replace(Arc::clone(&installed));
        Interception {
            slot: Arc::clone(slot),
            original,
            installed,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").finish_non_exhaustive()
    }
}

/// Guard returned by [`Slot::intercept`].
pub struct Interception<T: ?Sized> {
    slot: Arc<Slot<T>>,
    original: Arc<T>,
    installed: Arc<T>,
}

impl<T: ?Sized> Interception<T> {
    /// Returns true while this interception's wrapper is the active implementation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        Arc::ptr_eq(&self.slot.get(), &self.installed)
    }

    /// Reinstates the implementation that was current when this guard was created.
    ///
    /// Wrappers stacked on top of this one afterwards are removed too.
    pub fn restore(self) -> Arc<T> {
        self.slot.replace(Arc::clone(&self.original));
        self.original
    }
}

impl<T: ?Sized> fmt::Debug for Interception<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Plain;

    impl Greeter for Plain {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    struct Loud(Arc<dyn Greeter>);

    impl Greeter for Loud {
        fn greet(&self) -> String {
            self.0.greet().to_uppercase()
        }
    }

    fn loud(original: Arc<dyn Greeter>) -> Arc<dyn Greeter> {
        Arc::new(Loud(original))
    }

    fn slot() -> Arc<Slot<dyn Greeter>> {
        Arc::new(Slot::new(Arc::new(Plain) as Arc<dyn Greeter>))
    }

    #[test]
    fn intercept_installs_wrapper_around_original() {
        let slot = slot();
        let guard = Slot::intercept(&slot, loud);

        assert_eq!(slot.get().greet(), "HELLO");
        assert!(guard.is_active());
    }

    #[test]
    fn restore_reinstates_original() {
        let slot = slot();
        let guard = Slot::intercept(&slot, loud);

        let original = guard.restore();
        assert_eq!(original.greet(), "hello");
        assert_eq!(slot.get().greet(), "hello");
    }

    #[test]
    fn dropping_guard_keeps_wrapper() {
        let slot = slot();
        drop(Slot::intercept(&slot, loud));

        assert_eq!(slot.get().greet(), "HELLO");
    }

    #[test]
    fn stacked_interception_is_not_active_for_lower_guard() {
        let slot = slot();
        let lower = Slot::intercept(&slot, loud);
        let upper = Slot::intercept(&slot, loud);

        assert!(!lower.is_active());
        assert!(upper.is_active());

        upper.restore();
        assert!(lower.is_active());
    }
}
