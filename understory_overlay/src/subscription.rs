// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Idempotent teardown handles.
//!
//! Every host subscription the controller holds (trigger listeners, dismissal listeners,
//! the stable signal) is represented by a [`Subscription`]. Releasing it runs the
//! host-provided teardown exactly once; dropping it releases it as well.

use alloc::boxed::Box;

/// An owned host subscription.
///
/// ## Semantics
///
/// - [`Subscription::unsubscribe`] runs the teardown the first time and is a no-op afterwards.
/// - Dropping an active subscription unsubscribes it.
/// - [`Subscription::empty`] holds nothing and is never active.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a teardown closure.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Returns `true` until the teardown has run.
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Run the teardown if it has not run yet.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[test]
    fn unsubscribe_runs_teardown_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let mut sub = Subscription::new(move || c.set(c.get() + 1));
        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        drop(sub);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_releases_active_subscription() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        {
            let _sub = Subscription::new(move || c.set(c.get() + 1));
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn empty_is_inert() {
        let mut sub = Subscription::empty();
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
