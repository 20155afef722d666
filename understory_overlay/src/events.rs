// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle event emitters.
//!
//! ## Delivery
//!
//! - Listeners run synchronously inside [`Emitter::emit`], in registration order.
//! - The listener list is snapshotted before delivery, so a listener may subscribe or
//!   unsubscribe (itself or others) while an emission is in flight. Changes apply to the
//!   next emission.
//! - Listeners may call back into the controller that owns the emitter.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

/// Handle returned by [`Emitter::subscribe`], used to remove the listener again.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<A> = Rc<dyn Fn(&A)>;

/// An ordered, single-threaded listener registry.
pub struct Emitter<A> {
    listeners: RefCell<Vec<(ListenerId, Listener<A>)>>,
    next_id: Cell<u64>,
}

impl<A> Emitter<A> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Register a listener. It receives every subsequent emission.
    pub fn subscribe(&self, listener: impl Fn(&A) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every listener registered at the time of the call.
    pub fn emit(&self, value: &A) {
        let snapshot: Vec<Listener<A>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }
}

impl<A> Default for Emitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> core::fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

/// The four lifecycle emitters of a controller.
///
/// `before_show` and `hidden` carry no payload; `shown` and `before_hide` carry the
/// element's public surface.
pub(crate) struct Lifecycle<I> {
    pub(crate) before_show: Emitter<()>,
    pub(crate) shown: Emitter<I>,
    pub(crate) before_hide: Emitter<I>,
    pub(crate) hidden: Emitter<()>,
}

impl<I> Lifecycle<I> {
    pub(crate) fn new() -> Self {
        Self {
            before_show: Emitter::new(),
            shown: Emitter::new(),
            before_hide: Emitter::new(),
            hidden: Emitter::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn delivers_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let e: Emitter<u32> = Emitter::new();
        for tag in 0..3_u32 {
            let s = seen.clone();
            e.subscribe(move |v| s.borrow_mut().push((tag, *v)));
        }
        e.emit(&7);
        assert_eq!(*seen.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let hits = Rc::new(Cell::new(0));
        let e: Emitter<()> = Emitter::new();
        let h = hits.clone();
        let a = e.subscribe(move |()| h.set(h.get() + 1));
        let h = hits.clone();
        e.subscribe(move |()| h.set(h.get() + 10));
        assert!(e.unsubscribe(a));
        assert!(!e.unsubscribe(a));
        e.emit(&());
        assert_eq!(hits.get(), 10);
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn subscribe_during_emit_applies_next_time() {
        let e: Rc<Emitter<()>> = Rc::new(Emitter::new());
        let late = Rc::new(Cell::new(0));
        let e2 = e.clone();
        let l = late.clone();
        e.subscribe(move |()| {
            let l = l.clone();
            e2.subscribe(move |()| l.set(l.get() + 1));
        });
        e.emit(&());
        assert_eq!(late.get(), 0);
        e.emit(&());
        assert_eq!(late.get(), 1);
    }
}
