// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger parsing, trigger binding, and dismissal listeners.
//!
//! ## Trigger specs
//!
//! A trigger spec is a whitespace-separated list of entries. Each entry is either a single
//! event name (`click`), which toggles the overlay, or an `open:close` pair
//! (`mouseover:mouseout`), which shows on the first event and hides on the second.
//!
//! - `hover` is shorthand for `mouseover:mouseout`, `focus` for `focusin:focusout`.
//! - `manual` binds nothing; the caller drives `show`/`hide` directly. It cannot be combined
//!   with other entries.
//!
//! ```
//! use understory_overlay::triggers::Triggers;
//!
//! let t: Triggers = "click hover".parse().unwrap();
//! assert_eq!(t.len(), 2);
//! assert!(t.iter().next().unwrap().is_toggle());
//! assert_eq!(t.to_string(), "click mouseover:mouseout");
//! ```
//!
//! ## Binding
//!
//! [`bind`] installs one listener per open event on the target. Close listeners of
//! `open:close` pairs are installed lazily, the first time an [`Ack`] is acknowledged after
//! a show. [`TriggerBinding::unbind`] removes everything at once.
//!
//! ## Dismissal
//!
//! [`arm_dismissal`] installs document-level listeners for the [`Dismiss`] behaviors while
//! an overlay is shown. It is separate from the trigger set and is re-armed on every show.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::str::FromStr;

use log::trace;

use crate::error::TriggerParseError;
use crate::host::{EventTarget, Host, is_within};
use crate::subscription::Subscription;
use crate::types::Dismiss;

const MANUAL: &str = "manual";

/// One parsed trigger entry.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Trigger {
    open: String,
    close: String,
}

impl Trigger {
    /// A trigger that shows on `open` and hides on `close`.
    ///
    /// Passing the same name twice yields a toggle trigger.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// A trigger that toggles on `event`.
    pub fn toggle(event: impl Into<String>) -> Self {
        let event = event.into();
        Self {
            close: event.clone(),
            open: event,
        }
    }

    /// Event that shows (or toggles) the overlay.
    pub fn open(&self) -> &str {
        &self.open
    }

    /// Event that hides the overlay.
    pub fn close(&self) -> &str {
        &self.close
    }

    /// Returns `true` when open and close are the same event.
    pub fn is_toggle(&self) -> bool {
        self.open == self.close
    }

    /// Returns `true` for the `manual` trigger.
    pub fn is_manual(&self) -> bool {
        self.open == MANUAL || self.close == MANUAL
    }

    fn parse_entry(entry: &str) -> Result<Self, TriggerParseError> {
        match entry {
            "hover" => return Ok(Self::new("mouseover", "mouseout")),
            "focus" => return Ok(Self::new("focusin", "focusout")),
            _ => {}
        }
        let mut parts = entry.split(':');
        let open = parts.next().unwrap_or_default();
        let close = parts.next();
        if parts.next().is_some() {
            return Err(TriggerParseError::TooManyEvents(entry.to_string()));
        }
        if open.is_empty() || close.is_some_and(str::is_empty) {
            return Err(TriggerParseError::EmptyEvent(entry.to_string()));
        }
        Ok(Self::new(open, close.unwrap_or(open)))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_toggle() {
            f.write_str(&self.open)
        } else {
            write!(f, "{}:{}", self.open, self.close)
        }
    }
}

/// A parsed trigger spec.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Triggers(Vec<Trigger>);

impl Triggers {
    /// Parse a whitespace-separated trigger spec.
    ///
    /// An empty or blank spec yields an empty set, which binds nothing.
    pub fn parse(spec: &str) -> Result<Self, TriggerParseError> {
        let triggers = spec
            .split_whitespace()
            .map(Trigger::parse_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let manual = triggers.iter().filter(|t| t.is_manual()).count();
        if manual > 0 && triggers.len() > 1 {
            return Err(TriggerParseError::MixedManual);
        }
        Ok(Self(triggers))
    }

    /// Build from already constructed triggers.
    pub fn from_triggers(triggers: impl IntoIterator<Item = Trigger>) -> Self {
        Self(triggers.into_iter().collect())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the spec is the single `manual` trigger.
    pub fn is_manual(&self) -> bool {
        self.0.len() == 1 && self.0[0].is_manual()
    }

    /// Iterate the entries in spec order.
    pub fn iter(&self) -> core::slice::Iter<'_, Trigger> {
        self.0.iter()
    }
}

impl FromStr for Triggers {
    type Err = TriggerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Triggers {
    type Error = TriggerParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Triggers> for String {
    fn from(t: Triggers) -> Self {
        t.to_string()
    }
}

impl fmt::Display for Triggers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

/// Callbacks a [`TriggerBinding`] invokes.
pub struct TriggerHandlers<H: Host> {
    /// Called for the open event of an `open:close` pair.
    pub show: Rc<dyn Fn(&Ack<H>)>,
    /// Called for the close event of an `open:close` pair.
    pub hide: Rc<dyn Fn()>,
    /// Called for toggle triggers.
    pub toggle: Rc<dyn Fn(&Ack<H>)>,
}

impl<H: Host> Clone for TriggerHandlers<H> {
    fn clone(&self) -> Self {
        Self {
            show: Rc::clone(&self.show),
            hide: Rc::clone(&self.hide),
            toggle: Rc::clone(&self.toggle),
        }
    }
}

impl<H: Host> fmt::Debug for TriggerHandlers<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerHandlers").finish_non_exhaustive()
    }
}

struct BindingState<H: Host> {
    host: Weak<H>,
    target: H::Node,
    hide: Rc<dyn Fn()>,
    listeners: Vec<Subscription>,
    pending_close: Vec<String>,
    released: bool,
}

/// Acknowledgement passed to show and toggle handlers.
///
/// Acknowledging installs the close listeners of `open:close` pairs. Only the first
/// acknowledgement does any work; later ones and those after unbinding are no-ops.
pub struct Ack<H: Host> {
    state: Weak<RefCell<BindingState<H>>>,
}

impl<H: Host> Ack<H> {
    /// Install pending close listeners.
    pub fn acknowledge(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut st = state.borrow_mut();
        if st.released || st.pending_close.is_empty() {
            return;
        }
        let Some(host) = st.host.upgrade() else {
            return;
        };
        let target = st.target.clone();
        for event in core::mem::take(&mut st.pending_close) {
            let hide = Rc::clone(&st.hide);
            trace!("registering close trigger `{event}`");
            let sub = host.listen(
                EventTarget::Node(target.clone()),
                &event,
                Box::new(move |_| hide()),
            );
            st.listeners.push(sub);
        }
    }
}

impl<H: Host> fmt::Debug for Ack<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack").finish_non_exhaustive()
    }
}

/// Active trigger listeners for one target.
///
/// Released by [`TriggerBinding::unbind`] or on drop.
pub struct TriggerBinding<H: Host> {
    state: Rc<RefCell<BindingState<H>>>,
}

impl<H: Host> TriggerBinding<H> {
    /// Remove every registered listener. Idempotent.
    pub fn unbind(&self) {
        let listeners = {
            let mut st = self.state.borrow_mut();
            if st.released {
                return;
            }
            st.released = true;
            st.pending_close.clear();
            core::mem::take(&mut st.listeners)
        };
        trace!("unbinding {} trigger listeners", listeners.len());
        for mut sub in listeners {
            sub.unsubscribe();
        }
    }

    /// Returns `true` until [`TriggerBinding::unbind`] has run.
    pub fn is_bound(&self) -> bool {
        !self.state.borrow().released
    }

    /// Number of installed listeners.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl<H: Host> Drop for TriggerBinding<H> {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl<H: Host> fmt::Debug for TriggerBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("TriggerBinding")
            .field("target", &st.target)
            .field("listeners", &st.listeners.len())
            .field("pending_close", &st.pending_close)
            .field("released", &st.released)
            .finish_non_exhaustive()
    }
}

/// Subscribe `handlers` to the events named by `triggers` on `target`.
pub fn bind<H: Host>(
    host: &Rc<H>,
    target: H::Node,
    triggers: &Triggers,
    handlers: TriggerHandlers<H>,
) -> TriggerBinding<H> {
    let state = Rc::new(RefCell::new(BindingState {
        host: Rc::downgrade(host),
        target: target.clone(),
        hide: Rc::clone(&handlers.hide),
        listeners: Vec::new(),
        pending_close: Vec::new(),
        released: false,
    }));
    if triggers.is_manual() {
        return TriggerBinding { state };
    }

    let mut listeners = Vec::with_capacity(triggers.len());
    let mut pending_close = Vec::new();
    for trigger in triggers.iter() {
        let handler = if trigger.is_toggle() {
            Rc::clone(&handlers.toggle)
        } else {
            pending_close.push(trigger.close().to_string());
            Rc::clone(&handlers.show)
        };
        let ack_state = Rc::downgrade(&state);
        trace!("binding trigger `{}`", trigger.open());
        listeners.push(host.listen(
            EventTarget::Node(target.clone()),
            trigger.open(),
            Box::new(move |_| {
                handler(&Ack {
                    state: ack_state.clone(),
                });
            }),
        ));
    }
    {
        let mut st = state.borrow_mut();
        st.listeners = listeners;
        st.pending_close = pending_close;
    }
    TriggerBinding { state }
}

/// Install document listeners for `dismiss`, calling `hide` when one fires.
///
/// An outside click is a click whose target is not within any of `watched`. The returned
/// subscription releases every installed listener.
pub fn arm_dismissal<H: Host>(
    host: &Rc<H>,
    watched: Vec<H::Node>,
    dismiss: Dismiss,
    hide: Rc<dyn Fn()>,
) -> Subscription {
    let mut subs = Vec::new();
    if dismiss.contains(Dismiss::OUTSIDE_CLICK) {
        let weak = Rc::downgrade(host);
        let hide = Rc::clone(&hide);
        subs.push(host.listen(
            EventTarget::Document,
            "click",
            Box::new(move |ev| {
                let Some(host) = weak.upgrade() else {
                    return;
                };
                let inside = ev
                    .target
                    .as_ref()
                    .is_some_and(|t| watched.iter().any(|w| is_within(&*host, t, w)));
                if !inside {
                    trace!("outside click, dismissing");
                    hide();
                }
            }),
        ));
    }
    if dismiss.contains(Dismiss::ESCAPE) {
        subs.push(host.listen(
            EventTarget::Document,
            "keydown",
            Box::new(move |ev| {
                if ev.key.as_deref() == Some("Escape") {
                    trace!("escape pressed, dismissing");
                    hide();
                }
            }),
        ));
    }
    if subs.is_empty() {
        return Subscription::empty();
    }
    Subscription::new(move || {
        for mut sub in subs {
            sub.unsubscribe();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;
    use alloc::vec;
    use core::cell::Cell;

    #[test]
    fn parses_single_and_paired_entries() {
        let t = Triggers::parse("  click  focusin:focusout ").unwrap();
        let entries: Vec<_> = t.iter().cloned().collect();
        assert_eq!(
            entries,
            vec![
                Trigger::toggle("click"),
                Trigger::new("focusin", "focusout")
            ]
        );
        assert!(entries[0].is_toggle());
        assert!(!entries[1].is_toggle());
    }

    #[test]
    fn expands_aliases() {
        let t: Triggers = "hover focus".parse().unwrap();
        assert_eq!(t.to_string(), "mouseover:mouseout focusin:focusout");
    }

    #[test]
    fn blank_spec_is_empty() {
        assert!(Triggers::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_entries() {
        assert_eq!(
            Triggers::parse("click:blur:focus"),
            Err(TriggerParseError::TooManyEvents("click:blur:focus".into()))
        );
        assert_eq!(
            Triggers::parse(":blur"),
            Err(TriggerParseError::EmptyEvent(":blur".into()))
        );
        assert_eq!(
            Triggers::parse("click:"),
            Err(TriggerParseError::EmptyEvent("click:".into()))
        );
    }

    #[test]
    fn manual_stands_alone() {
        assert!(Triggers::parse("manual").unwrap().is_manual());
        assert_eq!(
            Triggers::parse("manual click"),
            Err(TriggerParseError::MixedManual)
        );
    }

    struct Counters {
        show: Rc<Cell<u32>>,
        hide: Rc<Cell<u32>>,
        toggle: Rc<Cell<u32>>,
    }

    fn counting_handlers() -> (TriggerHandlers<HeadlessHost>, Counters) {
        let c = Counters {
            show: Rc::new(Cell::new(0)),
            hide: Rc::new(Cell::new(0)),
            toggle: Rc::new(Cell::new(0)),
        };
        let (s, h, t) = (c.show.clone(), c.hide.clone(), c.toggle.clone());
        let handlers = TriggerHandlers {
            show: Rc::new(move |ack: &Ack<HeadlessHost>| {
                s.set(s.get() + 1);
                ack.acknowledge();
            }),
            hide: Rc::new(move || h.set(h.get() + 1)),
            toggle: Rc::new(move |_: &Ack<HeadlessHost>| t.set(t.get() + 1)),
        };
        (handlers, c)
    }

    #[test]
    fn toggle_trigger_fires_toggle() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("button", Some(host.body()));
        let (handlers, c) = counting_handlers();
        let binding = bind(&host, anchor, &"click".parse().unwrap(), handlers);
        host.click(anchor);
        host.click(anchor);
        assert_eq!(c.toggle.get(), 2);
        assert_eq!(c.show.get(), 0);
        assert_eq!(binding.listener_count(), 1);
    }

    #[test]
    fn close_listener_registered_on_first_acknowledgement() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("button", Some(host.body()));
        let (handlers, c) = counting_handlers();
        let binding = bind(&host, anchor, &"hover".parse().unwrap(), handlers);
        assert_eq!(host.listener_count(), 1);

        host.dispatch(anchor, "mouseout");
        assert_eq!(c.hide.get(), 0);

        host.dispatch(anchor, "mouseover");
        assert_eq!(c.show.get(), 1);
        assert_eq!(host.listener_count(), 2);

        host.dispatch(anchor, "mouseover");
        assert_eq!(host.listener_count(), 2);

        host.dispatch(anchor, "mouseout");
        assert_eq!(c.hide.get(), 1);
        drop(binding);
    }

    #[test]
    fn unbind_removes_everything_once() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("button", Some(host.body()));
        let (handlers, c) = counting_handlers();
        let binding = bind(&host, anchor, &"click hover".parse().unwrap(), handlers);
        host.dispatch(anchor, "mouseover");
        assert_eq!(host.listener_count(), 3);
        binding.unbind();
        binding.unbind();
        assert!(!binding.is_bound());
        assert_eq!(host.listener_count(), 0);
        host.click(anchor);
        assert_eq!(c.toggle.get(), 0);
    }

    #[test]
    fn manual_binds_nothing() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("button", Some(host.body()));
        let (handlers, _c) = counting_handlers();
        let _binding = bind(&host, anchor, &"manual".parse().unwrap(), handlers);
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn outside_click_ignores_watched_subtrees() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("button", Some(host.body()));
        let overlay = host.create_element("tip", Some(host.body()));
        let inner = host.create_element("span", Some(overlay));
        let elsewhere = host.create_element("p", Some(host.body()));
        let hides = Rc::new(Cell::new(0));
        let h = hides.clone();
        let _sub = arm_dismissal(
            &host,
            vec![overlay, anchor],
            Dismiss::OUTSIDE_CLICK,
            Rc::new(move || h.set(h.get() + 1)),
        );
        host.click(inner);
        host.click(anchor);
        assert_eq!(hides.get(), 0);
        host.click(elsewhere);
        assert_eq!(hides.get(), 1);
        host.press_key("Escape");
        assert_eq!(hides.get(), 1);
    }

    #[test]
    fn escape_dismissal_only_reacts_to_escape() {
        let host = Rc::new(HeadlessHost::new());
        let hides = Rc::new(Cell::new(0));
        let h = hides.clone();
        let mut sub = arm_dismissal(
            &host,
            Vec::new(),
            Dismiss::ESCAPE,
            Rc::new(move || h.set(h.get() + 1)),
        );
        host.press_key("Enter");
        host.press_key("Escape");
        assert_eq!(hides.get(), 1);
        sub.unsubscribe();
        host.press_key("Escape");
        assert_eq!(hides.get(), 1);
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn empty_dismissal_installs_nothing() {
        let host = Rc::new(HeadlessHost::new());
        let sub = arm_dismissal(&host, Vec::new(), Dismiss::empty(), Rc::new(|| {}));
        assert!(!sub.is_active());
        assert_eq!(host.listener_count(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn triggers_serialize_as_spec_strings() {
        let t: Triggers = serde_json::from_str("\"hover click\"").unwrap();
        assert_eq!(t, Triggers::parse("hover click").unwrap());
        assert_eq!(
            serde_json::to_string(&t).unwrap(),
            "\"mouseover:mouseout click\""
        );
        assert!(serde_json::from_str::<Triggers>("\"manual click\"").is_err());
        assert!(serde_json::from_str::<Triggers>("\"a:b:c\"").is_err());
    }
}
