// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridge between the host's stable signal and the positioning engine.
//!
//! Positioning is never requested synchronously from `show` or `hide`. Instead the bridge
//! subscribes to [`Host::on_stable`] and, each time an update cycle settles, asks its
//! request source for a [`PositionRequest`]. The source returns `None` while the overlay is
//! detached, in which case nothing is sent.

use alloc::boxed::Box;
use alloc::rc::Rc;

use kurbo::Vec2;
use log::trace;

use crate::host::{Host, PositionRequest};
use crate::subscription::Subscription;
use crate::types::Placement;

/// Positioning configuration accepted by
/// [`OverlayController::position`](crate::controller::OverlayController::position).
///
/// Unset fields keep their previous value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PositionOptions<N> {
    /// New anchor to place against.
    pub target: Option<N>,
    /// Placement hint.
    pub attachment: Option<Placement>,
    /// Extra displacement applied after placement.
    pub offset: Option<Vec2>,
}

impl<N> Default for PositionOptions<N> {
    fn default() -> Self {
        Self {
            target: None,
            attachment: None,
            offset: None,
        }
    }
}

impl<N> PositionOptions<N> {
    /// Options that only set the placement hint.
    pub fn attachment(attachment: Placement) -> Self {
        Self {
            target: None,
            attachment: Some(attachment),
            offset: None,
        }
    }
}

/// Owns the stable-signal subscription of one controller.
#[derive(Debug, Default)]
pub struct PositioningBridge {
    subscription: Option<Subscription>,
}

impl PositioningBridge {
    /// A bridge with no subscription.
    pub fn new() -> Self {
        Self { subscription: None }
    }

    /// Returns `true` once [`PositioningBridge::install`] has run and until release.
    pub fn is_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Keep `subscription` unless one is already held.
    ///
    /// Returns `false` (and drops `subscription`) if the bridge was already active.
    pub fn install(&mut self, subscription: Subscription) -> bool {
        if self.is_active() {
            return false;
        }
        self.subscription = Some(subscription);
        true
    }

    /// Take the subscription out, leaving the bridge inactive.
    pub fn take(&mut self) -> Option<Subscription> {
        self.subscription.take()
    }

    /// Subscribe `source` to the stable signal of `host`.
    ///
    /// The returned subscription forwards every request produced by `source` to
    /// [`Host::position`].
    pub fn subscribe<H, F>(host: &Rc<H>, source: F) -> Subscription
    where
        H: Host,
        F: Fn() -> Option<PositionRequest<H::Node>> + 'static,
    {
        let weak = Rc::downgrade(host);
        trace!("subscribing to stable signal");
        host.on_stable(Box::new(move || {
            let Some(host) = weak.upgrade() else {
                return;
            };
            if let Some(request) = source() {
                host.position(request);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessHost, NodeId};
    use core::cell::Cell;

    fn request(element: NodeId, target: NodeId) -> PositionRequest<NodeId> {
        PositionRequest {
            element,
            target,
            attachment: Placement::Top,
            offset: Vec2::ZERO,
            append_to_body: false,
        }
    }

    #[test]
    fn forwards_requests_on_stable() {
        let host = Rc::new(HeadlessHost::new());
        let anchor = host.create_element("a", Some(host.body()));
        let tip = host.create_element("tip", Some(host.body()));
        let shown = Rc::new(Cell::new(false));
        let s = shown.clone();
        let mut bridge = PositioningBridge::new();
        assert!(bridge.install(PositioningBridge::subscribe(&host, move || {
            s.get().then(|| request(tip, anchor))
        })));
        assert!(bridge.is_active());

        host.settle();
        assert!(host.positions().is_empty());

        shown.set(true);
        host.settle();
        assert_eq!(host.positions(), alloc::vec![request(tip, anchor)]);
    }

    #[test]
    fn install_refuses_a_second_subscription() {
        let host = Rc::new(HeadlessHost::new());
        let mut bridge = PositioningBridge::new();
        assert!(bridge.install(PositioningBridge::subscribe(&host, || None)));
        assert!(!bridge.install(PositioningBridge::subscribe(&host, || None)));
        assert_eq!(host.stable_subscriptions(), 1);
        drop(bridge.take());
        assert_eq!(host.stable_subscriptions(), 0);
        assert!(!bridge.is_active());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_deserialize_with_missing_fields() {
        let opts: PositionOptions<u32> =
            serde_json::from_str(r#"{"attachment":"bottom","offset":{"x":0.0,"y":4.0}}"#).unwrap();
        assert_eq!(opts.target, None);
        assert_eq!(opts.attachment, Some(Placement::Bottom));
        assert_eq!(opts.offset, Some(Vec2::new(0.0, 4.0)));

        let empty: PositionOptions<u32> = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, PositionOptions::default());
    }
}
