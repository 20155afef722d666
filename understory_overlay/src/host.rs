// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host services an overlay controller consumes.
//!
//! ## Overview
//!
//! The controller does not render, lay out, or dispatch events itself. It drives a
//! [`Host`] that bundles five narrow services:
//!
//! - Render engine: instantiate components and templates, force change detection, destroy views.
//! - Tree: resolve named surfaces, walk parents, append and remove nodes.
//! - Events: subscribe to named events on a node or on the document.
//! - Zone: the "stable" signal fired after each update cycle settles, and deferred tasks.
//! - Positioning: fire-and-forget placement requests.
//!
//! All methods take `&self`; hosts are expected to use interior mutability, the same way a
//! DOM binding would. Callbacks handed to the host may call back into the controller, so a
//! host must not hold its own borrows while invoking them.
//!
//! [`headless::HeadlessHost`](crate::headless::HeadlessHost) is a complete in-memory
//! implementation.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::Vec2;

use crate::subscription::Subscription;
use crate::types::{Placement, Surface};

/// Services consumed by [`OverlayController`](crate::controller::OverlayController).
pub trait Host: Sized + 'static {
    /// A node in the host's element tree.
    type Node: Clone + PartialEq + Debug;
    /// An owned view handle (component host view or embedded template view).
    type View: Debug;
    /// The public surface of an instantiated component.
    type Instance: Clone + Debug;
    /// Identifies a component type that can be instantiated.
    type ComponentType: Clone + Debug;
    /// A template that can be stamped into an embedded view.
    type Template: Debug;
    /// A dependency override applied when instantiating components.
    type Provider: Clone + Debug;

    /// Instantiate `ty` in a fresh scope built from `injector`, projecting `projected`
    /// (one node list per content slot).
    fn create_component(
        &self,
        ty: &Self::ComponentType,
        injector: &Injector<Self>,
        projected: &[Vec<Self::Node>],
    ) -> Mounted<Self>;

    /// Stamp `template` into an embedded view, inside `container` when one is given.
    fn create_embedded_view(
        &self,
        template: &Self::Template,
        container: Option<&Self::Node>,
    ) -> EmbeddedView<Self>;

    /// Register `view` with the application root so it takes part in change detection.
    fn attach_view(&self, view: &Self::View);

    /// Mark `view` dirty.
    fn mark_for_check(&self, view: &Self::View);

    /// Run change detection on `view` now.
    fn detect_changes(&self, view: &Self::View);

    /// Destroy `view` and release everything it owns.
    fn destroy_view(&self, view: Self::View);

    /// Create an inert text node.
    fn create_text(&self, text: &str) -> Self::Node;

    /// Resolve a named surface, if the host has one.
    fn surface(&self, surface: Surface) -> Option<Self::Node>;

    /// Parent of `node`, or `None` for roots and detached nodes.
    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Detach `node` from its parent. No-op for detached nodes.
    fn remove_child(&self, node: &Self::Node);

    /// Subscribe `handler` to `event` on `target`.
    fn listen(
        &self,
        target: EventTarget<Self::Node>,
        event: &str,
        handler: Box<dyn FnMut(&HostEvent<Self::Node>)>,
    ) -> Subscription;

    /// Subscribe to the signal fired after each update cycle settles.
    fn on_stable(&self, callback: Box<dyn FnMut()>) -> Subscription;

    /// Run `task` after the current dispatch completes.
    fn defer(&self, task: Box<dyn FnOnce()>);

    /// Ask the positioning engine to place an element.
    fn position(&self, request: PositionRequest<Self::Node>);
}

/// A live component created by [`Host::create_component`].
pub struct Mounted<H: Host> {
    /// The component's root node.
    pub root: H::Node,
    /// The component's public surface.
    pub instance: H::Instance,
    /// The component's host view, used for change detection and teardown.
    pub view: H::View,
}

impl<H: Host> Debug for Mounted<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mounted")
            .field("root", &self.root)
            .field("instance", &self.instance)
            .field("view", &self.view)
            .finish()
    }
}

/// A stamped template created by [`Host::create_embedded_view`].
pub struct EmbeddedView<H: Host> {
    /// Top-level nodes of the view, in order.
    pub root_nodes: Vec<H::Node>,
    /// Owned view handle.
    pub view: H::View,
}

impl<H: Host> Debug for EmbeddedView<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmbeddedView")
            .field("root_nodes", &self.root_nodes)
            .field("view", &self.view)
            .finish()
    }
}

/// A fresh dependency scope for one instantiation.
pub struct Injector<H: Host> {
    /// Overrides, in the order they were provided.
    pub providers: Vec<H::Provider>,
    /// The component type being instantiated is itself provided in the scope.
    ///
    /// Set for nested content components so they can inject themselves.
    pub provides_self: bool,
}

impl<H: Host> Injector<H> {
    /// A scope holding `providers`.
    pub fn new(providers: &[H::Provider]) -> Self {
        Self {
            providers: providers.to_vec(),
            provides_self: false,
        }
    }

    /// A scope holding `providers` plus the instantiated type itself.
    pub fn with_self(providers: &[H::Provider]) -> Self {
        Self {
            providers: providers.to_vec(),
            provides_self: true,
        }
    }
}

impl<H: Host> Debug for Injector<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.providers)
            .field("provides_self", &self.provides_self)
            .finish()
    }
}

/// Where an event subscription is installed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventTarget<N> {
    /// A specific node. Events dispatched at the node or its descendants reach it.
    Node(N),
    /// The document. Every dispatched event reaches it.
    Document,
}

/// An event delivered to a [`Host::listen`] handler.
#[derive(Clone, Debug, PartialEq)]
pub struct HostEvent<N> {
    /// Event name, e.g. `click`.
    pub name: String,
    /// The node the event was dispatched at, if any.
    pub target: Option<N>,
    /// Key name for keyboard events, e.g. `Escape`.
    pub key: Option<String>,
}

/// A positioning request for [`Host::position`].
#[derive(Clone, Debug, PartialEq)]
pub struct PositionRequest<N> {
    /// The overlay's root node.
    pub element: N,
    /// The anchor to place against.
    pub target: N,
    /// Placement hint.
    pub attachment: Placement,
    /// Extra displacement applied after placement.
    pub offset: Vec2,
    /// The overlay lives under the document body rather than next to the anchor.
    pub append_to_body: bool,
}

/// Returns `true` if `node` is `ancestor` or lies beneath it.
///
/// Walks [`Host::parent_of`] to the root; the host must keep ancestry acyclic.
pub fn is_within<H: Host>(host: &H, node: &H::Node, ancestor: &H::Node) -> bool {
    let mut cur = node.clone();
    loop {
        if cur == *ancestor {
            return true;
        }
        match host.parent_of(&cur) {
            Some(p) => cur = p,
            None => return false,
        }
    }
}
