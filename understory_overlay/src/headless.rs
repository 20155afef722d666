// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory [`Host`] for tests, demos, and headless environments.
//!
//! ## Overview
//!
//! [`HeadlessHost`] keeps a small element tree with generational [`NodeId`]s, a table of
//! views, event listeners, stable-signal subscribers, and a queue of deferred tasks. Every
//! render-engine and tree call is appended to a [`Call`] journal so callers can assert on
//! ordering.
//!
//! Nothing runs on its own: drive the host explicitly with [`HeadlessHost::click`],
//! [`HeadlessHost::press_key`], [`HeadlessHost::run_deferred`], and [`HeadlessHost::settle`].
//!
//! ## Component types, templates, providers
//!
//! - Component types are `&'static str` names; instantiating one creates an element labeled
//!   with that name whose instance is a [`Props`] map seeded with `component = <name>`.
//! - Templates are names registered with [`HeadlessHost::define_template`].
//! - Providers are plain strings, recorded in [`Call::Create`].
//!
//! ## Minimal usage
//!
//! ```
//! use understory_overlay::headless::HeadlessHost;
//!
//! let host = HeadlessHost::new();
//! let button = host.create_element("button", Some(host.body()));
//! assert_eq!(host.children_of(host.body()), vec![button]);
//! ```

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::host::{EmbeddedView, EventTarget, Host, HostEvent, Injector, Mounted, PositionRequest};
use crate::subscription::Subscription;
use crate::types::Surface;

/// Identifier for a node in the headless tree.
///
/// A slot index plus a generation counter. Removing a node frees its slot; reusing the slot
/// bumps the generation, so stale ids never alias a different live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32, u32);

impl NodeId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a view created by the headless host.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ViewId(u32);

/// Public surface of a headless component: a shared string map.
pub type Props = Rc<RefCell<BTreeMap<String, String>>>;

/// A journaled render-engine or tree call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// [`Host::create_component`].
    Create {
        /// Component type name.
        ty: &'static str,
        /// The new host view.
        view: ViewId,
        /// Providers in the instantiation scope.
        providers: Vec<String>,
        /// Whether the type provided itself.
        provides_self: bool,
    },
    /// [`Host::create_embedded_view`].
    Embed {
        /// Template name.
        template: String,
        /// The new embedded view.
        view: ViewId,
    },
    /// [`Host::attach_view`].
    AttachView(ViewId),
    /// [`Host::mark_for_check`].
    MarkForCheck(ViewId),
    /// [`Host::detect_changes`].
    DetectChanges(ViewId),
    /// [`Host::destroy_view`].
    Destroy(ViewId),
    /// [`Host::append_child`].
    Append {
        /// New parent.
        parent: NodeId,
        /// Appended node.
        child: NodeId,
    },
    /// [`Host::remove_child`].
    Remove(NodeId),
    /// [`Host::position`].
    Position(PositionRequest<NodeId>),
}

type Handler = Rc<RefCell<Box<dyn FnMut(&HostEvent<NodeId>)>>>;
type StableCallback = Rc<RefCell<Box<dyn FnMut()>>>;

#[derive(Debug)]
struct NodeData {
    label: String,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct ViewRecord {
    roots: Vec<NodeId>,
    container: Option<NodeId>,
    attached_to_root: bool,
    destroyed: bool,
}

struct ListenerEntry {
    id: u64,
    target: EventTarget<NodeId>,
    event: String,
    handler: Handler,
}

struct State {
    nodes: Vec<Option<NodeData>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    body: NodeId,
    views: Vec<ViewRecord>,
    templates: BTreeMap<String, Vec<String>>,
    listeners: Vec<ListenerEntry>,
    stable: Vec<(u64, StableCallback)>,
    deferred: VecDeque<Box<dyn FnOnce()>>,
    journal: Vec<Call>,
    next_subscription: u64,
}

impl State {
    fn insert(&mut self, label: String, text: Option<String>) -> NodeId {
        let data = NodeData {
            label,
            text,
            parent: None,
            children: Vec::new(),
        };
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(data);
            (idx, generation)
        } else {
            self.nodes.push(Some(data));
            self.generations.push(1);
            (self.nodes.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        NodeId(idx, generation)
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.nodes.get(id.idx()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.nodes.get_mut(id.idx()).and_then(Option::as_mut)
    }

    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.unlink(child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        if self.node(id).is_none() {
            return;
        }
        self.unlink(id);
        let children = self.node(id).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.remove_subtree(child);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    fn new_view(&mut self, roots: Vec<NodeId>, container: Option<NodeId>) -> ViewId {
        self.views.push(ViewRecord {
            roots,
            container,
            attached_to_root: false,
            destroyed: false,
        });
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ViewId uses 32-bit indices by design."
        )]
        let idx = (self.views.len() - 1) as u32;
        ViewId(idx)
    }

    fn next_id(&mut self) -> u64 {
        self.next_subscription += 1;
        self.next_subscription
    }
}

/// In-memory host. Cloning yields another handle to the same host.
#[derive(Clone)]
pub struct HeadlessHost {
    state: Rc<RefCell<State>>,
}

impl core::fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessHost")
            .field("nodes_alive", &s.nodes.iter().filter(|n| n.is_some()).count())
            .field("views", &s.views.len())
            .field("listeners", &s.listeners.len())
            .field("stable", &s.stable.len())
            .field("deferred", &s.deferred.len())
            .finish_non_exhaustive()
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    /// Create a host holding a single `body` root.
    pub fn new() -> Self {
        let mut state = State {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            body: NodeId(0, 0),
            views: Vec::new(),
            templates: BTreeMap::new(),
            listeners: Vec::new(),
            stable: Vec::new(),
            deferred: VecDeque::new(),
            journal: Vec::new(),
            next_subscription: 0,
        };
        state.body = state.insert("body".to_string(), None);
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// The `body` surface.
    pub fn body(&self) -> NodeId {
        self.state.borrow().body
    }

    /// Create an element labeled `label`, optionally under `parent`.
    pub fn create_element(&self, label: &str, parent: Option<NodeId>) -> NodeId {
        let mut s = self.state.borrow_mut();
        let id = s.insert(label.to_string(), None);
        if let Some(p) = parent {
            s.link(p, id);
        }
        id
    }

    /// Register a template whose embedded views hold one element per label.
    pub fn define_template(&self, name: &str, labels: &[&str]) {
        self.state.borrow_mut().templates.insert(
            name.to_string(),
            labels.iter().map(|l| (*l).to_string()).collect(),
        );
    }

    /// Returns `true` if `node` refers to a live node.
    pub fn is_alive(&self, node: NodeId) -> bool {
        self.state.borrow().node(node).is_some()
    }

    /// Label of a live node (`#text` for text nodes).
    pub fn label_of(&self, node: NodeId) -> Option<String> {
        self.state.borrow().node(node).map(|n| n.label.clone())
    }

    /// Text of a live text node.
    pub fn text_of(&self, node: NodeId) -> Option<String> {
        self.state.borrow().node(node).and_then(|n| n.text.clone())
    }

    /// Children of a live node, in order.
    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.state
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Concatenated text of every text node in the subtree under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let s = self.state.borrow();
        let mut out = String::new();
        let mut stack = alloc::vec![node];
        while let Some(id) = stack.pop() {
            let Some(n) = s.node(id) else { continue };
            if let Some(t) = &n.text {
                out.push_str(t);
            }
            stack.extend(n.children.iter().rev().copied());
        }
        out
    }

    /// Returns `true` if `view` is registered with the application root.
    pub fn is_attached_to_root(&self, view: ViewId) -> bool {
        self.state
            .borrow()
            .views
            .get(view.0 as usize)
            .is_some_and(|v| v.attached_to_root)
    }

    /// Returns `true` if `view` has been destroyed.
    pub fn is_destroyed(&self, view: ViewId) -> bool {
        self.state
            .borrow()
            .views
            .get(view.0 as usize)
            .is_some_and(|v| v.destroyed)
    }

    /// The container `view` was created in, if any.
    pub fn view_container_of(&self, view: ViewId) -> Option<NodeId> {
        self.state
            .borrow()
            .views
            .get(view.0 as usize)
            .and_then(|v| v.container)
    }

    /// Views that have not been destroyed.
    pub fn live_views(&self) -> usize {
        self.state.borrow().views.iter().filter(|v| !v.destroyed).count()
    }

    /// A copy of the call journal.
    pub fn journal(&self) -> Vec<Call> {
        self.state.borrow().journal.clone()
    }

    /// Clear the call journal.
    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    /// Positioning requests received so far.
    pub fn positions(&self) -> Vec<PositionRequest<NodeId>> {
        self.state
            .borrow()
            .journal
            .iter()
            .filter_map(|c| match c {
                Call::Position(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of active event listeners.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Number of active listeners for `event` on the document.
    pub fn document_listener_count(&self, event: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.target == EventTarget::Document && l.event == event)
            .count()
    }

    /// Number of active stable-signal subscriptions.
    pub fn stable_subscriptions(&self) -> usize {
        self.state.borrow().stable.len()
    }

    /// Number of queued deferred tasks.
    pub fn pending_deferred(&self) -> usize {
        self.state.borrow().deferred.len()
    }

    /// Run deferred tasks until the queue is empty. Returns how many ran.
    pub fn run_deferred(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.state.borrow_mut().deferred.pop_front();
            let Some(task) = task else { return ran };
            task();
            ran += 1;
        }
    }

    /// Fire the stable signal once.
    pub fn settle(&self) {
        let callbacks: Vec<(u64, StableCallback)> = self
            .state
            .borrow()
            .stable
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();
        for (id, cb) in callbacks {
            if !self.state.borrow().stable.iter().any(|(sid, _)| *sid == id) {
                continue;
            }
            (*cb.borrow_mut())();
        }
    }

    /// Dispatch a `click` at `node`.
    pub fn click(&self, node: NodeId) {
        self.dispatch(node, "click");
    }

    /// Dispatch a `keydown` for `key` at the body.
    pub fn press_key(&self, key: &str) {
        let body = self.body();
        self.dispatch_event(HostEvent {
            name: "keydown".to_string(),
            target: Some(body),
            key: Some(key.to_string()),
        });
    }

    /// Dispatch `event` at `node`. It bubbles through the node's ancestors, then reaches
    /// document listeners.
    pub fn dispatch(&self, node: NodeId, event: &str) {
        self.dispatch_event(HostEvent {
            name: event.to_string(),
            target: Some(node),
            key: None,
        });
    }

    fn dispatch_event(&self, ev: HostEvent<NodeId>) {
        let handlers: Vec<(u64, Handler)> = {
            let s = self.state.borrow();
            let mut path = Vec::new();
            let mut cur = ev.target.filter(|t| s.node(*t).is_some());
            while let Some(id) = cur {
                path.push(id);
                cur = s.node(id).and_then(|n| n.parent);
            }
            let mut out = Vec::new();
            for id in &path {
                out.extend(
                    s.listeners
                        .iter()
                        .filter(|l| l.event == ev.name && l.target == EventTarget::Node(*id))
                        .map(|l| (l.id, Rc::clone(&l.handler))),
                );
            }
            out.extend(
                s.listeners
                    .iter()
                    .filter(|l| l.event == ev.name && l.target == EventTarget::Document)
                    .map(|l| (l.id, Rc::clone(&l.handler))),
            );
            out
        };
        for (id, handler) in handlers {
            // Listeners removed by an earlier handler in this dispatch do not fire.
            if !self.state.borrow().listeners.iter().any(|l| l.id == id) {
                continue;
            }
            (*handler.borrow_mut())(&ev);
        }
    }

    fn weak(&self) -> Weak<RefCell<State>> {
        Rc::downgrade(&self.state)
    }
}

impl Host for HeadlessHost {
    type Node = NodeId;
    type View = ViewId;
    type Instance = Props;
    type ComponentType = &'static str;
    type Template = String;
    type Provider = String;

    fn create_component(
        &self,
        ty: &&'static str,
        injector: &Injector<Self>,
        projected: &[Vec<NodeId>],
    ) -> Mounted<Self> {
        let mut s = self.state.borrow_mut();
        let root = s.insert((*ty).to_string(), None);
        for node in projected.iter().flatten() {
            s.link(root, *node);
        }
        let view = s.new_view(alloc::vec![root], None);
        s.journal.push(Call::Create {
            ty: *ty,
            view,
            providers: injector.providers.clone(),
            provides_self: injector.provides_self,
        });
        let mut props = BTreeMap::new();
        props.insert("component".to_string(), (*ty).to_string());
        Mounted {
            root,
            instance: Rc::new(RefCell::new(props)),
            view,
        }
    }

    fn create_embedded_view(
        &self,
        template: &String,
        container: Option<&NodeId>,
    ) -> EmbeddedView<Self> {
        let mut s = self.state.borrow_mut();
        let labels = s.templates.get(template).cloned().unwrap_or_default();
        let root_nodes: Vec<NodeId> = labels.into_iter().map(|l| s.insert(l, None)).collect();
        let view = s.new_view(root_nodes.clone(), container.copied());
        s.journal.push(Call::Embed {
            template: template.clone(),
            view,
        });
        EmbeddedView { root_nodes, view }
    }

    fn attach_view(&self, view: &ViewId) {
        let mut s = self.state.borrow_mut();
        if let Some(v) = s.views.get_mut(view.0 as usize) {
            v.attached_to_root = true;
        }
        s.journal.push(Call::AttachView(*view));
    }

    fn mark_for_check(&self, view: &ViewId) {
        self.state.borrow_mut().journal.push(Call::MarkForCheck(*view));
    }

    fn detect_changes(&self, view: &ViewId) {
        self.state.borrow_mut().journal.push(Call::DetectChanges(*view));
    }

    fn destroy_view(&self, view: ViewId) {
        let mut s = self.state.borrow_mut();
        s.journal.push(Call::Destroy(view));
        let roots = match s.views.get_mut(view.0 as usize) {
            Some(v) if !v.destroyed => {
                v.destroyed = true;
                v.attached_to_root = false;
                core::mem::take(&mut v.roots)
            }
            _ => return,
        };
        for root in roots {
            s.remove_subtree(root);
        }
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.state
            .borrow_mut()
            .insert("#text".to_string(), Some(text.to_string()))
    }

    fn surface(&self, surface: Surface) -> Option<NodeId> {
        match surface {
            Surface::Body => Some(self.body()),
        }
    }

    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.state.borrow().node(*node).and_then(|n| n.parent)
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        let mut s = self.state.borrow_mut();
        s.link(*parent, *child);
        s.journal.push(Call::Append {
            parent: *parent,
            child: *child,
        });
    }

    fn remove_child(&self, node: &NodeId) {
        let mut s = self.state.borrow_mut();
        s.unlink(*node);
        s.journal.push(Call::Remove(*node));
    }

    fn listen(
        &self,
        target: EventTarget<NodeId>,
        event: &str,
        handler: Box<dyn FnMut(&HostEvent<NodeId>)>,
    ) -> Subscription {
        let id = {
            let mut s = self.state.borrow_mut();
            let id = s.next_id();
            s.listeners.push(ListenerEntry {
                id,
                target,
                event: event.to_string(),
                handler: Rc::new(RefCell::new(handler)),
            });
            id
        };
        let weak = self.weak();
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().listeners.retain(|l| l.id != id);
            }
        })
    }

    fn on_stable(&self, callback: Box<dyn FnMut()>) -> Subscription {
        let id = {
            let mut s = self.state.borrow_mut();
            let id = s.next_id();
            s.stable.push((id, Rc::new(RefCell::new(callback))));
            id
        };
        let weak = self.weak();
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().stable.retain(|(sid, _)| *sid != id);
            }
        })
    }

    fn defer(&self, task: Box<dyn FnOnce()>) {
        self.state.borrow_mut().deferred.push_back(task);
    }

    fn position(&self, request: PositionRequest<NodeId>) {
        self.state.borrow_mut().journal.push(Call::Position(request));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use core::cell::Cell;

    #[test]
    fn removed_slots_are_reused_with_new_generation() {
        let host = HeadlessHost::new();
        let a = host.create_element("a", Some(host.body()));
        {
            let mut s = host.state.borrow_mut();
            s.remove_subtree(a);
        }
        assert!(!host.is_alive(a));
        let b = host.create_element("b", None);
        assert_eq!(a.0, b.0);
        assert_ne!(a, b);
        assert!(host.label_of(a).is_none());
        assert_eq!(host.label_of(b).as_deref(), Some("b"));
    }

    #[test]
    fn append_reparents_node() {
        let host = HeadlessHost::new();
        let a = host.create_element("a", Some(host.body()));
        let b = host.create_element("b", Some(host.body()));
        host.append_child(&a, &b);
        assert_eq!(host.children_of(host.body()), vec![a]);
        assert_eq!(host.parent_of(&b), Some(a));
        host.remove_child(&b);
        assert_eq!(host.parent_of(&b), None);
        assert!(host.is_alive(b));
    }

    #[test]
    fn events_bubble_to_ancestors_then_document() {
        let host = HeadlessHost::new();
        let outer = host.create_element("outer", Some(host.body()));
        let inner = host.create_element("inner", Some(outer));
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        let _a = host.listen(
            EventTarget::Node(outer),
            "click",
            Box::new(move |_| o.borrow_mut().push("outer")),
        );
        let o = order.clone();
        let _b = host.listen(
            EventTarget::Document,
            "click",
            Box::new(move |_| o.borrow_mut().push("document")),
        );
        let o = order.clone();
        let _c = host.listen(
            EventTarget::Node(inner),
            "click",
            Box::new(move |_| o.borrow_mut().push("inner")),
        );
        host.click(inner);
        assert_eq!(*order.borrow(), vec!["inner", "outer", "document"]);
    }

    #[test]
    fn listener_removed_mid_dispatch_does_not_fire() {
        let host = HeadlessHost::new();
        let node = host.create_element("n", Some(host.body()));
        let fired = Rc::new(Cell::new(false));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let s = slot.clone();
        let _first = host.listen(
            EventTarget::Node(node),
            "click",
            Box::new(move |_| {
                if let Some(mut sub) = s.borrow_mut().take() {
                    sub.unsubscribe();
                }
            }),
        );
        let f = fired.clone();
        *slot.borrow_mut() = Some(host.listen(
            EventTarget::Document,
            "click",
            Box::new(move |_| f.set(true)),
        ));
        host.click(node);
        assert!(!fired.get());
        assert_eq!(host.listener_count(), 1);
    }

    #[test]
    fn destroying_a_view_frees_its_subtree() {
        let host = HeadlessHost::new();
        let text = host.create_text("hi");
        let m = host.create_component(&"tip", &Injector::new(&[]), &[vec![text]]);
        assert_eq!(host.text_content(m.root), "hi");
        host.destroy_view(m.view);
        host.destroy_view(m.view);
        assert!(!host.is_alive(m.root));
        assert!(!host.is_alive(text));
        assert!(host.is_destroyed(m.view));
        assert_eq!(host.live_views(), 0);
    }

    #[test]
    fn deferred_tasks_run_in_order() {
        let host = HeadlessHost::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let l = log.clone();
            host.defer(Box::new(move || l.borrow_mut().push(i)));
        }
        assert_eq!(host.pending_deferred(), 3);
        assert_eq!(host.run_deferred(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn stable_subscription_released_by_drop() {
        let host = HeadlessHost::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = host.on_stable(Box::new(move || c.set(c.get() + 1)));
        host.settle();
        drop(sub);
        host.settle();
        assert_eq!(count.get(), 1);
        assert_eq!(host.stable_subscriptions(), 0);
    }
}
