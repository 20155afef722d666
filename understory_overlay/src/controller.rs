// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The overlay lifecycle controller.
//!
//! ## Overview
//!
//! An [`OverlayController`] owns one overlay site: a component type to instantiate, an anchor
//! node, a container to attach to, provider overrides, and an optional placement hint. It
//! moves between two states:
//!
//! ```text
//!             show()                      hide() / dispose()
//!  Detached ───────────► Shown ───────────────────────────────► Detached
//!     ▲                   │  show() again: no new element,
//!     │                   │  dismissal re-armed
//!     └───────────────────┘
//! ```
//!
//! ## Ordering
//!
//! - `before_show` fires before anything is instantiated.
//! - `shown` fires after attachment and forced change detection (nested content first).
//! - `before_hide` fires before the element is detached.
//! - `hidden` fires after teardown: nested component, then outer element, then the content
//!   view.
//! - Dismissal listeners are armed from a deferred task, so the event that caused `show` never
//!   reaches them. A task that runs after a later `hide` does nothing.
//! - Positioning is only requested from the host's stable signal.
//!
//! ## Re-entrancy
//!
//! Lifecycle listeners and trigger handlers may call back into the controller. No internal
//! borrow is held while an event is emitted or a host callback may run. A `show` issued while
//! another `show` is still instantiating returns `None` and creates nothing, and a `dispose`
//! issued from `before_show` or from a props closure cancels the pending show. `hide`
//! re-checks the state after emitting `before_hide`.
//!
//! ## Example
//!
//! ```
//! use understory_overlay::controller::{OverlayController, ShowOptions};
//! use understory_overlay::headless::HeadlessHost;
//! use understory_overlay::types::Surface;
//!
//! let host = HeadlessHost::new();
//! let anchor = host.create_element("button", Some(host.body()));
//!
//! let tooltip = OverlayController::new(host.clone(), anchor);
//! tooltip.attach("tooltip").to(Surface::Body);
//!
//! let instance = tooltip.show(ShowOptions::content("Hello")).unwrap();
//! assert_eq!(instance.borrow()["component"], "tooltip");
//! assert_eq!(host.text_content(host.body()), "Hello");
//!
//! tooltip.hide();
//! assert!(tooltip.instance().is_none());
//! assert_eq!(host.text_content(host.body()), "");
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Vec2;
use log::{debug, trace, warn};

use crate::content::{self, Content, ContentDescriptor, ResolveContext};
use crate::error::TriggerParseError;
use crate::events::{Emitter, Lifecycle};
use crate::host::{Host, Injector, Mounted, PositionRequest};
use crate::positioning::{PositionOptions, PositioningBridge};
use crate::subscription::Subscription;
use crate::triggers::{self, Ack, TriggerBinding, TriggerHandlers, Triggers};
use crate::types::{Dismiss, HostContainer, OverlayState, Placement};

/// Options for a single [`OverlayController::show`] call.
pub struct ShowOptions<H: Host> {
    /// Content projected into the element.
    pub content: Content<H>,
    /// Applied to the element's public surface right after instantiation.
    pub props: Option<Box<dyn FnOnce(&H::Instance)>>,
}

impl<H: Host> ShowOptions<H> {
    /// Show with `content` and no props.
    pub fn content(content: impl Into<Content<H>>) -> Self {
        Self {
            content: content.into(),
            props: None,
        }
    }

    /// Apply `props` to the element's public surface after instantiation.
    pub fn with_props(mut self, props: impl FnOnce(&H::Instance) + 'static) -> Self {
        self.props = Some(Box::new(props));
        self
    }
}

impl<H: Host> Default for ShowOptions<H> {
    fn default() -> Self {
        Self {
            content: Content::None,
            props: None,
        }
    }
}

impl<H: Host> fmt::Debug for ShowOptions<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowOptions")
            .field("content", &self.content)
            .field("props", &self.props.is_some())
            .finish()
    }
}

/// Options for [`OverlayController::listen`].
pub struct ListenOptions<H: Host> {
    /// Trigger spec; `None` keeps the spec of a previous `listen`.
    pub triggers: Option<Triggers>,
    /// Node the triggers are installed on; defaults to the anchor.
    pub target: Option<H::Node>,
    /// Dismissal behaviors armed on every show.
    pub dismiss: Dismiss,
    /// Replaces the controller's own show when a trigger fires.
    pub show: Option<Rc<dyn Fn()>>,
    /// Replaces the controller's own hide when a trigger or dismissal fires.
    pub hide: Option<Rc<dyn Fn()>>,
}

impl<H: Host> ListenOptions<H> {
    /// Listen for `triggers` on the anchor.
    pub fn new(triggers: Triggers) -> Self {
        Self {
            triggers: Some(triggers),
            ..Self::default()
        }
    }

    /// Parse `spec` and listen for it on the anchor.
    ///
    /// # Errors
    ///
    /// Returns the [`TriggerParseError`] of a malformed spec.
    pub fn parse(spec: &str) -> Result<Self, TriggerParseError> {
        Ok(Self::new(spec.parse()?))
    }

    /// Install the triggers on `target` instead of the anchor.
    pub fn target(mut self, target: H::Node) -> Self {
        self.target = Some(target);
        self
    }

    /// Arm `dismiss` behaviors while shown.
    pub fn dismiss(mut self, dismiss: Dismiss) -> Self {
        self.dismiss = dismiss;
        self
    }

    /// Call `show` instead of the controller's own show.
    pub fn on_show(mut self, show: impl Fn() + 'static) -> Self {
        self.show = Some(Rc::new(show));
        self
    }

    /// Call `hide` instead of the controller's own hide.
    pub fn on_hide(mut self, hide: impl Fn() + 'static) -> Self {
        self.hide = Some(Rc::new(hide));
        self
    }
}

impl<H: Host> Default for ListenOptions<H> {
    fn default() -> Self {
        Self {
            triggers: None,
            target: None,
            dismiss: Dismiss::empty(),
            show: None,
            hide: None,
        }
    }
}

impl<H: Host> fmt::Debug for ListenOptions<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenOptions")
            .field("triggers", &self.triggers)
            .field("target", &self.target)
            .field("dismiss", &self.dismiss)
            .field("show", &self.show.is_some())
            .field("hide", &self.hide.is_some())
            .finish()
    }
}

/// The element and content of one shown period.
struct Live<H: Host> {
    element: Mounted<H>,
    content: ContentDescriptor<H>,
}

struct Inner<H: Host> {
    component: Option<H::ComponentType>,
    anchor: H::Node,
    container: HostContainer<H::Node>,
    view_container: Option<H::Node>,
    providers: Vec<H::Provider>,
    attachment: Option<Placement>,
    offset: Vec2,
    triggers: Triggers,
    dismiss: Dismiss,
    hide_override: Option<Rc<dyn Fn()>>,
    live: Option<Live<H>>,
    binding: Option<TriggerBinding<H>>,
    dismissal: Subscription,
    positioning: PositioningBridge,
    inline_views: Vec<H::View>,
}

struct Shared<H: Host> {
    host: Rc<H>,
    inner: RefCell<Inner<H>>,
    events: Lifecycle<H::Instance>,
    // Bumped on every dismissal arming and every hide; deferred arming only runs if it
    // still matches.
    arm_generation: Cell<u64>,
    // Set while `show` is between `before_show` and storing the live element.
    showing: Cell<bool>,
    // Bumped by every `dispose`; an in-flight `show` that observes a change backs out.
    dispose_epoch: Cell<u64>,
}

/// Lifecycle controller for one overlay site.
///
/// Dropping the controller disposes it.
pub struct OverlayController<H: Host> {
    shared: Rc<Shared<H>>,
}

impl<H: Host> fmt::Debug for OverlayController<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.borrow();
        f.debug_struct("OverlayController")
            .field("state", &self.state())
            .field("component", &inner.component)
            .field("anchor", &inner.anchor)
            .field("container", &inner.container)
            .field("attachment", &inner.attachment)
            .field("providers", &inner.providers.len())
            .field("listening", &inner.binding.is_some())
            .finish_non_exhaustive()
    }
}

impl<H: Host> OverlayController<H> {
    /// Create a detached controller for an overlay anchored at `anchor`.
    pub fn new(host: H, anchor: H::Node) -> Self {
        Self {
            shared: Rc::new(Shared {
                host: Rc::new(host),
                inner: RefCell::new(Inner {
                    component: None,
                    anchor,
                    container: HostContainer::AnchorParent,
                    view_container: None,
                    providers: Vec::new(),
                    attachment: None,
                    offset: Vec2::ZERO,
                    triggers: Triggers::default(),
                    dismiss: Dismiss::empty(),
                    hide_override: None,
                    live: None,
                    binding: None,
                    dismissal: Subscription::empty(),
                    positioning: PositioningBridge::new(),
                    inline_views: Vec::new(),
                }),
                events: Lifecycle::new(),
                arm_generation: Cell::new(0),
                showing: Cell::new(false),
                dispose_epoch: Cell::new(0),
            }),
        }
    }

    /// Set the component type instantiated by [`OverlayController::show`].
    pub fn attach(&self, component: H::ComponentType) -> &Self {
        self.shared.inner.borrow_mut().component = Some(component);
        self
    }

    /// Set where the element is attached when shown.
    pub fn to(&self, container: impl Into<HostContainer<H::Node>>) -> &Self {
        self.shared.inner.borrow_mut().container = container.into();
        self
    }

    /// Create template content inside `node` instead of detached views.
    pub fn with_view_container(&self, node: H::Node) -> &Self {
        self.shared.inner.borrow_mut().view_container = Some(node);
        self
    }

    /// Update anchor, placement hint, or offset. Unset options keep their value.
    pub fn position(&self, opts: PositionOptions<H::Node>) -> &Self {
        let mut inner = self.shared.inner.borrow_mut();
        if let Some(target) = opts.target {
            inner.anchor = target;
        }
        if let Some(attachment) = opts.attachment {
            inner.attachment = Some(attachment);
        }
        if let Some(offset) = opts.offset {
            inner.offset = offset;
        }
        self
    }

    /// Add a provider override for every later instantiation.
    pub fn provide(&self, provider: H::Provider) -> &Self {
        self.shared.inner.borrow_mut().providers.push(provider);
        self
    }

    /// Stamp `template` into `container` once, outside the show/hide cycle.
    ///
    /// The view lives until [`OverlayController::dispose`].
    pub fn attach_inline(&self, container: H::Node, template: &H::Template) -> &Self {
        let embedded = self
            .shared
            .host
            .create_embedded_view(template, Some(&container));
        self.shared
            .inner
            .borrow_mut()
            .inline_views
            .push(embedded.view);
        self
    }

    /// Bind show/hide triggers and dismissal behaviors.
    ///
    /// Calling `listen` again replaces the previous binding.
    pub fn listen(&self, opts: ListenOptions<H>) -> &Self {
        self.shared.listen(opts);
        self
    }

    /// Show the overlay and return the element's public surface.
    ///
    /// Returns `None` if no component type was attached.
    pub fn show(&self, opts: ShowOptions<H>) -> Option<H::Instance> {
        self.shared.show(opts)
    }

    /// Hide the overlay. No-op while detached.
    pub fn hide(&self) -> &Self {
        self.shared.hide();
        self
    }

    /// Hide if shown, otherwise show with default options.
    pub fn toggle(&self) {
        self.shared.toggle();
    }

    /// Hide, then release the positioning subscription, trigger binding, and inline views.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OverlayState {
        if self.shared.is_shown() {
            OverlayState::Shown
        } else {
            OverlayState::Detached
        }
    }

    /// Returns `true` while an element exists.
    pub fn is_shown(&self) -> bool {
        self.shared.is_shown()
    }

    /// The element's public surface while shown.
    pub fn instance(&self) -> Option<H::Instance> {
        self.shared.instance()
    }

    /// The nested content component's public surface while shown with component content.
    pub fn inner_component(&self) -> Option<H::Instance> {
        let inner = self.shared.inner.borrow();
        let live = inner.live.as_ref()?;
        live.content.component().map(|c| c.instance.clone())
    }

    /// The element's root node while shown.
    pub fn root_node(&self) -> Option<H::Node> {
        let inner = self.shared.inner.borrow();
        inner.live.as_ref().map(|l| l.element.root.clone())
    }

    /// Emitted before a new element is instantiated.
    pub fn on_before_show(&self) -> &Emitter<()> {
        &self.shared.events.before_show
    }

    /// Emitted with the element's public surface once it is attached.
    pub fn on_shown(&self) -> &Emitter<H::Instance> {
        &self.shared.events.shown
    }

    /// Emitted with the element's public surface before it is detached.
    pub fn on_before_hide(&self) -> &Emitter<H::Instance> {
        &self.shared.events.before_hide
    }

    /// Emitted after teardown completes.
    pub fn on_hidden(&self) -> &Emitter<()> {
        &self.shared.events.hidden
    }
}

impl<H: Host> Drop for OverlayController<H> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl<H: Host> Shared<H> {
    fn is_shown(&self) -> bool {
        self.inner.borrow().live.is_some()
    }

    fn instance(&self) -> Option<H::Instance> {
        let inner = self.inner.borrow();
        inner.live.as_ref().map(|l| l.element.instance.clone())
    }

    fn show(self: &Rc<Self>, opts: ShowOptions<H>) -> Option<H::Instance> {
        self.ensure_positioning();

        if let Some(instance) = self.instance() {
            self.schedule_dismissal();
            return Some(instance);
        }
        if self.showing.get() {
            trace!("show re-entered while instantiating, ignored");
            return None;
        }

        let Some(component) = self.inner.borrow().component.clone() else {
            warn!("show called before a component type was attached");
            return None;
        };

        self.showing.set(true);
        let epoch = self.dispose_epoch.get();
        self.events.before_show.emit(&());
        if self.dispose_epoch.get() != epoch {
            debug!("disposed during before_show, nothing instantiated");
            self.showing.set(false);
            return None;
        }

        let (providers, view_container) = {
            let inner = self.inner.borrow();
            (inner.providers.clone(), inner.view_container.clone())
        };
        let content = content::resolve(
            &*self.host,
            opts.content,
            &ResolveContext {
                providers: &providers,
                view_container: view_container.as_ref(),
            },
        );

        let injector = Injector::new(&providers);
        let element = self
            .host
            .create_component(&component, &injector, &content.projected());
        self.host.attach_view(&element.view);

        if let Some(props) = opts.props {
            props(&element.instance);
        }

        self.attach_root(&element.root);

        if let Some(nested) = content.component() {
            self.host.mark_for_check(&nested.view);
            self.host.detect_changes(&nested.view);
        }
        self.host.mark_for_check(&element.view);
        self.host.detect_changes(&element.view);

        self.showing.set(false);
        if self.dispose_epoch.get() != epoch {
            debug!("disposed while instantiating, releasing element");
            self.release(element, content);
            return None;
        }

        let instance = element.instance.clone();
        self.inner.borrow_mut().live = Some(Live { element, content });
        debug!("overlay shown: {component:?}");

        self.events.shown.emit(&instance);
        self.schedule_dismissal();
        Some(instance)
    }

    fn attach_root(&self, root: &H::Node) {
        let (container, anchor) = {
            let inner = self.inner.borrow();
            (inner.container.clone(), inner.anchor.clone())
        };
        let parent = match container {
            HostContainer::Node(node) => Some(node),
            HostContainer::Surface(surface) => self.host.surface(surface),
            HostContainer::AnchorParent => self.host.parent_of(&anchor),
        };
        match parent {
            Some(parent) => self.host.append_child(&parent, root),
            None => debug!("no container available, overlay left unattached"),
        }
    }

    fn hide(&self) {
        let Some(instance) = self.instance() else {
            return;
        };
        self.events.before_hide.emit(&instance);

        // A `before_hide` listener may have hidden the overlay already.
        let Some(Live { element, content }) = self.inner.borrow_mut().live.take() else {
            return;
        };

        self.release(element, content);
        self.cancel_dismissal();
        debug!("overlay hidden");
        self.events.hidden.emit(&());
    }

    /// Detach `element`, then destroy the nested component, the element, and the content view.
    fn release(&self, element: Mounted<H>, content: ContentDescriptor<H>) {
        self.host.remove_child(&element.root);
        let (nested, content_view) = content.into_owned_parts();
        if let Some(nested) = nested {
            self.host.destroy_view(nested.view);
        }
        self.host.destroy_view(element.view);
        if let Some(view) = content_view {
            self.host.destroy_view(view);
        }
    }

    fn toggle(self: &Rc<Self>) {
        if self.is_shown() {
            self.hide();
        } else {
            self.show(ShowOptions::default());
        }
    }

    fn dispose(&self) {
        self.dispose_epoch.set(self.dispose_epoch.get() + 1);
        if self.is_shown() {
            self.hide();
        }
        self.cancel_dismissal();
        let (positioning, binding, inline_views) = {
            let mut inner = self.inner.borrow_mut();
            (
                inner.positioning.take(),
                inner.binding.take(),
                core::mem::take(&mut inner.inline_views),
            )
        };
        drop(positioning);
        if let Some(binding) = binding {
            binding.unbind();
        }
        for view in inline_views {
            self.host.destroy_view(view);
        }
    }

    fn ensure_positioning(self: &Rc<Self>) {
        {
            let inner = self.inner.borrow();
            if inner.attachment.is_none() || inner.positioning.is_active() {
                return;
            }
        }
        let weak = Rc::downgrade(self);
        let subscription = PositioningBridge::subscribe(&self.host, move || {
            weak.upgrade().and_then(|shared| shared.position_request())
        });
        self.inner.borrow_mut().positioning.install(subscription);
    }

    fn position_request(&self) -> Option<PositionRequest<H::Node>> {
        let inner = self.inner.borrow();
        let live = inner.live.as_ref()?;
        Some(PositionRequest {
            element: live.element.root.clone(),
            target: inner.anchor.clone(),
            attachment: inner.attachment?,
            offset: inner.offset,
            append_to_body: inner.container.is_body(),
        })
    }

    fn schedule_dismissal(self: &Rc<Self>) {
        if !self.is_shown() {
            return;
        }
        let generation = self.arm_generation.get() + 1;
        self.arm_generation.set(generation);
        let weak = Rc::downgrade(self);
        self.host.defer(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if shared.arm_generation.get() != generation || !shared.is_shown() {
                trace!("stale dismissal arming skipped");
                return;
            }
            shared.arm_dismissal();
        }));
    }

    fn arm_dismissal(self: &Rc<Self>) {
        let (dismiss, watched, previous) = {
            let mut inner = self.inner.borrow_mut();
            let Some(live) = inner.live.as_ref() else {
                return;
            };
            let watched = vec![live.element.root.clone(), inner.anchor.clone()];
            (
                inner.dismiss,
                watched,
                core::mem::take(&mut inner.dismissal),
            )
        };
        drop(previous);
        if dismiss.is_empty() {
            return;
        }
        let subscription = triggers::arm_dismissal(&self.host, watched, dismiss, self.hide_handler());
        self.inner.borrow_mut().dismissal = subscription;
    }

    fn cancel_dismissal(&self) {
        self.arm_generation.set(self.arm_generation.get() + 1);
        let previous = core::mem::take(&mut self.inner.borrow_mut().dismissal);
        drop(previous);
    }

    fn hide_handler(self: &Rc<Self>) -> Rc<dyn Fn()> {
        if let Some(custom) = self.inner.borrow().hide_override.clone() {
            return custom;
        }
        let weak = Rc::downgrade(self);
        Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.hide();
            }
        })
    }

    fn listen(self: &Rc<Self>, opts: ListenOptions<H>) {
        let ListenOptions {
            triggers,
            target,
            dismiss,
            show,
            hide,
        } = opts;
        let (target, triggers, previous) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(triggers) = triggers {
                inner.triggers = triggers;
            }
            inner.dismiss = dismiss;
            inner.hide_override = hide;
            (
                target.unwrap_or_else(|| inner.anchor.clone()),
                inner.triggers.clone(),
                inner.binding.take(),
            )
        };
        if let Some(previous) = previous {
            previous.unbind();
        }

        let hide = self.hide_handler();
        let weak = Rc::downgrade(self);
        let show: Rc<dyn Fn(&Ack<H>)> = Rc::new(move |ack: &Ack<H>| {
            match &show {
                Some(custom) => custom(),
                None => {
                    if let Some(shared) = weak.upgrade() {
                        shared.show(ShowOptions::default());
                    }
                }
            }
            ack.acknowledge();
        });
        let toggle: Rc<dyn Fn(&Ack<H>)> = {
            let weak = Rc::downgrade(self);
            let show = Rc::clone(&show);
            let hide = Rc::clone(&hide);
            Rc::new(move |ack: &Ack<H>| {
                let shown = weak.upgrade().is_some_and(|shared| shared.is_shown());
                if shown {
                    hide();
                } else {
                    show(ack);
                }
            })
        };

        debug!("listening for triggers `{triggers}`");
        let binding = triggers::bind(
            &self.host,
            target,
            &triggers,
            TriggerHandlers { show, hide, toggle },
        );
        self.inner.borrow_mut().binding = Some(binding);
    }
}
