// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_overlay --heading-base-level=0

//! Understory Overlay: a lifecycle controller for tooltips, popovers, dropdowns, and other
//! transient UI elements.
//!
//! An overlay is created on demand, attached to a container, shown and hidden in response to
//! trigger events, dismissed by outside interaction, kept positioned against an anchor, and
//! torn down in a fixed order. This crate owns that state machine and nothing else.
//!
//! ## Not a renderer
//!
//! The view engine, event system, scheduler, and positioning engine are supplied by the
//! embedder through the [`Host`] trait. The controller only decides *when* to call them and
//! in which order. Geometry is never computed here; positioning requests are forwarded to the
//! host once its update cycle settles.
//!
//! ## API overview
//!
//! - [`OverlayController`]: one per overlay site. Configure it with
//!   [`attach`](OverlayController::attach), [`to`](OverlayController::to),
//!   [`position`](OverlayController::position), and [`provide`](OverlayController::provide),
//!   then drive it with [`show`](OverlayController::show),
//!   [`hide`](OverlayController::hide), [`toggle`](OverlayController::toggle), or trigger
//!   events bound by [`listen`](OverlayController::listen).
//! - [`Content`]: what goes inside the element: text, a template, or another component.
//! - [`Triggers`]: parsed trigger specs such as `"click"`, `"hover"`, or `"focusin:focusout"`.
//! - [`Dismiss`]: outside-click and escape-key dismissal flags.
//! - [`Host`]: the embedder's services.
//! - [`headless::HeadlessHost`]: an in-memory host for tests and demos (`headless` feature).
//!
//! ## Lifecycle events
//!
//! Every controller exposes four [`Emitter`]s: `before_show`, `shown`, `before_hide`, and
//! `hidden`. Listeners run synchronously, in registration order, and may call back into the
//! controller.
//!
//! ## Example
//!
//! ```rust
//! use understory_overlay::{Dismiss, ListenOptions, OverlayController};
//! use understory_overlay::headless::HeadlessHost;
//!
//! let host = HeadlessHost::new();
//! let button = host.create_element("button", Some(host.body()));
//!
//! let popover = OverlayController::new(host.clone(), button);
//! popover.attach("popover");
//! popover.listen(ListenOptions::parse("click").unwrap().dismiss(Dismiss::OUTSIDE_CLICK));
//!
//! // The first click shows the popover.
//! host.click(button);
//! assert!(popover.is_shown());
//!
//! // Dismissal is armed once the current event has finished.
//! host.run_deferred();
//!
//! // A click elsewhere dismisses it.
//! host.click(host.body());
//! assert!(!popover.is_shown());
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod content;
pub mod controller;
pub mod error;
pub mod events;
#[cfg(any(test, feature = "headless"))]
pub mod headless;
pub mod host;
pub mod positioning;
pub mod subscription;
pub mod triggers;
pub mod types;

pub use content::{Content, ContentDescriptor};
pub use controller::{ListenOptions, OverlayController, ShowOptions};
pub use error::{ParsePlacementError, ParseSurfaceError, TriggerParseError};
pub use events::{Emitter, ListenerId};
pub use host::{EventTarget, Host, HostEvent, Injector, Mounted, PositionRequest};
pub use positioning::PositionOptions;
pub use subscription::Subscription;
pub use triggers::{Trigger, Triggers};
pub use types::{Dismiss, HostContainer, OverlayState, Placement, Surface};
