// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Positioning requests are sent only when the host's update cycle settles.
//!
//! Run:
//! - `cargo run -p understory_demos --example overlay_positioning`

use kurbo::Vec2;
use understory_overlay::headless::HeadlessHost;
use understory_overlay::{OverlayController, Placement, PositionOptions, ShowOptions, Surface};

fn main() {
    let host = HeadlessHost::new();
    let anchor = host.create_element("input", Some(host.body()));

    let popover = OverlayController::new(host.clone(), anchor);
    popover.attach("datepicker").to(Surface::Body).position(PositionOptions {
        target: None,
        attachment: Some(Placement::Bottom),
        offset: Some(Vec2::new(0.0, 4.0)),
    });

    popover.show(ShowOptions::default());
    println!("requests before settle = {}", host.positions().len());

    host.settle();
    for request in host.positions() {
        println!("{request:?}");
    }

    popover.hide();
    host.settle();
    println!("requests after hide + settle = {}", host.positions().len());
    println!("stable subscriptions = {}", host.stable_subscriptions());

    popover.dispose();
    println!("stable subscriptions after dispose = {}", host.stable_subscriptions());
}
