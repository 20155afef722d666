// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger-driven overlays with outside-click and escape dismissal.
//!
//! A dropdown toggles on click and closes on an outside click or the Escape key. A tooltip
//! follows hover (`mouseover:mouseout`).
//!
//! Run:
//! - `cargo run -p understory_demos --example overlay_triggers`

use understory_overlay::headless::HeadlessHost;
use understory_overlay::{Dismiss, Host, ListenOptions, OverlayController};

fn main() {
    let host = HeadlessHost::new();
    let menu_button = host.create_element("menu-button", Some(host.body()));
    let help_icon = host.create_element("help-icon", Some(host.body()));
    let elsewhere = host.create_element("content", Some(host.body()));

    let dropdown = OverlayController::new(host.clone(), menu_button);
    dropdown.attach("dropdown").listen(
        ListenOptions::parse("click")
            .unwrap()
            .dismiss(Dismiss::OUTSIDE_CLICK | Dismiss::ESCAPE),
    );

    let tooltip = OverlayController::new(host.clone(), help_icon);
    tooltip
        .attach("tooltip")
        .listen(ListenOptions::parse("hover").unwrap());

    host.click(menu_button);
    host.run_deferred();
    println!("after click on button: dropdown shown = {}", dropdown.is_shown());

    let root = dropdown.root_node().unwrap();
    println!(
        "dropdown element = {:?}, attached under {:?}",
        host.label_of(root),
        host.parent_of(&root).and_then(|p| host.label_of(p)),
    );
    host.click(menu_button);
    println!("after second click: dropdown shown = {}", dropdown.is_shown());

    host.click(menu_button);
    host.run_deferred();
    host.click(elsewhere);
    println!("after outside click: dropdown shown = {}", dropdown.is_shown());

    host.click(menu_button);
    host.run_deferred();
    host.press_key("Escape");
    println!("after Escape: dropdown shown = {}", dropdown.is_shown());

    host.dispatch(help_icon, "mouseover");
    println!("after mouseover: tooltip shown = {}", tooltip.is_shown());
    host.dispatch(help_icon, "mouseout");
    println!("after mouseout: tooltip shown = {}", tooltip.is_shown());

    dropdown.dispose();
    tooltip.dispose();
    println!("listeners after dispose = {}", host.listener_count());
}
