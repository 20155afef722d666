// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Show and hide an overlay with each kind of content.
//!
//! Run:
//! - `cargo run -p understory_demos --example overlay_basics`

use understory_overlay::headless::{HeadlessHost, Props};
use understory_overlay::{Content, Host, OverlayController, ShowOptions, Surface};

fn main() {
    let host = HeadlessHost::new();
    let toolbar = host.create_element("toolbar", Some(host.body()));
    let button = host.create_element("button", Some(toolbar));

    let overlay = OverlayController::new(host.clone(), button);
    overlay.attach("popover").to(Surface::Body).provide("theme".to_string());

    overlay
        .on_before_show()
        .subscribe(|_: &()| println!("  before_show"));
    overlay
        .on_shown()
        .subscribe(|p: &Props| println!("  shown: {:?}", p.borrow()));
    overlay
        .on_before_hide()
        .subscribe(|_: &Props| println!("  before_hide"));
    overlay.on_hidden().subscribe(|_: &()| println!("  hidden"));

    println!("text content:");
    overlay.show(ShowOptions::content("Hello").with_props(|p: &Props| {
        p.borrow_mut().insert("title".into(), "Greeting".into());
    }));
    let root = overlay.root_node().unwrap();
    println!("  body text = {:?}", host.text_content(host.body()));
    println!("  parent of element = {:?}", host.parent_of(&root));
    overlay.hide();

    println!("template content:");
    host.define_template("menu", &["item", "item", "item"]);
    overlay.show(ShowOptions::content(Content::Template("menu".to_string())));
    let root = overlay.root_node().unwrap();
    println!("  element children = {}", host.children_of(root).len());
    overlay.hide();

    println!("component content:");
    overlay.show(ShowOptions::content(Content::Component("form")));
    println!("  inner component = {:?}", overlay.inner_component());
    overlay.hide();

    println!("live views after teardown = {}", host.live_views());
    for call in host.journal() {
        println!("  {call:?}");
    }
}
