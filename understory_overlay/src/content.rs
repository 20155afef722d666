// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content resolution: turn a [`Content`] input into a [`ContentDescriptor`].
//!
//! ## Variants
//!
//! | Input                  | Descriptor                          | Owned by the descriptor      |
//! |------------------------|-------------------------------------|------------------------------|
//! | [`Content::None`]      | [`ContentDescriptor::None`]         | nothing                      |
//! | [`Content::Text`]      | [`ContentDescriptor::TextNode`]     | nothing (node is projected)  |
//! | [`Content::Template`]  | [`ContentDescriptor::TemplateNodes`]| the embedded view            |
//! | [`Content::Component`] | [`ContentDescriptor::NestedComponent`] | the nested component      |
//!
//! Resolution has no error path. Anything displayable becomes text through
//! [`Content::display`].

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::host::{Host, Injector, Mounted};

/// What to project into the overlay element.
pub enum Content<H: Host> {
    /// No content.
    None,
    /// Plain text, projected as a single text node.
    Text(String),
    /// A template, stamped into an embedded view.
    Template(H::Template),
    /// A component type, instantiated as a nested component.
    Component(H::ComponentType),
}

impl<H: Host> Content<H> {
    /// Coerce any displayable value to text content.
    pub fn display(value: impl fmt::Display) -> Self {
        Self::Text(value.to_string())
    }
}

impl<H: Host> Default for Content<H> {
    fn default() -> Self {
        Self::None
    }
}

impl<H: Host> From<&str> for Content<H> {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl<H: Host> From<String> for Content<H> {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<H: Host> fmt::Debug for Content<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Component(c) => f.debug_tuple("Component").field(c).finish(),
        }
    }
}

/// Resolved content for one shown period.
pub enum ContentDescriptor<H: Host> {
    /// No content.
    None,
    /// A single inert text node.
    TextNode(H::Node),
    /// Nodes of an embedded template view, plus the view for later release.
    TemplateNodes {
        /// Top-level nodes of the view.
        nodes: Vec<H::Node>,
        /// The embedded view; released after the outer element is destroyed.
        view: H::View,
    },
    /// A nested component whose change detection is forced before the outer element's and
    /// which is destroyed before the outer element.
    NestedComponent {
        /// The nested component's root node.
        nodes: Vec<H::Node>,
        /// The nested component.
        component: Mounted<H>,
    },
}

impl<H: Host> ContentDescriptor<H> {
    /// Node slots to project into the outer element.
    pub fn projected(&self) -> Vec<Vec<H::Node>> {
        match self {
            Self::None => Vec::new(),
            Self::TextNode(node) => vec![vec![node.clone()]],
            Self::TemplateNodes { nodes, .. } | Self::NestedComponent { nodes, .. } => {
                vec![nodes.clone()]
            }
        }
    }

    /// The nested component, for [`ContentDescriptor::NestedComponent`].
    pub fn component(&self) -> Option<&Mounted<H>> {
        match self {
            Self::NestedComponent { component, .. } => Some(component),
            _ => None,
        }
    }

    /// Split into the parts that need releasing: the nested component and the template view.
    pub(crate) fn into_owned_parts(self) -> (Option<Mounted<H>>, Option<H::View>) {
        match self {
            Self::None | Self::TextNode(_) => (None, None),
            Self::TemplateNodes { view, .. } => (None, Some(view)),
            Self::NestedComponent { component, .. } => (Some(component), None),
        }
    }
}

impl<H: Host> fmt::Debug for ContentDescriptor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::TextNode(n) => f.debug_tuple("TextNode").field(n).finish(),
            Self::TemplateNodes { nodes, view } => f
                .debug_struct("TemplateNodes")
                .field("nodes", nodes)
                .field("view", view)
                .finish(),
            Self::NestedComponent { nodes, component } => f
                .debug_struct("NestedComponent")
                .field("nodes", nodes)
                .field("component", component)
                .finish(),
        }
    }
}

/// Controller state consulted while resolving.
#[derive(Debug)]
pub struct ResolveContext<'a, H: Host> {
    /// Accumulated provider overrides.
    pub providers: &'a [H::Provider],
    /// Where template views are created; `None` creates them detached and registers them
    /// with the application root.
    pub view_container: Option<&'a H::Node>,
}

/// Resolve `content` against `host`.
pub fn resolve<H: Host>(
    host: &H,
    content: Content<H>,
    cx: &ResolveContext<'_, H>,
) -> ContentDescriptor<H> {
    match content {
        Content::None => ContentDescriptor::None,
        Content::Text(text) => ContentDescriptor::TextNode(host.create_text(&text)),
        Content::Template(template) => {
            let embedded = host.create_embedded_view(&template, cx.view_container);
            if cx.view_container.is_none() {
                host.attach_view(&embedded.view);
            }
            ContentDescriptor::TemplateNodes {
                nodes: embedded.root_nodes,
                view: embedded.view,
            }
        }
        Content::Component(ty) => {
            let injector = Injector::with_self(cx.providers);
            let component = host.create_component(&ty, &injector, &[]);
            host.attach_view(&component.view);
            ContentDescriptor::NestedComponent {
                nodes: vec![component.root.clone()],
                component,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{Call, HeadlessHost, NodeId};

    fn cx(view_container: Option<&NodeId>) -> ResolveContext<'_, HeadlessHost> {
        ResolveContext {
            providers: &[],
            view_container,
        }
    }

    #[test]
    fn none_resolves_to_nothing() {
        let host = HeadlessHost::new();
        let d = resolve(&host, Content::None, &cx(None));
        assert!(matches!(d, ContentDescriptor::None));
        assert!(d.projected().is_empty());
        assert!(host.journal().is_empty());
    }

    #[test]
    fn display_values_become_text_nodes() {
        let host = HeadlessHost::new();
        let d = resolve(&host, Content::display(42), &cx(None));
        let ContentDescriptor::TextNode(node) = &d else {
            panic!("expected a text node, got {d:?}");
        };
        assert_eq!(host.text_of(*node).as_deref(), Some("42"));
        assert_eq!(d.projected(), vec![vec![*node]]);
    }

    #[test]
    fn detached_template_is_registered_with_root() {
        let host = HeadlessHost::new();
        host.define_template("tip", &["a", "b"]);
        let d = resolve(&host, Content::Template("tip".into()), &cx(None));
        let ContentDescriptor::TemplateNodes { nodes, view } = &d else {
            panic!("expected template nodes, got {d:?}");
        };
        assert_eq!(nodes.len(), 2);
        assert!(host.is_attached_to_root(*view));
    }

    #[test]
    fn template_in_view_container_is_not_registered_with_root() {
        let host = HeadlessHost::new();
        let vc = host.create_element("vc", Some(host.body()));
        host.define_template("tip", &["a"]);
        let d = resolve(&host, Content::Template("tip".into()), &cx(Some(&vc)));
        let ContentDescriptor::TemplateNodes { view, .. } = &d else {
            panic!("expected template nodes, got {d:?}");
        };
        assert!(!host.is_attached_to_root(*view));
        assert_eq!(host.view_container_of(*view), Some(vc));
    }

    #[test]
    fn component_content_provides_itself_and_registers_with_root() {
        let host = HeadlessHost::new();
        let providers = ["theme".into()];
        let d = resolve(
            &host,
            Content::Component("body-cmp"),
            &ResolveContext {
                providers: &providers,
                view_container: None,
            },
        );
        let component = d.component().expect("nested component");
        assert!(host.is_attached_to_root(component.view));
        assert_eq!(d.projected(), vec![vec![component.root]]);
        assert!(host.journal().contains(&Call::Create {
            ty: "body-cmp",
            view: component.view,
            providers: providers.to_vec(),
            provides_self: true,
        }));
    }
}
