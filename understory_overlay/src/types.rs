// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration vocabulary: placements, named surfaces, containers, dismissal flags, state.
//!
//! ## Overview
//!
//! These types carry no host data except [`HostContainer::Node`]; they are plain values
//! that can be parsed from strings (and, with the `serde` feature, deserialized).

use core::fmt;
use core::str::FromStr;

use alloc::borrow::ToOwned;

use crate::error::{ParsePlacementError, ParseSurfaceError};

/// Lifecycle state of an [`OverlayController`](crate::controller::OverlayController).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum OverlayState {
    /// No element exists. Initial state, and the state after `hide` or `dispose`.
    #[default]
    Detached,
    /// An element instance exists and has been attached.
    Shown,
}

/// Placement hint forwarded to the positioning engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Placement {
    /// Above the anchor.
    Top,
    /// Below the anchor.
    Bottom,
    /// Left of the anchor.
    Left,
    /// Right of the anchor.
    Right,
    /// Let the positioning engine choose.
    Auto,
}

impl Placement {
    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = ParsePlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "auto" => Ok(Self::Auto),
            other => Err(ParsePlacementError(other.to_owned())),
        }
    }
}

/// A named, document-level surface that the host can resolve to a node.
///
/// Resolved through [`Host::surface`](crate::host::Host::surface) at attach time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Surface {
    /// The document body.
    Body,
}

impl Surface {
    /// Lowercase name, as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = ParseSurfaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "body" => Ok(Self::Body),
            other => Err(ParseSurfaceError(other.to_owned())),
        }
    }
}

/// Where the overlay element is attached when shown.
///
/// Selection order at attach time is explicit node, then named surface, then the
/// anchor's parent. If the chosen location cannot be resolved the element stays
/// unattached.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HostContainer<N> {
    /// Append next to the anchor, under the anchor's parent.
    AnchorParent,
    /// Append under an explicit node.
    Node(N),
    /// Append under a named surface.
    Surface(Surface),
}

impl<N> Default for HostContainer<N> {
    fn default() -> Self {
        Self::AnchorParent
    }
}

impl<N> HostContainer<N> {
    /// Returns `true` when the container is the document body.
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Surface(Surface::Body))
    }
}

impl<N> From<Surface> for HostContainer<N> {
    fn from(surface: Surface) -> Self {
        Self::Surface(surface)
    }
}

bitflags::bitflags! {
    /// Dismissal behaviors armed while the overlay is shown.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Dismiss: u8 {
        /// Hide when a click lands outside both the overlay and the anchor.
        const OUTSIDE_CLICK = 0b0000_0001;
        /// Hide when the escape key is pressed anywhere in the document.
        const ESCAPE        = 0b0000_0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_parses_known_names() {
        assert_eq!("top".parse::<Placement>(), Ok(Placement::Top));
        assert_eq!(" right ".parse::<Placement>(), Ok(Placement::Right));
        assert_eq!("auto".parse::<Placement>().map(Placement::as_str), Ok("auto"));
    }

    #[test]
    fn placement_rejects_unknown_name() {
        let err = "diagonal".parse::<Placement>().unwrap_err();
        assert_eq!(err.0, "diagonal");
    }

    #[test]
    fn surface_round_trips_through_display() {
        let s: Surface = "body".parse().unwrap();
        assert_eq!(alloc::format!("{s}"), "body");
        assert!("html".parse::<Surface>().is_err());
    }

    #[test]
    fn container_defaults_to_anchor_parent() {
        let c: HostContainer<u32> = HostContainer::default();
        assert_eq!(c, HostContainer::AnchorParent);
        assert!(!c.is_body());
        assert!(HostContainer::<u32>::from(Surface::Body).is_body());
        assert!(!HostContainer::Node(3_u32).is_body());
    }

    #[test]
    fn dismiss_defaults_to_nothing() {
        assert!(Dismiss::default().is_empty());
        let both = Dismiss::OUTSIDE_CLICK | Dismiss::ESCAPE;
        assert!(both.contains(Dismiss::ESCAPE));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn vocabulary_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Placement::Top).unwrap(), "\"top\"");
        assert_eq!(
            serde_json::from_str::<Placement>("\"left\"").unwrap(),
            Placement::Left
        );
        assert!(serde_json::from_str::<Placement>("\"diagonal\"").is_err());

        let both = Dismiss::OUTSIDE_CLICK | Dismiss::ESCAPE;
        let json = serde_json::to_string(&both).unwrap();
        assert_eq!(json, "\"OUTSIDE_CLICK | ESCAPE\"");
        assert_eq!(serde_json::from_str::<Dismiss>(&json).unwrap(), both);
        assert_eq!(
            serde_json::from_str::<Dismiss>("\"\"").unwrap(),
            Dismiss::empty()
        );

        assert_eq!(
            serde_json::from_str::<HostContainer<u32>>("\"anchor_parent\"").unwrap(),
            HostContainer::AnchorParent
        );
        assert_eq!(
            serde_json::from_str::<HostContainer<u32>>(r#"{"surface":"body"}"#).unwrap(),
            HostContainer::Surface(Surface::Body)
        );
        assert_eq!(
            serde_json::from_str::<HostContainer<u32>>(r#"{"node":7}"#).unwrap(),
            HostContainer::Node(7)
        );
    }
}
