// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors for the textual configuration vocabulary.
//!
//! Lifecycle operations never fail; only parsing of trigger specs, placements,
//! and surface names can be rejected.

use alloc::string::String;

use thiserror::Error;

/// A trigger spec could not be parsed.
///
/// Returned by [`Triggers::parse`](crate::triggers::Triggers::parse).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriggerParseError {
    /// An entry named more than one close event, e.g. `"click:blur:focus"`.
    #[error("trigger `{0}` names more than one close event")]
    TooManyEvents(String),
    /// An entry had an empty open or close event name, e.g. `":blur"`.
    #[error("trigger `{0}` has an empty event name")]
    EmptyEvent(String),
    /// A `manual` trigger was combined with other triggers, or given more than once.
    #[error("a manual trigger cannot be combined with other triggers")]
    MixedManual,
}

/// An unknown placement name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown placement `{0}`, expected top, bottom, left, right or auto")]
pub struct ParsePlacementError(pub String);

/// An unknown named surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown surface `{0}`, expected body")]
pub struct ParseSurfaceError(pub String);
