//! The viewer session.
//!
//! This module provides:
//! - `SessionController` - Drives the open/placeholder/sharp/closed state machine
//! - `SessionState` - What the controller knows about the current item
//! - `plan_placeholder` - Blowup policy for the on-page preview
//! - `ThumbnailWidthCalculator` - Display box to rendition width

pub mod controller;
mod events;
pub mod placeholder;
pub mod sizing;
pub mod state;

pub use controller::{FragmentUpdate, NavigationOrigin, SessionController};
pub use placeholder::{plan_placeholder, PlaceholderPlan};
pub use sizing::ThumbnailWidthCalculator;
pub use state::{SessionState, ViewState};
