//! Location fragment and gesture handling.
//!
//! This module provides:
//! - `NavigationBridge` - Routes fragment changes and gestures into the session
//! - `parse_fragment` / `format_fragment` - The `#mediaviewer/<item>` protocol
//! - `Gesture` - Key bindings for next, previous, close and fullscreen

pub mod bridge;
pub mod fragment;
pub mod gestures;

pub use bridge::NavigationBridge;
pub use fragment::{format_fragment, parse_fragment, FragmentTarget, CLOSED_FRAGMENT};
pub use gestures::Gesture;
