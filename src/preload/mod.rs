//! Neighbor preloading.
//!
//! This module provides:
//! - `preload_order` - Which neighbors to warm, nearest first, next before previous
//! - `PreloadQueue` - Cancellable queue of warm-up tasks with bounded concurrency

pub mod order;
pub mod queue;

pub use order::preload_order;
pub use queue::{PreloadQueue, PreloadTask};
