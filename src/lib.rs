//! mediaview: session orchestration for an overlay media viewer.
//!
//! A page of thumbnails becomes a list of `ItemRecord`s. The
//! `SessionController` opens one at a time, showing the on-page preview while
//! the sized rendition and the metadata load through cached providers, and
//! warms the neighbors in the background. `NavigationBridge` keeps the
//! location fragment in step with the viewer.
//!
//! Hosts supply the network (`FetchTransport`), the overlay (`Presenter`),
//! the location bar (`Location`) and durable flags (`FlagStore`).

pub mod config;
pub mod error;
pub mod flags;
pub mod logging;
pub mod models;
pub mod navigation;
pub mod preload;
pub mod presentation;
pub mod providers;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::ViewerConfig;
pub use error::{FetchError, FetchResult, FlagStoreError};
pub use flags::{FileFlagStore, FlagStore, MemoryFlagStore};
pub use models::{ItemHandle, ItemRecord, Placeholder, Size};
pub use navigation::{Gesture, NavigationBridge};
pub use preload::PreloadQueue;
pub use presentation::{LoadStage, Location, Presenter};
pub use providers::{MetadataProviders, ResourceCache, ThumbnailProvider};
pub use session::{NavigationOrigin, SessionController, SessionState, ViewState};
pub use transport::{ApiRequest, FetchTransport, ProgressSender};
