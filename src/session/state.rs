use crate::error::FetchError;
use crate::models::{ItemHandle, ThumbnailWidth};
use crate::presentation::LoadStage;

/// Visual state of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Closed,
    /// Loads for the current item are running, nothing shown yet.
    Opening,
    PlaceholderShown,
    SharpShown,
}

/// Everything the controller tracks about the open viewer.
///
/// Only the controller mutates this, on its own task. Item fields are reset
/// on every navigation; `fullscreen` survives switching items.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub view: ViewState,
    pub current: Option<ItemHandle>,
    pub current_index: Option<usize>,
    /// Bumped on every navigation and on close; load events carry the value
    /// they were started under.
    pub generation: u64,
    /// Width the current thumbnail load was issued for.
    pub width: Option<ThumbnailWidth>,
    pub sharp_shown: bool,
    pub blurred_shown: bool,
    pub metadata_ready: bool,
    pub thumbnail_ready: bool,
    pub listening_scroll: bool,
    pub scrolled: bool,
    pub fullscreen: bool,
    pub error: Option<(LoadStage, FetchError)>,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        self.view != ViewState::Closed
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.is_open() && self.generation == generation
    }

    /// Start loading `handle`, discarding everything about the previous item.
    pub(crate) fn begin_item(&mut self, handle: ItemHandle, index: usize) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.view = ViewState::Opening;
        self.current = Some(handle);
        self.current_index = Some(index);
        self.clear_item_flags();
        self.generation
    }

    pub(crate) fn close(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.view = ViewState::Closed;
        self.current = None;
        self.current_index = None;
        self.fullscreen = false;
        self.clear_item_flags();
    }

    fn clear_item_flags(&mut self) {
        self.width = None;
        self.sharp_shown = false;
        self.blurred_shown = false;
        self.metadata_ready = false;
        self.thumbnail_ready = false;
        self.listening_scroll = false;
        self.scrolled = false;
        self.error = None;
    }
}
