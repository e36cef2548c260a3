//! Session orchestration.
//!
//! Navigation methods are synchronous: they update `SessionState`, call the
//! presenter and spawn the loads for the new item. Loads report back over a
//! channel as `LoadEvent`s tagged with the generation they were started
//! under, and `process_next` applies them. An event whose generation is no
//! longer current belongs to an item the user has navigated away from and is
//! dropped.
//!
//! All methods that start loads must run inside a tokio runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::events::LoadEvent;
use super::placeholder::plan_placeholder;
use super::sizing::ThumbnailWidthCalculator;
use super::state::{SessionState, ViewState};
use crate::config::ViewerConfig;
use crate::error::{FetchError, FetchResult};
use crate::flags::{FlagStore, HAS_OPENED_METADATA};
use crate::models::{ItemHandle, ItemInfo, ItemRecord, MetadataBundle, Thumbnail, ThumbnailWidth};
use crate::preload::{preload_order, PreloadQueue};
use crate::presentation::{LoadStage, Presenter};
use crate::providers::{MetadataProviders, ThumbnailProvider};
use crate::transport::FetchTransport;

/// What caused a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOrigin {
    /// A gesture or host call. The location fragment is updated to match.
    User,
    /// The location fragment changed. Writing it back would echo.
    FragmentChange,
}

/// A location change the controller wants reflected in the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentUpdate {
    Show(ItemHandle),
    Clear,
}

pub struct SessionController {
    items: Vec<ItemRecord>,
    metadata: Arc<MetadataProviders>,
    thumbnails: Arc<ThumbnailProvider>,
    presenter: Box<dyn Presenter>,
    flags: Arc<dyn FlagStore>,
    config: ViewerConfig,
    widths: ThumbnailWidthCalculator,
    state: SessionState,
    event_tx: async_channel::Sender<LoadEvent>,
    event_rx: async_channel::Receiver<LoadEvent>,
    fragment_tx: flume::Sender<FragmentUpdate>,
    fragment_rx: flume::Receiver<FragmentUpdate>,
    metadata_preload: Option<PreloadQueue>,
    thumbnail_preload: Option<PreloadQueue>,
}

impl SessionController {
    pub fn new(
        items: Vec<ItemRecord>,
        transport: Arc<dyn FetchTransport>,
        presenter: Box<dyn Presenter>,
        flags: Arc<dyn FlagStore>,
        config: ViewerConfig,
    ) -> Self {
        let metadata = Arc::new(MetadataProviders::new(Arc::clone(&transport), &config));
        let thumbnails = Arc::new(ThumbnailProvider::new(transport));
        Self::with_providers(items, metadata, thumbnails, presenter, flags, config)
    }

    /// Build a controller over providers shared with something else, such as
    /// a second session on the same page.
    pub fn with_providers(
        items: Vec<ItemRecord>,
        metadata: Arc<MetadataProviders>,
        thumbnails: Arc<ThumbnailProvider>,
        presenter: Box<dyn Presenter>,
        flags: Arc<dyn FlagStore>,
        config: ViewerConfig,
    ) -> Self {
        let (event_tx, event_rx) = async_channel::unbounded();
        let (fragment_tx, fragment_rx) = flume::unbounded();

        info!(items = items.len(), "Created viewer session");

        Self {
            items,
            metadata,
            thumbnails,
            presenter,
            flags,
            widths: ThumbnailWidthCalculator::from_config(&config),
            config,
            state: SessionState::default(),
            event_tx,
            event_rx,
            fragment_tx,
            fragment_rx,
            metadata_preload: None,
            thumbnail_preload: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn index_of(&self, handle: &ItemHandle) -> Option<usize> {
        self.items.iter().position(|item| &item.handle == handle)
    }

    pub fn current_item(&self) -> Option<&ItemRecord> {
        self.state.current_index.and_then(|i| self.items.get(i))
    }

    pub fn metadata(&self) -> &Arc<MetadataProviders> {
        &self.metadata
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailProvider> {
        &self.thumbnails
    }

    /// Receiver of fragment updates, for hosts that sync the location themselves.
    pub fn fragment_updates(&self) -> flume::Receiver<FragmentUpdate> {
        self.fragment_rx.clone()
    }

    /// Drain the fragment updates queued so far.
    pub fn take_fragment_updates(&self) -> Vec<FragmentUpdate> {
        self.fragment_rx.drain().collect()
    }

    /// Whether neighbor preloading is active.
    pub fn is_preloading(&self) -> bool {
        self.metadata_preload.is_some() || self.thumbnail_preload.is_some()
    }

    /// Open the viewer on `handle`, or switch to it if already open.
    ///
    /// Returns false if `handle` is not one of this page's items.
    pub fn open_or_switch_to(&mut self, handle: &ItemHandle, origin: NavigationOrigin) -> bool {
        match self.index_of(handle) {
            Some(index) => self.open_index(index, origin),
            None => {
                warn!(item = %handle, "Item is not on this page");
                false
            }
        }
    }

    pub fn open_index(&mut self, index: usize, origin: NavigationOrigin) -> bool {
        let Some(handle) = self.items.get(index).map(|item| item.handle.clone()) else {
            warn!(index, "Item index out of range");
            return false;
        };

        let was_open = self.state.is_open();
        self.cancel_preloads();
        let generation = self.state.begin_item(handle.clone(), index);
        debug!(item = %handle, index, generation, ?origin, "Opening item");

        if !was_open {
            self.presenter.open();
        }

        let width = self.width_for(index, self.state.fullscreen);
        self.state.width = Some(width);

        // Re-navigating is the retry path for failed fetches.
        let retried = self.metadata.forget_failures(&handle)
            + self.thumbnails.forget_failures(&handle)
            + usize::from(self.thumbnails.forget_rendition_failure(&handle, width.real));
        if retried > 0 {
            debug!(item = %handle, retried, "Retrying failed fetches");
        }

        self.start_item_info(generation, &handle);
        self.start_metadata(generation, &handle);
        self.start_thumbnail(generation, &handle, width);
        self.warm_fullscreen(index, width);

        self.update_controls();
        self.start_preloads(index);

        if origin == NavigationOrigin::User {
            let _ = self.fragment_tx.send(FragmentUpdate::Show(handle));
        }
        true
    }

    /// Switch to the next item. No-op on the last item or while closed.
    pub fn next(&mut self) -> bool {
        match self.state.current_index {
            Some(index) if index + 1 < self.items.len() => {
                self.open_index(index + 1, NavigationOrigin::User)
            }
            _ => false,
        }
    }

    /// Switch to the previous item. No-op on the first item or while closed.
    pub fn prev(&mut self) -> bool {
        match self.state.current_index {
            Some(index) if index > 0 => self.open_index(index - 1, NavigationOrigin::User),
            _ => false,
        }
    }

    /// Re-fit the current item after the display box changed.
    ///
    /// Only the thumbnail depends on the box; metadata is not fetched again.
    pub fn resize(&mut self) {
        let (Some(index), Some(handle)) = (self.state.current_index, self.state.current.clone())
        else {
            return;
        };

        let width = self.width_for(index, self.state.fullscreen);
        if self.state.width != Some(width) {
            debug!(item = %handle, css = width.css, real = width.real, "Display width changed");
            self.state.width = Some(width);
            self.start_thumbnail(self.state.generation, &handle, width);
            self.start_preloads(index);
        }
        self.update_controls();
    }

    pub fn close(&mut self, origin: NavigationOrigin) {
        if !self.state.is_open() {
            return;
        }

        self.cancel_preloads();
        if self.state.fullscreen {
            self.presenter.exit_fullscreen();
        }
        debug!(item = ?self.state.current, ?origin, "Closing viewer");
        self.state.close();
        self.presenter.close();

        if origin == NavigationOrigin::User {
            let _ = self.fragment_tx.send(FragmentUpdate::Clear);
        }
    }

    pub fn enter_fullscreen(&mut self) {
        if !self.state.is_open() || self.state.fullscreen {
            return;
        }
        self.state.fullscreen = true;
        self.presenter.enter_fullscreen();
        self.resize();
    }

    pub fn exit_fullscreen(&mut self) {
        if !self.state.is_open() || !self.state.fullscreen {
            return;
        }
        self.state.fullscreen = false;
        self.presenter.exit_fullscreen();
        self.resize();
    }

    pub fn toggle_fullscreen(&mut self) {
        if self.state.fullscreen {
            self.exit_fullscreen();
        } else {
            self.enter_fullscreen();
        }
    }

    /// Scroll position of the viewer page changed.
    pub fn scroll(&mut self, offset: f64) {
        if !self.state.listening_scroll {
            return;
        }
        let scrolled = offset > 0.0;
        if scrolled != self.state.scrolled {
            self.state.scrolled = scrolled;
            self.presenter.set_scrolled(scrolled);
        }
    }

    /// Wait for the next load event and apply it.
    ///
    /// Returns false once no more events can arrive.
    pub async fn process_next(&mut self) -> bool {
        match self.event_rx.recv().await {
            Ok(event) => {
                self.apply(event);
                true
            }
            Err(_) => false,
        }
    }

    /// Apply every load event already queued, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: LoadEvent) {
        let generation = event.generation();
        if !self.state.is_current(generation) {
            trace!(
                kind = event.kind(),
                generation,
                current = self.state.generation,
                "Dropping stale load event"
            );
            return;
        }

        match event {
            LoadEvent::ItemInfo { result, .. } => match result {
                Ok(info) => self.show_placeholder(&info),
                Err(err) => trace!(error = %err, "No item info, no placeholder"),
            },
            LoadEvent::Metadata { result, .. } => match result {
                Ok(bundle) => self.show_metadata(&bundle),
                Err(err) => self.show_error(LoadStage::Metadata, err),
            },
            LoadEvent::Thumbnail {
                width,
                result,
                elapsed,
                ..
            } => {
                if self.state.width != Some(width) {
                    trace!(requested = width.real, "Dropping thumbnail for an old width");
                    return;
                }
                match result {
                    Ok(thumbnail) => self.show_sharp(width, &thumbnail, elapsed),
                    Err(err) => self.show_error(LoadStage::Thumbnail, err),
                }
            }
            LoadEvent::Progress { fraction, .. } => {
                if !self.state.sharp_shown {
                    self.presenter.set_progress(fraction);
                }
            }
        }
    }

    fn show_placeholder(&mut self, info: &ItemInfo) {
        if self.state.sharp_shown {
            trace!(item = %info.handle, "Sharp image already shown, skipping placeholder");
            return;
        }
        let (Some(index), Some(width)) = (self.state.current_index, self.state.width) else {
            return;
        };
        let Some(item) = self.items.get(index) else {
            return;
        };

        match plan_placeholder(item.placeholder.native, info.dimensions, width.css) {
            Some(plan) => {
                trace!(item = %item.handle, blowup = plan.blowup, blurred = plan.blurred, "Showing placeholder");
                self.presenter
                    .show_placeholder(&item.placeholder, plan.display, plan.blurred);
                self.state.blurred_shown = plan.blurred;
                self.state.view = ViewState::PlaceholderShown;
            }
            None => debug!(item = %item.handle, "Placeholder too small to show"),
        }
    }

    fn show_sharp(&mut self, width: ThumbnailWidth, thumbnail: &Thumbnail, elapsed: Duration) {
        let display = thumbnail.descriptor.size.fit_width(width.css);
        self.presenter.show_sharp(&thumbnail.image, display);

        let animate = self.state.blurred_shown && elapsed > self.config.unblur_threshold;
        if animate {
            self.presenter.unblur();
        }
        trace!(url = %thumbnail.descriptor.url, ?elapsed, animate, "Showing sharp image");

        self.state.sharp_shown = true;
        self.state.blurred_shown = false;
        self.state.thumbnail_ready = true;
        self.state.view = ViewState::SharpShown;
        if matches!(self.state.error, Some((LoadStage::Thumbnail, _))) {
            self.state.error = None;
        }

        self.update_controls();
        self.maybe_reveal();
    }

    fn show_metadata(&mut self, bundle: &MetadataBundle) {
        let Some(item) = self.state.current_index.and_then(|i| self.items.get(i)) else {
            return;
        };
        self.presenter.show_metadata(item, bundle);
        self.state.metadata_ready = true;
        self.maybe_reveal();
    }

    fn show_error(&mut self, stage: LoadStage, err: FetchError) {
        let Some(item) = self.state.current_index.and_then(|i| self.items.get(i)) else {
            return;
        };
        warn!(item = %item.handle, ?stage, error = %err, "Load failed");
        self.presenter.show_error(item, stage, &err);
        self.state.error = Some((stage, err));
    }

    /// Once both halves of the item are in, play the one-time reveal and
    /// start following scroll.
    fn maybe_reveal(&mut self) {
        if !self.state.metadata_ready || !self.state.thumbnail_ready || self.state.listening_scroll
        {
            return;
        }

        if !self.flags.get_flag(HAS_OPENED_METADATA) {
            self.presenter.reveal_metadata();
            if let Err(err) = self.flags.set_flag(HAS_OPENED_METADATA, true) {
                warn!(error = %err, "Could not store the metadata reveal flag");
            }
        }
        self.state.listening_scroll = true;
    }

    fn update_controls(&mut self) {
        if let Some(index) = self.state.current_index {
            let has_next = index + 1 < self.items.len();
            let has_prev = index > 0;
            self.presenter.update_controls(has_next, has_prev);
        }
    }

    fn width_for(&self, index: usize, fullscreen: bool) -> ThumbnailWidth {
        match self.items.get(index) {
            Some(item) => {
                let bounds = self.presenter.display_box(item, fullscreen);
                self.widths.calculate_for_box(
                    bounds,
                    item.placeholder.native,
                    self.presenter.device_pixel_ratio(),
                )
            }
            None => self.widths.calculate(0, 1.0),
        }
    }

    fn start_item_info(&self, generation: u64, handle: &ItemHandle) {
        let pending = self.metadata.item_info(handle);
        let events = self.event_tx.clone();
        tokio::spawn(async move {
            let result = pending.wait().await;
            let _ = events.send(LoadEvent::ItemInfo { generation, result }).await;
        });
    }

    fn start_metadata(&self, generation: u64, handle: &ItemHandle) {
        let metadata = Arc::clone(&self.metadata);
        let events = self.event_tx.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            let result = metadata.fetch_metadata_bundle(&handle).await;
            let _ = events.send(LoadEvent::Metadata { generation, result }).await;
        });
    }

    fn start_thumbnail(&self, generation: u64, handle: &ItemHandle, width: ThumbnailWidth) {
        let thumbnails = Arc::clone(&self.thumbnails);
        let events = self.event_tx.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = load_thumbnail(&thumbnails, &handle, width.real, generation, &events).await;
            let _ = events
                .send(LoadEvent::Thumbnail {
                    generation,
                    width,
                    result,
                    elapsed: started.elapsed(),
                })
                .await;
        });
    }

    /// Fetch the fullscreen rendition in the background so entering
    /// fullscreen finds it cached.
    fn warm_fullscreen(&self, index: usize, current: ThumbnailWidth) {
        if self.state.fullscreen {
            return;
        }
        let fullscreen = self.width_for(index, true);
        if fullscreen.real == current.real {
            return;
        }
        let Some(handle) = self.items.get(index).map(|item| item.handle.clone()) else {
            return;
        };

        let thumbnails = Arc::clone(&self.thumbnails);
        tokio::spawn(async move {
            if let Err(err) = thumbnails.fetch_thumbnail(&handle, fullscreen.real).await {
                debug!(item = %handle, width = fullscreen.real, error = %err, "Fullscreen warm-up failed");
            }
        });
    }

    fn start_preloads(&mut self, index: usize) {
        self.cancel_preloads();

        let order = preload_order(index, self.items.len(), self.config.preload_distance);
        if order.is_empty() {
            return;
        }

        let mut metadata_queue = PreloadQueue::new("metadata", self.config.preload_concurrency);
        let mut thumbnail_queue = PreloadQueue::new("thumbnail", self.config.preload_concurrency);

        for &neighbor in &order {
            let Some(handle) = self.items.get(neighbor).map(|item| item.handle.clone()) else {
                continue;
            };

            let metadata = Arc::clone(&self.metadata);
            let metadata_handle = handle.clone();
            metadata_queue.push_fn(move || async move {
                if let Err(err) = metadata.fetch_metadata_bundle(&metadata_handle).await {
                    trace!(item = %metadata_handle, error = %err, "Metadata preload failed");
                }
            });

            let width = self.width_for(neighbor, self.state.fullscreen);
            let thumbnails = Arc::clone(&self.thumbnails);
            thumbnail_queue.push_fn(move || async move {
                if let Err(err) = thumbnails.fetch_thumbnail(&handle, width.real).await {
                    trace!(item = %handle, error = %err, "Thumbnail preload failed");
                }
            });
        }

        debug!(index, ?order, "Preloading neighbors");
        metadata_queue.execute();
        thumbnail_queue.execute();
        self.metadata_preload = Some(metadata_queue);
        self.thumbnail_preload = Some(thumbnail_queue);
    }

    fn cancel_preloads(&mut self) {
        for mut queue in [self.metadata_preload.take(), self.thumbnail_preload.take()]
            .into_iter()
            .flatten()
        {
            queue.cancel();
        }
    }
}

/// Resolve the rendition, then its image, forwarding download progress.
async fn load_thumbnail(
    thumbnails: &ThumbnailProvider,
    handle: &ItemHandle,
    width: u32,
    generation: u64,
    events: &async_channel::Sender<LoadEvent>,
) -> FetchResult<Thumbnail> {
    let descriptor = thumbnails.descriptor(handle, width).wait().await?;

    let image = thumbnails.image(&descriptor.url);
    if !image.is_resolved() {
        if let Some(progress) = thumbnails.images.progress(&descriptor.url) {
            tokio::spawn(forward_progress(progress, generation, events.clone()));
        }
    }
    let image = image.wait().await?;

    Ok(Thumbnail { descriptor, image })
}

async fn forward_progress(
    mut progress: watch::Receiver<f32>,
    generation: u64,
    events: async_channel::Sender<LoadEvent>,
) {
    while progress.changed().await.is_ok() {
        let fraction = *progress.borrow_and_update();
        if events
            .send(LoadEvent::Progress {
                generation,
                fraction,
            })
            .await
            .is_err()
            || fraction >= 1.0
        {
            break;
        }
    }
}
