//! Scripted collaborators shared by the unit tests.
//!
//! `FakeTransport` answers API queries from a `FakeWiki` the way the real
//! API shapes them, with per-pattern overrides and gates on top.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::error::{FetchError, FetchResult};
use crate::models::{DecodedImage, ItemHandle, ItemRecord, MetadataBundle, Placeholder, Size};
use crate::presentation::{LoadStage, Location, Presenter};
use crate::transport::{ApiRequest, FetchTransport, ProgressSender};

/// API of the "shared" foreign repository.
pub(crate) const SHARED_API: &str = "https://commons.example.org/w/api.php";

const UPLOAD_BASE: &str = "https://upload.example.org";

/// Substring patterns matching the requests providers issue.
pub(crate) mod patterns {
    use crate::models::ItemHandle;

    pub(crate) fn item_info(title: &str) -> Vec<String> {
        vec![
            "iiprop=timestamp".to_string(),
            format!("titles={}&", ItemHandle::new(title).db_key()),
        ]
    }

    pub(crate) fn thumbnail(title: &str, width: u32) -> Vec<String> {
        vec![
            "iiprop=url&".to_string(),
            format!("iiurlwidth={width}&"),
            format!("titles={}&", ItemHandle::new(title).db_key()),
        ]
    }

    pub(crate) fn any_thumbnail(title: &str) -> Vec<String> {
        vec![
            "iiurlwidth=".to_string(),
            format!("titles={}&", ItemHandle::new(title).db_key()),
        ]
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeItem {
    width: u32,
    height: u32,
    uploader: Option<String>,
    repository: String,
}

impl FakeItem {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            uploader: None,
            repository: "local".to_string(),
        }
    }

    pub(crate) fn uploader(mut self, name: &str) -> Self {
        self.uploader = Some(name.to_string());
        self
    }

    pub(crate) fn repository(mut self, name: &str) -> Self {
        self.repository = name.to_string();
        self
    }
}

/// Items known to the fake backend, by db key.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeWiki {
    items: HashMap<String, FakeItem>,
    missing: HashSet<String>,
}

impl FakeWiki {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_item(mut self, title: &str, item: FakeItem) -> Self {
        self.items.insert(ItemHandle::new(title).db_key(), item);
        self
    }

    pub(crate) fn with_missing(mut self, title: &str) -> Self {
        self.missing.insert(ItemHandle::new(title).db_key());
        self
    }

    fn respond(&self, request: &ApiRequest) -> FetchResult<Value> {
        if request.get("meta") == Some("filerepoinfo") {
            return Ok(json!({ "query": { "repos": [
                { "name": "shared", "displayname": "Shared repository", "apiurl": SHARED_API },
                { "name": "local", "displayname": "Local", "apiurl": "https://local.example.org/w/api.php", "local": "" }
            ] } }));
        }
        if request.get("list") == Some("imageusage") {
            let title = request.get("iutitle").unwrap_or_default();
            return Ok(json!({ "query": { "imageusage": [
                { "pageid": 1, "ns": 0, "title": format!("Page using {title}") }
            ] } }));
        }
        if request.get("list") == Some("users") {
            let name = request.get("ususers").unwrap_or_default();
            return Ok(json!({ "query": { "users": [ { "name": name, "gender": "unknown" } ] } }));
        }

        let title = request.get("titles").unwrap_or_default();
        if request.get("prop") == Some("globalusage") {
            return Ok(json!({ "query": { "pages": { "1": { "title": title, "globalusage": [] } } } }));
        }
        if request.get("prop") != Some("imageinfo") {
            return Err(FetchError::unknown(format!("unexpected request {request}")));
        }

        let Some(item) = self.items.get(title) else {
            if self.missing.contains(title) {
                return Ok(json!({ "query": { "pages": { "-1": {
                    "title": title, "missing": "", "imagerepository": ""
                } } } }));
            }
            return Err(FetchError::unknown(format!("no fake item {title}")));
        };

        let original = format!("{UPLOAD_BASE}/{title}");
        if let Some(width) = request.get("iiurlwidth").and_then(|w| w.parse::<u32>().ok()) {
            let (url, size) = if width >= item.width {
                (original, Size::new(item.width, item.height))
            } else {
                let height = (width as f64 * item.height as f64 / item.width as f64).round() as u32;
                (
                    format!("{UPLOAD_BASE}/thumb/{width}px-{title}"),
                    Size::new(width, height),
                )
            };
            return Ok(json!({ "query": { "pages": { "1": {
                "title": title,
                "imagerepository": item.repository,
                "imageinfo": [ { "thumburl": url, "thumbwidth": size.width, "thumbheight": size.height } ]
            } } } }));
        }

        let mut info = json!({
            "width": item.width,
            "height": item.height,
            "size": 1024,
            "url": original,
            "mime": "image/jpeg",
            "timestamp": "2014-01-01T00:00:00Z",
            "extmetadata": { "License": { "value": "cc-by-sa-4.0" } }
        });
        if let Some(user) = &item.uploader {
            info["user"] = json!(user);
        }
        Ok(json!({ "query": { "pages": { "1": {
            "title": title,
            "imagerepository": item.repository,
            "imageinfo": [ info ]
        } } } }))
    }
}

/// Blocks matching requests until released.
pub(crate) struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let matching requests through from now on.
    pub(crate) fn release(&self) {
        self.permits.add_permits(1);
    }
}

fn matches(pattern: &[String], text: &str) -> bool {
    pattern.iter().all(|p| text.contains(p.as_str()))
}

fn to_pattern<S: AsRef<str>>(pattern: &[S]) -> Vec<String> {
    pattern.iter().map(|p| p.as_ref().to_string()).collect()
}

pub(crate) struct FakeTransport {
    wiki: FakeWiki,
    requests: Mutex<Vec<ApiRequest>>,
    downloads: Mutex<Vec<String>>,
    overrides: Mutex<Vec<(Vec<String>, FetchResult<Value>)>>,
    gates: Mutex<Vec<(Vec<String>, Arc<Semaphore>)>>,
    image_bytes: Mutex<Vec<u8>>,
}

impl FakeTransport {
    pub(crate) fn new(wiki: FakeWiki) -> Arc<Self> {
        Arc::new(Self {
            wiki,
            requests: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            overrides: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
            image_bytes: Mutex::new(sample_png()),
        })
    }

    pub(crate) fn empty() -> Arc<Self> {
        Self::new(FakeWiki::new())
    }

    /// Answer requests containing every substring of `pattern` with `result`.
    pub(crate) fn respond_with<S: AsRef<str>>(&self, pattern: &[S], result: FetchResult<Value>) {
        self.overrides.lock().push((to_pattern(pattern), result));
    }

    pub(crate) fn clear_responses(&self) {
        self.overrides.lock().clear();
    }

    /// Hold requests and downloads matching `pattern` until the gate is released.
    pub(crate) fn hold<S: AsRef<str>>(&self, pattern: &[S]) -> Gate {
        let permits = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .push((to_pattern(pattern), Arc::clone(&permits)));
        Gate { permits }
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn matching_requests<S: AsRef<str>>(&self, pattern: &[S]) -> Vec<ApiRequest> {
        let pattern = to_pattern(pattern);
        self.requests
            .lock()
            .iter()
            .filter(|r| matches(&pattern, &r.to_string()))
            .cloned()
            .collect()
    }

    pub(crate) fn request_count<S: AsRef<str>>(&self, pattern: &[S]) -> usize {
        self.matching_requests(pattern).len()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().clone()
    }

    pub(crate) fn download_count(&self) -> usize {
        self.downloads.lock().len()
    }

    pub(crate) fn set_image_bytes(&self, bytes: Vec<u8>) {
        *self.image_bytes.lock() = bytes;
    }

    async fn pass_gate(&self, text: &str) {
        let gate = self
            .gates
            .lock()
            .iter()
            .find(|(pattern, _)| matches(pattern, text))
            .map(|(_, permits)| Arc::clone(permits));
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
    }
}

#[async_trait]
impl FetchTransport for FakeTransport {
    async fn request(&self, request: ApiRequest) -> FetchResult<Value> {
        let text = request.to_string();
        self.requests.lock().push(request.clone());
        self.pass_gate(&text).await;

        let scripted = self
            .overrides
            .lock()
            .iter()
            .find(|(pattern, _)| matches(pattern, &text))
            .map(|(_, result)| result.clone());
        match scripted {
            Some(result) => result,
            None => self.wiki.respond(&request),
        }
    }

    async fn download(&self, url: &str, progress: ProgressSender) -> FetchResult<Vec<u8>> {
        self.downloads.lock().push(url.to_string());
        self.pass_gate(url).await;
        progress.report(0.5);
        Ok(self.image_bytes.lock().clone())
    }
}

fn sample_png() -> Vec<u8> {
    let pixels = RgbImage::from_pixel(8, 6, Rgb([120, 80, 40]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode sample png");
    out.into_inner()
}

/// Page records with a 200x133 placeholder each.
pub(crate) fn records(titles: &[&str]) -> Vec<ItemRecord> {
    ItemRecord::from_scan(titles.iter().map(|title| {
        let handle = ItemHandle::new(title);
        let placeholder = Placeholder::new(format!("{UPLOAD_BASE}/thumb/200px-{}", handle.db_key()), Size::new(200, 133));
        (handle, placeholder)
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PresenterCall {
    Open,
    Close,
    Placeholder { src: String, display: Size, blurred: bool },
    Sharp { url: String, display: Size },
    Unblur,
    Progress(f32),
    Controls { has_next: bool, has_prev: bool },
    Metadata(ItemHandle),
    Error { handle: ItemHandle, stage: LoadStage, error: FetchError },
    RevealMetadata,
    Scrolled(bool),
    EnterFullscreen,
    ExitFullscreen,
}

#[derive(Debug)]
struct PresenterState {
    calls: Vec<PresenterCall>,
    window: Size,
    fullscreen_window: Size,
    device_pixel_ratio: f64,
}

/// Shared view of what a `RecordingPresenter` was asked to do.
#[derive(Debug, Clone)]
pub(crate) struct PresenterLog {
    state: Arc<Mutex<PresenterState>>,
}

impl PresenterLog {
    pub(crate) fn calls(&self) -> Vec<PresenterCall> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn clear(&self) {
        self.state.lock().calls.clear();
    }

    pub(crate) fn count(&self, pred: impl Fn(&PresenterCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn placeholders(&self) -> Vec<PresenterCall> {
        self.filtered(|c| matches!(c, PresenterCall::Placeholder { .. }))
    }

    pub(crate) fn sharps(&self) -> Vec<PresenterCall> {
        self.filtered(|c| matches!(c, PresenterCall::Sharp { .. }))
    }

    pub(crate) fn metadata_shown(&self) -> Vec<ItemHandle> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Metadata(handle) => Some(handle.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn set_window(&self, window: Size) {
        self.state.lock().window = window;
    }

    fn filtered(&self, pred: impl Fn(&PresenterCall) -> bool) -> Vec<PresenterCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| pred(c))
            .cloned()
            .collect()
    }
}

pub(crate) struct RecordingPresenter {
    state: Arc<Mutex<PresenterState>>,
}

impl RecordingPresenter {
    /// A presenter with `window` as its display box; fullscreen doubles it.
    pub(crate) fn new(window: Size) -> (Self, PresenterLog) {
        Self::with_ratio(window, 1.0)
    }

    pub(crate) fn with_ratio(window: Size, device_pixel_ratio: f64) -> (Self, PresenterLog) {
        let state = Arc::new(Mutex::new(PresenterState {
            calls: Vec::new(),
            window,
            fullscreen_window: Size::new(window.width * 2, window.height * 2),
            device_pixel_ratio,
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            PresenterLog { state },
        )
    }

    fn record(&self, call: PresenterCall) {
        self.state.lock().calls.push(call);
    }
}

impl Presenter for RecordingPresenter {
    fn open(&mut self) {
        self.record(PresenterCall::Open);
    }

    fn close(&mut self) {
        self.record(PresenterCall::Close);
    }

    fn show_placeholder(&mut self, placeholder: &Placeholder, display: Size, blurred: bool) {
        self.record(PresenterCall::Placeholder {
            src: placeholder.src.clone(),
            display,
            blurred,
        });
    }

    fn show_sharp(&mut self, image: &DecodedImage, display: Size) {
        self.record(PresenterCall::Sharp {
            url: image.url.clone(),
            display,
        });
    }

    fn unblur(&mut self) {
        self.record(PresenterCall::Unblur);
    }

    fn set_progress(&mut self, fraction: f32) {
        self.record(PresenterCall::Progress(fraction));
    }

    fn update_controls(&mut self, has_next: bool, has_prev: bool) {
        self.record(PresenterCall::Controls { has_next, has_prev });
    }

    fn show_metadata(&mut self, item: &ItemRecord, _bundle: &MetadataBundle) {
        self.record(PresenterCall::Metadata(item.handle.clone()));
    }

    fn show_error(&mut self, item: &ItemRecord, stage: LoadStage, error: &FetchError) {
        self.record(PresenterCall::Error {
            handle: item.handle.clone(),
            stage,
            error: error.clone(),
        });
    }

    fn reveal_metadata(&mut self) {
        self.record(PresenterCall::RevealMetadata);
    }

    fn set_scrolled(&mut self, scrolled: bool) {
        self.record(PresenterCall::Scrolled(scrolled));
    }

    fn enter_fullscreen(&mut self) {
        self.record(PresenterCall::EnterFullscreen);
    }

    fn exit_fullscreen(&mut self) {
        self.record(PresenterCall::ExitFullscreen);
    }

    fn display_box(&self, _item: &ItemRecord, fullscreen: bool) -> Size {
        let state = self.state.lock();
        if fullscreen {
            state.fullscreen_window
        } else {
            state.window
        }
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.state.lock().device_pixel_ratio
    }
}

/// A location bar whose writes can be inspected.
pub(crate) struct RecordingLocation {
    state: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone)]
pub(crate) struct LocationLog {
    state: Arc<Mutex<Vec<String>>>,
}

impl LocationLog {
    /// Every fragment written, oldest first.
    pub(crate) fn writes(&self) -> Vec<String> {
        self.state.lock().clone()
    }

    pub(crate) fn last(&self) -> Option<String> {
        self.state.lock().last().cloned()
    }
}

impl RecordingLocation {
    pub(crate) fn new() -> (Self, LocationLog) {
        let state = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                state: Arc::clone(&state),
            },
            LocationLog { state },
        )
    }
}

impl Location for RecordingLocation {
    fn fragment(&self) -> String {
        self.state.lock().last().cloned().unwrap_or_default()
    }

    fn set_fragment(&mut self, fragment: &str) {
        self.state.lock().push(fragment.to_string());
    }
}
