//! Viewer configuration.
//!
//! Defaults are production values; `from_env` layers `MEDIAVIEW_*` overrides
//! on top and silently ignores anything that does not parse.

use std::time::Duration;

use tracing::debug;

/// Default rendition widths requested from the backend.
pub const DEFAULT_WIDTH_BREAKPOINTS: [u32; 8] = [320, 640, 800, 1024, 1280, 1920, 2560, 2880];

/// Default number of neighbors preloaded in each direction.
pub const DEFAULT_PRELOAD_DISTANCE: usize = 1;

/// Default number of preload tasks allowed in flight at once.
pub const DEFAULT_PRELOAD_CONCURRENCY: usize = 2;

/// Upper bound for preload concurrency.
const MAX_PRELOAD_CONCURRENCY: usize = 8;

/// Sharp loads faster than this are treated as cache hits and not animated.
pub const DEFAULT_UNBLUR_THRESHOLD: Duration = Duration::from_millis(10);

/// Default page limit for usage lists.
pub const DEFAULT_USAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Language tag sent with metadata requests.
    pub language: String,
    /// Look-ahead distance D for neighbor preloading.
    pub preload_distance: usize,
    /// Maximum preload tasks running at the same time.
    pub preload_concurrency: usize,
    /// Sorted rendition widths; see `ThumbnailWidthCalculator`.
    pub width_breakpoints: Vec<u32>,
    pub unblur_threshold: Duration,
    /// When false the global usage provider never calls the transport.
    pub global_usage_available: bool,
    pub usage_limit: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            preload_distance: DEFAULT_PRELOAD_DISTANCE,
            preload_concurrency: DEFAULT_PRELOAD_CONCURRENCY,
            width_breakpoints: DEFAULT_WIDTH_BREAKPOINTS.to_vec(),
            unblur_threshold: DEFAULT_UNBLUR_THRESHOLD,
            global_usage_available: true,
            usage_limit: DEFAULT_USAGE_LIMIT,
        }
    }
}

impl ViewerConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(language) = env_string("MEDIAVIEW_LANGUAGE") {
            config.language = language;
        }
        if let Some(distance) = env_parse::<usize>("MEDIAVIEW_PRELOAD_DISTANCE") {
            config.preload_distance = distance;
        }
        if let Some(concurrency) = env_parse::<usize>("MEDIAVIEW_PRELOAD_CONCURRENCY") {
            config.preload_concurrency = concurrency;
        }
        if let Some(enabled) = env_flag("MEDIAVIEW_GLOBAL_USAGE") {
            config.global_usage_available = enabled;
        }

        config.normalize();
        debug!(?config, "Loaded viewer configuration");
        config
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_preload_distance(mut self, distance: usize) -> Self {
        self.preload_distance = distance;
        self
    }

    pub fn with_preload_concurrency(mut self, concurrency: usize) -> Self {
        self.preload_concurrency = concurrency;
        self.normalize();
        self
    }

    pub fn with_width_breakpoints(mut self, breakpoints: Vec<u32>) -> Self {
        self.width_breakpoints = breakpoints;
        self.normalize();
        self
    }

    pub fn with_global_usage(mut self, available: bool) -> Self {
        self.global_usage_available = available;
        self
    }

    /// Clamp concurrency and keep breakpoints sorted and unique.
    fn normalize(&mut self) {
        self.preload_concurrency = self.preload_concurrency.clamp(1, MAX_PRELOAD_CONCURRENCY);
        self.width_breakpoints.retain(|w| *w > 0);
        self.width_breakpoints.sort_unstable();
        self.width_breakpoints.dedup();
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse::<T>().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env_string(name).and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}
