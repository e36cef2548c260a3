use std::fmt;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height over width, 1.0 for degenerate sizes.
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            1.0
        } else {
            self.height as f64 / self.width as f64
        }
    }

    /// Scale down to fit `max_width`, keeping the aspect ratio. Never scales up.
    pub fn fit_width(&self, max_width: u32) -> Size {
        if self.width <= max_width {
            *self
        } else {
            Size::new(max_width, (max_width as f64 * self.aspect()).round() as u32)
        }
    }
}

/// Stable identifier of a displayable item: a normalized page title.
///
/// Titles are stored in text form (spaces, first letter upper-cased).
/// `db_key` gives the underscore form used in API requests and fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle(String);

impl ItemHandle {
    pub fn new(title: &str) -> Self {
        let text = title.trim().replace('_', " ");
        let mut chars = text.chars();
        let normalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self(normalized)
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn db_key(&self) -> String {
        self.0.replace(' ', "_")
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemHandle {
    fn from(title: &str) -> Self {
        Self::new(title)
    }
}

/// The low-resolution preview already present on the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Source of the on-page image.
    pub src: String,
    /// Size the page currently renders it at.
    pub native: Size,
}

impl Placeholder {
    pub fn new(src: impl Into<String>, native: Size) -> Self {
        Self {
            src: src.into(),
            native,
        }
    }
}

/// One displayable item of the scanned page, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub handle: ItemHandle,
    pub index: usize,
    pub placeholder: Placeholder,
}

impl ItemRecord {
    pub fn new(handle: ItemHandle, index: usize, placeholder: Placeholder) -> Self {
        Self {
            handle,
            index,
            placeholder,
        }
    }

    /// Build records for a page scan, assigning indexes in order.
    pub fn from_scan<I>(entries: I) -> Vec<ItemRecord>
    where
        I: IntoIterator<Item = (ItemHandle, Placeholder)>,
    {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (handle, placeholder))| ItemRecord::new(handle, index, placeholder))
            .collect()
    }
}
