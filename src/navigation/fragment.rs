//! The `#mediaviewer/<item>` location fragment.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::models::ItemHandle;

pub const FRAGMENT_PREFIX: &str = "mediaviewer/";

/// Fragment written when the viewer closes.
pub const CLOSED_FRAGMENT: &str = "#";

/// Characters escaped in the item part. `/` and `:` are kept as-is.
const ITEM_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What a location fragment asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentTarget {
    Item(ItemHandle),
    /// Anything that is not a viewer fragment, the empty fragment included.
    Other,
}

/// Parse a fragment, with or without its leading `#`.
pub fn parse_fragment(fragment: &str) -> FragmentTarget {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let Some(encoded) = fragment.strip_prefix(FRAGMENT_PREFIX) else {
        return FragmentTarget::Other;
    };

    let decoded = percent_decode_str(encoded).decode_utf8_lossy();
    if decoded.trim().is_empty() {
        return FragmentTarget::Other;
    }
    FragmentTarget::Item(ItemHandle::new(&decoded))
}

/// The fragment that shows `handle`.
pub fn format_fragment(handle: &ItemHandle) -> String {
    format!(
        "#{FRAGMENT_PREFIX}{}",
        utf8_percent_encode(&handle.db_key(), ITEM_ESCAPES)
    )
}
