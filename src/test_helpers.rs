//! Shared test utilities for the litebox test suite.
//!
//! Provides the HTML fixtures, lookup helpers that panic with a clear message
//! on a miss, and bulk extractors over resolved image lists and overlays.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut page = fixture_page(IMG_GALLERY);
//! let id = page.litebox(".gallery-img", &LiteboxOptions::default()).unwrap();
//! page.click(nth_thumbnail(&page, ".gallery-img", 2)).unwrap();
//!
//! let overlay = page.gallery(id).unwrap().overlay().unwrap();
//! assert_eq!(active_items(page.document(), overlay), vec![2]);
//! ```

use crate::dom::{Document, NodeId, Selector};
use crate::markup::{ACTIVE_CLASS, ITEM_CLASS, Overlay};
use crate::page::Page;
use crate::resolve::ImageRecord;

// =========================================================================
// Fixtures
// =========================================================================

/// Four `img` thumbnails whose `src` is the large image; the last has a blank alt.
pub const IMG_GALLERY: &str = include_str!("../fixtures/img-gallery.html");

/// Three linked thumbnails; the middle link has no `href`.
pub const LINK_GALLERY: &str = include_str!("../fixtures/link-gallery.html");

/// `figure`/`figcaption` items; the middle one has no caption.
pub const CAPTION_GALLERY: &str = include_str!("../fixtures/caption-gallery.html");

/// A full page with two linked galleries and one gallery without images.
pub const MULTIPLE_GALLERIES: &str = include_str!("../fixtures/multiple.html");

pub fn fixture_document(markup: &str) -> Document {
    Document::parse(markup).unwrap()
}

pub fn fixture_page(markup: &str) -> Page {
    Page::from_html(markup).unwrap()
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// The first element matching `selector`. Panics if there is none.
pub fn select_one(doc: &Document, selector: &str) -> NodeId {
    let parsed = Selector::parse(selector).unwrap();
    doc.query_selector(doc.body(), &parsed)
        .unwrap_or_else(|| panic!("no element matches '{selector}'"))
}

/// All `img` elements inside `container`, in document order.
pub fn thumbnails(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.elements_by_tag(container, "img")
}

/// The `n`th (0-based) thumbnail of the gallery at `selector`. Panics if out of range.
pub fn nth_thumbnail(page: &Page, selector: &str, n: usize) -> NodeId {
    let container = select_one(page.document(), selector);
    let thumbs = thumbnails(page.document(), container);
    *thumbs.get(n).unwrap_or_else(|| {
        panic!(
            "'{selector}' has {} thumbnails, wanted index {n}",
            thumbs.len()
        )
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

pub fn sources(images: &[ImageRecord]) -> Vec<&str> {
    images.iter().map(|i| i.source.as_str()).collect()
}

pub fn descriptions(images: &[ImageRecord]) -> Vec<Option<&str>> {
    images.iter().map(|i| i.description.as_deref()).collect()
}

/// Positions of the overlay's list items carrying the `active` class.
pub fn active_items(doc: &Document, overlay: &Overlay) -> Vec<usize> {
    let items = Selector::parse(&format!(".{ITEM_CLASS}")).unwrap();
    doc.query_selector_all(overlay.content, &items)
        .into_iter()
        .enumerate()
        .filter(|&(_, item)| doc.has_class(item, ACTIVE_CLASS))
        .map(|(index, _)| index)
        .collect()
}
