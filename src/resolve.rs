//! Thumbnail resolution.
//!
//! Turns the `<img>` elements of a gallery container into [`ImageRecord`]s.
//! Everything here is a pure read of the document.
//!
//! ## Source
//!
//! - [`ImageSource::Img`]: the thumbnail's own `src`.
//! - [`ImageSource::Link`]: the `href` of the nearest enclosing `<a>`.
//!
//! A thumbnail without a usable source (no attribute, empty attribute, no
//! enclosing link) is dropped from the gallery. That is a gap in the data,
//! not an error: the rest of the gallery still works.
//!
//! ## Description
//!
//! - [`DescriptionSource::Attribute`]: the trimmed attribute value.
//! - [`DescriptionSource::Element`]: the trimmed text of the first matching
//!   element inside the thumbnail's own item. The item is found by walking up
//!   from the thumbnail's parent, stopping before the container and before
//!   any ancestor that holds a second image.
//!
//! Blank values count as no description.

use crate::config::{Config, DescriptionSource, ImageSource};
use crate::dom::{Document, NodeId, Selector};
use crate::markup::OVERLAY_TEST_ID;
use serde::Serialize;

/// One resolved gallery image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// Large image URL, never empty.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn is_image(doc: &Document, node: NodeId) -> bool {
    doc.tag(node) == Some("img")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Large image URL for a thumbnail, or `None` if it cannot be resolved.
pub fn image_source(doc: &Document, img: NodeId, mode: ImageSource) -> Option<String> {
    let url = match mode {
        ImageSource::Img => doc.attr(img, "src"),
        ImageSource::Link => {
            let link = std::iter::once(img)
                .chain(doc.ancestors(img))
                .find(|&n| doc.tag(n) == Some("a"))?;
            doc.attr(link, "href")
        }
    };
    non_empty(url).map(String::from)
}

/// Description for a thumbnail inside `container`.
pub fn image_description(
    doc: &Document,
    container: NodeId,
    img: NodeId,
    source: &DescriptionSource,
) -> Option<String> {
    match source {
        DescriptionSource::Attribute(name) => doc.attr(img, name).and_then(non_blank),
        DescriptionSource::Element(selector) => element_description(doc, container, img, selector),
    }
}

fn element_description(
    doc: &Document,
    container: NodeId,
    img: NodeId,
    selector: &Selector,
) -> Option<String> {
    for scope in doc.ancestors(img) {
        if scope == container || doc.elements_by_tag(scope, "img").len() > 1 {
            break;
        }
        if let Some(found) = doc.query_selector(scope, selector) {
            return non_blank(&doc.text_content(found));
        }
    }
    None
}

/// Resolve one thumbnail into a record.
pub fn resolve_image(
    doc: &Document,
    container: NodeId,
    img: NodeId,
    config: &Config,
) -> Option<ImageRecord> {
    let source = image_source(doc, img, config.image_source)?;
    Some(ImageRecord {
        source,
        description: image_description(doc, container, img, &config.description),
    })
}

/// Whether `node` lies inside a rendered overlay. Slides are never
/// thumbnails, even when the container encloses the overlay (`body`).
pub fn in_overlay(doc: &Document, node: NodeId) -> bool {
    doc.ancestors(node)
        .any(|a| doc.attr(a, "data-testid") == Some(OVERLAY_TEST_ID))
}

/// All resolvable thumbnails of `container`, in document order.
pub fn collect_images(doc: &Document, container: NodeId, config: &Config) -> Vec<ImageRecord> {
    doc.elements_by_tag(container, "img")
        .into_iter()
        .filter(|&img| !in_overlay(doc, img))
        .filter_map(|img| {
            let record = resolve_image(doc, container, img, config);
            if record.is_none() {
                tracing::debug!(node = img.index(), "thumbnail has no resolvable source, skipped");
            }
            record
        })
        .collect()
}
