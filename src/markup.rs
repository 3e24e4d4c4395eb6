//! Overlay markup.
//!
//! Uses [maud](https://maud.lambda.xyz/) for the overlay templates, then parses
//! the rendered HTML into the gallery's [`Document`]. Templates are pure
//! functions of their inputs; the only state the builder consumes is the
//! overlay id sequence owned by the [`Registry`](crate::registry::Registry).
//!
//! ## Overlay Structure
//!
//! ```text
//! div.litebox#litebox-N [popover=manual] [data-testid=litebox]
//! ├── div.litebox-loader          spinner shown while a slide loads
//! ├── div.litebox-content         slide list, replaced wholesale on rebuild
//! │   └── ul
//! │       └── li.litebox-item(.active)
//! │           ├── img.litebox-image [loading=lazy]
//! │           └── div.litebox-description   (only with a description)
//! └── div.litebox-controls
//!     ├── div.litebox-index-display [aria-live=polite]
//!     ├── button.litebox-prev
//!     ├── button.litebox-next
//!     └── button.litebox-close
//! ```
//!
//! Icons are embedded at compile time from `static/`.

use crate::dom::{Document, NodeId, ParseError};
use crate::registry::OverlayIds;
use crate::resolve::ImageRecord;
use maud::{Markup, PreEscaped, html};
use thiserror::Error;

const LOADER_SVG: &str = include_str!("../static/loader.svg");
const CLOSE_ICON: &str = include_str!("../static/close.svg");
const ARROW_ICON: &str = include_str!("../static/arrow.svg");

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Overlay markup has no {0}")]
    MissingRegion(&'static str),
}

/// Value of the `data-testid` attribute on every overlay root.
pub const OVERLAY_TEST_ID: &str = "litebox";

pub const OVERLAY_CLASS: &str = "litebox";
pub const CONTENT_CLASS: &str = "litebox-content";
pub const INDEX_DISPLAY_CLASS: &str = "litebox-index-display";
pub const ITEM_CLASS: &str = "litebox-item";
pub const ACTIVE_CLASS: &str = "active";
pub const PREV_CLASS: &str = "litebox-prev";
pub const NEXT_CLASS: &str = "litebox-next";
pub const CLOSE_CLASS: &str = "litebox-close";

/// Handles to the parts of a built overlay the gallery updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub root: NodeId,
    pub content: NodeId,
    pub index_display: NodeId,
    /// Number taken from the overlay id sequence; the element id is `litebox-{serial}`.
    pub serial: u64,
}

impl Overlay {
    pub fn element_id(&self) -> String {
        format!("litebox-{}", self.serial)
    }
}

/// Renders the empty overlay shell.
pub fn overlay_shell(serial: u64) -> Markup {
    html! {
        div.litebox popover="manual" data-testid=(OVERLAY_TEST_ID) id={ "litebox-" (serial) } {
            div.litebox-loader { (PreEscaped(LOADER_SVG)) }
            div.litebox-content {}
            div.litebox-controls {
                div.litebox-index-display aria-live="polite" {}
                button.litebox-prev aria-label="Previous image" { (PreEscaped(ARROW_ICON)) }
                button.litebox-next aria-label="Next image" { (PreEscaped(ARROW_ICON)) }
                button.litebox-close aria-label="Close litebox" { (PreEscaped(CLOSE_ICON)) }
            }
        }
    }
}

/// Renders the slide list with the item at `active` marked active.
pub fn image_list(images: &[ImageRecord], active: usize) -> Markup {
    html! {
        ul {
            @for (index, image) in images.iter().enumerate() {
                li.litebox-item.active[index == active] {
                    img.litebox-image src=(image.source) loading="lazy";
                    @if let Some(description) = &image.description {
                        div.litebox-description { (description) }
                    }
                }
            }
        }
    }
}

/// Build a detached overlay shell in `doc`, consuming the next overlay id.
pub fn build_overlay(doc: &mut Document, ids: &OverlayIds) -> Result<Overlay, MarkupError> {
    let serial = ids.next_id();
    let roots = doc.parse_fragment(&overlay_shell(serial).into_string())?;
    locate_regions(doc, roots, serial)
}

/// Pick the overlay root out of parsed shell markup and find the regions the
/// gallery updates. Other top-level nodes are discarded, and so is everything
/// on failure.
fn locate_regions(
    doc: &mut Document,
    roots: Vec<NodeId>,
    serial: u64,
) -> Result<Overlay, MarkupError> {
    let root = roots.iter().copied().find(|&n| doc.has_class(n, OVERLAY_CLASS));
    for &other in roots.iter().filter(|&&n| Some(n) != root) {
        doc.discard(other);
    }
    let root = root.ok_or(MarkupError::MissingRegion("root element"))?;
    let regions = doc
        .find_by_class(root, CONTENT_CLASS)
        .ok_or(MarkupError::MissingRegion("content region"))
        .and_then(|content| {
            doc.find_by_class(root, INDEX_DISPLAY_CLASS)
                .map(|index_display| (content, index_display))
                .ok_or(MarkupError::MissingRegion("index display"))
        });
    match regions {
        Ok((content, index_display)) => Ok(Overlay {
            root,
            content,
            index_display,
            serial,
        }),
        Err(err) => {
            doc.discard(root);
            Err(err)
        }
    }
}

/// Replace the overlay's slides with a fresh list for `images`.
pub fn fill_images(
    doc: &mut Document,
    overlay: &Overlay,
    images: &[ImageRecord],
    active: usize,
) -> Result<(), MarkupError> {
    let list = doc.parse_fragment(&image_list(images, active).into_string())?;
    doc.replace_children(overlay.content, list);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    fn records() -> Vec<ImageRecord> {
        vec![
            ImageRecord {
                source: "/large/1.jpg".into(),
                description: Some("First".into()),
            },
            ImageRecord {
                source: "/large/2.jpg".into(),
                description: None,
            },
            ImageRecord {
                source: "/large/3.jpg".into(),
                description: Some("Third".into()),
            },
        ]
    }

    #[test]
    fn shell_carries_test_id_and_unique_id() {
        let html = overlay_shell(7).into_string();
        assert!(html.contains(r#"data-testid="litebox""#));
        assert!(html.contains(r#"id="litebox-7""#));
        assert!(html.contains(r#"popover="manual""#));
    }

    #[test]
    fn shell_has_all_regions() {
        let html = overlay_shell(1).into_string();
        for class in [
            "litebox-loader",
            "litebox-content",
            "litebox-controls",
            "litebox-index-display",
            "litebox-prev",
            "litebox-next",
            "litebox-close",
        ] {
            assert!(html.contains(class), "missing {class}");
        }
        assert!(html.contains(r#"aria-label="Close litebox""#));
    }

    #[test]
    fn image_list_has_one_item_per_record() {
        let html = image_list(&records(), 0).into_string();
        assert_eq!(html.matches("<li").count(), 3);
        assert_eq!(html.matches(r#"loading="lazy""#).count(), 3);
    }

    #[test]
    fn image_list_marks_exactly_one_active() {
        let html = image_list(&records(), 1).into_string();
        assert_eq!(html.matches("litebox-item active").count(), 1);
        let mut doc = Document::new();
        let roots = doc.parse_fragment(&html).unwrap();
        let items: Vec<_> = doc.element_children(roots[0]).collect();
        assert!(doc.has_class(items[1], ACTIVE_CLASS));
        assert!(!doc.has_class(items[0], ACTIVE_CLASS));
    }

    #[test]
    fn image_list_skips_missing_descriptions() {
        let html = image_list(&records(), 0).into_string();
        assert_eq!(html.matches("litebox-description").count(), 2);
    }

    #[test]
    fn image_list_escapes_text() {
        let images = vec![ImageRecord {
            source: "/a.jpg?w=1&h=2".into(),
            description: Some("<script>alert('x')</script>".into()),
        }];
        let html = image_list(&images, 0).into_string();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("w=1&amp;h=2"));

        let mut doc = Document::new();
        let roots = doc.parse_fragment(&html).unwrap();
        let img = doc.elements_by_tag(roots[0], "img")[0];
        assert_eq!(doc.attr(img, "src"), Some("/a.jpg?w=1&h=2"));
    }

    #[test]
    fn build_overlay_consumes_ids() {
        let mut doc = Document::new();
        let ids = OverlayIds::default();
        let first = build_overlay(&mut doc, &ids).unwrap();
        let second = build_overlay(&mut doc, &ids).unwrap();
        assert_eq!(first.serial, 1);
        assert_eq!(second.serial, 2);
        assert_eq!(doc.attr(second.root, "id"), Some("litebox-2"));
        assert_eq!(second.element_id(), "litebox-2");
        assert!(!doc.is_attached(first.root));
    }

    #[test]
    fn build_overlay_finds_regions() {
        let mut doc = Document::new();
        let overlay = build_overlay(&mut doc, &OverlayIds::default()).unwrap();
        assert!(doc.has_class(overlay.content, CONTENT_CLASS));
        assert!(doc.has_class(overlay.index_display, INDEX_DISPLAY_CLASS));
        assert!(doc.children(overlay.content).is_empty());
        let buttons = Selector::parse(".litebox-controls > button").unwrap();
        assert_eq!(doc.query_selector_all(overlay.root, &buttons).len(), 3);
    }

    #[test]
    fn shell_without_index_display_is_an_error() {
        let mut doc = Document::new();
        let roots = doc
            .parse_fragment(r#"<p>stray</p><div class="litebox"><div class="litebox-content"></div></div>"#)
            .unwrap();
        let err = locate_regions(&mut doc, roots.clone(), 3).unwrap_err();
        assert!(matches!(err, MarkupError::MissingRegion("index display")));
        assert_eq!(err.to_string(), "Overlay markup has no index display");
        assert!(roots.iter().all(|&n| !doc.is_live(n)));
    }

    #[test]
    fn shell_without_root_is_an_error() {
        let mut doc = Document::new();
        let roots = doc.parse_fragment("<div class=\"other\"></div>").unwrap();
        let err = locate_regions(&mut doc, roots, 1).unwrap_err();
        assert!(matches!(err, MarkupError::MissingRegion("root element")));
    }

    #[test]
    fn fill_images_replaces_content() {
        let mut doc = Document::new();
        let overlay = build_overlay(&mut doc, &OverlayIds::default()).unwrap();
        fill_images(&mut doc, &overlay, &records(), 0).unwrap();
        fill_images(&mut doc, &overlay, &records()[..1], 0).unwrap();
        assert_eq!(doc.children(overlay.content).len(), 1);
        let items = Selector::parse(".litebox-item").unwrap();
        assert_eq!(doc.query_selector_all(overlay.content, &items).len(), 1);
    }

    #[test]
    fn refilling_reuses_discarded_slides() {
        let mut doc = Document::new();
        let overlay = build_overlay(&mut doc, &OverlayIds::default()).unwrap();
        fill_images(&mut doc, &overlay, &records(), 0).unwrap();
        let old_list = doc.children(overlay.content)[0];
        fill_images(&mut doc, &overlay, &records(), 1).unwrap();
        assert!(!doc.is_live(old_list));
        let settled = doc.arena_len();
        for active in 0..20 {
            fill_images(&mut doc, &overlay, &records(), active % 3).unwrap();
        }
        assert_eq!(doc.arena_len(), settled);
    }
}
