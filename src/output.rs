//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Gallery .gallery-img (4 images)
//! 001 /large/1.jpg
//!     Description: Image 1
//! 002 /large/2.jpg
//! ```
//!
//! ## Open
//!
//! ```text
//! Key ArrowRight → next
//! Key Tab ignored
//! State: open
//! Showing: 3 / 4
//! Overlay: #litebox-1
//! <div class="litebox" ...>...</div>
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::gallery::{Command, State};
use crate::page::Page;
use crate::registry::GalleryId;
use crate::resolve::ImageRecord;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn state_label(state: State) -> &'static str {
    match state {
        State::Inert => "inert (no images)",
        State::Idle => "idle",
        State::Rendered => "rendered (hidden)",
        State::Open => "open",
        State::Destroyed => "destroyed",
    }
}

fn command_label(command: Command) -> String {
    match command {
        Command::Open { index: Some(i) } => format!("open at {}", i + 1),
        Command::Open { index: None } => "open".to_string(),
        Command::Next => "next".to_string(),
        Command::Prev => "prev".to_string(),
        Command::Goto(i) => format!("goto {}", i + 1),
        Command::Close => "close".to_string(),
    }
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan_output(selector: &str, images: &[ImageRecord]) -> Vec<String> {
    let noun = if images.len() == 1 { "image" } else { "images" };
    let mut lines = vec![format!("Gallery {} ({} {})", selector, images.len(), noun)];
    for (i, image) in images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image.source));
        if let Some(description) = &image.description {
            lines.push(format!("    Description: {}", truncate_desc(description, 60)));
        }
    }
    lines
}

pub fn print_scan_output(selector: &str, images: &[ImageRecord]) {
    for line in format_scan_output(selector, images) {
        println!("{}", line);
    }
}

// ============================================================================
// Open
// ============================================================================

/// One line per replayed key: the command it triggered, or that it was ignored.
pub fn format_key_event(key: &str, command: Option<Command>) -> String {
    match command {
        Some(command) => format!("Key {} → {}", key, command_label(command)),
        None => format!("Key {} ignored", key),
    }
}

pub fn format_open_output(page: &Page, id: GalleryId) -> Vec<String> {
    let Some(gallery) = page.gallery(id) else {
        return vec![format!("Unknown {}", id)];
    };
    let doc = page.document();
    let mut lines = vec![format!("State: {}", state_label(gallery.state(doc)))];
    if let Some(position) = gallery.position_text(doc) {
        lines.push(format!("Showing: {}", position));
    }
    if let Some(overlay) = gallery.overlay() {
        lines.push(format!("Overlay: #{}", overlay.element_id()));
        lines.push(doc.outer_html(overlay.root));
    }
    lines
}

pub fn print_open_output(page: &Page, id: GalleryId) {
    for line in format_open_output(page, id) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiteboxOptions;
    use crate::test_helpers::*;

    fn record(source: &str, description: Option<&str>) -> ImageRecord {
        ImageRecord {
            source: source.to_string(),
            description: description.map(String::from),
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn truncate_desc_short() {
        assert_eq!(truncate_desc("hello", 10), "hello");
    }

    #[test]
    fn truncate_desc_long() {
        assert_eq!(truncate_desc("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_desc_respects_char_boundaries() {
        assert_eq!(truncate_desc("café au lait", 4), "café...");
    }

    #[test]
    fn scan_output_lists_images() {
        let images = vec![
            record("/large/1.jpg", Some("Dawn")),
            record("/large/2.jpg", None),
        ];
        let lines = format_scan_output(".gallery", &images);
        assert_eq!(
            lines,
            vec![
                "Gallery .gallery (2 images)",
                "001 /large/1.jpg",
                "    Description: Dawn",
                "002 /large/2.jpg",
            ]
        );
    }

    #[test]
    fn scan_output_singular() {
        let lines = format_scan_output("#one", &[record("/a.jpg", None)]);
        assert_eq!(lines[0], "Gallery #one (1 image)");
    }

    #[test]
    fn scan_output_empty_gallery() {
        assert_eq!(
            format_scan_output(".empty", &[]),
            vec!["Gallery .empty (0 images)"]
        );
    }

    #[test]
    fn key_event_lines() {
        assert_eq!(
            format_key_event("ArrowRight", Some(Command::Next)),
            "Key ArrowRight → next"
        );
        assert_eq!(format_key_event("Tab", None), "Key Tab ignored");
    }

    #[test]
    fn open_output_for_idle_gallery() {
        let mut page = fixture_page(IMG_GALLERY);
        let id = page.litebox(".gallery-img", &LiteboxOptions::default()).unwrap();
        assert_eq!(format_open_output(&page, id), vec!["State: idle"]);
    }

    #[test]
    fn open_output_shows_position_and_overlay() {
        let mut page = fixture_page(IMG_GALLERY);
        let id = page.litebox(".gallery-img", &LiteboxOptions::default()).unwrap();
        page.open(id, Some(2)).unwrap();
        let lines = format_open_output(&page, id);
        assert_eq!(lines[0], "State: open");
        assert_eq!(lines[1], "Showing: 3 / 4");
        assert_eq!(lines[2], "Overlay: #litebox-1");
        assert!(lines[3].starts_with("<div class=\"litebox\""));
        assert!(lines[3].contains("/large/3.jpg"));
    }
}
