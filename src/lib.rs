//! # Litebox
//!
//! A lightbox gallery widget. Point it at a container of thumbnails and it
//! shows the large versions in a modal overlay with previous/next/close
//! controls, a position indicator (`"3 / 12"`) and keyboard navigation.
//!
//! The widget runs against an in-memory document tree rather than a browser,
//! so every behaviour (click handling, focus, deferred teardown) is
//! deterministic and testable without a rendering engine.
//!
//! # Architecture
//!
//! ```text
//! Page::litebox(target, options)
//!     │  resolve container (element or selector)
//!     ▼
//! Registry ── one Gallery per container element
//!     │
//!     ▼
//! Gallery::new  ── resolve thumbnails → Vec<ImageRecord>
//!     │             (eager galleries also build the overlay)
//!     ▼
//! events ── click / key ──▶ Command ──▶ Gallery::apply ──▶ Deferred work
//!                                                           │
//!                                             Page::tick ◀──┘
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`page`] | Entry point: owns the document, registry, focus and task queue; dispatches events |
//! | [`registry`] | Per-container instance registry and the overlay id sequence |
//! | [`gallery`] | The gallery state machine: commands, transitions, teardown |
//! | [`resolve`] | Thumbnail → large image URL and description |
//! | [`markup`] | Overlay templates rendered with Maud |
//! | [`config`] | Options, TOML loading and merging, resolved configuration |
//! | [`dom`] | Arena document tree, HTML fragment parser, CSS selector engine |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Commands Over Callbacks
//!
//! Events never mutate a gallery directly. Clicks, control buttons and keys
//! are resolved into a [`Command`], and a single transition function applies
//! it. The state machine is exercised in tests by applying commands, without
//! synthesising events.
//!
//! ## Explicit Teardown Scheduling
//!
//! Closing and removing the overlay are separate transitions. With
//! `cleanup_on_close`, a close either removes the overlay on the spot or
//! hands back a deferred teardown that the page runs on its next tick. A
//! deferred teardown that finds its overlay replaced or reopened does
//! nothing.
//!
//! ## Owned Registry
//!
//! The instance registry and overlay id counter belong to a [`Page`], not to
//! the process. Independent pages (and tests) never share state.

pub mod config;
pub mod dom;
pub mod gallery;
pub mod markup;
pub mod output;
pub mod page;
pub mod registry;
pub mod resolve;

pub use config::LiteboxOptions;
pub use dom::{Document, NodeId, Selector};
pub use gallery::{ClickEvent, Command, Gallery, State};
pub use page::{Page, Target};
pub use registry::GalleryId;
pub use resolve::ImageRecord;

#[cfg(test)]
pub(crate) mod test_helpers;
