//! Page host.
//!
//! A [`Page`] is the environment galleries live in: it owns the
//! [`Document`], the gallery [`Registry`], the focused node and the queue of
//! deferred tasks. It is the entry point of the library.
//!
//! ```
//! use litebox::{LiteboxOptions, Page};
//!
//! let mut page = Page::from_html(
//!     r#"<div class="gallery"><img src="/a.jpg"><img src="/b.jpg"></div>"#,
//! )?;
//! let id = page.litebox(".gallery", &LiteboxOptions::default())?;
//!
//! let thumbs = page.document().elements_by_tag(page.document().body(), "img");
//! let event = page.click(thumbs[1])?;
//! assert!(event.default_prevented());
//! assert_eq!(page.position_text(id).as_deref(), Some("2 / 2"));
//! # Ok::<(), litebox::page::PageError>(())
//! ```
//!
//! ## Event dispatch
//!
//! Clicks are dispatched the way a browser bubbles them. Overlay controls
//! are checked first, then every gallery whose container lies on the path
//! from the target up to the body, innermost first. Key presses go to the
//! overlay holding focus; opening an overlay focuses it.
//!
//! ## Ticks
//!
//! Work a transition defers (the overlay removal after a close with
//! `cleanup_on_close`) is queued and runs on the next [`Page::tick`]. Tasks
//! queued while a tick runs wait for the following tick.

use crate::config::{ConfigError, LiteboxOptions};
use crate::dom::{Document, NodeId, ParseError, Selector, SelectorError};
use crate::gallery::{ClickEvent, Command, Deferred, Gallery, GalleryError, State, command_for_key};
use crate::registry::{GalleryId, Registry};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Litebox container not found: {0}")]
    ContainerNotFound(String),
    #[error("Invalid container selector: {0}")]
    InvalidSelector(#[from] SelectorError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Gallery error: {0}")]
    Gallery(#[from] GalleryError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Unknown gallery: {0}")]
    UnknownGallery(GalleryId),
}

/// What a gallery is attached to: an element, or the first element matching
/// a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Element(NodeId),
    Selector(&'a str),
}

impl From<NodeId> for Target<'_> {
    fn from(node: NodeId) -> Self {
        Target::Element(node)
    }
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(selector: &'a str) -> Self {
        Target::Selector(selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Task {
    gallery: GalleryId,
    work: Deferred,
}

#[derive(Debug, Default)]
pub struct Page {
    document: Document,
    registry: Registry,
    pending: VecDeque<Task>,
    focused: Option<NodeId>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            ..Default::default()
        }
    }

    /// Parse `markup` into a fresh page.
    pub fn from_html(markup: &str) -> Result<Self, PageError> {
        Ok(Self::new(Document::parse(markup)?))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for callers that change the page markup between
    /// interactions, e.g. to add thumbnails to a gallery.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set up a gallery on `target`, or return the one already there.
    ///
    /// Options are only resolved when a new instance is created.
    pub fn litebox<'a>(
        &mut self,
        target: impl Into<Target<'a>>,
        options: &LiteboxOptions,
    ) -> Result<GalleryId, PageError> {
        let container = self.resolve_target(target.into())?;
        self.registry
            .get_or_create(&mut self.document, container, options)
    }

    fn resolve_target(&self, target: Target<'_>) -> Result<NodeId, PageError> {
        match target {
            Target::Element(node) => Ok(node),
            Target::Selector(selector) => {
                let parsed = Selector::parse(selector)?;
                let doc = &self.document;
                std::iter::once(doc.body())
                    .chain(doc.descendants(doc.body()))
                    .find(|&node| parsed.matches(doc, node))
                    .ok_or_else(|| PageError::ContainerNotFound(selector.to_string()))
            }
        }
    }

    pub fn gallery(&self, id: GalleryId) -> Option<&Gallery> {
        self.registry.gallery(id)
    }

    pub fn state(&self, id: GalleryId) -> Option<State> {
        self.gallery(id).map(|gallery| gallery.state(&self.document))
    }

    /// Position indicator text of the gallery's overlay, if it has one.
    pub fn position_text(&self, id: GalleryId) -> Option<String> {
        self.gallery(id)?.position_text(&self.document)
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Number of deferred tasks waiting for the next tick.
    pub fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    // =========================================================================
    // Programmatic control
    // =========================================================================

    /// Open the gallery at `index`, or at the first image for `None`.
    pub fn open(&mut self, id: GalleryId, index: Option<usize>) -> Result<(), PageError> {
        self.apply(id, Command::Open { index })
    }

    pub fn next(&mut self, id: GalleryId) -> Result<(), PageError> {
        self.apply(id, Command::Next)
    }

    pub fn prev(&mut self, id: GalleryId) -> Result<(), PageError> {
        self.apply(id, Command::Prev)
    }

    pub fn goto(&mut self, id: GalleryId, index: usize) -> Result<(), PageError> {
        self.apply(id, Command::Goto(index))
    }

    pub fn close(&mut self, id: GalleryId) -> Result<(), PageError> {
        self.apply(id, Command::Close)
    }

    /// Destroy the gallery and free its container for a new instance.
    /// Destroying twice is a no-op.
    pub fn destroy(&mut self, id: GalleryId) -> Result<(), PageError> {
        let (gallery, _) = self
            .registry
            .gallery_mut(id)
            .ok_or(PageError::UnknownGallery(id))?;
        let overlay = gallery.overlay().map(|overlay| overlay.root);
        gallery.destroy(&mut self.document);
        self.registry.evict(id);
        self.pending.retain(|task| task.gallery != id);
        self.blur_within(overlay);
        Ok(())
    }

    /// Apply `command` to gallery `id`, then queue deferred work and move
    /// focus as the transition requires.
    pub fn apply(&mut self, id: GalleryId, command: Command) -> Result<(), PageError> {
        let (gallery, ids) = self
            .registry
            .gallery_mut(id)
            .ok_or(PageError::UnknownGallery(id))?;
        let before = gallery.overlay().map(|overlay| overlay.root);
        let deferred = gallery.apply(&mut self.document, ids, command)?;
        let after = gallery.overlay().map(|overlay| overlay.root);
        self.settle(id, command, deferred, before, after);
        Ok(())
    }

    fn settle(
        &mut self,
        id: GalleryId,
        command: Command,
        deferred: Option<Deferred>,
        before: Option<NodeId>,
        after: Option<NodeId>,
    ) {
        if let Some(work) = deferred {
            tracing::trace!(%id, ?work, "task scheduled for next tick");
            self.pending.push_back(Task { gallery: id, work });
        }
        match command {
            Command::Open { .. } => self.focused = after,
            Command::Close => self.blur_within(before),
            _ => {}
        }
    }

    /// Clear focus held inside `root`, or on a node that no longer exists.
    fn blur_within(&mut self, root: Option<NodeId>) {
        let Some(focused) = self.focused else {
            return;
        };
        let inside = root.is_some_and(|root| self.document.contains(root, focused));
        if inside || !self.document.is_live(focused) {
            self.focused = None;
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Dispatch a click on `target`.
    pub fn click(&mut self, target: NodeId) -> Result<ClickEvent, PageError> {
        let mut event = ClickEvent::new(target);

        let control = self.registry.iter().find_map(|(id, gallery)| {
            gallery
                .resolve_control(&self.document, target)
                .map(|command| (id, command))
        });
        if let Some((id, command)) = control {
            self.apply(id, command)?;
            return Ok(event);
        }

        let path: Vec<NodeId> = std::iter::once(target)
            .chain(self.document.ancestors(target))
            .collect();
        for node in path {
            let Some(id) = self.registry.lookup(node) else {
                continue;
            };
            let Some((gallery, ids)) = self.registry.gallery_mut(id) else {
                continue;
            };
            let before = gallery.overlay().map(|overlay| overlay.root);
            let Some(command) = gallery.resolve_click(&self.document, target) else {
                continue;
            };
            let deferred = gallery.handle_click(&mut self.document, ids, &mut event)?;
            let after = gallery.overlay().map(|overlay| overlay.root);
            tracing::debug!(%id, ?command, "click handled");
            self.settle(id, command, deferred, before, after);
        }
        Ok(event)
    }

    /// Move focus to `node`.
    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    /// Dispatch a key press to the overlay holding focus. Returns the command
    /// the key triggered, if any.
    pub fn key_down(&mut self, key: &str) -> Result<Option<Command>, PageError> {
        let Some(focused) = self.focused else {
            return Ok(None);
        };
        let owner = self.registry.iter().find_map(|(id, gallery)| {
            gallery
                .overlay()
                .filter(|overlay| self.document.contains(overlay.root, focused))
                .map(|_| id)
        });
        let (Some(id), Some(command)) = (owner, command_for_key(key)) else {
            return Ok(None);
        };
        self.apply(id, command)?;
        Ok(Some(command))
    }

    /// Run every task queued before this call. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        let tasks: Vec<Task> = self.pending.drain(..).collect();
        for task in &tasks {
            if let Some((gallery, _)) = self.registry.gallery_mut(task.gallery) {
                gallery.run_deferred(&mut self.document, task.work);
            }
        }
        self.blur_within(None);
        tasks.len()
    }
}
