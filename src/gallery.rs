//! Gallery instance: the lightbox state machine.
//!
//! A [`Gallery`] is bound to one container element. It discovers the
//! container's thumbnails, builds the overlay when needed and drives
//! navigation. It never listens for anything itself: the host resolves
//! events into [`Command`]s ([`Gallery::resolve_click`],
//! [`Gallery::resolve_control`], [`command_for_key`]) and feeds them to
//! [`Gallery::apply`].
//!
//! ## States
//!
//! ```text
//!            no resolvable images
//!   new ─────────────────────────────▶ Inert (terminal, no listener)
//!    │
//!    ├─ lazy_render ──▶ Idle ──open──▶ Rendered+Open
//!    └─ eager ────────▶ Rendered ◀──close── Open
//!                          │                 │
//!                          │ teardown        │ close + cleanup_on_close
//!                          ▼                 ▼
//!                         Idle ◀──────── teardown (now or next tick)
//!
//!   destroy: any state ──▶ Destroyed (listener gone, overlay removed)
//! ```
//!
//! ## Transition table
//!
//! | Command        | Requires overlay | Effect |
//! |----------------|------------------|--------|
//! | `Open{index}`  | no               | build or refresh the overlay, goto, show |
//! | `Next`         | yes              | goto(min(active + 1, last)) |
//! | `Prev`         | yes              | goto(active - 1, floored at 0) |
//! | `Goto(i)`      | yes              | move the `active` class, update the indicator |
//! | `Close`        | yes              | hide; with `cleanup_on_close`, teardown |
//!
//! Commands that need an overlay fail with [`GalleryError::NotRendered`]
//! when there is none. These are programmer errors: under normal use the
//! overlay controls only exist once the overlay does.

use crate::config::{Config, TeardownPolicy};
use crate::dom::{Document, NodeId};
use crate::markup::{
    self, ACTIVE_CLASS, CLOSE_CLASS, ITEM_CLASS, MarkupError, NEXT_CLASS, Overlay, PREV_CLASS,
};
use crate::registry::OverlayIds;
use crate::resolve::{self, ImageRecord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Litebox overlay not rendered")]
    NotRendered,
    #[error("No images found for litebox")]
    NoImages,
    #[error("Overlay markup error: {0}")]
    Markup(#[from] MarkupError),
}

/// Observable lifecycle state of a gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No resolvable images; never listens, never renders.
    Inert,
    /// No overlay in the document.
    Idle,
    /// Overlay attached but hidden.
    Rendered,
    /// Overlay visible.
    Open,
    /// Destroyed by the caller.
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open at `index`; `None` (clicked image not in the list) opens the first image.
    Open { index: Option<usize> },
    Next,
    Prev,
    Goto(usize),
    Close,
}

/// Work a transition hands back to the host to run on a later tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Remove `overlay` unless it has been replaced or reopened meanwhile.
    Teardown { overlay: NodeId },
}

/// A click dispatched by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    target: NodeId,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Suppress the default action (following the thumbnail's link).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Keyboard binding of the overlay, by DOM `KeyboardEvent.key` name.
pub fn command_for_key(key: &str) -> Option<Command> {
    match key {
        "ArrowRight" => Some(Command::Next),
        "ArrowLeft" => Some(Command::Prev),
        "Escape" => Some(Command::Close),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Gallery {
    container: NodeId,
    config: Config,
    images: Vec<ImageRecord>,
    active_index: usize,
    overlay: Option<Overlay>,
    listening: bool,
    destroyed: bool,
}

impl Gallery {
    /// Discover the container's images and, for eager galleries, render the
    /// overlay right away.
    pub fn new(
        doc: &mut Document,
        container: NodeId,
        config: Config,
        ids: &OverlayIds,
    ) -> Result<Self, GalleryError> {
        let images = resolve::collect_images(doc, container, &config);
        let mut gallery = Self {
            container,
            config,
            images,
            active_index: 0,
            overlay: None,
            listening: false,
            destroyed: false,
        };
        if gallery.images.is_empty() {
            tracing::debug!(
                container = container.index(),
                "no resolvable images, gallery stays inert"
            );
            return Ok(gallery);
        }
        if !gallery.config.lazy_render {
            gallery.render(doc, ids, 0)?;
        }
        gallery.listening = true;
        Ok(gallery)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Whether the container's click listener is attached.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn state(&self, doc: &Document) -> State {
        if self.destroyed {
            return State::Destroyed;
        }
        if !self.listening {
            return State::Inert;
        }
        match self.attached_overlay(doc) {
            None => State::Idle,
            Some(overlay) if doc.is_popover_open(overlay.root) => State::Open,
            Some(_) => State::Rendered,
        }
    }

    /// Text of the position indicator, e.g. `"3 / 4"`.
    pub fn position_text(&self, doc: &Document) -> Option<String> {
        self.overlay
            .map(|overlay| doc.text_content(overlay.index_display))
    }

    fn attached_overlay(&self, doc: &Document) -> Option<Overlay> {
        self.overlay.filter(|overlay| doc.is_attached(overlay.root))
    }

    fn require_overlay(&self) -> Result<Overlay, GalleryError> {
        self.overlay.ok_or(GalleryError::NotRendered)
    }

    // =========================================================================
    // Event resolution
    // =========================================================================

    /// Resolve a click inside the container. Only clicks on images count.
    pub fn resolve_click(&self, doc: &Document, target: NodeId) -> Option<Command> {
        if !self.listening
            || !doc.contains(self.container, target)
            || !resolve::is_image(doc, target)
            || resolve::in_overlay(doc, target)
        {
            return None;
        }
        let index = resolve::image_source(doc, target, self.config.image_source)
            .and_then(|source| self.images.iter().position(|image| image.source == source));
        Some(Command::Open { index })
    }

    /// Resolve a click on one of the overlay's control buttons.
    pub fn resolve_control(&self, doc: &Document, target: NodeId) -> Option<Command> {
        let overlay = self.overlay?;
        if !doc.contains(overlay.root, target) {
            return None;
        }
        let button = std::iter::once(target)
            .chain(doc.ancestors(target))
            .take_while(|&n| n != overlay.root)
            .find(|&n| doc.tag(n) == Some("button"))?;
        if doc.has_class(button, PREV_CLASS) {
            Some(Command::Prev)
        } else if doc.has_class(button, NEXT_CLASS) {
            Some(Command::Next)
        } else if doc.has_class(button, CLOSE_CLASS) {
            Some(Command::Close)
        } else {
            None
        }
    }

    /// Handle a click that bubbled through the container.
    pub fn handle_click(
        &mut self,
        doc: &mut Document,
        ids: &OverlayIds,
        event: &mut ClickEvent,
    ) -> Result<Option<Deferred>, GalleryError> {
        let Some(command) = self.resolve_click(doc, event.target()) else {
            return Ok(None);
        };
        event.prevent_default();
        self.apply(doc, ids, command)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    pub fn apply(
        &mut self,
        doc: &mut Document,
        ids: &OverlayIds,
        command: Command,
    ) -> Result<Option<Deferred>, GalleryError> {
        tracing::trace!(?command, active = self.active_index, "applying command");
        match command {
            Command::Open { index } => self.open(doc, ids, index).map(|()| None),
            Command::Next => self.next(doc).map(|()| None),
            Command::Prev => self.prev(doc).map(|()| None),
            Command::Goto(index) => self.goto(doc, index).map(|()| None),
            Command::Close => self.close(doc),
        }
    }

    /// Open the overlay at `index`, building it if it is missing or detached.
    ///
    /// A reused overlay (`cleanup_on_close` off) is refilled from a fresh scan
    /// of the container, so galleries whose markup changed since the last
    /// open show their current images. A destroyed gallery never renders
    /// again and reports [`GalleryError::NotRendered`].
    pub fn open(
        &mut self,
        doc: &mut Document,
        ids: &OverlayIds,
        index: Option<usize>,
    ) -> Result<(), GalleryError> {
        if self.destroyed {
            return Err(GalleryError::NotRendered);
        }
        let index = index.unwrap_or(0);
        if self.attached_overlay(doc).is_none() {
            self.render(doc, ids, index)?;
        } else if !self.config.cleanup_on_close {
            self.render_images(doc, index)?;
        }
        self.goto(doc, index)?;
        self.show(doc)
    }

    fn render(
        &mut self,
        doc: &mut Document,
        ids: &OverlayIds,
        initial_index: usize,
    ) -> Result<(), GalleryError> {
        if self.images.is_empty() {
            return Ok(());
        }
        if let Some(stale) = self.overlay.take() {
            doc.discard(stale.root);
        }
        let overlay = markup::build_overlay(doc, ids)?;
        self.active_index = initial_index;
        markup::fill_images(doc, &overlay, &self.images, initial_index)?;
        let body = doc.body();
        doc.append_child(body, overlay.root);
        self.overlay = Some(overlay);
        self.update_index_display(doc);
        tracing::debug!(overlay = %overlay.element_id(), images = self.images.len(), "overlay rendered");
        Ok(())
    }

    fn render_images(&mut self, doc: &mut Document, initial_index: usize) -> Result<(), GalleryError> {
        let overlay = self.require_overlay()?;
        let images = resolve::collect_images(doc, self.container, &self.config);
        if images.is_empty() {
            return Err(GalleryError::NoImages);
        }
        self.images = images;
        self.active_index = initial_index;
        markup::fill_images(doc, &overlay, &self.images, initial_index)?;
        self.update_index_display(doc);
        Ok(())
    }

    fn show(&mut self, doc: &mut Document) -> Result<(), GalleryError> {
        let overlay = self.require_overlay()?;
        doc.show_popover(overlay.root);
        Ok(())
    }

    /// Hide the overlay. With `cleanup_on_close`, the overlay is torn down
    /// immediately or handed back as a [`Deferred::Teardown`], depending on
    /// the configured [`TeardownPolicy`].
    pub fn close(&mut self, doc: &mut Document) -> Result<Option<Deferred>, GalleryError> {
        let overlay = self.require_overlay()?;
        doc.hide_popover(overlay.root);
        if !self.config.cleanup_on_close {
            return Ok(None);
        }
        match self.config.teardown {
            TeardownPolicy::Immediate => {
                self.teardown(doc);
                Ok(None)
            }
            TeardownPolicy::NextTick => Ok(Some(Deferred::Teardown {
                overlay: overlay.root,
            })),
        }
    }

    /// Show the next image. Stops at the last one.
    pub fn next(&mut self, doc: &mut Document) -> Result<(), GalleryError> {
        self.require_overlay()?;
        let last = self.images.len().saturating_sub(1);
        self.goto(doc, self.active_index.saturating_add(1).min(last))
    }

    /// Show the previous image. Stops at the first one.
    pub fn prev(&mut self, doc: &mut Document) -> Result<(), GalleryError> {
        self.require_overlay()?;
        self.goto(doc, self.active_index.saturating_sub(1))
    }

    /// Make the image at `index` the active slide.
    ///
    /// The index is not bounds-checked: past the end, no slide is active
    /// and the indicator still reads `"{index + 1} / {total}"`, for any
    /// `usize` index.
    pub fn goto(&mut self, doc: &mut Document, index: usize) -> Result<(), GalleryError> {
        let overlay = self.require_overlay()?;
        let active: Vec<NodeId> = doc
            .descendants(overlay.content)
            .filter(|&n| doc.has_class(n, ITEM_CLASS) && doc.has_class(n, ACTIVE_CLASS))
            .collect();
        for item in active {
            doc.remove_class(item, ACTIVE_CLASS);
        }
        let target = doc
            .element_children(overlay.content)
            .next()
            .and_then(|list| doc.nth_element_child(list, index));
        if let Some(item) = target {
            doc.add_class(item, ACTIVE_CLASS);
        }
        self.active_index = index;
        self.update_index_display(doc);
        Ok(())
    }

    fn update_index_display(&self, doc: &mut Document) {
        if let Some(overlay) = self.overlay {
            let position = self.active_index as u128 + 1;
            let text = format!("{} / {}", position, self.images.len());
            doc.set_text_content(overlay.index_display, &text);
        }
    }

    /// Remove the overlay from the document and free its nodes. Idempotent.
    pub fn teardown(&mut self, doc: &mut Document) {
        if let Some(overlay) = self.overlay.take() {
            doc.discard(overlay.root);
            tracing::debug!(overlay = %overlay.element_id(), "overlay removed");
        }
    }

    /// Run work scheduled by an earlier transition.
    ///
    /// A scheduled teardown is skipped when the overlay it targeted is no
    /// longer this gallery's overlay, or has been reopened since the close.
    pub fn run_deferred(&mut self, doc: &mut Document, deferred: Deferred) {
        match deferred {
            Deferred::Teardown { overlay } => match self.overlay {
                Some(current) if current.root == overlay => {
                    if doc.is_popover_open(current.root) {
                        tracing::debug!(overlay = %current.element_id(), "overlay reopened, teardown skipped");
                    } else {
                        self.teardown(doc);
                    }
                }
                _ => {}
            },
        }
    }

    /// Stop listening, remove the overlay regardless of `cleanup_on_close`
    /// and drop the image list. Calling it again does nothing.
    pub fn destroy(&mut self, doc: &mut Document) {
        if !self.destroyed {
            tracing::debug!(container = self.container.index(), "destroying gallery");
        }
        self.listening = false;
        self.destroyed = true;
        self.images = Vec::new();
        self.active_index = 0;
        self.teardown(doc);
    }
}
