//! Gallery instance registry.
//!
//! A page may host any number of galleries, but each container element gets
//! at most one instance. The registry maps container elements to instances
//! and owns the instances themselves, handing out [`GalleryId`]s.
//!
//! The registry is ordinary owned state, not a process-wide singleton: a
//! [`Page`](crate::page::Page) holds one, and every test builds its own. The
//! overlay id sequence lives here too, so overlay ids are unique across all
//! galleries of a page and are never reused, even after a gallery is
//! destroyed.
//!
//! ## Repeated setup
//!
//! Asking for a gallery on a container that already has one returns the
//! existing instance. The options passed on the repeated call are ignored and
//! not validated. A destroyed gallery is evicted, so the next request for the
//! same container builds a fresh instance.

use crate::config::LiteboxOptions;
use crate::dom::{Document, NodeId};
use crate::gallery::Gallery;
use crate::page::PageError;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;

/// Stable handle to a gallery instance within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalleryId(usize);

impl fmt::Display for GalleryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gallery #{}", self.0)
    }
}

/// Monotonic source of overlay ids. Starts at 1 and never repeats.
#[derive(Debug, Default)]
pub struct OverlayIds {
    last: Cell<u64>,
}

impl OverlayIds {
    pub fn next_id(&self) -> u64 {
        let id = self.last.get() + 1;
        self.last.set(id);
        id
    }

    /// The most recently issued id (0 before any overlay was built).
    pub fn last_id(&self) -> u64 {
        self.last.get()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    by_container: HashMap<NodeId, GalleryId>,
    galleries: Vec<Gallery>,
    overlay_ids: OverlayIds,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live instance for `container`, if any.
    pub fn lookup(&self, container: NodeId) -> Option<GalleryId> {
        self.by_container.get(&container).copied()
    }

    /// Return the instance for `container`, creating it from `options` if
    /// there is none.
    pub fn get_or_create(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        options: &LiteboxOptions,
    ) -> Result<GalleryId, PageError> {
        if let Some(id) = self.lookup(container) {
            tracing::debug!(%id, "gallery already set up for container, returning existing instance");
            return Ok(id);
        }
        let config = options.resolve()?;
        let gallery = Gallery::new(doc, container, config, &self.overlay_ids)?;
        let id = GalleryId(self.galleries.len());
        self.galleries.push(gallery);
        self.by_container.insert(container, id);
        tracing::debug!(%id, container = container.index(), "gallery created");
        Ok(id)
    }

    /// Drop the container mapping of `id`. The instance itself stays
    /// addressable; only the container is free for a new instance.
    pub fn evict(&mut self, id: GalleryId) {
        self.by_container.retain(|_, &mut mapped| mapped != id);
    }

    pub fn gallery(&self, id: GalleryId) -> Option<&Gallery> {
        self.galleries.get(id.0)
    }

    /// Mutable access to an instance together with the overlay id sequence
    /// it renders with.
    pub fn gallery_mut(&mut self, id: GalleryId) -> Option<(&mut Gallery, &OverlayIds)> {
        let Self {
            galleries,
            overlay_ids,
            ..
        } = self;
        galleries.get_mut(id.0).map(|gallery| (gallery, &*overlay_ids))
    }

    /// All instances ever created, destroyed ones included, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (GalleryId, &Gallery)> {
        self.galleries
            .iter()
            .enumerate()
            .map(|(index, gallery)| (GalleryId(index), gallery))
    }

    /// Number of containers with a live instance.
    pub fn len(&self) -> usize {
        self.by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_container.is_empty()
    }

    pub fn overlay_ids(&self) -> &OverlayIds {
        &self.overlay_ids
    }
}
