//! In-memory document tree.
//!
//! The widget never talks to a browser: galleries live in a [`Document`], an
//! arena of nodes addressed by copyable [`NodeId`] handles. The tree supports
//! exactly what the lightbox needs from a DOM:
//!
//! - structure: parent/children, re-parenting, detaching, replacing children
//! - element data: tag, attributes, class list, text content
//! - visibility: a popover open/closed flag per element (`showPopover`/`hidePopover`)
//! - queries: [`Selector`] matching, `closest`, document-order descendants
//!
//! ## Node lifetime
//!
//! Removing a node only detaches it from its parent: its handle stays valid,
//! [`Document::is_attached`] reports `false`, and it can be appended again.
//!
//! Discarding a node ([`Document::discard`], or replacing it away with
//! [`Document::replace_children`]) frees it with its subtree. Freed slots are
//! reused by later node creation, so the arena stays bounded while an overlay
//! is rebuilt over and over. Handles carry a generation: a handle to a freed
//! node is *stale*, it never aliases the node that reuses the slot, lookups
//! on it find nothing and edits through it are no-ops.
//!
//! ## Attachment
//!
//! The document root is the `body` element. A node is *attached* when its
//! parent chain reaches the body. Overlays are attached by appending them to
//! [`Document::body`].

mod parse;
mod selector;

pub use parse::ParseError;
pub use selector::{Selector, SelectorError};

use quick_xml::escape::escape;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Slot of the node in the document arena.
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    popover_open: bool,
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
}

/// Elements that never take children when parsing or serializing.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// An arena-backed document whose root is the `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<usize>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only `body`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// Parse `markup` and append the result to the body.
    ///
    /// `html`, `head` and `body` tags are transparent: their children land
    /// directly in the document body.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let body = doc.body;
        for node in doc.parse_fragment(markup)? {
            doc.append_child(body, node);
        }
        Ok(doc)
    }

    /// The document root.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The live node behind `id`, or `None` for a stale handle.
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.index)
            .filter(|node| node.generation == id.generation)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index)
            .filter(|node| node.generation == id.generation)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn is_text(&self, id: NodeId) -> bool {
        self.node(id)
            .is_some_and(|node| matches!(node.data, NodeData::Text(_)))
    }

    /// Whether `id` refers to a node that has not been discarded.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of arena slots ever allocated, live or free.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    // =========================================================================
    // Construction and structure
    // =========================================================================

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            popover_open: false,
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index];
            slot.data = data;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let id = NodeId {
            index: self.nodes.len(),
            generation: 0,
        };
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            generation: 0,
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_live(parent) || !self.is_live(child) {
            return;
        }
        self.remove(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Detach `node` from its parent. Removing a detached node is a no-op.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.node_mut(node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|&c| c != node);
        }
    }

    /// Replace all children of `parent` with `children`, in order.
    ///
    /// Old children that end up detached are discarded: their handles go
    /// stale and their slots are reused.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let Some(node) = self.node_mut(parent) else {
            return;
        };
        let old = std::mem::take(&mut node.children);
        for &child in &old {
            if let Some(node) = self.node_mut(child) {
                node.parent = None;
            }
        }
        for child in children {
            self.append_child(parent, child);
        }
        for child in old {
            if self.parent(child).is_none() {
                self.discard(child);
            }
        }
    }

    /// Detach `node` and free it together with its subtree. Discarding a
    /// stale handle or the body is a no-op.
    pub fn discard(&mut self, node: NodeId) {
        if node == self.body || !self.is_live(node) {
            return;
        }
        self.remove(node);
        let mut doomed = vec![node];
        doomed.extend(self.descendants(node));
        for id in doomed {
            let slot = &mut self.nodes[id.index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.data = NodeData::Text(String::new());
            slot.parent = None;
            slot.children = Vec::new();
            self.free.push(id.index);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Child nodes that are elements, skipping text.
    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// The `n`th element child (0-based), like `:nth-child(n + 1)`.
    pub fn nth_element_child(&self, node: NodeId, n: usize) -> Option<NodeId> {
        self.element_children(node).nth(n)
    }

    /// Strict ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(node),
        }
    }

    /// All descendants of `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(node).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Whether `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `node` is reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    /// Depth below the body (body is 0). Detached trees count from their own root.
    pub fn depth(&self, node: NodeId) -> usize {
        self.ancestors(node).count()
    }

    // =========================================================================
    // Element data
    // =========================================================================

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Lowercase tag name, or `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes of an element in source order.
    pub fn attrs(&self, node: NodeId) -> &[(String, String)] {
        self.element(node).map(|el| el.attrs.as_slice()).unwrap_or(&[])
    }

    /// Set an attribute, replacing an existing value. No-op on text nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(node) else {
            return;
        };
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attr(node, "class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.is_element(node) || self.has_class(node, class) {
            return;
        }
        let mut list: Vec<&str> = self.classes(node).collect();
        list.push(class);
        let joined = list.join(" ");
        self.set_attr(node, "class", &joined);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let joined = self
            .classes(node)
            .filter(|&c| c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(node, "class", &joined);
    }

    /// Concatenated text of `node` and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Text(text)) => return text.clone(),
            Some(NodeData::Element(_)) => {}
            None => return String::new(),
        }
        self.descendants(node)
            .filter_map(|n| match self.node(n).map(|n| &n.data) {
                Some(NodeData::Text(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace the children of an element with a single text node.
    ///
    /// An element whose only child is already a text node keeps that node
    /// and has its text overwritten.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        let Some(current) = self.node(node) else {
            return;
        };
        let reusable = match (&current.data, current.children.as_slice()) {
            (NodeData::Text(_), _) => Some(node),
            (NodeData::Element(_), [only]) if self.is_text(*only) => Some(*only),
            _ => None,
        };
        match reusable.and_then(|id| self.node_mut(id)) {
            Some(Node {
                data: NodeData::Text(existing),
                ..
            }) => {
                existing.clear();
                existing.push_str(text);
            }
            _ => {
                let text_node = self.create_text(text);
                self.replace_children(node, vec![text_node]);
            }
        }
    }

    // =========================================================================
    // Popover visibility
    // =========================================================================

    pub fn show_popover(&mut self, node: NodeId) {
        if let Some(el) = self.element_mut(node) {
            el.popover_open = true;
        }
    }

    pub fn hide_popover(&mut self, node: NodeId) {
        if let Some(el) = self.element_mut(node) {
            el.popover_open = false;
        }
    }

    pub fn is_popover_open(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|el| el.popover_open)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// First descendant of `scope` matching `selector`, in document order.
    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope).find(|&n| selector.matches(self, n))
    }

    /// All descendants of `scope` matching `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// `node` itself or its nearest ancestor matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| selector.matches(self, n))
    }

    /// Descendant elements of `scope` with the given tag, in document order.
    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    /// First descendant element of `scope` carrying `class`.
    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&n| self.has_class(n, class))
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize `node` and its subtree as HTML.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(current) = self.node(node) else {
            return;
        };
        match &current.data {
            NodeData::Text(text) => out.push_str(&escape(text.as_str())),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
                out.push('>');
                if is_void(&el.tag) {
                    return;
                }
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

/// Iterator over strict ancestors, nearest first.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over descendants.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
