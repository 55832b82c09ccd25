//! In-memory document model.
//!
//! The engine reads and writes pages through this arena instead of a live
//! browser DOM. It carries exactly what the window engine needs: the element
//! tree, classes, attributes, inline styles and the rendered box that the
//! host's layout pass writes into `layout`. Insertions are recorded as
//! [`MutationRecord`]s, drained with [`Document::take_mutations`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{DeskError, DeskResult};
use crate::geometry::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Nodes inserted by one tree operation. Only the inserted subtree roots are
/// listed; descendants are implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
}

/// Inline style captured before an effect rewrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSnapshot(BTreeMap<String, String>);

impl StyleSnapshot {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Element {
    tag: String,
    classes: BTreeSet<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector<'a> {
    Class(&'a str),
    Attribute(&'a str),
    Id(&'a str),
    Tag(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if let Some(class) = raw.strip_prefix('.') {
            Selector::Class(class)
        } else if let Some(id) = raw.strip_prefix('#') {
            Selector::Id(id)
        } else if let Some(attr) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Selector::Attribute(attr)
        } else {
            Selector::Tag(raw)
        }
    }
}

#[derive(Debug)]
pub struct Document {
    nodes: BTreeMap<NodeId, Element>,
    root: NodeId,
    body: NodeId,
    next_id: u64,
    mutations: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: BTreeMap::new(),
            root: NodeId(0),
            body: NodeId(0),
            next_id: 0,
            mutations: Vec::new(),
        };
        let root = doc.create_element("html");
        let body = doc.create_element("body");
        if let Some(el) = doc.nodes.get_mut(&body) {
            el.parent = Some(root);
        }
        if let Some(el) = doc.nodes.get_mut(&root) {
            el.children.push(body);
        }
        doc.root = root;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Element {
                tag: tag.to_ascii_lowercase(),
                ..Element::default()
            },
        );
        id
    }

    /// Create a detached element carrying the given classes.
    pub fn create_with_classes(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let id = self.create_element(tag);
        for class in classes {
            self.add_class(id, class);
        }
        id
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn element(&self, node: NodeId) -> DeskResult<&Element> {
        self.nodes.get(&node).ok_or(DeskError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeId) -> DeskResult<&mut Element> {
        self.nodes.get_mut(&node).ok_or(DeskError::UnknownNode(node))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|el| el.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|el| el.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&child| child == node)
    }

    /// True when the parent chain reaches the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DeskResult<()> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index` among `parent`'s children (clamped), moving
    /// it out of its previous parent first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> DeskResult<()> {
        self.element(parent)?;
        self.element(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DeskError::Cycle { parent, child });
        }
        // Re-inserting into the same parent shifts indices after the detach.
        let mut index = index;
        if self.parent(child) == Some(parent)
            && let Some(current) = self.index_in_parent(child)
            && current < index
        {
            index -= 1;
        }
        self.detach(child)?;
        let el = self.element_mut(parent)?;
        let index = index.min(el.children.len());
        el.children.insert(index, child);
        self.element_mut(child)?.parent = Some(parent);
        if self.is_connected(parent) {
            self.mutations.push(MutationRecord { added: vec![child] });
        }
        Ok(())
    }

    /// Insert `child` right before `reference`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> DeskResult<()> {
        if self.parent(reference) != Some(parent) {
            return Err(DeskError::Detached(reference));
        }
        self.detach(child)?;
        let index = self
            .index_in_parent(reference)
            .ok_or(DeskError::Detached(reference))?;
        self.insert_child(parent, index, child)
    }

    /// Unlink `node` from its parent, keeping the subtree alive.
    pub fn detach(&mut self, node: NodeId) -> DeskResult<()> {
        let Some(parent) = self.element(node)?.parent else {
            return Ok(());
        };
        if let Some(el) = self.nodes.get_mut(&parent) {
            el.children.retain(|&c| c != node);
        }
        self.element_mut(node)?.parent = None;
        Ok(())
    }

    /// Detach `node` and drop its whole subtree from the arena.
    pub fn remove(&mut self, node: NodeId) -> DeskResult<()> {
        if node == self.root || node == self.body {
            return Ok(());
        }
        self.detach(node)?;
        let mut doomed = self.descendants(node);
        doomed.push(node);
        for id in doomed {
            self.nodes.remove(&id);
        }
        Ok(())
    }

    /// Pre-order descendants of `node`, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> bool {
        let Some(el) = self.nodes.get(&node) else {
            return false;
        };
        match Selector::parse(selector) {
            Selector::Class(class) => el.classes.contains(class),
            Selector::Attribute(attr) => el.attributes.contains_key(attr),
            Selector::Id(id) => el.attributes.get("id").is_some_and(|v| v == id),
            Selector::Tag(tag) => el.tag.eq_ignore_ascii_case(tag),
        }
    }

    /// Descendants of `scope` matching `selector`, in document order.
    pub fn select(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    /// Connected elements matching `selector`, in document order.
    pub fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.select(self.root, selector)
    }

    /// Nearest ancestor (excluding `node`) matching `selector`.
    pub fn closest_ancestor(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if self.matches(id, selector) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get_mut(&node)
            .is_some_and(|el| el.classes.insert(class.to_string()))
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get_mut(&node)
            .is_some_and(|el| el.classes.remove(class))
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|el| el.classes.contains(class))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|el| el.attributes.get(name))
            .map(String::as_str)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.attributes.remove(name);
        }
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: impl Into<String>) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.style.insert(property.to_string(), value.into());
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|el| el.style.get(property))
            .map(String::as_str)
    }

    pub fn remove_style(&mut self, node: NodeId, property: &str) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.style.remove(property);
        }
    }

    pub fn style_snapshot(&self, node: NodeId) -> StyleSnapshot {
        self.nodes
            .get(&node)
            .map(|el| StyleSnapshot(el.style.clone()))
            .unwrap_or_default()
    }

    /// Replace the whole inline style with `snapshot`.
    pub fn restore_style(&mut self, node: NodeId, snapshot: &StyleSnapshot) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.style = snapshot.0.clone();
        }
    }

    /// Rendered box in page coordinates. Zero-sized until laid out.
    pub fn layout(&self, node: NodeId) -> Geometry {
        self.nodes.get(&node).map(|el| el.layout).unwrap_or_default()
    }

    pub fn set_layout(&mut self, node: NodeId, layout: Geometry) {
        if let Some(el) = self.nodes.get_mut(&node) {
            el.layout = layout;
        }
    }

    /// Move `node` to `layout`, carrying its descendants' boxes along by the
    /// same offset. Sizes below `node` are left alone.
    pub fn relocate(&mut self, node: NodeId, layout: Geometry) {
        let old = self.layout(node);
        self.set_layout(node, layout);
        let (dx, dy) = (layout.x - old.x, layout.y - old.y);
        if dx == 0 && dy == 0 {
            return;
        }
        for child in self.descendants(node) {
            if let Some(el) = self.nodes.get_mut(&child) {
                el.layout = el.layout.translated(dx, dy);
            }
        }
    }

    /// Hidden through the `hidden` attribute or `display: none` on the node
    /// or any ancestor.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.has_attribute(id, "hidden") || self.style(id, "display") == Some("none") {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// Pre-order position of every connected node, root first.
    pub fn tree_positions(&self) -> BTreeMap<NodeId, u64> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .zip(0..)
            .collect()
    }
}
