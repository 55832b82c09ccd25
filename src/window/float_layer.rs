//! Page-level layer that hosts windows while a gesture is active.
//!
//! A window nested in a transformed or clipped ancestor cannot escape that
//! ancestor visually. During a drag it is reparented into a single layer
//! under the body, positioned in page coordinates, and put back into its
//! original slot once the gesture ends.

use std::collections::BTreeMap;

use crate::constants::FLOAT_LAYER_ID;
use crate::dom::{Document, NodeId};
use crate::error::{DeskError, DeskResult};
use crate::geometry::Geometry;

use super::{WindowId, WindowRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Origin {
    parent: NodeId,
    index: usize,
    next_sibling: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct FloatLayer {
    layer: Option<NodeId>,
    origins: BTreeMap<WindowId, Origin>,
}

impl FloatLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.layer
    }

    pub fn is_floating(&self, id: WindowId) -> bool {
        self.origins.contains_key(&id)
    }

    /// Container the window was lifted out of.
    pub fn origin_parent(&self, id: WindowId) -> Option<NodeId> {
        self.origins.get(&id).map(|o| o.parent)
    }

    /// Drop the restore record of a window that vanished mid-gesture.
    pub fn forget(&mut self, id: WindowId) {
        self.origins.remove(&id);
    }

    fn ensure_layer(&mut self, doc: &mut Document) -> DeskResult<NodeId> {
        if let Some(layer) = self.layer
            && doc.is_connected(layer)
        {
            return Ok(layer);
        }
        let layer = doc.create_element("div");
        doc.set_attribute(layer, "id", FLOAT_LAYER_ID);
        doc.set_style(layer, "position", "fixed");
        doc.set_style(layer, "inset", "0");
        doc.set_style(layer, "pointer-events", "none");
        doc.append_child(doc.body(), layer)?;
        let root = doc.layout(doc.root());
        doc.set_layout(layer, Geometry::new(0, 0, root.width, root.height));
        self.layer = Some(layer);
        tracing::debug!(layer = %layer, "created float layer");
        Ok(layer)
    }

    /// Move the window into the float layer, keeping it at the same page
    /// position. Returns its page-space box.
    pub fn float(
        &mut self,
        doc: &mut Document,
        registry: &mut WindowRegistry,
        id: WindowId,
    ) -> DeskResult<Geometry> {
        let node = registry.handle(id)?.node;
        let page = doc.layout(node);
        if self.origins.contains_key(&id) {
            return Ok(page);
        }
        let parent = doc.parent(node).ok_or(DeskError::Detached(node))?;
        let index = doc.index_in_parent(node).ok_or(DeskError::Detached(node))?;
        let next_sibling = doc.children(parent).get(index + 1).copied();
        let layer = self.ensure_layer(doc)?;
        doc.append_child(layer, node)?;
        doc.set_style(node, "pointer-events", "auto");
        write_position(doc, node, page);
        self.origins.insert(
            id,
            Origin {
                parent,
                index,
                next_sibling,
            },
        );
        let handle = registry.handle_mut(id)?;
        handle.is_floating = true;
        handle.geometry = page;
        tracing::trace!(window_id = %id, %page, "floated window");
        Ok(page)
    }

    /// Put a floating window back where it came from, converting its page
    /// position to the original parent's coordinates. Returns the relative box.
    pub fn unfloat(
        &mut self,
        doc: &mut Document,
        registry: &mut WindowRegistry,
        id: WindowId,
    ) -> DeskResult<Geometry> {
        let node = registry.handle(id)?.node;
        let Some(origin) = self.origins.remove(&id) else {
            return Ok(registry.handle(id)?.geometry);
        };
        if !doc.is_connected(origin.parent) {
            // Original container vanished; leave the window where it is.
            tracing::warn!(window_id = %id, parent = %origin.parent, "float origin detached");
            registry.handle_mut(id)?.is_floating = false;
            return Err(DeskError::Detached(origin.parent));
        }
        match origin.next_sibling {
            Some(next) if doc.parent(next) == Some(origin.parent) => {
                doc.insert_before(origin.parent, node, next)?;
            }
            _ => doc.insert_child(origin.parent, origin.index, node)?,
        }
        doc.remove_style(node, "pointer-events");
        let page = doc.layout(node);
        let container = doc.layout(origin.parent);
        let relative = page.translated(-container.x, -container.y);
        write_position(doc, node, relative);
        doc.set_layout(node, page);
        let handle = registry.handle_mut(id)?;
        handle.is_floating = false;
        handle.geometry = relative;
        tracing::trace!(window_id = %id, %relative, "restored window");
        Ok(relative)
    }

    /// Remove the layer and everything still in it. Windows caught floating
    /// are unregistered; they belong to the page being torn down.
    pub fn teardown(&mut self, doc: &mut Document, registry: &mut WindowRegistry) -> Vec<WindowId> {
        let dropped: Vec<WindowId> = std::mem::take(&mut self.origins).into_keys().collect();
        for id in &dropped {
            registry.unregister(*id);
        }
        if let Some(layer) = self.layer.take()
            && doc.contains(layer)
            && let Err(err) = doc.remove(layer)
        {
            tracing::warn!(error = %err, "failed to remove float layer");
        }
        dropped
    }
}

/// Write `rect` as absolute left/top/width/height styles.
pub(crate) fn write_position(doc: &mut Document, node: NodeId, rect: Geometry) {
    doc.set_style(node, "position", "absolute");
    doc.set_style(node, "left", format!("{}px", rect.x));
    doc.set_style(node, "top", format!("{}px", rect.y));
    doc.set_style(node, "width", format!("{}px", rect.width));
    doc.set_style(node, "height", format!("{}px", rect.height));
}
