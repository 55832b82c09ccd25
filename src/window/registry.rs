use std::collections::BTreeMap;

use crate::constants::NEW_WINDOW_ATTR;
use crate::dom::{Document, NodeId};
use crate::error::{DeskError, DeskResult};
use crate::geometry::Geometry;

use super::{GestureState, WindowHandle, WindowId};

/// Owns every live window record of a page session.
///
/// Handles handed out by [`WindowRegistry::all`] are snapshots; re-fetch after
/// any mutation you did not perform yourself.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    handles: BTreeMap<WindowId, WindowHandle>,
    by_node: BTreeMap<NodeId, WindowId>,
    next_id: u64,
    next_raise: u64,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` as a window, or return the existing handle.
    ///
    /// New windows (declared via the new-window marker) and windows without
    /// an authored z-index enter on top; an authored z-index is kept.
    pub fn register(&mut self, doc: &mut Document, node: NodeId) -> DeskResult<WindowHandle> {
        if let Some(existing) = self.by_node.get(&node).and_then(|id| self.handles.get(id)) {
            return Ok(existing.clone());
        }
        if !doc.contains(node) {
            return Err(DeskError::UnknownNode(node));
        }
        let authored = doc
            .style(node, "z-index")
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let declares_new = doc.has_attribute(node, NEW_WINDOW_ATTR);
        let z_index = match authored {
            Some(z) if !declares_new => z,
            _ => self.max_z_index().map_or(1, |max| max + 1),
        };
        doc.set_style(node, "z-index", z_index.to_string());

        let dom_order = doc
            .tree_positions()
            .get(&node)
            .copied()
            .unwrap_or(u64::MAX);
        let id = WindowId::new(self.next_id);
        self.next_id += 1;
        let handle = WindowHandle {
            id,
            node,
            z_index,
            geometry: relative_geometry(doc, node),
            locked_min_height: None,
            gesture: GestureState::Idle,
            is_floating: false,
            has_breathing_shadow: false,
            visible: doc.is_connected(node) && !doc.is_hidden(node),
            dom_order,
            raise_seq: 0,
        };
        tracing::debug!(window_id = %id, node = %node, z_index, "registered window");
        self.by_node.insert(node, id);
        self.handles.insert(id, handle.clone());
        Ok(handle)
    }

    pub fn unregister(&mut self, id: WindowId) -> Option<WindowHandle> {
        let handle = self.handles.remove(&id)?;
        self.by_node.remove(&handle.node);
        tracing::debug!(window_id = %id, "unregistered window");
        Some(handle)
    }

    /// Snapshot ordered by z-index ascending, document order breaking ties.
    /// Detached nodes sort after every connected one.
    pub fn all(&self, doc: &Document) -> Vec<WindowHandle> {
        let positions = doc.tree_positions();
        let mut handles: Vec<WindowHandle> = self
            .handles
            .values()
            .map(|h| WindowHandle {
                dom_order: positions.get(&h.node).copied().unwrap_or(u64::MAX),
                ..h.clone()
            })
            .collect();
        handles.sort_by_key(|h| (h.z_index, h.dom_order));
        handles
    }

    pub fn ids(&self) -> Vec<WindowId> {
        self.handles.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowHandle> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowHandle> {
        self.handles.get_mut(&id)
    }

    pub fn handle(&self, id: WindowId) -> DeskResult<&WindowHandle> {
        self.handles.get(&id).ok_or(DeskError::UnknownWindow(id))
    }

    pub fn handle_mut(&mut self, id: WindowId) -> DeskResult<&mut WindowHandle> {
        self.handles.get_mut(&id).ok_or(DeskError::UnknownWindow(id))
    }

    pub fn id_for_node(&self, node: NodeId) -> Option<WindowId> {
        self.by_node.get(&node).copied()
    }

    pub fn max_z_index(&self) -> Option<i64> {
        self.handles.values().map(|h| h.z_index).max()
    }

    /// Move `id` above every other window and write the new z-index. The
    /// window always takes the current maximum plus one, even when it is
    /// already on top.
    pub fn raise(&mut self, doc: &mut Document, id: WindowId) -> DeskResult<i64> {
        let top = self.max_z_index().unwrap_or(0);
        self.next_raise += 1;
        let seq = self.next_raise;
        let handle = self.handle_mut(id)?;
        handle.z_index = top + 1;
        handle.raise_seq = seq;
        let z = handle.z_index;
        doc.set_style(handle.node, "z-index", z.to_string());
        tracing::trace!(window_id = %id, z_index = z, "raised window");
        Ok(z)
    }

    /// Apply a z-index that was changed outside the engine.
    pub fn set_z_index(
        &mut self,
        doc: &mut Document,
        id: WindowId,
        z_index: i64,
    ) -> DeskResult<()> {
        self.next_raise += 1;
        let seq = self.next_raise;
        let handle = self.handle_mut(id)?;
        handle.z_index = z_index;
        handle.raise_seq = seq;
        doc.set_style(handle.node, "z-index", z_index.to_string());
        Ok(())
    }

    /// Re-read z-indices authored directly on the nodes. Returns true when any
    /// handle changed.
    pub fn sync_z_indices(&mut self, doc: &Document) -> bool {
        let mut changed = false;
        for handle in self.handles.values_mut() {
            let Some(z) = doc
                .style(handle.node, "z-index")
                .and_then(|raw| raw.trim().parse::<i64>().ok())
            else {
                continue;
            };
            if z != handle.z_index {
                self.next_raise += 1;
                handle.z_index = z;
                handle.raise_seq = self.next_raise;
                changed = true;
            }
        }
        changed
    }

    /// Refresh the visibility flag of every handle from the document.
    pub fn sync_visibility(&mut self, doc: &Document) {
        for handle in self.handles.values_mut() {
            handle.visible = doc.is_connected(handle.node) && !doc.is_hidden(handle.node);
        }
    }

    /// Drop handles whose node left the document. Returns the pruned ids.
    pub fn prune(&mut self, doc: &Document) -> Vec<WindowId> {
        let stale: Vec<WindowId> = self
            .handles
            .values()
            .filter(|h| !doc.contains(h.node) || !doc.is_connected(h.node))
            .map(|h| h.id)
            .collect();
        for id in &stale {
            self.unregister(*id);
        }
        stale
    }
}

/// Rendered box of `node` relative to its parent's box.
pub(crate) fn relative_geometry(doc: &Document, node: NodeId) -> Geometry {
    let layout = doc.layout(node);
    match doc.parent(node) {
        Some(parent) => {
            let origin = doc.layout(parent);
            layout.translated(-origin.x, -origin.y)
        }
        None => layout,
    }
}
