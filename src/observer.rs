//! Turns raw insertion records into "new entity appeared" notifications.
//!
//! The bridge only knows about [`MutationRecord`]s, so the initializers it
//! feeds (geometry lock, scatter, pixel reveal) can be driven in tests
//! without a real page.

use std::collections::BTreeSet;

use crate::constants::{DESKTOP_SELECTOR, FOLDER_SELECTOR, IMAGE_SELECTOR, WINDOW_SELECTOR};
use crate::dom::{Document, MutationRecord, NodeId};

/// Nodes that appeared in one batch and were not seen before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appeared {
    pub windows: Vec<NodeId>,
    pub folders: Vec<NodeId>,
    /// Desktop containers holding any of the new windows or folders.
    pub containers: Vec<NodeId>,
    pub images: Vec<NodeId>,
}

impl Appeared {
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
            && self.folders.is_empty()
            && self.containers.is_empty()
            && self.images.is_empty()
    }
}

fn is_entity(doc: &Document, node: NodeId) -> bool {
    doc.matches(node, WINDOW_SELECTOR) || doc.matches(node, FOLDER_SELECTOR)
}

/// Cheap check: does any record add a window or folder, directly or inside
/// the added subtree? Stops at the first hit.
pub fn batch_has_match(doc: &Document, batch: &[MutationRecord]) -> bool {
    batch
        .iter()
        .flat_map(|record| record.added.iter().copied())
        .any(|node| {
            is_entity(doc, node)
                || doc
                    .descendants(node)
                    .into_iter()
                    .any(|d| is_entity(doc, d))
        })
}

#[derive(Debug, Default)]
pub struct MutationBridge {
    seen: BTreeSet<NodeId>,
}

impl MutationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seen(&self, node: NodeId) -> bool {
        self.seen.contains(&node)
    }

    /// Mark nodes initialized by a full pass so later batches skip them.
    pub fn mark_seen(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.seen.extend(nodes);
    }

    /// Collect the new windows, folders, their containers and images from a
    /// batch. Nodes already seen, or no longer connected, are skipped.
    pub fn collect(&mut self, doc: &Document, batch: &[MutationRecord]) -> Appeared {
        let mut appeared = Appeared::default();
        let mut containers = BTreeSet::new();
        for root in batch.iter().flat_map(|record| record.added.iter().copied()) {
            if !doc.is_connected(root) {
                continue;
            }
            let mut nodes = vec![root];
            nodes.extend(doc.descendants(root));
            for node in nodes {
                let is_window = doc.matches(node, WINDOW_SELECTOR);
                let is_folder = doc.matches(node, FOLDER_SELECTOR);
                let is_image = doc.matches(node, IMAGE_SELECTOR);
                if !(is_window || is_folder || is_image) || !self.seen.insert(node) {
                    continue;
                }
                if is_window {
                    appeared.windows.push(node);
                } else if is_folder {
                    appeared.folders.push(node);
                } else {
                    appeared.images.push(node);
                }
                if (is_window || is_folder)
                    && let Some(container) = doc.closest_ancestor(node, DESKTOP_SELECTOR)
                {
                    containers.insert(container);
                }
            }
        }
        appeared.containers = containers.into_iter().collect();
        if !appeared.is_empty() {
            tracing::trace!(
                windows = appeared.windows.len(),
                folders = appeared.folders.len(),
                images = appeared.images.len(),
                "new entities appeared"
            );
        }
        appeared
    }

    /// Forget nodes that left the document so the set does not grow across
    /// route changes.
    pub fn forget_disconnected(&mut self, doc: &Document) {
        self.seen.retain(|&node| doc.contains(node) && doc.is_connected(node));
    }
}
