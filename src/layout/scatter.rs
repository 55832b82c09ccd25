//! One-shot randomized placement for "cluttered desktop" containers.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::ScatterBounds;
use crate::constants::{
    DESKTOP_SELECTOR, FOLDER_SELECTOR, NO_SCATTER_ATTR, SCATTERED_ATTR, WINDOW_SELECTOR,
};
use crate::dom::{Document, NodeId};
use crate::error::{DeskError, DeskResult};
use crate::geometry::Geometry;
use crate::window::WindowRegistry;

/// Offset (relative to the container) and rotation given to one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterAssignment {
    pub x: i32,
    pub y: i32,
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScatterOutcome {
    Scattered(Vec<(NodeId, ScatterAssignment)>),
    /// Marker already present; nothing touched.
    AlreadyScattered,
    /// Container carries the opt-out marker or holds a single item.
    OptedOut,
    Empty,
}

#[derive(Debug)]
pub struct ScatterEngine {
    rng: SmallRng,
    bounds: ScatterBounds,
}

impl ScatterEngine {
    /// `seed` pins the layout (tests, reproducible demos); `None` gives a
    /// different layout on every session.
    pub fn new(bounds: ScatterBounds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self { rng, bounds }
    }

    pub fn bounds(&self) -> ScatterBounds {
        self.bounds
    }

    /// Scatter every connected desktop container that has not been scattered.
    pub fn scatter_all(
        &mut self,
        doc: &mut Document,
        registry: &mut WindowRegistry,
    ) -> Vec<(NodeId, ScatterOutcome)> {
        let containers = doc.query_all(DESKTOP_SELECTOR);
        let mut outcomes = Vec::with_capacity(containers.len());
        for container in containers {
            match self.scatter(doc, registry, container) {
                Ok(outcome) => outcomes.push((container, outcome)),
                Err(err) => {
                    tracing::warn!(container = %container, error = %err, "scatter skipped");
                }
            }
        }
        outcomes
    }

    /// Place the windows and folders of `container` once.
    pub fn scatter(
        &mut self,
        doc: &mut Document,
        registry: &mut WindowRegistry,
        container: NodeId,
    ) -> DeskResult<ScatterOutcome> {
        if !doc.contains(container) {
            return Err(DeskError::UnknownNode(container));
        }
        if doc.has_attribute(container, SCATTERED_ATTR) {
            return Ok(ScatterOutcome::AlreadyScattered);
        }
        if doc.has_attribute(container, NO_SCATTER_ATTR) {
            return Ok(ScatterOutcome::OptedOut);
        }
        let items = scatter_items(doc, container);
        match items.len() {
            0 => return Ok(ScatterOutcome::Empty),
            1 => return Ok(ScatterOutcome::OptedOut),
            _ => {}
        }

        let area = doc.layout(container);
        let mut placed: Vec<Geometry> = Vec::with_capacity(items.len());
        let mut assignments = Vec::with_capacity(items.len());
        for node in items {
            let size = doc.layout(node);
            let (x, y) = self.pick_position(area, size, &placed);
            let rotation = self.pick_rotation();
            placed.push(Geometry::new(x, y, size.width, size.height));

            doc.set_style(node, "position", "absolute");
            doc.set_style(node, "left", format!("{x}px"));
            doc.set_style(node, "top", format!("{y}px"));
            doc.set_style(node, "transform", format!("rotate({rotation:.2}deg)"));
            doc.relocate(
                node,
                Geometry::new(area.x + x, area.y + y, size.width, size.height),
            );
            if let Some(handle) = registry
                .id_for_node(node)
                .and_then(|id| registry.get_mut(id))
            {
                handle.geometry = Geometry::new(x, y, size.width, size.height);
            }
            assignments.push((node, ScatterAssignment { x, y, rotation }));
        }
        doc.set_attribute(container, SCATTERED_ATTR, "");
        tracing::debug!(container = %container, items = assignments.len(), "scattered container");
        Ok(ScatterOutcome::Scattered(assignments))
    }

    /// Best of `attempts` random candidates by overlap with items already
    /// placed. The first candidate wins ties.
    fn pick_position(&mut self, area: Geometry, size: Geometry, placed: &[Geometry]) -> (i32, i32) {
        let spread = self.bounds.spread.clamp(0.0, 1.0);
        let max_x = (area.width.saturating_sub(size.width) as f32 * spread) as i32;
        let max_y = (area.height.saturating_sub(size.height) as f32 * spread) as i32;
        let attempts = self.bounds.attempts.max(1);
        let mut best = (0, 0);
        let mut best_overlap = u64::MAX;
        for _ in 0..attempts {
            let x = self.rng.random_range(0..=max_x);
            let y = self.rng.random_range(0..=max_y);
            let candidate = Geometry::new(x, y, size.width, size.height);
            let overlap: u64 = placed.iter().map(|p| p.intersection_area(&candidate)).sum();
            if overlap < best_overlap {
                best = (x, y);
                best_overlap = overlap;
                if overlap == 0 {
                    break;
                }
            }
        }
        best
    }

    fn pick_rotation(&mut self) -> f32 {
        let max = self.bounds.max_rotation_deg.abs();
        if max == 0.0 {
            return 0.0;
        }
        self.rng.random_range(-max..=max)
    }
}

/// Windows and folders that belong to `container` itself, not to a nested
/// desktop.
fn scatter_items(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.descendants(container)
        .into_iter()
        .filter(|&node| doc.matches(node, WINDOW_SELECTOR) || doc.matches(node, FOLDER_SELECTOR))
        .filter(|&node| doc.closest_ancestor(node, DESKTOP_SELECTOR) == Some(container))
        .collect()
}
