//! Per-page-session context tying the window engine together.
//!
//! A [`Desk`] owns the document and every engine component. The host calls
//! the entry points below from its event loop: page/route lifecycle, pointer
//! events, clicks and one [`Desk::tick`] per frame. Failures inside visual
//! effects are logged and contained; no entry point fails the navigation.

use std::time::Instant;

use crate::config::DeskConfig;
use crate::constants::{FOLDER_SELECTOR, IMAGE_SELECTOR, TITLE_BAR_SELECTOR, WINDOW_SELECTOR};
use crate::dom::{Document, NodeId};
use crate::effects::{Bitmap, PixelRevealSet};
use crate::error::DeskResult;
use crate::geometry::{Geometry, Point};
use crate::layout::{ScatterEngine, ScatterOutcome};
use crate::observer::{Appeared, MutationBridge, batch_has_match};
use crate::window::float_layer::write_position;
use crate::window::{
    DragController, FloatLayer, FocusManager, GeometryLock, HitRegion, PointerOutcome,
    PointerTarget, WindowHandle, WindowId, WindowRegistry,
};

/// What the host should do with a click that reached a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    /// Deliver the click; `target` is the topmost window under the pointer.
    Allowed { target: Option<WindowId> },
    /// The click is the tail of a drag and must not navigate.
    Suppressed,
}

#[derive(Debug)]
pub struct Desk {
    config: DeskConfig,
    doc: Document,
    registry: WindowRegistry,
    drag: DragController,
    focus: FocusManager,
    lock: GeometryLock,
    scatter: ScatterEngine,
    float_layer: FloatLayer,
    reveals: PixelRevealSet,
    bridge: MutationBridge,
}

impl Desk {
    pub fn new(config: DeskConfig) -> Self {
        Self::with_document(config, Document::new())
    }

    pub fn with_document(config: DeskConfig, doc: Document) -> Self {
        Self {
            registry: WindowRegistry::new(),
            drag: DragController::new(config.gesture_limits()),
            focus: FocusManager::new(
                config.focus_poll_interval,
                config.pointer_focus_delay,
            ),
            lock: GeometryLock::new(config.lock_debounce),
            scatter: ScatterEngine::new(config.scatter, config.scatter_seed),
            float_layer: FloatLayer::new(),
            reveals: PixelRevealSet::new(
                config.reveal_steps,
                config.reveal_coarsest_block,
                config.reveal_frame,
            ),
            bridge: MutationBridge::new(),
            config,
            doc,
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable page access for the host (rendering new content, route swaps).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn reveals(&self) -> &PixelRevealSet {
        &self.reveals
    }

    pub fn float_layer(&self) -> &FloatLayer {
        &self.float_layer
    }

    pub fn geometry_lock(&self) -> &GeometryLock {
        &self.lock
    }

    pub fn topmost(&self) -> Option<WindowId> {
        self.focus.topmost()
    }

    pub fn active_gesture(&self) -> Option<WindowId> {
        self.drag.active().map(|(id, _)| id)
    }

    /// Snapshot of all windows, bottom to top.
    pub fn windows(&self) -> Vec<WindowHandle> {
        self.registry.all(&self.doc)
    }

    /// First full initialization pass of a page.
    pub fn page_ready(&mut self, now: Instant) {
        tracing::debug!("page ready");
        self.initialize(now);
    }

    /// All page resources finished loading; heights may have changed.
    pub fn window_loaded(&mut self, now: Instant) {
        self.lock.request(now);
    }

    /// Client-side navigation happened. The float layer and everything in it
    /// is destroyed unconditionally, stale records are dropped and the new
    /// page is initialized.
    pub fn route_changed(&mut self, now: Instant) {
        if let Some(id) = self.drag.cancel(&mut self.registry) {
            tracing::debug!(window_id = %id, "gesture cancelled by navigation");
        }
        // A drag's click suppression must not leak into the new page.
        self.drag.take_click_suppression();
        for id in self.float_layer.teardown(&mut self.doc, &mut self.registry) {
            self.forget_window(id);
        }
        let cancelled = self.reveals.cancel_detached(&mut self.doc);
        self.prune_stale();
        self.bridge.forget_disconnected(&self.doc);
        self.lock.cancel();
        self.focus.reset();
        tracing::debug!(
            cancelled_reveals = cancelled,
            windows = self.registry.len(),
            "route changed"
        );
        self.initialize(now);
    }

    fn initialize(&mut self, now: Instant) {
        let windows = self.doc.query_all(WINDOW_SELECTOR);
        for &node in &windows {
            if let Err(err) = self.registry.register(&mut self.doc, node) {
                tracing::warn!(node = %node, error = %err, "window registration failed");
            }
        }
        self.lock.request(now);
        self.scatter.scatter_all(&mut self.doc, &mut self.registry);
        self.reveals.attach_all(&mut self.doc);

        // Everything present now has been initialized; later batches only
        // need to report what is new.
        self.bridge.mark_seen(windows);
        self.bridge.mark_seen(self.doc.query_all(FOLDER_SELECTOR));
        self.bridge.mark_seen(self.doc.query_all(IMAGE_SELECTOR));
        self.doc.take_mutations();

        self.focus.apply(&mut self.doc, &mut self.registry);
    }

    /// Sink for the mutation bridge: initialize exactly the new nodes.
    pub fn handle_appeared(&mut self, appeared: Appeared, now: Instant) {
        if appeared.is_empty() {
            return;
        }
        for &node in &appeared.windows {
            if let Err(err) = self.registry.register(&mut self.doc, node) {
                tracing::warn!(node = %node, error = %err, "window registration failed");
            }
        }
        if !appeared.windows.is_empty() || !appeared.folders.is_empty() {
            self.lock.request(now);
        }
        for &container in &appeared.containers {
            if let Err(err) = self.scatter.scatter(&mut self.doc, &mut self.registry, container) {
                tracing::warn!(container = %container, error = %err, "scatter failed");
            }
        }
        let candidates = PixelRevealSet::candidates(&self.doc);
        for &image in appeared.images.iter().filter(|img| candidates.contains(img)) {
            if let Err(err) = self.reveals.attach(&mut self.doc, image) {
                tracing::debug!(image = %image, error = %err, "pixel reveal skipped");
            }
        }
        if !appeared.windows.is_empty() {
            self.focus.apply(&mut self.doc, &mut self.registry);
        }
    }

    /// Frame boundary.
    pub fn tick(&mut self, now: Instant) {
        let batch = self.doc.take_mutations();
        if !batch.is_empty() {
            if batch_has_match(&self.doc, &batch) {
                self.lock.request(now);
            }
            let appeared = self.bridge.collect(&self.doc, &batch);
            self.handle_appeared(appeared, now);
            // Our own wrapper/canvas inserts are not news.
            self.doc.take_mutations();
        }
        self.cancel_orphaned_gesture();
        self.prune_stale();
        self.lock.tick(now, &mut self.doc, &mut self.registry);
        self.reveals.tick(&mut self.doc, now);
        self.focus.tick(now, &mut self.doc, &mut self.registry);
    }

    /// Topmost visible window under `point` and the region that was hit.
    pub fn hit_test(&self, point: Point) -> Option<PointerTarget> {
        let handles = self.registry.all(&self.doc);
        let handle = handles
            .iter()
            .rev()
            .filter(|h| h.visible && self.doc.is_connected(h.node))
            .find(|h| self.doc.layout(h.node).contains(point))?;
        let rect = self.doc.layout(handle.node);
        let grip = self.config.resize_grip.min(rect.width).min(rect.height);
        let grip_rect = Geometry::new(
            rect.right() - grip as i32,
            rect.bottom() - grip as i32,
            grip,
            grip,
        );
        let region = if grip_rect.contains(point) {
            HitRegion::ResizeGrip
        } else if self.in_title_bar(handle.node, rect, point) {
            HitRegion::TitleBar
        } else {
            HitRegion::Body
        };
        Some(PointerTarget {
            id: handle.id,
            region,
        })
    }

    fn in_title_bar(&self, node: NodeId, rect: Geometry, point: Point) -> bool {
        let bars = self.doc.select(node, TITLE_BAR_SELECTOR);
        if bars.is_empty() {
            let height = self.config.title_bar_height.min(rect.height);
            return Geometry::new(rect.x, rect.y, rect.width, height).contains(point);
        }
        bars.iter().any(|&bar| self.doc.layout(bar).contains(point))
    }

    pub fn pointer_down(&mut self, point: Point, now: Instant) -> PointerOutcome {
        if self.drag.is_active() {
            return PointerOutcome::Busy;
        }
        let Some(target) = self.hit_test(point) else {
            return PointerOutcome::Ignored;
        };
        if let Err(err) = self.registry.raise(&mut self.doc, target.id) {
            tracing::warn!(window_id = %target.id, error = %err, "raise failed");
            return PointerOutcome::Ignored;
        }
        self.focus.apply(&mut self.doc, &mut self.registry);
        self.focus.schedule_pointer_refresh(now);
        if target.region == HitRegion::Body {
            return PointerOutcome::Ignored;
        }
        let start = match self.float_layer.float(&mut self.doc, &mut self.registry, target.id) {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(window_id = %target.id, error = %err, "could not float window");
                return PointerOutcome::Ignored;
            }
        };
        self.drag.begin(&mut self.registry, target, point, start)
    }

    pub fn pointer_move(&mut self, point: Point, _now: Instant) -> PointerOutcome {
        if self.cancel_orphaned_gesture() {
            return PointerOutcome::Ignored;
        }
        let Some(id) = self.active_gesture() else {
            return PointerOutcome::Ignored;
        };
        let bounds = self.gesture_bounds(id);
        let outcome = self.drag.update(point, bounds);
        if let PointerOutcome::Moved { id, geometry } = outcome
            && let Err(err) = self.commit_geometry(id, geometry)
        {
            tracing::warn!(window_id = %id, error = %err, "geometry update dropped");
        }
        outcome
    }

    pub fn pointer_up(&mut self, point: Point, _now: Instant) -> PointerOutcome {
        let outcome = self.drag.finish(&mut self.registry, point);
        if let PointerOutcome::Ended { id, .. } = outcome
            && let Err(err) = self.float_layer.unfloat(&mut self.doc, &mut self.registry, id)
        {
            tracing::warn!(window_id = %id, error = %err, "could not restore window");
        }
        outcome
    }

    /// A click event reached the page at `point`.
    pub fn click(&mut self, point: Point) -> ClickDisposition {
        if self.drag.take_click_suppression() {
            tracing::trace!("click after drag suppressed");
            return ClickDisposition::Suppressed;
        }
        ClickDisposition::Allowed {
            target: self.hit_test(point).map(|t| t.id),
        }
    }

    /// Attach the reveal to images rendered since the last pass. Safe to call
    /// any number of times. Returns how many images were attached.
    pub fn reinitialize_pixel_effect(&mut self) -> usize {
        let attached = self.reveals.attach_all(&mut self.doc);
        self.bridge.mark_seen(attached.iter().copied());
        self.doc.take_mutations();
        attached.len()
    }

    /// Scatter desktops rendered since the last pass. Already scattered
    /// containers are left alone. Returns how many containers were placed.
    pub fn reapply_scatter_effect(&mut self) -> usize {
        self.scatter
            .scatter_all(&mut self.doc, &mut self.registry)
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ScatterOutcome::Scattered(_)))
            .count()
    }

    /// Recompute the breathing shadow now, picking up z-indices changed
    /// outside the engine.
    pub fn refresh_breathing_shadow(&mut self) -> Option<WindowId> {
        let windows = self.doc.query_all(WINDOW_SELECTOR);
        for node in windows {
            if self.registry.id_for_node(node).is_none()
                && let Err(err) = self.registry.register(&mut self.doc, node)
            {
                tracing::warn!(node = %node, error = %err, "window registration failed");
            }
        }
        self.registry.sync_z_indices(&self.doc);
        self.focus.apply(&mut self.doc, &mut self.registry)
    }

    /// Externally routed z-index change; focus follows immediately.
    pub fn set_z_index(&mut self, id: WindowId, z_index: i64) -> DeskResult<()> {
        self.registry.set_z_index(&mut self.doc, id, z_index)?;
        self.focus.apply(&mut self.doc, &mut self.registry);
        Ok(())
    }

    pub fn image_loaded(&mut self, image: NodeId, source: Bitmap, now: Instant) -> bool {
        self.reveals.image_loaded(image, source, now)
    }

    pub fn image_failed(&mut self, image: NodeId) -> bool {
        self.reveals.image_failed(&mut self.doc, image)
    }

    /// Page box the active gesture is clamped to: the window's original
    /// container, or the whole page when that has no layout.
    fn gesture_bounds(&self, id: WindowId) -> Geometry {
        let page = self.doc.layout(self.doc.root());
        self.float_layer
            .origin_parent(id)
            .map(|parent| self.doc.layout(parent))
            .filter(|bounds| !bounds.is_empty())
            .unwrap_or(page)
    }

    /// Write a page-space box to the window's style, layout and handle.
    fn commit_geometry(&mut self, id: WindowId, page: Geometry) -> DeskResult<()> {
        let handle = self.registry.handle(id)?;
        let node = handle.node;
        let stored = if handle.is_floating {
            page
        } else {
            let origin = self
                .doc
                .parent(node)
                .map(|parent| self.doc.layout(parent))
                .unwrap_or_default();
            page.translated(-origin.x, -origin.y)
        };
        write_position(&mut self.doc, node, stored);
        self.doc.relocate(node, page);
        self.registry.handle_mut(id)?.geometry = stored;
        Ok(())
    }

    /// Cancel the active gesture if its window left the document. Returns
    /// true when a gesture was cancelled.
    fn cancel_orphaned_gesture(&mut self) -> bool {
        let Some(id) = self.active_gesture() else {
            return false;
        };
        let connected = self
            .registry
            .get(id)
            .is_some_and(|h| self.doc.contains(h.node) && self.doc.is_connected(h.node));
        if connected {
            return false;
        }
        self.drag.cancel(&mut self.registry);
        self.drag.take_click_suppression();
        self.float_layer.forget(id);
        tracing::debug!(window_id = %id, "window removed mid-gesture");
        true
    }

    fn prune_stale(&mut self) {
        let pruned = self.registry.prune(&self.doc);
        if pruned.is_empty() {
            return;
        }
        for id in pruned {
            self.forget_window(id);
        }
        // A node put back later must be reported as new again.
        self.bridge.forget_disconnected(&self.doc);
    }

    fn forget_window(&mut self, id: WindowId) {
        self.focus.forget(id);
        self.lock.forget(id);
        self.float_layer.forget(id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::constants::BREATHING_SHADOW_CLASS;

    fn config() -> DeskConfig {
        DeskConfig {
            scatter_seed: Some(42),
            ..DeskConfig::default()
        }
    }

    /// Plain page: body 1000x800 with `count` windows stacked diagonally.
    fn desk_with_windows(count: usize) -> (Desk, Vec<NodeId>) {
        let mut doc = Document::new();
        doc.set_layout(doc.root(), Geometry::new(0, 0, 1000, 800));
        doc.set_layout(doc.body(), Geometry::new(0, 0, 1000, 800));
        let nodes = (0..count)
            .map(|i| {
                let node = doc.create_with_classes("div", &["retro-window"]);
                doc.append_child(doc.body(), node).unwrap();
                let offset = i as i32 * 50;
                doc.set_layout(node, Geometry::new(100 + offset, 100 + offset, 300, 200));
                node
            })
            .collect();
        let mut desk = Desk::with_document(config(), doc);
        desk.page_ready(Instant::now());
        (desk, nodes)
    }

    fn id_of(desk: &Desk, node: NodeId) -> WindowId {
        desk.registry().id_for_node(node).unwrap()
    }

    #[test]
    fn page_ready_registers_and_highlights_the_last_window() {
        let (desk, nodes) = desk_with_windows(3);
        assert_eq!(desk.registry().len(), 3);
        assert_eq!(desk.topmost(), Some(id_of(&desk, nodes[2])));
        assert!(desk.document().has_class(nodes[2], BREATHING_SHADOW_CLASS));
    }

    #[test]
    fn title_bar_drag_moves_and_restores_the_window() {
        let (mut desk, nodes) = desk_with_windows(2);
        let now = Instant::now();
        let out = desk.pointer_down(Point::new(110, 105), now);
        assert!(matches!(out, PointerOutcome::Started { .. }));
        assert!(desk.float_layer().node().is_some());
        assert_eq!(desk.topmost(), Some(id_of(&desk, nodes[0])));

        desk.pointer_move(Point::new(210, 155), now);
        desk.pointer_up(Point::new(210, 155), now);
        let doc = desk.document();
        assert_eq!(doc.parent(nodes[0]), Some(doc.body()));
        assert_eq!(doc.layout(nodes[0]), Geometry::new(200, 150, 300, 200));
        assert_eq!(doc.style(nodes[0], "left"), Some("200px"));
        assert_eq!(desk.click(Point::new(210, 155)), ClickDisposition::Suppressed);
        assert!(matches!(
            desk.click(Point::new(210, 155)),
            ClickDisposition::Allowed { .. }
        ));
    }

    #[test]
    fn body_press_raises_without_a_gesture() {
        let (mut desk, nodes) = desk_with_windows(2);
        let out = desk.pointer_down(Point::new(120, 200), Instant::now());
        assert_eq!(out, PointerOutcome::Ignored);
        assert!(desk.active_gesture().is_none());
        assert_eq!(desk.topmost(), Some(id_of(&desk, nodes[0])));
    }

    #[test]
    fn grip_resizes_from_the_corner() {
        let (mut desk, nodes) = desk_with_windows(1);
        let now = Instant::now();
        let out = desk.pointer_down(Point::new(395, 295), now);
        assert!(matches!(
            out,
            PointerOutcome::Started {
                kind: crate::window::GestureKind::Resize,
                ..
            }
        ));
        desk.pointer_move(Point::new(495, 345), now);
        desk.pointer_up(Point::new(495, 345), now);
        assert_eq!(
            desk.document().layout(nodes[0]),
            Geometry::new(100, 100, 400, 250)
        );
    }

    #[test]
    fn route_change_destroys_float_layer_mid_drag() {
        let (mut desk, nodes) = desk_with_windows(2);
        let now = Instant::now();
        desk.pointer_down(Point::new(110, 105), now);
        assert!(desk.registry().get(id_of(&desk, nodes[0])).unwrap().is_floating);

        // the router swaps page content but never touches the float layer
        let doc = desk.document_mut();
        let old_page: Vec<NodeId> = doc
            .children(doc.body())
            .iter()
            .copied()
            .filter(|&child| !doc.matches(child, "#retro-float-layer"))
            .collect();
        for child in old_page {
            doc.remove(child).unwrap();
        }
        let fresh = doc.create_with_classes("div", &["retro-window"]);
        doc.append_child(doc.body(), fresh).unwrap();
        desk.route_changed(now);

        assert!(desk.document().query_all("#retro-float-layer").is_empty());
        assert!(desk.active_gesture().is_none());
        assert!(desk.windows().iter().all(|h| !h.is_floating));
        assert_eq!(desk.registry().len(), 1);
        assert!(desk.registry().id_for_node(fresh).is_some());
    }

    #[test]
    fn late_windows_are_picked_up_on_tick() {
        let (mut desk, _) = desk_with_windows(1);
        let now = Instant::now();
        let doc = desk.document_mut();
        let late = doc.create_with_classes("div", &["retro-window"]);
        doc.set_attribute(late, crate::constants::NEW_WINDOW_ATTR, "");
        doc.append_child(doc.body(), late).unwrap();
        desk.tick(now);
        let id = id_of(&desk, late);
        assert_eq!(desk.topmost(), Some(id));
        assert_eq!(desk.registry().len(), 2);
    }

    #[test]
    fn geometry_lock_runs_after_debounce_and_next_frame() {
        let (mut desk, nodes) = desk_with_windows(1);
        let start = Instant::now();
        desk.window_loaded(start);
        desk.tick(start + Duration::from_millis(300));
        desk.tick(start + Duration::from_millis(316));
        let id = id_of(&desk, nodes[0]);
        assert_eq!(desk.registry().get(id).unwrap().locked_min_height, Some(200));
        assert_eq!(desk.document().style(nodes[0], "min-height"), Some("200px"));
    }

    #[test]
    fn imperative_refreshes_are_idempotent() {
        let (mut desk, nodes) = desk_with_windows(2);
        assert_eq!(desk.reinitialize_pixel_effect(), 0);
        assert_eq!(desk.reapply_scatter_effect(), 0);
        let first = desk.refresh_breathing_shadow();
        assert_eq!(desk.refresh_breathing_shadow(), first);
        assert_eq!(first, Some(id_of(&desk, nodes[1])));
    }

    #[test]
    fn external_z_index_change_moves_focus() {
        let (mut desk, nodes) = desk_with_windows(3);
        let id = id_of(&desk, nodes[0]);
        desk.set_z_index(id, 100).unwrap();
        assert_eq!(desk.topmost(), Some(id));
        let highlighted = desk.document().query_all(".breathing-shadow");
        assert_eq!(highlighted, vec![nodes[0]]);
    }
}
