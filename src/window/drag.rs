//! Pointer gesture state machine for moving and resizing windows.
//!
//! The controller works purely in page coordinates: callers hand in the
//! window's page-space box and the container bounds, and receive the new
//! page-space box back. Converting to container-relative storage is the
//! caller's job.

use crate::geometry::{Geometry, Point};

use super::{GestureState, WindowId, WindowRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

/// Part of a window under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    TitleBar,
    ResizeGrip,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerTarget {
    pub id: WindowId,
    pub region: HitRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    /// Nothing to do for this pointer event.
    Ignored,
    /// Another gesture owns the pointer; the event was dropped.
    Busy,
    Started {
        id: WindowId,
        kind: GestureKind,
    },
    Moved {
        id: WindowId,
        geometry: Geometry,
    },
    Ended {
        id: WindowId,
        kind: GestureKind,
        /// Travel stayed under the click threshold.
        click: bool,
    },
}

/// Size and margin limits applied while a gesture is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureLimits {
    pub min_width: u32,
    pub min_height: u32,
    pub min_visible_margin: u32,
    pub click_threshold: u32,
}

#[derive(Debug, Clone, Copy)]
struct ActiveGesture {
    id: WindowId,
    kind: GestureKind,
    start_pointer: Point,
    /// Pointer minus the window's top-left at gesture start.
    grab_offset: Point,
    start_geometry: Geometry,
    /// Lowest height a resize may reach (locked min-height or the floor).
    height_floor: u32,
    travelled: bool,
}

#[derive(Debug)]
pub struct DragController {
    limits: GestureLimits,
    active: Option<ActiveGesture>,
    suppress_next_click: bool,
}

impl DragController {
    pub fn new(limits: GestureLimits) -> Self {
        Self {
            limits,
            active: None,
            suppress_next_click: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<(WindowId, GestureKind)> {
        self.active.map(|g| (g.id, g.kind))
    }

    /// Begin a gesture for `target` if the pointer landed on a title bar or
    /// resize grip and no other gesture is running.
    ///
    /// `start` is the window's current page-space box.
    pub fn begin(
        &mut self,
        registry: &mut WindowRegistry,
        target: PointerTarget,
        point: Point,
        start: Geometry,
    ) -> PointerOutcome {
        if self.active.is_some() {
            return PointerOutcome::Busy;
        }
        let kind = match target.region {
            HitRegion::TitleBar => GestureKind::Drag,
            HitRegion::ResizeGrip => GestureKind::Resize,
            HitRegion::Body => return PointerOutcome::Ignored,
        };
        let Some(handle) = registry.get_mut(target.id) else {
            return PointerOutcome::Ignored;
        };
        handle.gesture = match kind {
            GestureKind::Drag => GestureState::Dragging,
            GestureKind::Resize => GestureState::Resizing,
        };
        let height_floor = handle
            .locked_min_height
            .unwrap_or(0)
            .max(self.limits.min_height);
        self.active = Some(ActiveGesture {
            id: target.id,
            kind,
            start_pointer: point,
            grab_offset: Point::new(point.x - start.x, point.y - start.y),
            start_geometry: start,
            height_floor,
            travelled: false,
        });
        tracing::debug!(window_id = %target.id, ?kind, "gesture started");
        PointerOutcome::Started {
            id: target.id,
            kind,
        }
    }

    /// Apply a pointer move. `bounds` is the page-space box of the window's
    /// container.
    pub fn update(&mut self, point: Point, bounds: Geometry) -> PointerOutcome {
        let limits = self.limits;
        let Some(gesture) = self.active.as_mut() else {
            return PointerOutcome::Ignored;
        };
        if !gesture.travelled && exceeds_threshold(gesture.start_pointer, point, limits) {
            gesture.travelled = true;
            // The pointer-up ending a real drag must not double as a click.
            self.suppress_next_click = true;
        }
        let geometry = match gesture.kind {
            GestureKind::Drag => {
                let moved = Geometry {
                    x: point.x - gesture.grab_offset.x,
                    y: point.y - gesture.grab_offset.y,
                    ..gesture.start_geometry
                };
                clamp_to_container(moved, bounds, limits.min_visible_margin)
            }
            GestureKind::Resize => resize_from_corner(
                gesture.start_geometry,
                gesture.start_pointer,
                point,
                limits.min_width,
                gesture.height_floor,
            ),
        };
        PointerOutcome::Moved {
            id: gesture.id,
            geometry,
        }
    }

    /// End the gesture on pointer-up.
    pub fn finish(&mut self, registry: &mut WindowRegistry, point: Point) -> PointerOutcome {
        let Some(gesture) = self.active.take() else {
            return PointerOutcome::Ignored;
        };
        if let Some(handle) = registry.get_mut(gesture.id) {
            handle.gesture = GestureState::Idle;
        }
        let click =
            !gesture.travelled && !exceeds_threshold(gesture.start_pointer, point, self.limits);
        if click {
            self.suppress_next_click = false;
        }
        tracing::debug!(window_id = %gesture.id, kind = ?gesture.kind, click, "gesture ended");
        PointerOutcome::Ended {
            id: gesture.id,
            kind: gesture.kind,
            click,
        }
    }

    /// Abort the gesture without committing further geometry.
    pub fn cancel(&mut self, registry: &mut WindowRegistry) -> Option<WindowId> {
        let gesture = self.active.take()?;
        if let Some(handle) = registry.get_mut(gesture.id) {
            handle.gesture = GestureState::Idle;
        }
        self.suppress_next_click = false;
        tracing::debug!(window_id = %gesture.id, "gesture cancelled");
        Some(gesture.id)
    }

    pub fn click_suppressed(&self) -> bool {
        self.suppress_next_click
    }

    /// Intercept one click if a drag just ended. Returns true when the click
    /// must be swallowed; the suppression is consumed either way.
    pub fn take_click_suppression(&mut self) -> bool {
        std::mem::take(&mut self.suppress_next_click)
    }
}

fn exceeds_threshold(start: Point, point: Point, limits: GestureLimits) -> bool {
    start.x.abs_diff(point.x) >= limits.click_threshold
        || start.y.abs_diff(point.y) >= limits.click_threshold
}

/// Keep at least `margin` pixels of `rect` inside `bounds` on both axes.
///
/// Partial overhang is allowed; the margin shrinks to the window size for
/// windows smaller than it.
pub fn clamp_to_container(rect: Geometry, bounds: Geometry, margin: u32) -> Geometry {
    let visible_w = margin.min(rect.width).min(bounds.width) as i32;
    let visible_h = margin.min(rect.height).min(bounds.height) as i32;
    let min_x = bounds.x - (rect.width as i32 - visible_w);
    let max_x = bounds.right() - visible_w;
    let min_y = bounds.y - (rect.height as i32 - visible_h);
    let max_y = bounds.bottom() - visible_h;
    Geometry {
        x: rect.x.clamp(min_x, max_x.max(min_x)),
        y: rect.y.clamp(min_y, max_y.max(min_y)),
        ..rect
    }
}

/// Grow or shrink from the bottom-right grip, never below the size floor.
pub fn resize_from_corner(
    start: Geometry,
    start_pointer: Point,
    point: Point,
    min_width: u32,
    min_height: u32,
) -> Geometry {
    let dx = point.x - start_pointer.x;
    let dy = point.y - start_pointer.y;
    let width = (start.width as i64 + dx as i64).max(min_width.max(1) as i64);
    let height = (start.height as i64 + dy as i64).max(min_height.max(1) as i64);
    Geometry {
        width: width.min(u32::MAX as i64) as u32,
        height: height.min(u32::MAX as i64) as u32,
        ..start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn limits() -> GestureLimits {
        GestureLimits {
            min_width: 100,
            min_height: 60,
            min_visible_margin: 40,
            click_threshold: 5,
        }
    }

    fn registry_with(count: usize) -> (Document, WindowRegistry, Vec<WindowId>) {
        let mut doc = Document::new();
        let mut reg = WindowRegistry::new();
        let ids = (0..count)
            .map(|_| {
                let node = doc.create_with_classes("div", &["retro-window"]);
                doc.append_child(doc.body(), node).unwrap();
                reg.register(&mut doc, node).unwrap().id
            })
            .collect();
        (doc, reg, ids)
    }

    #[test]
    fn drag_follows_pointer_minus_grab_offset() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let start = Geometry::new(100, 100, 200, 150);
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        ctl.begin(&mut reg, target, Point::new(120, 110), start);
        assert!(reg.get(ids[0]).unwrap().is_dragging());
        let bounds = Geometry::new(0, 0, 1000, 800);
        let out = ctl.update(Point::new(220, 160), bounds);
        assert_eq!(
            out,
            PointerOutcome::Moved {
                id: ids[0],
                geometry: Geometry::new(200, 150, 200, 150)
            }
        );
    }

    #[test]
    fn drag_far_offscreen_keeps_margin_visible() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let bounds = Geometry::new(0, 0, 800, 600);
        let start = Geometry::new(300, 200, 200, 150);
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        ctl.begin(&mut reg, target, Point::new(310, 205), start);
        for point in [
            Point::new(-5000, -5000),
            Point::new(9000, 9000),
            Point::new(-5000, 9000),
        ] {
            let PointerOutcome::Moved { geometry, .. } = ctl.update(point, bounds) else {
                panic!("expected move");
            };
            let visible = geometry.clipped_to(bounds);
            assert!(visible.width >= 40, "only {} px visible", visible.width);
            assert!(visible.height >= 40, "only {} px visible", visible.height);
        }
    }

    #[test]
    fn second_pointer_down_is_ignored_while_busy() {
        let (_doc, mut reg, ids) = registry_with(2);
        let mut ctl = DragController::new(limits());
        let a = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        let b = PointerTarget {
            id: ids[1],
            region: HitRegion::TitleBar,
        };
        ctl.begin(&mut reg, a, Point::new(10, 10), Geometry::new(0, 0, 200, 100));
        let out = ctl.begin(
            &mut reg,
            b,
            Point::new(500, 500),
            Geometry::new(490, 490, 200, 100),
        );
        assert_eq!(out, PointerOutcome::Busy);
        assert_eq!(ctl.active(), Some((ids[0], GestureKind::Drag)));
        assert!(!reg.get(ids[1]).unwrap().is_dragging());
        assert!(reg.get(ids[0]).unwrap().is_dragging());
    }

    #[test]
    fn short_gesture_is_a_click_and_leaves_clicks_alone() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        let bounds = Geometry::new(0, 0, 800, 600);
        ctl.begin(&mut reg, target, Point::new(50, 50), Geometry::new(0, 0, 200, 100));
        ctl.update(Point::new(52, 53), bounds);
        let out = ctl.finish(&mut reg, Point::new(52, 53));
        assert!(matches!(out, PointerOutcome::Ended { click: true, .. }));
        assert!(!ctl.take_click_suppression());
    }

    #[test]
    fn real_drag_swallows_exactly_one_click() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        let bounds = Geometry::new(0, 0, 800, 600);
        ctl.begin(&mut reg, target, Point::new(50, 50), Geometry::new(0, 0, 200, 100));
        ctl.update(Point::new(90, 50), bounds);
        let out = ctl.finish(&mut reg, Point::new(90, 50));
        assert!(matches!(out, PointerOutcome::Ended { click: false, .. }));
        assert!(ctl.take_click_suppression());
        assert!(!ctl.take_click_suppression());
        assert!(!reg.get(ids[0]).unwrap().is_dragging());
    }

    #[test]
    fn resize_respects_floor_and_locked_height() {
        let (_doc, mut reg, ids) = registry_with(1);
        reg.get_mut(ids[0]).unwrap().locked_min_height = Some(140);
        let mut ctl = DragController::new(limits());
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::ResizeGrip,
        };
        let start = Geometry::new(10, 10, 300, 200);
        ctl.begin(&mut reg, target, Point::new(309, 209), start);
        assert!(reg.get(ids[0]).unwrap().is_resizing());
        let out = ctl.update(Point::new(0, 0), Geometry::new(0, 0, 800, 600));
        assert_eq!(
            out,
            PointerOutcome::Moved {
                id: ids[0],
                geometry: Geometry::new(10, 10, 100, 140)
            }
        );
    }

    #[test]
    fn body_press_starts_nothing() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::Body,
        };
        let out = ctl.begin(
            &mut reg,
            target,
            Point::new(5, 5),
            Geometry::new(0, 0, 50, 50),
        );
        assert_eq!(out, PointerOutcome::Ignored);
        assert!(!ctl.is_active());
    }

    #[test]
    fn cancel_returns_to_idle() {
        let (_doc, mut reg, ids) = registry_with(1);
        let mut ctl = DragController::new(limits());
        let target = PointerTarget {
            id: ids[0],
            region: HitRegion::TitleBar,
        };
        ctl.begin(&mut reg, target, Point::new(5, 5), Geometry::new(0, 0, 50, 50));
        assert_eq!(ctl.cancel(&mut reg), Some(ids[0]));
        assert!(!ctl.is_active());
        assert_eq!(reg.get(ids[0]).unwrap().gesture, GestureState::Idle);
        assert_eq!(
            ctl.update(Point::new(100, 100), Geometry::new(0, 0, 10, 10)),
            PointerOutcome::Ignored
        );
    }
}
