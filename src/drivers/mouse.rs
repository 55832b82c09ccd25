//! Terminal cells to page pixels and back.

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::geometry::{Geometry, Point};

pub const CELL_WIDTH_PX: i32 = 8;
pub const CELL_HEIGHT_PX: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub point: Point,
}

/// Centre of the cell, so a click lands inside thin page boxes.
pub fn cell_to_point(column: u16, row: u16) -> Point {
    Point::new(
        column as i32 * CELL_WIDTH_PX + CELL_WIDTH_PX / 2,
        row as i32 * CELL_HEIGHT_PX + CELL_HEIGHT_PX / 2,
    )
}

/// Primary-button events only; everything else is not a pointer gesture.
pub fn pointer_event(mouse: &MouseEvent) -> Option<PointerEvent> {
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => PointerKind::Move,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        _ => return None,
    };
    Some(PointerEvent {
        kind,
        point: cell_to_point(mouse.column, mouse.row),
    })
}

/// Cells covered by a page box, clipped to `area`. Partially covered cells
/// at the edges count.
pub fn geometry_to_cells(rect: Geometry, area: Rect) -> Option<Rect> {
    if rect.is_empty() {
        return None;
    }
    let left = rect.x.div_euclid(CELL_WIDTH_PX);
    let top = rect.y.div_euclid(CELL_HEIGHT_PX);
    let right = (rect.right() + CELL_WIDTH_PX - 1).div_euclid(CELL_WIDTH_PX);
    let bottom = (rect.bottom() + CELL_HEIGHT_PX - 1).div_euclid(CELL_HEIGHT_PX);

    let x0 = left.max(0) + area.x as i32;
    let y0 = top.max(0) + area.y as i32;
    let x1 = (right + area.x as i32).min(area.right() as i32);
    let y1 = (bottom + area.y as i32).min(area.bottom() as i32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(
        x0 as u16,
        y0 as u16,
        (x1 - x0) as u16,
        (y1 - y0) as u16,
    ))
}

/// Page size that exactly fills a terminal of `columns` x `rows`.
pub fn page_size(columns: u16, rows: u16) -> (u32, u32) {
    (
        columns as u32 * CELL_WIDTH_PX as u32,
        rows as u32 * CELL_HEIGHT_PX as u32,
    )
}
