//! Draws a [`Desk`] into a ratatui frame.
//!
//! Windows are painted bottom to top. Inside a window the title bar comes
//! first, then its text, then at most one image area showing either the
//! pixel reveal canvas or the loaded image.

use std::collections::BTreeMap;
use std::f32::consts::TAU;
use std::time::Duration;

use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph, Wrap};

use crate::constants::{FOLDER_SELECTOR, TITLE_ATTR};
use crate::desk::Desk;
use crate::dom::{Document, NodeId};
use crate::drivers::mouse::geometry_to_cells;
use crate::effects::Bitmap;
use crate::theme;
use crate::window::WindowHandle;

/// Body text of a window or folder, set by whoever renders the page.
pub const TEXT_ATTR: &str = "data-text";

const RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
const BREATH_PERIOD_SECS: f32 = 2.4;

/// Everything the renderer needs besides the desk itself.
pub struct RenderContext<'a> {
    /// Decoded image data by `<img>` node.
    pub images: &'a BTreeMap<NodeId, Bitmap>,
    /// Time since the session started; drives the breathing shadow.
    pub elapsed: Duration,
    pub status: String,
}

/// 0..=1 brightness of the breathing shadow at `elapsed`.
pub fn breath_phase(elapsed: Duration) -> f32 {
    let t = elapsed.as_secs_f32() / BREATH_PERIOD_SECS;
    ((t * TAU).sin() + 1.0) / 2.0
}

pub fn render_desk(frame: &mut Frame, desk: &Desk, ctx: &RenderContext<'_>) {
    let area = frame.area();
    if area.width == 0 || area.height < 2 {
        return;
    }
    let page = Rect::new(area.x, area.y, area.width, area.height - 1);
    let status = Rect::new(area.x, area.bottom() - 1, area.width, 1);

    frame.render_widget(Block::new().style(Style::new().bg(theme::desktop_bg())), page);
    render_folders(frame, desk.document(), page);

    let doc = desk.document();
    let mut windows: Vec<WindowHandle> = desk
        .windows()
        .into_iter()
        .filter(|h| h.visible && doc.is_connected(h.node))
        .collect();
    windows.sort_by_key(|h| (h.z_index, h.raise_seq, h.dom_order));
    for handle in &windows {
        render_window(frame, desk, handle, page, ctx);
    }

    let line = Line::from(Span::raw(ctx.status.as_str()))
        .style(Style::new().bg(theme::status_bg()).fg(theme::status_fg()));
    frame.render_widget(Paragraph::new(line), status);
}

fn render_folders(frame: &mut Frame, doc: &Document, page: Rect) {
    for folder in doc.query_all(FOLDER_SELECTOR) {
        if doc.is_hidden(folder) {
            continue;
        }
        let Some(rect) = geometry_to_cells(doc.layout(folder), page) else {
            continue;
        };
        let label = doc
            .attribute(folder, TITLE_ATTR)
            .or_else(|| doc.attribute(folder, TEXT_ATTR))
            .unwrap_or("folder");
        let text = vec![
            Line::from("[=]").style(Style::new().fg(theme::folder_fg())),
            Line::from(label),
        ];
        frame.render_widget(Paragraph::new(text).centered(), rect);
    }
}

fn render_window(
    frame: &mut Frame,
    desk: &Desk,
    handle: &WindowHandle,
    page: Rect,
    ctx: &RenderContext<'_>,
) {
    let doc = desk.document();
    let Some(rect) = geometry_to_cells(doc.layout(handle.node), page) else {
        return;
    };
    let active = handle.has_breathing_shadow;
    let border_style = if active {
        Style::new().fg(theme::shadow_pulse(breath_phase(ctx.elapsed)))
    } else {
        Style::new().fg(theme::window_fg())
    };
    let title = doc.attribute(handle.node, TITLE_ATTR).unwrap_or("untitled");
    let title_style = Style::new()
        .bg(theme::title_bg(active))
        .fg(theme::title_fg())
        .add_modifier(Modifier::BOLD);
    let block = Block::bordered()
        .border_type(if active {
            BorderType::Double
        } else {
            BorderType::Plain
        })
        .border_style(border_style)
        .title(Line::from(format!(" {title} ")).style(title_style))
        .style(Style::new().bg(theme::window_bg()).fg(theme::window_fg()));
    let inner = block.inner(rect);
    frame.render_widget(Clear, rect);
    frame.render_widget(block, rect);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let text = doc.attribute(handle.node, TEXT_ATTR).unwrap_or_default();
    let text_rows = if text.is_empty() {
        0
    } else {
        text.lines().count().clamp(1, inner.height as usize / 2 + 1) as u16
    };
    if text_rows > 0 {
        let text_area = Rect::new(inner.x, inner.y, inner.width, text_rows.min(inner.height));
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), text_area);
    }
    let image_area = Rect::new(
        inner.x,
        inner.y + text_rows,
        inner.width,
        inner.height.saturating_sub(text_rows),
    );
    if image_area.height == 0 {
        return;
    }
    if let Some(bitmap) = window_picture(desk, handle.node, ctx.images) {
        draw_bitmap(frame.buffer_mut(), image_area, bitmap);
    }
}

/// The reveal canvas frame when one is live, else the image itself once it
/// is visible and decoded.
fn window_picture<'a>(
    desk: &'a Desk,
    window: NodeId,
    images: &'a BTreeMap<NodeId, Bitmap>,
) -> Option<&'a Bitmap> {
    let doc = desk.document();
    if let Some(frame) = doc
        .select(window, "canvas")
        .into_iter()
        .find_map(|canvas| desk.reveals().frame_for_canvas(canvas))
    {
        return Some(frame);
    }
    doc.select(window, "img")
        .into_iter()
        .filter(|&img| !doc.is_hidden(img) && doc.style(img, "visibility") != Some("hidden"))
        .find_map(|img| images.get(&img))
}

/// Nearest-sample the bitmap into `area` through the luminance ramp,
/// coloring each glyph with the sampled pixel.
pub fn draw_bitmap(buf: &mut Buffer, area: Rect, bitmap: &Bitmap) {
    let area = area.intersection(buf.area);
    if area.width == 0 || area.height == 0 || bitmap.width() == 0 || bitmap.height() == 0 {
        return;
    }
    for row in 0..area.height {
        let sy = (row as u32 * bitmap.height()) / area.height as u32;
        for col in 0..area.width {
            let sx = (col as u32 * bitmap.width()) / area.width as u32;
            let luma = bitmap.sample_luma(sx, sy);
            let glyph = RAMP[(luma as usize * (RAMP.len() - 1)) / 255];
            if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                cell.set_char(glyph);
                if let Some(rgb) = bitmap.sample_rgb(sx, sy) {
                    cell.set_fg(theme::rgb_to_color(rgb));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breath_phase_stays_in_range() {
        for ms in (0..5_000).step_by(137) {
            let p = breath_phase(Duration::from_millis(ms));
            assert!((0.0..=1.0).contains(&p));
        }
        assert!((breath_phase(Duration::ZERO) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bitmap_is_drawn_through_the_ramp() {
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        let white = Bitmap::solid(8, 8, [255, 255, 255, 255]).unwrap();
        draw_bitmap(&mut buf, area, &white);
        assert_eq!(buf[(0, 0)].symbol(), "@");
        assert_eq!(buf[(3, 1)].symbol(), "@");

        let black = Bitmap::solid(8, 8, [0, 0, 0, 255]).unwrap();
        draw_bitmap(&mut buf, area, &black);
        assert_eq!(buf[(2, 0)].symbol(), " ");
    }

    #[test]
    fn drawing_outside_the_buffer_is_a_no_op() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 2, 2));
        let bitmap = Bitmap::solid(2, 2, [255, 255, 255, 255]).unwrap();
        draw_bitmap(&mut buf, Rect::new(10, 10, 4, 4), &bitmap);
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }
}
