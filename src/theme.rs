use std::sync::OnceLock;

use ratatui::style::Color;

// Retro desktop palette. Colors are defined as RGB and mapped to what the
// terminal supports at draw time.

pub const DESKTOP_RGB: (u8, u8, u8) = (0, 128, 128);
pub const WINDOW_RGB: (u8, u8, u8) = (192, 192, 192);
pub const TITLE_ACTIVE_RGB: (u8, u8, u8) = (0, 0, 128);
pub const TITLE_INACTIVE_RGB: (u8, u8, u8) = (128, 128, 128);
pub const SHADOW_DIM_RGB: (u8, u8, u8) = (64, 64, 96);
pub const SHADOW_BRIGHT_RGB: (u8, u8, u8) = (255, 215, 0);

static TRUECOLOR: OnceLock<bool> = OnceLock::new();

fn truecolor() -> bool {
    *TRUECOLOR.get_or_init(|| {
        std::env::var("COLORTERM").is_ok_and(|var| {
            let var = var.to_lowercase();
            var.contains("truecolor") || var.contains("24bit")
        })
    })
}

pub fn rgb_to_color(rgb: (u8, u8, u8)) -> Color {
    map_rgb(rgb, truecolor())
}

/// 24-bit color when the terminal advertises it, else the nearest entry of
/// the xterm 6x6x6 cube.
pub fn map_rgb((r, g, b): (u8, u8, u8), truecolor: bool) -> Color {
    if truecolor {
        return Color::Rgb(r, g, b);
    }
    let cube = |v: u8| ((v as u16 * 5 + 127) / 255) as u8;
    Color::Indexed(16 + 36 * cube(r) + 6 * cube(g) + cube(b))
}

pub fn desktop_bg() -> Color {
    rgb_to_color(DESKTOP_RGB)
}

pub fn window_bg() -> Color {
    rgb_to_color(WINDOW_RGB)
}

pub fn window_fg() -> Color {
    Color::Black
}

pub fn title_bg(active: bool) -> Color {
    rgb_to_color(if active {
        TITLE_ACTIVE_RGB
    } else {
        TITLE_INACTIVE_RGB
    })
}

pub fn title_fg() -> Color {
    Color::White
}

pub fn folder_fg() -> Color {
    Color::Yellow
}

pub fn status_bg() -> Color {
    Color::DarkGray
}

pub fn status_fg() -> Color {
    Color::White
}

/// Breathing shadow color for `phase` in `0.0..=1.0`.
pub fn shadow_pulse(phase: f32) -> Color {
    rgb_to_color(lerp_rgb(SHADOW_DIM_RGB, SHADOW_BRIGHT_RGB, phase))
}

fn lerp_rgb(from: (u8, u8, u8), to: (u8, u8, u8), t: f32) -> (u8, u8, u8) {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    (mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}
