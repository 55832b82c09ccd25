use std::time::Duration;

use crate::constants::{
    CLICK_THRESHOLD, MIN_VISIBLE_MARGIN, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, RESIZE_GRIP,
    TITLE_BAR_HEIGHT,
};
use crate::window::GestureLimits;

/// Tunables for scatter placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterBounds {
    /// Fraction (0..=1) of the container's free space a window may be offset into.
    pub spread: f32,
    /// Rotation is drawn uniformly from `-max_rotation_deg..=max_rotation_deg`.
    pub max_rotation_deg: f32,
    /// Candidate positions sampled per window; the least overlapping one wins.
    pub attempts: u32,
}

impl Default for ScatterBounds {
    fn default() -> Self {
        Self {
            spread: 0.8,
            max_rotation_deg: 4.0,
            attempts: 12,
        }
    }
}

/// Every knob the engine reads. One instance is owned by each
/// [`crate::desk::Desk`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// Upper bound on focus-highlight staleness for z-index changes that
    /// bypass the engine.
    pub focus_poll_interval: Duration,
    /// Delay between a pointer-down on a window and the focus refresh.
    pub pointer_focus_delay: Duration,
    /// Geometry lock coalescing window.
    pub lock_debounce: Duration,
    pub click_threshold: u32,
    pub min_visible_margin: u32,
    pub min_window_width: u32,
    pub min_window_height: u32,
    pub title_bar_height: u32,
    pub resize_grip: u32,
    pub scatter: ScatterBounds,
    /// Number of pixel reveal steps; the last one shows the full image.
    pub reveal_steps: u32,
    /// Block size (pixels) of the coarsest reveal step.
    pub reveal_coarsest_block: u32,
    /// Minimum time between two reveal steps.
    pub reveal_frame: Duration,
    /// Fixed scatter seed; `None` draws one from the OS each session.
    pub scatter_seed: Option<u64>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            focus_poll_interval: Duration::from_millis(400),
            pointer_focus_delay: Duration::from_millis(10),
            lock_debounce: Duration::from_millis(300),
            click_threshold: CLICK_THRESHOLD,
            min_visible_margin: MIN_VISIBLE_MARGIN,
            min_window_width: MIN_WINDOW_WIDTH,
            min_window_height: MIN_WINDOW_HEIGHT,
            title_bar_height: TITLE_BAR_HEIGHT,
            resize_grip: RESIZE_GRIP,
            scatter: ScatterBounds::default(),
            reveal_steps: 8,
            reveal_coarsest_block: 32,
            reveal_frame: Duration::from_millis(60),
            scatter_seed: None,
        }
    }
}

impl DeskConfig {
    pub fn gesture_limits(&self) -> GestureLimits {
        GestureLimits {
            min_width: self.min_window_width,
            min_height: self.min_window_height,
            min_visible_margin: self.min_visible_margin,
            click_threshold: self.click_threshold,
        }
    }
}
