//! Shared crate-wide constants: selectors, markers and pixel defaults.

/// Class carried by every draggable window element.
pub const WINDOW_CLASS: &str = "retro-window";
pub const WINDOW_SELECTOR: &str = ".retro-window";

/// Desktop folder icons. They are scattered alongside windows but never
/// registered as draggable handles.
pub const FOLDER_SELECTOR: &str = ".retro-folder";

/// Optional explicit title-bar child; when absent the top band of the window
/// acts as the title bar.
pub const TITLE_BAR_SELECTOR: &str = ".retro-titlebar";

/// "Cluttered desktop" containers eligible for scatter.
pub const DESKTOP_SELECTOR: &str = ".retro-desktop";

pub const IMAGE_SELECTOR: &str = "img";

/// Marker written on a container once scatter ran for it.
pub const SCATTERED_ATTR: &str = "data-scattered";

/// Opt-out marker for containers that must keep their authored layout.
pub const NO_SCATTER_ATTR: &str = "data-no-scatter";

/// Declared by windows created after the page loaded; they enter on top.
pub const NEW_WINDOW_ATTR: &str = "data-new-window";

/// Navigation target of a window (followed on an unsuppressed click).
pub const HREF_ATTR: &str = "data-href";

pub const TITLE_ATTR: &str = "data-title";

pub const BREATHING_SHADOW_CLASS: &str = "breathing-shadow";

pub const FLOAT_LAYER_ID: &str = "retro-float-layer";

/// Opt-in class for images outside windows that should still get the reveal.
pub const PIXEL_REVEAL_CLASS: &str = "pixel-reveal";

pub const PIXEL_WRAPPER_CLASS: &str = "pixel-reveal-wrapper";

pub const CANVAS_ID_PREFIX: &str = "pixel-canvas-";

/// Minimum number of pixels a dragged window must keep inside its container
/// on each axis so the user can grab it again.
pub const MIN_VISIBLE_MARGIN: u32 = 40;

/// Pointer travel (per axis) under which a gesture is treated as a click.
pub const CLICK_THRESHOLD: u32 = 5;

pub const MIN_WINDOW_WIDTH: u32 = 160;
pub const MIN_WINDOW_HEIGHT: u32 = 96;

/// Height of the implicit title-bar band.
pub const TITLE_BAR_HEIGHT: u32 = 24;

/// Side of the square resize grip in the bottom-right corner.
pub const RESIZE_GRIP: u32 = 16;

/// Frames a geometry lock keeps retrying for a window that has not been laid
/// out yet.
pub const MAX_LOCK_RETRIES: u8 = 10;

/// Largest dimension an SVG is rasterized at.
pub const MAX_IMAGE_DIM: u32 = 1024;
