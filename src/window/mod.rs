pub mod drag;
pub mod float_layer;
pub mod focus;
pub mod geometry_lock;
pub mod registry;

use std::fmt;

use crate::dom::NodeId;
use crate::geometry::Geometry;

pub use drag::{
    DragController, GestureKind, GestureLimits, HitRegion, PointerOutcome, PointerTarget,
};
pub use float_layer::FloatLayer;
pub use focus::{FocusManager, compute_topmost};
pub use geometry_lock::{GeometryLock, LockOutcome, lock_height};
pub use registry::WindowRegistry;

/// Token assigned to a window node on registration. Stable for the node's
/// lifetime in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Pointer gesture a window is in. A single field keeps dragging and
/// resizing mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

/// Registry record for one window element.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowHandle {
    pub id: WindowId,
    pub node: NodeId,
    pub z_index: i64,
    /// Relative to the layout container, or to the page while floating.
    pub geometry: Geometry,
    /// Set once by the geometry lock and never lowered afterwards.
    pub locked_min_height: Option<u32>,
    pub gesture: GestureState,
    pub is_floating: bool,
    /// Mirrors "this is the topmost visible window"; recomputed by the focus manager.
    pub has_breathing_shadow: bool,
    pub visible: bool,
    /// Pre-order position in the document as of the last snapshot; final
    /// tie-break after z-index and raise order.
    pub(crate) dom_order: u64,
    /// Monotonic stamp of the last raise; 0 when never raised.
    pub(crate) raise_seq: u64,
}

impl WindowHandle {
    pub fn is_dragging(&self) -> bool {
        self.gesture == GestureState::Dragging
    }

    pub fn is_resizing(&self) -> bool {
        self.gesture == GestureState::Resizing
    }

    pub fn raise_seq(&self) -> u64 {
        self.raise_seq
    }
}
