use thiserror::Error;

use crate::dom::NodeId;
use crate::window::WindowId;

/// Failures raised inside the window engine.
///
/// Navigation entry points on [`crate::desk::Desk`] never surface these; they
/// are logged and the affected effect is skipped.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("unknown window {0}")]
    UnknownWindow(WindowId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not attached to the document")]
    Detached(NodeId),
    #[error("cannot attach node {child} under its own subtree {parent}")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("image decode failed: {0}")]
    ImageDecode(String),
    #[error("bitmap {width}x{height} does not match {len} bytes of rgba data")]
    InvalidBitmap { width: u32, height: u32, len: usize },
    #[error("image read failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
