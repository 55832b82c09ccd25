pub mod bitmap;
pub mod pixel_reveal;

pub use bitmap::Bitmap;
pub use pixel_reveal::{PixelRevealSet, RevealPhase, block_for_step};
