//! RGBA8 raster used as the source and the frames of the pixel reveal.

use std::path::Path;

use resvg::{tiny_skia, usvg};

use crate::constants::MAX_IMAGE_DIM;
use crate::error::{DeskError, DeskResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> DeskResult<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(4))
            .map(|v| v as usize);
        if width == 0 || height == 0 || expected != Some(rgba.len()) {
            return Err(DeskError::InvalidBitmap {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DeskResult<Self> {
        let count = width.saturating_mul(height) as usize;
        Self::new(width, height, rgba.repeat(count))
    }

    /// Diagonal two-color gradient; the playground's stand-in for photos.
    pub fn gradient(width: u32, height: u32, from: [u8; 3], to: [u8; 3]) -> DeskResult<Self> {
        let span = (width + height).saturating_sub(2).max(1);
        let mut rgba = Vec::with_capacity(width.saturating_mul(height) as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let t = (x + y) as f32 / span as f32;
                for c in 0..3 {
                    let v = from[c] as f32 + (to[c] as f32 - from[c] as f32) * t;
                    rgba.push(v.round() as u8);
                }
                rgba.push(255);
            }
        }
        Self::new(width, height, rgba)
    }

    pub fn from_svg_path<P: AsRef<Path>>(path: P) -> DeskResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_svg_bytes(&bytes)
    }

    /// Rasterize an SVG, scaling it down so its longest side is at most
    /// [`MAX_IMAGE_DIM`].
    pub fn from_svg_bytes(bytes: &[u8]) -> DeskResult<Self> {
        let options = usvg::Options::default();
        let tree = usvg::Tree::from_data(bytes, &options)
            .map_err(|err| DeskError::ImageDecode(err.to_string()))?;
        let size = tree.size().to_int_size();
        if size.width() == 0 || size.height() == 0 {
            return Err(DeskError::ImageDecode("invalid svg size".to_string()));
        }
        let max_dim = size.width().max(size.height());
        let scale = if max_dim > MAX_IMAGE_DIM {
            MAX_IMAGE_DIM as f32 / max_dim as f32
        } else {
            1.0
        };
        let target_w = ((size.width() as f32 * scale).round() as u32).max(1);
        let target_h = ((size.height() as f32 * scale).round() as u32).max(1);
        let mut pixmap = tiny_skia::Pixmap::new(target_w, target_h)
            .ok_or_else(|| DeskError::ImageDecode("pixmap alloc failed".to_string()))?;
        let transform = tiny_skia::Transform::from_scale(scale, scale);
        resvg::render(&tree, transform, &mut pixmap.as_mut());
        Self::new(target_w, target_h, pixmap.data().to_vec())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Average each `block`x`block` cell and paint it back flat. The size is
    /// unchanged; `block <= 1` returns an identical copy.
    pub fn pixelate(&self, block: u32) -> Bitmap {
        if block <= 1 {
            return self.clone();
        }
        let mut out = self.rgba.clone();
        for by in (0..self.height).step_by(block as usize) {
            for bx in (0..self.width).step_by(block as usize) {
                let x1 = (bx + block).min(self.width);
                let y1 = (by + block).min(self.height);
                let mut sum = [0u64; 4];
                for y in by..y1 {
                    for x in bx..x1 {
                        let idx = self.index(x, y);
                        for (c, acc) in sum.iter_mut().enumerate() {
                            *acc += self.rgba[idx + c] as u64;
                        }
                    }
                }
                let count = ((x1 - bx) * (y1 - by)) as u64;
                let avg = sum.map(|s| (s / count) as u8);
                for y in by..y1 {
                    for x in bx..x1 {
                        let idx = self.index(x, y);
                        out[idx..idx + 4].copy_from_slice(&avg);
                    }
                }
            }
        }
        Bitmap {
            width: self.width,
            height: self.height,
            rgba: out,
        }
    }

    /// Alpha-premultiplied color at `(x, y)`; `None` outside or transparent.
    pub fn sample_rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let chunk = self.rgba.get(idx..idx + 4)?;
        let alpha = chunk[3] as u16;
        if alpha == 0 {
            return None;
        }
        let r = (chunk[0] as u16 * alpha / 255) as u8;
        let g = (chunk[1] as u16 * alpha / 255) as u8;
        let b = (chunk[2] as u16 * alpha / 255) as u8;
        Some((r, g, b))
    }

    /// Rec. 601 luma; transparent pixels read as black.
    pub fn sample_luma(&self, x: u32, y: u32) -> u8 {
        self.sample_rgb(x, y)
            .map(|(r, g, b)| ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8)
            .unwrap_or(0)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(matches!(
            Bitmap::new(2, 2, vec![0; 15]),
            Err(DeskError::InvalidBitmap { len: 15, .. })
        ));
        assert!(Bitmap::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn pixelate_averages_blocks() {
        let rgba = vec![
            0, 0, 0, 255, 100, 100, 100, 255, //
            200, 200, 200, 255, 100, 100, 100, 255,
        ];
        let bmp = Bitmap::new(2, 2, rgba).unwrap();
        let out = bmp.pixelate(2);
        assert!(out.rgba().chunks_exact(4).all(|px| px == [100, 100, 100, 255]));
        assert_eq!(bmp.pixelate(1), bmp);
    }

    #[test]
    fn pixelate_handles_ragged_edges() {
        let bmp = Bitmap::gradient(5, 3, [0, 0, 0], [255, 255, 255]).unwrap();
        let out = bmp.pixelate(4);
        assert_eq!((out.width(), out.height()), (5, 3));
        assert_eq!(out.sample_rgb(0, 0), out.sample_rgb(3, 2));
        // last column is its own 1-wide block
        assert_eq!(out.sample_rgb(4, 0), out.sample_rgb(4, 2));
        assert_ne!(out.sample_rgb(3, 0), out.sample_rgb(4, 0));
    }

    #[test]
    fn loads_svg_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".svg").tempfile().unwrap();
        let svg = indoc! {r##"
            <svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">
              <rect width="20" height="10" fill="#ff0000"/>
            </svg>
        "##};
        file.write_all(svg.as_bytes()).unwrap();
        let bmp = Bitmap::from_svg_path(file.path()).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (20, 10));
        assert_eq!(bmp.sample_rgb(3, 3), Some((255, 0, 0)));
    }

    #[test]
    fn large_svg_is_capped() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="4096" height="2048"></svg>"#;
        let bmp = Bitmap::from_svg_bytes(svg).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (1024, 512));
    }

    #[test]
    fn garbage_svg_is_a_decode_error() {
        assert!(matches!(
            Bitmap::from_svg_bytes(b"not an svg"),
            Err(DeskError::ImageDecode(_))
        ));
    }
}
