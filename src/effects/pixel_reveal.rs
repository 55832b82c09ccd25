//! Progressive low-to-high resolution reveal of images as they load.
//!
//! Attaching wraps the image in a positioned wrapper, overlays a canvas of the
//! same box and hides the image with `visibility: hidden` so layout does not
//! move. Once the source bitmap arrives, each frame tick draws a less
//! pixelated rendition onto the canvas. After the last step the wrapper goes
//! away and the image gets back its exact pre-wrap inline style.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::constants::{
    CANVAS_ID_PREFIX, IMAGE_SELECTOR, PIXEL_REVEAL_CLASS, PIXEL_WRAPPER_CLASS, WINDOW_SELECTOR,
};
use crate::dom::{Document, NodeId, StyleSnapshot};
use crate::error::{DeskError, DeskResult};

use super::bitmap::Bitmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    /// Wrapped, waiting for the image data.
    Pending,
    Animating { step: u32 },
    Done,
    Failed,
    Cancelled,
}

impl RevealPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug)]
struct Reveal {
    wrapper: NodeId,
    canvas: NodeId,
    canvas_id: String,
    snapshot: StyleSnapshot,
    phase: RevealPhase,
    source: Option<Bitmap>,
    frame: Option<Bitmap>,
    last_step: Option<Instant>,
}

/// Block edge (pixels) drawn at `step`. Halves from `coarsest` each step and
/// is always 1 on the last drawn step.
pub fn block_for_step(step: u32, steps: u32, coarsest: u32) -> u32 {
    if step + 1 >= steps {
        return 1;
    }
    coarsest.checked_shr(step).unwrap_or(0).max(1)
}

/// All reveals of a page session. Instances share nothing but the canvas id
/// counter.
#[derive(Debug)]
pub struct PixelRevealSet {
    active: BTreeMap<NodeId, Reveal>,
    finished: BTreeMap<NodeId, RevealPhase>,
    next_canvas: u64,
    steps: u32,
    coarsest_block: u32,
    frame_interval: Duration,
}

impl PixelRevealSet {
    pub fn new(steps: u32, coarsest_block: u32, frame_interval: Duration) -> Self {
        Self {
            active: BTreeMap::new(),
            finished: BTreeMap::new(),
            next_canvas: 0,
            steps: steps.max(1),
            coarsest_block: coarsest_block.max(1),
            frame_interval,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn phase(&self, image: NodeId) -> Option<RevealPhase> {
        self.active
            .get(&image)
            .map(|r| r.phase)
            .or_else(|| self.finished.get(&image).copied())
    }

    pub fn canvas_id(&self, image: NodeId) -> Option<&str> {
        self.active.get(&image).map(|r| r.canvas_id.as_str())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Current canvas contents for a canvas node.
    pub fn frame_for_canvas(&self, canvas: NodeId) -> Option<&Bitmap> {
        self.active
            .values()
            .find(|r| r.canvas == canvas)
            .and_then(|r| r.frame.as_ref())
    }

    /// Images eligible for the effect: images inside windows, plus any image
    /// carrying the opt-in class.
    pub fn candidates(doc: &Document) -> Vec<NodeId> {
        doc.query_all(IMAGE_SELECTOR)
            .into_iter()
            .filter(|&img| {
                doc.has_class(img, PIXEL_REVEAL_CLASS)
                    || doc.closest_ancestor(img, WINDOW_SELECTOR).is_some()
            })
            .collect()
    }

    /// Attach to every eligible image not seen before. Returns the images
    /// that were attached by this call.
    pub fn attach_all(&mut self, doc: &mut Document) -> Vec<NodeId> {
        let mut attached = Vec::new();
        for image in Self::candidates(doc) {
            match self.attach(doc, image) {
                Ok(true) => attached.push(image),
                Ok(false) => {}
                Err(err) => tracing::debug!(image = %image, error = %err, "pixel reveal skipped"),
            }
        }
        attached
    }

    /// Wrap `image` and overlay its canvas. Returns false when the image is
    /// already handled or finished; a finished image is never wrapped again.
    pub fn attach(&mut self, doc: &mut Document, image: NodeId) -> DeskResult<bool> {
        if self.active.contains_key(&image) || self.finished.contains_key(&image) {
            return Ok(false);
        }
        if !doc.contains(image) {
            return Err(DeskError::UnknownNode(image));
        }
        let parent = doc.parent(image).ok_or(DeskError::Detached(image))?;
        if !doc.is_connected(parent) {
            return Err(DeskError::Detached(image));
        }
        let snapshot = doc.style_snapshot(image);
        let layout = doc.layout(image);

        let wrapper = doc.create_with_classes("div", &[PIXEL_WRAPPER_CLASS]);
        doc.set_style(wrapper, "position", "relative");
        doc.set_style(wrapper, "display", "inline-block");
        doc.insert_before(parent, wrapper, image)?;
        doc.append_child(wrapper, image)?;
        doc.set_layout(wrapper, layout);

        let canvas_id = format!("{CANVAS_ID_PREFIX}{}", self.next_canvas);
        self.next_canvas += 1;
        let canvas = doc.create_element("canvas");
        doc.set_attribute(canvas, "id", canvas_id.clone());
        doc.set_attribute(canvas, "width", layout.width.to_string());
        doc.set_attribute(canvas, "height", layout.height.to_string());
        doc.set_style(canvas, "position", "absolute");
        doc.set_style(canvas, "inset", "0");
        doc.append_child(wrapper, canvas)?;
        doc.set_layout(canvas, layout);

        doc.set_style(image, "visibility", "hidden");
        tracing::debug!(image = %image, canvas_id = %canvas_id, "pixel reveal attached");
        self.active.insert(
            image,
            Reveal {
                wrapper,
                canvas,
                canvas_id,
                snapshot,
                phase: RevealPhase::Pending,
                source: None,
                frame: None,
                last_step: None,
            },
        );
        Ok(true)
    }

    /// The image data arrived; draw the coarsest frame right away.
    pub fn image_loaded(&mut self, image: NodeId, source: Bitmap, now: Instant) -> bool {
        let coarsest = self.coarsest_block;
        let steps = self.steps;
        let Some(reveal) = self.active.get_mut(&image) else {
            return false;
        };
        if reveal.phase != RevealPhase::Pending {
            return false;
        }
        reveal.frame = Some(source.pixelate(block_for_step(0, steps, coarsest)));
        reveal.source = Some(source);
        reveal.phase = RevealPhase::Animating { step: 0 };
        reveal.last_step = Some(now);
        tracing::trace!(image = %image, step = 0, "pixel reveal started");
        true
    }

    /// Image failed to load: unwrap and fall back to the plain image.
    pub fn image_failed(&mut self, doc: &mut Document, image: NodeId) -> bool {
        let Some(reveal) = self.active.remove(&image) else {
            return false;
        };
        tracing::debug!(
            image = %image,
            canvas_id = %reveal.canvas_id,
            "image failed to load; reveal aborted"
        );
        unwrap_image(doc, image, &reveal);
        self.finished.insert(image, RevealPhase::Failed);
        true
    }

    /// Advance animations by at most one step each and cancel reveals whose
    /// image left the document. Returns true if anything changed.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> bool {
        let mut changed = self.cancel_detached(doc) > 0;
        let steps = self.steps;
        let coarsest = self.coarsest_block;
        let interval = self.frame_interval;
        let mut completed = Vec::new();
        for (&image, reveal) in self.active.iter_mut() {
            let RevealPhase::Animating { step } = reveal.phase else {
                continue;
            };
            let due = reveal
                .last_step
                .is_none_or(|last| now.saturating_duration_since(last) >= interval);
            if !due {
                continue;
            }
            let next = step + 1;
            reveal.last_step = Some(now);
            changed = true;
            if next >= steps {
                completed.push(image);
                continue;
            }
            reveal.phase = RevealPhase::Animating { step: next };
            if let Some(source) = reveal.source.as_ref() {
                reveal.frame = Some(source.pixelate(block_for_step(next, steps, coarsest)));
            }
            tracing::trace!(image = %image, step = next, "pixel reveal step");
        }
        for image in completed {
            if let Some(reveal) = self.active.remove(&image) {
                unwrap_image(doc, image, &reveal);
                self.finished.insert(image, RevealPhase::Done);
                tracing::debug!(image = %image, canvas_id = %reveal.canvas_id, "pixel reveal done");
            }
        }
        changed
    }

    /// Cancel every reveal whose image is no longer connected. Returns how
    /// many were cancelled.
    pub fn cancel_detached(&mut self, doc: &mut Document) -> usize {
        let detached: Vec<NodeId> = self
            .active
            .keys()
            .copied()
            .filter(|&image| !doc.contains(image) || !doc.is_connected(image))
            .collect();
        for image in &detached {
            if let Some(reveal) = self.active.remove(image) {
                if doc.contains(*image) {
                    // Detached with its window; leave it unwrapped in case
                    // the subtree comes back.
                    unwrap_image(doc, *image, &reveal);
                } else if doc.contains(reveal.wrapper)
                    && let Err(err) = doc.remove(reveal.wrapper)
                {
                    tracing::warn!(error = %err, "failed to drop reveal wrapper");
                }
                self.finished.insert(*image, RevealPhase::Cancelled);
                tracing::debug!(
                    image = %image,
                    canvas_id = %reveal.canvas_id,
                    "pixel reveal cancelled"
                );
            }
        }
        // Terminal markers for nodes that no longer exist are dead weight.
        self.finished.retain(|&image, _| doc.contains(image));
        detached.len()
    }
}

/// Put the image back in the wrapper's slot, drop the wrapper and canvas and
/// restore the inline style captured at attach time.
fn unwrap_image(doc: &mut Document, image: NodeId, reveal: &Reveal) {
    if let Some(parent) = doc.parent(reveal.wrapper)
        && let Err(err) = doc.insert_before(parent, image, reveal.wrapper)
    {
        tracing::warn!(image = %image, error = %err, "failed to move image out of reveal wrapper");
    }
    if doc.contains(reveal.wrapper)
        && let Err(err) = doc.remove(reveal.wrapper)
    {
        tracing::warn!(error = %err, "failed to drop reveal wrapper");
    }
    doc.restore_style(image, &reveal.snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let window = doc.create_with_classes("div", &["retro-window"]);
        doc.append_child(doc.body(), window).unwrap();
        let image = doc.create_element("img");
        doc.append_child(window, image).unwrap();
        doc.set_layout(image, Geometry::new(10, 10, 64, 32));
        doc.set_style(image, "border", "1px solid black");
        (doc, window, image)
    }

    fn set() -> PixelRevealSet {
        PixelRevealSet::new(4, 16, Duration::from_millis(60))
    }

    fn source() -> Bitmap {
        Bitmap::gradient(64, 32, [0, 0, 0], [255, 255, 255]).unwrap()
    }

    #[test]
    fn block_schedule_halves_and_ends_at_one() {
        let blocks: Vec<u32> = (0..4).map(|i| block_for_step(i, 4, 16)).collect();
        assert_eq!(blocks, vec![16, 8, 4, 1]);
        assert_eq!(block_for_step(0, 1, 32), 1);
        assert_eq!(block_for_step(40, 50, 32), 1);
    }

    #[test]
    fn attach_wraps_and_hides_without_display_none() {
        let (mut doc, window, image) = page();
        let mut reveals = set();
        assert!(reveals.attach(&mut doc, image).unwrap());
        let wrapper = doc.parent(image).unwrap();
        assert!(doc.has_class(wrapper, PIXEL_WRAPPER_CLASS));
        assert_eq!(doc.parent(wrapper), Some(window));
        assert_eq!(doc.style(image, "visibility"), Some("hidden"));
        assert!(doc.style(image, "display").is_none());
        let canvas = doc.query_all("#pixel-canvas-0");
        assert_eq!(canvas.len(), 1);
        assert_eq!(doc.layout(canvas[0]), doc.layout(image));
        // second attach is a no-op
        assert!(!reveals.attach(&mut doc, image).unwrap());
    }

    #[test]
    fn reveal_terminates_and_restores_style() {
        let (mut doc, window, image) = page();
        let before = doc.style_snapshot(image);
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        let start = Instant::now();
        reveals.image_loaded(image, source(), start);
        for i in 1..=4u64 {
            reveals.tick(&mut doc, start + Duration::from_millis(60 * i));
        }
        assert_eq!(reveals.phase(image), Some(RevealPhase::Done));
        assert_eq!(doc.parent(image), Some(window));
        assert!(doc.query_all("canvas").is_empty());
        assert!(doc.query_all(".pixel-reveal-wrapper").is_empty());
        assert_eq!(doc.style_snapshot(image), before);
        // terminal state is never re-entered
        assert!(!reveals.attach(&mut doc, image).unwrap());
        assert_eq!(reveals.phase(image), Some(RevealPhase::Done));
    }

    #[test]
    fn steps_wait_for_the_frame_interval() {
        let (mut doc, _, image) = page();
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        let start = Instant::now();
        reveals.image_loaded(image, source(), start);
        assert!(!reveals.tick(&mut doc, start + Duration::from_millis(30)));
        assert_eq!(reveals.phase(image), Some(RevealPhase::Animating { step: 0 }));
        assert!(reveals.tick(&mut doc, start + Duration::from_millis(60)));
        assert_eq!(reveals.phase(image), Some(RevealPhase::Animating { step: 1 }));
    }

    #[test]
    fn last_drawn_frame_is_full_resolution() {
        let (mut doc, _, image) = page();
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        let canvas = doc.query_all("canvas")[0];
        let start = Instant::now();
        reveals.image_loaded(image, source(), start);
        for i in 1..=3u64 {
            reveals.tick(&mut doc, start + Duration::from_millis(60 * i));
        }
        assert_eq!(reveals.frame_for_canvas(canvas), Some(&source()));
    }

    #[test]
    fn failed_load_restores_plain_image() {
        let (mut doc, window, image) = page();
        let before = doc.style_snapshot(image);
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        assert!(reveals.image_failed(&mut doc, image));
        assert_eq!(reveals.phase(image), Some(RevealPhase::Failed));
        assert_eq!(doc.children(window), &[image]);
        assert_eq!(doc.style_snapshot(image), before);
    }

    #[test]
    fn removal_mid_animation_cancels() {
        let (mut doc, window, image) = page();
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        let start = Instant::now();
        reveals.image_loaded(image, source(), start);
        doc.detach(window).unwrap();
        reveals.tick(&mut doc, start + Duration::from_millis(60));
        assert_eq!(reveals.phase(image), Some(RevealPhase::Cancelled));
        assert_eq!(reveals.active_count(), 0);
        assert_eq!(doc.children(window), &[image]);
    }

    #[test]
    fn removed_image_drops_its_wrapper() {
        let (mut doc, window, image) = page();
        let mut reveals = set();
        reveals.attach(&mut doc, image).unwrap();
        doc.remove(image).unwrap();
        assert_eq!(reveals.cancel_detached(&mut doc), 1);
        assert!(doc.children(window).is_empty());
        assert!(reveals.phase(image).is_none());
    }

    #[test]
    fn concurrent_reveals_get_unique_canvases() {
        let (mut doc, window, first) = page();
        let second = doc.create_element("img");
        doc.append_child(window, second).unwrap();
        let stray = doc.create_element("img");
        doc.append_child(doc.body(), stray).unwrap();
        let mut reveals = set();
        let attached = reveals.attach_all(&mut doc);
        assert_eq!(attached, vec![first, second]);
        assert_ne!(reveals.canvas_id(first), reveals.canvas_id(second));
        assert!(reveals.phase(stray).is_none());
    }
}
