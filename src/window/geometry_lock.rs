//! Freezes a window's first stable height as its CSS minimum height so that
//! moving windows around never makes their content reflow.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::constants::MAX_LOCK_RETRIES;
use crate::dom::Document;
use crate::scheduler::Coalescer;

use super::{WindowHandle, WindowId, WindowRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Locked(u32),
    AlreadyLocked,
    /// Height still reads 0; retry on a later frame.
    NotLaidOut,
}

/// Lock `handle`'s current rendered height as its minimum height.
///
/// No-op once locked: the stored value never changes afterwards, even if the
/// rendered height shrinks later.
pub fn lock_height(doc: &mut Document, handle: &mut WindowHandle) -> LockOutcome {
    if handle.locked_min_height.is_some() {
        return LockOutcome::AlreadyLocked;
    }
    let height = doc.layout(handle.node).height;
    if height == 0 {
        return LockOutcome::NotLaidOut;
    }
    handle.locked_min_height = Some(height);
    doc.set_style(handle.node, "min-height", format!("{height}px"));
    tracing::trace!(window_id = %handle.id, height, "locked window height");
    LockOutcome::Locked(height)
}

/// Debounced scheduler around [`lock_height`].
///
/// Requests coalesce inside the debounce window; once it elapses the pass is
/// queued for the following frame so heights are read after layout settled.
#[derive(Debug)]
pub struct GeometryLock {
    debounce: Coalescer,
    next_frame: BTreeSet<WindowId>,
    retries: BTreeMap<WindowId, u8>,
    passes: u64,
}

impl GeometryLock {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: Coalescer::new(debounce),
            next_frame: BTreeSet::new(),
            retries: BTreeMap::new(),
            passes: 0,
        }
    }

    pub fn request(&mut self, now: Instant) {
        self.debounce.trigger(now);
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending() || !self.next_frame.is_empty()
    }

    /// Number of lock passes that actually ran; bursts count once.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn forget(&mut self, id: WindowId) {
        self.next_frame.remove(&id);
        self.retries.remove(&id);
    }

    pub fn cancel(&mut self) {
        self.debounce.cancel();
        self.next_frame.clear();
        self.retries.clear();
    }

    /// Frame boundary. Runs the pass queued on the previous frame, then
    /// queues a new one if the debounce window elapsed.
    pub fn tick(&mut self, now: Instant, doc: &mut Document, registry: &mut WindowRegistry) {
        if !self.next_frame.is_empty() {
            self.run_pass(doc, registry);
        }
        if self.debounce.fire_due(now) {
            self.next_frame.extend(
                registry
                    .all(doc)
                    .into_iter()
                    .filter(|h| h.locked_min_height.is_none())
                    .map(|h| h.id),
            );
        }
    }

    fn run_pass(&mut self, doc: &mut Document, registry: &mut WindowRegistry) {
        self.passes += 1;
        let queued = std::mem::take(&mut self.next_frame);
        for id in queued {
            let Some(handle) = registry.get_mut(id) else {
                self.retries.remove(&id);
                continue;
            };
            match lock_height(doc, handle) {
                LockOutcome::NotLaidOut => {
                    let attempts = self.retries.entry(id).or_insert(0);
                    *attempts += 1;
                    if *attempts < MAX_LOCK_RETRIES {
                        self.next_frame.insert(id);
                    } else {
                        tracing::debug!(window_id = %id, "window never laid out; giving up lock");
                        self.retries.remove(&id);
                    }
                }
                LockOutcome::Locked(_) | LockOutcome::AlreadyLocked => {
                    self.retries.remove(&id);
                }
            }
        }
    }
}
