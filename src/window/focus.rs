//! Tracks which window is on top and mirrors that into the breathing-shadow
//! class.
//!
//! Updates are driven by raise/register/route events. A slow poll catches
//! z-index changes made by code outside the engine.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::constants::BREATHING_SHADOW_CLASS;
use crate::dom::Document;
use crate::scheduler::{Deferred, Interval};

use super::{WindowHandle, WindowId, WindowRegistry};

/// Topmost visible window: highest z-index, then most recently raised, then
/// latest in document order.
pub fn compute_topmost(handles: &[WindowHandle]) -> Option<WindowId> {
    handles
        .iter()
        .filter(|h| h.visible)
        .max_by_key(|h| (h.z_index, h.raise_seq, h.dom_order))
        .map(|h| h.id)
}

#[derive(Debug)]
pub struct FocusManager {
    applied: BTreeMap<WindowId, bool>,
    topmost: Option<WindowId>,
    poll: Interval,
    pointer_refresh: Deferred,
    class_writes: u64,
}

impl FocusManager {
    pub fn new(poll_interval: Duration, pointer_delay: Duration) -> Self {
        Self {
            applied: BTreeMap::new(),
            topmost: None,
            poll: Interval::new(poll_interval),
            pointer_refresh: Deferred::new(pointer_delay),
            class_writes: 0,
        }
    }

    pub fn topmost(&self) -> Option<WindowId> {
        self.topmost
    }

    /// Number of class mutations issued so far. Unchanged focus writes nothing.
    pub fn class_writes(&self) -> u64 {
        self.class_writes
    }

    /// Recompute the topmost window and put the breathing shadow on it alone.
    ///
    /// Only handles whose state differs from what was last written get
    /// touched.
    pub fn apply(&mut self, doc: &mut Document, registry: &mut WindowRegistry) -> Option<WindowId> {
        registry.sync_visibility(doc);
        let topmost = compute_topmost(&registry.all(doc));
        for id in registry.ids() {
            let want = Some(id) == topmost;
            let Some(handle) = registry.get_mut(id) else {
                continue;
            };
            if self.applied.get(&id) != Some(&want) {
                if want {
                    doc.add_class(handle.node, BREATHING_SHADOW_CLASS);
                } else {
                    doc.remove_class(handle.node, BREATHING_SHADOW_CLASS);
                }
                self.applied.insert(id, want);
                self.class_writes += 1;
            }
            handle.has_breathing_shadow = want;
        }
        if topmost != self.topmost {
            tracing::debug!(topmost = ?topmost.map(|id| id.to_string()), "focus changed");
            self.topmost = topmost;
        }
        topmost
    }

    /// Arm the short post-pointer-down refresh.
    pub fn schedule_pointer_refresh(&mut self, now: Instant) {
        self.pointer_refresh.arm(now);
    }

    /// Run the deferred refresh or the fallback poll when due. Returns true
    /// if a recompute happened.
    pub fn tick(
        &mut self,
        now: Instant,
        doc: &mut Document,
        registry: &mut WindowRegistry,
    ) -> bool {
        let deferred = self.pointer_refresh.take_due(now);
        let polled = self.poll.due(now);
        if !deferred && !polled {
            return false;
        }
        if polled {
            // Pick up z-index values written by code outside the engine.
            registry.sync_z_indices(doc);
        }
        self.apply(doc, registry);
        true
    }

    pub fn forget(&mut self, id: WindowId) {
        self.applied.remove(&id);
        if self.topmost == Some(id) {
            self.topmost = None;
        }
    }

    /// Drop all tracking; used on route teardown.
    pub fn reset(&mut self) {
        self.applied.clear();
        self.topmost = None;
        self.pointer_refresh.cancel();
        self.poll = Interval::new(self.poll.period());
    }
}
