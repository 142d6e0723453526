//! Bulk operations over a set of handles.

use crate::engine::Engine;
use crate::handle::MotionHandle;

/// A plain list of handles with bulk cancel/complete. Stale entries are
/// skipped; `retain_active` drops them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MotionHandleGroup {
    handles: Vec<MotionHandle>,
}

impl MotionHandleGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: MotionHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[MotionHandle] {
        &self.handles
    }

    /// Returns how many motions were actually canceled.
    pub fn cancel_all(&mut self, engine: &mut Engine) -> usize {
        let n = self.handles.iter().filter(|&&h| engine.cancel(h)).count();
        self.handles.clear();
        n
    }

    /// Returns how many motions were actually completed.
    pub fn complete_all(&mut self, engine: &mut Engine) -> usize {
        let n = self.handles.iter().filter(|&&h| engine.complete(h)).count();
        self.handles.retain(|&h| engine.is_active(h));
        n
    }

    pub fn retain_active(&mut self, engine: &Engine) {
        self.handles.retain(|&h| engine.is_active(h));
    }

    pub fn any_active(&self, engine: &Engine) -> bool {
        self.handles.iter().any(|&h| engine.is_active(h))
    }
}

impl FromIterator<MotionHandle> for MotionHandleGroup {
    fn from_iter<I: IntoIterator<Item = MotionHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

impl Extend<MotionHandle> for MotionHandleGroup {
    fn extend<I: IntoIterator<Item = MotionHandle>>(&mut self, iter: I) {
        self.handles.extend(iter);
    }
}
