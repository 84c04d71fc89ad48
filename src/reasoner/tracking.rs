//! Change-tracking suspension guard.

use tracing::trace;

use crate::engine::ReasoningEngine;
use crate::knowledge_base::KnowledgeBase;

/// Disables change tracking for its lifetime and restores the previous value
/// on drop, including when the holder returns early or unwinds.
pub(crate) struct TrackingSuspended<'a, E: ReasoningEngine + ?Sized> {
    engine: &'a mut E,
    restore: bool,
}

impl<'a, E: ReasoningEngine + ?Sized> TrackingSuspended<'a, E> {
    pub(crate) fn new(engine: &'a mut E) -> Self {
        let restore = engine.change_tracking();
        engine.set_change_tracking(false);
        trace!(restore, "change tracking suspended");
        Self { engine, restore }
    }

    /// The engine's knowledge base, mutable while tracking is off.
    pub(crate) fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        self.engine.knowledge_base_mut()
    }
}

impl<E: ReasoningEngine + ?Sized> Drop for TrackingSuspended<'_, E> {
    fn drop(&mut self) {
        self.engine.set_change_tracking(self.restore);
        trace!(restored = self.restore, "change tracking restored");
    }
}
