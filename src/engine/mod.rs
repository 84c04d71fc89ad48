//! Engine seams and the in-memory reference engines.
//!
//! The coordinator only ever talks to engines through the traits re-exported
//! here. [`memory`] provides reference
//! implementations used by embedded callers and by the test suite.

pub mod memory;
mod traits;

pub use memory::{entails, MemoryExplainer, MemoryReasoner, Taxonomy};
pub use traits::{EngineBackend, ExplanationEngine, InferenceCategory, ReasoningEngine};
