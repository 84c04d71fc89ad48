//! Engine traits the coordinator is written against.
//!
//! These traits describe the external collaborators:
//! - a reasoning engine that owns the knowledge base and answers queries
//! - an explanation engine that searches for justifications
//!
//! Implementations do not need internal locking for the coordinator's sake;
//! `SharedReasoner` serializes every mutating call behind its write lock.

use crate::error::ReasoningError;
use crate::knowledge_base::KnowledgeBase;
use crate::query::{ExplanationRequest, Justifications, NodeSet, QueryRequest};

/// A category of inferences a reasoning engine can precompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceCategory {
    /// The class subsumption hierarchy.
    ClassHierarchy,
    /// Individual-to-class memberships.
    ClassAssertions,
}

/// A reasoning engine owning a mutable knowledge base.
///
/// # Preconditions
///
/// The coordinator applies deltas through [`ReasoningEngine::knowledge_base_mut`]
/// and then calls [`ReasoningEngine::recompute`]. If either step fails part way,
/// the knowledge base holds whatever the engine left behind: atomicity of the
/// apply step is a property of the engine, not of the coordinator.
/// [`KnowledgeBase::apply`] validates the whole delta before mutating.
///
/// While change tracking is disabled the engine must not treat knowledge base
/// mutations as real ontology changes.
pub trait ReasoningEngine: Send + Sync {
    /// Answers a query over the current state.
    fn query(&self, request: &QueryRequest) -> Result<NodeSet, ReasoningError>;

    /// Turns change tracking on or off.
    fn set_change_tracking(&mut self, enabled: bool);

    /// Returns whether change tracking is on.
    fn change_tracking(&self) -> bool;

    /// Read access to the owned knowledge base.
    fn knowledge_base(&self) -> &KnowledgeBase;

    /// Mutable access to the owned knowledge base.
    fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase;

    /// Brings one inference category up to date with tracked changes.
    fn recompute(&mut self, category: InferenceCategory) -> Result<(), ReasoningError>;

    /// Releases engine resources. Later calls may fail with `Disposed`.
    fn dispose(&mut self) -> Result<(), ReasoningError>;
}

/// A justification search engine.
///
/// The knowledge base is lent for the duration of one call only. The engine
/// may add and remove axioms as probes but must leave the axiom set as it
/// found it when it returns `Ok`.
pub trait ExplanationEngine: Send + Sync {
    /// Computes up to `request.limit` distinct justifications of `request.axiom`.
    fn justify(
        &mut self,
        kb: &mut KnowledgeBase,
        request: &ExplanationRequest,
    ) -> Result<Justifications, ReasoningError>;

    /// Releases engine resources.
    fn dispose(&mut self) -> Result<(), ReasoningError>;
}

/// A reasoning engine that can produce an explanation engine for its own
/// knowledge base.
pub trait EngineBackend: ReasoningEngine + Sized + 'static {
    /// The explanation engine paired with this backend.
    type Explainer: ExplanationEngine + 'static;

    /// Builds the paired explanation engine.
    fn explainer(&self) -> Self::Explainer;
}
