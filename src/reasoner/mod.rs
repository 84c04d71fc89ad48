//! The shared reasoner facade.
//!
//! [`SharedReasoner`] serializes queries, updates and explanations over one
//! reasoning engine and one explanation engine:
//! - queries take the read lock and may run in parallel
//! - updates and explanations take the write lock and run alone
//! - explanations run with change tracking suspended, and tracking is
//!   restored before the write lock is released
//! - after `close`, every locked operation fails with `Closed`

mod lock;
mod tracking;

use tracing::{debug, warn};

use crate::axiom::{Axiom, AxiomDelta, Entity};
use crate::config::ReasonerConfig;
use crate::engine::{EngineBackend, ExplanationEngine, InferenceCategory, ReasoningEngine};
use crate::error::{DisposalError, OperationKind, ReasonerError, ReasonerResult, ValidationError};
use crate::knowledge_base::KnowledgeBase;
use crate::query::{ExplanationRequest, Justifications, NodeSet, QueryKind, QueryRequest};

use lock::LockCoordinator;
use tracking::TrackingSuspended;

/// Operations every schema reasoner exposes, local or otherwise.
pub trait ReasonerService: Send + Sync {
    /// Answers a query over the current knowledge base.
    fn query(&self, kind: QueryKind, entity: &Entity) -> ReasonerResult<NodeSet>;

    /// Computes up to `limit` justifications of `axiom`.
    fn explain(&self, axiom: &Axiom, limit: usize) -> ReasonerResult<Justifications>;

    /// Applies a delta and brings the class hierarchy up to date.
    fn apply(&self, delta: &AxiomDelta) -> ReasonerResult<()>;

    /// The immutable version label.
    fn version(&self) -> Option<u64>;

    /// Disposes the underlying engines.
    fn close(&self) -> ReasonerResult<()>;
}

struct EngineState {
    reasoner: Box<dyn ReasoningEngine>,
    explainer: Box<dyn ExplanationEngine>,
    closed: bool,
}

impl EngineState {
    fn ensure_open(&self, operation: OperationKind) -> ReasonerResult<()> {
        if self.closed {
            return Err(ReasonerError::Closed { operation });
        }
        Ok(())
    }

    /// Disposes the explainer, then the reasoner. Both are attempted.
    fn dispose(&mut self) -> Option<DisposalError> {
        self.closed = true;
        let explanation = self.explainer.dispose();
        let reasoning = self.reasoner.dispose();
        DisposalError::from_outcomes(explanation, reasoning)
    }
}

/// Concurrency-safe facade over a reasoning engine and an explanation engine
/// sharing one knowledge base.
///
/// # Examples
///
/// ```
/// use schemaguard::{Axiom, Entity, MemoryReasoner, QueryKind, ReasonerConfig, SharedReasoner};
///
/// let engine = MemoryReasoner::from_axioms([Axiom::sub_class_of("A", "B")]).unwrap();
/// let reasoner = SharedReasoner::from_backend(engine, ReasonerConfig::default()).unwrap();
///
/// reasoner.update([Axiom::sub_class_of("B", "C")], []).unwrap();
/// let supers = reasoner.query(QueryKind::Supertypes, &Entity::new("A")).unwrap();
/// assert!(supers.contains_entity(&Entity::new("C")));
///
/// let why = reasoner.explain(&Axiom::sub_class_of("A", "C"), 1).unwrap();
/// assert_eq!(why.len(), 1);
/// reasoner.close().unwrap();
/// ```
pub struct SharedReasoner {
    state: LockCoordinator<EngineState>,
    version: Option<u64>,
}

impl SharedReasoner {
    /// Wraps an explicit reasoning engine and explanation engine.
    ///
    /// The explanation engine is only ever lent the reasoning engine's
    /// knowledge base, so the two always operate on the same instance.
    /// Change tracking is switched on.
    ///
    /// # Errors
    ///
    /// Returns `ReasonerError::Validation` if `config` is invalid.
    pub fn new<R, E>(reasoner: R, explainer: E, config: ReasonerConfig) -> ReasonerResult<Self>
    where
        R: ReasoningEngine + 'static,
        E: ExplanationEngine + 'static,
    {
        config.validate()?;

        let mut reasoner: Box<dyn ReasoningEngine> = Box::new(reasoner);
        reasoner.set_change_tracking(true);

        debug!(
            version = ?config.version,
            lock_timeout_ms = ?config.lock_timeout_ms,
            "shared reasoner created"
        );

        Ok(Self {
            state: LockCoordinator::new(
                EngineState {
                    reasoner,
                    explainer: Box::new(explainer),
                    closed: false,
                },
                config.lock_timeout(),
            ),
            version: config.version,
        })
    }

    /// Wraps a backend that supplies its own explanation engine.
    ///
    /// # Errors
    ///
    /// Returns `ReasonerError::Validation` if `config` is invalid.
    pub fn from_backend<B: EngineBackend>(backend: B, config: ReasonerConfig) -> ReasonerResult<Self> {
        let explainer = backend.explainer();
        Self::new(backend, explainer, config)
    }

    /// Answers `kind` for `entity` under the read lock.
    ///
    /// # Errors
    ///
    /// - `Closed` after [`close`](Self::close)
    /// - `LockTimeout` if a configured timeout elapses
    /// - `Reasoning` with the engine's failure, unchanged
    pub fn query(&self, kind: QueryKind, entity: &Entity) -> ReasonerResult<NodeSet> {
        let request = QueryRequest::new(kind, entity.clone());
        let state = self.state.read(OperationKind::Query)?;
        state.ensure_open(OperationKind::Query)?;

        let nodes = state.reasoner.query(&request)?;
        debug!(%kind, %entity, nodes = nodes.len(), "query answered");
        Ok(nodes)
    }

    /// Adds `additions`, removes `removals`, then reclassifies.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn update(
        &self,
        additions: impl IntoIterator<Item = Axiom>,
        removals: impl IntoIterator<Item = Axiom>,
    ) -> ReasonerResult<()> {
        self.apply(&AxiomDelta::new(additions, removals))
    }

    /// Applies `delta` under the write lock and eagerly recomputes the class
    /// hierarchy. Other inference categories are left to the engine.
    ///
    /// # Errors
    ///
    /// - `Closed` after [`close`](Self::close)
    /// - `LockTimeout` if a configured timeout elapses
    /// - `Reasoning` for malformed axioms or a failed recomputation; what the
    ///   knowledge base holds afterwards depends on the engine's atomicity
    pub fn apply(&self, delta: &AxiomDelta) -> ReasonerResult<()> {
        let mut state = self.state.write(OperationKind::Update)?;
        state.ensure_open(OperationKind::Update)?;

        let applied = state.reasoner.knowledge_base_mut().apply(delta)?;
        state.reasoner.recompute(InferenceCategory::ClassHierarchy)?;

        debug!(
            additions = delta.additions.len(),
            removals = delta.removals.len(),
            added = applied.added,
            removed = applied.removed,
            "axiom delta applied"
        );
        Ok(())
    }

    /// Computes up to `limit` justifications of `axiom`.
    ///
    /// Runs under the write lock with change tracking suspended, because the
    /// explanation engine probes the knowledge base by adding and removing
    /// axioms. Tracking is restored before the lock is released, whether the
    /// engine succeeds, fails or panics.
    ///
    /// Arguments are validated before the lock is taken, so a zero `limit`
    /// is reported as `Validation` even on a closed facade.
    ///
    /// # Errors
    ///
    /// - `Validation` if `limit` is zero
    /// - `Closed` after [`close`](Self::close)
    /// - `LockTimeout` if a configured timeout elapses
    /// - `Reasoning` with the explanation engine's failure, unchanged
    pub fn explain(&self, axiom: &Axiom, limit: usize) -> ReasonerResult<Justifications> {
        if limit == 0 {
            return Err(ValidationError::InvalidExplanationLimit { limit }.into());
        }
        let request = ExplanationRequest {
            axiom: axiom.clone(),
            limit,
        };

        let mut state = self.state.write(OperationKind::Explain)?;
        state.ensure_open(OperationKind::Explain)?;

        let EngineState {
            reasoner,
            explainer,
            ..
        } = &mut *state;
        let mut tracking = TrackingSuspended::new(reasoner.as_mut());
        let result = explainer.justify(tracking.knowledge_base_mut(), &request);
        drop(tracking);

        let justifications = result?;
        debug!(%axiom, limit, found = justifications.len(), "entailment explained");
        Ok(justifications)
    }

    /// The version label fixed at construction. Never locks; still answers
    /// after `close`.
    #[must_use]
    pub const fn version(&self) -> Option<u64> {
        self.version
    }

    /// Whether change tracking is currently on.
    ///
    /// # Errors
    ///
    /// `Closed` or `LockTimeout`.
    pub fn change_tracking(&self) -> ReasonerResult<bool> {
        let state = self.state.read(OperationKind::Inspect)?;
        state.ensure_open(OperationKind::Inspect)?;
        Ok(state.reasoner.change_tracking())
    }

    /// A copy of the current knowledge base, taken under the read lock.
    ///
    /// # Errors
    ///
    /// `Closed` or `LockTimeout`.
    pub fn snapshot(&self) -> ReasonerResult<KnowledgeBase> {
        let state = self.state.read(OperationKind::Inspect)?;
        state.ensure_open(OperationKind::Inspect)?;
        Ok(state.reasoner.knowledge_base().clone())
    }

    /// Disposes the explanation engine, then the reasoning engine.
    ///
    /// Closing is terminal: the facade is marked closed even if disposal
    /// fails, and every later locked operation fails with `Closed`.
    ///
    /// # Errors
    ///
    /// - `Closed` if already closed
    /// - `LockTimeout` if a configured timeout elapses
    /// - `Disposal` aggregating whichever engines failed to dispose
    pub fn close(&self) -> ReasonerResult<()> {
        let mut state = self.state.write(OperationKind::Close)?;
        state.ensure_open(OperationKind::Close)?;

        if let Some(err) = state.dispose() {
            warn!(error = %err, "engine disposal failed");
            return Err(err.into());
        }
        debug!("shared reasoner closed");
        Ok(())
    }
}

impl Drop for SharedReasoner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.closed {
            return;
        }
        if let Some(err) = state.dispose() {
            warn!(error = %err, "engine disposal failed while dropping an unclosed reasoner");
        }
    }
}

impl ReasonerService for SharedReasoner {
    fn query(&self, kind: QueryKind, entity: &Entity) -> ReasonerResult<NodeSet> {
        Self::query(self, kind, entity)
    }

    fn explain(&self, axiom: &Axiom, limit: usize) -> ReasonerResult<Justifications> {
        Self::explain(self, axiom, limit)
    }

    fn apply(&self, delta: &AxiomDelta) -> ReasonerResult<()> {
        Self::apply(self, delta)
    }

    fn version(&self) -> Option<u64> {
        Self::version(self)
    }

    fn close(&self) -> ReasonerResult<()> {
        Self::close(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::{MemoryExplainer, MemoryReasoner};
    use crate::error::ReasoningError;

    fn sub(a: &str, b: &str) -> Axiom {
        Axiom::sub_class_of(a, b)
    }

    fn memory_reasoner(axioms: impl IntoIterator<Item = Axiom>) -> SharedReasoner {
        let engine = MemoryReasoner::from_axioms(axioms).unwrap();
        SharedReasoner::from_backend(engine, ReasonerConfig::default()).unwrap()
    }

    /// Explainer that records the tracking flag it observes and optionally fails.
    struct ObservingExplainer {
        seen_recording: Arc<Mutex<Vec<bool>>>,
        fail: bool,
        disposed: Arc<AtomicBool>,
    }

    impl ExplanationEngine for ObservingExplainer {
        fn justify(
            &mut self,
            kb: &mut KnowledgeBase,
            request: &ExplanationRequest,
        ) -> Result<Justifications, ReasoningError> {
            self.seen_recording.lock().unwrap().push(kb.is_recording());
            kb.insert(Axiom::sub_class_of("Probe", "Probe2"))?;
            kb.remove(&Axiom::sub_class_of("Probe", "Probe2"));
            if self.fail {
                return Err(ReasoningError::computation("search exploded"));
            }
            Ok(BTreeSet::from([BTreeSet::from([request.axiom.clone()])]))
        }

        fn dispose(&mut self) -> Result<(), ReasoningError> {
            self.disposed.store(true, Ordering::SeqCst);
            Err(ReasoningError::computation("explainer leak"))
        }
    }

    fn observing(fail: bool) -> (SharedReasoner, Arc<Mutex<Vec<bool>>>, Arc<AtomicBool>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let disposed = Arc::new(AtomicBool::new(false));
        let explainer = ObservingExplainer {
            seen_recording: Arc::clone(&seen),
            fail,
            disposed: Arc::clone(&disposed),
        };
        let engine = MemoryReasoner::from_axioms([sub("A", "B")]).unwrap();
        let reasoner = SharedReasoner::new(engine, explainer, ReasonerConfig::default()).unwrap();
        (reasoner, seen, disposed)
    }

    #[test]
    fn test_explain_suspends_and_restores_tracking() {
        let (reasoner, seen, _) = observing(false);
        reasoner.explain(&sub("A", "B"), 1).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert!(reasoner.change_tracking().unwrap());
        assert!(reasoner.snapshot().unwrap().pending_changes().is_empty());
    }

    #[test]
    fn test_explain_restores_tracking_on_failure() {
        let (reasoner, seen, _) = observing(true);
        let err = reasoner.explain(&sub("A", "B"), 1).unwrap_err();

        let ReasonerError::Reasoning(ReasoningError::Computation { message }) = err else {
            panic!("expected engine failure, got {err:?}");
        };
        assert_eq!(message, "search exploded");
        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert!(reasoner.change_tracking().unwrap());
    }

    #[test]
    fn test_explain_rejects_zero_limit_without_locking() {
        let reasoner = memory_reasoner([sub("A", "B")]);
        let err = reasoner.explain(&sub("A", "B"), 0).unwrap_err();
        assert!(matches!(
            err,
            ReasonerError::Validation(ValidationError::InvalidExplanationLimit { limit: 0 })
        ));
    }

    #[test]
    fn test_explain_validates_limit_before_closed_check() {
        let reasoner = memory_reasoner([sub("A", "B")]);
        reasoner.close().unwrap();

        let err = reasoner.explain(&sub("A", "B"), 0).unwrap_err();
        assert!(err.is_validation());
        assert!(reasoner.explain(&sub("A", "B"), 1).unwrap_err().is_closed());
    }

    #[test]
    fn test_inspection_errors_name_inspect() {
        let reasoner = memory_reasoner([sub("A", "B")]);
        reasoner.close().unwrap();

        let err = reasoner.snapshot().unwrap_err();
        assert!(matches!(
            err,
            ReasonerError::Closed {
                operation: OperationKind::Inspect
            }
        ));
        assert!(err.to_string().contains("inspect"));
        assert!(matches!(
            reasoner.change_tracking().unwrap_err(),
            ReasonerError::Closed {
                operation: OperationKind::Inspect
            }
        ));
    }

    #[test]
    fn test_close_aggregates_disposal_failures_and_is_terminal() {
        let (reasoner, _, disposed) = observing(false);
        let err = reasoner.close().unwrap_err();
        let ReasonerError::Disposal(disposal) = err else {
            panic!("expected disposal failure, got {err:?}");
        };
        assert!(disposal.explanation.is_some());
        assert!(disposal.reasoning.is_none());
        assert!(disposed.load(Ordering::SeqCst));

        assert!(reasoner.close().unwrap_err().is_closed());
        assert!(reasoner.query(QueryKind::Supertypes, &Entity::new("A")).unwrap_err().is_closed());
        assert!(reasoner.update([sub("B", "C")], []).unwrap_err().is_closed());
        assert!(reasoner.explain(&sub("A", "B"), 1).unwrap_err().is_closed());
        assert!(reasoner.snapshot().unwrap_err().is_closed());
    }

    #[test]
    fn test_version_survives_close() {
        let engine = MemoryReasoner::new(KnowledgeBase::new());
        let reasoner = SharedReasoner::from_backend(engine, ReasonerConfig::default().with_version(42)).unwrap();
        assert_eq!(reasoner.version(), Some(42));
        reasoner.close().unwrap();
        assert_eq!(reasoner.version(), Some(42));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let engine = MemoryReasoner::from_axioms([sub("A", "B")]).unwrap();
        let config = ReasonerConfig {
            version: None,
            lock_timeout_ms: Some(0),
        };
        let err = SharedReasoner::from_backend(engine, config).err().unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn test_construction_turns_tracking_on() {
        let mut engine = MemoryReasoner::from_axioms([sub("A", "B")]).unwrap();
        engine.set_change_tracking(false);
        let reasoner = SharedReasoner::new(engine, MemoryExplainer::default(), ReasonerConfig::default()).unwrap();
        assert!(reasoner.change_tracking().unwrap());
    }

    #[test]
    fn test_malformed_update_surfaces_engine_error_and_keeps_state() {
        let reasoner = memory_reasoner([sub("A", "B")]);
        let err = reasoner.update([sub("B", "C"), sub("", "C")], []).unwrap_err();
        assert!(matches!(
            err,
            ReasonerError::Reasoning(ReasoningError::MalformedAxiom { .. })
        ));

        let supers = reasoner.query(QueryKind::Supertypes, &Entity::new("A")).unwrap();
        assert_eq!(supers.flatten(), BTreeSet::from([Entity::new("B")]));
    }

    /// Reasoning engine whose dispose counts calls.
    struct CountingDispose {
        inner: MemoryReasoner,
        disposals: Arc<AtomicUsize>,
    }

    impl ReasoningEngine for CountingDispose {
        fn query(&self, request: &QueryRequest) -> Result<NodeSet, ReasoningError> {
            self.inner.query(request)
        }
        fn set_change_tracking(&mut self, enabled: bool) {
            self.inner.set_change_tracking(enabled);
        }
        fn change_tracking(&self) -> bool {
            self.inner.change_tracking()
        }
        fn knowledge_base(&self) -> &KnowledgeBase {
            self.inner.knowledge_base()
        }
        fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
            self.inner.knowledge_base_mut()
        }
        fn recompute(&mut self, category: InferenceCategory) -> Result<(), ReasoningError> {
            self.inner.recompute(category)
        }
        fn dispose(&mut self) -> Result<(), ReasoningError> {
            self.disposals.fetch_add(1, Ordering::SeqCst);
            self.inner.dispose()
        }
    }

    #[test]
    fn test_drop_disposes_unclosed_reasoner_once() {
        let disposals = Arc::new(AtomicUsize::new(0));
        let engine = CountingDispose {
            inner: MemoryReasoner::new(KnowledgeBase::new()),
            disposals: Arc::clone(&disposals),
        };
        drop(SharedReasoner::new(engine, MemoryExplainer::default(), ReasonerConfig::default()).unwrap());
        assert_eq!(disposals.load(Ordering::SeqCst), 1);

        let engine = CountingDispose {
            inner: MemoryReasoner::new(KnowledgeBase::new()),
            disposals: Arc::clone(&disposals),
        };
        let reasoner = SharedReasoner::new(engine, MemoryExplainer::default(), ReasonerConfig::default()).unwrap();
        reasoner.close().unwrap();
        drop(reasoner);
        assert_eq!(disposals.load(Ordering::SeqCst), 2);
    }

    /// Reasoning engine that logs its disposal and can be told to fail it.
    struct LoggedReasoner {
        inner: MemoryReasoner,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail_dispose: bool,
    }

    impl ReasoningEngine for LoggedReasoner {
        fn query(&self, request: &QueryRequest) -> Result<NodeSet, ReasoningError> {
            self.inner.query(request)
        }
        fn set_change_tracking(&mut self, enabled: bool) {
            self.inner.set_change_tracking(enabled);
        }
        fn change_tracking(&self) -> bool {
            self.inner.change_tracking()
        }
        fn knowledge_base(&self) -> &KnowledgeBase {
            self.inner.knowledge_base()
        }
        fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
            self.inner.knowledge_base_mut()
        }
        fn recompute(&mut self, category: InferenceCategory) -> Result<(), ReasoningError> {
            self.inner.recompute(category)
        }
        fn dispose(&mut self) -> Result<(), ReasoningError> {
            self.log.lock().unwrap().push("reasoner");
            self.inner.dispose()?;
            if self.fail_dispose {
                return Err(ReasoningError::computation("reasoner leak"));
            }
            Ok(())
        }
    }

    /// Explanation engine whose disposal always fails after logging.
    struct LoggedExplainer {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ExplanationEngine for LoggedExplainer {
        fn justify(
            &mut self,
            _kb: &mut KnowledgeBase,
            _request: &ExplanationRequest,
        ) -> Result<Justifications, ReasoningError> {
            Ok(Justifications::new())
        }
        fn dispose(&mut self) -> Result<(), ReasoningError> {
            self.log.lock().unwrap().push("explainer");
            Err(ReasoningError::computation("explainer leak"))
        }
    }

    fn logged(fail_reasoner: bool) -> (SharedReasoner, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let engine = LoggedReasoner {
            inner: MemoryReasoner::new(KnowledgeBase::new()),
            log: Arc::clone(&log),
            fail_dispose: fail_reasoner,
        };
        let explainer = LoggedExplainer {
            log: Arc::clone(&log),
        };
        let reasoner = SharedReasoner::new(engine, explainer, ReasonerConfig::default()).unwrap();
        (reasoner, log)
    }

    #[test]
    fn test_close_disposes_explainer_then_reasoner_despite_failure() {
        let (reasoner, log) = logged(false);
        let err = reasoner.close().unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["explainer", "reasoner"]);
        let ReasonerError::Disposal(disposal) = err else {
            panic!("expected disposal failure, got {err:?}");
        };
        assert!(disposal.explanation.is_some());
        assert!(disposal.reasoning.is_none());
    }

    #[test]
    fn test_close_reports_both_disposal_failures() {
        let (reasoner, log) = logged(true);
        let err = reasoner.close().unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["explainer", "reasoner"]);
        let ReasonerError::Disposal(disposal) = err else {
            panic!("expected disposal failure, got {err:?}");
        };
        assert_eq!(
            disposal.explanation,
            Some(ReasoningError::computation("explainer leak"))
        );
        assert_eq!(
            disposal.reasoning,
            Some(ReasoningError::computation("reasoner leak"))
        );

        drop(reasoner);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_service_trait_dispatches_to_facade() {
        let reasoner: Box<dyn ReasonerService> = Box::new(memory_reasoner([sub("A", "B")]));
        reasoner.apply(&AxiomDelta::default().add(sub("B", "C"))).unwrap();
        let supers = reasoner.query(QueryKind::Supertypes, &Entity::new("A")).unwrap();
        assert_eq!(supers.len(), 2);
        assert_eq!(reasoner.version(), None);
        reasoner.close().unwrap();
    }
}
