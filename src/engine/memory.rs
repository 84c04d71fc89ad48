//! In-memory reference engines.
//!
//! This module provides a told-hierarchy reasoner and a probe-based
//! explanation engine. They are intended for embedded usage, tests, and as a
//! reference for what the coordinator expects from real engines.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::axiom::{Axiom, Entity};
use crate::engine::traits::{EngineBackend, ExplanationEngine, InferenceCategory, ReasoningEngine};
use crate::error::ReasoningError;
use crate::knowledge_base::KnowledgeBase;
use crate::query::{ExplanationRequest, Justifications, Node, NodeSet, QueryKind, QueryRequest};

/// Reflexive-transitive closure of the told class hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    ancestors: BTreeMap<Entity, BTreeSet<Entity>>,
}

impl Taxonomy {
    /// Classifies the classes of `kb`.
    #[must_use]
    pub fn build(kb: &KnowledgeBase) -> Self {
        let mut edges: BTreeMap<&Entity, BTreeSet<&Entity>> = BTreeMap::new();
        for axiom in kb.axioms() {
            match axiom {
                Axiom::SubClassOf { sub, sup } => {
                    edges.entry(sub).or_default().insert(sup);
                    edges.entry(sup).or_default();
                }
                Axiom::EquivalentClasses { first, second } => {
                    edges.entry(first).or_default().insert(second);
                    edges.entry(second).or_default().insert(first);
                }
                Axiom::ClassAssertion { class, .. } => {
                    edges.entry(class).or_default();
                }
            }
        }

        let mut ancestors = BTreeMap::new();
        for &class in edges.keys() {
            let mut reached: BTreeSet<Entity> = BTreeSet::new();
            let mut stack = vec![class];
            while let Some(next) = stack.pop() {
                if !reached.insert(next.clone()) {
                    continue;
                }
                if let Some(parents) = edges.get(next) {
                    stack.extend(parents.iter().copied());
                }
            }
            ancestors.insert(class.clone(), reached);
        }
        Self { ancestors }
    }

    pub fn contains(&self, class: &Entity) -> bool {
        self.ancestors.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }

    /// Whether `sup` subsumes `sub` (reflexively).
    #[must_use]
    pub fn subsumes(&self, sup: &Entity, sub: &Entity) -> bool {
        sup == sub
            || self
                .ancestors
                .get(sub)
                .is_some_and(|ancestors| ancestors.contains(sup))
    }

    /// Classes equivalent to `class`, including itself.
    #[must_use]
    pub fn equivalents(&self, class: &Entity) -> BTreeSet<Entity> {
        let Some(ancestors) = self.ancestors.get(class) else {
            return BTreeSet::from([class.clone()]);
        };
        ancestors
            .iter()
            .filter(|candidate| self.subsumes(class, candidate))
            .cloned()
            .collect()
    }

    fn strict_ancestors(&self, class: &Entity) -> BTreeSet<Entity> {
        let Some(ancestors) = self.ancestors.get(class) else {
            return BTreeSet::new();
        };
        let same = self.equivalents(class);
        ancestors.difference(&same).cloned().collect()
    }

    fn strict_descendants(&self, class: &Entity) -> BTreeSet<Entity> {
        if !self.contains(class) {
            return BTreeSet::new();
        }
        let same = self.equivalents(class);
        self.ancestors
            .iter()
            .filter(|(candidate, ancestors)| ancestors.contains(class) && !same.contains(*candidate))
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }

    /// Partitions `classes` into equivalence nodes.
    fn group(&self, classes: BTreeSet<Entity>) -> NodeSet {
        let mut remaining = classes;
        let mut nodes = NodeSet::new();
        while let Some(class) = remaining.pop_first() {
            let mut members = self.equivalents(&class);
            members.retain(|member| member == &class || remaining.remove(member));
            nodes.insert(Node::new(members));
        }
        nodes
    }
}

/// Whether `kb` entails `axiom` under told-hierarchy semantics.
#[must_use]
pub fn entails(kb: &KnowledgeBase, axiom: &Axiom) -> bool {
    let taxonomy = Taxonomy::build(kb);
    match axiom {
        Axiom::SubClassOf { sub, sup } => taxonomy.subsumes(sup, sub),
        Axiom::EquivalentClasses { first, second } => {
            taxonomy.subsumes(first, second) && taxonomy.subsumes(second, first)
        }
        Axiom::ClassAssertion { class, individual } => kb.axioms().any(|told| {
            matches!(
                told,
                Axiom::ClassAssertion { class: asserted, individual: who }
                    if who == individual && taxonomy.subsumes(class, asserted)
            )
        }),
    }
}

/// Told-hierarchy reasoner over an owned knowledge base.
///
/// The class hierarchy is classified eagerly and cached. `recompute` only
/// reclassifies when the knowledge base journaled changes since the last
/// classification, so mutations made while change tracking is off are not
/// picked up. Instance and type queries are answered lazily from the current
/// assertions.
#[derive(Debug)]
pub struct MemoryReasoner {
    kb: KnowledgeBase,
    taxonomy: Taxonomy,
    disposed: bool,
    classifications: u64,
}

impl MemoryReasoner {
    /// Takes ownership of `kb` and classifies it.
    #[must_use]
    pub fn new(mut kb: KnowledgeBase) -> Self {
        kb.drain_changes();
        let taxonomy = Taxonomy::build(&kb);
        Self {
            kb,
            taxonomy,
            disposed: false,
            classifications: 1,
        }
    }

    /// Builds a reasoner over the given axioms.
    ///
    /// # Errors
    ///
    /// Returns `ReasoningError::MalformedAxiom` for the first malformed axiom.
    pub fn from_axioms(axioms: impl IntoIterator<Item = Axiom>) -> Result<Self, ReasoningError> {
        Ok(Self::new(KnowledgeBase::from_axioms(axioms)?))
    }

    /// The cached class hierarchy.
    pub const fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// How many times the class hierarchy has been classified.
    pub const fn classifications(&self) -> u64 {
        self.classifications
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<(), ReasoningError> {
        if self.disposed {
            return Err(ReasoningError::Disposed);
        }
        Ok(())
    }

    fn asserted_classes<'a>(&'a self, individual: &'a Entity) -> impl Iterator<Item = &'a Entity> {
        self.kb.axioms().filter_map(move |axiom| match axiom {
            Axiom::ClassAssertion { class, individual: who } if who == individual => Some(class),
            _ => None,
        })
    }

    fn instances(&self, class: &Entity) -> NodeSet {
        self.kb
            .axioms()
            .filter_map(|axiom| match axiom {
                Axiom::ClassAssertion { class: asserted, individual }
                    if self.taxonomy.subsumes(class, asserted) =>
                {
                    Some(Node::singleton(individual.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn types(&self, individual: &Entity) -> NodeSet {
        let mut classes = BTreeSet::new();
        for asserted in self.asserted_classes(individual) {
            classes.insert(asserted.clone());
            classes.extend(self.taxonomy.strict_ancestors(asserted));
            classes.extend(self.taxonomy.equivalents(asserted));
        }
        self.taxonomy.group(classes)
    }
}

impl ReasoningEngine for MemoryReasoner {
    fn query(&self, request: &QueryRequest) -> Result<NodeSet, ReasoningError> {
        self.ensure_live()?;
        let entity = &request.entity;
        let nodes = match request.kind {
            QueryKind::Supertypes => self.taxonomy.group(self.taxonomy.strict_ancestors(entity)),
            QueryKind::Subtypes => self.taxonomy.group(self.taxonomy.strict_descendants(entity)),
            QueryKind::Equivalents => NodeSet::from_iter([Node::new(self.taxonomy.equivalents(entity))]),
            QueryKind::Instances => self.instances(entity),
            QueryKind::Types => self.types(entity),
        };
        Ok(nodes)
    }

    fn set_change_tracking(&mut self, enabled: bool) {
        self.kb.set_recording(enabled);
    }

    fn change_tracking(&self) -> bool {
        self.kb.is_recording()
    }

    fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    fn recompute(&mut self, category: InferenceCategory) -> Result<(), ReasoningError> {
        self.ensure_live()?;
        match category {
            InferenceCategory::ClassHierarchy => {
                let changes = self.kb.drain_changes();
                if changes.is_empty() {
                    trace!("class hierarchy up to date");
                    return Ok(());
                }
                self.taxonomy = Taxonomy::build(&self.kb);
                self.classifications += 1;
                debug!(
                    changes = changes.len(),
                    classes = self.taxonomy.len(),
                    "reclassified class hierarchy"
                );
            }
            // Answered lazily at query time.
            InferenceCategory::ClassAssertions => {}
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), ReasoningError> {
        self.ensure_live()?;
        self.disposed = true;
        self.taxonomy = Taxonomy::default();
        Ok(())
    }
}

impl EngineBackend for MemoryReasoner {
    type Explainer = MemoryExplainer;

    fn explainer(&self) -> MemoryExplainer {
        MemoryExplainer::default()
    }
}

/// Upper bound on hitting-set expansions per `justify` call.
pub const DEFAULT_MAX_EXPANSIONS: usize = 256;

/// Black-box justification search.
///
/// One justification is found by contraction: each axiom is removed in turn
/// and stays removed if the target is still entailed. Alternatives are found
/// by re-running contraction with each axiom of a known justification removed
/// (hitting-set expansion). Every probe is undone before returning.
#[derive(Debug, Clone)]
pub struct MemoryExplainer {
    max_expansions: usize,
    disposed: bool,
}

impl Default for MemoryExplainer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPANSIONS)
    }
}

impl MemoryExplainer {
    /// Creates an explainer that explores at most `max_expansions` paths.
    #[must_use]
    pub fn new(max_expansions: usize) -> Self {
        Self {
            max_expansions: max_expansions.max(1),
            disposed: false,
        }
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl ExplanationEngine for MemoryExplainer {
    fn justify(
        &mut self,
        kb: &mut KnowledgeBase,
        request: &ExplanationRequest,
    ) -> Result<Justifications, ReasoningError> {
        if self.disposed {
            return Err(ReasoningError::Disposed);
        }

        let mut found = Justifications::new();
        let mut queue = VecDeque::from([BTreeSet::new()]);
        let mut visited: BTreeSet<BTreeSet<Axiom>> = BTreeSet::new();
        let mut expansions = 0usize;

        while let Some(path) = queue.pop_front() {
            if found.len() >= request.limit || expansions >= self.max_expansions {
                break;
            }
            expansions += 1;

            let Some(justification) =
                with_removed(kb, &path, |kb| contract(kb, &request.axiom))??
            else {
                continue;
            };

            for axiom in &justification {
                let mut next = path.clone();
                next.insert(axiom.clone());
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
            found.insert(justification);
        }

        trace!(
            axiom = %request.axiom,
            found = found.len(),
            expansions,
            "justification search finished"
        );
        Ok(found)
    }

    fn dispose(&mut self) -> Result<(), ReasoningError> {
        if self.disposed {
            return Err(ReasoningError::Disposed);
        }
        self.disposed = true;
        Ok(())
    }
}

/// Runs `probe` with `removed` taken out of `kb`, then puts them back.
fn with_removed<T>(
    kb: &mut KnowledgeBase,
    removed: &BTreeSet<Axiom>,
    probe: impl FnOnce(&mut KnowledgeBase) -> T,
) -> Result<T, ReasoningError> {
    let taken: Vec<&Axiom> = removed.iter().filter(|axiom| kb.remove(axiom)).collect();
    let out = probe(kb);
    for axiom in taken {
        kb.insert(axiom.clone())?;
    }
    Ok(out)
}

/// Shrinks the axioms of `kb` to one minimal justification of `target`.
fn contract(kb: &mut KnowledgeBase, target: &Axiom) -> Result<Option<BTreeSet<Axiom>>, ReasoningError> {
    if !entails(kb, target) {
        return Ok(None);
    }

    let candidates: Vec<Axiom> = kb.axioms().cloned().collect();
    let mut justification = BTreeSet::new();
    let mut dropped = Vec::new();
    for axiom in candidates {
        kb.remove(&axiom);
        if entails(kb, target) {
            dropped.push(axiom);
        } else {
            kb.insert(axiom.clone())?;
            justification.insert(axiom);
        }
    }
    for axiom in dropped {
        kb.insert(axiom)?;
    }
    Ok(Some(justification))
}
