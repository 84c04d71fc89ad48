//! The mutable axiom set shared by the reasoning and explanation engines.
//!
//! A [`KnowledgeBase`] journals every effective change while recording is
//! enabled. Reasoning engines drain that journal to learn what changed since
//! their last recomputation; turning recording off is how change tracking is
//! suspended while an explainer probes the axiom set.

use std::collections::BTreeSet;

use crate::axiom::{Axiom, AxiomDelta, Entity};
use crate::error::ReasoningError;

/// A single effective mutation of a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OntologyChange {
    /// The axiom was not present and has been added.
    Added(Axiom),
    /// The axiom was present and has been removed.
    Removed(Axiom),
}

impl OntologyChange {
    #[must_use]
    pub const fn axiom(&self) -> &Axiom {
        match self {
            Self::Added(axiom) | Self::Removed(axiom) => axiom,
        }
    }
}

/// Outcome of applying an [`AxiomDelta`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedDelta {
    /// Additions that were not already present.
    pub added: usize,
    /// Removals that were actually present.
    pub removed: usize,
}

impl AppliedDelta {
    pub const fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// A set of well-formed axioms plus a change journal.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    axioms: BTreeSet<Axiom>,
    journal: Vec<OntologyChange>,
    recording: bool,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            axioms: BTreeSet::new(),
            journal: Vec::new(),
            recording: true,
        }
    }
}

impl KnowledgeBase {
    /// Creates an empty knowledge base with recording enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a knowledge base holding `axioms`. The initial axioms are not
    /// journaled.
    ///
    /// # Errors
    ///
    /// Returns `ReasoningError::MalformedAxiom` for the first malformed axiom.
    pub fn from_axioms(axioms: impl IntoIterator<Item = Axiom>) -> Result<Self, ReasoningError> {
        let mut kb = Self::new();
        for axiom in axioms {
            axiom.validate()?;
            kb.axioms.insert(axiom);
        }
        Ok(kb)
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    pub fn contains(&self, axiom: &Axiom) -> bool {
        self.axioms.contains(axiom)
    }

    /// Iterates axioms in their canonical order.
    pub fn axioms(&self) -> impl Iterator<Item = &Axiom> {
        self.axioms.iter()
    }

    /// Every entity mentioned by some axiom.
    #[must_use]
    pub fn signature(&self) -> BTreeSet<&Entity> {
        self.axioms.iter().flat_map(Axiom::signature).collect()
    }

    /// Adds a single axiom. Returns whether it was newly inserted.
    ///
    /// # Errors
    ///
    /// Returns `ReasoningError::MalformedAxiom` if the axiom is malformed; the
    /// knowledge base is left untouched.
    pub fn insert(&mut self, axiom: Axiom) -> Result<bool, ReasoningError> {
        axiom.validate()?;
        Ok(self.insert_unchecked(axiom))
    }

    /// Removes a single axiom. Returns whether it was present.
    pub fn remove(&mut self, axiom: &Axiom) -> bool {
        if !self.axioms.remove(axiom) {
            return false;
        }
        self.record(OntologyChange::Removed(axiom.clone()));
        true
    }

    /// Applies additions, then removals.
    ///
    /// Every axiom is validated before anything is mutated, so a malformed
    /// delta leaves the knowledge base unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ReasoningError::MalformedAxiom` for the first malformed axiom.
    pub fn apply(&mut self, delta: &AxiomDelta) -> Result<AppliedDelta, ReasoningError> {
        delta.validate()?;

        let mut applied = AppliedDelta::default();
        for axiom in &delta.additions {
            if self.insert_unchecked(axiom.clone()) {
                applied.added += 1;
            }
        }
        for axiom in &delta.removals {
            if self.remove(axiom) {
                applied.removed += 1;
            }
        }
        Ok(applied)
    }

    /// Whether effective changes are currently journaled.
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Enables or disables journaling of subsequent changes.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Changes journaled since the last drain.
    pub fn pending_changes(&self) -> &[OntologyChange] {
        &self.journal
    }

    /// Takes all journaled changes, leaving the journal empty.
    pub fn drain_changes(&mut self) -> Vec<OntologyChange> {
        std::mem::take(&mut self.journal)
    }

    fn insert_unchecked(&mut self, axiom: Axiom) -> bool {
        if self.axioms.contains(&axiom) {
            return false;
        }
        self.record(OntologyChange::Added(axiom.clone()));
        self.axioms.insert(axiom);
        true
    }

    fn record(&mut self, change: OntologyChange) {
        if self.recording {
            self.journal.push(change);
        }
    }
}

impl PartialEq for KnowledgeBase {
    /// Two knowledge bases are equal when they hold the same axioms.
    fn eq(&self, other: &Self) -> bool {
        self.axioms == other.axioms
    }
}

impl Eq for KnowledgeBase {}
