//! Axioms and axiom deltas.
//!
//! Only the small vocabulary the reference backend understands is modelled:
//! class subsumption, class equivalence and class membership. Engines with a
//! richer vocabulary are free to reject what they do not support.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReasoningError;

/// A named class or individual.
///
/// # Examples
///
/// ```
/// use schemaguard::Entity;
///
/// let animal = Entity::new("Animal");
/// assert_eq!(animal.as_str(), "Animal");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    /// Creates an entity from its name. No validation happens here; malformed
    /// names are rejected when an axiom reaches a knowledge base.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("empty entity name");
        }
        if self.0.chars().any(char::is_whitespace) {
            return Err("entity name contains whitespace");
        }
        Ok(())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Entity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A single logical statement in a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Axiom {
    /// Every instance of `sub` is an instance of `sup`.
    SubClassOf {
        /// The more specific class.
        sub: Entity,
        /// The more general class.
        sup: Entity,
    },

    /// `first` and `second` have exactly the same instances.
    EquivalentClasses {
        /// One side of the equivalence.
        first: Entity,
        /// The other side.
        second: Entity,
    },

    /// `individual` is an instance of `class`.
    ClassAssertion {
        /// The asserted type.
        class: Entity,
        /// The typed individual.
        individual: Entity,
    },
}

impl Axiom {
    /// Shorthand for [`Axiom::SubClassOf`].
    pub fn sub_class_of(sub: impl Into<Entity>, sup: impl Into<Entity>) -> Self {
        Self::SubClassOf {
            sub: sub.into(),
            sup: sup.into(),
        }
    }

    /// Shorthand for [`Axiom::EquivalentClasses`].
    pub fn equivalent(first: impl Into<Entity>, second: impl Into<Entity>) -> Self {
        Self::EquivalentClasses {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Shorthand for [`Axiom::ClassAssertion`].
    pub fn class_assertion(class: impl Into<Entity>, individual: impl Into<Entity>) -> Self {
        Self::ClassAssertion {
            class: class.into(),
            individual: individual.into(),
        }
    }

    /// Entities mentioned by this axiom.
    #[must_use]
    pub fn signature(&self) -> [&Entity; 2] {
        match self {
            Self::SubClassOf { sub, sup } => [sub, sup],
            Self::EquivalentClasses { first, second } => [first, second],
            Self::ClassAssertion { class, individual } => [class, individual],
        }
    }

    /// Checks well-formedness.
    ///
    /// # Errors
    ///
    /// Returns `ReasoningError::MalformedAxiom` if any entity name is empty or
    /// contains whitespace.
    pub fn validate(&self) -> Result<(), ReasoningError> {
        for entity in self.signature() {
            entity.check().map_err(|reason| ReasoningError::MalformedAxiom {
                axiom: self.clone(),
                reason: reason.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubClassOf { sub, sup } => write!(f, "{sub} SubClassOf {sup}"),
            Self::EquivalentClasses { first, second } => {
                write!(f, "{first} EquivalentTo {second}")
            }
            Self::ClassAssertion { class, individual } => write!(f, "{individual} Type {class}"),
        }
    }
}

/// A batch of axiom additions and removals.
///
/// Additions are applied before removals, so an axiom present in both sets
/// ends up absent. Adding a present axiom or removing an absent one is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiomDelta {
    /// Axioms to add.
    pub additions: BTreeSet<Axiom>,
    /// Axioms to remove.
    pub removals: BTreeSet<Axiom>,
}

impl AxiomDelta {
    /// Creates a delta from the two sets.
    pub fn new(
        additions: impl IntoIterator<Item = Axiom>,
        removals: impl IntoIterator<Item = Axiom>,
    ) -> Self {
        Self {
            additions: additions.into_iter().collect(),
            removals: removals.into_iter().collect(),
        }
    }

    /// Adds an axiom to the additions.
    #[must_use]
    pub fn add(mut self, axiom: Axiom) -> Self {
        self.additions.insert(axiom);
        self
    }

    /// Adds an axiom to the removals.
    #[must_use]
    pub fn remove(mut self, axiom: Axiom) -> Self {
        self.removals.insert(axiom);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Validates every axiom in the delta.
    ///
    /// # Errors
    ///
    /// Returns the first `ReasoningError::MalformedAxiom` encountered.
    pub fn validate(&self) -> Result<(), ReasoningError> {
        self.additions
            .iter()
            .chain(self.removals.iter())
            .try_for_each(Axiom::validate)
    }
}
