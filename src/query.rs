//! Query requests and node-set results.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::axiom::{Axiom, Entity};

/// The relationship a query asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Strict superclasses of a class.
    Supertypes,
    /// Strict subclasses of a class.
    Subtypes,
    /// Classes equivalent to a class, including itself.
    Equivalents,
    /// Individuals that are instances of a class.
    Instances,
    /// Classes an individual belongs to.
    Types,
}

impl QueryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supertypes => "supertypes",
            Self::Subtypes => "subtypes",
            Self::Equivalents => "equivalents",
            Self::Instances => "instances",
            Self::Types => "types",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query kind applied to a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRequest {
    pub kind: QueryKind,
    pub entity: Entity,
}

impl QueryRequest {
    pub fn new(kind: QueryKind, entity: impl Into<Entity>) -> Self {
        Self {
            kind,
            entity: entity.into(),
        }
    }
}

/// A set of mutually equivalent entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(BTreeSet<Entity>);

impl Node {
    /// Creates a node from its members.
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self(entities.into_iter().collect())
    }

    /// A node with a single member.
    #[must_use]
    pub fn singleton(entity: Entity) -> Self {
        Self(BTreeSet::from([entity]))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.0.iter()
    }

    /// The smallest member, used as the node's stable representative.
    #[must_use]
    pub fn representative(&self) -> Option<&Entity> {
        self.0.first()
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        self.0.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Entities satisfying a relationship, partitioned into equivalence classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSet(BTreeSet<Node>);

impl NodeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; empty nodes are ignored.
    pub fn insert(&mut self, node: Node) {
        if !node.is_empty() {
            self.0.insert(node);
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.0.iter()
    }

    /// All entities across all nodes.
    #[must_use]
    pub fn flatten(&self) -> BTreeSet<Entity> {
        self.0.iter().flat_map(|node| node.0.iter().cloned()).collect()
    }

    /// Whether any node contains `entity`.
    pub fn contains_entity(&self, entity: &Entity) -> bool {
        self.0.iter().any(|node| node.contains(entity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Node> for NodeSet {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut set = Self::new();
        for node in iter {
            set.insert(node);
        }
        set
    }
}

/// A request for up to `limit` justifications of `axiom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationRequest {
    pub axiom: Axiom,
    pub limit: usize,
}

/// Distinct alternative justifications, each a set of axioms.
pub type Justifications = BTreeSet<BTreeSet<Axiom>>;
