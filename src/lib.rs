//! # schemaguard - serialized access to a shared, incrementally reasoned knowledge base
//!
//! A reasoning engine and an explanation engine share one mutable knowledge
//! base. `schemaguard` coordinates three kinds of callers over it:
//!
//! - **Queries** read inferred relationships and may run concurrently
//! - **Updates** add and remove axioms, then eagerly reclassify the hierarchy
//! - **Explanations** search for justifications, probing the knowledge base
//!   with transient edits while the engine's change tracking is suspended
//!
//! The reasoning algorithm itself lives behind the [`ReasoningEngine`] and
//! [`ExplanationEngine`] traits. [`engine::memory`] ships simple in-memory
//! reference engines.
//!
//! ## Usage
//!
//! ```rust
//! use schemaguard::{Axiom, Entity, MemoryReasoner, QueryKind, ReasonerConfig, SharedReasoner};
//!
//! let engine = MemoryReasoner::from_axioms([Axiom::sub_class_of("Dog", "Mammal")])?;
//! let reasoner = SharedReasoner::from_backend(engine, ReasonerConfig::default().with_version(1))?;
//!
//! reasoner.update([Axiom::sub_class_of("Mammal", "Animal")], [])?;
//! let supers = reasoner.query(QueryKind::Supertypes, &Entity::new("Dog"))?;
//! assert!(supers.contains_entity(&Entity::new("Animal")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod axiom;
pub mod config;
pub mod engine;
pub mod error;
pub mod knowledge_base;
pub mod query;
pub mod reasoner;

// Re-export primary types at crate root for convenience
pub use axiom::{Axiom, AxiomDelta, Entity};
pub use config::ReasonerConfig;
pub use engine::{
    EngineBackend, ExplanationEngine, InferenceCategory, MemoryExplainer, MemoryReasoner,
    ReasoningEngine,
};
pub use error::{
    DisposalError, OperationKind, ReasonerError, ReasonerResult, ReasoningError, ValidationError,
};
pub use knowledge_base::{AppliedDelta, KnowledgeBase, OntologyChange};
pub use query::{ExplanationRequest, Justifications, Node, NodeSet, QueryKind, QueryRequest};
pub use reasoner::{ReasonerService, SharedReasoner};
