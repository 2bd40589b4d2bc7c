//! Constraint generation for Silt type inference.
//!
//! This crate walks a parsed module and produces the inputs of the
//! constraint solver:
//!
//! - a lexically-nested [`ScopeTree`] with value, type, and import bindings
//!   plus per-definition refinements,
//! - type terms allocated in a [`silt_types::TypeArena`],
//! - an insertion-ordered [`ConstraintList`] whose entries carry explicit
//!   dependency edges to earlier constraints, and
//! - the module side tables (`ast_types` and friends) downstream tooling
//!   reads.
//!
//! Nothing here resolves constraints: unification, generic instantiation,
//! and alias expansion are all deferred to the solver via the constraint
//! kinds in [`ConstraintKind`].
//!
//! Generation is single-threaded per module. Analyzing modules in parallel
//! is fine as long as each generator owns its arena, scope tree, and
//! constraint list; the module resolver is the only shared collaborator.

mod constraint;
mod expr;
mod generator;
mod log;
mod module;
mod refinements;
mod resolver;
mod scope;

pub use constraint::{Checkpoint, Constraint, ConstraintId, ConstraintKind, ConstraintList};
pub use generator::{ConstraintGeneration, ConstraintGenerator, Inference, InferencePack};
pub use log::{ConstraintLogEntry, GenerationLog};
pub use module::{Module, ModuleExports, ModuleInfo, ModuleResolver, NullModuleResolver};
pub use refinements::{Refinement, RefinementArena, RefinementId};
pub use scope::{Binding, Scope, ScopeTree};

#[cfg(test)]
#[path = "tests/generate.rs"]
mod generate_tests;

#[cfg(test)]
#[path = "tests/refinement_lowering.rs"]
mod refinement_lowering_tests;
