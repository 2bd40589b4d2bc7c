//! Syntax tree data model for Silt.
//!
//! The parser that produces these trees lives elsewhere; this crate defines
//! the shape the analysis passes consume, plus [`AstBuilder`] for
//! constructing trees programmatically (used heavily by tests and tooling).
//!
//! Every node carries a [`NodeId`] assigned at construction time. Analysis
//! passes never store references into the tree; they key side tables by
//! `NodeId` and local bindings by [`LocalId`].

mod ast;
mod builder;

pub use ast::*;
pub use builder::AstBuilder;

/// Identity of a single AST node. Side tables produced by the analysis
/// passes (inferred types, scopes, resolved annotations) are keyed by this.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Identity of a local variable declaration. Every syntactic occurrence of
/// the local refers back to the declaring `LocalId`, so shadowing produces
/// distinct ids for the same name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

/// A name in value position: either a local (by declaration identity) or a
/// global (by name).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    Local(LocalId),
    Global(silt_common::Name),
}
