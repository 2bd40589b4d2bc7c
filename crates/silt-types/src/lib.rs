//! Arena-allocated type terms.
//!
//! Types and type packs are represented as lightweight `u32` handles
//! ([`TypeId`], [`TypePackId`]) pointing into a [`TypeArena`]. Handle
//! equality is identity: two structurally equal unions allocated separately
//! are distinct terms. Cyclic type graphs (recursive aliases, classes whose
//! metatables point back at them) are expressed through handle indirection;
//! a node never contains another node by value.
//!
//! The arena is the single mutable heap of a module analysis. The one legal
//! in-place mutation is rewriting a `Blocked` or `Free` node into its
//! resolved form, exactly once, via [`TypeArena::bind`] /
//! [`TypeArena::bind_pack`].

mod arena;
mod ty;
mod utils;

pub use arena::TypeArena;
pub use ty::*;
pub use utils::{extend_type_pack, first, occurs, ExtendedTypePack};

/// Identity of a scope in the scope tree built during constraint
/// generation. Defined here so `Free` and `Generic` terms can record the
/// scope they belong to without depending on the generator crate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The global scope is always the first scope in the tree.
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// Nesting depth of the scope a table was created in. Consumed by the
/// solver when deciding how far a table type may be generalized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeLevel(pub u32);
