//! The closed variant sets for types and type packs.

use rustc_hash::FxHashMap;
use silt_common::span::Span;
use silt_common::{ModuleName, Name};

use crate::{ScopeId, TypeLevel};

/// A lightweight handle to a type term in the arena.
///
/// Well-known terms are seeded at fixed indices and exposed as constants;
/// everything below [`TypeId::FIRST_USER`] is seeded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const NIL: TypeId = TypeId(0);
    pub const BOOLEAN: TypeId = TypeId(1);
    pub const NUMBER: TypeId = TypeId(2);
    pub const STRING: TypeId = TypeId(3);
    pub const THREAD: TypeId = TypeId(4);
    /// The top function type: any callable.
    pub const FUNCTION: TypeId = TypeId(5);
    /// The top table type.
    pub const TABLE: TypeId = TypeId(6);
    /// The root class type; parent of every declared class when the
    /// root-class option is on.
    pub const CLASS: TypeId = TypeId(7);
    pub const ANY: TypeId = TypeId(8);
    pub const NEVER: TypeId = TypeId(9);
    /// Error recovery: analysis continues with this after reporting.
    pub const ERROR: TypeId = TypeId(10);
    /// The literal type `true`.
    pub const TRUE: TypeId = TypeId(11);
    /// The literal type `false`.
    pub const FALSE: TypeId = TypeId(12);
    /// `false | nil` — the values that test false.
    pub const FALSY: TypeId = TypeId(13);
    /// `~(false | nil)` — the discriminant of a truthiness refinement.
    pub const TRUTHY: TypeId = TypeId(14);

    /// First index handed out by `add`; everything below is seeded.
    pub const FIRST_USER: u32 = 15;

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

/// A lightweight handle to a type pack in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePackId(pub u32);

impl TypePackId {
    /// Error recovery pack.
    pub const ERROR: TypePackId = TypePackId(0);
    /// `...any` — the pack of unannotated varargs.
    pub const ANY: TypePackId = TypePackId(1);

    pub const FIRST_USER: u32 = 2;
}

// =============================================================================
// Types
// =============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Nil,
    Boolean,
    Number,
    String,
    Thread,
    /// The type of all functions.
    Function,
    /// The type of all tables.
    Table,
    /// The type of all classes.
    Class,
    Any,
    Never,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Singleton {
    Bool(bool),
    String(String),
}

/// How far a table's shape is still allowed to grow.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TableState {
    /// A table about which nothing is known yet; unifies freely.
    Free,
    /// A table literal still under construction; assignments may add
    /// properties.
    Unsealed,
    /// A table whose shape is fixed.
    Sealed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub ty: TypeId,
}

impl Property {
    pub fn new(ty: TypeId) -> Self {
        Property { ty }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableIndexer {
    pub key: TypeId,
    pub value: TypeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableType {
    pub props: FxHashMap<Name, Property>,
    pub indexer: Option<TableIndexer>,
    pub state: TableState,
    pub scope: ScopeId,
    pub level: TypeLevel,
}

impl TableType {
    pub fn new(state: TableState, scope: ScopeId, level: TypeLevel) -> Self {
        TableType {
            props: FxHashMap::default(),
            indexer: None,
            state,
            scope,
            level,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionArgument {
    pub name: Name,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    pub generics: Vec<TypeId>,
    pub generic_packs: Vec<TypePackId>,
    pub arg_pack: TypePackId,
    pub ret_pack: TypePackId,
    pub arg_names: Vec<Option<FunctionArgument>>,
    pub scope: ScopeId,
    pub has_no_generics: bool,
    pub has_self: bool,
}

impl FunctionType {
    /// A monomorphic function type with no recorded argument names.
    pub fn new(scope: ScopeId, arg_pack: TypePackId, ret_pack: TypePackId) -> Self {
        FunctionType {
            generics: Vec::new(),
            generic_packs: Vec::new(),
            arg_pack,
            ret_pack,
            arg_names: Vec::new(),
            scope,
            has_no_generics: true,
            has_self: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassType {
    pub name: Name,
    pub props: FxHashMap<Name, Property>,
    pub parent: Option<TypeId>,
    pub metatable: Option<TypeId>,
    pub module: ModuleName,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetatableType {
    pub table: TypeId,
    pub metatable: TypeId,
}

/// A generic alias application that the solver has not yet reduced.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingExpansion {
    pub prefix: Option<Name>,
    pub name: Name,
    pub type_args: Vec<TypeId>,
    pub pack_args: Vec<TypePackId>,
}

/// A type term. See the crate docs for the mutation discipline.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    /// An unconstrained type the solver may bind.
    Free { scope: ScopeId },
    /// A named generic parameter.
    Generic { scope: ScopeId, name: Name },
    /// A placeholder whose final form is determined later; rewritten in
    /// place exactly once.
    Blocked,
    /// Forwarding to another term; `follow` chases these.
    Bound(TypeId),
    Primitive(PrimitiveKind),
    Singleton(Singleton),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    Negation(TypeId),
    Table(TableType),
    Function(FunctionType),
    Class(ClassType),
    Metatable(MetatableType),
    PendingExpansion(PendingExpansion),
    /// Error recovery.
    Error,
}

// =============================================================================
// Type packs
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum TypePack {
    Free { scope: ScopeId },
    Bound(TypePackId),
    Pack {
        head: Vec<TypeId>,
        tail: Option<TypePackId>,
    },
    Variadic {
        ty: TypeId,
        /// A hidden variadic is synthesized (e.g. the implicit `...any` of a
        /// function without an ellipsis) and not surfaced when printing.
        hidden: bool,
    },
    Generic { scope: ScopeId, name: Name },
    Blocked,
    Error,
}

// =============================================================================
// Type functions
// =============================================================================

/// A generic parameter of a type alias, with its optional default.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericTypeDefinition {
    pub ty: TypeId,
    pub default: Option<TypeId>,
}

/// A generic pack parameter of a type alias, with its optional default.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericTypePackDefinition {
    pub tp: TypePackId,
    pub default: Option<TypePackId>,
}

/// A (possibly generic) named type: what a type binding resolves to.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeFun {
    pub type_params: Vec<GenericTypeDefinition>,
    pub type_pack_params: Vec<GenericTypePackDefinition>,
    pub ty: TypeId,
}

impl TypeFun {
    pub fn monomorphic(ty: TypeId) -> Self {
        TypeFun {
            type_params: Vec::new(),
            type_pack_params: Vec::new(),
            ty,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty() || !self.type_pack_params.is_empty()
    }
}
