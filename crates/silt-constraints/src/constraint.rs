//! The ordered constraint list.
//!
//! Constraints are appended during traversal and never move; a
//! [`ConstraintId`] is an index into the list and stays valid for the life
//! of the module. Dependencies are ids of constraints inserted strictly
//! earlier, so the solver can rely on insertion order when it schedules.

use silt_ast::{BinaryOp, NodeId, UnaryOp};
use silt_common::span::Span;
use silt_common::Name;
use silt_types::{ScopeId, TypeId, TypePackId};

/// Index of a constraint in the list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

/// A position in the constraint list, taken before and after a
/// sub-traversal to gather everything it emitted (see
/// [`ConstraintList::range`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    offset: u32,
}

/// The payload of a constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintKind {
    /// `sub` is a subtype of `sup`.
    Subtype { sub: TypeId, sup: TypeId },
    /// `sub` is a subtype of `sup`, for packs.
    PackSubtype {
        sub: TypePackId,
        sup: TypePackId,
    },
    /// `target` is `source` with its free types abstracted at the
    /// declaration scope.
    Generalization { target: TypeId, source: TypeId },
    /// `target` is `source` with its generics replaced by fresh types, as at
    /// a call site.
    Instantiation { target: TypeId, source: TypeId },
    /// `iterator` is the pack produced by the values of a generic `for`;
    /// `variables` is the pack of loop variables to populate.
    Iterable {
        iterator: TypePackId,
        variables: TypePackId,
    },
    /// Attach a name to `target` for display purposes. Synthetic names come
    /// from `local x = {...}`-style inference rather than an alias.
    Name {
        target: TypeId,
        name: Name,
        synthetic: bool,
        type_params: Vec<TypeId>,
        type_pack_params: Vec<TypePackId>,
    },
    /// `target` is a pending generic alias application for the solver to
    /// expand.
    TypeAliasExpansion { target: TypeId },
    /// A call of `function` with `args`, producing `rets`. `discriminants`
    /// carries one blocked discriminant per argument with a definition, for
    /// call-site refinement.
    FunctionCall {
        function: TypeId,
        args: TypePackId,
        rets: TypePackId,
        call_node: NodeId,
        discriminants: Vec<Option<TypeId>>,
    },
    /// `result` is either `singleton` or `primitive`, depending on what the
    /// solver learns about `expected`.
    PrimitiveType {
        result: TypeId,
        expected: TypeId,
        singleton: TypeId,
        primitive: TypeId,
    },
    /// `result` is the type of property `prop` of `subject`.
    HasProp {
        result: TypeId,
        subject: TypeId,
        prop: Name,
    },
    /// `result` is `subject` updated so the property at `path` has type
    /// `prop_type`.
    SetProp {
        result: TypeId,
        subject: TypeId,
        path: Vec<Name>,
        prop_type: TypeId,
    },
    /// `result` is the type of applying unary `op` to `operand`.
    Unary {
        op: UnaryOp,
        operand: TypeId,
        result: TypeId,
    },
    /// `result` is the type of `lhs op rhs`. `expr` is the operator
    /// expression, so the solver can record overload resolution against it.
    Binary {
        op: BinaryOp,
        lhs: TypeId,
        rhs: TypeId,
        result: TypeId,
        expr: NodeId,
    },
    /// `result` is `discriminant` if it is a singleton (or, negated, if it
    /// is a top type); otherwise its widened form.
    SingletonOrTopType {
        result: TypeId,
        discriminant: TypeId,
        negated: bool,
    },
}

impl ConstraintKind {
    /// Stable name of the payload kind, for the generation log.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Subtype { .. } => "Subtype",
            ConstraintKind::PackSubtype { .. } => "PackSubtype",
            ConstraintKind::Generalization { .. } => "Generalization",
            ConstraintKind::Instantiation { .. } => "Instantiation",
            ConstraintKind::Iterable { .. } => "Iterable",
            ConstraintKind::Name { .. } => "Name",
            ConstraintKind::TypeAliasExpansion { .. } => "TypeAliasExpansion",
            ConstraintKind::FunctionCall { .. } => "FunctionCall",
            ConstraintKind::PrimitiveType { .. } => "PrimitiveType",
            ConstraintKind::HasProp { .. } => "HasProp",
            ConstraintKind::SetProp { .. } => "SetProp",
            ConstraintKind::Unary { .. } => "Unary",
            ConstraintKind::Binary { .. } => "Binary",
            ConstraintKind::SingletonOrTopType { .. } => "SingletonOrTopType",
        }
    }
}

/// One emitted constraint.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub scope: ScopeId,
    pub span: Span,
    pub kind: ConstraintKind,
    /// Constraints that must resolve before this one. Always earlier in the
    /// list.
    pub dependencies: Vec<ConstraintId>,
}

/// Append-only store of constraints in emission order.
#[derive(Debug, Default)]
pub struct ConstraintList {
    constraints: Vec<Constraint>,
}

impl ConstraintList {
    pub fn new() -> Self {
        ConstraintList::default()
    }

    pub fn push(&mut self, constraint: Constraint) -> ConstraintId {
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(constraint);
        id
    }

    pub fn get(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ConstraintId) -> &mut Constraint {
        &mut self.constraints[id.0 as usize]
    }

    /// The current end of the list.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.constraints.len() as u32,
        }
    }

    /// Ids of the constraints inserted in `[start, end)`.
    pub fn range(&self, start: Checkpoint, end: Checkpoint) -> impl Iterator<Item = ConstraintId> {
        (start.offset..end.offset).map(ConstraintId)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (ConstraintId(i as u32), c))
    }
}

#[cfg(test)]
#[path = "tests/constraint.rs"]
mod tests;
