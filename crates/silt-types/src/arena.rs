//! The type term arena.

use crate::ty::*;
use crate::ScopeId;

/// Owns every type and type pack of one module analysis.
///
/// Construction seeds the well-known terms at the indices named by the
/// `TypeId`/`TypePackId` constants. Handles are never invalidated; nodes are
/// never moved after insertion.
#[derive(Debug)]
pub struct TypeArena {
    types: Vec<Type>,
    packs: Vec<TypePack>,
}

impl TypeArena {
    pub fn new() -> Self {
        let types = vec![
            Type::Primitive(PrimitiveKind::Nil),
            Type::Primitive(PrimitiveKind::Boolean),
            Type::Primitive(PrimitiveKind::Number),
            Type::Primitive(PrimitiveKind::String),
            Type::Primitive(PrimitiveKind::Thread),
            Type::Primitive(PrimitiveKind::Function),
            Type::Primitive(PrimitiveKind::Table),
            Type::Primitive(PrimitiveKind::Class),
            Type::Primitive(PrimitiveKind::Any),
            Type::Primitive(PrimitiveKind::Never),
            Type::Error,
            Type::Singleton(Singleton::Bool(true)),
            Type::Singleton(Singleton::Bool(false)),
            Type::Union(vec![TypeId::FALSE, TypeId::NIL]),
            Type::Negation(TypeId::FALSY),
        ];
        debug_assert_eq!(types.len() as u32, TypeId::FIRST_USER);

        let packs = vec![
            TypePack::Error,
            TypePack::Variadic {
                ty: TypeId::ANY,
                hidden: false,
            },
        ];
        debug_assert_eq!(packs.len() as u32, TypePackId::FIRST_USER);

        TypeArena { types, packs }
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    pub fn add(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn add_pack(&mut self, pack: TypePack) -> TypePackId {
        let id = TypePackId(self.packs.len() as u32);
        self.packs.push(pack);
        id
    }

    /// A fresh unconstrained type belonging to `scope`.
    pub fn fresh_type(&mut self, scope: ScopeId) -> TypeId {
        self.add(Type::Free { scope })
    }

    /// A fresh unconstrained pack belonging to `scope`.
    pub fn fresh_pack(&mut self, scope: ScopeId) -> TypePackId {
        self.add_pack(TypePack::Free { scope })
    }

    /// A concrete pack with the given head and optional tail.
    pub fn pack(&mut self, head: Vec<TypeId>, tail: Option<TypePackId>) -> TypePackId {
        self.add_pack(TypePack::Pack { head, tail })
    }

    pub fn union(&mut self, parts: Vec<TypeId>) -> TypeId {
        self.add(Type::Union(parts))
    }

    pub fn intersection(&mut self, parts: Vec<TypeId>) -> TypeId {
        self.add(Type::Intersection(parts))
    }

    pub fn negation(&mut self, inner: TypeId) -> TypeId {
        self.add(Type::Negation(inner))
    }

    /// Boolean singletons are seeded; this never allocates.
    pub fn singleton_bool(&self, value: bool) -> TypeId {
        if value {
            TypeId::TRUE
        } else {
            TypeId::FALSE
        }
    }

    pub fn singleton_string(&mut self, value: &str) -> TypeId {
        self.add(Type::Singleton(Singleton::String(value.to_string())))
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn get_pack(&self, id: TypePackId) -> &TypePack {
        &self.packs[id.0 as usize]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Rewrite a `Blocked` or `Free` type in place into its resolved form.
    ///
    /// This is the only legal mutation of an allocated term, and it may
    /// happen at most once per term.
    pub fn bind(&mut self, id: TypeId, ty: Type) {
        debug_assert!(
            matches!(self.get(id), Type::Blocked | Type::Free { .. }),
            "only blocked or free types may be rewritten, got {:?}",
            self.get(id)
        );
        self.types[id.0 as usize] = ty;
    }

    /// Rewrite a `Blocked` or `Free` pack in place into its resolved form.
    pub fn bind_pack(&mut self, id: TypePackId, pack: TypePack) {
        debug_assert!(
            matches!(self.get_pack(id), TypePack::Blocked | TypePack::Free { .. }),
            "only blocked or free packs may be rewritten, got {:?}",
            self.get_pack(id)
        );
        self.packs[id.0 as usize] = pack;
    }

    // =========================================================================
    // Forwarding
    // =========================================================================

    /// Chase `Bound` links to the term they forward to. Arena construction
    /// never closes a `Bound` cycle, so this terminates.
    pub fn follow(&self, mut id: TypeId) -> TypeId {
        let mut steps = 0usize;
        while let Type::Bound(next) = self.get(id) {
            id = *next;
            steps += 1;
            debug_assert!(steps <= self.types.len(), "cycle of Bound types");
        }
        id
    }

    /// Chase `Bound` links on packs.
    pub fn follow_pack(&self, mut id: TypePackId) -> TypePackId {
        let mut steps = 0usize;
        while let TypePack::Bound(next) = self.get_pack(id) {
            id = *next;
            steps += 1;
            debug_assert!(steps <= self.packs.len(), "cycle of Bound packs");
        }
        id
    }
}

impl Default for TypeArena {
    fn default() -> Self {
        TypeArena::new()
    }
}

#[cfg(test)]
#[path = "tests/arena.rs"]
mod tests;
