//! Operations over packs and the occurs check.

use crate::arena::TypeArena;
use crate::ty::*;

/// The first type of a pack, chasing bound links and pack tails.
pub fn first(arena: &TypeArena, pack: TypePackId) -> Option<TypeId> {
    let pack = arena.follow_pack(pack);
    match arena.get_pack(pack) {
        TypePack::Pack { head, tail } => {
            if let Some(ty) = head.first() {
                Some(*ty)
            } else if let Some(tail) = tail {
                first(arena, *tail)
            } else {
                None
            }
        }
        TypePack::Variadic { ty, .. } => Some(*ty),
        _ => None,
    }
}

/// Does `needle` (a blocked alias head) appear in `haystack` through unions,
/// intersections, and bound links?
///
/// A hit means the alias directly contains itself with no intervening type
/// constructor, which can never be resolved; the caller aliases the head to
/// `any` and reports the failure.
pub fn occurs(arena: &TypeArena, needle: TypeId, haystack: TypeId) -> bool {
    debug_assert!(matches!(arena.get(needle), Type::Blocked));

    let haystack = arena.follow(haystack);
    if needle == haystack {
        return true;
    }

    match arena.get(haystack) {
        Type::Union(parts) | Type::Intersection(parts) => {
            parts.iter().any(|&part| occurs(arena, needle, part))
        }
        _ => false,
    }
}

/// The result of [`extend_type_pack`]: `length` concrete head types when the
/// pack could supply them, plus whatever tail remains.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtendedTypePack {
    pub head: Vec<TypeId>,
    pub tail: Option<TypePackId>,
}

/// Pull `length` element types out of `pack`.
///
/// Concrete heads are split at the requested length; a variadic repeats its
/// element; an error pack fills with error-recovery types. A free tail is
/// taken as proof that the pack has at least `length` elements: fresh types
/// are minted for the missing ones and the free pack is rewritten in place
/// into a concrete pack carrying them (plus a fresh free tail). Blocked and
/// generic packs cannot be split and are returned as an opaque tail.
pub fn extend_type_pack(
    arena: &mut TypeArena,
    mut pack: TypePackId,
    length: usize,
) -> ExtendedTypePack {
    let mut result = ExtendedTypePack::default();

    loop {
        pack = arena.follow_pack(pack);

        match arena.get_pack(pack).clone() {
            TypePack::Pack { head, tail } => {
                let mut i = 0;
                while i < head.len() && result.head.len() < length {
                    result.head.push(head[i]);
                    i += 1;
                }

                if result.head.len() == length {
                    if i == head.len() {
                        result.tail = tail;
                    } else {
                        // Split mid-head: the leftovers become a new pack.
                        let rest = arena.pack(head[i..].to_vec(), tail);
                        result.tail = Some(rest);
                    }
                    return result;
                } else if let Some(tail) = tail {
                    pack = tail;
                } else {
                    // There just aren't enough types in this pack.
                    return result;
                }
            }
            TypePack::Variadic { ty, .. } => {
                while result.head.len() < length {
                    result.head.push(ty);
                }
                result.tail = Some(pack);
                return result;
            }
            TypePack::Free { scope } => {
                let mut minted = Vec::new();
                while result.head.len() < length {
                    let fresh = arena.fresh_type(scope);
                    minted.push(fresh);
                    result.head.push(fresh);
                }
                let new_tail = arena.fresh_pack(scope);
                arena.bind_pack(
                    pack,
                    TypePack::Pack {
                        head: minted,
                        tail: Some(new_tail),
                    },
                );
                return result;
            }
            TypePack::Error => {
                while result.head.len() < length {
                    result.head.push(TypeId::ERROR);
                }
                result.tail = Some(pack);
                return result;
            }
            TypePack::Blocked | TypePack::Generic { .. } => {
                result.tail = Some(pack);
                return result;
            }
            TypePack::Bound(_) => unreachable!("follow_pack chases bound packs"),
        }
    }
}

#[cfg(test)]
#[path = "tests/utils.rs"]
mod tests;
