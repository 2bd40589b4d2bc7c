use super::*;
use crate::ScopeId;

#[test]
fn test_seeded_constants() {
    let arena = TypeArena::new();

    assert!(matches!(
        arena.get(TypeId::NUMBER),
        Type::Primitive(PrimitiveKind::Number)
    ));
    assert!(matches!(
        arena.get(TypeId::NEVER),
        Type::Primitive(PrimitiveKind::Never)
    ));
    assert!(matches!(arena.get(TypeId::ERROR), Type::Error));
    assert!(matches!(
        arena.get(TypeId::TRUE),
        Type::Singleton(Singleton::Bool(true))
    ));

    // Truthy is the negation of falsy, which is `false | nil`.
    match arena.get(TypeId::TRUTHY) {
        Type::Negation(inner) => assert_eq!(*inner, TypeId::FALSY),
        other => panic!("expected a negation, got {other:?}"),
    }
    match arena.get(TypeId::FALSY) {
        Type::Union(parts) => assert_eq!(parts, &[TypeId::FALSE, TypeId::NIL]),
        other => panic!("expected a union, got {other:?}"),
    }

    assert!(matches!(arena.get_pack(TypePackId::ERROR), TypePack::Error));
}

#[test]
fn test_handles_are_identity() {
    let mut arena = TypeArena::new();
    let a = arena.union(vec![TypeId::NUMBER, TypeId::STRING]);
    let b = arena.union(vec![TypeId::NUMBER, TypeId::STRING]);
    // Structurally equal, but distinct terms.
    assert_ne!(a, b);
    assert_eq!(arena.get(a), arena.get(b));
}

#[test]
fn test_follow_chases_bound_chains() {
    let mut arena = TypeArena::new();
    let a = arena.add(Type::Bound(TypeId::NUMBER));
    let b = arena.add(Type::Bound(a));
    let c = arena.add(Type::Bound(b));

    assert_eq!(arena.follow(c), TypeId::NUMBER);
    assert_eq!(arena.follow(TypeId::NUMBER), TypeId::NUMBER);
}

#[test]
fn test_follow_pack_chases_bound_chains() {
    let mut arena = TypeArena::new();
    let concrete = arena.pack(vec![TypeId::NUMBER], None);
    let a = arena.add_pack(TypePack::Bound(concrete));
    let b = arena.add_pack(TypePack::Bound(a));

    assert_eq!(arena.follow_pack(b), concrete);
}

#[test]
fn test_bind_rewrites_blocked_in_place() {
    let mut arena = TypeArena::new();
    let blocked = arena.add(Type::Blocked);
    arena.bind(blocked, Type::Bound(TypeId::STRING));

    assert_eq!(arena.follow(blocked), TypeId::STRING);
}

#[test]
fn test_bind_rewrites_free_in_place() {
    let mut arena = TypeArena::new();
    let free = arena.fresh_type(ScopeId::GLOBAL);
    arena.bind(free, Type::Bound(TypeId::BOOLEAN));

    assert_eq!(arena.follow(free), TypeId::BOOLEAN);
}

#[test]
#[should_panic(expected = "only blocked or free types may be rewritten")]
#[cfg(debug_assertions)]
fn test_bind_rejects_resolved_types() {
    let mut arena = TypeArena::new();
    let union = arena.union(vec![TypeId::NUMBER]);
    arena.bind(union, Type::Bound(TypeId::STRING));
}

#[test]
fn test_singleton_bool_never_allocates() {
    let arena = TypeArena::new();
    assert_eq!(arena.singleton_bool(true), TypeId::TRUE);
    assert_eq!(arena.singleton_bool(false), TypeId::FALSE);
}
