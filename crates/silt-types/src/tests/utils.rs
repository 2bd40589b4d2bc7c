use super::*;
use crate::ScopeId;
use crate::TypeLevel;

// =============================================================================
// first
// =============================================================================

#[test]
fn test_first_of_concrete_pack() {
    let mut arena = TypeArena::new();
    let pack = arena.pack(vec![TypeId::NUMBER, TypeId::STRING], None);
    assert_eq!(first(&arena, pack), Some(TypeId::NUMBER));
}

#[test]
fn test_first_reaches_through_empty_head_into_tail() {
    let mut arena = TypeArena::new();
    let tail = arena.pack(vec![TypeId::BOOLEAN], None);
    let pack = arena.pack(vec![], Some(tail));
    assert_eq!(first(&arena, pack), Some(TypeId::BOOLEAN));
}

#[test]
fn test_first_of_variadic() {
    let mut arena = TypeArena::new();
    let pack = arena.add_pack(TypePack::Variadic {
        ty: TypeId::STRING,
        hidden: false,
    });
    assert_eq!(first(&arena, pack), Some(TypeId::STRING));
}

#[test]
fn test_first_of_empty_pack() {
    let mut arena = TypeArena::new();
    let pack = arena.pack(vec![], None);
    assert_eq!(first(&arena, pack), None);
}

// =============================================================================
// occurs
// =============================================================================

#[test]
fn test_occurs_direct_hit() {
    let mut arena = TypeArena::new();
    let needle = arena.add(Type::Blocked);
    assert!(occurs(&arena, needle, needle));
}

#[test]
fn test_occurs_through_union_and_intersection() {
    let mut arena = TypeArena::new();
    let needle = arena.add(Type::Blocked);
    let union = arena.union(vec![TypeId::NUMBER, needle]);
    let inter = arena.intersection(vec![TypeId::STRING, union]);

    assert!(occurs(&arena, needle, union));
    assert!(occurs(&arena, needle, inter));
}

#[test]
fn test_occurs_through_bound_links() {
    let mut arena = TypeArena::new();
    let needle = arena.add(Type::Blocked);
    let bound = arena.add(Type::Bound(needle));
    let union = arena.union(vec![bound]);

    assert!(occurs(&arena, needle, union));
}

#[test]
fn test_occurs_does_not_descend_into_constructors() {
    let mut arena = TypeArena::new();
    let needle = arena.add(Type::Blocked);

    // `{ next: needle }` is fine: the table constructor intervenes.
    let mut table = TableType::new(TableState::Sealed, ScopeId::GLOBAL, TypeLevel::default());
    table
        .props
        .insert("next".into(), Property::new(needle));
    let table = arena.add(Type::Table(table));

    assert!(!occurs(&arena, needle, table));
    assert!(!occurs(&arena, needle, TypeId::NUMBER));
}

// =============================================================================
// extend_type_pack
// =============================================================================

#[test]
fn test_extend_exact_head() {
    let mut arena = TypeArena::new();
    let pack = arena.pack(vec![TypeId::NUMBER, TypeId::STRING], None);

    let extended = extend_type_pack(&mut arena, pack, 2);
    assert_eq!(extended.head, vec![TypeId::NUMBER, TypeId::STRING]);
    assert_eq!(extended.tail, None);
}

#[test]
fn test_extend_splits_long_head() {
    let mut arena = TypeArena::new();
    let pack = arena.pack(vec![TypeId::NUMBER, TypeId::STRING, TypeId::BOOLEAN], None);

    let extended = extend_type_pack(&mut arena, pack, 1);
    assert_eq!(extended.head, vec![TypeId::NUMBER]);

    let rest = extended.tail.expect("leftovers should form a tail");
    match arena.get_pack(rest) {
        TypePack::Pack { head, tail } => {
            assert_eq!(head, &[TypeId::STRING, TypeId::BOOLEAN]);
            assert_eq!(*tail, None);
        }
        other => panic!("expected a concrete pack, got {other:?}"),
    }
}

#[test]
fn test_extend_short_pack_returns_what_it_has() {
    let mut arena = TypeArena::new();
    let pack = arena.pack(vec![TypeId::NUMBER], None);

    let extended = extend_type_pack(&mut arena, pack, 3);
    assert_eq!(extended.head, vec![TypeId::NUMBER]);
    assert_eq!(extended.tail, None);
}

#[test]
fn test_extend_variadic_repeats_element() {
    let mut arena = TypeArena::new();
    let pack = arena.add_pack(TypePack::Variadic {
        ty: TypeId::NUMBER,
        hidden: false,
    });

    let extended = extend_type_pack(&mut arena, pack, 3);
    assert_eq!(
        extended.head,
        vec![TypeId::NUMBER, TypeId::NUMBER, TypeId::NUMBER]
    );
    assert_eq!(extended.tail, Some(pack));
}

#[test]
fn test_extend_free_pack_mints_fresh_types_and_rebinds() {
    let mut arena = TypeArena::new();
    let scope = ScopeId(3);
    let free = arena.fresh_pack(scope);

    let extended = extend_type_pack(&mut arena, free, 2);
    assert_eq!(extended.head.len(), 2);
    for &ty in &extended.head {
        assert!(matches!(arena.get(ty), Type::Free { .. }));
    }

    // The free pack was rewritten in place into a concrete pack carrying
    // the minted types plus a fresh free tail.
    match arena.get_pack(free) {
        TypePack::Pack { head, tail } => {
            assert_eq!(head, &extended.head);
            let tail = tail.expect("rebinding keeps a fresh tail");
            assert!(matches!(arena.get_pack(tail), TypePack::Free { .. }));
        }
        other => panic!("expected the free pack to be rebound, got {other:?}"),
    }
}

#[test]
fn test_extend_walks_chained_heads() {
    let mut arena = TypeArena::new();
    let inner = arena.pack(vec![TypeId::STRING], None);
    let outer = arena.pack(vec![TypeId::NUMBER], Some(inner));

    let extended = extend_type_pack(&mut arena, outer, 2);
    assert_eq!(extended.head, vec![TypeId::NUMBER, TypeId::STRING]);
    assert_eq!(extended.tail, None);
}

#[test]
fn test_extend_error_pack_fills_with_error_types() {
    let mut arena = TypeArena::new();

    let extended = extend_type_pack(&mut arena, TypePackId::ERROR, 2);
    assert_eq!(extended.head, vec![TypeId::ERROR, TypeId::ERROR]);
    assert_eq!(extended.tail, Some(TypePackId::ERROR));
}

#[test]
fn test_extend_blocked_pack_is_opaque() {
    let mut arena = TypeArena::new();
    let blocked = arena.add_pack(TypePack::Blocked);

    let extended = extend_type_pack(&mut arena, blocked, 2);
    assert!(extended.head.is_empty());
    assert_eq!(extended.tail, Some(blocked));
}
