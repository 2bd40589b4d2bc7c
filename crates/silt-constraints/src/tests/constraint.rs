use super::*;
use silt_common::span::Span;
use silt_types::{ScopeId, TypeId};

fn subtype(sub: TypeId, sup: TypeId) -> Constraint {
    Constraint {
        scope: ScopeId::GLOBAL,
        span: Span::dummy(),
        kind: ConstraintKind::Subtype { sub, sup },
        dependencies: Vec::new(),
    }
}

#[test]
fn test_push_returns_sequential_ids() {
    let mut list = ConstraintList::new();
    let a = list.push(subtype(TypeId::NUMBER, TypeId::ANY));
    let b = list.push(subtype(TypeId::STRING, TypeId::ANY));
    assert_eq!(a, ConstraintId(0));
    assert_eq!(b, ConstraintId(1));
    assert_eq!(list.len(), 2);
}

#[test]
fn test_checkpoint_range_covers_inserted_constraints() {
    let mut list = ConstraintList::new();
    list.push(subtype(TypeId::NUMBER, TypeId::ANY));

    let start = list.checkpoint();
    let a = list.push(subtype(TypeId::STRING, TypeId::ANY));
    let b = list.push(subtype(TypeId::BOOLEAN, TypeId::ANY));
    let end = list.checkpoint();

    let ids: Vec<ConstraintId> = list.range(start, end).collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn test_empty_range() {
    let mut list = ConstraintList::new();
    list.push(subtype(TypeId::NUMBER, TypeId::ANY));
    let checkpoint = list.checkpoint();
    assert_eq!(list.range(checkpoint, checkpoint).count(), 0);
}

#[test]
fn test_dependencies_point_backwards() {
    let mut list = ConstraintList::new();
    let start = list.checkpoint();
    let a = list.push(subtype(TypeId::NUMBER, TypeId::ANY));
    let b = list.push(subtype(TypeId::STRING, TypeId::ANY));
    let end = list.checkpoint();

    let mut later = subtype(TypeId::BOOLEAN, TypeId::ANY);
    later.dependencies = list.range(start, end).collect();
    let later_id = list.push(later);

    for dep in &list.get(later_id).dependencies {
        assert!(*dep < later_id);
    }
    assert_eq!(list.get(later_id).dependencies, vec![a, b]);
}

#[test]
fn test_kind_names() {
    assert_eq!(
        ConstraintKind::Subtype {
            sub: TypeId::NUMBER,
            sup: TypeId::ANY
        }
        .name(),
        "Subtype"
    );
    assert_eq!(
        ConstraintKind::TypeAliasExpansion {
            target: TypeId::NUMBER
        }
        .name(),
        "TypeAliasExpansion"
    );
}
