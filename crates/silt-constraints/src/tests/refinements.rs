use super::*;
use silt_dfg::DefId;
use silt_types::TypeId;

#[test]
fn test_proposition_allocates_a_term() {
    let mut arena = RefinementArena::new();
    let id = arena.proposition(DefId(0), TypeId::TRUTHY);
    match arena.get(id) {
        Refinement::Proposition { def, discriminant } => {
            assert_eq!(*def, DefId(0));
            assert_eq!(*discriminant, TypeId::TRUTHY);
        }
        other => panic!("expected a proposition, got {other:?}"),
    }
}

#[test]
fn test_negation_drops_absent_operand() {
    let mut arena = RefinementArena::new();
    assert_eq!(arena.negation(None), None);
    assert!(arena.is_empty());

    let prop = arena.proposition(DefId(0), TypeId::TRUTHY);
    let negated = arena.negation(Some(prop)).unwrap();
    assert!(matches!(arena.get(negated), Refinement::Negation(inner) if *inner == prop));
}

#[test]
fn test_conjunction_drops_absent_operands() {
    let mut arena = RefinementArena::new();
    let prop = arena.proposition(DefId(0), TypeId::TRUTHY);

    assert_eq!(arena.conjunction(None, None), None);
    assert_eq!(arena.conjunction(Some(prop), None), Some(prop));
    assert_eq!(arena.conjunction(None, Some(prop)), Some(prop));

    let other = arena.proposition(DefId(1), TypeId::TRUTHY);
    let both = arena.conjunction(Some(prop), Some(other)).unwrap();
    assert!(matches!(
        arena.get(both),
        Refinement::Conjunction(lhs, rhs) if *lhs == prop && *rhs == other
    ));
}

#[test]
fn test_disjunction_and_equivalence_drop_absent_operands() {
    let mut arena = RefinementArena::new();
    let prop = arena.proposition(DefId(0), TypeId::TRUTHY);

    assert_eq!(arena.disjunction(None, None), None);
    assert_eq!(arena.disjunction(None, Some(prop)), Some(prop));
    assert_eq!(arena.equivalence(None, None), None);
    assert_eq!(arena.equivalence(Some(prop), None), Some(prop));
}

#[test]
fn test_variadic_drops_absent_entries() {
    let mut arena = RefinementArena::new();
    assert_eq!(arena.variadic(vec![]), None);
    assert_eq!(arena.variadic(vec![None, None]), None);

    let a = arena.proposition(DefId(0), TypeId::TRUTHY);
    let b = arena.proposition(DefId(1), TypeId::TRUTHY);
    let bundled = arena.variadic(vec![Some(a), None, Some(b)]).unwrap();
    match arena.get(bundled) {
        Refinement::Variadic(parts) => assert_eq!(parts, &[a, b]),
        other => panic!("expected a variadic, got {other:?}"),
    }
}
