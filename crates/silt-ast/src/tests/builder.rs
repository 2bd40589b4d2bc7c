use super::*;
use crate::{ExprKind, StmtKind};

#[test]
fn test_node_ids_are_distinct() {
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let two = b.number(2.0);
    assert_ne!(one.node_id, two.node_id);
}

#[test]
fn test_locals_are_distinct_even_with_same_name() {
    let mut b = AstBuilder::new();
    let x1 = b.local("x");
    let x2 = b.local("x");
    assert_ne!(x1.id, x2.id);
    assert_eq!(x1.name, x2.name);
}

#[test]
fn test_local_ref_points_at_declaration() {
    let mut b = AstBuilder::new();
    let x = b.local("x");
    let use_of_x = b.local_ref(&x);
    match use_of_x.kind {
        ExprKind::Local { id, ref name } => {
            assert_eq!(id, x.id);
            assert_eq!(name, "x");
        }
        _ => panic!("expected a local reference"),
    }
}

#[test]
fn test_record_item_has_string_key() {
    let mut b = AstBuilder::new();
    let one = b.number(1.0);
    let item = b.record_item("a", one);
    assert!(item.is_record());

    let two = b.number(2.0);
    let item = b.list_item(two);
    assert!(!item.is_record());
}

#[test]
fn test_multi_valued_expressions() {
    let mut b = AstBuilder::new();
    let f = b.global("f");
    let call = b.call(f, vec![]);
    assert!(call.is_multi_valued());
    let varargs = b.varargs();
    assert!(varargs.is_multi_valued());
    let n = b.number(1.0);
    assert!(!n.is_multi_valued());
}

#[test]
fn test_statement_construction() {
    let mut b = AstBuilder::new();
    let x = b.local("x");
    let one = b.number(1.0);
    let stmt = b.local_stmt(vec![x], vec![one]);
    match stmt.kind {
        StmtKind::Local {
            ref vars,
            ref values,
        } => {
            assert_eq!(vars.len(), 1);
            assert_eq!(values.len(), 1);
        }
        _ => panic!("expected a local statement"),
    }
}
