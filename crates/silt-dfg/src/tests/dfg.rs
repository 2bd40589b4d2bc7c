use super::*;
use silt_ast::AstBuilder;

#[test]
fn test_local_uses_share_declaration_def() {
    let mut b = AstBuilder::new();
    let x = b.local("x");
    let one = b.number(1.0);
    let decl = b.local_stmt(vec![x.clone()], vec![one]);
    let use1 = b.local_ref(&x);
    let use2 = b.local_ref(&x);
    let use1_id = use1.node_id;
    let use2_id = use2.node_id;
    let s1 = b.expr_stmt(use1);
    let s2 = b.expr_stmt(use2);
    let block = b.block(vec![decl, s1, s2]);

    let dfg = DataFlowGraph::build(&block);

    let decl_def = dfg.get_local_def(x.id).unwrap();
    assert_eq!(dfg.get_def(use1_id), Some(decl_def));
    assert_eq!(dfg.get_def(use2_id), Some(decl_def));
    assert!(dfg.cell(decl_def).field.is_none());
}

#[test]
fn test_shadowing_gets_a_fresh_def() {
    let mut b = AstBuilder::new();
    let x1 = b.local("x");
    let one = b.number(1.0);
    let decl1 = b.local_stmt(vec![x1.clone()], vec![one]);
    let x2 = b.local("x");
    let two = b.number(2.0);
    let decl2 = b.local_stmt(vec![x2.clone()], vec![two]);
    let block = b.block(vec![decl1, decl2]);

    let dfg = DataFlowGraph::build(&block);

    assert_ne!(
        dfg.get_local_def(x1.id).unwrap(),
        dfg.get_local_def(x2.id).unwrap()
    );
}

#[test]
fn test_global_uses_share_one_def_per_name() {
    let mut b = AstBuilder::new();
    let g1 = b.global("print");
    let g2 = b.global("print");
    let other = b.global("warn");
    let (id1, id2, id3) = (g1.node_id, g2.node_id, other.node_id);
    let s1 = b.expr_stmt(g1);
    let s2 = b.expr_stmt(g2);
    let s3 = b.expr_stmt(other);
    let block = b.block(vec![s1, s2, s3]);

    let dfg = DataFlowGraph::build(&block);

    assert_eq!(dfg.get_def(id1), dfg.get_def(id2));
    assert_ne!(dfg.get_def(id1), dfg.get_def(id3));
}

#[test]
fn test_property_chain_cells_link_to_parents() {
    let mut b = AstBuilder::new();
    let t = b.local("t");
    let table = b.table(vec![]);
    let decl = b.local_stmt(vec![t.clone()], vec![table]);

    // t.a.b
    let t_ref = b.local_ref(&t);
    let t_a = b.index_name(t_ref, "a");
    let t_a_id = t_a.node_id;
    let t_a_b = b.index_name(t_a, "b");
    let t_a_b_id = t_a_b.node_id;
    let use_stmt = b.expr_stmt(t_a_b);
    let block = b.block(vec![decl, use_stmt]);

    let dfg = DataFlowGraph::build(&block);

    let root = dfg.get_local_def(t.id).unwrap();
    let a_def = dfg.get_def(t_a_id).unwrap();
    let b_def = dfg.get_def(t_a_b_id).unwrap();

    let a_cell = dfg.cell(a_def).field.as_ref().unwrap();
    assert_eq!(a_cell.parent, root);
    assert_eq!(a_cell.prop_name, "a");

    let b_cell = dfg.cell(b_def).field.as_ref().unwrap();
    assert_eq!(b_cell.parent, a_def);
    assert_eq!(b_cell.prop_name, "b");
}

#[test]
fn test_same_property_resolves_to_same_def() {
    let mut b = AstBuilder::new();
    let t = b.local("t");
    let table = b.table(vec![]);
    let decl = b.local_stmt(vec![t.clone()], vec![table]);

    let r1 = b.local_ref(&t);
    let a1 = b.index_name(r1, "a");
    let a1_id = a1.node_id;
    let r2 = b.local_ref(&t);
    let a2 = b.index_name(r2, "a");
    let a2_id = a2.node_id;
    let s1 = b.expr_stmt(a1);
    let s2 = b.expr_stmt(a2);
    let block = b.block(vec![decl, s1, s2]);

    let dfg = DataFlowGraph::build(&block);

    assert_eq!(dfg.get_def(a1_id), dfg.get_def(a2_id));
}

#[test]
fn test_string_index_expr_names_a_property() {
    let mut b = AstBuilder::new();
    let t = b.local("t");
    let table = b.table(vec![]);
    let decl = b.local_stmt(vec![t.clone()], vec![table]);

    let r1 = b.local_ref(&t);
    let key = b.string("a");
    let indexed = b.index_expr(r1, key);
    let indexed_id = indexed.node_id;
    let r2 = b.local_ref(&t);
    let dotted = b.index_name(r2, "a");
    let dotted_id = dotted.node_id;
    let s1 = b.expr_stmt(indexed);
    let s2 = b.expr_stmt(dotted);
    let block = b.block(vec![decl, s1, s2]);

    let dfg = DataFlowGraph::build(&block);

    // t["a"] and t.a are the same definition.
    assert_eq!(dfg.get_def(indexed_id), dfg.get_def(dotted_id));
    assert!(dfg.get_def(indexed_id).is_some());
}

#[test]
fn test_group_and_assertion_pass_defs_through() {
    let mut b = AstBuilder::new();
    let x = b.local("x");
    let one = b.number(1.0);
    let decl = b.local_stmt(vec![x.clone()], vec![one]);

    let inner = b.local_ref(&x);
    let grouped = b.group(inner);
    let grouped_id = grouped.node_id;
    let s = b.expr_stmt(grouped);
    let block = b.block(vec![decl, s]);

    let dfg = DataFlowGraph::build(&block);
    assert_eq!(dfg.get_def(grouped_id), dfg.get_local_def(x.id));
}

#[test]
fn test_function_params_get_defs() {
    let mut b = AstBuilder::new();
    let p = b.local("p");
    let p_ref = b.local_ref(&p);
    let p_ref_id = p_ref.node_id;
    let ret = b.return_stmt(vec![p_ref]);
    let body = b.block(vec![ret]);
    let f = b.function(vec![p.clone()], body);
    let s = b.expr_stmt(f);
    let block = b.block(vec![s]);

    let dfg = DataFlowGraph::build(&block);
    let param_def = dfg.get_local_def(p.id).unwrap();
    assert_eq!(dfg.get_def(p_ref_id), Some(param_def));
}
