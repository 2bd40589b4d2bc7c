//! Lowering refinements into branch scopes: truthiness, type guards,
//! negation, `and`/`or`, equality, property paths, and `assert`.

use super::*;
use silt_ast::{AstBuilder, BinaryOp, Block, UnaryOp};
use silt_common::options::AnalysisOptions;
use silt_dfg::DataFlowGraph;
use silt_types::{
    ScopeId, Singleton, TableState, Type, TypeFun, TypeId,
};

fn run(block: &Block, dfg: &DataFlowGraph) -> ConstraintGeneration {
    let resolver = NullModuleResolver;
    let options = AnalysisOptions::default();
    let mut generator = ConstraintGenerator::new("MainModule", dfg, &resolver, &options);
    for (name, ty) in [
        ("nil", TypeId::NIL),
        ("boolean", TypeId::BOOLEAN),
        ("number", TypeId::NUMBER),
        ("string", TypeId::STRING),
        ("any", TypeId::ANY),
    ] {
        generator.add_global_type(name, TypeFun::monomorphic(ty));
    }
    generator.add_global("type", TypeId::FUNCTION);
    generator.add_global("typeof", TypeId::FUNCTION);
    generator.add_global("assert", TypeId::FUNCTION);
    generator.generate(block);
    generator.finish()
}

/// The parts of the intersection installed for `def` in `scope`.
fn refined_parts(
    result: &ConstraintGeneration,
    scope: ScopeId,
    def: silt_dfg::DefId,
) -> Vec<TypeId> {
    let ty = result.scopes.get(scope).def_refinements[&def];
    match result.arena.get(ty) {
        Type::Intersection(parts) => parts.clone(),
        other => panic!("expected an intersection, got {other:?}"),
    }
}

#[test]
fn test_truthiness_refinement_in_both_branches() {
    // if v then ... else ... end
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);
    let cond = b.local_ref(&v);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let else_block = b.block(vec![]);
    let else_id = else_block.node_id;
    let else_stmt = b.else_block(else_block);
    let else_stmt_id = else_stmt.node_id;
    let if_stmt = b.if_stmt(cond, then_body, Some(else_stmt));
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let v_ty = result
        .scopes
        .get(result.module.root_scope.unwrap())
        .bindings[&silt_ast::Symbol::Local(v.id)]
        .ty;

    let then_scope = result.module.ast_scopes[&then_id];
    let parts = refined_parts(&result, then_scope, def);
    assert_eq!(parts, vec![v_ty, TypeId::TRUTHY]);

    let else_scope = result.module.ast_scopes[&else_stmt_id];
    let parts = refined_parts(&result, else_scope, def);
    assert_eq!(parts[0], v_ty);
    match result.arena.get(parts[1]) {
        Type::Negation(inner) => assert_eq!(*inner, TypeId::TRUTHY),
        other => panic!("expected a negation, got {other:?}"),
    }
    // The else block body did not get a second scope of its own.
    assert!(!result.module.ast_scopes.contains_key(&else_id));
}

#[test]
fn test_type_guard_narrows_then_and_else() {
    // if type(v) == "number" then ... else ... end
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);

    let type_fn = b.global("type");
    let v_ref = b.local_ref(&v);
    let guard_call = b.call(type_fn, vec![v_ref]);
    let number_str = b.string("number");
    let cond = b.binary(BinaryOp::CompareEq, guard_call, number_str);

    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let else_block = b.block(vec![]);
    let else_stmt = b.else_block(else_block);
    let else_stmt_id = else_stmt.node_id;
    let if_stmt = b.if_stmt(cond, then_body, Some(else_stmt));
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let root = result.module.root_scope.unwrap();
    let v_ty = result.scopes.get(root).bindings[&silt_ast::Symbol::Local(v.id)].ty;

    let then_scope = result.module.ast_scopes[&then_id];
    assert_eq!(
        refined_parts(&result, then_scope, def),
        vec![v_ty, TypeId::NUMBER]
    );

    let else_scope = result.module.ast_scopes[&else_stmt_id];
    let parts = refined_parts(&result, else_scope, def);
    assert_eq!(parts[0], v_ty);
    match result.arena.get(parts[1]) {
        Type::Negation(inner) => assert_eq!(*inner, TypeId::NUMBER),
        other => panic!("expected a negation, got {other:?}"),
    }
}

#[test]
fn test_type_guard_maps_known_strings_to_primitives() {
    for (guard, expected) in [
        ("nil", TypeId::NIL),
        ("boolean", TypeId::BOOLEAN),
        ("thread", TypeId::THREAD),
        ("table", TypeId::TABLE),
        ("function", TypeId::FUNCTION),
        ("userdata", TypeId::NEVER),
        ("rumpelstiltskin", TypeId::NEVER),
    ] {
        let mut b = AstBuilder::new();
        let v = b.local("v");
        let decl = b.local_stmt(vec![v.clone()], vec![]);
        let type_fn = b.global("type");
        let v_ref = b.local_ref(&v);
        let guard_call = b.call(type_fn, vec![v_ref]);
        let guard_str = b.string(guard);
        let cond = b.binary(BinaryOp::CompareEq, guard_call, guard_str);
        let then_body = b.block(vec![]);
        let then_id = then_body.node_id;
        let if_stmt = b.if_stmt(cond, then_body, None);
        let block = b.block(vec![decl, if_stmt]);

        let dfg = DataFlowGraph::build(&block);
        let def = dfg.get_local_def(v.id).unwrap();
        let result = run(&block, &dfg);

        let then_scope = result.module.ast_scopes[&then_id];
        let parts = refined_parts(&result, then_scope, def);
        assert_eq!(parts[1], expected, "guard string {guard:?}");
    }
}

#[test]
fn test_guard_operands_may_be_swapped() {
    // if "number" == type(v), with the call on the right.
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);
    let number_str = b.string("number");
    let type_fn = b.global("type");
    let v_ref = b.local_ref(&v);
    let guard_call = b.call(type_fn, vec![v_ref]);
    let cond = b.binary(BinaryOp::CompareEq, number_str, guard_call);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let if_stmt = b.if_stmt(cond, then_body, None);
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let then_scope = result.module.ast_scopes[&then_id];
    let parts = refined_parts(&result, then_scope, def);
    assert_eq!(parts[1], TypeId::NUMBER);
}

#[test]
fn test_not_flips_the_sense() {
    // if not v then ... end
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);
    let v_ref = b.local_ref(&v);
    let cond = b.unary(UnaryOp::Not, v_ref);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let if_stmt = b.if_stmt(cond, then_body, None);
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let then_scope = result.module.ast_scopes[&then_id];
    let parts = refined_parts(&result, then_scope, def);
    match result.arena.get(parts[1]) {
        Type::Negation(inner) => assert_eq!(*inner, TypeId::TRUTHY),
        other => panic!("expected a negation, got {other:?}"),
    }
}

#[test]
fn test_conjunction_refines_both_defs_in_then_branch() {
    // if a and b then ... else ... end
    let mut b = AstBuilder::new();
    let a = b.local("a");
    let b_local = b.local("b");
    let decl_a = b.local_stmt(vec![a.clone()], vec![]);
    let decl_b = b.local_stmt(vec![b_local.clone()], vec![]);
    let a_ref = b.local_ref(&a);
    let b_ref = b.local_ref(&b_local);
    let cond = b.binary(BinaryOp::And, a_ref, b_ref);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let else_block = b.block(vec![]);
    let else_stmt = b.else_block(else_block);
    let else_stmt_id = else_stmt.node_id;
    let if_stmt = b.if_stmt(cond, then_body, Some(else_stmt));
    let block = b.block(vec![decl_a, decl_b, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def_a = dfg.get_local_def(a.id).unwrap();
    let def_b = dfg.get_local_def(b_local.id).unwrap();
    let result = run(&block, &dfg);

    let then_scope = result.module.ast_scopes[&then_id];
    assert_eq!(
        refined_parts(&result, then_scope, def_a)[1],
        TypeId::TRUTHY
    );
    assert_eq!(
        refined_parts(&result, then_scope, def_b)[1],
        TypeId::TRUTHY
    );

    // `not (a and b)` cannot pin either definition alone: the negated
    // conjunction unions per-definition maps, and the two sides refine
    // different definitions.
    let else_scope = result.module.ast_scopes[&else_stmt_id];
    assert!(result.scopes.get(else_scope).def_refinements.is_empty());
}

#[test]
fn test_disjunction_refines_both_defs_in_else_branch() {
    // if a or b then ... else ... end
    let mut b = AstBuilder::new();
    let a = b.local("a");
    let b_local = b.local("b");
    let decl_a = b.local_stmt(vec![a.clone()], vec![]);
    let decl_b = b.local_stmt(vec![b_local.clone()], vec![]);
    let a_ref = b.local_ref(&a);
    let b_ref = b.local_ref(&b_local);
    let cond = b.binary(BinaryOp::Or, a_ref, b_ref);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let else_block = b.block(vec![]);
    let else_stmt = b.else_block(else_block);
    let else_stmt_id = else_stmt.node_id;
    let if_stmt = b.if_stmt(cond, then_body, Some(else_stmt));
    let block = b.block(vec![decl_a, decl_b, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def_a = dfg.get_local_def(a.id).unwrap();
    let def_b = dfg.get_local_def(b_local.id).unwrap();
    let result = run(&block, &dfg);

    // `a or b` true pins neither definition alone.
    let then_scope = result.module.ast_scopes[&then_id];
    assert!(result.scopes.get(then_scope).def_refinements.is_empty());

    let else_scope = result.module.ast_scopes[&else_stmt_id];
    for def in [def_a, def_b] {
        let parts = refined_parts(&result, else_scope, def);
        assert!(matches!(result.arena.get(parts[1]), Type::Negation(_)));
    }
}

#[test]
fn test_equality_emits_singleton_or_top_constraints() {
    // if a == b then ... end — both sides refine each other through a
    // blocked discriminant the solver resolves.
    let mut b = AstBuilder::new();
    let a = b.local("a");
    let b_local = b.local("b");
    let decl_a = b.local_stmt(vec![a.clone()], vec![]);
    let decl_b = b.local_stmt(vec![b_local.clone()], vec![]);
    let a_ref = b.local_ref(&a);
    let b_ref = b.local_ref(&b_local);
    let cond = b.binary(BinaryOp::CompareEq, a_ref, b_ref);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let if_stmt = b.if_stmt(cond, then_body, None);
    let block = b.block(vec![decl_a, decl_b, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def_a = dfg.get_local_def(a.id).unwrap();
    let def_b = dfg.get_local_def(b_local.id).unwrap();
    let result = run(&block, &dfg);

    let singleton_or_top: Vec<_> = result
        .constraints
        .iter()
        .filter(|(_, c)| matches!(c.kind, ConstraintKind::SingletonOrTopType { .. }))
        .collect();
    assert_eq!(singleton_or_top.len(), 2);
    for (_, constraint) in &singleton_or_top {
        let ConstraintKind::SingletonOrTopType { result: blocked, negated, .. } =
            &constraint.kind
        else {
            unreachable!();
        };
        assert!(!negated);
        assert!(matches!(result.arena.get(*blocked), Type::Blocked));
    }

    let then_scope = result.module.ast_scopes[&then_id];
    for def in [def_a, def_b] {
        let parts = refined_parts(&result, then_scope, def);
        // The discriminant is the blocked singleton-or-top result.
        assert!(matches!(result.arena.get(parts[1]), Type::Blocked));
    }
}

#[test]
fn test_equality_with_literal_narrows_to_singleton() {
    // if a == "hello" then ... end — the literal has no definition, so the
    // equivalence degrades to a one-sided proposition.
    let mut b = AstBuilder::new();
    let a = b.local("a");
    let decl = b.local_stmt(vec![a.clone()], vec![]);
    let a_ref = b.local_ref(&a);
    let hello = b.string("hello");
    let hello_id = hello.node_id;
    let cond = b.binary(BinaryOp::CompareEq, a_ref, hello);
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let if_stmt = b.if_stmt(cond, then_body, None);
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(a.id).unwrap();
    let result = run(&block, &dfg);

    // Comparison operands are forced to singletons.
    let literal_ty = result.module.ast_types[&hello_id];
    assert!(matches!(
        result.arena.get(literal_ty),
        Type::Singleton(Singleton::String(value)) if value == "hello"
    ));

    let then_scope = result.module.ast_scopes[&then_id];
    let parts = refined_parts(&result, then_scope, def);
    assert_eq!(parts[1], literal_ty);
}

#[test]
fn test_property_path_is_lifted_to_the_root_definition() {
    // if t.a then ... end refines t itself, wrapping the discriminant in a
    // single-property table.
    let mut b = AstBuilder::new();
    let t = b.local("t");
    let table = b.table(vec![]);
    let decl = b.local_stmt(vec![t.clone()], vec![table]);
    let t_ref = b.local_ref(&t);
    let cond = b.index_name(t_ref, "a");
    let then_body = b.block(vec![]);
    let then_id = then_body.node_id;
    let if_stmt = b.if_stmt(cond, then_body, None);
    let block = b.block(vec![decl, if_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let root_def = dfg.get_local_def(t.id).unwrap();
    let result = run(&block, &dfg);

    let then_scope = result.module.ast_scopes[&then_id];
    let parts = refined_parts(&result, then_scope, root_def);

    match result.arena.get(parts[1]) {
        Type::Table(table) => {
            assert_eq!(table.state, TableState::Sealed);
            assert_eq!(table.props.len(), 1);
            assert_eq!(table.props["a"].ty, TypeId::TRUTHY);
        }
        other => panic!("expected a sealed table wrapper, got {other:?}"),
    }
}

#[test]
fn test_assert_applies_refinements_to_the_enclosing_scope() {
    // local v ... assert(v) refines v for the rest of the block.
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);
    let assert_fn = b.global("assert");
    let v_ref = b.local_ref(&v);
    let call = b.call(assert_fn, vec![v_ref]);
    let call_stmt = b.expr_stmt(call);
    let block = b.block(vec![decl, call_stmt]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let root = result.module.root_scope.unwrap();
    let parts = refined_parts(&result, root, def);
    assert_eq!(parts[1], TypeId::TRUTHY);
}

#[test]
fn test_applying_the_same_refinement_twice_intersects_again() {
    // assert(v); assert(v) — the second application intersects the already
    // refined type with the discriminant again, which is equivalent under
    // the solver's semantics.
    let mut b = AstBuilder::new();
    let v = b.local("v");
    let decl = b.local_stmt(vec![v.clone()], vec![]);
    let assert1 = b.global("assert");
    let v_ref1 = b.local_ref(&v);
    let call1 = b.call(assert1, vec![v_ref1]);
    let stmt1 = b.expr_stmt(call1);
    let assert2 = b.global("assert");
    let v_ref2 = b.local_ref(&v);
    let call2 = b.call(assert2, vec![v_ref2]);
    let stmt2 = b.expr_stmt(call2);
    let block = b.block(vec![decl, stmt1, stmt2]);

    let dfg = DataFlowGraph::build(&block);
    let def = dfg.get_local_def(v.id).unwrap();
    let result = run(&block, &dfg);

    let root = result.module.root_scope.unwrap();
    let outer = refined_parts(&result, root, def);
    assert_eq!(outer[1], TypeId::TRUTHY);
    match result.arena.get(outer[0]) {
        Type::Intersection(inner) => assert_eq!(inner[1], TypeId::TRUTHY),
        other => panic!("expected the first refinement underneath, got {other:?}"),
    }
}
