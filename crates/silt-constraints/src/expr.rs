//! Expression checking: the `check` / `check_pack` passes, l-values, calls,
//! and function signatures.

use smallvec::SmallVec;

use silt_ast::{Block, Expr, ExprKind, FunctionBody, Stmt, StmtKind, Symbol, UnaryOp};
use silt_common::diagnostics::{SymbolContext, TypeErrorKind};
use silt_common::span::Span;
use silt_common::{ice, Name};
use silt_types::{
    extend_type_pack, first, FunctionArgument, FunctionType, Property, ScopeId, TableIndexer,
    TableState, TableType, Type, TypeId, TypePack, TypePackId,
};

use crate::constraint::ConstraintKind;
use crate::generator::{
    match_assert, match_setmetatable, match_type_guard, ConstraintGenerator, Inference,
    InferencePack,
};
use crate::scope::Binding;

/// The signature half of a function: its type, the scope its generics and
/// parameters live in, and the scope its body will be checked in.
pub(crate) struct FunctionSignature {
    pub signature: TypeId,
    pub signature_scope: ScopeId,
    pub body_scope: ScopeId,
}

impl<'a> ConstraintGenerator<'a> {
    // =========================================================================
    // check: expression → (type, refinement)
    // =========================================================================

    pub(crate) fn check(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        expected: Option<TypeId>,
        force_singleton: bool,
    ) -> Inference {
        let Some(_guard) = self.recursion.enter() else {
            self.report_code_too_complex(expr.span);
            return Inference::new(TypeId::ERROR);
        };

        let result = match &expr.kind {
            ExprKind::Group(inner) => self.check(scope, inner, expected, force_singleton),
            ExprKind::Nil => Inference::new(TypeId::NIL),
            ExprKind::Number(_) => Inference::new(TypeId::NUMBER),
            ExprKind::String(value) => {
                self.check_string(scope, expr.span, value, expected, force_singleton)
            }
            ExprKind::Bool(value) => {
                self.check_bool(scope, expr.span, *value, expected, force_singleton)
            }
            ExprKind::Local { id, .. } => self.check_local(scope, expr, *id),
            ExprKind::Global { name } => self.check_global(scope, expr, name),
            ExprKind::Varargs => {
                let pack = self.check_pack_expr(scope, expr, &[]);
                self.flatten_pack(scope, expr.span, pack)
            }
            ExprKind::Call { .. } => {
                let pack = self.check_pack_expr(scope, expr, &[]);
                self.flatten_pack(scope, expr.span, pack)
            }
            ExprKind::Function(body) => self.check_function_expr(scope, expr, body, expected),
            ExprKind::IndexName { subject, index, .. } => {
                self.check_index_name(scope, expr, subject, index)
            }
            ExprKind::IndexExpr { subject, index } => {
                self.check_index_expr(scope, subject, index)
            }
            ExprKind::Table { .. } => self.check_table(scope, expr, expected),
            ExprKind::Unary { op, operand } => self.check_unary(scope, expr, *op, operand),
            ExprKind::Binary { op, lhs, rhs } => {
                let (lhs_ty, rhs_ty, refinement) =
                    self.check_binary(scope, *op, lhs, rhs, expected);
                let result = self.arena.add(Type::Blocked);
                self.add_constraint(
                    scope,
                    expr.span,
                    ConstraintKind::Binary {
                        op: *op,
                        lhs: lhs_ty,
                        rhs: rhs_ty,
                        result,
                        expr: expr.node_id,
                    },
                );
                Inference::with_refinement(result, refinement)
            }
            ExprKind::IfElse {
                condition,
                then_expr,
                else_expr,
            } => self.check_if_else(scope, condition, then_expr, else_expr, expected),
            ExprKind::TypeAssertion {
                expr: inner,
                annotation,
            } => {
                self.check(scope, inner, None, false);
                let ty = self.resolve_type(scope, annotation, false);
                Inference::new(ty)
            }
            ExprKind::InterpString { expressions, .. } => {
                for expr in expressions {
                    self.check(scope, expr, None, false);
                }
                Inference::new(TypeId::STRING)
            }
            ExprKind::Error { expressions } => {
                for expr in expressions {
                    self.check(scope, expr, None, false);
                }
                Inference::new(TypeId::ERROR)
            }
        };

        self.module.ast_types.insert(expr.node_id, result.ty);
        if let Some(expected) = expected {
            self.module.ast_expected_types.insert(expr.node_id, expected);
        }
        result
    }

    fn check_string(
        &mut self,
        scope: ScopeId,
        span: Span,
        value: &str,
        expected: Option<TypeId>,
        force_singleton: bool,
    ) -> Inference {
        if force_singleton {
            let ty = self.arena.singleton_string(value);
            return Inference::new(ty);
        }

        if let Some(expected) = expected {
            let expected = self.arena.follow(expected);
            if matches!(
                self.arena.get(expected),
                Type::Blocked | Type::PendingExpansion(_)
            ) {
                // The singleton-or-base decision depends on a type the
                // solver has not produced yet; defer it.
                let ty = self.arena.add(Type::Blocked);
                let singleton = self.arena.singleton_string(value);
                self.add_constraint(
                    scope,
                    span,
                    ConstraintKind::PrimitiveType {
                        result: ty,
                        expected,
                        singleton,
                        primitive: TypeId::STRING,
                    },
                );
                return Inference::new(ty);
            } else if self.maybe_singleton(expected) {
                let ty = self.arena.singleton_string(value);
                return Inference::new(ty);
            }
        }

        Inference::new(TypeId::STRING)
    }

    fn check_bool(
        &mut self,
        scope: ScopeId,
        span: Span,
        value: bool,
        expected: Option<TypeId>,
        force_singleton: bool,
    ) -> Inference {
        let singleton = self.arena.singleton_bool(value);
        if force_singleton {
            return Inference::new(singleton);
        }

        if let Some(expected) = expected {
            let expected = self.arena.follow(expected);
            if matches!(
                self.arena.get(expected),
                Type::Blocked | Type::PendingExpansion(_)
            ) {
                let ty = self.arena.add(Type::Blocked);
                self.add_constraint(
                    scope,
                    span,
                    ConstraintKind::PrimitiveType {
                        result: ty,
                        expected,
                        singleton,
                        primitive: TypeId::BOOLEAN,
                    },
                );
                return Inference::new(ty);
            } else if self.maybe_singleton(expected) {
                return Inference::new(singleton);
            }
        }

        Inference::new(TypeId::BOOLEAN)
    }

    /// Is the expected type a singleton, or a union with singleton parts?
    fn maybe_singleton(&self, expected: TypeId) -> bool {
        match self.arena.get(self.arena.follow(expected)) {
            Type::Singleton(_) => true,
            Type::Union(parts) => parts.iter().any(|&part| {
                matches!(self.arena.get(self.arena.follow(part)), Type::Singleton(_))
            }),
            _ => false,
        }
    }

    fn check_local(&mut self, scope: ScopeId, expr: &Expr, id: silt_ast::LocalId) -> Inference {
        let def = self.dfg.get_def(expr.node_id);

        let mut result = def.and_then(|def| self.scopes.lookup_def(scope, def));
        if result.is_none() {
            result = self.scopes.lookup(scope, &Symbol::Local(id));
        }

        let Some(ty) = result else {
            // Locals cannot be used before their definition; recover.
            return Inference::new(TypeId::ERROR);
        };

        match def {
            Some(def) => {
                let refinement = self.refinements.proposition(def, TypeId::TRUTHY);
                Inference::with_refinement(ty, Some(refinement))
            }
            None => Inference::new(ty),
        }
    }

    fn check_global(&mut self, scope: ScopeId, expr: &Expr, name: &Name) -> Inference {
        if let Some(ty) = self.scopes.lookup(scope, &Symbol::Global(name.clone())) {
            return Inference::new(ty);
        }

        // Global functions are prepopulated before traversal, so a global
        // that is not in scope by now is definitely an unknown symbol.
        self.report_error(
            expr.span,
            TypeErrorKind::UnknownSymbol {
                name: name.clone(),
                context: SymbolContext::Binding,
            },
        );
        Inference::new(TypeId::ERROR)
    }

    fn check_index_name(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        subject: &Expr,
        index: &Name,
    ) -> Inference {
        let obj = self.check(scope, subject, None, false).ty;
        let result = self.fresh_type(scope);

        let def = self.dfg.get_def(expr.node_id);
        if let Some(def) = def {
            if let Some(ty) = self.scopes.lookup_def(scope, def) {
                let refinement = self.refinements.proposition(def, TypeId::TRUTHY);
                return Inference::with_refinement(ty, Some(refinement));
            }
            self.scopes
                .get_mut(scope)
                .def_refinements
                .insert(def, result);
        }

        let level = self.scopes.get(scope).level;
        let mut table = TableType::new(TableState::Free, scope, level);
        table.props.insert(index.clone(), Property::new(result));
        let expected_table = self.arena.add(Type::Table(table));

        self.add_constraint(
            scope,
            subject.span,
            ConstraintKind::Subtype {
                sub: obj,
                sup: expected_table,
            },
        );

        match def {
            Some(def) => {
                let refinement = self.refinements.proposition(def, TypeId::TRUTHY);
                Inference::with_refinement(result, Some(refinement))
            }
            None => Inference::new(result),
        }
    }

    fn check_index_expr(&mut self, scope: ScopeId, subject: &Expr, index: &Expr) -> Inference {
        let obj = self.check(scope, subject, None, false).ty;
        let index_ty = self.check(scope, index, None, false).ty;

        let result = self.fresh_type(scope);

        let level = self.scopes.get(scope).level;
        let mut table = TableType::new(TableState::Free, scope, level);
        table.indexer = Some(TableIndexer {
            key: index_ty,
            value: result,
        });
        let expected_table = self.arena.add(Type::Table(table));

        self.add_constraint(
            scope,
            subject.span,
            ConstraintKind::Subtype {
                sub: obj,
                sup: expected_table,
            },
        );

        Inference::new(result)
    }

    fn check_unary(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        op: UnaryOp,
        operand: &Expr,
    ) -> Inference {
        let operand_inference = self.check(scope, operand, None, false);

        let result = self.arena.add(Type::Blocked);
        self.add_constraint(
            scope,
            expr.span,
            ConstraintKind::Unary {
                op,
                operand: operand_inference.ty,
                result,
            },
        );

        if op == UnaryOp::Not {
            let negated = self.refinements.negation(operand_inference.refinement);
            Inference::with_refinement(result, negated)
        } else {
            Inference::new(result)
        }
    }

    pub(crate) fn check_binary(
        &mut self,
        scope: ScopeId,
        op: silt_ast::BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        expected: Option<TypeId>,
    ) -> (TypeId, TypeId, Option<crate::refinements::RefinementId>) {
        use silt_ast::BinaryOp;

        match op {
            BinaryOp::And => {
                let left = self.check(scope, lhs, expected, false);

                let rhs_scope = self.child_scope(rhs.node_id, scope);
                self.apply_refinements(rhs_scope, rhs.span, left.refinement);
                let right = self.check(rhs_scope, rhs, expected, false);

                let refinement = self
                    .refinements
                    .conjunction(left.refinement, right.refinement);
                (left.ty, right.ty, refinement)
            }
            BinaryOp::Or => {
                let left = self.check(scope, lhs, expected, false);

                let rhs_scope = self.child_scope(rhs.node_id, scope);
                let negated = self.refinements.negation(left.refinement);
                self.apply_refinements(rhs_scope, rhs.span, negated);
                let right = self.check(rhs_scope, rhs, expected, false);

                let refinement = self
                    .refinements
                    .disjunction(left.refinement, right.refinement);
                (left.ty, right.ty, refinement)
            }
            _ => {
                if let Some(guard) = match_type_guard(op, lhs, rhs) {
                    let target_node = guard.target.node_id;
                    let is_typeof = guard.is_typeof;
                    let guard_ty = guard.ty.to_string();

                    let left_ty = self.check(scope, lhs, None, false).ty;
                    let right_ty = self.check(scope, rhs, None, false).ty;

                    let Some(def) = self.dfg.get_def(target_node) else {
                        return (left_ty, right_ty, None);
                    };

                    let discriminant = self.type_guard_discriminant(&guard_ty, is_typeof);

                    let proposition = self.refinements.proposition(def, discriminant);
                    let refinement = if op == BinaryOp::CompareEq {
                        Some(proposition)
                    } else {
                        self.refinements.negation(Some(proposition))
                    };
                    return (left_ty, right_ty, refinement);
                }

                if op == BinaryOp::CompareEq || op == BinaryOp::CompareNe {
                    let left_ty = self.check(scope, lhs, expected, true).ty;
                    let right_ty = self.check(scope, rhs, expected, true).ty;

                    let mut left_refinement = self
                        .dfg
                        .get_def(lhs.node_id)
                        .map(|def| self.refinements.proposition(def, right_ty));
                    let mut right_refinement = self
                        .dfg
                        .get_def(rhs.node_id)
                        .map(|def| self.refinements.proposition(def, left_ty));

                    if op == BinaryOp::CompareNe {
                        left_refinement = self.refinements.negation(left_refinement);
                        right_refinement = self.refinements.negation(right_refinement);
                    }

                    let refinement = self
                        .refinements
                        .equivalence(left_refinement, right_refinement);
                    return (left_ty, right_ty, refinement);
                }

                let left_ty = self.check(scope, lhs, expected, false).ty;
                let right_ty = self.check(scope, rhs, expected, false).ty;
                (left_ty, right_ty, None)
            }
        }
    }

    /// The discriminant of a `type`/`typeof` guard: known guard strings map
    /// to their primitive; `typeof` against a declared name narrows to a
    /// root class; everything else narrows to `never`.
    fn type_guard_discriminant(&mut self, guard_ty: &str, is_typeof: bool) -> TypeId {
        match guard_ty {
            "nil" => TypeId::NIL,
            "string" => TypeId::STRING,
            "number" => TypeId::NUMBER,
            "boolean" => TypeId::BOOLEAN,
            "thread" => TypeId::THREAD,
            "table" => TypeId::TABLE,
            "function" => TypeId::FUNCTION,
            // The discriminant for userdata and vectors is downstream
            // semantics; nothing useful can be said here yet.
            "userdata" | "vector" => TypeId::NEVER,
            _ if !is_typeof => TypeId::NEVER,
            name => {
                let global = self.scopes.global();
                let name = Name::new(name);
                let Some(fun) = self.scopes.lookup_type(global, &name) else {
                    return TypeId::NEVER;
                };
                if fun.is_generic() {
                    return TypeId::NEVER;
                }

                let ty = self.arena.follow(fun.ty);
                match self.arena.get(ty) {
                    // Only root classes are usable as typeof discriminants.
                    Type::Class(class) => {
                        let is_root = if self.options.negated_class_types {
                            class.parent == Some(TypeId::CLASS)
                        } else {
                            class.parent.is_none()
                        };
                        if is_root {
                            ty
                        } else {
                            TypeId::NEVER
                        }
                    }
                    _ => ty,
                }
            }
        }
    }

    fn check_if_else(
        &mut self,
        scope: ScopeId,
        condition: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        expected: Option<TypeId>,
    ) -> Inference {
        let cond_scope = self.child_scope(condition.node_id, scope);
        let refinement = self.check(cond_scope, condition, None, false).refinement;

        let then_scope = self.child_scope(then_expr.node_id, scope);
        self.apply_refinements(then_scope, then_expr.span, refinement);
        let then_ty = self.check(then_scope, then_expr, expected, false).ty;

        let else_scope = self.child_scope(else_expr.node_id, scope);
        let negated = self.refinements.negation(refinement);
        self.apply_refinements(else_scope, else_expr.span, negated);
        let else_ty = self.check(else_scope, else_expr, expected, false).ty;

        let ty = match expected {
            Some(expected) => expected,
            None => self.arena.union(vec![then_ty, else_ty]),
        };
        Inference::new(ty)
    }

    fn check_table(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        expected: Option<TypeId>,
    ) -> Inference {
        let ExprKind::Table { items } = &expr.kind else {
            unreachable!();
        };

        let level = self.scopes.get(scope).level;
        let mut props = rustc_hash::FxHashMap::default();
        let mut indexer: Option<TableIndexer> = None;

        let mut annotated_key_type: Option<TypeId> = None;
        let mut annotated_index_result_type: Option<TypeId> = None;
        if let Some(expected) = expected {
            let expected = self.arena.follow(expected);
            if let Type::Table(table) = self.arena.get(expected) {
                if let Some(expected_indexer) = &table.indexer {
                    annotated_key_type = Some(self.arena.follow(expected_indexer.key));
                    annotated_index_result_type = Some(expected_indexer.value);
                }
            }
        }

        let mut is_indexed_result_type = false;
        let mut pinned_index_result_type: Option<TypeId> = None;

        for item in items {
            if item.key.is_none() || (item.key.is_some() && !item.is_record()) {
                is_indexed_result_type = true;
            }

            // Record items pull their expected value type out of the
            // expected table, asking the solver when the property is not
            // immediately there.
            let mut expected_value_type: Option<TypeId> = None;
            if let (Some(key), Some(expected)) = (&item.key, expected) {
                if let ExprKind::String(prop_name) = &key.kind {
                    let prop_name = Name::new(prop_name);
                    let expected = self.arena.follow(expected);
                    let known = match self.arena.get(expected) {
                        Type::Table(table) => {
                            table.props.get(&prop_name).map(|prop| prop.ty)
                        }
                        _ => None,
                    };
                    expected_value_type = match known {
                        Some(ty) => Some(ty),
                        None => {
                            let blocked = self.arena.add(Type::Blocked);
                            self.add_constraint(
                                scope,
                                item.value.span,
                                ConstraintKind::HasProp {
                                    result: blocked,
                                    subject: expected,
                                    prop: prop_name,
                                },
                            );
                            Some(blocked)
                        }
                    };
                }
            }

            // Expected index result type priority: a record property from
            // the expected table, then an annotated indexer, then the first
            // indexed item of this literal.
            let check_expected = expected_value_type
                .or(annotated_index_result_type)
                .or(pinned_index_result_type);

            let item_ty = self.check(scope, &item.value, check_expected, false).ty;

            if is_indexed_result_type && pinned_index_result_type.is_none() {
                pinned_index_result_type = Some(item_ty);
            }

            match &item.key {
                Some(key) => {
                    // The key type is not needed for record items, but
                    // checking it populates the type side table.
                    let key_ty = self.check(scope, key, annotated_key_type, false).ty;

                    if let ExprKind::String(prop_name) = &key.kind {
                        props.insert(Name::new(prop_name), Property::new(item_ty));
                    } else {
                        self.widen_indexer(scope, &mut indexer, key.span, key_ty, item_ty);
                    }
                }
                None => {
                    self.widen_indexer(
                        scope,
                        &mut indexer,
                        item.value.span,
                        TypeId::NUMBER,
                        item_ty,
                    );
                }
            }
        }

        let table = TableType {
            props,
            indexer,
            state: TableState::Unsealed,
            scope,
            level,
        };
        let ty = self.arena.add(Type::Table(table));
        Inference::new(ty)
    }

    /// Synthesize the literal's indexer on first use and constrain later
    /// key/value pairs into it.
    fn widen_indexer(
        &mut self,
        scope: ScopeId,
        indexer: &mut Option<TableIndexer>,
        span: Span,
        key_ty: TypeId,
        value_ty: TypeId,
    ) {
        let indexer = *indexer.get_or_insert_with(|| {
            let key = self.arena.fresh_type(scope);
            let value = self.arena.fresh_type(scope);
            TableIndexer { key, value }
        });

        self.add_constraint(
            scope,
            span,
            ConstraintKind::Subtype {
                sub: indexer.key,
                sup: key_ty,
            },
        );
        self.add_constraint(
            scope,
            span,
            ConstraintKind::Subtype {
                sub: indexer.value,
                sup: value_ty,
            },
        );
    }

    fn check_function_expr(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        body: &FunctionBody,
        expected: Option<TypeId>,
    ) -> Inference {
        let start = self.constraints.checkpoint();
        let sig = self.check_function_signature(scope, body, expected);
        self.check_function_body(sig.body_scope, body);
        let end = self.constraints.checkpoint();

        let generalized = self.arena.add(Type::Blocked);
        self.add_constraint_with_dependencies(
            scope,
            expr.span,
            ConstraintKind::Generalization {
                target: generalized,
                source: sig.signature,
            },
            start,
            end,
        );

        Inference::new(generalized)
    }

    // =========================================================================
    // check_pack: expression(s) → type pack
    // =========================================================================

    pub(crate) fn check_pack(
        &mut self,
        scope: ScopeId,
        exprs: &[Expr],
        expected: &[Option<TypeId>],
    ) -> InferencePack {
        let mut head = Vec::new();
        let mut tail: Option<TypePackId> = None;

        for (i, expr) in exprs.iter().enumerate() {
            if i + 1 < exprs.len() {
                let expected_ty = expected.get(i).copied().flatten();
                head.push(self.check(scope, expr, expected_ty, false).ty);
            } else {
                let expected_tail = if i < expected.len() { &expected[i..] } else { &[] };
                tail = Some(self.check_pack_expr(scope, expr, expected_tail).tp);
            }
        }

        let tp = if head.is_empty() {
            match tail {
                Some(tail) => tail,
                None => self.arena.pack(Vec::new(), None),
            }
        } else {
            self.arena.pack(head, tail)
        };

        InferencePack::new(tp)
    }

    pub(crate) fn check_pack_expr(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        expected: &[Option<TypeId>],
    ) -> InferencePack {
        let Some(_guard) = self.recursion.enter() else {
            self.report_code_too_complex(expr.span);
            return InferencePack::new(TypePackId::ERROR);
        };

        let result = match &expr.kind {
            ExprKind::Call { .. } => self.check_pack_call(scope, expr),
            ExprKind::Varargs => match self.scopes.get(scope).vararg_pack {
                Some(pack) => InferencePack::new(pack),
                None => InferencePack::new(TypePackId::ERROR),
            },
            _ => {
                let expected_ty = expected.first().copied().flatten();
                let ty = self.check(scope, expr, expected_ty, false).ty;
                let tp = self.arena.pack(vec![ty], None);
                InferencePack::new(tp)
            }
        };

        self.module.ast_type_packs.insert(expr.node_id, result.tp);
        result
    }

    fn check_pack_call(&mut self, scope: ScopeId, call: &Expr) -> InferencePack {
        let ExprKind::Call {
            func,
            args,
            self_call,
        } = &call.kind
        else {
            unreachable!();
        };

        // Method calls take the subject as their leading argument.
        let mut expr_args: SmallVec<[&Expr; 8]> = SmallVec::new();
        if *self_call {
            let ExprKind::IndexName { subject, .. } = &func.kind else {
                ice!("method call expression has no subject");
            };
            expr_args.push(subject);
        }
        expr_args.extend(args.iter());

        // One blocked discriminant per argument with a definition; the
        // solver refines those definitions from the call's result.
        let mut return_refinements = Vec::new();
        let mut discriminants = Vec::with_capacity(expr_args.len());
        for arg in &expr_args {
            if let Some(def) = self.dfg.get_def(arg.node_id) {
                let discriminant = self.arena.add(Type::Blocked);
                let refinement = self.refinements.proposition(def, discriminant);
                return_refinements.push(Some(refinement));
                discriminants.push(Some(discriminant));
            } else {
                discriminants.push(None);
            }
        }

        let start_checkpoint = self.constraints.checkpoint();
        let fn_type = self.check(scope, func, None, false).ty;
        let fn_end_checkpoint = self.constraints.checkpoint();

        self.module
            .ast_original_call_types
            .insert(func.node_id, fn_type);

        let expected_arg_pack = self.fresh_pack(scope);
        let expected_ret_pack = self.fresh_pack(scope);
        let expected_function = self.arena.add(Type::Function(FunctionType::new(
            scope,
            expected_arg_pack,
            expected_ret_pack,
        )));

        let instantiated = self.arena.add(Type::Blocked);
        self.add_constraint(
            scope,
            call.span,
            ConstraintKind::Instantiation {
                target: instantiated,
                source: fn_type,
            },
        );

        // Fully solve the callee, then extract its argument list as the
        // expected argument pack.
        let extract_args = self.add_constraint_with_dependencies(
            scope,
            call.span,
            ConstraintKind::Subtype {
                sub: instantiated,
                sup: expected_function,
            },
            start_checkpoint,
            fn_end_checkpoint,
        );

        let need_tail = expr_args
            .last()
            .map(|last| last.is_multi_valued())
            .unwrap_or(false);

        let wanted = if need_tail {
            expr_args.len().saturating_sub(1)
        } else {
            expr_args.len()
        };
        let expected_args = extend_type_pack(&mut self.arena, expected_arg_pack, wanted);

        let mut arg_types = Vec::with_capacity(expr_args.len());
        let mut arg_tail: Option<TypePackId> = None;
        let mut argument_refinements = Vec::new();

        let arg_checkpoint = self.constraints.checkpoint();

        for (i, arg) in expr_args.iter().enumerate() {
            let expected_ty = expected_args.head.get(i).copied();

            if i == 0 && *self_call {
                // The subject type is a side effect of checking the callee;
                // fetch it rather than recomputing.
                match self.module.ast_types.get(&arg.node_id) {
                    Some(self_ty) => arg_types.push(*self_ty),
                    None => {
                        let fresh = self.fresh_type(scope);
                        arg_types.push(fresh);
                    }
                }
            } else if i + 1 < expr_args.len() || !arg.is_multi_valued() {
                let inference = self.check(scope, arg, expected_ty, false);
                arg_types.push(inference.ty);
                argument_refinements.push(inference.refinement);
            } else {
                let pack = self.check_pack_expr(scope, arg, &[]);
                arg_tail = Some(pack.tp);
                argument_refinements.extend(pack.refinements);
            }
        }

        let arg_end_checkpoint = self.constraints.checkpoint();

        // Argument constraints wait until the expected argument types have
        // been extracted from the callee, so e.g. lambda arguments are
        // inferred under the call's expectations.
        let arg_ids: Vec<_> = self
            .constraints
            .range(arg_checkpoint, arg_end_checkpoint)
            .collect();
        for id in arg_ids {
            self.constraints.get_mut(id).dependencies.push(extract_args);
        }

        if match_setmetatable(call) {
            let mut head = arg_types.clone();
            if let Some(tail) = arg_tail {
                if head.len() < 2 {
                    let extended = extend_type_pack(&mut self.arena, tail, 2 - head.len());
                    head.extend(extended.head);
                }
            }
            if head.len() != 2 {
                ice!("setmetatable requires a table and a metatable");
            }
            let (target, metatable) = (head[0], head[1]);

            let result = self.arena.add(Type::Metatable(silt_types::MetatableType {
                table: target,
                metatable,
            }));

            // Rebind the target variable to the metatable-carrying type.
            if let ExprKind::Local { id, .. } = &args[0].kind {
                self.scopes
                    .get_mut(scope)
                    .bindings
                    .insert(Symbol::Local(*id), Binding::new(result, args[0].span));
                if let Some(def) = self.dfg.get_def(args[0].node_id) {
                    self.scopes
                        .get_mut(scope)
                        .def_refinements
                        .insert(def, result);
                }
            }

            let tp = self.arena.pack(vec![result], None);
            let refinement = self.refinements.variadic(return_refinements);
            return InferencePack {
                tp,
                refinements: vec![refinement],
            };
        }

        if match_assert(call) && !argument_refinements.is_empty() {
            // The rest of the enclosing block benefits from the assertion.
            self.apply_refinements(scope, args[0].span, argument_refinements[0]);
        }

        let rets = self.arena.add_pack(TypePack::Blocked);
        let arg_pack = self.arena.pack(arg_types, arg_tail);

        self.add_constraint_with_dependencies(
            scope,
            func.span,
            ConstraintKind::FunctionCall {
                function: fn_type,
                args: arg_pack,
                rets,
                call_node: call.node_id,
                discriminants,
            },
            fn_end_checkpoint,
            arg_end_checkpoint,
        );

        let refinement = self.refinements.variadic(return_refinements);
        InferencePack {
            tp: rets,
            refinements: vec![refinement],
        }
    }

    /// Reduce a pack to its leading type, adding a pack constraint when the
    /// pack's shape is not yet known.
    fn flatten_pack(&mut self, scope: ScopeId, span: Span, pack: InferencePack) -> Inference {
        let refinement = pack.refinements.first().copied().flatten();

        if let Some(ty) = first(&self.arena, pack.tp) {
            return Inference::with_refinement(ty, refinement);
        }

        let result = self.fresh_type(scope);
        let tail = self.fresh_pack(scope);
        let one_pack = self.arena.pack(vec![result], Some(tail));

        self.add_constraint(
            scope,
            span,
            ConstraintKind::PackSubtype {
                sub: pack.tp,
                sup: one_pack,
            },
        );

        Inference::with_refinement(result, refinement)
    }

    // =========================================================================
    // L-values
    // =========================================================================

    pub(crate) fn check_lvalues(&mut self, scope: ScopeId, exprs: &[Expr]) -> TypePackId {
        let mut types = Vec::with_capacity(exprs.len());
        for expr in exprs {
            types.push(self.check_lvalue(scope, expr));
        }
        self.arena.pack(types, None)
    }

    /// Check an assignment target. Property chains rooted at a bound name
    /// update the root binding through `SetProp`; anything else is checked
    /// as an ordinary expression.
    pub(crate) fn check_lvalue(&mut self, scope: ScopeId, expr: &Expr) -> TypeId {
        // Walk down the access chain; bail to ordinary checking as soon as
        // the shape is not a property path over a named root.
        let mut segments: Vec<Name> = Vec::new();
        let mut segment_nodes: Vec<&Expr> = Vec::new();

        let mut current = expr;
        let symbol = loop {
            match &current.kind {
                ExprKind::Global { name } => break Symbol::Global(name.clone()),
                ExprKind::Local { id, .. } => break Symbol::Local(*id),
                ExprKind::IndexName { subject, index, .. } => {
                    segments.push(index.clone());
                    segment_nodes.push(current);
                    current = subject;
                }
                ExprKind::IndexExpr { subject, index } => {
                    let ExprKind::String(key) = &index.kind else {
                        return self.check(scope, expr, None, false).ty;
                    };
                    segments.push(Name::new(key));
                    segment_nodes.push(current);
                    current = subject;
                }
                _ => return self.check(scope, expr, None, false).ty,
            }
        };

        if segments.is_empty() {
            return self.check(scope, expr, None, false).ty;
        }

        segments.reverse();
        segment_nodes.reverse();

        let Some((subject_type, symbol_scope)) = self.scopes.lookup_ex(scope, &symbol) else {
            return self.check(scope, expr, None, false).ty;
        };

        let prop_ty = self.fresh_type(scope);

        let updated_type = self.arena.add(Type::Blocked);
        self.add_constraint(
            scope,
            expr.span,
            ConstraintKind::SetProp {
                result: updated_type,
                subject: subject_type,
                path: segments.clone(),
                prop_type: prop_ty,
            },
        );

        let mut prev_segment_ty = updated_type;
        for (segment, node) in segments.iter().zip(&segment_nodes) {
            let segment_ty = self.arena.add(Type::Blocked);
            self.module.ast_types.insert(node.node_id, segment_ty);
            self.add_constraint(
                scope,
                expr.span,
                ConstraintKind::HasProp {
                    result: segment_ty,
                    subject: prev_segment_ty,
                    prop: segment.clone(),
                },
            );
            prev_segment_ty = segment_ty;
        }

        self.module.ast_types.insert(expr.node_id, prev_segment_ty);
        self.module
            .ast_types
            .insert(current.node_id, updated_type);

        if let Some(binding) = self
            .scopes
            .get_mut(symbol_scope)
            .bindings
            .get_mut(&symbol)
        {
            binding.ty = updated_type;
        }

        let def = match &symbol {
            Symbol::Local(id) => self.dfg.get_local_def(*id),
            Symbol::Global(_) => self.dfg.get_def(current.node_id),
        };
        if let Some(def) = def {
            // This can fail if the user is erroneously trying to augment a
            // builtin table.
            self.scopes
                .get_mut(symbol_scope)
                .def_refinements
                .insert(def, updated_type);
        }

        prop_ty
    }

    // =========================================================================
    // Function signatures and bodies
    // =========================================================================

    pub(crate) fn check_function_signature(
        &mut self,
        parent: ScopeId,
        fn_body: &FunctionBody,
        expected: Option<TypeId>,
    ) -> FunctionSignature {
        let mut expected = expected.map(|ty| self.arena.follow(ty));

        let has_generics = !fn_body.generics.is_empty() || !fn_body.generic_packs.is_empty();

        let signature_scope = self.child_scope(fn_body.node_id, parent);

        // The return pack must exist before the body scope is created so
        // that it propagates there.
        let return_type = self.fresh_pack(signature_scope);
        self.scopes.get_mut(signature_scope).return_type = return_type;

        let body_scope = self.child_scope(fn_body.body.node_id, signature_scope);

        let mut generic_types = Vec::new();
        let mut generic_packs = Vec::new();

        if has_generics {
            // Default values are not supported on function generics, so
            // only the identities matter here.
            for (name, generic) in self.create_generics(signature_scope, &fn_body.generics, false)
            {
                generic_types.push(generic.ty);
                self.scopes
                    .get_mut(signature_scope)
                    .private_type_bindings
                    .insert(name, silt_types::TypeFun::monomorphic(generic.ty));
            }
            for (name, generic) in
                self.create_generic_packs(signature_scope, &fn_body.generic_packs, false)
            {
                generic_packs.push(generic.tp);
                self.scopes
                    .get_mut(signature_scope)
                    .private_type_pack_bindings
                    .insert(name, generic.tp);
            }

            expected = None;
        }

        let expected_function = expected.and_then(|ty| match self.arena.get(ty) {
            Type::Function(function) => Some(function.clone()),
            _ => None,
        });

        let mut expected_args = silt_types::ExtendedTypePack::default();
        if let Some(expected_function) = &expected_function {
            expected_args = extend_type_pack(
                &mut self.arena,
                expected_function.arg_pack,
                fn_body.params.len(),
            );
            generic_types = expected_function.generics.clone();
            generic_packs = expected_function.generic_packs.clone();
        }

        let mut arg_types = Vec::new();
        let mut arg_names = Vec::new();

        if let Some(self_param) = &fn_body.self_param {
            let self_type = self.fresh_type(signature_scope);
            arg_types.push(self_type);
            arg_names.push(Some(FunctionArgument {
                name: self_param.name.clone(),
                span: self_param.span,
            }));
            self.scopes
                .get_mut(signature_scope)
                .bindings
                .insert(Symbol::Local(self_param.id), Binding::new(self_type, self_param.span));
        }

        for (i, param) in fn_body.params.iter().enumerate() {
            let ty = self.fresh_type(signature_scope);
            arg_types.push(ty);
            arg_names.push(Some(FunctionArgument {
                name: param.name.clone(),
                span: param.span,
            }));
            self.scopes
                .get_mut(signature_scope)
                .bindings
                .insert(Symbol::Local(param.id), Binding::new(ty, param.span));

            if let Some(def) = self.dfg.get_local_def(param.id) {
                self.scopes
                    .get_mut(signature_scope)
                    .def_refinements
                    .insert(def, ty);
            }

            if let Some(annotation) = &param.annotation {
                let mut annotation_ty = self.resolve_type(signature_scope, annotation, false);
                // A broken annotation is ignored in favor of inferring a
                // fresh type.
                if matches!(
                    self.arena.get(self.arena.follow(annotation_ty)),
                    Type::Error
                ) {
                    annotation_ty = self.fresh_type(signature_scope);
                }
                self.add_constraint(
                    signature_scope,
                    annotation.span,
                    ConstraintKind::Subtype {
                        sub: ty,
                        sup: annotation_ty,
                    },
                );
            } else if i < expected_args.head.len() {
                self.add_constraint(
                    signature_scope,
                    param.span,
                    ConstraintKind::Subtype {
                        sub: ty,
                        sup: expected_args.head[i],
                    },
                );
            }
        }

        let vararg_pack = match &fn_body.vararg {
            Some(vararg) => {
                let pack = match &vararg.annotation {
                    Some(annotation) => self.resolve_type_pack(signature_scope, annotation, false),
                    None => match expected_args.tail {
                        Some(tail)
                            if matches!(
                                self.arena.get_pack(tail),
                                TypePack::Variadic { .. }
                            ) =>
                        {
                            tail
                        }
                        _ => TypePackId::ANY,
                    },
                };
                self.scopes.get_mut(signature_scope).vararg_pack = Some(pack);
                self.scopes.get_mut(body_scope).vararg_pack = Some(pack);
                pack
            }
            None => {
                // `...` is not in scope without an explicit ellipsis, but
                // the signature still carries a hidden variadic tail.
                self.scopes.get_mut(signature_scope).vararg_pack = None;
                self.scopes.get_mut(body_scope).vararg_pack = None;
                self.arena.add_pack(TypePack::Variadic {
                    ty: TypeId::ANY,
                    hidden: true,
                })
            }
        };

        // If there is both an annotation and an expected type, the
        // annotation wins; checking sorts out discrepancies later.
        if let Some(return_annotation) = &fn_body.return_annotation {
            let annotated = self.resolve_type_pack(signature_scope, return_annotation, false);
            self.arena.bind_pack(return_type, TypePack::Bound(annotated));
        } else if let Some(expected_function) = &expected_function {
            self.arena
                .bind_pack(return_type, TypePack::Bound(expected_function.ret_pack));
        }

        let arg_pack = self.arena.pack(arg_types, Some(vararg_pack));
        let signature = self.arena.add(Type::Function(FunctionType {
            generics: generic_types,
            generic_packs,
            arg_pack,
            ret_pack: return_type,
            arg_names,
            scope: parent,
            has_no_generics: !has_generics,
            has_self: false,
        }));

        self.module.ast_types.insert(fn_body.node_id, signature);

        if let Some(expected) = expected {
            if matches!(self.arena.get(expected), Type::Free { .. }) {
                self.arena.bind(expected, Type::Bound(signature));
            }
        }

        FunctionSignature {
            signature,
            signature_scope,
            body_scope,
        }
    }

    pub(crate) fn check_function_body(&mut self, scope: ScopeId, fn_body: &FunctionBody) {
        self.visit_block_without_child_scope(scope, &fn_body.body);

        // If execution can reach the end of the function, the return type
        // must be compatible with returning nothing.
        if block_falls_through(&fn_body.body) {
            let empty = self.arena.pack(Vec::new(), None);
            let return_type = self.scopes.get(scope).return_type;
            self.add_constraint(
                scope,
                fn_body.span,
                ConstraintKind::PackSubtype {
                    sub: return_type,
                    sup: empty,
                },
            );
        }
    }
}

/// Can control flow reach the end of this block?
fn block_falls_through(block: &Block) -> bool {
    !block.stmts.iter().any(stmt_terminates)
}

fn stmt_terminates(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return { .. } | StmtKind::Break | StmtKind::Continue => true,
        StmtKind::Block(block) => !block_falls_through(block),
        StmtKind::If {
            then_body,
            else_body: Some(else_body),
            ..
        } => !block_falls_through(then_body) && stmt_terminates(else_body),
        _ => false,
    }
}
