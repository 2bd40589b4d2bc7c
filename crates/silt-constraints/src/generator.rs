//! The constraint generator: a recursive walk over a module's syntax tree
//! that produces scopes, type terms, refinements, and the ordered
//! constraint list.
//!
//! Two mutually recursive passes drive everything: `check` takes an
//! expression to a type and a refinement, and `check_pack` takes an
//! expression to a type pack. Statement visits produce no result; they
//! mutate scopes and append constraints.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use silt_ast::{
    Block, Expr, ExprKind, GenericPackParam, GenericParam, NodeId, Stmt, StmtKind, Symbol,
};
use silt_common::diagnostics::{TypeError, TypeErrorKind};
use silt_common::options::AnalysisOptions;
use silt_common::recursion::RecursionDepth;
use silt_common::span::Span;
use silt_common::{ice, ModuleName, Name};
use silt_dfg::{DataFlowGraph, DefId};
use silt_types::{
    extend_type_pack, occurs, GenericTypeDefinition, GenericTypePackDefinition, Property,
    ScopeId, TableState, TableType, Type, TypeArena, TypeFun, TypeId, TypePackId,
};

use crate::constraint::{Checkpoint, Constraint, ConstraintId, ConstraintKind, ConstraintList};
use crate::log::GenerationLog;
use crate::module::{Module, ModuleResolver};
use crate::refinements::{Refinement, RefinementArena, RefinementId};
use crate::scope::{Binding, ScopeTree};

/// The result of checking an expression.
#[derive(Clone, Copy, Debug)]
pub struct Inference {
    pub ty: TypeId,
    pub refinement: Option<RefinementId>,
}

impl Inference {
    pub fn new(ty: TypeId) -> Self {
        Inference {
            ty,
            refinement: None,
        }
    }

    pub fn with_refinement(ty: TypeId, refinement: Option<RefinementId>) -> Self {
        Inference { ty, refinement }
    }
}

/// The result of checking an expression in pack position.
#[derive(Clone, Debug)]
pub struct InferencePack {
    pub tp: TypePackId,
    pub refinements: Vec<Option<RefinementId>>,
}

impl InferencePack {
    pub fn new(tp: TypePackId) -> Self {
        InferencePack {
            tp,
            refinements: Vec::new(),
        }
    }
}

/// Everything a generation run produces.
#[derive(Debug)]
pub struct ConstraintGeneration {
    pub module: Module,
    pub arena: TypeArena,
    pub scopes: ScopeTree,
    pub constraints: ConstraintList,
    pub refinements: RefinementArena,
    pub log: Option<GenerationLog>,
}

type RefinementMap = FxHashMap<DefId, TypeId>;

pub struct ConstraintGenerator<'a> {
    pub(crate) module_name: ModuleName,
    pub(crate) module: Module,
    pub(crate) arena: TypeArena,
    pub(crate) scopes: ScopeTree,
    pub(crate) constraints: ConstraintList,
    pub(crate) refinements: RefinementArena,
    pub(crate) dfg: &'a DataFlowGraph,
    pub(crate) resolver: &'a dyn ModuleResolver,
    pub(crate) options: &'a AnalysisOptions,
    pub(crate) recursion: RecursionDepth,
    pub(crate) root_scope: Option<ScopeId>,
    /// The definition scope of each alias statement, installed by the alias
    /// prepass of its enclosing block.
    pub(crate) alias_defining_scopes: FxHashMap<NodeId, ScopeId>,
}

impl<'a> ConstraintGenerator<'a> {
    pub fn new(
        module_name: impl Into<ModuleName>,
        dfg: &'a DataFlowGraph,
        resolver: &'a dyn ModuleResolver,
        options: &'a AnalysisOptions,
    ) -> Self {
        let module_name = module_name.into();
        ConstraintGenerator {
            module: Module::new(module_name.clone()),
            module_name,
            arena: TypeArena::new(),
            scopes: ScopeTree::new(),
            constraints: ConstraintList::new(),
            refinements: RefinementArena::new(),
            dfg,
            resolver,
            options,
            recursion: RecursionDepth::new(options.recursion_limit),
            root_scope: None,
            alias_defining_scopes: FxHashMap::default(),
        }
    }

    // =========================================================================
    // Environment seeding
    // =========================================================================

    /// Bind a global value in the environment scope.
    pub fn add_global(&mut self, name: &str, ty: TypeId) {
        let global = self.scopes.global();
        self.scopes
            .get_mut(global)
            .bindings
            .insert(Symbol::Global(Name::new(name)), Binding::new(ty, Span::dummy()));
    }

    /// Bind a global type name in the environment scope.
    pub fn add_global_type(&mut self, name: &str, fun: TypeFun) {
        let global = self.scopes.global();
        self.scopes
            .get_mut(global)
            .private_type_bindings
            .insert(Name::new(name), fun);
    }

    /// The arena, for callers that need to seed environment types.
    pub fn arena_mut(&mut self) -> &mut TypeArena {
        &mut self.arena
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Analyze a module's root block.
    pub fn generate(&mut self, block: &Block) {
        debug_assert!(self.root_scope.is_none(), "generate runs once per module");
        debug!(module = %self.module_name, "generating constraints");

        let root = self.scopes.child(self.scopes.global());
        self.module.ast_scopes.insert(block.node_id, root);
        self.root_scope = Some(root);
        self.module.root_scope = Some(root);

        let return_type = self.arena.fresh_pack(root);
        self.scopes.get_mut(root).return_type = return_type;

        self.prepopulate_global_scope(block);
        self.visit_block_without_child_scope(root, block);
    }

    /// Freeze the run and hand the artifacts over.
    pub fn finish(self) -> ConstraintGeneration {
        let log = self
            .options
            .log_generation
            .then(|| GenerationLog::capture(&self.module, &self.constraints));

        ConstraintGeneration {
            module: self.module,
            arena: self.arena,
            scopes: self.scopes,
            constraints: self.constraints,
            refinements: self.refinements,
            log,
        }
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(crate) fn fresh_type(&mut self, scope: ScopeId) -> TypeId {
        self.arena.fresh_type(scope)
    }

    pub(crate) fn fresh_pack(&mut self, scope: ScopeId) -> TypePackId {
        self.arena.fresh_pack(scope)
    }

    pub(crate) fn child_scope(&mut self, node: NodeId, parent: ScopeId) -> ScopeId {
        let scope = self.scopes.child(parent);
        self.module.ast_scopes.insert(node, scope);
        scope
    }

    pub(crate) fn add_constraint(
        &mut self,
        scope: ScopeId,
        span: Span,
        kind: ConstraintKind,
    ) -> ConstraintId {
        trace!(kind = kind.name(), ?scope, "constraint");
        self.constraints.push(Constraint {
            scope,
            span,
            kind,
            dependencies: Vec::new(),
        })
    }

    pub(crate) fn report_error(&mut self, span: Span, kind: TypeErrorKind) {
        debug!(module = %self.module_name, %kind, "type error");
        self.module
            .errors
            .push(TypeError::new(span, self.module_name.clone(), kind));
    }

    pub(crate) fn report_code_too_complex(&mut self, span: Span) {
        self.report_error(span, TypeErrorKind::CodeTooComplex);
    }

    // =========================================================================
    // Refinement lowering
    // =========================================================================

    fn union_refinements(
        &mut self,
        lhs: &RefinementMap,
        rhs: &RefinementMap,
        dest: &mut RefinementMap,
    ) {
        for (def, lhs_ty) in lhs {
            let Some(rhs_ty) = rhs.get(def) else {
                continue;
            };

            let mut discriminants = vec![*lhs_ty, *rhs_ty];
            if let Some(prior) = dest.get(def) {
                discriminants.push(*prior);
            }

            let merged = self.arena.union(discriminants);
            dest.insert(*def, merged);
        }
    }

    fn compute_refinement(
        &mut self,
        refinement: Option<RefinementId>,
        refis: &mut RefinementMap,
        sense: bool,
        eq: bool,
        constraints: &mut Vec<ConstraintKind>,
    ) {
        let Some(id) = refinement else {
            return;
        };

        match self.refinements.get(id).clone() {
            Refinement::Variadic(parts) => {
                for part in parts {
                    self.compute_refinement(Some(part), refis, sense, eq, constraints);
                }
            }
            Refinement::Negation(inner) => {
                self.compute_refinement(Some(inner), refis, !sense, eq, constraints)
            }
            Refinement::Conjunction(lhs, rhs) => {
                if sense {
                    self.compute_refinement(Some(lhs), refis, sense, eq, constraints);
                    self.compute_refinement(Some(rhs), refis, sense, eq, constraints);
                } else {
                    // `not (l and r)` refines along both failure paths, so
                    // each definition ends up with the union of the sides.
                    let mut lhs_refis = RefinementMap::default();
                    let mut rhs_refis = RefinementMap::default();
                    self.compute_refinement(Some(lhs), &mut lhs_refis, sense, eq, constraints);
                    self.compute_refinement(Some(rhs), &mut rhs_refis, sense, eq, constraints);
                    self.union_refinements(&lhs_refis, &rhs_refis, refis);
                }
            }
            Refinement::Disjunction(lhs, rhs) => {
                if sense {
                    let mut lhs_refis = RefinementMap::default();
                    let mut rhs_refis = RefinementMap::default();
                    self.compute_refinement(Some(lhs), &mut lhs_refis, sense, eq, constraints);
                    self.compute_refinement(Some(rhs), &mut rhs_refis, sense, eq, constraints);
                    self.union_refinements(&lhs_refis, &rhs_refis, refis);
                } else {
                    self.compute_refinement(Some(lhs), refis, sense, eq, constraints);
                    self.compute_refinement(Some(rhs), refis, sense, eq, constraints);
                }
            }
            Refinement::Equivalence(lhs, rhs) => {
                self.compute_refinement(Some(lhs), refis, sense, true, constraints);
                self.compute_refinement(Some(rhs), refis, sense, true, constraints);
            }
            Refinement::Proposition { def, discriminant } => {
                let mut discriminant_ty = discriminant;
                if !sense && !eq {
                    discriminant_ty = self.arena.negation(discriminant);
                } else if eq {
                    // The discriminant may be a singleton learned from the
                    // other side of an equality; let the solver decide
                    // whether to keep it or widen.
                    let blocked = self.arena.add(Type::Blocked);
                    constraints.push(ConstraintKind::SingletonOrTopType {
                        result: blocked,
                        discriminant,
                        negated: !sense,
                    });
                    discriminant_ty = blocked;
                }

                if let Some(prior) = refis.get(&def) {
                    let merged = self.arena.intersection(vec![discriminant_ty, *prior]);
                    refis.insert(def, merged);
                } else {
                    refis.insert(def, discriminant_ty);
                }
            }
        }
    }

    /// Lift a discriminant along a definition's field path: refining `t.x.y`
    /// wraps the discriminant in sealed single-property tables until the
    /// root definition is reached.
    fn compute_discriminant_path(
        &mut self,
        scope: ScopeId,
        mut def: DefId,
        mut discriminant: TypeId,
    ) -> (DefId, TypeId) {
        let level = self.scopes.get(scope).level;

        while let Some(field) = self.dfg.cell(def).field.clone() {
            let mut table = TableType::new(TableState::Sealed, scope, level);
            table
                .props
                .insert(field.prop_name.clone(), Property::new(discriminant));
            discriminant = self.arena.add(Type::Table(table));
            def = field.parent;
        }

        (def, discriminant)
    }

    /// Install a refinement's consequences into `scope`: each refined
    /// definition's type becomes the intersection of its current type with
    /// the discriminant, and any constraints collected during lowering are
    /// emitted.
    pub(crate) fn apply_refinements(
        &mut self,
        scope: ScopeId,
        span: Span,
        refinement: Option<RefinementId>,
    ) {
        if refinement.is_none() {
            return;
        }

        let mut refis = RefinementMap::default();
        let mut pending = Vec::new();
        self.compute_refinement(refinement, &mut refis, true, false, &mut pending);

        for (def, discriminant) in refis {
            let (root_def, lifted) = self.compute_discriminant_path(scope, def, discriminant);
            let Some(def_ty) = self.scopes.lookup_def(scope, root_def) else {
                ice!("every definition must map to a type");
            };

            let refined = self.arena.intersection(vec![def_ty, lifted]);
            self.scopes
                .get_mut(scope)
                .def_refinements
                .insert(root_def, refined);
        }

        for kind in pending {
            self.add_constraint(scope, span, kind);
        }
    }

    // =========================================================================
    // Global prepopulation
    // =========================================================================

    /// `function g() ... end` at any nesting depth targets a global; bind
    /// every such name to a blocked type before traversal so the later
    /// visit finds it.
    fn prepopulate_global_scope(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.prepopulate_stmt(stmt);
        }
    }

    fn prepopulate_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Function { name, body } => {
                if let ExprKind::Global { name } = &name.kind {
                    let ty = self.arena.add(Type::Blocked);
                    let global = self.scopes.global();
                    self.scopes
                        .get_mut(global)
                        .bindings
                        .insert(Symbol::Global(name.clone()), Binding::new(ty, stmt.span));
                }
                self.prepopulate_global_scope(&body.body);
            }
            StmtKind::LocalFunction { body, .. } => self.prepopulate_global_scope(&body.body),
            StmtKind::Block(block) => self.prepopulate_global_scope(block),
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                self.prepopulate_global_scope(then_body);
                if let Some(else_body) = else_body {
                    self.prepopulate_stmt(else_body);
                }
            }
            StmtKind::While { body, .. }
            | StmtKind::Repeat { body, .. }
            | StmtKind::NumericFor { body, .. }
            | StmtKind::ForIn { body, .. } => self.prepopulate_global_scope(body),
            StmtKind::Error { statements, .. } => {
                for stmt in statements {
                    self.prepopulate_stmt(stmt);
                }
            }
            _ => {}
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub(crate) fn visit_block_without_child_scope(&mut self, scope: ScopeId, block: &Block) {
        let Some(_guard) = self.recursion.enter() else {
            self.report_code_too_complex(block.span);
            return;
        };

        // To enable mutually-recursive type aliases, the type bindings are
        // populated before any of the alias statements are checked.
        let mut alias_definition_locations: FxHashMap<Name, Span> = FxHashMap::default();

        for stmt in &block.stmts {
            let StmtKind::TypeAlias {
                name,
                generics,
                generic_packs,
                exported,
                ..
            } = &stmt.kind
            else {
                continue;
            };

            let already_bound = self.scopes.get(scope).exported_type_bindings.contains_key(name)
                || self.scopes.get(scope).private_type_bindings.contains_key(name);
            if already_bound {
                let first_location = alias_definition_locations
                    .get(name)
                    .copied()
                    .unwrap_or(stmt.span);
                self.report_error(
                    stmt.span,
                    TypeErrorKind::DuplicateTypeDefinition {
                        name: name.clone(),
                        first_location,
                    },
                );
                continue;
            }

            let defn_scope = self.child_scope(stmt.node_id, scope);

            let initial_type = self.arena.add(Type::Blocked);
            let mut initial_fun = TypeFun::monomorphic(initial_type);

            for (name, generic) in self.create_generics(defn_scope, generics, true) {
                self.scopes
                    .get_mut(defn_scope)
                    .private_type_bindings
                    .insert(name, TypeFun::monomorphic(generic.ty));
                initial_fun.type_params.push(generic);
            }

            for (name, generic) in self.create_generic_packs(defn_scope, generic_packs, true) {
                self.scopes
                    .get_mut(defn_scope)
                    .private_type_pack_bindings
                    .insert(name, generic.tp);
                initial_fun.type_pack_params.push(generic);
            }

            let bindings = if *exported {
                &mut self.scopes.get_mut(scope).exported_type_bindings
            } else {
                &mut self.scopes.get_mut(scope).private_type_bindings
            };
            bindings.insert(name.clone(), initial_fun);

            self.alias_defining_scopes.insert(stmt.node_id, defn_scope);
            alias_definition_locations.insert(name.clone(), stmt.span);
        }

        for stmt in &block.stmts {
            self.visit_stmt(scope, stmt);
        }
    }

    pub(crate) fn visit_stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        let Some(_guard) = self.recursion.enter() else {
            self.report_code_too_complex(stmt.span);
            return;
        };

        match &stmt.kind {
            StmtKind::Block(block) => {
                let inner = self.child_scope(block.node_id, scope);
                self.visit_block_without_child_scope(inner, block);
            }
            StmtKind::If { .. } => self.visit_if(scope, stmt),
            StmtKind::While { condition, body } => {
                self.check(scope, condition, None, false);
                let while_scope = self.child_scope(stmt.node_id, scope);
                self.visit_block_without_child_scope(while_scope, body);
            }
            StmtKind::Repeat { body, condition } => {
                let repeat_scope = self.child_scope(stmt.node_id, scope);
                self.visit_block_without_child_scope(repeat_scope, body);
                // The condition has access to bindings from within the body.
                self.check(repeat_scope, condition, None, false);
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Return { exprs } => self.visit_return(scope, stmt, exprs),
            StmtKind::Expr(expr) => {
                self.check_pack_expr(scope, expr, &[]);
            }
            StmtKind::Local { vars, values } => self.visit_local(scope, stmt, vars, values),
            StmtKind::NumericFor { .. } => self.visit_numeric_for(scope, stmt),
            StmtKind::ForIn { .. } => self.visit_for_in(scope, stmt),
            StmtKind::Assign { targets, values } => {
                self.visit_assign(scope, stmt, targets, values)
            }
            StmtKind::CompoundAssign { op, target, value } => {
                self.visit_compound_assign(scope, stmt, *op, target, value)
            }
            StmtKind::Function { name, body } => self.visit_function_stmt(scope, name, body),
            StmtKind::LocalFunction { name, body } => {
                self.visit_local_function(scope, name, body)
            }
            StmtKind::TypeAlias { .. } => self.visit_type_alias(scope, stmt),
            StmtKind::DeclareGlobal { name, ty } => {
                let global_ty = self.resolve_type(scope, ty, false);
                self.module
                    .declared_globals
                    .insert(name.clone(), global_ty);
                self.scopes
                    .get_mut(scope)
                    .bindings
                    .insert(Symbol::Global(name.clone()), Binding::new(global_ty, stmt.span));
            }
            StmtKind::DeclareFunction(decl) => self.visit_declare_function(scope, stmt, decl),
            StmtKind::DeclareClass(decl) => self.visit_declare_class(scope, stmt, decl),
            StmtKind::Error {
                statements,
                expressions,
            } => {
                for stmt in statements {
                    self.visit_stmt(scope, stmt);
                }
                for expr in expressions {
                    self.check(scope, expr, None, false);
                }
            }
        }
    }

    fn visit_if(&mut self, scope: ScopeId, stmt: &Stmt) {
        let StmtKind::If {
            condition,
            then_body,
            else_body,
            else_span,
        } = &stmt.kind
        else {
            unreachable!();
        };

        let cond_scope = self.child_scope(condition.node_id, scope);
        let refinement = self.check(cond_scope, condition, None, false).refinement;

        let then_scope = self.child_scope(then_body.node_id, scope);
        self.apply_refinements(then_scope, condition.span, refinement);
        self.visit_block_without_child_scope(then_scope, then_body);

        if let Some(else_body) = else_body {
            let else_scope = self.child_scope(else_body.node_id, scope);
            let negated = self.refinements.negation(refinement);
            self.apply_refinements(else_scope, else_span.unwrap_or(condition.span), negated);
            // An `elseif` chain arrives as a nested `If`; a plain `else` is
            // a block, which must not open yet another scope.
            if let StmtKind::Block(block) = &else_body.kind {
                self.visit_block_without_child_scope(else_scope, block);
            } else {
                self.visit_stmt(else_scope, else_body);
            }
        }
    }

    fn visit_return(&mut self, scope: ScopeId, stmt: &Stmt, exprs: &[Expr]) {
        // The only way the return pack has anything interesting in it is an
        // explicit return annotation on the enclosing function; expected
        // types flow from there.
        let return_type = self.scopes.get(scope).return_type;
        let expected: Vec<Option<TypeId>> = self
            .pack_head(return_type)
            .into_iter()
            .map(Some)
            .collect();

        let expr_pack = self.check_pack(scope, exprs, &expected).tp;
        self.add_constraint(
            scope,
            stmt.span,
            ConstraintKind::PackSubtype {
                sub: expr_pack,
                sup: return_type,
            },
        );
    }

    /// The concrete head types of a pack, walking chained heads.
    fn pack_head(&self, pack: TypePackId) -> Vec<TypeId> {
        let mut head = Vec::new();
        let mut current = self.arena.follow_pack(pack);
        loop {
            match self.arena.get_pack(current) {
                silt_types::TypePack::Pack { head: h, tail } => {
                    head.extend(h.iter().copied());
                    match tail {
                        Some(tail) => current = self.arena.follow_pack(*tail),
                        None => break,
                    }
                }
                _ => break,
            }
        }
        head
    }

    fn visit_local(
        &mut self,
        scope: ScopeId,
        stmt: &Stmt,
        vars: &[silt_ast::Local],
        values: &[Expr],
    ) {
        let mut var_types: Vec<Option<TypeId>> = Vec::with_capacity(vars.len());
        for var in vars {
            let ty = var
                .annotation
                .as_ref()
                .map(|annotation| self.resolve_type(scope, annotation, false));
            var_types.push(ty);
        }

        // Names the first value type even when it is not placed in
        // `var_types`, for synthetic name attribution.
        let mut first_value_type: Option<TypeId> = None;

        for (i, value) in values.iter().enumerate() {
            let has_annotation = i < vars.len() && vars[i].annotation.is_some();

            if matches!(value.kind, ExprKind::Nil) {
                // Leave nil-initialized slots floating under the assumption
                // that they will later be populated.
                if i < var_types.len() && var_types[i].is_none() {
                    var_types[i] = Some(self.fresh_type(scope));
                }
            } else if i != values.len() - 1 || !value.is_multi_valued() {
                let expected = if has_annotation { var_types[i] } else { None };
                let expr_type = self.check(scope, value, expected, false).ty;

                if i < var_types.len() {
                    if let Some(annotated) = var_types[i] {
                        self.add_constraint(
                            scope,
                            stmt.span,
                            ConstraintKind::Subtype {
                                sub: expr_type,
                                sup: annotated,
                            },
                        );
                    } else {
                        var_types[i] = Some(expr_type);
                    }
                }

                if i == 0 {
                    first_value_type = Some(expr_type);
                }
            } else {
                let expected: Vec<Option<TypeId>> = if has_annotation {
                    var_types[i..].to_vec()
                } else {
                    Vec::new()
                };

                let expr_pack = self.check_pack_expr(scope, value, &expected).tp;

                if i < vars.len() {
                    let extended = extend_type_pack(&mut self.arena, expr_pack, vars.len() - i);

                    // Fill missing slots with values from the pack.
                    for j in i..vars.len() {
                        if var_types[j].is_none() {
                            var_types[j] = Some(if j - i < extended.head.len() {
                                extended.head[j - i]
                            } else {
                                self.fresh_type(scope)
                            });
                        }
                    }

                    let tail_values: Vec<TypeId> =
                        var_types[i..].iter().map(|ty| ty.unwrap()).collect();
                    let tail_pack = self.arena.pack(tail_values, None);
                    self.add_constraint(
                        scope,
                        stmt.span,
                        ConstraintKind::PackSubtype {
                            sub: expr_pack,
                            sup: tail_pack,
                        },
                    );
                }
            }
        }

        if vars.len() == 1 && values.len() == 1 {
            if let Some(first_value_type) = first_value_type {
                let value = &values[0];
                let named = match &value.kind {
                    ExprKind::Table { .. } => true,
                    ExprKind::Call { func, .. } => {
                        matches!(&func.kind, ExprKind::Global { name } if name == "setmetatable")
                    }
                    _ => false,
                };
                if named {
                    self.add_constraint(
                        scope,
                        value.span,
                        ConstraintKind::Name {
                            target: first_value_type,
                            name: vars[0].name.clone(),
                            synthetic: true,
                            type_params: Vec::new(),
                            type_pack_params: Vec::new(),
                        },
                    );
                }
            }
        }

        for (i, var) in vars.iter().enumerate() {
            let ty = match var_types[i] {
                Some(ty) => ty,
                None => self.fresh_type(scope),
            };

            self.scopes
                .get_mut(scope)
                .bindings
                .insert(Symbol::Local(var.id), Binding::new(ty, var.span));

            if let Some(def) = self.dfg.get_local_def(var.id) {
                self.scopes
                    .get_mut(scope)
                    .def_refinements
                    .insert(def, ty);
            }
        }

        // To handle `require` correctly, exported type bindings of the
        // imported module are copied under the local's name.
        for (var, value) in vars.iter().zip(values) {
            let ExprKind::Call { .. } = &value.kind else {
                continue;
            };
            let Some(require_arg) = match_require(value) else {
                continue;
            };
            let Some(info) = self
                .resolver
                .resolve_module_info(&self.module_name, require_arg)
            else {
                continue;
            };
            let Some(exports) = self.resolver.get_module(&info.name) else {
                continue;
            };

            let bindings = exports.exported_type_bindings.clone();
            let scope_data = self.scopes.get_mut(scope);
            scope_data
                .imported_type_bindings
                .insert(var.name.clone(), bindings);
            if self.options.record_imported_modules {
                scope_data
                    .imported_modules
                    .insert(var.name.clone(), info.name.clone());
            }
        }
    }

    fn visit_numeric_for(&mut self, scope: ScopeId, stmt: &Stmt) {
        let StmtKind::NumericFor {
            var,
            from,
            to,
            step,
            body,
        } = &stmt.kind
        else {
            unreachable!();
        };

        if let Some(annotation) = &var.annotation {
            self.resolve_type(scope, annotation, false);
        }

        for bound in [Some(from), Some(to), step.as_ref()].into_iter().flatten() {
            let ty = self.check(scope, bound, None, false).ty;
            self.add_constraint(
                scope,
                bound.span,
                ConstraintKind::Subtype {
                    sub: ty,
                    sup: TypeId::NUMBER,
                },
            );
        }

        let for_scope = self.child_scope(stmt.node_id, scope);
        self.scopes
            .get_mut(for_scope)
            .bindings
            .insert(Symbol::Local(var.id), Binding::new(TypeId::NUMBER, var.span));
        if let Some(def) = self.dfg.get_local_def(var.id) {
            self.scopes
                .get_mut(for_scope)
                .def_refinements
                .insert(def, TypeId::NUMBER);
        }

        self.visit_block_without_child_scope(for_scope, body);
    }

    fn visit_for_in(&mut self, scope: ScopeId, stmt: &Stmt) {
        let StmtKind::ForIn { vars, values, body } = &stmt.kind else {
            unreachable!();
        };

        let loop_scope = self.child_scope(stmt.node_id, scope);

        let iterator = self.check_pack(scope, values, &[]).tp;

        let mut variable_types = Vec::with_capacity(vars.len());
        for var in vars {
            let ty = self.fresh_type(loop_scope);
            self.scopes
                .get_mut(loop_scope)
                .bindings
                .insert(Symbol::Local(var.id), Binding::new(ty, var.span));
            variable_types.push(ty);

            if let Some(def) = self.dfg.get_local_def(var.id) {
                self.scopes
                    .get_mut(loop_scope)
                    .def_refinements
                    .insert(def, ty);
            }
        }

        // It is always ok to provide too few variables, so the variable
        // pack gets a free tail.
        let free_tail = self.fresh_pack(loop_scope);
        let variable_pack = self.arena.pack(variable_types, Some(free_tail));

        let span = values
            .first()
            .map(|first| first.span.merge(values[values.len() - 1].span))
            .unwrap_or(stmt.span);
        self.add_constraint(
            loop_scope,
            span,
            ConstraintKind::Iterable {
                iterator,
                variables: variable_pack,
            },
        );

        self.visit_block_without_child_scope(loop_scope, body);
    }

    fn visit_assign(&mut self, scope: ScopeId, stmt: &Stmt, targets: &[Expr], values: &[Expr]) {
        let lvalue_pack = self.check_lvalues(scope, targets);

        let expected_pack = extend_type_pack(&mut self.arena, lvalue_pack, values.len());

        let mut expected_types = Vec::with_capacity(expected_pack.head.len());
        for ty in expected_pack.head {
            let ty = self.arena.follow(ty);
            if matches!(self.arena.get(ty), Type::Free { .. }) {
                expected_types.push(None);
            } else {
                expected_types.push(Some(ty));
            }
        }

        let value_pack = self.check_pack(scope, values, &expected_types).tp;

        self.add_constraint(
            scope,
            stmt.span,
            ConstraintKind::PackSubtype {
                sub: value_pack,
                sup: lvalue_pack,
            },
        );
    }

    fn visit_compound_assign(
        &mut self,
        scope: ScopeId,
        stmt: &Stmt,
        op: silt_ast::BinaryOp,
        target: &Expr,
        value: &Expr,
    ) {
        let var_ty = self.check_lvalue(scope, target);
        let value_ty = self.check(scope, value, None, false).ty;

        let result = self.arena.add(Type::Blocked);
        self.add_constraint(
            scope,
            stmt.span,
            ConstraintKind::Binary {
                op,
                lhs: var_ty,
                rhs: value_ty,
                result,
                expr: stmt.node_id,
            },
        );
        self.add_constraint(
            scope,
            stmt.span,
            ConstraintKind::Subtype {
                sub: result,
                sup: var_ty,
            },
        );
    }

    fn visit_local_function(
        &mut self,
        scope: ScopeId,
        name: &silt_ast::Local,
        body: &silt_ast::FunctionBody,
    ) {
        // The parser ensures every local function has a distinct identity
        // for its name, so this never shadows an existing binding.
        let function_type = self.arena.add(Type::Blocked);
        self.scopes
            .get_mut(scope)
            .bindings
            .insert(Symbol::Local(name.id), Binding::new(function_type, name.span));

        let sig = self.check_function_signature(scope, body, None);
        self.scopes
            .get_mut(sig.body_scope)
            .bindings
            .insert(Symbol::Local(name.id), Binding::new(sig.signature, body.span));

        let start = self.constraints.checkpoint();
        self.check_function_body(sig.body_scope, body);
        let end = self.constraints.checkpoint();

        self.add_constraint_with_dependencies(
            sig.signature_scope,
            name.span,
            ConstraintKind::Generalization {
                target: function_type,
                source: sig.signature,
            },
            start,
            end,
        );
    }

    fn visit_function_stmt(&mut self, scope: ScopeId, name: &Expr, body: &silt_ast::FunctionBody) {
        let mut generalized = self.arena.add(Type::Blocked);

        let start = self.constraints.checkpoint();
        let sig = self.check_function_signature(scope, body, None);

        match &name.kind {
            ExprKind::Local { id, .. } => {
                let symbol = Symbol::Local(*id);
                if let Some((existing, binding_scope)) = self.scopes.lookup_ex(scope, &symbol) {
                    self.add_constraint(
                        scope,
                        name.span,
                        ConstraintKind::Subtype {
                            sub: generalized,
                            sup: existing,
                        },
                    );

                    if let Some(binding) =
                        self.scopes.get_mut(binding_scope).bindings.get_mut(&symbol)
                    {
                        binding.ty = generalized;
                    }
                    if let Some(def) = self.dfg.get_local_def(*id) {
                        self.scopes
                            .get_mut(scope)
                            .def_refinements
                            .insert(def, generalized);
                    }
                } else {
                    self.scopes
                        .get_mut(scope)
                        .bindings
                        .insert(symbol.clone(), Binding::new(generalized, name.span));
                }

                self.scopes
                    .get_mut(sig.body_scope)
                    .bindings
                    .insert(symbol, Binding::new(sig.signature, name.span));
            }
            ExprKind::Global { name: global_name } => {
                let symbol = Symbol::Global(global_name.clone());
                let Some(existing) = self.scopes.lookup(scope, &symbol) else {
                    ice!("global scope was not prepopulated with a binding for '{global_name}'");
                };
                generalized = existing;

                self.scopes
                    .get_mut(sig.body_scope)
                    .bindings
                    .insert(symbol, Binding::new(sig.signature, name.span));
            }
            ExprKind::IndexName { .. } => {
                let lvalue_ty = self.check_lvalue(scope, name);
                self.add_constraint(
                    scope,
                    name.span,
                    ConstraintKind::Subtype {
                        sub: lvalue_ty,
                        sup: generalized,
                    },
                );
            }
            ExprKind::Error { .. } => generalized = TypeId::ERROR,
            _ => {}
        }

        self.check_function_body(sig.body_scope, body);
        let end = self.constraints.checkpoint();

        self.add_constraint_with_dependencies(
            sig.signature_scope,
            name.span,
            ConstraintKind::Generalization {
                target: generalized,
                source: sig.signature,
            },
            start,
            end,
        );
    }

    /// Push a constraint whose dependencies are everything emitted in
    /// `[start, end)`.
    pub(crate) fn add_constraint_with_dependencies(
        &mut self,
        scope: ScopeId,
        span: Span,
        kind: ConstraintKind,
        start: Checkpoint,
        end: Checkpoint,
    ) -> ConstraintId {
        let dependencies: Vec<ConstraintId> = self.constraints.range(start, end).collect();
        trace!(kind = kind.name(), deps = dependencies.len(), "constraint");
        self.constraints.push(Constraint {
            scope,
            span,
            kind,
            dependencies,
        })
    }

    fn visit_type_alias(&mut self, scope: ScopeId, stmt: &Stmt) {
        let StmtKind::TypeAlias {
            name,
            name_span,
            generics,
            generic_packs,
            ty,
            exported,
        } = &stmt.kind
        else {
            unreachable!();
        };

        // Undefined for duplicate definitions, which are skipped entirely.
        let Some(defn_scope) = self.alias_defining_scopes.get(&stmt.node_id).copied() else {
            return;
        };

        let bindings = if *exported {
            &self.scopes.get(scope).exported_type_bindings
        } else {
            &self.scopes.get(scope).private_type_bindings
        };
        let Some(fun) = bindings.get(name) else {
            return;
        };
        let alias_ty = fun.ty;
        debug_assert!(matches!(self.arena.get(alias_ty), Type::Blocked));

        let resolved = self.resolve_type(defn_scope, ty, false);

        if occurs(&self.arena, alias_ty, resolved) {
            self.arena.bind(alias_ty, Type::Bound(TypeId::ANY));
            self.report_error(*name_span, TypeErrorKind::OccursCheckFailed);
        } else {
            self.arena.bind(alias_ty, Type::Bound(resolved));
        }

        let type_params: Vec<TypeId> = self
            .create_generics(defn_scope, generics, true)
            .into_iter()
            .map(|(_, generic)| generic.ty)
            .collect();
        let type_pack_params: Vec<TypePackId> = self
            .create_generic_packs(defn_scope, generic_packs, true)
            .into_iter()
            .map(|(_, generic)| generic.tp)
            .collect();

        self.add_constraint(
            scope,
            ty.span,
            ConstraintKind::Name {
                target: resolved,
                name: name.clone(),
                synthetic: false,
                type_params,
                type_pack_params,
            },
        );
    }

    // =========================================================================
    // Generics
    // =========================================================================

    /// Allocate a generic type per parameter. With `use_cache`, identities
    /// are shared through the parent scope's alias-parameter cache so that
    /// mutually-recursive alias declarations agree on them.
    pub(crate) fn create_generics(
        &mut self,
        scope: ScopeId,
        generics: &[GenericParam],
        use_cache: bool,
    ) -> Vec<(Name, GenericTypeDefinition)> {
        let parent = self.scopes.get(scope).parent;
        let mut result = Vec::with_capacity(generics.len());

        for generic in generics {
            let cached = parent.and_then(|parent| {
                self.scopes
                    .get(parent)
                    .type_alias_type_parameters
                    .get(&generic.name)
                    .copied()
            });

            let generic_ty = match cached {
                Some(cached) if use_cache => cached,
                _ => {
                    let ty = self.arena.add(Type::Generic {
                        scope,
                        name: generic.name.clone(),
                    });
                    if let Some(parent) = parent {
                        self.scopes
                            .get_mut(parent)
                            .type_alias_type_parameters
                            .insert(generic.name.clone(), ty);
                    }
                    ty
                }
            };

            let default = generic
                .default
                .as_ref()
                .map(|default| self.resolve_type(scope, default, false));

            result.push((
                generic.name.clone(),
                GenericTypeDefinition {
                    ty: generic_ty,
                    default,
                },
            ));
        }

        result
    }

    pub(crate) fn create_generic_packs(
        &mut self,
        scope: ScopeId,
        generics: &[GenericPackParam],
        use_cache: bool,
    ) -> Vec<(Name, GenericTypePackDefinition)> {
        let parent = self.scopes.get(scope).parent;
        let mut result = Vec::with_capacity(generics.len());

        for generic in generics {
            let cached = parent.and_then(|parent| {
                self.scopes
                    .get(parent)
                    .type_alias_type_pack_parameters
                    .get(&generic.name)
                    .copied()
            });

            let generic_tp = match cached {
                Some(cached) if use_cache => cached,
                _ => {
                    let tp = self.arena.add_pack(silt_types::TypePack::Generic {
                        scope,
                        name: generic.name.clone(),
                    });
                    if let Some(parent) = parent {
                        self.scopes
                            .get_mut(parent)
                            .type_alias_type_pack_parameters
                            .insert(generic.name.clone(), tp);
                    }
                    tp
                }
            };

            let default = generic
                .default
                .as_ref()
                .map(|default| self.resolve_type_pack(scope, default, false));

            result.push((
                generic.name.clone(),
                GenericTypePackDefinition {
                    tp: generic_tp,
                    default,
                },
            ));
        }

        result
    }
}

// =============================================================================
// Built-in call matching
// =============================================================================

/// A call to the global `require` with exactly one argument yields that
/// argument.
pub(crate) fn match_require(call: &Expr) -> Option<&Expr> {
    let ExprKind::Call { func, args, .. } = &call.kind else {
        return None;
    };
    let ExprKind::Global { name } = &func.kind else {
        return None;
    };
    if name != "require" || args.len() != 1 {
        return None;
    }
    Some(&args[0])
}

pub(crate) fn match_setmetatable(call: &Expr) -> bool {
    let ExprKind::Call { func, args, .. } = &call.kind else {
        return false;
    };
    matches!(&func.kind, ExprKind::Global { name } if name == "setmetatable") && args.len() == 2
}

pub(crate) fn match_assert(call: &Expr) -> bool {
    let ExprKind::Call { func, args, .. } = &call.kind else {
        return false;
    };
    matches!(&func.kind, ExprKind::Global { name } if name == "assert") && !args.is_empty()
}

/// `type(x) == "T"` / `typeof(x) == "T"`, in either operand order.
pub(crate) struct TypeGuard<'e> {
    pub is_typeof: bool,
    pub target: &'e Expr,
    pub ty: &'e str,
}

pub(crate) fn match_type_guard<'e>(
    op: silt_ast::BinaryOp,
    lhs: &'e Expr,
    rhs: &'e Expr,
) -> Option<TypeGuard<'e>> {
    use silt_ast::BinaryOp;

    if op != BinaryOp::CompareEq && op != BinaryOp::CompareNe {
        return None;
    }

    let (call, string) = if matches!(rhs.kind, ExprKind::Call { .. }) {
        (rhs, lhs)
    } else {
        (lhs, rhs)
    };

    let ExprKind::String(ty) = &string.kind else {
        return None;
    };
    let ExprKind::Call { func, args, .. } = &call.kind else {
        return None;
    };
    let ExprKind::Global { name } = &func.kind else {
        return None;
    };
    if name != "type" && name != "typeof" {
        return None;
    }
    if args.len() != 1 {
        return None;
    }

    Some(TypeGuard {
        is_typeof: name == "typeof",
        target: &args[0],
        ty,
    })
}
