//! Data-flow definitions.
//!
//! A [`DefId`] is a stable identity for a program point at which a name
//! acquires a value. The constraint generator keys its refinements by
//! `DefId`, so every syntactic form that can be refined (locals, globals,
//! and property chains rooted at them) needs one.
//!
//! The pass here is flow-insensitive: all uses of a local share the def of
//! its declaration, each global name has one def per module, and property
//! accesses get a def chained to their subject's def. That is exactly the
//! granularity the refinement algebra needs; flow-sensitive splitting is a
//! solver-side concern.

use rustc_hash::FxHashMap;
use silt_ast::{
    Block, Expr, ExprKind, FunctionBody, Local, LocalId, NodeId, Stmt, StmtKind, TypeAnnotation,
    TypeAnnotationKind, TypeArg, TypeListAnnotation, TypePackAnnotation, TypePackAnnotationKind,
};
use silt_common::Name;

/// A stable, opaque identity for a definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u32);

/// A definition that names a property of another definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRef {
    pub parent: DefId,
    pub prop_name: Name,
}

/// The payload behind a [`DefId`]. A cell without a field link is a root
/// definition (a local or global); a cell with one is a property chained to
/// its parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub field: Option<FieldRef>,
}

#[derive(Debug, Default)]
struct DefArena {
    cells: Vec<Cell>,
}

impl DefArena {
    fn fresh_cell(&mut self) -> DefId {
        let id = DefId(self.cells.len() as u32);
        self.cells.push(Cell::default());
        id
    }

    fn fresh_field_cell(&mut self, parent: DefId, prop_name: Name) -> DefId {
        let id = DefId(self.cells.len() as u32);
        self.cells.push(Cell {
            field: Some(FieldRef { parent, prop_name }),
        });
        id
    }

    fn cell(&self, def: DefId) -> &Cell {
        &self.cells[def.0 as usize]
    }
}

/// The completed graph: definitions plus the side tables mapping syntax to
/// them.
#[derive(Debug, Default)]
pub struct DataFlowGraph {
    arena: DefArena,
    expr_defs: FxHashMap<NodeId, DefId>,
    local_defs: FxHashMap<LocalId, DefId>,
}

impl DataFlowGraph {
    /// Build the graph for a module's root block.
    pub fn build(block: &Block) -> DataFlowGraph {
        let mut builder = DataFlowGraphBuilder::default();
        builder.visit_block(block);
        builder.graph
    }

    /// The definition attached to an expression node, if any.
    pub fn get_def(&self, node: NodeId) -> Option<DefId> {
        self.expr_defs.get(&node).copied()
    }

    /// The definition of a local declaration.
    pub fn get_local_def(&self, local: LocalId) -> Option<DefId> {
        self.local_defs.get(&local).copied()
    }

    pub fn cell(&self, def: DefId) -> &Cell {
        self.arena.cell(def)
    }
}

#[derive(Debug, Default)]
struct DataFlowGraphBuilder {
    graph: DataFlowGraph,
    globals: FxHashMap<Name, DefId>,
    /// Memoized field cells, so `t.x` always resolves to the same def.
    props: FxHashMap<(DefId, Name), DefId>,
}

impl DataFlowGraphBuilder {
    fn def_local(&mut self, local: &Local) -> DefId {
        let def = self.graph.arena.fresh_cell();
        self.graph.local_defs.insert(local.id, def);
        def
    }

    fn def_global(&mut self, name: &Name) -> DefId {
        if let Some(def) = self.globals.get(name) {
            return *def;
        }
        let def = self.graph.arena.fresh_cell();
        self.globals.insert(name.clone(), def);
        def
    }

    fn def_prop(&mut self, parent: DefId, prop_name: &Name) -> DefId {
        if let Some(def) = self.props.get(&(parent, prop_name.clone())) {
            return *def;
        }
        let def = self
            .graph
            .arena
            .fresh_field_cell(parent, prop_name.clone());
        self.props.insert((parent, prop_name.clone()), def);
        def
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::If {
                condition,
                then_body,
                else_body,
                ..
            } => {
                self.visit_expr(condition);
                self.visit_block(then_body);
                if let Some(else_body) = else_body {
                    self.visit_stmt(else_body);
                }
            }
            StmtKind::While { condition, body } => {
                self.visit_expr(condition);
                self.visit_block(body);
            }
            StmtKind::Repeat { body, condition } => {
                self.visit_block(body);
                self.visit_expr(condition);
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Return { exprs } => {
                for expr in exprs {
                    self.visit_expr(expr);
                }
            }
            StmtKind::Expr(expr) => {
                self.visit_expr(expr);
            }
            StmtKind::Local { vars, values } => {
                for value in values {
                    self.visit_expr(value);
                }
                for var in vars {
                    self.def_local(var);
                    self.visit_annotation_opt(var.annotation.as_ref());
                }
            }
            StmtKind::NumericFor {
                var,
                from,
                to,
                step,
                body,
            } => {
                self.visit_expr(from);
                self.visit_expr(to);
                if let Some(step) = step {
                    self.visit_expr(step);
                }
                self.def_local(var);
                self.visit_block(body);
            }
            StmtKind::ForIn { vars, values, body } => {
                for value in values {
                    self.visit_expr(value);
                }
                for var in vars {
                    self.def_local(var);
                }
                self.visit_block(body);
            }
            StmtKind::Assign { targets, values } => {
                for target in targets {
                    self.visit_expr(target);
                }
                for value in values {
                    self.visit_expr(value);
                }
            }
            StmtKind::CompoundAssign { target, value, .. } => {
                self.visit_expr(target);
                self.visit_expr(value);
            }
            StmtKind::Function { name, body } => {
                self.visit_expr(name);
                self.visit_function_body(body);
            }
            StmtKind::LocalFunction { name, body } => {
                // The function's name is visible inside its own body.
                self.def_local(name);
                self.visit_function_body(body);
            }
            StmtKind::TypeAlias { ty, .. } => self.visit_annotation(ty),
            StmtKind::DeclareGlobal { name, ty } => {
                self.def_global(name);
                self.visit_annotation(ty);
            }
            StmtKind::DeclareFunction(decl) => {
                self.def_global(&decl.name);
                self.visit_type_list(&decl.params);
                self.visit_type_list(&decl.return_types);
            }
            StmtKind::DeclareClass(decl) => {
                for prop in &decl.props {
                    self.visit_annotation(&prop.ty);
                }
            }
            StmtKind::Error {
                statements,
                expressions,
            } => {
                for stmt in statements {
                    self.visit_stmt(stmt);
                }
                for expr in expressions {
                    self.visit_expr(expr);
                }
            }
        }
    }

    fn visit_function_body(&mut self, body: &FunctionBody) {
        if let Some(self_param) = &body.self_param {
            self.def_local(self_param);
        }
        for param in &body.params {
            self.def_local(param);
            self.visit_annotation_opt(param.annotation.as_ref());
        }
        self.visit_block(&body.body);
    }

    /// Visit an expression, returning its definition if it has one.
    fn visit_expr(&mut self, expr: &Expr) -> Option<DefId> {
        let def = match &expr.kind {
            ExprKind::Group(inner) => self.visit_expr(inner),
            ExprKind::Local { id, .. } => self.graph.local_defs.get(id).copied(),
            ExprKind::Global { name } => Some(self.def_global(name)),
            ExprKind::IndexName { subject, index, .. } => {
                let subject_def = self.visit_expr(subject);
                subject_def.map(|parent| self.def_prop(parent, index))
            }
            ExprKind::IndexExpr { subject, index } => {
                let subject_def = self.visit_expr(subject);
                self.visit_expr(index);
                // Only constant string keys name a property.
                if let ExprKind::String(key) = &index.kind {
                    let key = Name::new(key);
                    subject_def.map(|parent| self.def_prop(parent, &key))
                } else {
                    None
                }
            }
            ExprKind::Call {
                func,
                args,
                ..
            } => {
                self.visit_expr(func);
                for arg in args {
                    self.visit_expr(arg);
                }
                None
            }
            ExprKind::Function(body) => {
                self.visit_function_body(body);
                None
            }
            ExprKind::Table { items } => {
                for item in items {
                    if let Some(key) = &item.key {
                        self.visit_expr(key);
                    }
                    self.visit_expr(&item.value);
                }
                None
            }
            ExprKind::Unary { operand, .. } => {
                self.visit_expr(operand);
                None
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
                None
            }
            ExprKind::IfElse {
                condition,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(condition);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
                None
            }
            ExprKind::TypeAssertion { expr: inner, annotation } => {
                let def = self.visit_expr(inner);
                self.visit_annotation(annotation);
                def
            }
            ExprKind::InterpString { expressions, .. } => {
                for expr in expressions {
                    self.visit_expr(expr);
                }
                None
            }
            ExprKind::Error { expressions } => {
                for expr in expressions {
                    self.visit_expr(expr);
                }
                None
            }
            ExprKind::Nil
            | ExprKind::Bool(_)
            | ExprKind::Number(_)
            | ExprKind::String(_)
            | ExprKind::Varargs => None,
        };

        if let Some(def) = def {
            self.graph.expr_defs.insert(expr.node_id, def);
        }
        def
    }

    // Annotations can embed expressions through `typeof`.

    fn visit_annotation_opt(&mut self, annotation: Option<&TypeAnnotation>) {
        if let Some(annotation) = annotation {
            self.visit_annotation(annotation);
        }
    }

    fn visit_annotation(&mut self, annotation: &TypeAnnotation) {
        match &annotation.kind {
            TypeAnnotationKind::Reference { parameters, .. } => {
                for parameter in parameters {
                    match parameter {
                        TypeArg::Type(ty) => self.visit_annotation(ty),
                        TypeArg::Pack(tp) => self.visit_pack_annotation(tp),
                    }
                }
            }
            TypeAnnotationKind::Table { props, indexer } => {
                for prop in props {
                    self.visit_annotation(&prop.ty);
                }
                if let Some(indexer) = indexer {
                    self.visit_annotation(&indexer.key);
                    self.visit_annotation(&indexer.value);
                }
            }
            TypeAnnotationKind::Function {
                params,
                return_types,
                ..
            } => {
                self.visit_type_list(params);
                self.visit_type_list(return_types);
            }
            TypeAnnotationKind::Typeof(expr) => {
                self.visit_expr(expr);
            }
            TypeAnnotationKind::Union(parts) | TypeAnnotationKind::Intersection(parts) => {
                for part in parts {
                    self.visit_annotation(part);
                }
            }
            TypeAnnotationKind::SingletonBool(_)
            | TypeAnnotationKind::SingletonString(_)
            | TypeAnnotationKind::Error => {}
        }
    }

    fn visit_pack_annotation(&mut self, pack: &TypePackAnnotation) {
        match &pack.kind {
            TypePackAnnotationKind::Explicit(list) => self.visit_type_list(list),
            TypePackAnnotationKind::Variadic(ty) => self.visit_annotation(ty),
            TypePackAnnotationKind::Generic(_) => {}
        }
    }

    fn visit_type_list(&mut self, list: &TypeListAnnotation) {
        for ty in &list.types {
            self.visit_annotation(ty);
        }
        if let Some(tail) = &list.tail {
            self.visit_pack_annotation(tail);
        }
    }
}

#[cfg(test)]
#[path = "tests/dfg.rs"]
mod tests;
