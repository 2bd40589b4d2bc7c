//! Programmatic tree construction.
//!
//! `AstBuilder` stamps fresh node and local identities so side tables keyed
//! by them behave exactly as they would for parser output. Nodes built here
//! carry dummy spans unless a span is supplied.

use silt_common::span::Span;
use silt_common::Name;

use crate::ast::*;
use crate::{LocalId, NodeId};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_node: u32,
    next_local: u32,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder::default()
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn local_id(&mut self) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        id
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub fn local(&mut self, name: &str) -> Local {
        Local {
            id: self.local_id(),
            node_id: self.node_id(),
            name: Name::new(name),
            span: Span::dummy(),
            annotation: None,
        }
    }

    pub fn local_with_annotation(&mut self, name: &str, annotation: TypeAnnotation) -> Local {
        Local {
            annotation: Some(annotation),
            ..self.local(name)
        }
    }

    pub fn generic_param(&mut self, name: &str) -> GenericParam {
        GenericParam {
            name: Name::new(name),
            span: Span::dummy(),
            default: None,
        }
    }

    pub fn generic_pack_param(&mut self, name: &str) -> GenericPackParam {
        GenericPackParam {
            name: Name::new(name),
            span: Span::dummy(),
            default: None,
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn expr(&mut self, kind: ExprKind) -> Expr {
        Expr {
            node_id: self.node_id(),
            span: Span::dummy(),
            kind,
        }
    }

    pub fn nil(&mut self) -> Expr {
        self.expr(ExprKind::Nil)
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn number(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Number(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::String(value.to_string()))
    }

    pub fn interp_string(&mut self, strings: Vec<&str>, expressions: Vec<Expr>) -> Expr {
        self.expr(ExprKind::InterpString {
            strings: strings.into_iter().map(str::to_string).collect(),
            expressions,
        })
    }

    pub fn local_ref(&mut self, local: &Local) -> Expr {
        self.expr(ExprKind::Local {
            id: local.id,
            name: local.name.clone(),
        })
    }

    pub fn global(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Global {
            name: Name::new(name),
        })
    }

    pub fn varargs(&mut self) -> Expr {
        self.expr(ExprKind::Varargs)
    }

    pub fn group(&mut self, inner: Expr) -> Expr {
        self.expr(ExprKind::Group(Box::new(inner)))
    }

    pub fn call(&mut self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            func: Box::new(func),
            args,
            self_call: false,
        })
    }

    /// `subject:method(args)` — `func` must be an `IndexName`.
    pub fn self_call(&mut self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            func: Box::new(func),
            args,
            self_call: true,
        })
    }

    pub fn index_name(&mut self, subject: Expr, index: &str) -> Expr {
        self.expr(ExprKind::IndexName {
            subject: Box::new(subject),
            index: Name::new(index),
            index_span: Span::dummy(),
        })
    }

    pub fn index_expr(&mut self, subject: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::IndexExpr {
            subject: Box::new(subject),
            index: Box::new(index),
        })
    }

    pub fn table(&mut self, items: Vec<TableItem>) -> Expr {
        self.expr(ExprKind::Table { items })
    }

    pub fn list_item(&mut self, value: Expr) -> TableItem {
        TableItem { key: None, value }
    }

    pub fn record_item(&mut self, name: &str, value: Expr) -> TableItem {
        let key = self.string(name);
        TableItem {
            key: Some(key),
            value,
        }
    }

    pub fn general_item(&mut self, key: Expr, value: Expr) -> TableItem {
        TableItem {
            key: Some(key),
            value,
        }
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn if_else_expr(&mut self, condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        self.expr(ExprKind::IfElse {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn type_assertion(&mut self, expr: Expr, annotation: TypeAnnotation) -> Expr {
        self.expr(ExprKind::TypeAssertion {
            expr: Box::new(expr),
            annotation,
        })
    }

    pub fn error_expr(&mut self, expressions: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Error { expressions })
    }

    /// A plain function expression: no self, no generics, no vararg.
    pub fn function(&mut self, params: Vec<Local>, body: Block) -> Expr {
        let body = self.function_body(None, params, None, None, body);
        self.expr(ExprKind::Function(Box::new(body)))
    }

    pub fn function_expr(&mut self, body: FunctionBody) -> Expr {
        self.expr(ExprKind::Function(Box::new(body)))
    }

    pub fn function_body(
        &mut self,
        self_param: Option<Local>,
        params: Vec<Local>,
        vararg: Option<Vararg>,
        return_annotation: Option<TypePackAnnotation>,
        body: Block,
    ) -> FunctionBody {
        FunctionBody {
            node_id: self.node_id(),
            span: Span::dummy(),
            self_param,
            params,
            vararg,
            generics: Vec::new(),
            generic_packs: Vec::new(),
            return_annotation,
            body,
        }
    }

    pub fn vararg(&mut self) -> Vararg {
        Vararg {
            span: Span::dummy(),
            annotation: None,
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn stmt(&mut self, kind: StmtKind) -> Stmt {
        Stmt {
            node_id: self.node_id(),
            span: Span::dummy(),
            kind,
        }
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        Block {
            node_id: self.node_id(),
            span: Span::dummy(),
            stmts,
        }
    }

    pub fn block_stmt(&mut self, block: Block) -> Stmt {
        self.stmt(StmtKind::Block(block))
    }

    pub fn if_stmt(&mut self, condition: Expr, then_body: Block, else_body: Option<Stmt>) -> Stmt {
        self.stmt(StmtKind::If {
            condition,
            then_body,
            else_body: else_body.map(Box::new),
            else_span: None,
        })
    }

    pub fn else_block(&mut self, block: Block) -> Stmt {
        self.stmt(StmtKind::Block(block))
    }

    pub fn while_stmt(&mut self, condition: Expr, body: Block) -> Stmt {
        self.stmt(StmtKind::While { condition, body })
    }

    pub fn repeat_stmt(&mut self, body: Block, condition: Expr) -> Stmt {
        self.stmt(StmtKind::Repeat { body, condition })
    }

    pub fn break_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Continue)
    }

    pub fn return_stmt(&mut self, exprs: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Return { exprs })
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn local_stmt(&mut self, vars: Vec<Local>, values: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Local { vars, values })
    }

    pub fn numeric_for(
        &mut self,
        var: Local,
        from: Expr,
        to: Expr,
        step: Option<Expr>,
        body: Block,
    ) -> Stmt {
        self.stmt(StmtKind::NumericFor {
            var,
            from,
            to,
            step,
            body,
        })
    }

    pub fn for_in(&mut self, vars: Vec<Local>, values: Vec<Expr>, body: Block) -> Stmt {
        self.stmt(StmtKind::ForIn { vars, values, body })
    }

    pub fn assign(&mut self, targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Assign { targets, values })
    }

    pub fn compound_assign(&mut self, op: BinaryOp, target: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::CompoundAssign { op, target, value })
    }

    pub fn function_stmt(&mut self, name: Expr, body: FunctionBody) -> Stmt {
        self.stmt(StmtKind::Function { name, body })
    }

    pub fn local_function(&mut self, name: Local, body: FunctionBody) -> Stmt {
        self.stmt(StmtKind::LocalFunction { name, body })
    }

    pub fn type_alias(&mut self, name: &str, ty: TypeAnnotation, exported: bool) -> Stmt {
        self.generic_type_alias(name, Vec::new(), Vec::new(), ty, exported)
    }

    pub fn generic_type_alias(
        &mut self,
        name: &str,
        generics: Vec<GenericParam>,
        generic_packs: Vec<GenericPackParam>,
        ty: TypeAnnotation,
        exported: bool,
    ) -> Stmt {
        self.stmt(StmtKind::TypeAlias {
            name: Name::new(name),
            name_span: Span::dummy(),
            generics,
            generic_packs,
            ty,
            exported,
        })
    }

    pub fn declare_global(&mut self, name: &str, ty: TypeAnnotation) -> Stmt {
        self.stmt(StmtKind::DeclareGlobal {
            name: Name::new(name),
            ty,
        })
    }

    pub fn declare_function(&mut self, decl: DeclareFunction) -> Stmt {
        self.stmt(StmtKind::DeclareFunction(decl))
    }

    pub fn declare_class(&mut self, decl: DeclareClass) -> Stmt {
        self.stmt(StmtKind::DeclareClass(decl))
    }

    pub fn error_stmt(&mut self, statements: Vec<Stmt>, expressions: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Error {
            statements,
            expressions,
        })
    }

    // =========================================================================
    // Type annotations
    // =========================================================================

    pub fn annotation(&mut self, kind: TypeAnnotationKind) -> TypeAnnotation {
        TypeAnnotation {
            node_id: self.node_id(),
            span: Span::dummy(),
            kind,
        }
    }

    pub fn ty_ref(&mut self, name: &str) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Reference {
            prefix: None,
            name: Name::new(name),
            parameters: Vec::new(),
        })
    }

    pub fn ty_ref_prefixed(&mut self, prefix: &str, name: &str) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Reference {
            prefix: Some(Name::new(prefix)),
            name: Name::new(name),
            parameters: Vec::new(),
        })
    }

    pub fn ty_ref_with_params(&mut self, name: &str, parameters: Vec<TypeArg>) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Reference {
            prefix: None,
            name: Name::new(name),
            parameters,
        })
    }

    pub fn ty_table(
        &mut self,
        props: Vec<(&str, TypeAnnotation)>,
        indexer: Option<TableTypeIndexer>,
    ) -> TypeAnnotation {
        let props = props
            .into_iter()
            .map(|(name, ty)| TableTypeProp {
                name: Name::new(name),
                span: Span::dummy(),
                ty,
            })
            .collect();
        self.annotation(TypeAnnotationKind::Table {
            props,
            indexer: indexer.map(Box::new),
        })
    }

    pub fn ty_function(
        &mut self,
        params: TypeListAnnotation,
        return_types: TypeListAnnotation,
    ) -> TypeAnnotation {
        let param_names = vec![None; params.types.len()];
        self.annotation(TypeAnnotationKind::Function {
            generics: Vec::new(),
            generic_packs: Vec::new(),
            params,
            param_names,
            return_types,
        })
    }

    pub fn ty_typeof(&mut self, expr: Expr) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Typeof(Box::new(expr)))
    }

    pub fn ty_union(&mut self, parts: Vec<TypeAnnotation>) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Union(parts))
    }

    pub fn ty_intersection(&mut self, parts: Vec<TypeAnnotation>) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Intersection(parts))
    }

    pub fn ty_singleton_bool(&mut self, value: bool) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::SingletonBool(value))
    }

    pub fn ty_singleton_string(&mut self, value: &str) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::SingletonString(value.to_string()))
    }

    pub fn ty_error(&mut self) -> TypeAnnotation {
        self.annotation(TypeAnnotationKind::Error)
    }

    pub fn type_list(&mut self, types: Vec<TypeAnnotation>) -> TypeListAnnotation {
        TypeListAnnotation { types, tail: None }
    }

    pub fn type_list_with_tail(
        &mut self,
        types: Vec<TypeAnnotation>,
        tail: TypePackAnnotation,
    ) -> TypeListAnnotation {
        TypeListAnnotation {
            types,
            tail: Some(Box::new(tail)),
        }
    }

    pub fn pack_annotation(&mut self, kind: TypePackAnnotationKind) -> TypePackAnnotation {
        TypePackAnnotation {
            node_id: self.node_id(),
            span: Span::dummy(),
            kind,
        }
    }

    pub fn pack_explicit(&mut self, list: TypeListAnnotation) -> TypePackAnnotation {
        self.pack_annotation(TypePackAnnotationKind::Explicit(list))
    }

    pub fn pack_variadic(&mut self, ty: TypeAnnotation) -> TypePackAnnotation {
        self.pack_annotation(TypePackAnnotationKind::Variadic(Box::new(ty)))
    }

    pub fn pack_generic(&mut self, name: &str) -> TypePackAnnotation {
        self.pack_annotation(TypePackAnnotationKind::Generic(Name::new(name)))
    }
}

#[cfg(test)]
#[path = "tests/builder.rs"]
mod tests;
