//! Node definitions: statements, expressions, and type annotations.

use silt_common::span::Span;
use silt_common::Name;

use crate::{LocalId, NodeId};

// =============================================================================
// Declarations
// =============================================================================

/// A local variable declaration site: a `local` statement variable, a
/// function parameter, `self`, or a loop variable.
#[derive(Clone, Debug)]
pub struct Local {
    pub id: LocalId,
    pub node_id: NodeId,
    pub name: Name,
    pub span: Span,
    pub annotation: Option<TypeAnnotation>,
}

/// A generic type parameter in an alias, function, or declared function.
#[derive(Clone, Debug)]
pub struct GenericParam {
    pub name: Name,
    pub span: Span,
    pub default: Option<TypeAnnotation>,
}

/// A generic type-pack parameter (`T...`).
#[derive(Clone, Debug)]
pub struct GenericPackParam {
    pub name: Name,
    pub span: Span,
    pub default: Option<TypePackAnnotation>,
}

// =============================================================================
// Statements
// =============================================================================

/// A statement list with its own node identity; scopes attach here.
#[derive(Clone, Debug)]
pub struct Block {
    pub node_id: NodeId,
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub node_id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Block(Block),
    If {
        condition: Expr,
        then_body: Block,
        /// `else` block or a nested `If` for `elseif` chains.
        else_body: Option<Box<Stmt>>,
        else_span: Option<Span>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    Repeat {
        body: Block,
        /// Evaluated in the body's scope: bindings introduced by the loop
        /// body are visible to the condition.
        condition: Expr,
    },
    Break,
    Continue,
    Return {
        exprs: Vec<Expr>,
    },
    Expr(Expr),
    Local {
        vars: Vec<Local>,
        values: Vec<Expr>,
    },
    NumericFor {
        var: Local,
        from: Expr,
        to: Expr,
        step: Option<Expr>,
        body: Block,
    },
    ForIn {
        vars: Vec<Local>,
        values: Vec<Expr>,
        body: Block,
    },
    Assign {
        targets: Vec<Expr>,
        values: Vec<Expr>,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Expr,
        value: Expr,
    },
    /// `function name(...) ... end` where `name` is a local, a global, or a
    /// dotted l-value.
    Function {
        name: Expr,
        body: FunctionBody,
    },
    LocalFunction {
        name: Local,
        body: FunctionBody,
    },
    TypeAlias {
        name: Name,
        name_span: Span,
        generics: Vec<GenericParam>,
        generic_packs: Vec<GenericPackParam>,
        ty: TypeAnnotation,
        exported: bool,
    },
    DeclareGlobal {
        name: Name,
        ty: TypeAnnotation,
    },
    DeclareFunction(DeclareFunction),
    DeclareClass(DeclareClass),
    /// Parser error recovery node; contained statements and expressions are
    /// still visited.
    Error {
        statements: Vec<Stmt>,
        expressions: Vec<Expr>,
    },
}

#[derive(Clone, Debug)]
pub struct DeclareFunction {
    pub name: Name,
    pub generics: Vec<GenericParam>,
    pub generic_packs: Vec<GenericPackParam>,
    pub params: TypeListAnnotation,
    pub param_names: Vec<(Name, Span)>,
    pub return_types: TypeListAnnotation,
}

#[derive(Clone, Debug)]
pub struct DeclareClass {
    pub name: Name,
    pub superclass: Option<Name>,
    pub props: Vec<DeclaredClassProp>,
}

#[derive(Clone, Debug)]
pub struct DeclaredClassProp {
    pub name: Name,
    pub ty: TypeAnnotation,
    /// Methods get an implicit `self` parameter prepended to their function
    /// type during analysis.
    pub is_method: bool,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug)]
pub struct Expr {
    pub node_id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Group(Box<Expr>),
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    /// `` `literal {expr} literal` `` — always a string.
    InterpString {
        strings: Vec<String>,
        expressions: Vec<Expr>,
    },
    Local {
        id: LocalId,
        name: Name,
    },
    Global {
        name: Name,
    },
    Varargs,
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        /// `subject:method(...)` sugar; `func` must be an `IndexName` whose
        /// subject becomes the first argument.
        self_call: bool,
    },
    IndexName {
        subject: Box<Expr>,
        index: Name,
        index_span: Span,
    },
    IndexExpr {
        subject: Box<Expr>,
        index: Box<Expr>,
    },
    Function(Box<FunctionBody>),
    Table {
        items: Vec<TableItem>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IfElse {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    TypeAssertion {
        expr: Box<Expr>,
        annotation: TypeAnnotation,
    },
    /// Parser error recovery node.
    Error {
        expressions: Vec<Expr>,
    },
}

/// One entry of a table constructor.
#[derive(Clone, Debug)]
pub struct TableItem {
    /// `None` for positional (list) items; a string constant for record
    /// items; any other expression for general `[k] = v` items.
    pub key: Option<Expr>,
    pub value: Expr,
}

impl TableItem {
    /// A record item has a string-constant key and therefore names a table
    /// property; everything else flows into the indexer.
    pub fn is_record(&self) -> bool {
        matches!(
            &self.key,
            Some(Expr {
                kind: ExprKind::String(_),
                ..
            })
        )
    }
}

/// The body of a function expression or declaration.
#[derive(Clone, Debug)]
pub struct FunctionBody {
    pub node_id: NodeId,
    pub span: Span,
    pub self_param: Option<Local>,
    pub params: Vec<Local>,
    pub vararg: Option<Vararg>,
    pub generics: Vec<GenericParam>,
    pub generic_packs: Vec<GenericPackParam>,
    pub return_annotation: Option<TypePackAnnotation>,
    pub body: Block,
}

#[derive(Clone, Debug)]
pub struct Vararg {
    pub span: Span,
    pub annotation: Option<TypePackAnnotation>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Minus,
    Len,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    CompareNe,
    CompareEq,
    CompareLt,
    CompareLe,
    CompareGt,
    CompareGe,
    And,
    Or,
}

impl Expr {
    /// Function calls and `...` are the only expressions that can produce
    /// more than one value.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::Varargs)
    }
}

// =============================================================================
// Type annotations
// =============================================================================

#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub node_id: NodeId,
    pub span: Span,
    pub kind: TypeAnnotationKind,
}

#[derive(Clone, Debug)]
pub enum TypeAnnotationKind {
    /// `Alias`, `mod.Alias`, or `Alias<params...>`.
    Reference {
        prefix: Option<Name>,
        name: Name,
        parameters: Vec<TypeArg>,
    },
    Table {
        props: Vec<TableTypeProp>,
        indexer: Option<Box<TableTypeIndexer>>,
    },
    Function {
        generics: Vec<GenericParam>,
        generic_packs: Vec<GenericPackParam>,
        params: TypeListAnnotation,
        param_names: Vec<Option<Name>>,
        return_types: TypeListAnnotation,
    },
    Typeof(Box<Expr>),
    Union(Vec<TypeAnnotation>),
    Intersection(Vec<TypeAnnotation>),
    SingletonBool(bool),
    SingletonString(String),
    /// Parser error recovery node.
    Error,
}

/// One argument of a generic type application.
#[derive(Clone, Debug)]
pub enum TypeArg {
    Type(TypeAnnotation),
    Pack(TypePackAnnotation),
}

#[derive(Clone, Debug)]
pub struct TableTypeProp {
    pub name: Name,
    pub span: Span,
    pub ty: TypeAnnotation,
}

#[derive(Clone, Debug)]
pub struct TableTypeIndexer {
    pub key: TypeAnnotation,
    pub value: TypeAnnotation,
}

#[derive(Clone, Debug)]
pub struct TypePackAnnotation {
    pub node_id: NodeId,
    pub span: Span,
    pub kind: TypePackAnnotationKind,
}

#[derive(Clone, Debug)]
pub enum TypePackAnnotationKind {
    Explicit(TypeListAnnotation),
    Variadic(Box<TypeAnnotation>),
    Generic(Name),
}

/// An ordered list of type annotations with an optional pack tail, as used
/// for parameter and return positions.
#[derive(Clone, Debug, Default)]
pub struct TypeListAnnotation {
    pub types: Vec<TypeAnnotation>,
    pub tail: Option<Box<TypePackAnnotation>>,
}
