//! Diagnostic value types for the analysis passes.
//!
//! User-visible failures are plain values accumulated on the module being
//! analyzed; the passes recover locally and keep going. Only internal
//! invariant violations trap (see the `ice!` macro).

use serde::Serialize;

use crate::span::Span;
use crate::{ModuleName, Name};

/// Whether an unknown name was used where a value binding or a type was
/// expected. Changes the wording of the diagnostic, nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SymbolContext {
    Binding,
    Type,
}

/// The kinds of error the constraint generator can report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TypeErrorKind {
    /// A type alias name was declared twice in the same scope.
    DuplicateTypeDefinition { name: Name, first_location: Span },
    /// A name was referenced that no enclosing scope binds.
    UnknownSymbol { name: Name, context: SymbolContext },
    /// A type alias directly contains itself through unions, intersections,
    /// or bound links.
    OccursCheckFailed,
    /// Traversal depth exceeded the configured recursion limit.
    CodeTooComplex,
    /// A one-off condition with a preformatted message (non-class
    /// superclass, overload of a non-function class member, and similar).
    GenericError { message: String },
}

impl std::fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeErrorKind::DuplicateTypeDefinition { name, .. } => {
                write!(f, "Duplicate type definition '{name}'")
            }
            TypeErrorKind::UnknownSymbol { name, context } => match context {
                SymbolContext::Binding => write!(f, "Unknown global '{name}'"),
                SymbolContext::Type => write!(f, "Unknown type '{name}'"),
            },
            TypeErrorKind::OccursCheckFailed => {
                write!(f, "Type contains a self-reference that cannot be resolved")
            }
            TypeErrorKind::CodeTooComplex => {
                write!(f, "Code is too complex to typecheck! Consider simplifying the code around this area")
            }
            TypeErrorKind::GenericError { message } => f.write_str(message),
        }
    }
}

/// A single reported error, tagged with its source location and module.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeError {
    pub span: Span,
    pub module: ModuleName,
    pub kind: TypeErrorKind,
}

impl TypeError {
    pub fn new(span: Span, module: ModuleName, kind: TypeErrorKind) -> Self {
        TypeError { span, module, kind }
    }
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.module, self.span, self.kind)
    }
}
