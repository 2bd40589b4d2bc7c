//! Structured log of a generation run.
//!
//! Captured after generation finishes (dependencies are patched onto
//! constraints after insertion, so a log taken at emission time would be
//! incomplete), and serializable to JSON for offline inspection of what the
//! generator handed the solver.

use serde::Serialize;
use silt_common::diagnostics::TypeError;
use silt_common::span::Span;
use silt_common::ModuleName;

use crate::constraint::ConstraintList;
use crate::module::Module;

#[derive(Clone, Debug, Serialize)]
pub struct ConstraintLogEntry {
    pub index: u32,
    pub scope: u32,
    pub span: Span,
    pub kind: &'static str,
    pub dependencies: Vec<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerationLog {
    pub module: ModuleName,
    pub constraints: Vec<ConstraintLogEntry>,
    pub errors: Vec<TypeError>,
}

impl GenerationLog {
    pub fn capture(module: &Module, constraints: &ConstraintList) -> Self {
        let constraints = constraints
            .iter()
            .map(|(id, c)| ConstraintLogEntry {
                index: id.0,
                scope: c.scope.0,
                span: c.span,
                kind: c.kind.name(),
                dependencies: c.dependencies.iter().map(|d| d.0).collect(),
            })
            .collect();

        GenerationLog {
            module: module.name.clone(),
            constraints,
            errors: module.errors.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("generation log serializes")
    }
}
