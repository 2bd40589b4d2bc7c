//! Options for the analysis passes.
//!
//! This is a plain struct threaded by reference into each pass, never
//! process-global state. Both the constraint generator and any later stage
//! can reference it without a circular dependency.

/// Default bound on visitor recursion depth.
pub const DEFAULT_RECURSION_LIMIT: usize = 300;

/// Tunables and debug switches for constraint generation.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Bound on traversal depth. Exceeding it reports `CodeTooComplex` at
    /// the offending location and stops descending.
    pub recursion_limit: usize,
    /// Record a structured log of constraint generation, serializable to
    /// JSON.
    pub log_generation: bool,
    /// Recognize the `_silt_ice` and `_silt_print` debug type annotations.
    pub magic_types: bool,
    /// Give declared classes a common root class as their default parent,
    /// enabling negation over class types and `typeof`-guard narrowing to
    /// root classes.
    pub negated_class_types: bool,
    /// Record which module each `require` import came from on the scope, for
    /// go-to-declaration support.
    pub record_imported_modules: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            log_generation: false,
            magic_types: false,
            negated_class_types: false,
            record_imported_modules: false,
        }
    }
}
