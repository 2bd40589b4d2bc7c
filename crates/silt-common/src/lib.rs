//! Shared infrastructure for the Silt type analysis crates.
//!
//! This crate holds the pieces every other analysis crate needs without
//! creating dependency cycles: source spans, the diagnostic value types,
//! the analysis option struct, and the recursion guard used by the
//! tree-walking passes.

pub mod diagnostics;
pub mod options;
pub mod recursion;
pub mod span;

/// An identifier as it appears in source: a variable, property, type alias,
/// or generic parameter name. Cheap to clone and to use as a map key.
pub type Name = smol_str::SmolStr;

/// The name a module is known by to the module resolver.
pub type ModuleName = smol_str::SmolStr;

/// Internal compiler error: an invariant that user input can never break has
/// been broken. These trap; they are not recoverable diagnostics.
#[macro_export]
macro_rules! ice {
    ($($arg:tt)*) => {
        panic!("internal compiler error: {}", format!($($arg)*))
    };
}
