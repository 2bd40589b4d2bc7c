//! Module artifacts and the module-resolver interface.

use rustc_hash::FxHashMap;
use silt_ast::{Expr, NodeId};
use silt_common::diagnostics::TypeError;
use silt_common::{ModuleName, Name};
use silt_types::{ScopeId, TypeFun, TypeId, TypePackId};

/// What the resolver knows about the target of a `require`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleInfo {
    pub name: ModuleName,
}

/// The analyzed surface of another module, as seen by an importer.
#[derive(Debug, Default)]
pub struct ModuleExports {
    pub exported_type_bindings: FxHashMap<Name, TypeFun>,
}

/// Resolves `require` expressions to modules. Queried synchronously; a
/// `None` means the import stays unresolved and analysis continues without
/// it. Implementations must be safe to share when modules are analyzed in
/// parallel.
pub trait ModuleResolver {
    /// Identify the module a `require` argument refers to.
    fn resolve_module_info(&self, from: &ModuleName, require_arg: &Expr) -> Option<ModuleInfo>;

    /// The analyzed exports of a module, if it has been processed.
    fn get_module(&self, name: &ModuleName) -> Option<&ModuleExports>;
}

/// A resolver that resolves nothing.
#[derive(Debug, Default)]
pub struct NullModuleResolver;

impl ModuleResolver for NullModuleResolver {
    fn resolve_module_info(&self, _from: &ModuleName, _require_arg: &Expr) -> Option<ModuleInfo> {
        None
    }

    fn get_module(&self, _name: &ModuleName) -> Option<&ModuleExports> {
        None
    }
}

/// Everything the generator records about a module besides the arena, scope
/// tree, and constraint list themselves.
///
/// The `ast_*` side tables are keyed by node id; every expression the
/// generator visits gets an `ast_types` entry, even on error recovery.
/// `ast_original_call_types` and `ast_overload_resolved_types` are written
/// by the generator and the solver respectively; both live here so the
/// solver can fill the latter in place.
#[derive(Debug)]
pub struct Module {
    pub name: ModuleName,
    pub root_scope: Option<ScopeId>,
    pub ast_types: FxHashMap<NodeId, TypeId>,
    pub ast_type_packs: FxHashMap<NodeId, TypePackId>,
    pub ast_expected_types: FxHashMap<NodeId, TypeId>,
    pub ast_resolved_types: FxHashMap<NodeId, TypeId>,
    pub ast_resolved_type_packs: FxHashMap<NodeId, TypePackId>,
    pub ast_original_call_types: FxHashMap<NodeId, TypeId>,
    pub ast_overload_resolved_types: FxHashMap<NodeId, TypeId>,
    pub ast_scopes: FxHashMap<NodeId, ScopeId>,
    pub declared_globals: FxHashMap<Name, TypeId>,
    pub errors: Vec<TypeError>,
}

impl Module {
    pub fn new(name: ModuleName) -> Self {
        Module {
            name,
            root_scope: None,
            ast_types: FxHashMap::default(),
            ast_type_packs: FxHashMap::default(),
            ast_expected_types: FxHashMap::default(),
            ast_resolved_types: FxHashMap::default(),
            ast_resolved_type_packs: FxHashMap::default(),
            ast_original_call_types: FxHashMap::default(),
            ast_overload_resolved_types: FxHashMap::default(),
            ast_scopes: FxHashMap::default(),
            declared_globals: FxHashMap::default(),
            errors: Vec::new(),
        }
    }
}
