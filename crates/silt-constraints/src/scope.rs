//! The lexically-nested scope tree.
//!
//! Scopes live in an id-indexed arena owned by the generator; parent links
//! are walked iteratively for every lookup. The first scope is the global
//! environment the module is analyzed against.

use rustc_hash::FxHashMap;
use silt_ast::Symbol;
use silt_common::span::Span;
use silt_common::{ModuleName, Name};
use silt_dfg::DefId;
use silt_types::{ScopeId, TypeFun, TypeId, TypeLevel, TypePackId};

/// A value binding: the type of a name plus where it was bound.
#[derive(Clone, Debug)]
pub struct Binding {
    pub ty: TypeId,
    pub span: Span,
}

impl Binding {
    pub fn new(ty: TypeId, span: Span) -> Self {
        Binding { ty, span }
    }
}

/// One scope: bindings for values, types, type packs, imports, and the
/// refined types of definitions.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub level: TypeLevel,
    /// The return pack of the innermost enclosing function; inherited from
    /// the parent on creation.
    pub return_type: TypePackId,
    /// The `...` pack, when an enclosing function declares an ellipsis.
    pub vararg_pack: Option<TypePackId>,
    pub bindings: FxHashMap<Symbol, Binding>,
    pub private_type_bindings: FxHashMap<Name, TypeFun>,
    pub exported_type_bindings: FxHashMap<Name, TypeFun>,
    pub private_type_pack_bindings: FxHashMap<Name, TypePackId>,
    /// Type bindings imported by `require`, keyed by the local name of the
    /// imported module.
    pub imported_type_bindings: FxHashMap<Name, FxHashMap<Name, TypeFun>>,
    /// Which module each import came from, when that recording is enabled.
    pub imported_modules: FxHashMap<Name, ModuleName>,
    /// The refined type of each definition visible in this scope.
    pub def_refinements: FxHashMap<DefId, TypeId>,
    /// Generic parameters of alias declarations, cached so that
    /// mutually-recursive aliases agree on generic identities by name.
    pub type_alias_type_parameters: FxHashMap<Name, TypeId>,
    pub type_alias_type_pack_parameters: FxHashMap<Name, TypePackId>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, level: TypeLevel, return_type: TypePackId) -> Self {
        Scope {
            parent,
            children: Vec::new(),
            level,
            return_type,
            vararg_pack: None,
            bindings: FxHashMap::default(),
            private_type_bindings: FxHashMap::default(),
            exported_type_bindings: FxHashMap::default(),
            private_type_pack_bindings: FxHashMap::default(),
            imported_type_bindings: FxHashMap::default(),
            imported_modules: FxHashMap::default(),
            def_refinements: FxHashMap::default(),
            type_alias_type_parameters: FxHashMap::default(),
            type_alias_type_pack_parameters: FxHashMap::default(),
        }
    }
}

/// The scope arena. Index 0 is always the global scope.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// A tree containing only the global scope. Its return pack is the
    /// error pack; nothing returns across the module boundary.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope::new(None, TypeLevel(0), TypePackId::ERROR)],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    /// Create a child scope, inheriting the parent's return pack and vararg
    /// pack.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        let level = TypeLevel(self.get(parent).level.0 + 1);
        let return_type = self.get(parent).return_type;
        let vararg_pack = self.get(parent).vararg_pack;

        let id = ScopeId(self.scopes.len() as u32);
        let mut scope = Scope::new(Some(parent), level, return_type);
        scope.vararg_pack = vararg_pack;
        self.scopes.push(scope);
        self.get_mut(parent).children.push(id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    // =========================================================================
    // Lookups — all walk parents except where noted
    // =========================================================================

    pub fn lookup(&self, scope: ScopeId, symbol: &Symbol) -> Option<TypeId> {
        self.lookup_ex(scope, symbol).map(|(ty, _)| ty)
    }

    /// Like [`lookup`](Self::lookup), also reporting which scope holds the
    /// binding.
    pub fn lookup_ex(&self, scope: ScopeId, symbol: &Symbol) -> Option<(TypeId, ScopeId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(binding) = self.get(id).bindings.get(symbol) {
                return Some((binding.ty, id));
            }
            current = self.get(id).parent;
        }
        None
    }

    /// The refined type of a definition, consulting `def_refinements` up the
    /// scope chain.
    pub fn lookup_def(&self, scope: ScopeId, def: DefId) -> Option<TypeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(ty) = self.get(id).def_refinements.get(&def) {
                return Some(*ty);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// A named type: private bindings shadow exported ones at each level.
    pub fn lookup_type(&self, scope: ScopeId, name: &Name) -> Option<&TypeFun> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(fun) = scope.private_type_bindings.get(name) {
                return Some(fun);
            }
            if let Some(fun) = scope.exported_type_bindings.get(name) {
                return Some(fun);
            }
            current = scope.parent;
        }
        None
    }

    pub fn lookup_pack(&self, scope: ScopeId, name: &Name) -> Option<TypePackId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(tp) = self.get(id).private_type_pack_bindings.get(name) {
                return Some(*tp);
            }
            current = self.get(id).parent;
        }
        None
    }

    /// An imported type. Consults the current scope only; imports do not
    /// leak across scope boundaries.
    pub fn lookup_imported_type(
        &self,
        scope: ScopeId,
        module: &Name,
        name: &Name,
    ) -> Option<&TypeFun> {
        self.get(scope)
            .imported_type_bindings
            .get(module)
            .and_then(|bindings| bindings.get(name))
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        ScopeTree::new()
    }
}

#[cfg(test)]
#[path = "tests/scope.rs"]
mod tests;
