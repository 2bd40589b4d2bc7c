//! Lowering of type annotations into arena terms, plus the declared-global
//! surface (`declare function`, `declare class`).

use rustc_hash::FxHashMap;
use silt_ast::{
    DeclareClass, DeclareFunction, Stmt, Symbol, TypeAnnotation, TypeAnnotationKind, TypeArg,
    TypeListAnnotation, TypePackAnnotation, TypePackAnnotationKind,
};
use silt_common::diagnostics::{SymbolContext, TypeErrorKind};
use silt_common::{ice, Name};
use silt_types::{
    ClassType, FunctionArgument, FunctionType, PendingExpansion, Property, ScopeId, TableIndexer,
    TableState, TableType, Type, TypeFun, TypeId, TypePack, TypePackId,
};

use crate::constraint::ConstraintKind;
use crate::generator::ConstraintGenerator;
use crate::scope::Binding;

/// Property names that live on a declared class's metatable rather than the
/// class itself.
const METAMETHODS: &[&str] = &[
    "__index",
    "__newindex",
    "__call",
    "__concat",
    "__unm",
    "__add",
    "__sub",
    "__mul",
    "__div",
    "__mod",
    "__pow",
    "__tostring",
    "__metatable",
    "__eq",
    "__lt",
    "__le",
    "__mode",
    "__iter",
    "__len",
];

fn is_metamethod(name: &Name) -> bool {
    METAMETHODS.iter().any(|metamethod| name == metamethod)
}

impl<'a> ConstraintGenerator<'a> {
    // =========================================================================
    // Annotation lowering
    // =========================================================================

    /// Lower a type annotation to an arena term. `in_type_arguments` is true
    /// while resolving the arguments of a generic application; nested
    /// applications then skip their own expansion constraint, because
    /// dispatching the outer one queues them.
    pub(crate) fn resolve_type(
        &mut self,
        scope: ScopeId,
        annotation: &TypeAnnotation,
        in_type_arguments: bool,
    ) -> TypeId {
        let result = match &annotation.kind {
            TypeAnnotationKind::Reference {
                prefix,
                name,
                parameters,
            } => self.resolve_reference(
                scope,
                annotation,
                prefix.as_ref(),
                name,
                parameters,
                in_type_arguments,
            ),
            TypeAnnotationKind::Table { props, indexer } => {
                let mut resolved_props = FxHashMap::default();
                for prop in props {
                    let prop_ty = self.resolve_type(scope, &prop.ty, in_type_arguments);
                    resolved_props.insert(prop.name.clone(), Property::new(prop_ty));
                }

                let resolved_indexer = indexer.as_ref().map(|indexer| TableIndexer {
                    key: self.resolve_type(scope, &indexer.key, in_type_arguments),
                    value: self.resolve_type(scope, &indexer.value, in_type_arguments),
                });

                let level = self.scopes.get(scope).level;
                self.arena.add(Type::Table(TableType {
                    props: resolved_props,
                    indexer: resolved_indexer,
                    state: TableState::Sealed,
                    scope,
                    level,
                }))
            }
            TypeAnnotationKind::Function {
                generics,
                generic_packs,
                params,
                param_names,
                return_types,
            } => {
                let has_generics = !generics.is_empty() || !generic_packs.is_empty();

                // Generic bindings need a scope of their own; without
                // generics the enclosing scope serves as the signature
                // scope.
                let signature_scope = if has_generics {
                    self.child_scope(annotation.node_id, scope)
                } else {
                    scope
                };

                let mut generic_types = Vec::new();
                let mut generic_pack_types = Vec::new();

                if has_generics {
                    for (name, generic) in self.create_generics(signature_scope, generics, false) {
                        generic_types.push(generic.ty);
                        self.scopes
                            .get_mut(signature_scope)
                            .private_type_bindings
                            .insert(name, TypeFun::monomorphic(generic.ty));
                    }
                    for (name, generic) in
                        self.create_generic_packs(signature_scope, generic_packs, false)
                    {
                        generic_pack_types.push(generic.tp);
                        self.scopes
                            .get_mut(signature_scope)
                            .private_type_pack_bindings
                            .insert(name, generic.tp);
                    }
                }

                let arg_pack = self.resolve_type_list(signature_scope, params, in_type_arguments);
                let ret_pack =
                    self.resolve_type_list(signature_scope, return_types, in_type_arguments);

                let arg_names = param_names
                    .iter()
                    .map(|name| {
                        name.as_ref().map(|name| FunctionArgument {
                            name: name.clone(),
                            span: annotation.span,
                        })
                    })
                    .collect();

                self.arena.add(Type::Function(FunctionType {
                    generics: generic_types,
                    generic_packs: generic_pack_types,
                    arg_pack,
                    ret_pack,
                    arg_names,
                    scope,
                    has_no_generics: !has_generics,
                    has_self: false,
                }))
            }
            TypeAnnotationKind::Typeof(expr) => self.check(scope, expr, None, false).ty,
            TypeAnnotationKind::Union(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| self.resolve_type(scope, part, in_type_arguments))
                    .collect();
                self.arena.union(parts)
            }
            TypeAnnotationKind::Intersection(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| self.resolve_type(scope, part, in_type_arguments))
                    .collect();
                self.arena.intersection(parts)
            }
            TypeAnnotationKind::SingletonBool(value) => self.arena.singleton_bool(*value),
            TypeAnnotationKind::SingletonString(value) => self.arena.singleton_string(value),
            TypeAnnotationKind::Error => TypeId::ERROR,
        };

        self.module
            .ast_resolved_types
            .insert(annotation.node_id, result);
        result
    }

    fn resolve_reference(
        &mut self,
        scope: ScopeId,
        annotation: &TypeAnnotation,
        prefix: Option<&Name>,
        name: &Name,
        parameters: &[TypeArg],
        in_type_arguments: bool,
    ) -> TypeId {
        if self.options.magic_types {
            if name == "_silt_ice" {
                ice!("_silt_ice type encountered");
            } else if name == "_silt_print" {
                let only_type = match parameters {
                    [TypeArg::Type(ty)] => Some(ty),
                    _ => None,
                };
                let Some(only_type) = only_type else {
                    self.report_error(
                        annotation.span,
                        TypeErrorKind::GenericError {
                            message: "_silt_print requires one generic parameter".to_string(),
                        },
                    );
                    return TypeId::ERROR;
                };
                return self.resolve_type(scope, only_type, in_type_arguments);
            }
        }

        let alias = match prefix {
            Some(prefix) => self
                .scopes
                .lookup_imported_type(scope, prefix, name)
                .cloned(),
            None => self.scopes.lookup_type(scope, name).cloned(),
        };

        let Some(alias) = alias else {
            return TypeId::ERROR;
        };

        // A non-generic alias needs no expansion machinery; its head is the
        // type.
        if !alias.is_generic() {
            return alias.ty;
        }

        let mut type_args = Vec::new();
        let mut pack_args = Vec::new();
        for parameter in parameters {
            match parameter {
                TypeArg::Type(ty) => type_args.push(self.resolve_type(scope, ty, true)),
                TypeArg::Pack(tp) => pack_args.push(self.resolve_type_pack(scope, tp, true)),
            }
        }

        let result = self.arena.add(Type::PendingExpansion(PendingExpansion {
            prefix: prefix.cloned(),
            name: name.clone(),
            type_args,
            pack_args,
        }));

        // Outside of type-argument position the application needs its own
        // expansion constraint; dispatching it queues constraints for any
        // nested applications.
        if !in_type_arguments {
            self.add_constraint(
                scope,
                annotation.span,
                ConstraintKind::TypeAliasExpansion { target: result },
            );
        }

        result
    }

    pub(crate) fn resolve_type_pack(
        &mut self,
        scope: ScopeId,
        annotation: &TypePackAnnotation,
        in_type_arguments: bool,
    ) -> TypePackId {
        let result = match &annotation.kind {
            TypePackAnnotationKind::Explicit(list) => {
                self.resolve_type_list(scope, list, in_type_arguments)
            }
            TypePackAnnotationKind::Variadic(ty) => {
                let mut element = self.resolve_type(scope, ty, in_type_arguments);
                if matches!(self.arena.get(self.arena.follow(element)), Type::Error) {
                    element = self.fresh_type(scope);
                }
                self.arena.add_pack(TypePack::Variadic {
                    ty: element,
                    hidden: false,
                })
            }
            TypePackAnnotationKind::Generic(name) => {
                match self.scopes.lookup_pack(scope, name) {
                    Some(pack) => pack,
                    None => {
                        self.report_error(
                            annotation.span,
                            TypeErrorKind::UnknownSymbol {
                                name: name.clone(),
                                context: SymbolContext::Type,
                            },
                        );
                        TypePackId::ERROR
                    }
                }
            }
        };

        self.module
            .ast_resolved_type_packs
            .insert(annotation.node_id, result);
        result
    }

    pub(crate) fn resolve_type_list(
        &mut self,
        scope: ScopeId,
        list: &TypeListAnnotation,
        in_type_arguments: bool,
    ) -> TypePackId {
        let mut head = Vec::with_capacity(list.types.len());
        for ty in &list.types {
            head.push(self.resolve_type(scope, ty, in_type_arguments));
        }

        let tail = list
            .tail
            .as_ref()
            .map(|tail| self.resolve_type_pack(scope, tail, in_type_arguments));

        self.arena.pack(head, tail)
    }

    // =========================================================================
    // Declared globals
    // =========================================================================

    pub(crate) fn visit_declare_function(
        &mut self,
        scope: ScopeId,
        stmt: &Stmt,
        decl: &DeclareFunction,
    ) {
        let has_generics = !decl.generics.is_empty() || !decl.generic_packs.is_empty();

        let fn_scope = if has_generics {
            self.child_scope(stmt.node_id, scope)
        } else {
            scope
        };

        let mut generic_types = Vec::new();
        let mut generic_packs = Vec::new();

        for (name, generic) in self.create_generics(fn_scope, &decl.generics, false) {
            generic_types.push(generic.ty);
            self.scopes
                .get_mut(fn_scope)
                .private_type_bindings
                .insert(name, TypeFun::monomorphic(generic.ty));
        }
        for (name, generic) in self.create_generic_packs(fn_scope, &decl.generic_packs, false) {
            generic_packs.push(generic.tp);
            self.scopes
                .get_mut(fn_scope)
                .private_type_pack_bindings
                .insert(name, generic.tp);
        }

        let arg_pack = self.resolve_type_list(fn_scope, &decl.params, false);
        let ret_pack = self.resolve_type_list(fn_scope, &decl.return_types, false);

        let arg_names = decl
            .param_names
            .iter()
            .map(|(name, span)| {
                Some(FunctionArgument {
                    name: name.clone(),
                    span: *span,
                })
            })
            .collect();

        let fn_type = self.arena.add(Type::Function(FunctionType {
            generics: generic_types,
            generic_packs,
            arg_pack,
            ret_pack,
            arg_names,
            scope: fn_scope,
            has_no_generics: !has_generics,
            has_self: false,
        }));

        self.module
            .declared_globals
            .insert(decl.name.clone(), fn_type);
        self.scopes
            .get_mut(scope)
            .bindings
            .insert(Symbol::Global(decl.name.clone()), Binding::new(fn_type, stmt.span));
    }

    pub(crate) fn visit_declare_class(&mut self, scope: ScopeId, stmt: &Stmt, decl: &DeclareClass) {
        let mut super_ty = self
            .options
            .negated_class_types
            .then_some(TypeId::CLASS);

        if let Some(super_name) = &decl.superclass {
            let Some(lookup) = self.scopes.lookup_type(scope, super_name).cloned() else {
                self.report_error(
                    stmt.span,
                    TypeErrorKind::UnknownSymbol {
                        name: super_name.clone(),
                        context: SymbolContext::Type,
                    },
                );
                return;
            };

            // There are no generic classes, so a generic superclass cannot
            // name one.
            debug_assert!(!lookup.is_generic());

            let resolved = self.arena.follow(lookup.ty);
            if !matches!(self.arena.get(resolved), Type::Class(_)) {
                self.report_error(
                    stmt.span,
                    TypeErrorKind::GenericError {
                        message: format!(
                            "Cannot use non-class type '{}' as a superclass of class '{}'",
                            super_name, decl.name
                        ),
                    },
                );
                return;
            }
            super_ty = Some(lookup.ty);
        }

        // The class type is allocated blocked so methods can mention it as
        // their `self` before the property maps are complete.
        let class_ty = self.arena.add(Type::Blocked);
        self.scopes
            .get_mut(scope)
            .exported_type_bindings
            .insert(decl.name.clone(), TypeFun::monomorphic(class_ty));

        let mut class_props: FxHashMap<Name, Property> = FxHashMap::default();
        let mut metatable_props: FxHashMap<Name, Property> = FxHashMap::default();

        for prop in &decl.props {
            let mut prop_ty = self.resolve_type(scope, &prop.ty, false);

            // Function types always take `self`, but the annotation does
            // not say so; prepend it here.
            if prop.is_method {
                if let Type::Function(function) = self.arena.get(self.arena.follow(prop_ty)) {
                    let mut function = function.clone();
                    function.arg_pack = self
                        .arena
                        .pack(vec![class_ty], Some(function.arg_pack));
                    function.arg_names.insert(
                        0,
                        Some(FunctionArgument {
                            name: Name::new("self"),
                            span: stmt.span,
                        }),
                    );
                    function.has_self = true;
                    prop_ty = self.arena.add(Type::Function(function));
                }
            }

            let target = if is_metamethod(&prop.name) {
                &mut metatable_props
            } else {
                &mut class_props
            };

            let current = target.get(&prop.name).map(|existing| existing.ty);
            match current {
                None => {
                    target.insert(prop.name.clone(), Property::new(prop_ty));
                }
                Some(current) => {
                    // Overloads flatten into a single intersection rather
                    // than nesting.
                    match self.arena.get(self.arena.follow(current)).clone() {
                        Type::Intersection(mut parts) => {
                            parts.push(prop_ty);
                            let merged = self.arena.intersection(parts);
                            target.insert(prop.name.clone(), Property::new(merged));
                        }
                        Type::Function(_) => {
                            let merged = self.arena.intersection(vec![current, prop_ty]);
                            target.insert(prop.name.clone(), Property::new(merged));
                        }
                        _ => {
                            self.report_error(
                                stmt.span,
                                TypeErrorKind::GenericError {
                                    message: format!(
                                        "Cannot overload non-function class member '{}'",
                                        prop.name
                                    ),
                                },
                            );
                        }
                    }
                }
            }
        }

        let level = self.scopes.get(scope).level;
        let metatable_ty = self.arena.add(Type::Table(TableType {
            props: metatable_props,
            indexer: None,
            state: TableState::Sealed,
            scope,
            level,
        }));

        self.arena.bind(
            class_ty,
            Type::Class(ClassType {
                name: decl.name.clone(),
                props: class_props,
                parent: super_ty,
                metatable: Some(metatable_ty),
                module: self.module_name.clone(),
            }),
        );
    }
}
