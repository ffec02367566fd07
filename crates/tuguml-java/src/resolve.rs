//! Symbol table and name resolution.
//!
//! The [`SymbolTable`] indexes every project type by fully qualified name
//! (nested types as `pkg.Outer.Inner`). [`Resolver`] turns outlines into
//! [`ResolvedTypeDeclaration`]s, resolving each written type name in this
//! order:
//!
//! 1. type variables in scope
//! 2. the enclosing types and their nested types
//! 3. single-type imports
//! 4. types of the same package
//! 5. on-demand imports of project packages or types
//! 6. implicit `java.lang` types
//! 7. a lone on-demand import of a package outside the project
//!
//! A dotted name starting with a lower-case segment is taken as fully
//! qualified. Anything else is left [`ResolvedType::Unresolved`].

use std::collections::{HashMap, HashSet};

use tracing::debug;

use tuguml_core::declaration::{
    DeclarationKind, Modifiers, ResolvedConstructor, ResolvedEnumConstant, ResolvedField,
    ResolvedMethod, ResolvedParameter, ResolvedType, ResolvedTypeDeclaration, Visibility,
};

use crate::syntax::{CallableDecl, CompilationUnit, ParamDecl, TypeDecl, TypeParam, TypeSyntax};

/// Types every compilation unit sees without an import.
const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "StringBuilder",
    "StringBuffer",
    "CharSequence",
    "Boolean",
    "Byte",
    "Character",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Number",
    "Void",
    "Math",
    "System",
    "Thread",
    "Runnable",
    "Iterable",
    "Comparable",
    "Cloneable",
    "AutoCloseable",
    "Enum",
    "Record",
    "Class",
    "ClassLoader",
    "Throwable",
    "Exception",
    "Error",
    "RuntimeException",
    "IllegalArgumentException",
    "IllegalStateException",
    "NullPointerException",
    "IndexOutOfBoundsException",
    "UnsupportedOperationException",
    "ArithmeticException",
    "ClassCastException",
    "InterruptedException",
    "CloneNotSupportedException",
    "Override",
    "Deprecated",
    "FunctionalInterface",
    "SuppressWarnings",
    "SafeVarargs",
    "Process",
    "ProcessBuilder",
    "Runtime",
    "ThreadLocal",
    "StackTraceElement",
];

/// Leading lower-case segments of a qualified name (`java.util` for
/// `java.util.Map.Entry`).
pub fn package_of(qualified_name: &str) -> String {
    qualified_name
        .split('.')
        .take_while(|s| s.chars().next().is_some_and(|c| c.is_lowercase()))
        .collect::<Vec<_>>()
        .join(".")
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

// ============================================================================
// Symbol Table
// ============================================================================

/// Every type declared in the project.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Fully qualified names.
    types: HashSet<String>,
    /// Package to (simple name to qualified name) for top-level types.
    by_package: HashMap<String, HashMap<String, String>>,
    /// Type to (simple name to qualified name) for its nested types.
    nested: HashMap<String, HashMap<String, String>>,
}

impl SymbolTable {
    pub fn build(units: &[CompilationUnit]) -> Self {
        let mut table = SymbolTable::default();
        for unit in units {
            for decl in &unit.types {
                let qualified = join(&unit.package, &decl.name);
                table
                    .by_package
                    .entry(unit.package.clone())
                    .or_default()
                    .insert(decl.name.clone(), qualified.clone());
                table.register(decl, qualified);
            }
        }
        table
    }

    fn register(&mut self, decl: &TypeDecl, qualified: String) {
        for inner in &decl.nested {
            let inner_name = join(&qualified, &inner.name);
            self.nested
                .entry(qualified.clone())
                .or_default()
                .insert(inner.name.clone(), inner_name.clone());
            self.register(inner, inner_name);
        }
        self.types.insert(qualified);
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn is_project_package(&self, package: &str) -> bool {
        self.by_package.contains_key(package)
    }

    fn in_package(&self, package: &str, simple: &str) -> Option<&String> {
        self.by_package.get(package)?.get(simple)
    }

    fn nested_in(&self, outer: &str, simple: &str) -> Option<&String> {
        self.nested.get(outer)?.get(simple)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// What a written head segment resolved to.
enum Head {
    Project(String),
    External(String),
}

/// Per-type resolution context.
struct Scope<'u> {
    unit: &'u CompilationUnit,
    /// Enclosing types, outermost first, the current type last.
    enclosing: Vec<String>,
    type_vars: Vec<String>,
}

/// Resolves outlines against a [`SymbolTable`].
pub struct Resolver<'t> {
    table: &'t SymbolTable,
}

impl<'t> Resolver<'t> {
    pub fn new(table: &'t SymbolTable) -> Self {
        Resolver { table }
    }

    /// Resolve every top-level type of `unit`.
    pub fn resolve_unit(&self, unit: &CompilationUnit) -> Vec<ResolvedTypeDeclaration> {
        let mut scope = Scope {
            unit,
            enclosing: Vec::new(),
            type_vars: Vec::new(),
        };
        unit.types
            .iter()
            .map(|decl| {
                let resolved = ResolvedTypeDeclaration::new(decl.kind, unit.package.clone(), &decl.name);
                self.resolve_type(decl, resolved, None, &mut scope)
            })
            .collect()
    }

    fn resolve_type(
        &self,
        decl: &TypeDecl,
        mut out: ResolvedTypeDeclaration,
        enclosing_kind: Option<DeclarationKind>,
        scope: &mut Scope<'_>,
    ) -> ResolvedTypeDeclaration {
        let in_interface = enclosing_kind == Some(DeclarationKind::Interface);
        let is_interface = decl.kind == DeclarationKind::Interface;
        let is_enum = decl.kind == DeclarationKind::Enum;

        out.source_path = Some(scope.unit.path.clone());
        out.visibility = decl.modifiers.visibility.unwrap_or(if in_interface {
            Visibility::Public
        } else {
            Visibility::Package
        });
        out.modifiers = Modifiers {
            is_static: decl.modifiers.is_static
                || (enclosing_kind.is_some() && (in_interface || is_interface || is_enum)),
            is_abstract: decl.modifiers.is_abstract,
            is_final: decl.modifiers.is_final,
        };
        out.type_parameters = decl.type_params.iter().map(|p| p.name.clone()).collect();

        scope.enclosing.push(out.qualified_name.clone());
        let vars_before = scope.type_vars.len();
        // Static nested types do not see the outer type's variables; Java
        // rejects such references, so keeping them in scope is harmless.
        scope.type_vars.extend(out.type_parameters.iter().cloned());

        out.extends = decl.extends.iter().map(|t| self.resolve(t, scope)).collect();
        out.implements = decl.implements.iter().map(|t| self.resolve(t, scope)).collect();

        out.constants = decl
            .constants
            .iter()
            .map(|c| ResolvedEnumConstant {
                name: c.name.clone(),
                has_body: c.has_body,
            })
            .collect();

        for field in &decl.fields {
            let visibility = field.modifiers.visibility.unwrap_or(if is_interface {
                Visibility::Public
            } else {
                Visibility::Package
            });
            let mut resolved = ResolvedField::new(&field.name, visibility, self.resolve(&field.ty, scope));
            resolved.modifiers = Modifiers {
                is_static: field.modifiers.is_static || is_interface,
                is_abstract: false,
                is_final: field.modifiers.is_final || is_interface,
            };
            out.fields.push(resolved);
        }

        for ctor in &decl.constructors {
            let visibility = ctor.modifiers.visibility.unwrap_or(if is_enum {
                Visibility::Private
            } else {
                Visibility::Package
            });
            let mut resolved = ResolvedConstructor::new(&decl.name, visibility);
            let pushed = self.push_type_params(&ctor.type_params, scope);
            resolved.parameters = self.resolve_params(&ctor.params, scope);
            scope.type_vars.truncate(scope.type_vars.len() - pushed);
            out.constructors.push(resolved);
        }

        for method in &decl.methods {
            out.methods.push(self.resolve_method(method, is_interface, scope));
        }

        for inner in &decl.nested {
            let nested = ResolvedTypeDeclaration::nested_in(&out, inner.kind, &inner.name);
            let nested = self.resolve_type(inner, nested, Some(decl.kind), scope);
            out.nested.push(nested);
        }

        scope.type_vars.truncate(vars_before);
        scope.enclosing.pop();
        out
    }

    fn resolve_method(
        &self,
        method: &CallableDecl,
        in_interface: bool,
        scope: &mut Scope<'_>,
    ) -> ResolvedMethod {
        let mods = method.modifiers;
        let visibility = mods.visibility.unwrap_or(if in_interface {
            Visibility::Public
        } else {
            Visibility::Package
        });
        let pushed = self.push_type_params(&method.type_params, scope);
        let return_type = match &method.return_type {
            Some(ty) => self.resolve(ty, scope),
            None => ResolvedType::Void,
        };
        let mut resolved = ResolvedMethod::new(&method.name, visibility, return_type);
        resolved.type_parameters = method.type_params.iter().map(|p| p.name.clone()).collect();
        resolved.parameters = self.resolve_params(&method.params, scope);
        scope.type_vars.truncate(scope.type_vars.len() - pushed);

        let implicit_abstract = in_interface
            && !method.has_body
            && !mods.is_static
            && !mods.is_default
            && mods.visibility != Some(Visibility::Private);
        resolved.modifiers = Modifiers {
            is_static: mods.is_static,
            is_abstract: mods.is_abstract || implicit_abstract,
            is_final: mods.is_final,
        };
        resolved
    }

    fn push_type_params(&self, params: &[TypeParam], scope: &mut Scope<'_>) -> usize {
        scope.type_vars.extend(params.iter().map(|p| p.name.clone()));
        params.len()
    }

    fn resolve_params(&self, params: &[ParamDecl], scope: &Scope<'_>) -> Vec<ResolvedParameter> {
        params
            .iter()
            .map(|p| ResolvedParameter {
                name: p.name.clone(),
                ty: self.resolve(&p.ty, scope),
                varargs: p.varargs,
            })
            .collect()
    }

    fn resolve(&self, ty: &TypeSyntax, scope: &Scope<'_>) -> ResolvedType {
        match ty {
            TypeSyntax::Primitive { name, dims } => ResolvedType::Primitive {
                name: name.clone(),
                dims: *dims,
            },
            TypeSyntax::Void => ResolvedType::Void,
            TypeSyntax::Wildcard { bound, upper } => ResolvedType::Wildcard {
                bound: bound.as_ref().map(|b| Box::new(self.resolve(b, scope))),
                upper: *upper,
            },
            TypeSyntax::Named { name, args, dims } => {
                let args: Vec<ResolvedType> = args.iter().map(|a| self.resolve(a, scope)).collect();
                self.resolve_name(name, scope).with_args(args).array_of(*dims)
            }
        }
    }

    fn resolve_name(&self, name: &str, scope: &Scope<'_>) -> ResolvedType {
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };

        if rest.is_none() && scope.type_vars.iter().any(|v| v == head) {
            return ResolvedType::TypeVariable {
                name: head.to_string(),
                dims: 0,
            };
        }

        if rest.is_some() && head.chars().next().is_some_and(|c| c.is_lowercase()) {
            return self.qualified(name);
        }

        let Some(found) = self.lookup_head(head, scope) else {
            debug!(name, file = %scope.unit.path, "unresolved type name");
            return ResolvedType::Unresolved {
                name: name.to_string(),
                dims: 0,
            };
        };

        match (found, rest) {
            (Head::Project(qualified), None) => ResolvedType::project(qualified),
            (Head::Project(qualified), Some(rest)) => {
                let mut current = qualified;
                for segment in rest.split('.') {
                    match self.table.nested_in(&current, segment) {
                        Some(next) => current = next.clone(),
                        None => {
                            debug!(name, file = %scope.unit.path, "unresolved member type");
                            return ResolvedType::Unresolved {
                                name: name.to_string(),
                                dims: 0,
                            };
                        }
                    }
                }
                ResolvedType::project(current)
            }
            (Head::External(qualified), rest) => {
                let full = match rest {
                    Some(rest) => join(&qualified, rest),
                    None => qualified,
                };
                let package = package_of(&full);
                ResolvedType::external(full, package)
            }
        }
    }

    /// A name written fully qualified (`java.util.List`).
    fn qualified(&self, name: &str) -> ResolvedType {
        if self.table.contains(name) {
            ResolvedType::project(name)
        } else {
            ResolvedType::external(name, package_of(name))
        }
    }

    fn lookup_head(&self, head: &str, scope: &Scope<'_>) -> Option<Head> {
        // Enclosing types, innermost first, and their members.
        for outer in scope.enclosing.iter().rev() {
            if outer.rsplit('.').next() == Some(head) {
                return Some(Head::Project(outer.clone()));
            }
            if let Some(inner) = self.table.nested_in(outer, head) {
                return Some(Head::Project(inner.clone()));
            }
        }

        let imports = &scope.unit.imports;
        for import in imports.iter().filter(|i| !i.on_demand && !i.is_static) {
            if import.path.rsplit('.').next() == Some(head) {
                return Some(if self.table.contains(&import.path) {
                    Head::Project(import.path.clone())
                } else {
                    Head::External(import.path.clone())
                });
            }
        }

        if let Some(found) = self.table.in_package(&scope.unit.package, head) {
            return Some(Head::Project(found.clone()));
        }

        for import in imports.iter().filter(|i| i.on_demand && !i.is_static) {
            let candidate = join(&import.path, head);
            if self.table.contains(&candidate) {
                return Some(Head::Project(candidate));
            }
        }

        if JAVA_LANG.contains(&head) {
            return Some(Head::External(join("java.lang", head)));
        }

        let foreign: Vec<&str> = imports
            .iter()
            .filter(|i| i.on_demand && !i.is_static)
            .map(|i| i.path.as_str())
            .filter(|p| !self.table.is_project_package(p) && !self.table.contains(p))
            .collect();
        if let [only] = foreign.as_slice() {
            return Some(Head::External(join(only, head)));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{java_parser, parse_unit};

    fn units(sources: &[(&str, &str)]) -> Vec<CompilationUnit> {
        let mut parser = java_parser().unwrap();
        sources
            .iter()
            .map(|(path, src)| parse_unit(&mut parser, path, src).unwrap())
            .collect()
    }

    fn resolve_all(sources: &[(&str, &str)]) -> Vec<ResolvedTypeDeclaration> {
        let units = units(sources);
        let table = SymbolTable::build(&units);
        let resolver = Resolver::new(&table);
        units.iter().flat_map(|u| resolver.resolve_unit(u)).collect()
    }

    fn field_type<'d>(decl: &'d ResolvedTypeDeclaration, name: &str) -> &'d ResolvedType {
        &decl.fields.iter().find(|f| f.name == name).unwrap().ty
    }

    #[test]
    fn package_of_takes_lowercase_prefix() {
        assert_eq!(package_of("java.util.Map.Entry"), "java.util");
        assert_eq!(package_of("Widget"), "");
    }

    #[test]
    fn symbol_table_indexes_nested_types() {
        let units = units(&[(
            "a/Outer.java",
            "package a; class Outer { static class Inner { enum Deep {} } }",
        )]);
        let table = SymbolTable::build(&units);
        assert!(table.contains("a.Outer"));
        assert!(table.contains("a.Outer.Inner"));
        assert!(table.contains("a.Outer.Inner.Deep"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn resolution_order() {
        let decls = resolve_all(&[
            (
                "a/Main.java",
                "package a;\n\
                 import b.Helper;\n\
                 import java.util.List;\n\
                 import c.*;\n\
                 class Main<T> {\n\
                   T value;\n\
                   Peer peer;\n\
                   Helper helper;\n\
                   Remote remote;\n\
                   List<String> names;\n\
                   Node head;\n\
                   java.util.Map<String, Integer> index;\n\
                   Mystery mystery;\n\
                   class Node {}\n\
                 }\n",
            ),
            ("a/Peer.java", "package a; class Peer {}"),
            ("b/Helper.java", "package b; public class Helper {}"),
            ("c/Remote.java", "package c; public class Remote {}"),
        ]);
        let main = &decls[0];
        assert!(matches!(field_type(main, "value"), ResolvedType::TypeVariable { name, .. } if name == "T"));
        assert_eq!(field_type(main, "peer"), &ResolvedType::project("a.Peer"));
        assert_eq!(field_type(main, "helper"), &ResolvedType::project("b.Helper"));
        assert_eq!(field_type(main, "remote"), &ResolvedType::project("c.Remote"));
        assert_eq!(
            field_type(main, "names"),
            &ResolvedType::external("java.util.List", "java.util")
                .with_args(vec![ResolvedType::external("java.lang.String", "java.lang")])
        );
        assert_eq!(field_type(main, "head"), &ResolvedType::project("a.Main.Node"));
        assert!(matches!(
            field_type(main, "index"),
            ResolvedType::External { qualified_name, .. } if qualified_name == "java.util.Map"
        ));
        assert!(matches!(
            field_type(main, "mystery"),
            ResolvedType::Unresolved { name, .. } if name == "Mystery"
        ));
    }

    #[test]
    fn lone_foreign_wildcard_import_claims_unknown_names() {
        let decls = resolve_all(&[(
            "A.java",
            "import java.util.*;\nclass A { ArrayList<String> items; }",
        )]);
        assert_eq!(
            field_type(&decls[0], "items"),
            &ResolvedType::external("java.util.ArrayList", "java.util")
                .with_args(vec![ResolvedType::external("java.lang.String", "java.lang")])
        );
    }

    #[test]
    fn dotted_member_types() {
        let decls = resolve_all(&[
            (
                "A.java",
                "import java.util.Map;\nclass A { Map.Entry<String, B.Kind> e; B.Kind k; }",
            ),
            ("B.java", "class B { enum Kind { X } }"),
        ]);
        assert_eq!(field_type(&decls[0], "k"), &ResolvedType::project("B.Kind"));
        match field_type(&decls[0], "e") {
            ResolvedType::External {
                qualified_name,
                package,
                args,
                ..
            } => {
                assert_eq!(qualified_name, "java.util.Map.Entry");
                assert_eq!(package, "java.util");
                assert_eq!(args[1], ResolvedType::project("B.Kind"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn default_visibility_and_implicit_modifiers() {
        let decls = resolve_all(&[
            (
                "Repo.java",
                "interface Repo { int LIMIT = 1; void save(); default void flush() {} static Repo of() { return null; } class Impl {} }",
            ),
            ("Color.java", "enum Color { RED; Color() {} }"),
        ]);
        let repo = &decls[0];
        assert_eq!(repo.visibility, Visibility::Package);
        let limit = &repo.fields[0];
        assert_eq!(limit.visibility, Visibility::Public);
        assert!(limit.modifiers.is_static && limit.modifiers.is_final);
        let save = &repo.methods[0];
        assert_eq!(save.visibility, Visibility::Public);
        assert!(save.modifiers.is_abstract);
        assert!(!repo.methods[1].modifiers.is_abstract);
        assert!(!repo.methods[2].modifiers.is_abstract);
        assert_eq!(repo.methods[2].return_type, ResolvedType::project("Repo"));
        let impl_ = &repo.nested[0];
        assert_eq!(impl_.qualified_name, "Repo.Impl");
        assert_eq!(impl_.visibility, Visibility::Public);
        assert!(impl_.modifiers.is_static);

        let color = &decls[1];
        assert_eq!(color.constructors[0].visibility, Visibility::Private);
        assert_eq!(color.constants[0].name, "RED");
    }

    #[test]
    fn method_type_parameters_are_scoped() {
        let decls = resolve_all(&[(
            "Box.java",
            "class Box { <R> R get(R fallback) { return fallback; } R leaked; }",
        )]);
        let get = &decls[0].methods[0];
        assert!(matches!(get.return_type, ResolvedType::TypeVariable { .. }));
        assert_eq!(get.signature(), "get(R)");
        assert!(matches!(
            field_type(&decls[0], "leaked"),
            ResolvedType::Unresolved { .. }
        ));
    }
}
