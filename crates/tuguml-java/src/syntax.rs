//! Syntax extraction: tree-sitter CST to owned declaration outlines.
//!
//! A compilation unit is reduced to its package, imports and type
//! declarations with their members. Nothing here resolves names: types are
//! kept as written ([`TypeSyntax`]) and visibility is only what the source
//! states explicitly. Defaults and resolution happen in [`crate::resolve`].
//!
//! A unit whose tree contains any error or missing node is rejected as a
//! whole ([`UnitError::Syntax`]).

use thiserror::Error;
use tree_sitter::{Node, Parser};

use tuguml_core::declaration::{DeclarationKind, Visibility};

// ============================================================================
// Outline Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Root-relative path.
    pub path: String,
    /// Empty for the default package.
    pub package: String,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    /// `import a.b.*;`
    pub on_demand: bool,
}

/// Modifiers as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierSet {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_default: bool,
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    Primitive { name: String, dims: u8 },
    Void,
    /// `Widget`, `Map.Entry`, `java.util.List<String>`.
    Named {
        name: String,
        args: Vec<TypeSyntax>,
        dims: u8,
    },
    Wildcard {
        bound: Option<Box<TypeSyntax>>,
        upper: bool,
    },
}

impl TypeSyntax {
    fn add_dims(self, extra: u8) -> Self {
        match self {
            TypeSyntax::Primitive { name, dims } => TypeSyntax::Primitive {
                name,
                dims: dims.saturating_add(extra),
            },
            TypeSyntax::Named { name, args, dims } => TypeSyntax::Named {
                name,
                args,
                dims: dims.saturating_add(extra),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: DeclarationKind,
    pub name: String,
    pub modifiers: ModifierSet,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeSyntax>,
    pub implements: Vec<TypeSyntax>,
    pub constants: Vec<ConstantDecl>,
    pub fields: Vec<FieldDecl>,
    pub constructors: Vec<CallableDecl>,
    pub methods: Vec<CallableDecl>,
    pub nested: Vec<TypeDecl>,
}

impl TypeDecl {
    fn new(kind: DeclarationKind, name: String) -> Self {
        TypeDecl {
            kind,
            name,
            modifiers: ModifierSet::default(),
            type_params: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            constants: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDecl {
    pub name: String,
    pub has_body: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: ModifierSet,
    pub ty: TypeSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeSyntax,
    pub varargs: bool,
}

/// A method or constructor. Constructors have no return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableDecl {
    pub name: String,
    pub modifiers: ModifierSet,
    pub type_params: Vec<TypeParam>,
    pub return_type: Option<TypeSyntax>,
    pub params: Vec<ParamDecl>,
    pub has_body: bool,
}

// ============================================================================
// Parsing
// ============================================================================

/// Why a unit was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// A parser configured for Java.
pub fn java_parser() -> Result<Parser, tree_sitter::LanguageError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_java::LANGUAGE.into())?;
    Ok(parser)
}

/// Parse one file into its outline.
pub fn parse_unit(parser: &mut Parser, path: &str, source: &str) -> Result<CompilationUnit, UnitError> {
    let tree = parser.parse(source, None).ok_or(UnitError::NoTree)?;
    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(UnitError::Syntax {
            line: at.row + 1,
            column: at.column + 1,
        });
    }
    let extractor = Extractor { src: source };
    Ok(extractor.unit(root, path))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

struct Extractor<'s> {
    src: &'s str,
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn all_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "annotated_type"
    )
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn unit(&self, root: Node<'_>, path: &str) -> CompilationUnit {
        let mut unit = CompilationUnit {
            path: path.to_string(),
            package: String::new(),
            imports: Vec::new(),
            types: Vec::new(),
        };
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
                    {
                        unit.package = self.text(name).to_string();
                    }
                }
                "import_declaration" => {
                    let tokens = all_children(child);
                    let name = tokens
                        .iter()
                        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"));
                    if let Some(name) = name {
                        unit.imports.push(ImportDecl {
                            path: self.text(*name).to_string(),
                            is_static: tokens.iter().any(|c| c.kind() == "static"),
                            on_demand: tokens.iter().any(|c| c.kind() == "asterisk"),
                        });
                    }
                }
                "class_declaration" | "interface_declaration" | "enum_declaration" => {
                    if let Some(decl) = self.type_decl(child) {
                        unit.types.push(decl);
                    }
                }
                _ => {}
            }
        }
        unit
    }

    fn type_decl(&self, node: Node<'_>) -> Option<TypeDecl> {
        let kind = match node.kind() {
            "class_declaration" => DeclarationKind::Class,
            "interface_declaration" => DeclarationKind::Interface,
            "enum_declaration" => DeclarationKind::Enum,
            _ => return None,
        };
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let mut decl = TypeDecl::new(kind, name);
        decl.modifiers = self.modifiers(node);
        if let Some(params) = node.child_by_field_name("type_parameters") {
            decl.type_params = self.type_params(params);
        }

        match kind {
            DeclarationKind::Class => {
                if let Some(superclass) = node.child_by_field_name("superclass") {
                    decl.extends = self.types_in(superclass);
                }
            }
            DeclarationKind::Interface => {
                if let Some(ext) = child_of_kind(node, "extends_interfaces") {
                    decl.extends = self.types_in(ext);
                }
            }
            DeclarationKind::Enum => {}
        }
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            decl.implements = self.types_in(interfaces);
        }

        if let Some(body) = node.child_by_field_name("body") {
            if body.kind() == "enum_body" {
                for child in named_children(body) {
                    match child.kind() {
                        "enum_constant" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                decl.constants.push(ConstantDecl {
                                    name: self.text(name).to_string(),
                                    has_body: child.child_by_field_name("body").is_some(),
                                });
                            }
                        }
                        "enum_body_declarations" => self.members(child, &mut decl),
                        _ => {}
                    }
                }
            } else {
                self.members(body, &mut decl);
            }
        }
        Some(decl)
    }

    fn members(&self, body: Node<'_>, decl: &mut TypeDecl) {
        for child in named_children(body) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    let Some(ty_node) = child.child_by_field_name("type") else {
                        continue;
                    };
                    let ty = self.type_syntax(ty_node);
                    let modifiers = self.modifiers(child);
                    let mut cursor = child.walk();
                    let declarators: Vec<Node<'_>> =
                        child.children_by_field_name("declarator", &mut cursor).collect();
                    for declarator in declarators {
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        let extra = declarator
                            .child_by_field_name("dimensions")
                            .map_or(0, |d| self.dims(d));
                        decl.fields.push(FieldDecl {
                            name: self.text(name).to_string(),
                            modifiers,
                            ty: ty.clone().add_dims(extra),
                        });
                    }
                }
                "method_declaration" => {
                    if let Some(method) = self.callable(child, true) {
                        decl.methods.push(method);
                    }
                }
                "constructor_declaration" => {
                    if let Some(ctor) = self.callable(child, false) {
                        decl.constructors.push(ctor);
                    }
                }
                "class_declaration" | "interface_declaration" | "enum_declaration" => {
                    if let Some(nested) = self.type_decl(child) {
                        decl.nested.push(nested);
                    }
                }
                _ => {}
            }
        }
    }

    fn callable(&self, node: Node<'_>, is_method: bool) -> Option<CallableDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let return_type = if is_method {
            let ty = self.type_syntax(node.child_by_field_name("type")?);
            let extra = node
                .child_by_field_name("dimensions")
                .map_or(0, |d| self.dims(d));
            Some(ty.add_dims(extra))
        } else {
            None
        };
        let type_params = node
            .child_by_field_name("type_parameters")
            .map(|p| self.type_params(p))
            .unwrap_or_default();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        Some(CallableDecl {
            name,
            modifiers: self.modifiers(node),
            type_params,
            return_type,
            params,
            has_body: node.child_by_field_name("body").is_some(),
        })
    }

    fn params(&self, node: Node<'_>) -> Vec<ParamDecl> {
        let mut out = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "formal_parameter" => {
                    let (Some(ty), Some(name)) = (
                        child.child_by_field_name("type"),
                        child.child_by_field_name("name"),
                    ) else {
                        continue;
                    };
                    let extra = child
                        .child_by_field_name("dimensions")
                        .map_or(0, |d| self.dims(d));
                    out.push(ParamDecl {
                        name: self.text(name).to_string(),
                        ty: self.type_syntax(ty).add_dims(extra),
                        varargs: false,
                    });
                }
                "spread_parameter" => {
                    let parts = named_children(child);
                    let ty = parts.iter().find(|c| is_type_node(c.kind()));
                    let name = parts
                        .iter()
                        .find(|c| c.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name"));
                    if let (Some(ty), Some(name)) = (ty, name) {
                        out.push(ParamDecl {
                            name: self.text(name).to_string(),
                            ty: self.type_syntax(*ty),
                            varargs: true,
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn modifiers(&self, node: Node<'_>) -> ModifierSet {
        let mut set = ModifierSet::default();
        let Some(mods) = child_of_kind(node, "modifiers") else {
            return set;
        };
        for token in all_children(mods) {
            match token.kind() {
                "public" | "protected" | "private" => {
                    set.visibility = Visibility::from_keyword(token.kind());
                }
                "static" => set.is_static = true,
                "abstract" => set.is_abstract = true,
                "final" => set.is_final = true,
                "default" => set.is_default = true,
                _ => {}
            }
        }
        set
    }

    fn type_params(&self, node: Node<'_>) -> Vec<TypeParam> {
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "type_parameter")
            .filter_map(|param| {
                let parts = named_children(param);
                let name = parts
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))?;
                let bounds = parts
                    .iter()
                    .find(|c| c.kind() == "type_bound")
                    .map(|b| self.types_in(*b))
                    .unwrap_or_default();
                Some(TypeParam {
                    name: self.text(*name).to_string(),
                    bounds,
                })
            })
            .collect()
    }

    /// Types directly inside `node` or inside its `type_list`.
    fn types_in(&self, node: Node<'_>) -> Vec<TypeSyntax> {
        let mut out = Vec::new();
        for child in named_children(node) {
            if child.kind() == "type_list" {
                out.extend(self.types_in(child));
            } else if is_type_node(child.kind()) {
                out.push(self.type_syntax(child));
            }
        }
        out
    }

    fn dims(&self, node: Node<'_>) -> u8 {
        let count = self.text(node).matches('[').count();
        u8::try_from(count).unwrap_or(u8::MAX)
    }

    fn type_syntax(&self, node: Node<'_>) -> TypeSyntax {
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" => TypeSyntax::Primitive {
                name: self.text(node).to_string(),
                dims: 0,
            },
            "void_type" => TypeSyntax::Void,
            "array_type" => {
                let extra = node
                    .child_by_field_name("dimensions")
                    .map_or(0, |d| self.dims(d));
                match node.child_by_field_name("element") {
                    Some(element) => self.type_syntax(element).add_dims(extra),
                    None => TypeSyntax::Named {
                        name: self.text(node).to_string(),
                        args: Vec::new(),
                        dims: 0,
                    },
                }
            }
            "annotated_type" => match named_children(node)
                .into_iter()
                .rev()
                .find(|c| is_type_node(c.kind()))
            {
                Some(inner) => self.type_syntax(inner),
                None => TypeSyntax::Named {
                    name: self.text(node).to_string(),
                    args: Vec::new(),
                    dims: 0,
                },
            },
            "wildcard" => {
                let tokens = all_children(node);
                let upper = !tokens.iter().any(|c| c.kind() == "super");
                let bound = tokens
                    .iter()
                    .find(|c| c.is_named() && is_type_node(c.kind()))
                    .map(|b| Box::new(self.type_syntax(*b)));
                TypeSyntax::Wildcard { bound, upper }
            }
            "type_identifier" | "scoped_type_identifier" | "generic_type" => {
                let mut parts = Vec::new();
                let mut args = Vec::new();
                self.name_parts(node, &mut parts, &mut args);
                TypeSyntax::Named {
                    name: parts.join("."),
                    args,
                    dims: 0,
                }
            }
            _ => TypeSyntax::Named {
                name: self.text(node).to_string(),
                args: Vec::new(),
                dims: 0,
            },
        }
    }

    /// Flatten a possibly scoped, possibly generic type name. The arguments of
    /// the innermost generic segment win.
    fn name_parts(&self, node: Node<'_>, parts: &mut Vec<String>, args: &mut Vec<TypeSyntax>) {
        match node.kind() {
            "type_identifier" | "identifier" => parts.push(self.text(node).to_string()),
            "scoped_type_identifier" | "generic_type" => {
                for child in named_children(node) {
                    if child.kind() == "type_arguments" {
                        *args = named_children(child)
                            .into_iter()
                            .filter(|c| is_type_node(c.kind()) || c.kind() == "wildcard")
                            .map(|c| self.type_syntax(c))
                            .collect();
                    } else {
                        self.name_parts(child, parts, args);
                    }
                }
            }
            _ => {}
        }
    }
}
