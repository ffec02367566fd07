//! Resolved declarations: the hand-off format between a language front end
//! and the component tree.
//!
//! A front end (see `tuguml-java`) produces one [`ResolvedTypeDeclaration`]
//! per top-level type, with nested types, members and every referenced type
//! already resolved against the project's symbol table. Resolution failures
//! are recorded in place as [`ResolvedType::Unresolved`] rather than raised.
//!
//! These types carry names, never IDs. [`crate::model::SourceComponent::build`]
//! owns ID allocation.

use serde::{Deserialize, Serialize};

// ============================================================================
// Visibility and Modifiers
// ============================================================================

/// Java access level.
///
/// | Java | Variant | UML symbol |
/// |------|---------|------------|
/// | `public` | `Public` | `+` |
/// | `protected` | `Protected` | `#` |
/// | (none) | `Package` | `~` |
/// | `private` | `Private` | `-` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

impl Visibility {
    /// UML visibility symbol.
    pub fn symbol(&self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Protected => '#',
            Visibility::Package => '~',
            Visibility::Private => '-',
        }
    }

    /// Parse a Java access keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Non-access modifiers that show up on a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Modifiers::default()
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }
}

// ============================================================================
// Resolved Types
// ============================================================================

/// A type reference after symbol resolution.
///
/// `dims` counts array dimensions (`int[][]` has `dims == 2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// `int`, `boolean`, `double`, ...
    Primitive { name: String, dims: u8 },
    /// Method return type `void`.
    Void,
    /// A type declared inside the parsed project, by fully qualified name.
    Project {
        qualified_name: String,
        args: Vec<ResolvedType>,
        dims: u8,
    },
    /// A type declared outside the project (JDK, libraries).
    External {
        qualified_name: String,
        package: String,
        args: Vec<ResolvedType>,
        dims: u8,
    },
    /// A type parameter in scope (`T`).
    TypeVariable { name: String, dims: u8 },
    /// `?`, `? extends X`, `? super X`.
    Wildcard {
        bound: Option<Box<ResolvedType>>,
        upper: bool,
    },
    /// A name that did not resolve.
    Unresolved { name: String, dims: u8 },
}

impl ResolvedType {
    pub fn primitive(name: impl Into<String>) -> Self {
        ResolvedType::Primitive {
            name: name.into(),
            dims: 0,
        }
    }

    pub fn project(qualified_name: impl Into<String>) -> Self {
        ResolvedType::Project {
            qualified_name: qualified_name.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    pub fn external(qualified_name: impl Into<String>, package: impl Into<String>) -> Self {
        ResolvedType::External {
            qualified_name: qualified_name.into(),
            package: package.into(),
            args: Vec::new(),
            dims: 0,
        }
    }

    /// Return the same type with generic arguments attached.
    ///
    /// Arguments only apply to project and external references; other
    /// variants are returned unchanged.
    pub fn with_args(mut self, new_args: Vec<ResolvedType>) -> Self {
        match &mut self {
            ResolvedType::Project { args, .. } | ResolvedType::External { args, .. } => {
                *args = new_args;
            }
            _ => {}
        }
        self
    }

    /// Return the same type with `extra` additional array dimensions.
    pub fn array_of(mut self, extra: u8) -> Self {
        match &mut self {
            ResolvedType::Primitive { dims, .. }
            | ResolvedType::Project { dims, .. }
            | ResolvedType::External { dims, .. }
            | ResolvedType::TypeVariable { dims, .. }
            | ResolvedType::Unresolved { dims, .. } => *dims = dims.saturating_add(extra),
            ResolvedType::Void | ResolvedType::Wildcard { .. } => {}
        }
        self
    }

    /// Short, human-readable form used in signatures and diagram lines.
    ///
    /// Reference types use their simple name, so `java.util.List<com.acme.Widget>[]`
    /// describes as `List<Widget>[]`.
    pub fn describe(&self) -> String {
        match self {
            ResolvedType::Primitive { name, dims } => with_dims(name.clone(), *dims),
            ResolvedType::Void => "void".to_string(),
            ResolvedType::Project {
                qualified_name,
                args,
                dims,
            }
            | ResolvedType::External {
                qualified_name,
                args,
                dims,
                ..
            } => {
                let mut out = simple_name(qualified_name).to_string();
                if !args.is_empty() {
                    let inner: Vec<String> = args.iter().map(|a| a.describe()).collect();
                    out.push('<');
                    out.push_str(&inner.join(", "));
                    out.push('>');
                }
                with_dims(out, *dims)
            }
            ResolvedType::TypeVariable { name, dims } | ResolvedType::Unresolved { name, dims } => {
                with_dims(name.clone(), *dims)
            }
            ResolvedType::Wildcard { bound, upper } => match bound {
                None => "?".to_string(),
                Some(b) if *upper => format!("? extends {}", b.describe()),
                Some(b) => format!("? super {}", b.describe()),
            },
        }
    }
}

/// Last dot-separated segment of a qualified name.
pub fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map_or(qualified_name, |(_, tail)| tail)
}

pub(crate) fn with_dims(mut base: String, dims: u8) -> String {
    for _ in 0..dims {
        base.push_str("[]");
    }
    base
}

// ============================================================================
// Resolved Declarations
// ============================================================================

/// Kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
}

/// A fully resolved class, interface or enum, with its nested types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTypeDeclaration {
    pub kind: DeclarationKind,
    /// Simple name (`Inner`).
    pub name: String,
    /// Package, empty for the default package.
    pub package: String,
    /// Fully qualified name (`com.acme.Outer.Inner`).
    pub qualified_name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    /// Superclass for classes, super-interfaces for interfaces.
    pub extends: Vec<ResolvedType>,
    pub implements: Vec<ResolvedType>,
    pub constants: Vec<ResolvedEnumConstant>,
    pub fields: Vec<ResolvedField>,
    pub constructors: Vec<ResolvedConstructor>,
    pub methods: Vec<ResolvedMethod>,
    pub nested: Vec<ResolvedTypeDeclaration>,
    /// Workspace-relative path of the declaring file.
    pub source_path: Option<String>,
}

impl ResolvedTypeDeclaration {
    /// Create an empty top-level declaration.
    pub fn new(kind: DeclarationKind, package: impl Into<String>, name: impl Into<String>) -> Self {
        let package = package.into();
        let name = name.into();
        let qualified_name = if package.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", package, name)
        };
        ResolvedTypeDeclaration {
            kind,
            name,
            package,
            qualified_name,
            visibility: Visibility::Package,
            modifiers: Modifiers::none(),
            type_parameters: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            constants: Vec::new(),
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            source_path: None,
        }
    }

    /// Create an empty declaration nested in `outer`.
    pub fn nested_in(
        outer: &ResolvedTypeDeclaration,
        kind: DeclarationKind,
        name: impl Into<String>,
    ) -> Self {
        let mut decl = ResolvedTypeDeclaration::new(kind, outer.package.clone(), name);
        decl.qualified_name = format!("{}.{}", outer.qualified_name, decl.name);
        decl.source_path = outer.source_path.clone();
        decl
    }

    pub fn is_interface(&self) -> bool {
        self.kind == DeclarationKind::Interface
    }
}

/// A field declaration. `int a, b;` yields two fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub ty: ResolvedType,
}

impl ResolvedField {
    pub fn new(name: impl Into<String>, visibility: Visibility, ty: ResolvedType) -> Self {
        ResolvedField {
            name: name.into(),
            visibility,
            modifiers: Modifiers::none(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameter {
    pub name: String,
    pub ty: ResolvedType,
    pub varargs: bool,
}

impl ResolvedParameter {
    pub fn new(name: impl Into<String>, ty: ResolvedType) -> Self {
        ResolvedParameter {
            name: name.into(),
            ty,
            varargs: false,
        }
    }

    /// Type as it appears in a signature (`String...` for varargs).
    pub fn describe(&self) -> String {
        let base = self.ty.describe();
        if self.varargs {
            format!("{}...", base)
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMethod {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    pub return_type: ResolvedType,
    pub parameters: Vec<ResolvedParameter>,
}

impl ResolvedMethod {
    pub fn new(name: impl Into<String>, visibility: Visibility, return_type: ResolvedType) -> Self {
        ResolvedMethod {
            name: name.into(),
            visibility,
            modifiers: Modifiers::none(),
            type_parameters: Vec::new(),
            return_type,
            parameters: Vec::new(),
        }
    }

    /// `name(ParamType, ...)`.
    pub fn signature(&self) -> String {
        signature(&self.name, &self.parameters)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConstructor {
    /// Always the declaring type's simple name.
    pub name: String,
    pub visibility: Visibility,
    pub parameters: Vec<ResolvedParameter>,
}

impl ResolvedConstructor {
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        ResolvedConstructor {
            name: name.into(),
            visibility,
            parameters: Vec::new(),
        }
    }

    pub fn signature(&self) -> String {
        signature(&self.name, &self.parameters)
    }
}

/// An enum constant. A constant with a class body (`RED { ... }`) stays a
/// plain constant of its enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnumConstant {
    pub name: String,
    pub has_body: bool,
}

impl ResolvedEnumConstant {
    pub fn new(name: impl Into<String>) -> Self {
        ResolvedEnumConstant {
            name: name.into(),
            has_body: false,
        }
    }
}

fn signature(name: &str, parameters: &[ResolvedParameter]) -> String {
    let params: Vec<String> = parameters.iter().map(|p| p.describe()).collect();
    format!("{}({})", name, params.join(", "))
}

// ============================================================================
// Tests
// ============================================================================
