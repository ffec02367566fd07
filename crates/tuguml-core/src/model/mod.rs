//! Composite component model: the resolved program as a tree.
//!
//! [`SourceComponent`] is an arena owning every node. Nodes refer to each
//! other by [`ComponentId`]:
//! - a composite (`Source`, `ClassOrInterface`, `Enum`) lists its children
//!   (member leaves, then nested types);
//! - every node except the root and external components has exactly one
//!   parent, stored as a non-owning `Option<ComponentId>` back-link;
//! - type references ([`TypeRef::Declared`]) point at project composites or at
//!   external components.
//!
//! External components live in the same arena but have no parent. The
//! [`ExternalRegistry`] maps each `(qualified name, package)` key to its single
//! node, so every referencing site shares one entry.
//!
//! The tree is immutable once built. Read access goes through [`Component`],
//! a borrowed view with one variant per node kind and a safe probe method
//! (`as_field()`, `as_enum()`, ...) per variant.
//!
//! # Qualified Names
//!
//! A node's qualified name is the dot-joined chain of ancestor segments:
//!
//! | Node | Segment |
//! |------|---------|
//! | `Source` | (none) |
//! | top-level type | `package.Name` |
//! | nested type | `Name` |
//! | constructor, method | `name(ParamType, ...)` |
//! | field, enum constant | `name` |
//! | external | its qualified name |
//!
//! so field `count` of `com.acme.Widget` is `com.acme.Widget.count`.

mod builder;

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::declaration::{simple_name, with_dims, Modifiers, Visibility};
use crate::visitor::Visitor;

// ============================================================================
// IDs
// ============================================================================

/// Index of a node in its [`SourceComponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    pub fn new(id: u32) -> Self {
        ComponentId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmp_{}", self.0)
    }
}

// ============================================================================
// Type References
// ============================================================================

/// A type reference inside the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Primitive { name: String, dims: u8 },
    Void,
    /// Points at a project composite or an external component.
    Declared {
        target: ComponentId,
        args: Vec<TypeRef>,
        dims: u8,
    },
    TypeVariable { name: String, dims: u8 },
    Wildcard {
        bound: Option<Box<TypeRef>>,
        upper: bool,
    },
    Unresolved { name: String, dims: u8 },
}

impl TypeRef {
    /// The outermost declared target, if any (`List` for `List<Widget>`).
    pub fn target(&self) -> Option<ComponentId> {
        match self {
            TypeRef::Declared { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Every declared target in this reference, generic arguments included,
    /// outermost first.
    pub fn targets(&self) -> Vec<ComponentId> {
        let mut out = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    fn collect_targets(&self, out: &mut Vec<ComponentId>) {
        match self {
            TypeRef::Declared { target, args, .. } => {
                out.push(*target);
                for arg in args {
                    arg.collect_targets(out);
                }
            }
            TypeRef::Wildcard {
                bound: Some(bound), ..
            } => bound.collect_targets(out),
            _ => {}
        }
    }

    /// Short form used on diagram lines: `int[]`, `List<Widget>`, `T`.
    pub fn describe(&self, tree: &SourceComponent) -> String {
        match self {
            TypeRef::Primitive { name, dims }
            | TypeRef::TypeVariable { name, dims }
            | TypeRef::Unresolved { name, dims } => with_dims(name.clone(), *dims),
            TypeRef::Void => "void".to_string(),
            TypeRef::Declared { target, args, dims } => {
                let mut out = match tree.get(*target) {
                    Some(Component::External(ext)) => ext.simple_name().to_string(),
                    Some(component) => component.name().to_string(),
                    None => target.to_string(),
                };
                if !args.is_empty() {
                    let inner: Vec<String> = args.iter().map(|a| a.describe(tree)).collect();
                    out.push('<');
                    out.push_str(&inner.join(", "));
                    out.push('>');
                }
                with_dims(out, *dims)
            }
            TypeRef::Wildcard { bound, upper } => match bound {
                None => "?".to_string(),
                Some(b) if *upper => format!("? extends {}", b.describe(tree)),
                Some(b) => format!("? super {}", b.describe(tree)),
            },
        }
    }
}

// ============================================================================
// Node Data
// ============================================================================

/// Tree root. Owns every top-level type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceData {
    pub name: String,
    pub types: Vec<ComponentId>,
}

/// A class or an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassOrInterfaceData {
    pub name: String,
    pub package: String,
    pub qualified_name: String,
    pub is_interface: bool,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub members: Vec<ComponentId>,
    pub nested: Vec<ComponentId>,
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumData {
    pub name: String,
    pub package: String,
    pub qualified_name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub implements: Vec<TypeRef>,
    pub members: Vec<ComponentId>,
    pub nested: Vec<ComponentId>,
    pub source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub varargs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorData {
    pub name: String,
    pub visibility: Visibility,
    pub parameters: Vec<Parameter>,
    /// `Name(ParamType, ...)`.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodData {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub type_parameters: Vec<String>,
    pub return_type: TypeRef,
    pub parameters: Vec<Parameter>,
    /// `name(ParamType, ...)`.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldData {
    pub name: String,
    pub visibility: Visibility,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstantData {
    pub name: String,
    pub has_body: bool,
}

/// A type referenced by the project but declared outside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalData {
    pub qualified_name: String,
    pub package: String,
}

impl ExternalData {
    pub fn key(&self) -> ExternalKey {
        ExternalKey::new(self.qualified_name.clone(), self.package.clone())
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.qualified_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Source(SourceData),
    ClassOrInterface(ClassOrInterfaceData),
    Enum(EnumData),
    Constructor(ConstructorData),
    Method(MethodData),
    Field(FieldData),
    EnumConstant(EnumConstantData),
    External(ExternalData),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    parent: Option<ComponentId>,
    kind: NodeKind,
}

// ============================================================================
// External Registry
// ============================================================================

/// Identity of an external component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalKey {
    /// Qualified name (`java.util.List`).
    pub name: String,
    pub package: String,
}

impl ExternalKey {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        ExternalKey {
            name: name.into(),
            package: package.into(),
        }
    }
}

/// At most one external component per [`ExternalKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRegistry {
    by_key: HashMap<ExternalKey, ComponentId>,
    order: Vec<ComponentId>,
}

impl ExternalRegistry {
    pub fn get(&self, key: &ExternalKey) -> Option<ComponentId> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &ExternalKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// IDs in first-seen order.
    pub fn ids(&self) -> &[ComponentId] {
        &self.order
    }

    /// Return the existing ID for `key`, or record `fresh` as its ID.
    ///
    /// The boolean is `true` when `fresh` was recorded.
    pub(crate) fn intern(&mut self, key: ExternalKey, fresh: ComponentId) -> (ComponentId, bool) {
        if let Some(existing) = self.by_key.get(&key) {
            return (*existing, false);
        }
        self.by_key.insert(key, fresh);
        self.order.push(fresh);
        (fresh, true)
    }
}

// ============================================================================
// Source Component (the tree)
// ============================================================================

/// The whole component tree. Node 0 is the `Source` root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceComponent {
    nodes: Vec<Node>,
    externals: ExternalRegistry,
    types_by_name: HashMap<String, ComponentId>,
}

impl SourceComponent {
    /// ID of the root node.
    pub const ROOT: ComponentId = ComponentId(0);

    /// The `Source` root.
    pub fn root(&self) -> Handle<'_, SourceData> {
        match &self.nodes[Self::ROOT.index()].kind {
            NodeKind::Source(data) => Handle::new(self, Self::ROOT, data),
            _ => unreachable!("node 0 is always the source root"),
        }
    }

    /// Name given to the root at build time.
    pub fn name(&self) -> &str {
        &self.root().data().name
    }

    pub fn get(&self, id: ComponentId) -> Option<Component<'_>> {
        let node = self.nodes.get(id.index())?;
        Some(self.view(id, node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Every node in ID order, root first.
    pub fn iter(&self) -> impl Iterator<Item = Component<'_>> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| self.view(ComponentId(i as u32), node))
    }

    /// Project types (classes, interfaces, enums) in depth-first declaration order.
    pub fn types(&self) -> Vec<Component<'_>> {
        self.iter()
            .filter(|c| matches!(c, Component::ClassOrInterface(_) | Component::Enum(_)))
            .collect()
    }

    /// Project type by fully qualified name.
    pub fn type_by_name(&self, qualified_name: &str) -> Option<Component<'_>> {
        let id = self.types_by_name.get(qualified_name)?;
        self.get(*id)
    }

    /// Any node by qualified name.
    pub fn find(&self, qualified_name: &str) -> Option<Component<'_>> {
        if let Some(found) = self.type_by_name(qualified_name) {
            return Some(found);
        }
        self.iter().find(|c| c.qualified_name() == qualified_name)
    }

    pub fn externals(&self) -> &ExternalRegistry {
        &self.externals
    }

    /// External components in first-seen order.
    pub fn external_components(&self) -> Vec<Handle<'_, ExternalData>> {
        self.externals
            .ids()
            .iter()
            .filter_map(|id| self.get(*id).and_then(|c| c.as_external()))
            .collect()
    }

    fn view<'t>(&'t self, id: ComponentId, node: &'t Node) -> Component<'t> {
        match &node.kind {
            NodeKind::Source(d) => Component::Source(Handle::new(self, id, d)),
            NodeKind::ClassOrInterface(d) => Component::ClassOrInterface(Handle::new(self, id, d)),
            NodeKind::Enum(d) => Component::Enum(Handle::new(self, id, d)),
            NodeKind::Constructor(d) => Component::Constructor(Handle::new(self, id, d)),
            NodeKind::Method(d) => Component::Method(Handle::new(self, id, d)),
            NodeKind::Field(d) => Component::Field(Handle::new(self, id, d)),
            NodeKind::EnumConstant(d) => Component::EnumConstant(Handle::new(self, id, d)),
            NodeKind::External(d) => Component::External(Handle::new(self, id, d)),
        }
    }

    fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }
}

// ============================================================================
// Views
// ============================================================================

/// A borrowed, typed view of one node.
///
/// Derefs to the node's data, so `field.name` and `field.ty` read directly.
pub struct Handle<'t, T> {
    tree: &'t SourceComponent,
    id: ComponentId,
    data: &'t T,
}

impl<T> Clone for Handle<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for Handle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("data", self.data)
            .finish()
    }
}

impl<T> Deref for Handle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<'t, T> Handle<'t, T> {
    fn new(tree: &'t SourceComponent, id: ComponentId, data: &'t T) -> Self {
        Handle { tree, id, data }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The tree this node belongs to.
    pub fn tree(&self) -> &'t SourceComponent {
        self.tree
    }

    /// The node's data, with the tree's lifetime.
    pub fn data(&self) -> &'t T {
        self.data
    }

    pub fn parent(&self) -> Option<Component<'t>> {
        let parent = self.tree.parent_of(self.id)?;
        self.tree.get(parent)
    }

    pub fn qualified_name(&self) -> String {
        match self.tree.get(self.id) {
            Some(component) => component.qualified_name(),
            None => String::new(),
        }
    }

    pub fn component(&self) -> Option<Component<'t>> {
        self.tree.get(self.id)
    }
}

/// One node of the tree, viewed as its concrete variant.
#[derive(Debug, Clone, Copy)]
pub enum Component<'t> {
    Source(Handle<'t, SourceData>),
    ClassOrInterface(Handle<'t, ClassOrInterfaceData>),
    Enum(Handle<'t, EnumData>),
    Constructor(Handle<'t, ConstructorData>),
    Method(Handle<'t, MethodData>),
    Field(Handle<'t, FieldData>),
    EnumConstant(Handle<'t, EnumConstantData>),
    External(Handle<'t, ExternalData>),
}

impl<'t> Component<'t> {
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Source(h) => h.id,
            Component::ClassOrInterface(h) => h.id,
            Component::Enum(h) => h.id,
            Component::Constructor(h) => h.id,
            Component::Method(h) => h.id,
            Component::Field(h) => h.id,
            Component::EnumConstant(h) => h.id,
            Component::External(h) => h.id,
        }
    }

    fn tree(&self) -> &'t SourceComponent {
        match self {
            Component::Source(h) => h.tree,
            Component::ClassOrInterface(h) => h.tree,
            Component::Enum(h) => h.tree,
            Component::Constructor(h) => h.tree,
            Component::Method(h) => h.tree,
            Component::Field(h) => h.tree,
            Component::EnumConstant(h) => h.tree,
            Component::External(h) => h.tree,
        }
    }

    /// Local name. Externals answer with their qualified name.
    pub fn name(&self) -> &'t str {
        match self {
            Component::Source(h) => &h.data.name,
            Component::ClassOrInterface(h) => &h.data.name,
            Component::Enum(h) => &h.data.name,
            Component::Constructor(h) => &h.data.name,
            Component::Method(h) => &h.data.name,
            Component::Field(h) => &h.data.name,
            Component::EnumConstant(h) => &h.data.name,
            Component::External(h) => &h.data.qualified_name,
        }
    }

    /// Short variant name used in logs and JSON.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Component::Source(_) => "source",
            Component::ClassOrInterface(h) if h.is_interface => "interface",
            Component::ClassOrInterface(_) => "class",
            Component::Enum(_) => "enum",
            Component::Constructor(_) => "constructor",
            Component::Method(_) => "method",
            Component::Field(_) => "field",
            Component::EnumConstant(_) => "enum_constant",
            Component::External(_) => "external",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Component::Source(_) | Component::ClassOrInterface(_) | Component::Enum(_)
        )
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_composite()
    }

    /// Owning node. `None` for the root and for external components.
    pub fn parent(&self) -> Option<Component<'t>> {
        let tree = self.tree();
        let parent = tree.parent_of(self.id())?;
        tree.get(parent)
    }

    /// Owned children: member leaves in declaration order, then nested types.
    pub fn children(&self) -> Vec<Component<'t>> {
        let tree = self.tree();
        let ids: Vec<ComponentId> = match self {
            Component::Source(h) => h.data.types.clone(),
            Component::ClassOrInterface(h) => {
                h.data.members.iter().chain(&h.data.nested).copied().collect()
            }
            Component::Enum(h) => h.data.members.iter().chain(&h.data.nested).copied().collect(),
            _ => Vec::new(),
        };
        ids.into_iter().filter_map(|id| tree.get(id)).collect()
    }

    fn segment(&self) -> Option<&'t str> {
        match self {
            Component::Source(_) => None,
            Component::ClassOrInterface(h) => Some(if is_top_level(h.tree, h.id) {
                h.data.qualified_name.as_str()
            } else {
                h.data.name.as_str()
            }),
            Component::Enum(h) => Some(if is_top_level(h.tree, h.id) {
                h.data.qualified_name.as_str()
            } else {
                h.data.name.as_str()
            }),
            Component::Constructor(h) => Some(h.data.signature.as_str()),
            Component::Method(h) => Some(h.data.signature.as_str()),
            Component::Field(h) => Some(h.data.name.as_str()),
            Component::EnumConstant(h) => Some(h.data.name.as_str()),
            Component::External(h) => Some(h.data.qualified_name.as_str()),
        }
    }

    /// Dot-joined segments of this node and its ancestors.
    pub fn qualified_name(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(*self);
        while let Some(component) = current {
            if let Some(segment) = component.segment() {
                segments.push(segment);
            }
            current = component.parent();
        }
        segments.reverse();
        segments.join(".")
    }

    pub fn as_source(&self) -> Option<Handle<'t, SourceData>> {
        match self {
            Component::Source(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_class_or_interface(&self) -> Option<Handle<'t, ClassOrInterfaceData>> {
        match self {
            Component::ClassOrInterface(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<Handle<'t, EnumData>> {
        match self {
            Component::Enum(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_constructor(&self) -> Option<Handle<'t, ConstructorData>> {
        match self {
            Component::Constructor(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<Handle<'t, MethodData>> {
        match self {
            Component::Method(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<Handle<'t, FieldData>> {
        match self {
            Component::Field(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_enum_constant(&self) -> Option<Handle<'t, EnumConstantData>> {
        match self {
            Component::EnumConstant(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<Handle<'t, ExternalData>> {
        match self {
            Component::External(h) => Some(*h),
            _ => None,
        }
    }

    /// Dispatch to the visitor method for this variant.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Component::Source(h) => visitor.visit_source(*h),
            Component::ClassOrInterface(h) => visitor.visit_class_or_interface(*h),
            Component::Enum(h) => visitor.visit_enum(*h),
            Component::Constructor(h) => visitor.visit_constructor(*h),
            Component::Method(h) => visitor.visit_method(*h),
            Component::Field(h) => visitor.visit_field(*h),
            Component::EnumConstant(h) => visitor.visit_enum_constant(*h),
            Component::External(h) => visitor.visit_external(*h),
        }
    }
}

fn is_top_level(tree: &SourceComponent, id: ComponentId) -> bool {
    tree.parent_of(id) == Some(SourceComponent::ROOT)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{
        DeclarationKind, ResolvedConstructor, ResolvedEnumConstant, ResolvedField,
        ResolvedMethod, ResolvedParameter, ResolvedType, ResolvedTypeDeclaration,
    };

    fn widget_tree() -> SourceComponent {
        let mut widget = ResolvedTypeDeclaration::new(DeclarationKind::Class, "com.acme", "Widget");
        widget.fields.push(ResolvedField::new(
            "count",
            Visibility::Private,
            ResolvedType::primitive("int"),
        ));
        widget.fields.push(ResolvedField::new(
            "names",
            Visibility::Private,
            ResolvedType::external("java.util.List", "java.util")
                .with_args(vec![ResolvedType::external("java.lang.String", "java.lang")]),
        ));
        widget
            .constructors
            .push(ResolvedConstructor::new("Widget", Visibility::Public));
        let mut resize = ResolvedMethod::new("resize", Visibility::Public, ResolvedType::Void);
        resize
            .parameters
            .push(ResolvedParameter::new("w", ResolvedType::primitive("int")));
        resize
            .parameters
            .push(ResolvedParameter::new("h", ResolvedType::primitive("int")));
        widget.methods.push(resize);

        let mut mode = ResolvedTypeDeclaration::nested_in(&widget, DeclarationKind::Enum, "Mode");
        mode.constants.push(ResolvedEnumConstant::new("ON"));
        mode.constants.push(ResolvedEnumConstant {
            name: "OFF".to_string(),
            has_body: true,
        });
        widget.nested.push(mode);

        SourceComponent::build("demo", vec![widget])
    }

    mod naming_tests {
        use super::*;

        #[test]
        fn field_qualified_name_joins_ancestors() {
            let tree = widget_tree();
            let field = tree.find("com.acme.Widget.count").unwrap();
            assert!(field.as_field().is_some());
            assert_eq!(field.qualified_name(), "com.acme.Widget.count");
            assert_eq!(field.name(), "count");
        }

        #[test]
        fn method_segment_is_signature() {
            let tree = widget_tree();
            let widget = tree.type_by_name("com.acme.Widget").unwrap();
            let method = widget
                .children()
                .into_iter()
                .find_map(|c| c.as_method())
                .unwrap();
            assert_eq!(method.qualified_name(), "com.acme.Widget.resize(int, int)");
        }

        #[test]
        fn nested_types_use_simple_segment() {
            let tree = widget_tree();
            let mode = tree.type_by_name("com.acme.Widget.Mode").unwrap();
            assert_eq!(mode.qualified_name(), "com.acme.Widget.Mode");
            let off = tree.find("com.acme.Widget.Mode.OFF").unwrap();
            assert!(off.as_enum_constant().unwrap().has_body);
        }

        #[test]
        fn qualified_name_matches_stored_type_name() {
            let tree = widget_tree();
            for ty in tree.types() {
                let stored = match ty {
                    Component::ClassOrInterface(h) => h.qualified_name.clone(),
                    Component::Enum(h) => h.qualified_name.clone(),
                    _ => unreachable!(),
                };
                assert_eq!(ty.qualified_name(), stored);
            }
        }

        #[test]
        fn root_has_no_segment() {
            let tree = widget_tree();
            let root = tree.get(SourceComponent::ROOT).unwrap();
            assert_eq!(root.qualified_name(), "");
            assert_eq!(tree.name(), "demo");
        }
    }

    mod structure_tests {
        use super::*;

        #[test]
        fn leaf_and_composite_classification() {
            let tree = widget_tree();
            for component in tree.iter() {
                let composite = matches!(
                    component,
                    Component::Source(_) | Component::ClassOrInterface(_) | Component::Enum(_)
                );
                assert_eq!(component.is_composite(), composite);
                assert_eq!(component.is_leaf(), !composite);
            }
        }

        #[test]
        fn probes_answer_only_for_their_variant() {
            let tree = widget_tree();
            let widget = tree.type_by_name("com.acme.Widget").unwrap();
            assert!(widget.as_class_or_interface().is_some());
            assert!(widget.as_enum().is_none());
            assert!(widget.as_field().is_none());
            assert!(widget.as_external().is_none());
            assert!(widget.as_source().is_none());
        }

        #[test]
        fn children_are_members_then_nested() {
            let tree = widget_tree();
            let widget = tree.type_by_name("com.acme.Widget").unwrap();
            let kinds: Vec<&str> = widget.children().iter().map(|c| c.kind_name()).collect();
            assert_eq!(
                kinds,
                vec!["field", "field", "constructor", "method", "enum"]
            );
        }

        #[test]
        fn every_non_root_project_node_has_one_owner() {
            let tree = widget_tree();
            for component in tree.iter() {
                match component {
                    Component::Source(_) | Component::External(_) => {
                        assert!(component.parent().is_none())
                    }
                    _ => {
                        let parent = component.parent().unwrap();
                        let owned = parent
                            .children()
                            .iter()
                            .filter(|c| c.id() == component.id())
                            .count();
                        assert_eq!(owned, 1);
                    }
                }
            }
        }

        #[test]
        fn generic_field_references_both_externals() {
            let tree = widget_tree();
            let names = tree.find("com.acme.Widget.names").unwrap().as_field().unwrap();
            assert_eq!(names.ty.targets().len(), 2);
            assert_eq!(names.ty.describe(&tree), "List<String>");
            assert_eq!(tree.externals().len(), 2);
        }

        #[test]
        fn component_id_display() {
            assert_eq!(ComponentId::new(7).to_string(), "cmp_7");
        }
    }
}
