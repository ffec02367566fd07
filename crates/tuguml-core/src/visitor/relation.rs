//! RelationExtractor: directed edges between components.
//!
//! | Source | Target in project | Target external |
//! |--------|-------------------|-----------------|
//! | `extends` | `Generalization` | `Generalization` |
//! | `implements` | `Realization` | `Realization` |
//! | field type | `Association` | `Usage` |
//! | parameter or return type | `Dependency` | `Usage` |
//! | nested type | `Nesting` | (n/a) |
//!
//! Member edges start at the member's declaring type. Generic arguments are
//! walked too, so a `List<Widget>` field yields a usage of `java.util.List`
//! and an association to `Widget`. Primitive, type-variable and unresolved
//! references yield nothing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Visitor;
use crate::model::{
    ClassOrInterfaceData, Component, ComponentId, ConstructorData, EnumConstantData, EnumData,
    ExternalData, FieldData, Handle, MethodData, SourceComponent, SourceData, TypeRef,
};

/// Kind of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Generalization,
    Realization,
    Association,
    Dependency,
    Usage,
    Nesting,
}

impl RelationKind {
    /// `extends` and `implements` edges.
    pub fn is_generalization(&self) -> bool {
        matches!(self, RelationKind::Generalization | RelationKind::Realization)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Generalization => "generalization",
            RelationKind::Realization => "realization",
            RelationKind::Association => "association",
            RelationKind::Dependency => "dependency",
            RelationKind::Usage => "usage",
            RelationKind::Nesting => "nesting",
        }
    }
}

/// A directed edge `from -> to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: ComponentId,
    pub to: ComponentId,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(from: ComponentId, to: ComponentId, kind: RelationKind) -> Self {
        Relation { from, to, kind }
    }

    /// PlantUML arrow line, or `None` if either end is not in `tree`.
    pub fn render(&self, tree: &SourceComponent) -> Option<String> {
        let from = tree.get(self.from)?.qualified_name();
        let to = tree.get(self.to)?.qualified_name();
        Some(match self.kind {
            RelationKind::Generalization => format!("{} <|-- {}", to, from),
            RelationKind::Realization => format!("{} <|.. {}", to, from),
            RelationKind::Association => format!("{} --> {}", from, to),
            RelationKind::Dependency => format!("{} ..> {}", from, to),
            RelationKind::Usage => format!("{} ..> {} : <<use>>", from, to),
            RelationKind::Nesting => format!("{} +-- {}", from, to),
        })
    }
}

/// Collects [`Relation`]s. Visiting the source root yields every edge in the
/// tree, deduplicated in first-seen order.
#[derive(Debug, Default)]
pub struct RelationExtractor;

impl RelationExtractor {
    pub fn new() -> Self {
        RelationExtractor
    }

    /// All edges of `tree`.
    pub fn extract(tree: &SourceComponent) -> Vec<Relation> {
        let root = tree.root();
        RelationExtractor::new().visit_source(root)
    }
}

fn is_external(tree: &SourceComponent, id: ComponentId) -> bool {
    matches!(tree.get(id), Some(Component::External(_)))
}

/// Edges from `owner` to every target in `ty`; `internal` is the kind used
/// for project targets.
fn type_edges(
    tree: &SourceComponent,
    owner: ComponentId,
    ty: &TypeRef,
    internal: RelationKind,
    out: &mut Vec<Relation>,
) {
    for target in ty.targets() {
        let kind = if is_external(tree, target) {
            RelationKind::Usage
        } else {
            internal
        };
        out.push(Relation::new(owner, target, kind));
    }
}

/// Supertype edges: the outer type gets `kind`, generic arguments count as
/// dependencies.
fn supertype_edges(
    tree: &SourceComponent,
    owner: ComponentId,
    ty: &TypeRef,
    kind: RelationKind,
    out: &mut Vec<Relation>,
) {
    if let TypeRef::Declared { target, args, .. } = ty {
        out.push(Relation::new(owner, *target, kind));
        for arg in args {
            type_edges(tree, owner, arg, RelationKind::Dependency, out);
        }
    }
}

fn dedup(relations: Vec<Relation>) -> Vec<Relation> {
    let mut seen = HashSet::new();
    relations.into_iter().filter(|r| seen.insert(*r)).collect()
}

fn owner_of<T>(node: &Handle<'_, T>) -> Option<ComponentId> {
    node.parent().map(|p| p.id())
}

impl RelationExtractor {
    fn members(&mut self, children: Vec<Component<'_>>, out: &mut Vec<Relation>) {
        for child in children {
            if child.is_leaf() {
                out.extend(child.accept(self));
            }
        }
    }
}

impl Visitor for RelationExtractor {
    type Output = Vec<Relation>;

    fn visit_source(&mut self, node: Handle<'_, SourceData>) -> Vec<Relation> {
        let mut out = Vec::new();
        for ty in node.tree().types() {
            out.extend(ty.accept(self));
        }
        dedup(out)
    }

    fn visit_class_or_interface(&mut self, node: Handle<'_, ClassOrInterfaceData>) -> Vec<Relation> {
        let tree = node.tree();
        let mut out = Vec::new();
        for ty in &node.extends {
            supertype_edges(tree, node.id(), ty, RelationKind::Generalization, &mut out);
        }
        for ty in &node.implements {
            supertype_edges(tree, node.id(), ty, RelationKind::Realization, &mut out);
        }
        for inner in &node.nested {
            out.push(Relation::new(node.id(), *inner, RelationKind::Nesting));
        }
        if let Some(component) = node.component() {
            self.members(component.children(), &mut out);
        }
        dedup(out)
    }

    fn visit_enum(&mut self, node: Handle<'_, EnumData>) -> Vec<Relation> {
        let tree = node.tree();
        let mut out = Vec::new();
        for ty in &node.implements {
            supertype_edges(tree, node.id(), ty, RelationKind::Realization, &mut out);
        }
        for inner in &node.nested {
            out.push(Relation::new(node.id(), *inner, RelationKind::Nesting));
        }
        if let Some(component) = node.component() {
            self.members(component.children(), &mut out);
        }
        dedup(out)
    }

    fn visit_constructor(&mut self, node: Handle<'_, ConstructorData>) -> Vec<Relation> {
        let mut out = Vec::new();
        if let Some(owner) = owner_of(&node) {
            for param in &node.parameters {
                type_edges(node.tree(), owner, &param.ty, RelationKind::Dependency, &mut out);
            }
        }
        out
    }

    fn visit_method(&mut self, node: Handle<'_, MethodData>) -> Vec<Relation> {
        let mut out = Vec::new();
        if let Some(owner) = owner_of(&node) {
            type_edges(
                node.tree(),
                owner,
                &node.return_type,
                RelationKind::Dependency,
                &mut out,
            );
            for param in &node.parameters {
                type_edges(node.tree(), owner, &param.ty, RelationKind::Dependency, &mut out);
            }
        }
        out
    }

    fn visit_field(&mut self, node: Handle<'_, FieldData>) -> Vec<Relation> {
        let mut out = Vec::new();
        if let Some(owner) = owner_of(&node) {
            type_edges(node.tree(), owner, &node.ty, RelationKind::Association, &mut out);
        }
        out
    }

    fn visit_enum_constant(&mut self, _node: Handle<'_, EnumConstantData>) -> Vec<Relation> {
        Vec::new()
    }

    fn visit_external(&mut self, _node: Handle<'_, ExternalData>) -> Vec<Relation> {
        Vec::new()
    }
}
