//! Lightweight model: a flat, serializable projection of the component tree.
//!
//! This is what the persist stage stores. Every component becomes one
//! [`LightWeight`] entry carrying its own id and its parent's id, and every
//! method and constructor is indexed by qualified signature in
//! [`LightWeightModel::method_signatures`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::declaration::{Modifiers, Visibility};
use crate::model::{
    ClassOrInterfaceData, Component, ComponentId, ConstructorData, EnumConstantData, EnumData,
    ExternalData, FieldData, Handle, MethodData, SourceComponent, SourceData,
};
use crate::visitor::Visitor;

/// Kind tag of a lightweight entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightWeightKind {
    Source,
    Class,
    Interface,
    Enum,
    Constructor,
    Method,
    Field,
    EnumConstant,
    External,
}

/// One component, flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightWeight {
    pub id: ComponentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ComponentId>,
    pub kind: LightWeightKind,
    pub name: String,
    pub qualified_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifiers: Option<Modifiers>,
    /// Field type, or method return type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Method or constructor signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl LightWeight {
    fn new<T>(node: &Handle<'_, T>, kind: LightWeightKind, name: &str) -> Self {
        let parent = node.parent().map(|p| p.id());
        LightWeight {
            id: node.id(),
            parent,
            kind,
            name: name.to_string(),
            qualified_name: node.qualified_name(),
            visibility: None,
            modifiers: None,
            type_name: None,
            signature: None,
            package: None,
        }
    }
}

/// The persisted lightweight projection of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightWeightModel {
    pub project_name: String,
    pub entries: Vec<LightWeight>,
    /// Qualified method/constructor signature to component id.
    pub method_signatures: BTreeMap<String, ComponentId>,
}

impl LightWeightModel {
    /// Flatten `tree`.
    pub fn from_tree(tree: &SourceComponent) -> Self {
        let entries = LightWeightExtractor.visit_source(tree.root());
        let method_signatures = entries
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    LightWeightKind::Method | LightWeightKind::Constructor
                )
            })
            .map(|e| (e.qualified_name.clone(), e.id))
            .collect();
        LightWeightModel {
            project_name: tree.name().to_string(),
            entries,
            method_signatures,
        }
    }

    pub fn entry(&self, id: ComponentId) -> Option<&LightWeight> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn children_of(&self, id: ComponentId) -> Vec<&LightWeight> {
        self.entries
            .iter()
            .filter(|e| e.parent == Some(id))
            .collect()
    }

    /// Id of a method or constructor by qualified signature
    /// (`com.acme.Widget.resize(int, int)`).
    pub fn method_id(&self, signature: &str) -> Option<ComponentId> {
        self.method_signatures.get(signature).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Visitor producing [`LightWeight`] entries: one per leaf, the node plus its
/// whole subtree for composites, and the root adds the external components.
#[derive(Debug, Default)]
pub struct LightWeightExtractor;

impl LightWeightExtractor {
    fn subtree(&mut self, entry: LightWeight, component: Option<Component<'_>>) -> Vec<LightWeight> {
        let mut out = vec![entry];
        if let Some(component) = component {
            for child in component.children() {
                out.extend(child.accept(self));
            }
        }
        out
    }
}

impl Visitor for LightWeightExtractor {
    type Output = Vec<LightWeight>;

    fn visit_source(&mut self, node: Handle<'_, SourceData>) -> Vec<LightWeight> {
        let entry = LightWeight::new(&node, LightWeightKind::Source, &node.name);
        let mut out = self.subtree(entry, node.component());
        for ext in node.tree().external_components() {
            out.extend(self.visit_external(ext));
        }
        out
    }

    fn visit_class_or_interface(&mut self, node: Handle<'_, ClassOrInterfaceData>) -> Vec<LightWeight> {
        let kind = if node.is_interface {
            LightWeightKind::Interface
        } else {
            LightWeightKind::Class
        };
        let mut entry = LightWeight::new(&node, kind, &node.name);
        entry.visibility = Some(node.visibility);
        entry.modifiers = Some(node.modifiers);
        entry.package = Some(node.package.clone());
        self.subtree(entry, node.component())
    }

    fn visit_enum(&mut self, node: Handle<'_, EnumData>) -> Vec<LightWeight> {
        let mut entry = LightWeight::new(&node, LightWeightKind::Enum, &node.name);
        entry.visibility = Some(node.visibility);
        entry.modifiers = Some(node.modifiers);
        entry.package = Some(node.package.clone());
        self.subtree(entry, node.component())
    }

    fn visit_constructor(&mut self, node: Handle<'_, ConstructorData>) -> Vec<LightWeight> {
        let mut entry = LightWeight::new(&node, LightWeightKind::Constructor, &node.name);
        entry.visibility = Some(node.visibility);
        entry.signature = Some(node.signature.clone());
        vec![entry]
    }

    fn visit_method(&mut self, node: Handle<'_, MethodData>) -> Vec<LightWeight> {
        let mut entry = LightWeight::new(&node, LightWeightKind::Method, &node.name);
        entry.visibility = Some(node.visibility);
        entry.modifiers = Some(node.modifiers);
        entry.type_name = Some(node.return_type.describe(node.tree()));
        entry.signature = Some(node.signature.clone());
        vec![entry]
    }

    fn visit_field(&mut self, node: Handle<'_, FieldData>) -> Vec<LightWeight> {
        let mut entry = LightWeight::new(&node, LightWeightKind::Field, &node.name);
        entry.visibility = Some(node.visibility);
        entry.modifiers = Some(node.modifiers);
        entry.type_name = Some(node.ty.describe(node.tree()));
        vec![entry]
    }

    fn visit_enum_constant(&mut self, node: Handle<'_, EnumConstantData>) -> Vec<LightWeight> {
        vec![LightWeight::new(
            &node,
            LightWeightKind::EnumConstant,
            &node.name,
        )]
    }

    fn visit_external(&mut self, node: Handle<'_, ExternalData>) -> Vec<LightWeight> {
        let mut entry = LightWeight::new(&node, LightWeightKind::External, &node.qualified_name);
        entry.package = Some(node.package.clone());
        vec![entry]
    }
}
