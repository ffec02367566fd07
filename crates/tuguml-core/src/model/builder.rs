//! Tree construction from resolved declarations.
//!
//! Two passes over the declaration list:
//! 1. allocate one composite per type (nested types included) and index it
//!    by fully qualified name, so forward references between files resolve;
//! 2. link supertypes and create member leaves, interning external
//!    components as they are met.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{
    ClassOrInterfaceData, ComponentId, ConstructorData, EnumConstantData, EnumData,
    ExternalData, ExternalKey, ExternalRegistry, FieldData, MethodData, Node, NodeKind,
    Parameter, SourceComponent, SourceData, TypeRef,
};
use crate::declaration::{
    simple_name, DeclarationKind, ResolvedParameter, ResolvedType, ResolvedTypeDeclaration,
};

impl SourceComponent {
    /// Build the tree for `declarations`.
    ///
    /// A type whose qualified name was already seen is dropped with a warning.
    /// Project references to a name with no declaration become
    /// [`TypeRef::Unresolved`].
    pub fn build(name: impl Into<String>, declarations: Vec<ResolvedTypeDeclaration>) -> Self {
        let mut tree = SourceComponent {
            nodes: vec![Node {
                parent: None,
                kind: NodeKind::Source(SourceData {
                    name: name.into(),
                    types: Vec::new(),
                }),
            }],
            externals: ExternalRegistry::default(),
            types_by_name: HashMap::new(),
        };

        let mut allocated = Vec::new();
        for decl in &declarations {
            if let Some(id) = tree.allocate_type(decl, SourceComponent::ROOT, &mut allocated) {
                if let NodeKind::Source(source) = &mut tree.nodes[0].kind {
                    source.types.push(id);
                }
            }
        }

        for (id, decl) in allocated {
            tree.populate_type(id, decl);
        }

        debug!(
            types = tree.types_by_name.len(),
            externals = tree.externals.len(),
            nodes = tree.nodes.len(),
            "built component tree"
        );
        tree
    }

    fn push(&mut self, parent: Option<ComponentId>, kind: NodeKind) -> ComponentId {
        let id = ComponentId(self.nodes.len() as u32);
        self.nodes.push(Node { parent, kind });
        id
    }

    /// Pass 1: allocate `decl` and its nested types with empty member lists.
    fn allocate_type<'d>(
        &mut self,
        decl: &'d ResolvedTypeDeclaration,
        parent: ComponentId,
        allocated: &mut Vec<(ComponentId, &'d ResolvedTypeDeclaration)>,
    ) -> Option<ComponentId> {
        if self.types_by_name.contains_key(&decl.qualified_name) {
            warn!(
                name = %decl.qualified_name,
                path = ?decl.source_path,
                "duplicate type declaration ignored"
            );
            return None;
        }

        let kind = match decl.kind {
            DeclarationKind::Class | DeclarationKind::Interface => {
                NodeKind::ClassOrInterface(ClassOrInterfaceData {
                    name: decl.name.clone(),
                    package: decl.package.clone(),
                    qualified_name: decl.qualified_name.clone(),
                    is_interface: decl.is_interface(),
                    visibility: decl.visibility,
                    modifiers: decl.modifiers,
                    type_parameters: decl.type_parameters.clone(),
                    extends: Vec::new(),
                    implements: Vec::new(),
                    members: Vec::new(),
                    nested: Vec::new(),
                    source_path: decl.source_path.clone(),
                })
            }
            DeclarationKind::Enum => NodeKind::Enum(EnumData {
                name: decl.name.clone(),
                package: decl.package.clone(),
                qualified_name: decl.qualified_name.clone(),
                visibility: decl.visibility,
                modifiers: decl.modifiers,
                implements: Vec::new(),
                members: Vec::new(),
                nested: Vec::new(),
                source_path: decl.source_path.clone(),
            }),
        };
        let id = self.push(Some(parent), kind);
        self.types_by_name.insert(decl.qualified_name.clone(), id);
        allocated.push((id, decl));

        let mut nested = Vec::new();
        for inner in &decl.nested {
            if let Some(inner_id) = self.allocate_type(inner, id, allocated) {
                nested.push(inner_id);
            }
        }
        match &mut self.nodes[id.index()].kind {
            NodeKind::ClassOrInterface(data) => data.nested = nested,
            NodeKind::Enum(data) => data.nested = nested,
            _ => {}
        }
        Some(id)
    }

    /// Pass 2: supertypes and member leaves, in the order constants, fields,
    /// constructors, methods.
    fn populate_type(&mut self, id: ComponentId, decl: &ResolvedTypeDeclaration) {
        let extends: Vec<TypeRef> = decl.extends.iter().map(|t| self.link(t)).collect();
        let implements: Vec<TypeRef> = decl.implements.iter().map(|t| self.link(t)).collect();

        let mut members = Vec::new();
        for constant in &decl.constants {
            members.push(self.push(
                Some(id),
                NodeKind::EnumConstant(EnumConstantData {
                    name: constant.name.clone(),
                    has_body: constant.has_body,
                }),
            ));
        }
        for field in &decl.fields {
            let ty = self.link(&field.ty);
            members.push(self.push(
                Some(id),
                NodeKind::Field(FieldData {
                    name: field.name.clone(),
                    visibility: field.visibility,
                    modifiers: field.modifiers,
                    ty,
                }),
            ));
        }
        for ctor in &decl.constructors {
            let parameters = self.link_parameters(&ctor.parameters);
            members.push(self.push(
                Some(id),
                NodeKind::Constructor(ConstructorData {
                    name: ctor.name.clone(),
                    visibility: ctor.visibility,
                    parameters,
                    signature: ctor.signature(),
                }),
            ));
        }
        for method in &decl.methods {
            let return_type = self.link(&method.return_type);
            let parameters = self.link_parameters(&method.parameters);
            members.push(self.push(
                Some(id),
                NodeKind::Method(MethodData {
                    name: method.name.clone(),
                    visibility: method.visibility,
                    modifiers: method.modifiers,
                    type_parameters: method.type_parameters.clone(),
                    return_type,
                    parameters,
                    signature: method.signature(),
                }),
            ));
        }

        match &mut self.nodes[id.index()].kind {
            NodeKind::ClassOrInterface(data) => {
                data.extends = extends;
                data.implements = implements;
                data.members = members;
            }
            NodeKind::Enum(data) => {
                data.implements = implements;
                data.members = members;
            }
            _ => {}
        }
    }

    fn link_parameters(&mut self, parameters: &[ResolvedParameter]) -> Vec<Parameter> {
        parameters
            .iter()
            .map(|p| Parameter {
                name: p.name.clone(),
                ty: self.link(&p.ty),
                varargs: p.varargs,
            })
            .collect()
    }

    /// Turn a resolved type into a tree reference.
    fn link(&mut self, ty: &ResolvedType) -> TypeRef {
        match ty {
            ResolvedType::Primitive { name, dims } => TypeRef::Primitive {
                name: name.clone(),
                dims: *dims,
            },
            ResolvedType::Void => TypeRef::Void,
            ResolvedType::Project {
                qualified_name,
                args,
                dims,
            } => match self.types_by_name.get(qualified_name).copied() {
                Some(target) => TypeRef::Declared {
                    target,
                    args: args.iter().map(|a| self.link(a)).collect(),
                    dims: *dims,
                },
                None => {
                    debug!(name = %qualified_name, "project type has no declaration");
                    TypeRef::Unresolved {
                        name: simple_name(qualified_name).to_string(),
                        dims: *dims,
                    }
                }
            },
            ResolvedType::External {
                qualified_name,
                package,
                args,
                dims,
            } => {
                let target = self.intern_external(qualified_name, package);
                TypeRef::Declared {
                    target,
                    args: args.iter().map(|a| self.link(a)).collect(),
                    dims: *dims,
                }
            }
            ResolvedType::TypeVariable { name, dims } => TypeRef::TypeVariable {
                name: name.clone(),
                dims: *dims,
            },
            ResolvedType::Wildcard { bound, upper } => TypeRef::Wildcard {
                bound: bound.as_ref().map(|b| Box::new(self.link(b))),
                upper: *upper,
            },
            ResolvedType::Unresolved { name, dims } => TypeRef::Unresolved {
                name: name.clone(),
                dims: *dims,
            },
        }
    }

    fn intern_external(&mut self, qualified_name: &str, package: &str) -> ComponentId {
        let key = ExternalKey::new(qualified_name, package);
        if let Some(existing) = self.externals.get(&key) {
            return existing;
        }
        let fresh = ComponentId(self.nodes.len() as u32);
        let (id, inserted) = self.externals.intern(key, fresh);
        if inserted {
            self.nodes.push(Node {
                parent: None,
                kind: NodeKind::External(ExternalData {
                    qualified_name: qualified_name.to_string(),
                    package: package.to_string(),
                }),
            });
        }
        id
    }
}
