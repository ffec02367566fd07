//! UmlExtractor: PlantUML class-diagram text.
//!
//! Each node renders to text:
//! - source root: the whole `@startuml` ... `@enduml` document
//! - class, interface, enum: a block with one line per member; nested types
//!   are rendered as their own blocks by the root, not inside their owner
//! - field: `- {static} int count`
//! - method: `+ {abstract} void resize(int, int)`
//! - constructor: `+ <<create>> Widget()`
//! - enum constant: `RED`
//! - external: `class java.util.List`

use super::{RelationExtractor, Visitor};
use crate::declaration::{Modifiers, Visibility};
use crate::model::{
    ClassOrInterfaceData, Component, ConstructorData, EnumConstantData, EnumData, ExternalData,
    FieldData, Handle, MethodData, SourceComponent, SourceData,
};

/// Rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmlOptions {
    /// Emit external components and the edges that reach them.
    pub include_externals: bool,
}

impl Default for UmlOptions {
    fn default() -> Self {
        UmlOptions {
            include_externals: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct UmlExtractor {
    options: UmlOptions,
}

impl UmlExtractor {
    pub fn new() -> Self {
        UmlExtractor::default()
    }

    pub fn with_options(options: UmlOptions) -> Self {
        UmlExtractor { options }
    }

    /// The full diagram document for `tree`.
    pub fn generate(tree: &SourceComponent, options: UmlOptions) -> String {
        UmlExtractor::with_options(options).visit_source(tree.root())
    }

    fn block(&mut self, header: String, children: Vec<Component<'_>>) -> String {
        let mut out = header;
        out.push_str(" {\n");
        for child in children.iter().filter(|c| c.is_leaf()) {
            out.push_str("  ");
            out.push_str(&child.accept(self));
            out.push('\n');
        }
        out.push('}');
        out
    }
}

fn modifier_prefix(modifiers: &Modifiers) -> String {
    let mut out = String::new();
    if modifiers.is_static {
        out.push_str("{static} ");
    }
    if modifiers.is_abstract {
        out.push_str("{abstract} ");
    }
    out
}

fn type_parameter_suffix(params: &[String]) -> String {
    if params.is_empty() {
        String::new()
    } else {
        format!("<{}>", params.join(", "))
    }
}

fn symbol(visibility: Visibility) -> char {
    visibility.symbol()
}

impl Visitor for UmlExtractor {
    type Output = String;

    fn visit_source(&mut self, node: Handle<'_, SourceData>) -> String {
        let tree = node.tree();
        let mut out = String::from("@startuml\n");
        if !node.name.is_empty() {
            out.push_str(&format!("title {}\n", node.name));
        }
        out.push_str("set namespaceSeparator none\n");

        for ty in tree.types() {
            out.push('\n');
            out.push_str(&ty.accept(self));
            out.push('\n');
        }

        if self.options.include_externals {
            let externals = tree.external_components();
            if !externals.is_empty() {
                out.push('\n');
            }
            for ext in externals {
                out.push_str(&self.visit_external(ext));
                out.push('\n');
            }
        }

        let relations = RelationExtractor::extract(tree);
        let mut lines = Vec::new();
        for relation in relations {
            let external_end = [relation.from, relation.to]
                .iter()
                .any(|id| matches!(tree.get(*id), Some(Component::External(_))));
            if external_end && !self.options.include_externals {
                continue;
            }
            if let Some(line) = relation.render(tree) {
                lines.push(line);
            }
        }
        if !lines.is_empty() {
            out.push('\n');
            for line in lines {
                out.push_str(&line);
                out.push('\n');
            }
        }

        out.push_str("@enduml\n");
        out
    }

    fn visit_class_or_interface(&mut self, node: Handle<'_, ClassOrInterfaceData>) -> String {
        let keyword = if node.is_interface {
            "interface"
        } else if node.modifiers.is_abstract {
            "abstract class"
        } else {
            "class"
        };
        let header = format!(
            "{} {}{}",
            keyword,
            node.qualified_name,
            type_parameter_suffix(&node.type_parameters)
        );
        let children = node.component().map(|c| c.children()).unwrap_or_default();
        self.block(header, children)
    }

    fn visit_enum(&mut self, node: Handle<'_, EnumData>) -> String {
        let header = format!("enum {}", node.qualified_name);
        let children = node.component().map(|c| c.children()).unwrap_or_default();
        self.block(header, children)
    }

    fn visit_constructor(&mut self, node: Handle<'_, ConstructorData>) -> String {
        format!("{} <<create>> {}", symbol(node.visibility), node.signature)
    }

    fn visit_method(&mut self, node: Handle<'_, MethodData>) -> String {
        let generics = if node.type_parameters.is_empty() {
            String::new()
        } else {
            format!("{} ", type_parameter_suffix(&node.type_parameters))
        };
        format!(
            "{} {}{}{} {}",
            symbol(node.visibility),
            modifier_prefix(&node.modifiers),
            generics,
            node.return_type.describe(node.tree()),
            node.signature
        )
    }

    fn visit_field(&mut self, node: Handle<'_, FieldData>) -> String {
        format!(
            "{} {}{} {}",
            symbol(node.visibility),
            modifier_prefix(&node.modifiers),
            node.ty.describe(node.tree()),
            node.name
        )
    }

    fn visit_enum_constant(&mut self, node: Handle<'_, EnumConstantData>) -> String {
        node.name.clone()
    }

    fn visit_external(&mut self, node: Handle<'_, ExternalData>) -> String {
        format!("class {}", node.qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{
        DeclarationKind, ResolvedConstructor, ResolvedEnumConstant, ResolvedField, ResolvedMethod,
        ResolvedParameter, ResolvedType, ResolvedTypeDeclaration,
    };

    fn sample() -> SourceComponent {
        let mut shape = ResolvedTypeDeclaration::new(DeclarationKind::Class, "geo", "Shape");
        shape.modifiers = Modifiers::none().with_abstract();
        shape.visibility = Visibility::Public;
        let mut count = ResolvedField::new("count", Visibility::Private, ResolvedType::primitive("int"));
        count.modifiers = Modifiers::none().with_static();
        shape.fields.push(count);
        shape.fields.push(ResolvedField::new(
            "tags",
            Visibility::Protected,
            ResolvedType::external("java.lang.String", "java.lang").array_of(1),
        ));
        shape
            .constructors
            .push(ResolvedConstructor::new("Shape", Visibility::Public));
        let mut area = ResolvedMethod::new("area", Visibility::Public, ResolvedType::primitive("double"));
        area.modifiers = Modifiers::none().with_abstract();
        shape.methods.push(area);
        let mut scale = ResolvedMethod::new("scale", Visibility::Package, ResolvedType::Void);
        scale
            .parameters
            .push(ResolvedParameter::new("factor", ResolvedType::primitive("double")));
        shape.methods.push(scale);

        let mut color = ResolvedTypeDeclaration::nested_in(&shape, DeclarationKind::Enum, "Color");
        color.constants.push(ResolvedEnumConstant::new("RED"));
        shape.nested.push(color);

        let mut circle = ResolvedTypeDeclaration::new(DeclarationKind::Class, "geo", "Circle");
        circle.extends.push(ResolvedType::project("geo.Shape"));
        let mut holder = ResolvedTypeDeclaration::new(DeclarationKind::Interface, "geo", "Holder");
        holder.type_parameters.push("T".to_string());

        SourceComponent::build("geo", vec![shape, circle, holder])
    }

    #[test]
    fn member_lines() {
        let tree = sample();
        let mut uml = UmlExtractor::new();
        let line = |name: &str, uml: &mut UmlExtractor| tree.find(name).unwrap().accept(uml);
        assert_eq!(line("geo.Shape.count", &mut uml), "- {static} int count");
        assert_eq!(line("geo.Shape.tags", &mut uml), "# String[] tags");
        assert_eq!(line("geo.Shape.Shape()", &mut uml), "+ <<create>> Shape()");
        assert_eq!(line("geo.Shape.area()", &mut uml), "+ {abstract} double area()");
        assert_eq!(
            line("geo.Shape.scale(double)", &mut uml),
            "~ void scale(double)"
        );
        assert_eq!(line("geo.Shape.Color.RED", &mut uml), "RED");
    }

    #[test]
    fn type_blocks() {
        let tree = sample();
        let mut uml = UmlExtractor::new();
        let shape = tree.type_by_name("geo.Shape").unwrap().accept(&mut uml);
        assert!(shape.starts_with("abstract class geo.Shape {\n"));
        assert!(shape.contains("\n  - {static} int count\n"));
        assert!(shape.ends_with('}'));
        assert!(!shape.contains("RED"));

        let holder = tree.type_by_name("geo.Holder").unwrap().accept(&mut uml);
        assert_eq!(holder, "interface geo.Holder<T> {\n}");
        let color = tree.type_by_name("geo.Shape.Color").unwrap().accept(&mut uml);
        assert_eq!(color, "enum geo.Shape.Color {\n  RED\n}");
    }

    #[test]
    fn every_variant_renders_its_name() {
        let tree = sample();
        let mut uml = UmlExtractor::new();
        let mut seen = std::collections::HashSet::new();
        for component in tree.iter() {
            let text = component.accept(&mut uml);
            assert!(!text.is_empty());
            if !matches!(component, Component::Source(_)) {
                assert!(
                    text.contains(component.name()),
                    "{} missing from {:?}",
                    component.name(),
                    text
                );
            } else {
                assert!(text.contains("geo"));
            }
            seen.insert(component.kind_name());
        }
        for kind in [
            "source",
            "class",
            "enum",
            "constructor",
            "method",
            "field",
            "enum_constant",
            "external",
        ] {
            assert!(seen.contains(kind), "no {} in sample", kind);
        }
    }

    #[test]
    fn document_frame_and_relations() {
        let tree = sample();
        let doc = UmlExtractor::generate(&tree, UmlOptions::default());
        assert!(doc.starts_with("@startuml\n"));
        assert!(doc.ends_with("@enduml\n"));
        assert!(doc.contains("set namespaceSeparator none"));
        assert!(doc.contains("class java.lang.String\n"));
        assert!(doc.contains("geo.Shape <|-- geo.Circle\n"));
        assert!(doc.contains("geo.Shape +-- geo.Shape.Color\n"));
        assert!(doc.contains("geo.Shape ..> java.lang.String : <<use>>\n"));
    }

    #[test]
    fn externals_can_be_left_out() {
        let tree = sample();
        let doc = UmlExtractor::generate(
            &tree,
            UmlOptions {
                include_externals: false,
            },
        );
        assert!(!doc.contains("class java.lang.String"));
        assert!(!doc.contains("<<use>>"));
        assert!(doc.contains("geo.Shape <|-- geo.Circle"));
    }
}
