//! Visitors over the component tree.
//!
//! [`Visitor`] has one required method per node variant and no defaults, so a
//! visitor that forgets a variant does not compile. [`Component::accept`]
//! dispatches with an exhaustive match.
//!
//! Provided visitors:
//! - [`UmlExtractor`]: PlantUML class-diagram text
//! - [`RelationExtractor`]: directed [`Relation`] edges between components
//! - [`crate::lightweight::LightWeightExtractor`]: the flat, persistable projection
//!
//! [`Component::accept`]: crate::model::Component::accept

mod relation;
mod uml;

pub use relation::{Relation, RelationExtractor, RelationKind};
pub use uml::{UmlExtractor, UmlOptions};

use crate::model::{
    ClassOrInterfaceData, ConstructorData, EnumConstantData, EnumData, ExternalData, FieldData,
    Handle, MethodData, SourceData,
};

/// One operation per concrete node variant.
pub trait Visitor {
    type Output;

    fn visit_source(&mut self, node: Handle<'_, SourceData>) -> Self::Output;
    fn visit_class_or_interface(&mut self, node: Handle<'_, ClassOrInterfaceData>)
        -> Self::Output;
    fn visit_enum(&mut self, node: Handle<'_, EnumData>) -> Self::Output;
    fn visit_constructor(&mut self, node: Handle<'_, ConstructorData>) -> Self::Output;
    fn visit_method(&mut self, node: Handle<'_, MethodData>) -> Self::Output;
    fn visit_field(&mut self, node: Handle<'_, FieldData>) -> Self::Output;
    fn visit_enum_constant(&mut self, node: Handle<'_, EnumConstantData>) -> Self::Output;
    fn visit_external(&mut self, node: Handle<'_, ExternalData>) -> Self::Output;
}
