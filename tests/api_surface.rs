//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Model Types
// ============================================================================

// declaration module - resolved declarations from the front end
use tuguml::declaration::{
    DeclarationKind, Modifiers, ResolvedConstructor, ResolvedEnumConstant, ResolvedField,
    ResolvedMethod, ResolvedParameter, ResolvedType, ResolvedTypeDeclaration, Visibility,
};

// model module - composite component tree
use tuguml::model::{
    ClassOrInterfaceData, Component, ComponentId, ConstructorData, EnumConstantData, EnumData,
    ExternalData, ExternalKey, ExternalRegistry, FieldData, Handle, MethodData, Parameter,
    SourceComponent, SourceData, TypeRef,
};

// visitor module - UML text and relations
use tuguml::visitor::{
    Relation, RelationExtractor, RelationKind, UmlExtractor, UmlOptions, Visitor,
};

// derived artifacts
use tuguml::lightweight::{LightWeight, LightWeightExtractor, LightWeightKind, LightWeightModel};
use tuguml::matrix::DependencyMatrix;

// error module - error types and codes
use tuguml::error::{OutputErrorCode, UmlError};

// ============================================================================
// Java Front End
// ============================================================================

use tuguml::java::resolve::{Resolver, SymbolTable};
use tuguml::java::{JavaSourceParser, ParseError, ParseProgress};

// ============================================================================
// Pipeline Infrastructure
// ============================================================================

use tuguml::config::{
    CliOverrides, ConfigError, ConfigSource, ConfigValue, FileConfig, RendererKind,
    ResolvedConfig,
};
use tuguml::pipeline::{Observation, Pipeline, PipelineError, PipelineReport};
use tuguml::progress::{
    EventStream, EventSubscription, InvalidProjectId, ProgressCache, ProjectId, Stage,
    StageEvent, StageEventKind, StageResult, StreamKey,
};
use tuguml::render::{
    BuiltinSvgRenderer, DiagramRenderer, PlantUmlRenderer, RenderError, RenderedDiagram,
};
use tuguml::store::{
    Artifact, ArtifactKind, ArtifactRef, ArtifactStore, DirectoryStore, MemoryStore, StoreError,
};

// ============================================================================
// Front Door
// ============================================================================

use tuguml::cli::{project_id_for, run_delete, run_generate, run_show, run_uml};
use tuguml::output::{
    emit_json_line, emit_response, DeleteResponse, ErrorInfo, ErrorResponse, GenerateResponse,
    SCHEMA_VERSION,
};

#[test]
fn api_surface_compiles() {
    // Trait objects the pipeline is built from.
    fn _store(_: &dyn ArtifactStore) {}
    fn _renderer(_: &dyn DiagramRenderer) {}

    // Subsystem errors convert into the unified error.
    fn _bridges(p: ParseError, s: StoreError, r: RenderError, c: ConfigError, e: PipelineError) {
        let _: UmlError = p.into();
        let _: UmlError = s.into();
        let _: UmlError = r.into();
        let _: UmlError = c.into();
        let _: UmlError = e.into();
    }
}
