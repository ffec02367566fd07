//! tuguml: Java sources to UML class diagrams.
//!
//! Parses a Java source tree, builds a component model of its types,
//! and runs the generation pipeline (persist, UML text, diagram,
//! dependency matrix) with per-stage progress streams.

// Model and visitors - re-exported from tuguml-core
pub use tuguml_core::declaration;
pub use tuguml_core::error;
pub use tuguml_core::lightweight;
pub use tuguml_core::matrix;
pub use tuguml_core::model;
pub use tuguml_core::visitor;

// Java front end
pub use tuguml_java as java;

// Pipeline infrastructure
pub mod config;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod store;
pub mod util;

// Front door
pub mod cli;
pub mod output;

// Error bridges - converts subsystem errors to UmlError
mod error_bridges;
