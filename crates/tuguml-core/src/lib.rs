//! Core model for tuguml.
//!
//! This crate is language-agnostic:
//! - Resolved declarations handed over by a language front end
//! - The composite component tree with deduplicated external components
//! - Visitors producing UML text, relation edges and the lightweight model
//! - The dependency matrix between project types
//! - Error types and error codes

pub mod declaration;
pub mod error;
pub mod lightweight;
pub mod matrix;
pub mod model;
pub mod visitor;
