//! Error bridge implementations for root-crate errors.
//!
//! This module provides `impl From<X> for UmlError` conversions from the
//! store, renderer, configuration and pipeline errors to the unified
//! `UmlError` type. The Java front end carries its own bridge.

use tuguml_core::error::UmlError;

use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::progress::InvalidProjectId;
use crate::render::RenderError;
use crate::store::StoreError;

// ============================================================================
// Bridge: StoreError -> UmlError
// ============================================================================

impl From<StoreError> for UmlError {
    fn from(err: StoreError) -> Self {
        UmlError::StoreError {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Bridge: RenderError -> UmlError
// ============================================================================

impl From<RenderError> for UmlError {
    fn from(err: RenderError) -> Self {
        UmlError::RenderError {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Bridge: ConfigError -> UmlError
// ============================================================================

impl From<ConfigError> for UmlError {
    fn from(err: ConfigError) -> Self {
        // Every configuration problem is something the caller can fix.
        UmlError::invalid_args(err.to_string())
    }
}

impl From<InvalidProjectId> for UmlError {
    fn from(err: InvalidProjectId) -> Self {
        UmlError::invalid_args(err.to_string())
    }
}

// ============================================================================
// Bridge: PipelineError -> UmlError
// ============================================================================

impl From<PipelineError> for UmlError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Parse(e) => UmlError::from(e),
            PipelineError::Store(e) => UmlError::from(e),
            PipelineError::Render(e) => UmlError::from(e),
            PipelineError::Task { .. } => UmlError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ProjectId, Stage};
    use std::path::PathBuf;
    use std::time::Duration;
    use tuguml_core::error::OutputErrorCode;
    use tuguml_java::ParseError;

    mod pipeline_error_conversion {
        use super::*;

        #[test]
        fn empty_source_is_input_error() {
            let err = UmlError::from(PipelineError::Parse(ParseError::EmptySourceDirectory {
                path: PathBuf::from("/work/empty"),
            }));
            match &err {
                UmlError::EmptySourceDirectory { path } => assert!(path.contains("empty")),
                other => panic!("expected EmptySourceDirectory, got {:?}", other),
            }
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
        }

        #[test]
        fn render_timeout_is_render_error() {
            let err = UmlError::from(PipelineError::Render(RenderError::Timeout {
                timeout: Duration::from_secs(3),
            }));
            assert_eq!(err.error_code().code(), 5);
            assert!(err.to_string().contains("timed out"));
        }

        #[test]
        fn store_failure_is_store_error() {
            let encode = serde_json::from_str::<u8>("x").unwrap_err();
            let err = UmlError::from(PipelineError::Store(StoreError::Encode(encode)));
            assert_eq!(err.error_code(), OutputErrorCode::StoreError);
        }

        #[test]
        fn task_failure_is_internal() {
            let err = UmlError::from(PipelineError::Task {
                stage: Stage::Render,
                message: "panicked".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
            assert!(err.to_string().contains("render stage"));
        }
    }

    mod input_error_conversion {
        use super::*;

        #[test]
        fn bad_project_id_is_invalid_argument() {
            let err = UmlError::from(ProjectId::new("../etc").unwrap_err());
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn config_error_is_invalid_argument() {
            let err = UmlError::from(ConfigError::PlantUmlNotFound);
            assert_eq!(err.error_code().code(), 2);
            assert!(err.to_string().contains("plantuml"));
        }
    }
}
