//! Java front end for tuguml.
//!
//! [`JavaSourceParser`] is the symbol resolution facade: it collects the
//! `.java` files under a source root, parses them in parallel with
//! tree-sitter, resolves every declaration against the project's symbol
//! table and builds the [`SourceComponent`] tree.
//!
//! Files that fail to parse are dropped with a warning. Parsing fails only
//! when no file parses at all.

pub mod files;
pub mod resolve;
pub mod syntax;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use tuguml_core::declaration::ResolvedTypeDeclaration;
use tuguml_core::error::UmlError;
use tuguml_core::model::SourceComponent;

use crate::files::{build_exclusions, collect_java_files, SourceFile};
use crate::resolve::{Resolver, SymbolTable};
use crate::syntax::{java_parser, parse_unit, CompilationUnit};

// ============================================================================
// Errors
// ============================================================================

/// Errors from the Java front end.
#[derive(Debug, Error)]
pub enum ParseError {
    /// No file under the root produced a usable compilation unit.
    #[error("no parseable Java sources under {}", .path.display())]
    EmptySourceDirectory { path: PathBuf },

    #[error("source root not found: {}", .path.display())]
    SourceRootNotFound { path: PathBuf },

    /// The tree-sitter grammar is incompatible with the linked runtime.
    #[error("cannot load Java grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("invalid exclusion pattern {pattern:?}: {message}")]
    Filter { pattern: String, message: String },
}

impl From<ParseError> for UmlError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::EmptySourceDirectory { path } => UmlError::EmptySourceDirectory {
                path: path.display().to_string(),
            },
            ParseError::SourceRootNotFound { path } => UmlError::SourceNotFound {
                path: path.display().to_string(),
            },
            ParseError::Filter { .. } => UmlError::invalid_args(err.to_string()),
            ParseError::Language(_) => UmlError::internal(err.to_string()),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Parse progress, reported once per finished file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    pub parsed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ParseProgress {
    /// Finished files as a percentage of all files.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = (self.parsed + self.failed).min(self.total);
        ((done * 100) / self.total) as u8
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Parses and resolves a Java source tree.
#[derive(Debug, Clone, Default)]
pub struct JavaSourceParser {
    exclusions: Vec<String>,
    name: Option<String>,
}

impl JavaSourceParser {
    pub fn new() -> Self {
        JavaSourceParser::default()
    }

    /// Skip files matching these gitignore-style globs, relative to the root.
    pub fn with_exclusions(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclusions = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Name of the source root component. Defaults to the root directory name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse and resolve every top-level declaration under `root`.
    pub fn resolve(&self, root: &Path) -> Result<Vec<ResolvedTypeDeclaration>, ParseError> {
        self.resolve_with_progress(root, &|_| {})
    }

    pub fn resolve_with_progress(
        &self,
        root: &Path,
        progress: &(dyn Fn(ParseProgress) + Sync),
    ) -> Result<Vec<ResolvedTypeDeclaration>, ParseError> {
        let exclusions = build_exclusions(&self.exclusions)?;
        let files = collect_java_files(root, &exclusions)?;
        // Fail fast on a broken grammar rather than once per worker.
        java_parser()?;

        let units = parse_files(&files, progress);
        if units.is_empty() {
            return Err(ParseError::EmptySourceDirectory {
                path: root.to_path_buf(),
            });
        }

        let table = SymbolTable::build(&units);
        let resolver = Resolver::new(&table);
        let declarations: Vec<ResolvedTypeDeclaration> =
            units.iter().flat_map(|u| resolver.resolve_unit(u)).collect();
        info!(
            root = %root.display(),
            files = files.len(),
            units = units.len(),
            types = table.len(),
            "resolved Java sources"
        );
        Ok(declarations)
    }

    /// Parse `root` into a component tree.
    pub fn parse(&self, root: &Path) -> Result<SourceComponent, ParseError> {
        self.parse_with_progress(root, &|_| {})
    }

    pub fn parse_with_progress(
        &self,
        root: &Path,
        progress: &(dyn Fn(ParseProgress) + Sync),
    ) -> Result<SourceComponent, ParseError> {
        let declarations = self.resolve_with_progress(root, progress)?;
        Ok(SourceComponent::build(self.root_name(root), declarations))
    }

    fn root_name(&self, root: &Path) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Parse `root` with default settings.
pub fn parse(root: &Path) -> Result<SourceComponent, ParseError> {
    JavaSourceParser::new().parse(root)
}

/// Parse every file in parallel, one tree-sitter parser per worker.
///
/// Results keep the order of `files`.
fn parse_files(files: &[SourceFile], progress: &(dyn Fn(ParseProgress) + Sync)) -> Vec<CompilationUnit> {
    let total = files.len();
    let counts = Mutex::new((0usize, 0usize));

    // Reported under the lock so events arrive in count order.
    let report = |ok: bool| {
        let mut counts = counts.lock().unwrap_or_else(PoisonError::into_inner);
        if ok {
            counts.0 += 1;
        } else {
            counts.1 += 1;
        }
        progress(ParseProgress {
            parsed: counts.0,
            failed: counts.1,
            total,
        });
    };

    let results: Vec<Option<CompilationUnit>> = files
        .par_iter()
        .map_init(
            || java_parser().ok(),
            |parser, file| {
                let unit = parser.as_mut().and_then(|parser| parse_file(parser, file));
                report(unit.is_some());
                unit
            },
        )
        .collect();

    let units: Vec<CompilationUnit> = results.into_iter().flatten().collect();
    debug!(
        total,
        parsed = units.len(),
        failed = total - units.len(),
        "parsed compilation units"
    );
    units
}

fn parse_file(parser: &mut tree_sitter::Parser, file: &SourceFile) -> Option<CompilationUnit> {
    let source = match std::fs::read_to_string(&file.abs_path) {
        Ok(s) => s,
        Err(e) => {
            warn!(file = %file.rel_path, error = %e, "skipping unreadable file");
            return None;
        }
    };
    match parse_unit(parser, &file.rel_path, &source) {
        Ok(unit) => Some(unit),
        Err(e) => {
            warn!(file = %file.rel_path, error = %e, "skipping file that failed to parse");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_counts_failures_as_done() {
        let p = ParseProgress {
            parsed: 1,
            failed: 1,
            total: 4,
        };
        assert_eq!(p.percent(), 50);
        let empty = ParseProgress {
            parsed: 0,
            failed: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 100);
    }

    #[test]
    fn parse_errors_bridge_to_output_codes() {
        let empty: UmlError = ParseError::EmptySourceDirectory {
            path: PathBuf::from("/src"),
        }
        .into();
        assert_eq!(empty.error_code().code(), 2);
        let missing: UmlError = ParseError::SourceRootNotFound {
            path: PathBuf::from("/nope"),
        }
        .into();
        assert!(matches!(missing, UmlError::SourceNotFound { .. }));
        let filter: UmlError = ParseError::Filter {
            pattern: "[".to_string(),
            message: "unclosed".to_string(),
        }
        .into();
        assert_eq!(filter.error_code().code(), 2);
    }

    #[test]
    fn root_name_defaults_to_directory() {
        let parser = JavaSourceParser::new();
        assert_eq!(parser.root_name(Path::new("/work/shop")), "shop");
        let named = JavaSourceParser::new().with_name("demo");
        assert_eq!(named.root_name(Path::new("/work/shop")), "demo");
    }
}
