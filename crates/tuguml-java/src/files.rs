//! Java file collection.
//!
//! Walks a source root and returns every `.java` file, skipping hidden
//! directories and anything matching the caller's gitignore-style
//! exclusion globs. Build output is only skipped when excluded explicitly:
//! `build` or `out` is as valid a package segment as any other.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::ParseError;

/// A Java source file found under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root, `/`-separated.
    pub rel_path: String,
    pub abs_path: PathBuf,
}

/// Compile exclusion patterns.
///
/// A bare directory name (`generated/`) excludes that directory at any depth.
pub fn build_exclusions(patterns: &[String]) -> Result<GlobSet, ParseError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        let expanded = if let Some(dir) = trimmed.strip_suffix('/') {
            format!("**/{}/**", dir.trim_start_matches("**/"))
        } else {
            trimmed.to_string()
        };
        let glob = Glob::new(&expanded).map_err(|e| ParseError::Filter {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ParseError::Filter {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

/// Collect `.java` files under `root`, sorted by relative path.
pub fn collect_java_files(root: &Path, exclusions: &GlobSet) -> Result<Vec<SourceFile>, ParseError> {
    if !root.is_dir() {
        return Err(ParseError::SourceRootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.')
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "java") {
            continue;
        }
        // Filter on the root-relative path so temp directory names never match.
        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if exclusions.is_match(rel_path) {
            continue;
        }
        files.push(SourceFile {
            rel_path: rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            abs_path: path.to_path_buf(),
        });
    }

    // Sorted for deterministic component ids.
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    fn names(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.rel_path.as_str()).collect()
    }

    #[test]
    fn collects_sorted_java_files_only() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/b/B.java");
        touch(dir.path(), "src/a/A.java");
        touch(dir.path(), "README.md");
        let files = collect_java_files(dir.path(), &GlobSet::empty()).unwrap();
        assert_eq!(names(&files), vec!["src/a/A.java", "src/b/B.java"]);
    }

    #[test]
    fn skips_hidden_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "A.java");
        touch(dir.path(), ".git/Hidden.java");
        let files = collect_java_files(dir.path(), &GlobSet::empty()).unwrap();
        assert_eq!(names(&files), vec!["A.java"]);
    }

    #[test]
    fn package_segments_named_like_build_dirs_are_collected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "com/acme/build/Builder.java");
        touch(dir.path(), "com/acme/out/Printer.java");
        touch(dir.path(), "com/acme/target/Goal.java");
        let files = collect_java_files(dir.path(), &GlobSet::empty()).unwrap();
        assert_eq!(
            names(&files),
            vec![
                "com/acme/build/Builder.java",
                "com/acme/out/Printer.java",
                "com/acme/target/Goal.java",
            ]
        );
    }

    #[test]
    fn build_output_is_skipped_when_excluded() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/A.java");
        touch(dir.path(), "target/classes/Gen.java");
        let exclusions = build_exclusions(&["target/".to_string()]).unwrap();
        let files = collect_java_files(dir.path(), &exclusions).unwrap();
        assert_eq!(names(&files), vec!["src/A.java"]);
    }

    #[test]
    fn applies_exclusion_globs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main/A.java");
        touch(dir.path(), "main/ATest.java");
        touch(dir.path(), "generated/G.java");
        let exclusions =
            build_exclusions(&["**/*Test.java".to_string(), "generated/".to_string()]).unwrap();
        let files = collect_java_files(dir.path(), &exclusions).unwrap();
        assert_eq!(names(&files), vec!["main/A.java"]);
    }

    #[test]
    fn bad_glob_is_a_filter_error() {
        let err = build_exclusions(&["src/[".to_string()]).unwrap_err();
        assert!(matches!(err, ParseError::Filter { .. }));
    }

    #[test]
    fn missing_root_is_reported() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = collect_java_files(&missing, &GlobSet::empty()).unwrap_err();
        assert!(matches!(err, ParseError::SourceRootNotFound { .. }));
    }
}
