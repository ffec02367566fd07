//! tuguml CLI binary entry point.
//!
//! ## Usage
//!
//! ```bash
//! # Run every stage, streaming JSON-line events, artifacts under .tuguml/
//! tuguml generate src/main/java --project shop
//!
//! # Print the UML text only
//! tuguml uml src/main/java --no-externals
//!
//! # Print a stored artifact as JSON
//! tuguml show --project shop --kind dependency_matrix
//!
//! # Remove a project's artifacts
//! tuguml delete --project shop
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tuguml::cli::{
    out_dir_or_default, project_id_for, run_delete, run_generate, run_show, run_uml,
};
use tuguml::config::{CliOverrides, RendererKind, ResolvedConfig};
use tuguml::output::{emit_response, ErrorResponse};
use tuguml::progress::ProjectId;
use tuguml::store::ArtifactKind;
use tuguml_core::error::{OutputErrorCode, UmlError};

// ============================================================================
// CLI Structure
// ============================================================================

/// Java sources to UML class diagrams.
///
/// Results are JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "tuguml", version, about = "Java sources to UML class diagrams")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Config file (default: <config dir>/tuguml/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Settings shared by the commands that read sources.
#[derive(Args, Debug)]
struct SourceArgs {
    /// Hide external types and the edges that reach them.
    #[arg(long)]
    no_externals: bool,

    /// Skip source files matching this glob (repeatable).
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every pipeline stage and store the artifacts.
    Generate {
        /// Java source root.
        root: PathBuf,

        /// Artifact directory (default: .tuguml).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Project id (default: the source root's directory name).
        #[arg(long)]
        project: Option<String>,

        /// Diagram renderer: builtin or plantuml.
        #[arg(long, value_parser = parse_renderer)]
        renderer: Option<RendererKind>,

        /// PlantUML executable (default: `plantuml` on PATH).
        #[arg(long)]
        plantuml: Option<PathBuf>,

        /// PlantUML timeout in seconds.
        #[arg(long, value_name = "SECS")]
        render_timeout: Option<u64>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the UML text of a source tree.
    Uml {
        /// Java source root.
        root: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print one stored artifact as JSON.
    Show {
        /// Artifact directory (default: .tuguml).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Project id.
        #[arg(long)]
        project: String,

        /// lightweight_model, uml_text, diagram or dependency_matrix.
        #[arg(long, value_parser = parse_artifact_kind)]
        kind: ArtifactKind,
    },

    /// Delete every stored artifact of a project.
    Delete {
        /// Artifact directory (default: .tuguml).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Project id.
        #[arg(long)]
        project: String,
    },
}

fn parse_renderer(s: &str) -> Result<RendererKind, String> {
    s.parse().map_err(|e: tuguml::config::ConfigError| e.to_string())
}

fn parse_artifact_kind(s: &str) -> Result<ArtifactKind, String> {
    ArtifactKind::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown artifact kind '{}', expected one of: {}", s, names.join(", "))
    })
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Errors go to stdout as JSON, like every other result.
            let error_code = OutputErrorCode::from(&err);
            let _ = emit_response(&ErrorResponse::new(&err), &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(error_code.code())
        }
    }
}

fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn execute(cli: Cli) -> Result<(), UmlError> {
    let global = cli.global;
    match cli.command {
        Command::Generate {
            root,
            out,
            project,
            renderer,
            plantuml,
            render_timeout,
            source,
        } => {
            let overrides = CliOverrides {
                renderer,
                plantuml,
                render_timeout: render_timeout.map(Duration::from_secs),
                ..source_overrides(&global, &source)
            };
            execute_generate(root, out, project, &overrides)
        }
        Command::Uml { root, source } => {
            let config = ResolvedConfig::resolve(&source_overrides(&global, &source))?;
            let text = run_uml(&root, &config)?;
            let mut stdout = io::stdout();
            stdout
                .write_all(text.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| UmlError::internal(e.to_string()))
        }
        Command::Show { out, project, kind } => {
            let artifact = run_show(&out_dir_or_default(out), &ProjectId::new(project)?, kind)?;
            emit_response(&artifact, &mut io::stdout()).map_err(|e| UmlError::internal(e.to_string()))
        }
        Command::Delete { out, project } => {
            let response = run_delete(&out_dir_or_default(out), ProjectId::new(project)?)?;
            emit_response(&response, &mut io::stdout()).map_err(|e| UmlError::internal(e.to_string()))
        }
    }
}

fn source_overrides(global: &GlobalArgs, source: &SourceArgs) -> CliOverrides {
    CliOverrides {
        config_file: global.config.clone(),
        include_externals: source.no_externals.then_some(false),
        exclude_patterns: source.exclude.clone(),
        ..CliOverrides::default()
    }
}

fn execute_generate(
    root: PathBuf,
    out: Option<PathBuf>,
    project: Option<String>,
    overrides: &CliOverrides,
) -> Result<(), UmlError> {
    let config = ResolvedConfig::resolve(overrides)?;
    let project = match project {
        Some(id) => ProjectId::new(id)?,
        None => project_id_for(&root)?,
    };
    let out_dir = out_dir_or_default(out);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| UmlError::internal(format!("cannot start runtime: {}", e)))?;
    let response = runtime.block_on(async {
        let mut stdout = io::stdout();
        run_generate(&root, &out_dir, project, &config, &mut stdout).await
    })?;

    emit_response(&response, &mut io::stdout()).map_err(|e| UmlError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn generate_defaults() {
            let cli = Cli::try_parse_from(["tuguml", "generate", "src/main/java"]).unwrap();
            assert!(matches!(cli.global.log_level, LogLevel::Info));
            match cli.command {
                Command::Generate {
                    root,
                    out,
                    project,
                    renderer,
                    source,
                    ..
                } => {
                    assert_eq!(root, PathBuf::from("src/main/java"));
                    assert!(out.is_none());
                    assert!(project.is_none());
                    assert!(renderer.is_none());
                    assert!(!source.no_externals);
                    assert!(source.exclude.is_empty());
                }
                _ => panic!("expected Generate"),
            }
        }

        #[test]
        fn generate_all_flags() {
            let cli = Cli::try_parse_from([
                "tuguml",
                "generate",
                "src",
                "--out",
                "build/uml",
                "--project",
                "shop",
                "--renderer",
                "plantuml",
                "--plantuml",
                "/usr/local/bin/plantuml",
                "--render-timeout",
                "5",
                "--no-externals",
                "--exclude",
                "**/test/**",
                "--exclude",
                "gen/",
                "--log-format",
                "json",
            ])
            .unwrap();
            assert!(matches!(cli.global.log_format, LogFormat::Json));
            match cli.command {
                Command::Generate {
                    out,
                    project,
                    renderer,
                    plantuml,
                    render_timeout,
                    source,
                    ..
                } => {
                    assert_eq!(out, Some(PathBuf::from("build/uml")));
                    assert_eq!(project.as_deref(), Some("shop"));
                    assert_eq!(renderer, Some(RendererKind::PlantUml));
                    assert_eq!(plantuml, Some(PathBuf::from("/usr/local/bin/plantuml")));
                    assert_eq!(render_timeout, Some(5));
                    assert!(source.no_externals);
                    assert_eq!(source.exclude, vec!["**/test/**", "gen/"]);
                }
                _ => panic!("expected Generate"),
            }
        }

        #[test]
        fn unknown_renderer_is_rejected() {
            let result = Cli::try_parse_from(["tuguml", "generate", "src", "--renderer", "dot"]);
            assert!(result.is_err());
        }

        #[test]
        fn delete_requires_project() {
            assert!(Cli::try_parse_from(["tuguml", "delete"]).is_err());
            let cli = Cli::try_parse_from(["tuguml", "delete", "--project", "shop"]).unwrap();
            assert!(matches!(cli.command, Command::Delete { ref project, .. } if project == "shop"));
        }

        #[test]
        fn show_parses_artifact_kind() {
            let cli = Cli::try_parse_from([
                "tuguml", "show", "--project", "shop", "--kind", "dependency_matrix",
            ])
            .unwrap();
            assert!(matches!(
                cli.command,
                Command::Show {
                    kind: ArtifactKind::DependencyMatrix,
                    ..
                }
            ));
            assert!(
                Cli::try_parse_from(["tuguml", "show", "--project", "shop", "--kind", "png"])
                    .is_err()
            );
        }

        #[test]
        fn global_config_after_subcommand() {
            let cli =
                Cli::try_parse_from(["tuguml", "uml", "src", "--config", "tuguml.json"]).unwrap();
            assert_eq!(cli.global.config, Some(PathBuf::from("tuguml.json")));
        }
    }

    mod overrides {
        use super::*;

        #[test]
        fn no_externals_maps_to_override() {
            let cli = Cli::try_parse_from(["tuguml", "uml", "src", "--no-externals"]).unwrap();
            let Command::Uml { source, .. } = cli.command else {
                panic!("expected Uml");
            };
            let overrides = source_overrides(&cli.global, &source);
            assert_eq!(overrides.include_externals, Some(false));

            let cli = Cli::try_parse_from(["tuguml", "uml", "src"]).unwrap();
            let Command::Uml { source, .. } = cli.command else {
                panic!("expected Uml");
            };
            assert_eq!(source_overrides(&cli.global, &source).include_externals, None);
        }
    }
}
