//! Layered configuration.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`TUGUML_*`)
//! 3. JSON config file (`--config`, else `<config_dir>/tuguml/config.json`)
//! 4. Defaults
//!
//! Every resolved value remembers which layer it came from.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use tuguml_core::visitor::UmlOptions;

use crate::render::{BuiltinSvgRenderer, DiagramRenderer, PlantUmlRenderer};

pub const ENV_RENDERER: &str = "TUGUML_RENDERER";
pub const ENV_PLANTUML: &str = "TUGUML_PLANTUML";
pub const ENV_RENDER_TIMEOUT: &str = "TUGUML_RENDER_TIMEOUT";
pub const ENV_INCLUDE_EXTERNALS: &str = "TUGUML_INCLUDE_EXTERNALS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value {value:?} for {key}: {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },

    #[error("plantuml renderer selected but no plantuml executable was found (set TUGUML_PLANTUML or --plantuml)")]
    PlantUmlNotFound,
}

impl ConfigError {
    fn invalid(key: &str, value: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    Default = 0,
    ConfigFile = 1,
    EnvVar = 2,
    /// Highest precedence.
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Keep whichever value has the higher precedence; ties go to `other`.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

/// Which renderer draws the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Builtin,
    PlantUml,
}

impl FromStr for RendererKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(RendererKind::Builtin),
            "plantuml" => Ok(RendererKind::PlantUml),
            _ => Err(ConfigError::invalid(
                "renderer",
                s,
                "expected \"builtin\" or \"plantuml\"",
            )),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendererKind::Builtin => f.write_str("builtin"),
            RendererKind::PlantUml => f.write_str("plantuml"),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected true or false")),
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid(key, value, "timeout must be positive")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::invalid(key, value, e.to_string())),
    }
}

// ============================================================================
// Config File
// ============================================================================

/// Contents of `config.json`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub renderer: Option<RendererKind>,
    pub plantuml: Option<PathBuf>,
    pub render_timeout_secs: Option<u64>,
    pub include_externals: Option<bool>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Per-user config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tuguml").join("config.json"))
}

// ============================================================================
// Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// --config
    pub config_file: Option<PathBuf>,
    /// --renderer
    pub renderer: Option<RendererKind>,
    /// --plantuml
    pub plantuml: Option<PathBuf>,
    /// --render-timeout (seconds)
    pub render_timeout: Option<Duration>,
    /// --no-externals
    pub include_externals: Option<bool>,
    /// --exclude (repeatable)
    pub exclude_patterns: Vec<String>,
}

/// Resolved configuration with precedence information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub renderer: ConfigValue<RendererKind>,
    /// Explicit PlantUML path. Unset means "look it up on PATH".
    pub plantuml: Option<ConfigValue<PathBuf>>,
    pub render_timeout: ConfigValue<Duration>,
    pub include_externals: ConfigValue<bool>,
    /// Exclusions accumulate across layers.
    pub exclude_patterns: Vec<ConfigValue<String>>,
    /// The config file that was applied, if any.
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            renderer: ConfigValue::new(RendererKind::Builtin, ConfigSource::Default),
            plantuml: None,
            render_timeout: ConfigValue::new(PlantUmlRenderer::DEFAULT_TIMEOUT, ConfigSource::Default),
            include_externals: ConfigValue::new(true, ConfigSource::Default),
            exclude_patterns: Vec::new(),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Resolve from all sources using the process environment.
    pub fn resolve(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        ResolvedConfig::resolve_with_env(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with_env(
        overrides: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = ResolvedConfig::default();

        // An explicit --config must exist; the per-user file is optional.
        match &overrides.config_file {
            Some(path) => config.apply_file(path, FileConfig::load(path)?)?,
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    let file = FileConfig::load(&path)?;
                    config.apply_file(&path, file)?;
                }
            }
        }

        config.apply_env_vars(env)?;
        config.apply_cli_overrides(overrides);

        debug!(
            renderer = %config.renderer.value,
            timeout = ?config.render_timeout.value,
            include_externals = config.include_externals.value,
            "resolved configuration"
        );
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path, file: FileConfig) -> Result<(), ConfigError> {
        let src = ConfigSource::ConfigFile;
        if let Some(renderer) = file.renderer {
            self.renderer = self.renderer.clone().merge(ConfigValue::new(renderer, src));
        }
        if let Some(plantuml) = file.plantuml {
            self.plantuml = Some(ConfigValue::new(plantuml, src));
        }
        if let Some(secs) = file.render_timeout_secs {
            let timeout = parse_seconds("render_timeout_secs", &secs.to_string())?;
            self.render_timeout = self.render_timeout.clone().merge(ConfigValue::new(timeout, src));
        }
        if let Some(include) = file.include_externals {
            self.include_externals = self.include_externals.clone().merge(ConfigValue::new(include, src));
        }
        self.exclude_patterns
            .extend(file.exclude.into_iter().map(|p| ConfigValue::new(p, src)));
        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    fn apply_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let src = ConfigSource::EnvVar;
        if let Some(renderer) = env(ENV_RENDERER) {
            let renderer = renderer.parse().map_err(|_| {
                ConfigError::invalid(ENV_RENDERER, &renderer, "expected \"builtin\" or \"plantuml\"")
            })?;
            self.renderer = ConfigValue::new(renderer, src);
        }
        if let Some(plantuml) = env(ENV_PLANTUML) {
            self.plantuml = Some(ConfigValue::new(PathBuf::from(plantuml), src));
        }
        if let Some(timeout) = env(ENV_RENDER_TIMEOUT) {
            self.render_timeout = ConfigValue::new(parse_seconds(ENV_RENDER_TIMEOUT, &timeout)?, src);
        }
        if let Some(include) = env(ENV_INCLUDE_EXTERNALS) {
            self.include_externals = ConfigValue::new(parse_bool(ENV_INCLUDE_EXTERNALS, &include)?, src);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let src = ConfigSource::CliFlag;
        if let Some(renderer) = overrides.renderer {
            self.renderer = ConfigValue::new(renderer, src);
        }
        if let Some(ref plantuml) = overrides.plantuml {
            self.plantuml = Some(ConfigValue::new(plantuml.clone(), src));
        }
        if let Some(timeout) = overrides.render_timeout {
            self.render_timeout = ConfigValue::new(timeout, src);
        }
        if let Some(include) = overrides.include_externals {
            self.include_externals = ConfigValue::new(include, src);
        }
        self.exclude_patterns.extend(
            overrides
                .exclude_patterns
                .iter()
                .map(|p| ConfigValue::new(p.clone(), src)),
        );
    }

    pub fn uml_options(&self) -> UmlOptions {
        UmlOptions {
            include_externals: self.include_externals.value,
        }
    }

    pub fn exclusions(&self) -> Vec<String> {
        self.exclude_patterns.iter().map(|p| p.value.clone()).collect()
    }

    /// PlantUML executable: the configured path, else `plantuml` on PATH.
    pub fn plantuml_program(&self) -> Option<PathBuf> {
        match &self.plantuml {
            Some(configured) => Some(configured.value.clone()),
            None => which::which("plantuml").ok(),
        }
    }

    /// Build the configured renderer.
    pub fn renderer(&self) -> Result<Arc<dyn DiagramRenderer>, ConfigError> {
        match self.renderer.value {
            RendererKind::Builtin => Ok(Arc::new(BuiltinSvgRenderer::new())),
            RendererKind::PlantUml => {
                let program = self.plantuml_program().ok_or(ConfigError::PlantUmlNotFound)?;
                Ok(Arc::new(
                    PlantUmlRenderer::new(program).with_timeout(self.render_timeout.value),
                ))
            }
        }
    }
}
