//! Configuration primitives and loader for the dogma toolkit.
//!
//! Settings are resolved from a precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Each layer is a `.dogma.toml` file; later layers replace individual keys
//! of earlier ones. Parsed settings are normalised into typed structures so
//! downstream crates never touch raw TOML.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".dogma.toml";

const DEFAULT_API_HEADING: &str = r"^(rest\s+)?api$";
const DEFAULT_TYPES_HEADING: &str = r"^types$";
const DEFAULT_LOG_FILTER: &str = "info";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub extract: ExtractSettings,
    pub log: LogSettings,
    pub sources: ConfigSources,
}

/// Settings that decide which sections of a document describe the contract.
#[derive(Clone, Debug)]
pub struct ExtractSettings {
    /// Matched (case-insensitively) against top-level section titles.
    pub api_heading: HeadingPattern,
    pub types_heading: HeadingPattern,
    pub duplicates: DuplicatePolicy,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        let source = ConfigSource::builtin();
        ExtractSettings {
            api_heading: HeadingPattern::compile(DEFAULT_API_HEADING, &source)
                .unwrap_or_else(|err| panic!("built-in api heading pattern: {err}")),
            types_heading: HeadingPattern::compile(DEFAULT_TYPES_HEADING, &source)
                .unwrap_or_else(|err| panic!("built-in types heading pattern: {err}")),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// Logging settings; `filter` uses `tracing_subscriber::EnvFilter` syntax.
#[derive(Clone, Debug)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

/// Compiled case-insensitive heading matcher that remembers its source text.
#[derive(Clone, Debug)]
pub struct HeadingPattern {
    original: String,
    regex: Regex,
}

impl HeadingPattern {
    fn compile(value: &str, source: &ConfigSource) -> Result<Self, ConfigValidationError> {
        RegexBuilder::new(value)
            .case_insensitive(true)
            .size_limit(1024 * 100)
            .build()
            .map(|regex| HeadingPattern {
                original: value.to_owned(),
                regex,
            })
            .map_err(|err| {
                ConfigValidationError::new(
                    Some(source.clone()),
                    format!("invalid heading pattern '{value}': {err}"),
                )
            })
    }

    /// Build a pattern outside of file loading, e.g. from a CLI flag.
    pub fn new(value: &str) -> Result<Self, ConfigValidationError> {
        Self::compile(value, &ConfigSource::builtin())
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_match(&self, title: &str) -> bool {
        self.regex.is_match(title.trim())
    }
}

/// How the extractor treats two contract entries that share a name.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DuplicatePolicy {
    #[default]
    Error,
    FirstWins,
    LastWins,
}

impl DuplicatePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicatePolicy::Error => "error",
            DuplicatePolicy::FirstWins => "first-wins",
            DuplicatePolicy::LastWins => "last-wins",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(DuplicatePolicy::Error),
            "first-wins" | "first" => Ok(DuplicatePolicy::FirstWins),
            "last-wins" | "last" => Ok(DuplicatePolicy::LastWins),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected error, first-wins or last-wins)"
            )),
        }
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn builtin() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::builtin();
        let mut merged = defaults_layer(&default_source);
        let mut source_layers = vec![default_source];

        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let (extract, log) = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            extract,
            log,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            extract: ExtractSettings::default(),
            log: LogSettings::default(),
            sources: ConfigSources {
                working_directory: PathBuf::from("."),
                layers: vec![ConfigSource::builtin()],
            },
        }
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: &ConfigSource) -> PartialConfig {
    PartialConfig {
        api_heading: Some(Located::new(DEFAULT_API_HEADING.into(), source.clone())),
        types_heading: Some(Located::new(DEFAULT_TYPES_HEADING.into(), source.clone())),
        duplicates: Some(Located::new("error".into(), source.clone())),
        log_filter: Some(Located::new(DEFAULT_LOG_FILTER.into(), source.clone())),
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    api_heading: Option<Located<String>>,
    types_heading: Option<Located<String>>,
    duplicates: Option<Located<String>>,
    log_filter: Option<Located<String>>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        if other.api_heading.is_some() {
            self.api_heading = other.api_heading;
        }
        if other.types_heading.is_some() {
            self.types_heading = other.types_heading;
        }
        if other.duplicates.is_some() {
            self.duplicates = other.duplicates;
        }
        if other.log_filter.is_some() {
            self.log_filter = other.log_filter;
        }
    }

    fn finalize(self) -> Result<(ExtractSettings, LogSettings), ConfigValidationErrors> {
        let defaults = ExtractSettings::default();
        let mut errors = Vec::new();

        let api_heading = compile_heading(self.api_heading, "extract.api_heading", &mut errors)
            .unwrap_or(defaults.api_heading);
        let types_heading =
            compile_heading(self.types_heading, "extract.types_heading", &mut errors)
                .unwrap_or(defaults.types_heading);

        let duplicates = match self.duplicates {
            Some(located) => match located.value.parse::<DuplicatePolicy>() {
                Ok(policy) => policy,
                Err(message) => {
                    errors.push(
                        ConfigValidationError::new(Some(located.source), message)
                            .with_context("extract.duplicates"),
                    );
                    DuplicatePolicy::default()
                }
            },
            None => DuplicatePolicy::default(),
        };

        let filter = self
            .log_filter
            .map(|located| located.value)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok((
            ExtractSettings {
                api_heading,
                types_heading,
                duplicates,
            },
            LogSettings { filter },
        ))
    }
}

fn compile_heading(
    located: Option<Located<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) -> Option<HeadingPattern> {
    let located = located?;
    match HeadingPattern::compile(&located.value, &located.source) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            errors.push(err.with_context(context));
            None
        }
    }
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    extract: Option<RawExtract>,
    #[serde(default)]
    log: Option<RawLog>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        let extract = self.extract.unwrap_or_default();
        let log = self.log.unwrap_or_default();
        PartialConfig {
            api_heading: extract
                .api_heading
                .map(|value| Located::new(value, source.clone())),
            types_heading: extract
                .types_heading
                .map(|value| Located::new(value, source.clone())),
            duplicates: extract
                .duplicates
                .map(|value| Located::new(value, source.clone())),
            log_filter: log.filter.map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExtract {
    #[serde(default)]
    api_heading: Option<String>,
    #[serde(default)]
    types_heading: Option<String>,
    #[serde(default)]
    duplicates: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLog {
    #[serde(default)]
    filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_match_common_titles() {
        let settings = ExtractSettings::default();
        assert!(settings.api_heading.is_match("API"));
        assert!(settings.api_heading.is_match("REST API"));
        assert!(!settings.api_heading.is_match("API notes"));
        assert!(settings.types_heading.is_match("types"));
        assert_eq!(settings.duplicates, DuplicatePolicy::Error);
    }

    #[test]
    fn duplicate_policy_parses_aliases() {
        assert_eq!("Last".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::LastWins));
        assert_eq!("first-wins".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::FirstWins));
        assert!("sometimes".parse::<DuplicatePolicy>().is_err());
    }
}
