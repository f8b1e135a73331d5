//! Analysis configuration.
//!
//! Read from `calltrace.yaml` (or `.calltrace.yaml`) in the working directory,
//! or from an explicit `--config` path. Every field has a default, so an
//! empty file and no file at all behave the same.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File names searched for when no config path is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["calltrace.yaml", ".calltrace.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Package prefixes treated as platform code by filtered traces.
    pub platform_prefixes: Vec<String>,
    /// Package that the built-in type fallback resolves into.
    pub builtin_package: String,
    /// Simple names resolvable without an import.
    pub builtin_types: Vec<String>,
    /// Glob patterns for paths to exclude (e.g., "**/generated/**").
    pub exclude: Vec<String>,
    /// Treat files containing syntax errors as parse failures.
    pub skip_files_with_syntax_errors: bool,
    /// Type unresolved receivers from local declarations and call results.
    pub receiver_inference: bool,
    /// Depth at which forward traces stop expanding.
    pub max_trace_depth: usize,
    /// SQLite database path. Defaults to the user data directory.
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_prefixes: vec!["java.".to_string(), "javax.".to_string()],
            builtin_package: "java.lang".to_string(),
            builtin_types: [
                "String",
                "Object",
                "Integer",
                "Boolean",
                "Double",
                "Float",
                "Long",
                "Short",
                "Byte",
                "Character",
                "Thread",
                "Exception",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude: Vec::new(),
            skip_files_with_syntax_errors: true,
            receiver_inference: true,
            max_trace_depth: 64,
            database: None,
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find a config file in `dir` by its default names.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load the explicit config, else a discovered one, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::parse_file(path),
            None => match Self::discover(dir) {
                Some(path) => {
                    tracing::debug!("using config {}", path.display());
                    Self::parse_file(path)
                }
                None => Ok(Config::default()),
            },
        }
    }

    /// Compile the exclude patterns. `**` matches across directories.
    pub fn exclude_matcher(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::Pattern {
            pattern: self.exclude.join(", "),
            source,
        })
    }

    /// Resolved database path: the configured one, else `calltrace.db` in the
    /// user data directory, else in the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database {
            return path.clone();
        }
        ProjectDirs::from("", "", "calltrace")
            .map(|dirs| dirs.data_dir().join("calltrace.db"))
            .unwrap_or_else(|| PathBuf::from("calltrace.db"))
    }

    /// Whether a package name falls under a platform prefix.
    pub fn is_platform_package(&self, package: &str) -> bool {
        is_platform_package(&self.platform_prefixes, package)
    }
}

/// Whether `package` falls under one of `prefixes`.
///
/// A prefix ending in `.` also matches the bare package (`java.` matches
/// `java`).
pub fn is_platform_package(prefixes: &[String], package: &str) -> bool {
    prefixes.iter().any(|prefix| {
        package.starts_with(prefix.as_str())
            || prefix
                .strip_suffix('.')
                .map(|bare| bare == package)
                .unwrap_or(false)
    })
}
