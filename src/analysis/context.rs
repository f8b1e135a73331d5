//! Source discovery and per-file declaration caching.
//!
//! The SourceSet provides:
//! - Discovery of Java files under a root, honoring exclude globs
//! - Caching of extracted declarations to avoid re-parsing
//! - Parallel extraction with deterministic (path-sorted) output

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use globset::GlobSet;
use indicatif::ProgressBar;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::analysis::{get_analyzer, FileDeclarations};
use crate::cancel::CancelToken;
use crate::error::AnalysisError;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["build", "target", "out", "bin", "node_modules", "vendor"];

/// Result of extracting a batch of files.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    /// Successfully extracted files, sorted by path.
    pub files: Vec<FileDeclarations>,
    /// Files skipped as parse failures, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// A set of source files under one root.
pub struct SourceSet {
    root: PathBuf,
    exclude: GlobSet,
    skip_syntax_errors: bool,
    /// Cached declarations, keyed by absolute path.
    cache: RwLock<HashMap<PathBuf, FileDeclarations>>,
}

impl SourceSet {
    /// Create a source set rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P, exclude: GlobSet, skip_syntax_errors: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude,
            skip_syntax_errors,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Find every supported source file under the root, sorted by path.
    ///
    /// A missing or unreadable root is fatal; unreadable entries below it
    /// are logged and skipped.
    pub fn discover(&self) -> Result<Vec<PathBuf>, AnalysisError> {
        if !self.root.exists() {
            return Err(AnalysisError::SourceRootMissing(self.root.clone()));
        }
        fs::read_dir(&self.root).map_err(|source| AnalysisError::SourceRootUnreadable {
            path: self.root.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if get_analyzer(ext).is_none() {
                continue;
            }
            if self.exclude.is_match(self.relative(path)) {
                tracing::debug!("excluded {}", path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Extract declarations for one file, using the cache when possible.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<FileDeclarations> {
        let path = path.as_ref();
        let abs_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        if let Ok(cache) = self.cache.read() {
            if let Some(decls) = cache.get(&abs_path) {
                return Ok(decls.clone());
            }
        }

        let rel_path = self.relative(&abs_path);
        let ext = abs_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let Some(analyzer) = get_analyzer(ext) else {
            return Ok(FileDeclarations::empty(&rel_path));
        };

        let source = fs::read(&abs_path)?;
        let parsed = analyzer.parse(&abs_path, &source)?;
        if self.skip_syntax_errors && parsed.has_syntax_errors() {
            anyhow::bail!("syntax errors in {}", rel_path);
        }
        let mut decls = analyzer.extract(&parsed)?;
        decls.path = rel_path;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(abs_path, decls.clone());
        }

        Ok(decls)
    }

    /// Extract many files in parallel.
    ///
    /// Failures are logged and reported in `skipped`, never fatal. Files not
    /// started before `cancel` fires are left out.
    pub fn extract_all(
        &self,
        paths: &[PathBuf],
        progress: &ProgressBar,
        cancel: &CancelToken,
    ) -> ExtractOutcome {
        let results: Vec<_> = paths
            .par_iter()
            .filter(|_| !cancel.is_cancelled())
            .map(|p| {
                let result = self.extract_file(p);
                progress.inc(1);
                (p, result)
            })
            .collect();

        let mut outcome = ExtractOutcome::default();
        for (path, result) in results {
            match result {
                Ok(decls) => {
                    tracing::debug!("extracted {} ({} types)", decls.path, decls.types.len());
                    outcome.files.push(decls);
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                    outcome.skipped.push((self.relative(path), e.to_string()));
                }
            }
        }

        // Identity assignment depends on commit order.
        outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.skipped.sort();
        outcome
    }

    /// Get all cached file paths (relative), sorted.
    pub fn cached_files(&self) -> Vec<String> {
        let Ok(cache) = self.cache.read() else {
            return Vec::new();
        };
        let mut files: Vec<_> = cache.values().map(|d| d.path.clone()).collect();
        files.sort();
        files
    }

    /// Clear the cache.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn source_set(root: &Path, excludes: &[&str]) -> SourceSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in excludes {
            builder.add(Glob::new(pattern).unwrap());
        }
        SourceSet::new(root, builder.build().unwrap(), true)
    }

    #[test]
    fn test_discover_skips_hidden_build_and_excluded() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/a/A.java", "class A {}");
        write(temp.path(), "src/b/B.java", "class B {}");
        write(temp.path(), "src/gen/G.java", "class G {}");
        write(temp.path(), ".git/X.java", "class X {}");
        write(temp.path(), "target/T.java", "class T {}");
        write(temp.path(), "README.md", "# readme");

        let set = source_set(temp.path(), &["**/gen/**"]);
        let files = set.discover().unwrap();
        let rel: Vec<_> = files.iter().map(|f| set.relative(f)).collect();
        assert_eq!(rel, vec!["src/a/A.java", "src/b/B.java"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let set = source_set(&temp.path().join("nope"), &[]);
        assert!(matches!(
            set.discover(),
            Err(AnalysisError::SourceRootMissing(_))
        ));
    }

    #[test]
    fn test_extract_all_skips_broken_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "B.java", "class B { void run() {} }");
        write(temp.path(), "A.java", "class A { void run( { }");

        let set = source_set(temp.path(), &[]);
        let files = set.discover().unwrap();
        let outcome = set.extract_all(&files, &ProgressBar::hidden(), &CancelToken::new());

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].path, "B.java");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, "A.java");
    }

    #[test]
    fn test_caching() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "A.java", "package p; class A { void run() {} }");

        let set = source_set(temp.path(), &[]);
        let first = set.extract_file("A.java").unwrap();
        let second = set.extract_file(temp.path().join("A.java")).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(set.cached_files(), vec!["A.java"]);

        set.clear_cache();
        assert!(set.cached_files().is_empty());
    }

    #[test]
    fn test_cancelled_extracts_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "A.java", "class A {}");
        let set = source_set(temp.path(), &[]);
        let files = set.discover().unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = set.extract_all(&files, &ProgressBar::hidden(), &cancel);
        assert!(outcome.files.is_empty());
    }
}
