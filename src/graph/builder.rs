//! Two-pass call-graph construction.
//!
//! Pass 1 declares every type, member, field and import of every file. Only
//! after it completes for the whole file set are hierarchies linked and the
//! package index sealed; pass 2 then resolves call sites against the
//! finished registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{FileDeclarations, SourceSet};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::registry::{EdgeSpec, MemberId, MemberSpec, Registry, RegistryStats, TypeId, TypeSpec};
use crate::resolve::{self, CallResolution, CallResolver, ResolveOptions};

/// A file left out of the graph.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Summary of one build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    pub files_discovered: usize,
    pub files_analyzed: usize,
    pub skipped: Vec<SkippedFile>,
    pub registry: RegistryStats,
}

/// A resolved call site waiting for the serial commit.
struct PendingEdge {
    caller: MemberId,
    ordinal: u32,
    spec: EdgeSpec,
    resolution: CallResolution,
}

/// Drives both passes over a source tree into a [`Registry`].
pub struct CallGraphBuilder {
    config: Config,
    options: ResolveOptions,
    cancel: CancelToken,
    progress: bool,
    jobs: Option<usize>,
}

impl CallGraphBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            options: ResolveOptions::from_config(config),
            cancel: CancelToken::new(),
            progress: false,
            jobs: None,
        }
    }

    /// Use a shared cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Show a progress bar per pass on stderr.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Limit worker threads. `None` uses the global rayon pool.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs.filter(|&n| n > 0);
        self
    }

    /// Analyze every source file under `root` into `registry`.
    ///
    /// Declarations already in the registry are reused, so building twice
    /// over an unchanged tree leaves the graph unchanged. Edges of a
    /// re-analysed member follow its current body.
    pub fn build(&self, root: &Path, registry: &mut Registry) -> Result<BuildStats, AnalysisError> {
        let exclude = self.config.exclude_matcher()?;
        let sources = SourceSet::new(root, exclude, self.config.skip_files_with_syntax_errors);
        let paths = sources.discover()?;
        tracing::info!("discovered {} source files under {}", paths.len(), root.display());

        let Some(jobs) = self.jobs else {
            return self.run(&sources, &paths, registry);
        };
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| self.run(&sources, &paths, registry)),
            Err(e) => {
                tracing::warn!("cannot start {} workers, using the global pool: {}", jobs, e);
                self.run(&sources, &paths, registry)
            }
        }
    }

    fn run(
        &self,
        sources: &SourceSet,
        paths: &[PathBuf],
        registry: &mut Registry,
    ) -> Result<BuildStats, AnalysisError> {
        let bar = self.progress_bar(paths.len(), "parse");
        let outcome = sources.extract_all(paths, &bar, &self.cancel);
        bar.finish_and_clear();
        self.check_cancelled()?;

        // Pass 1: every package clause first, then declarations in path order.
        registry.begin_declarations();
        for file in &outcome.files {
            registry.index_package(
                file.package.as_deref(),
                file.types.iter().map(|t| t.name.as_str()),
            );
        }
        let mut owners = Vec::with_capacity(outcome.files.len());
        for file in &outcome.files {
            self.check_cancelled()?;
            owners.push(declare_file(registry, file));
        }
        let counts = call_counts(registry, &outcome.files, &owners);
        let dropped = registry.retain_calls(&counts);
        if dropped > 0 {
            tracing::info!("dropped {} call edges no longer in the source", dropped);
        }

        // Barrier.
        resolve::link_hierarchy(registry, &self.options);
        registry.seal();
        let declared = registry.stats();
        tracing::info!(
            "pass 1 complete: {} types, {} members",
            declared.types,
            declared.members
        );

        // Pass 2: resolve in parallel, commit serially in path order.
        let bar = self.progress_bar(outcome.files.len(), "resolve");
        let pending: Vec<Option<Vec<PendingEdge>>> = {
            let reader: &Registry = registry;
            let resolver = CallResolver::new(reader, &self.options);
            outcome
                .files
                .par_iter()
                .zip(owners.par_iter())
                .map(|(file, types)| {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let edges = resolve_file(reader, &resolver, file, types);
                    bar.inc(1);
                    Some(edges)
                })
                .collect()
        };
        bar.finish_and_clear();

        for (file, edges) in outcome.files.iter().zip(pending) {
            self.check_cancelled()?;
            let Some(edges) = edges else {
                return Err(AnalysisError::Cancelled);
            };
            let resolved = commit_edges(registry, edges);
            tracing::debug!("{}: {} call edges resolved", file.path, resolved);
        }

        let stats = registry.stats();
        tracing::info!(
            "pass 2 complete: {}/{} call edges resolved",
            stats.resolved_edges,
            stats.edges
        );

        Ok(BuildStats {
            files_discovered: paths.len(),
            files_analyzed: outcome.files.len(),
            skipped: outcome
                .skipped
                .into_iter()
                .map(|(path, reason)| SkippedFile { path, reason })
                .collect(),
            registry: stats,
        })
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.cancel.is_cancelled() {
            tracing::warn!("analysis cancelled");
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }

    fn progress_bar(&self, len: usize, stage: &'static str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("{prefix:>8} [{bar:40}] {pos}/{len} {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_prefix(stage);
        bar
    }
}

/// Declare one file's types with their imports, fields and members.
/// Returns the type ids in declaration order.
fn declare_file(registry: &mut Registry, file: &FileDeclarations) -> Vec<TypeId> {
    let mut ids = Vec::with_capacity(file.types.len());
    for decl in &file.types {
        let id = registry.declare_type(TypeSpec {
            name: decl.name.clone(),
            package: file.package.clone(),
            location: file.path.clone(),
            is_interface: decl.is_interface(),
            is_abstract: decl.is_abstract,
            superclass: decl.superclass.clone(),
            interfaces: decl.interfaces.clone(),
        });
        // Imports are file-scoped; every type in the file sees them.
        for import in &file.imports {
            registry.declare_import(id, &import.path, import.is_wildcard, import.is_static);
        }
        for field in &decl.fields {
            registry.declare_field(id, &field.name, &field.type_name, field.is_static);
        }
        for member in &decl.members {
            registry.declare_member(
                id,
                MemberSpec {
                    name: member.name.clone(),
                    params: member.params.clone(),
                    return_type: member.return_type.clone(),
                    is_static: member.is_static,
                    is_public: member.is_public,
                    span: member.span,
                },
            );
        }
        ids.push(id);
    }
    ids
}

/// Number of call sites each member of the analysed types has now. Members
/// still registered from an earlier build but gone from the source count 0.
fn call_counts(
    registry: &Registry,
    files: &[FileDeclarations],
    owners: &[Vec<TypeId>],
) -> HashMap<MemberId, u32> {
    let mut counts = HashMap::new();
    for (file, types) in files.iter().zip(owners) {
        for (decl, &owner) in file.types.iter().zip(types) {
            let current: HashMap<String, u32> = decl
                .members
                .iter()
                .map(|m| (m.signature(), m.body.as_ref().map_or(0, |b| b.calls.len() as u32)))
                .collect();
            for &member in registry.declared_members(owner) {
                let signature = &registry.member(member).signature;
                let count = current.get(signature).copied().unwrap_or(0);
                // A type declared by two files keeps the larger body.
                counts
                    .entry(member)
                    .and_modify(|n: &mut u32| *n = (*n).max(count))
                    .or_insert(count);
            }
        }
    }
    counts
}

/// Resolve every call site of one file without touching the registry.
fn resolve_file(
    registry: &Registry,
    resolver: &CallResolver<'_>,
    file: &FileDeclarations,
    types: &[TypeId],
) -> Vec<PendingEdge> {
    let mut pending = Vec::with_capacity(file.call_count());
    for (decl, &owner) in file.types.iter().zip(types) {
        for member in &decl.members {
            let Some(body) = &member.body else {
                continue;
            };
            let Some(caller) = registry.lookup_member(owner, &member.signature()) else {
                tracing::warn!("{}: member {} missing after pass 1", file.path, member.signature());
                continue;
            };
            for (ordinal, site) in body.calls.iter().enumerate() {
                let resolution = resolver.resolve_call(owner, site);
                pending.push(PendingEdge {
                    caller,
                    ordinal: ordinal as u32,
                    spec: EdgeSpec {
                        kind: site.kind,
                        called_type_hint: site.qualifier.clone(),
                        called_name: site.name.clone(),
                        called_signature_hint: resolution.signature_hint.clone(),
                        line: site.line,
                        context: site.context,
                    },
                    resolution,
                });
            }
        }
    }
    pending
}

/// Record edges and their resolutions. Returns how many got a target.
fn commit_edges(registry: &mut Registry, edges: Vec<PendingEdge>) -> usize {
    let mut resolved = 0;
    for edge in edges {
        let id = registry.record_call(edge.caller, edge.ordinal, edge.spec);
        if let Some(target) = &edge.resolution.target_type {
            registry.set_resolved_type(id, &target.fqn);
        }
        if let Some(member) = edge.resolution.member {
            registry.set_resolved(id, member);
            resolved += 1;
        }
    }
    resolved
}
