//! Repository and resolver (component K).
//!
//! Grounded on `resolver/repository.{hpp,cpp}` and `resolver/resolver.{hpp,cpp}`:
//! gather sources, parse prologues in parallel via `rayon`, evaluate build
//! guards, harvest active remote imports, and iterate the fixed-point
//! dependency resolution loop exactly per the governing pseudocode.

use crate::ast::{ImportId, ImportKind, TopId, TopKind};
use crate::datum::DatumNamespace;
use crate::errors::ErrorCode;
use crate::remote::{self, FetchFlags, RemoteError, RemoteUrl};
use crate::source::{gather_hkm_files, SourceRecord};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

pub struct Repository {
    pub local_path: PathBuf,
    pub remote_url: Option<RemoteUrl>,
    pub marked: bool,
    pub sources_by_path: Vec<SourceRecord>,
    pub children: Vec<Repository>,
}

impl Repository {
    pub fn new(local_path: PathBuf, remote_url: Option<RemoteUrl>) -> Self {
        Repository {
            local_path,
            remote_url,
            marked: false,
            sources_by_path: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Gather: walk the tree, add new sources, drop missing ones.
    pub fn gather(&mut self) -> std::io::Result<()> {
        let found = gather_hkm_files(&self.local_path)?;
        let found_set: HashSet<&PathBuf> = found.iter().collect();
        self.sources_by_path.retain(|s| found_set.contains(&s.path));
        let existing: HashSet<PathBuf> = self.sources_by_path.iter().map(|s| s.path.clone()).collect();
        for path in found {
            if !existing.contains(&path) {
                self.sources_by_path.push(SourceRecord::new(path));
            }
        }
        self.sort_by_path();
        Ok(())
    }

    pub fn sort_by_path(&mut self) {
        self.sources_by_path.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn sorted_by_module_name(&self) -> Vec<&SourceRecord> {
        let mut out: Vec<&SourceRecord> = self.sources_by_path.iter().collect();
        out.sort_by(|a, b| module_name_of(a).cmp(&module_name_of(b)));
        out
    }

    /// Parses each source's prologue in parallel.
    pub fn parse_prologues(&mut self) {
        self.sources_by_path.par_iter_mut().for_each(|source| {
            let _ = source.ensure_prologue();
        });
    }

    pub fn evaluate_build_guards(&mut self, env: &DatumNamespace) {
        for source in &mut self.sources_by_path {
            if let Some(ast) = source.ast.as_mut() {
                ast.evaluate_build_guard(env, &mut source.errors);
            }
        }
    }

    /// Harvests active (enabled) repository imports across all sources.
    pub fn active_remote_imports(&self) -> Vec<RemoteUrl> {
        self.active_remote_imports_with_ids().into_iter().map(|(_, _, url)| url).collect()
    }

    /// Same as `active_remote_imports`, but also identifies the source and
    /// import node each url came from, so a later failure can be attached
    /// back to the exact AST node that referenced it.
    fn active_remote_imports_with_ids(&self) -> Vec<(usize, ImportId, RemoteUrl)> {
        let mut out = Vec::new();
        for (source_idx, source) in self.sources_by_path.iter().enumerate() {
            let Some(ast) = &source.ast else { continue };
            let top_enabled = ast.tops().next().map(|(_, t)| t.enabled.unwrap_or(false)).unwrap_or(false);
            if !top_enabled {
                continue;
            }
            for (import_id, import) in ast.imports() {
                if !import.enabled.unwrap_or(false) {
                    continue;
                }
                match &import.kind {
                    ImportKind::Git { url, rev } => {
                        out.push((source_idx, import_id, RemoteUrl::git(url.clone(), rev.clone())))
                    }
                    ImportKind::Zip { url } => out.push((source_idx, import_id, RemoteUrl::zip(url.clone()))),
                    _ => {}
                }
            }
        }
        out
    }
}

/// Identifies one of `root`'s own sources, or one belonging to a repository
/// in `root.children`. Indices stay valid for the lifetime of a single
/// `resolve` call because child removal is deferred to a final sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RepoSelector {
    Root,
    Child(usize),
}

fn source_record_mut<'a>(root: &'a mut Repository, repo: RepoSelector, source_idx: usize) -> &'a mut SourceRecord {
    match repo {
        RepoSelector::Root => &mut root.sources_by_path[source_idx],
        RepoSelector::Child(c) => &mut root.children[c].sources_by_path[source_idx],
    }
}

struct ImportRef {
    repo: RepoSelector,
    source_idx: usize,
    import_id: ImportId,
}

fn module_name_of(source: &SourceRecord) -> String {
    source
        .ast
        .as_ref()
        .and_then(|ast| ast.tops().next())
        .and_then(|(_, t)| t.module_name.as_ref())
        .map(|n| n.to_string())
        .unwrap_or_default()
}

/// Resolver: iterates child-repository discovery to a fixed point, exactly
/// per the governing pseudocode. Single-threaded by design — each wave's
/// outcome feeds the next wave's todo list, so there is no embarrassingly
/// parallel slice here beyond the per-repo prologue parse already done in
/// `parse_prologues`.
///
/// All child removal (both for a remote that never resolved this wave and
/// for one that was not visited at all) is deferred to a single sweep at
/// the end, so `root.children` indices stay stable for the whole loop.
/// This is what lets every importing AST node keep its own reference
/// through to the final attach-error pass, instead of collapsing distinct
/// failures onto one warning.
pub fn resolve(root: &mut Repository, env: &DatumNamespace, flags: FetchFlags) {
    for child in &mut root.children {
        child.marked = false;
    }

    let root_path = root.local_path.clone();
    let deps_dir = root_path.join("_hkdeps");
    let _ = std::fs::create_dir_all(&deps_dir);

    // Mirrors `repository.cpp::recursive_scan_prologues`'s `all_nodes` map:
    // every url seen is recorded together with every AST import node that
    // referenced it, so a later fetch failure can be attached to each of
    // them individually rather than to a single span.
    let mut importers: HashMap<String, (RemoteUrl, Vec<ImportRef>)> = HashMap::new();
    let mut todo: VecDeque<RemoteUrl> = VecDeque::new();
    for (source_idx, import_id, url) in root.active_remote_imports_with_ids() {
        todo.push_back(url.clone());
        importers
            .entry(url.url.clone())
            .or_insert_with(|| (url, Vec::new()))
            .1
            .push(ImportRef { repo: RepoSelector::Root, source_idx, import_id });
    }

    let mut by_url: HashMap<String, usize> = root
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.remote_url.as_ref().map(|u| (u.url.clone(), i)))
        .collect();
    let mut failed: HashSet<usize> = HashSet::new();

    while let Some(url) = todo.pop_front() {
        let idx = *by_url.entry(url.url.clone()).or_insert_with(|| {
            let dest = remote::dest_path_for(&root_path, &url);
            root.children.push(Repository::new(dest, Some(url.clone())));
            root.children.len() - 1
        });

        if root.children[idx].marked {
            continue;
        }
        root.children[idx].marked = true;

        let dest = root.children[idx].local_path.clone();
        let result: Result<(), RemoteError> = remote::fetch_and_update(&url, &dest, &deps_dir, flags);

        match result {
            Err(_) => {
                failed.insert(idx);
            }
            Ok(()) => {
                let child = &mut root.children[idx];
                let _ = child.gather();
                child.parse_prologues();
                child.evaluate_build_guards(env);
                for (source_idx, import_id, discovered) in child.active_remote_imports_with_ids() {
                    todo.push_back(discovered.clone());
                    importers
                        .entry(discovered.url.clone())
                        .or_insert_with(|| (discovered, Vec::new()))
                        .1
                        .push(ImportRef { repo: RepoSelector::Child(idx), source_idx, import_id });
                }
            }
        }
    }

    // Attach one warning per importing node for every url whose repository
    // failed to resolve this run.
    for (url_key, (url, refs)) in &importers {
        let Some(&idx) = by_url.get(url_key) else { continue };
        if !failed.contains(&idx) {
            continue;
        }
        for import_ref in refs {
            let source = source_record_mut(root, import_ref.repo, import_ref.source_idx);
            let span = source
                .ast
                .as_ref()
                .map(|ast| {
                    let node = ast.import(import_ref.import_id);
                    (node.first_byte, node.last_byte)
                })
                .unwrap_or((0, 0));
            source
                .errors
                .add(span.0, span.1, ErrorCode::CouldNotCloneRepository, Some(url.url.clone()));
        }
    }

    // Sweep: drop every child never marked this run, and delete the
    // on-disk checkout for anything that failed to resolve, so a failed
    // remote never leaves a stale `_hkdeps/<dirname>` directory behind.
    let mut kept = Vec::with_capacity(root.children.len());
    for (idx, child) in root.children.drain(..).enumerate() {
        if !child.marked || failed.contains(&idx) {
            let _ = std::fs::remove_dir_all(&child.local_path);
        } else {
            kept.push(child);
        }
    }
    root.children = kept;

    check_module_consistency(root);
}

/// Post-scan module-consistency checks required once the whole source set
/// (root plus every resolved child repository) is stable. Grounded on
/// `resolver/repository.{hpp,cpp}`'s `get_anchors`/`get_modules_by_anchor`
/// (anchor membership is scoped to a single repository's own sources) and
/// `error/hkc_error.cpp`'s messages for the duplicate/anchor/import codes.
///
/// Simplification (see DESIGN.md): an "anchor module" is one whose
/// fully-qualified name has exactly one component, and imported-module
/// resolution is an exact string match against every enabled module name
/// in the whole tree rather than a full relative-name search.
pub fn check_module_consistency(root: &mut Repository) {
    struct Declared {
        repo: RepoSelector,
        source_idx: usize,
        top_id: TopId,
        name: String,
        fallback: bool,
    }
    struct ImportedRef {
        repo: RepoSelector,
        source_idx: usize,
        import_id: ImportId,
        name: String,
    }

    let mut repos: Vec<RepoSelector> = vec![RepoSelector::Root];
    repos.extend((0..root.children.len()).map(RepoSelector::Child));

    let mut declared: Vec<Declared> = Vec::new();
    let mut imported: Vec<ImportedRef> = Vec::new();

    for &repo in &repos {
        let repo_ref = match repo {
            RepoSelector::Root => &*root,
            RepoSelector::Child(c) => &root.children[c],
        };
        for (source_idx, source) in repo_ref.sources_by_path.iter().enumerate() {
            let Some(ast) = &source.ast else { continue };
            for (top_id, top) in ast.tops() {
                if top.kind != TopKind::Module || top.enabled != Some(true) {
                    continue;
                }
                let Some(name) = &top.module_name else { continue };
                declared.push(Declared {
                    repo,
                    source_idx,
                    top_id,
                    name: name.to_string(),
                    fallback: top.fallback,
                });
            }
            for (import_id, import) in ast.imports() {
                if !import.enabled.unwrap_or(false) {
                    continue;
                }
                if let ImportKind::Module { name, .. } = &import.kind {
                    imported.push(ImportedRef { repo, source_idx, import_id, name: name.to_string() });
                }
            }
        }
    }

    // Duplicate module / duplicate fallback module: grouped by name across
    // the whole tree.
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, d) in declared.iter().enumerate() {
        by_name.entry(d.name.as_str()).or_default().push(i);
    }
    for members in by_name.values() {
        if members.len() > 1 {
            for &i in members {
                let d = &declared[i];
                emit_on_top(root, d.repo, d.source_idx, d.top_id, ErrorCode::DuplicateModule);
            }
        }
        let fallback_members: Vec<usize> = members.iter().copied().filter(|&i| declared[i].fallback).collect();
        if fallback_members.len() > 1 {
            for i in fallback_members {
                let d = &declared[i];
                emit_on_top(root, d.repo, d.source_idx, d.top_id, ErrorCode::DuplicateFallbackModule);
            }
        }
    }

    // Missing anchor module: scoped to a single repository's own sources.
    for &repo in &repos {
        let in_repo: Vec<&Declared> = declared.iter().filter(|d| d.repo == repo).collect();
        let anchors: HashSet<&str> = in_repo
            .iter()
            .filter(|d| anchor_component(&d.name).is_some())
            .map(|d| anchor_component(&d.name).unwrap())
            .collect();
        for d in &in_repo {
            let Some(required) = submodule_anchor_requirement(&d.name) else { continue };
            if !anchors.contains(required) {
                emit_on_top(root, d.repo, d.source_idx, d.top_id, ErrorCode::MissingAnchorModule);
            }
        }
    }

    // Imported module not found: exact-name match against the whole tree.
    let declared_names: HashSet<&str> = declared.iter().map(|d| d.name.as_str()).collect();
    for r in &imported {
        if !declared_names.contains(r.name.as_str()) {
            let source = source_record_mut(root, r.repo, r.source_idx);
            let span = source
                .ast
                .as_ref()
                .map(|ast| {
                    let node = ast.import(r.import_id);
                    (node.first_byte, node.last_byte)
                })
                .unwrap_or((0, 0));
            source.errors.add(span.0, span.1, ErrorCode::ImportedModuleNotFound, None);
        }
    }
}

/// A module with exactly one name component is itself an anchor; returns
/// that component.
fn anchor_component(name: &str) -> Option<&str> {
    let trimmed = name.trim_start_matches('.');
    if trimmed.contains('.') || trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// For a sub-module name, the anchor component it must have a sibling
/// anchor module for; `None` if the name is itself an anchor (no
/// requirement).
fn submodule_anchor_requirement(name: &str) -> Option<&str> {
    let trimmed = name.trim_start_matches('.');
    let first = trimmed.split('.').next()?;
    if trimmed == first {
        None
    } else {
        Some(first)
    }
}

fn emit_on_top(root: &mut Repository, repo: RepoSelector, source_idx: usize, top_id: TopId, code: ErrorCode) {
    let source = source_record_mut(root, repo, source_idx);
    let span = source
        .ast
        .as_ref()
        .map(|ast| {
            let node = ast.top(top_id);
            (node.first_byte, node.last_byte)
        })
        .unwrap_or((0, 0));
    source.errors.add(span.0, span.1, code, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_adds_and_drops_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hkm"), "module .a;\n").unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        assert_eq!(repo.sources_by_path.len(), 1);

        std::fs::remove_file(dir.path().join("a.hkm")).unwrap();
        std::fs::write(dir.path().join("b.hkm"), "module .b;\n").unwrap();
        repo.gather().unwrap();
        assert_eq!(repo.sources_by_path.len(), 1);
        assert_eq!(repo.sources_by_path[0].path.file_name().unwrap(), "b.hkm");
    }

    #[test]
    fn active_remote_imports_skips_disabled_imports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.hkm"),
            "module .a;\nimport git \"u\" \"r\" if 0;\n",
        )
        .unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        assert!(repo.active_remote_imports().is_empty());
    }

    #[test]
    fn two_distinct_unreachable_remotes_each_get_their_own_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.hkm"),
            "module .a;\nimport git \"https://example.invalid/one.git\" \"main\";\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.hkm"),
            "module .b;\nimport git \"https://example.invalid/two.git\" \"main\";\n",
        )
        .unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        resolve(&mut repo, &DatumNamespace::new(), FetchFlags::default());

        let warnings: Vec<_> = repo
            .sources_by_path
            .iter()
            .flat_map(|s| s.errors.records().iter())
            .filter(|r| r.code == ErrorCode::CouldNotCloneRepository)
            .collect();
        assert_eq!(warnings.len(), 2);
        let spans: HashSet<(usize, usize)> = warnings.iter().map(|r| (r.first, r.last)).collect();
        assert_eq!(spans.len(), 2, "each importing node must keep its own span, not collapse to one");
        assert!(!spans.contains(&(0, 0)));
        assert!(repo.children.is_empty());
    }

    #[test]
    fn failed_remote_checkout_is_removed_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.hkm"),
            "module .a;\nimport git \"https://example.invalid/gone.git\" \"main\";\n",
        )
        .unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        resolve(&mut repo, &DatumNamespace::new(), FetchFlags::default());

        assert!(repo.children.is_empty());
        let deps_dir = dir.path().join("_hkdeps");
        let remaining = std::fs::read_dir(&deps_dir).map(|mut it| it.next().is_some()).unwrap_or(false);
        assert!(!remaining, "swept checkout directory must be deleted, not just forgotten in memory");
    }

    #[test]
    fn duplicate_module_is_flagged_on_both_declarations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hkm"), "module .a;\n").unwrap();
        std::fs::write(dir.path().join("a2.hkm"), "module .a;\n").unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        check_module_consistency(&mut repo);

        let count = repo
            .sources_by_path
            .iter()
            .flat_map(|s| s.errors.records().iter())
            .filter(|r| r.code == ErrorCode::DuplicateModule)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn submodule_without_anchor_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hkm"), "module .a.b;\n").unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        check_module_consistency(&mut repo);

        assert!(repo.sources_by_path[0]
            .errors
            .records()
            .iter()
            .any(|r| r.code == ErrorCode::MissingAnchorModule));
    }

    #[test]
    fn anchor_present_suppresses_missing_anchor_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hkm"), "module .a;\n").unwrap();
        std::fs::write(dir.path().join("ab.hkm"), "module .a.b;\n").unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        check_module_consistency(&mut repo);

        assert!(repo
            .sources_by_path
            .iter()
            .flat_map(|s| s.errors.records().iter())
            .all(|r| r.code != ErrorCode::MissingAnchorModule));
    }

    #[test]
    fn imported_module_not_found_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hkm"), "module .a;\nimport .does.not.exist;\n").unwrap();
        let mut repo = Repository::new(dir.path().to_path_buf(), None);
        repo.gather().unwrap();
        repo.parse_prologues();
        repo.evaluate_build_guards(&DatumNamespace::new());
        check_module_consistency(&mut repo);

        assert!(repo.sources_by_path[0]
            .errors
            .records()
            .iter()
            .any(|r| r.code == ErrorCode::ImportedModuleNotFound));
    }
}
