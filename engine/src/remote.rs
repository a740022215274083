//! Remote repository client (component L).
//!
//! Grounded on `resolver/git.{hpp,cpp}` and `resolver/remote_repo_url.{hpp,cpp}`.
//! `git` URLs are fetched via `gix`; `zip` URLs get full data-model support
//! (hashing, directory naming) but no fetch transport exists in this
//! workspace's dependency stack, so a `zip` fetch always yields
//! `could-not-clone-repository`.

use crate::util::hash::{base32_encode, sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    Git,
    Zip,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteUrl {
    pub kind: RemoteKind,
    pub url: String,
    pub rev: String,
}

impl RemoteUrl {
    pub fn git(url: impl Into<String>, rev: impl Into<String>) -> Self {
        RemoteUrl {
            kind: RemoteKind::Git,
            url: url.into(),
            rev: rev.into(),
        }
    }

    pub fn zip(url: impl Into<String>) -> Self {
        RemoteUrl {
            kind: RemoteKind::Zip,
            url: url.into(),
            rev: String::new(),
        }
    }

    fn hash_input(&self) -> Vec<u8> {
        let kind = match self.kind {
            RemoteKind::Git => "git",
            RemoteKind::Zip => "zip",
        };
        let mut buf = Vec::with_capacity(kind.len() + self.url.len() + self.rev.len());
        buf.extend_from_slice(kind.as_bytes());
        buf.extend_from_slice(self.url.as_bytes());
        buf.extend_from_slice(self.rev.as_bytes());
        buf
    }

    pub fn short_hash(&self) -> String {
        let digest = sha256(&self.hash_input());
        base32_encode(&digest)[..10].to_owned()
    }

    fn stem(&self) -> String {
        let trimmed = self.url.trim_end_matches('/');
        let stem = trimmed.rsplit('/').next().unwrap_or(trimmed);
        stem.trim_end_matches(".git").to_owned()
    }

    pub fn directory_name(&self) -> String {
        format!("{}-{}", self.stem(), self.short_hash())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("could not clone repository: {0}")]
    CouldNotCloneRepository(String),
    #[error("remote url mismatch")]
    RemoteUrlMismatch,
    #[error("revision not found: {0}")]
    RevNotFound(String),
    #[error("file outside work directory")]
    FileOutsideWorkdir,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchFlags {
    pub allow_skip_refetch: bool,
    pub force_fetch: bool,
    pub force_clean: bool,
    pub force_prologue_reparse: bool,
}

fn ensure_within(work_dir: &Path, path: &Path) -> Result<(), RemoteError> {
    let canonical_work = std::fs::canonicalize(work_dir).unwrap_or_else(|_| work_dir.to_path_buf());
    let canonical_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if canonical_path.starts_with(&canonical_work) {
        Ok(())
    } else {
        Err(RemoteError::FileOutsideWorkdir)
    }
}

pub fn clone(url: &RemoteUrl, dest_path: &Path) -> Result<(), RemoteError> {
    match url.kind {
        RemoteKind::Zip => Err(RemoteError::CouldNotCloneRepository(url.url.clone())),
        RemoteKind::Git => {
            let mut prepare = gix::prepare_clone(url.url.as_str(), dest_path)
                .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
            let (mut checkout, _outcome) = prepare
                .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
                .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
            checkout
                .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
                .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
            if !url.rev.is_empty() {
                checkout_rev(dest_path, &url.rev)?;
            }
            Ok(())
        }
    }
}

pub fn checkout(repo_path: &Path, rev: &str) -> Result<(), RemoteError> {
    checkout_rev(repo_path, rev)
}

/// Resolves `rev` against the already-opened `gix` repository first, so a
/// bad revision is reported as `rev-not-found` rather than a generic git
/// failure, then performs the actual checkout (HEAD + worktree) by
/// shelling out to the `git` binary. `gix`'s own worktree-mutation API has
/// no precedent anywhere in this workspace's git handling; every other
/// mutating operation here goes through `git` directly, matching that
/// convention rather than hand-rolling an unverified low-level call.
fn checkout_rev(repo_path: &Path, rev: &str) -> Result<(), RemoteError> {
    let repo = gix::open(repo_path).map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
    repo.rev_parse_single(rev)
        .map_err(|_| RemoteError::RevNotFound(rev.to_owned()))?;
    run_git(repo_path, &["checkout", "--detach", "--quiet", rev])
        .map_err(|_| RemoteError::RevNotFound(rev.to_owned()))?;
    Ok(())
}

fn run_git(repo_path: &Path, args: &[&str]) -> Result<String, RemoteError> {
    let output = std::process::Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RemoteError::CouldNotCloneRepository(stderr.into_owned()));
    }
    String::from_utf8(output.stdout).map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))
}

pub fn fetch(repo_path: &Path) -> Result<(), RemoteError> {
    let repo = gix::open(repo_path).map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
    let remote = repo
        .find_default_remote(gix::remote::Direction::Fetch)
        .ok_or_else(|| RemoteError::CouldNotCloneRepository("no remote configured".to_owned()))?
        .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
    remote
        .connect(gix::remote::Direction::Fetch)
        .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?
        .prepare_fetch(gix::progress::Discard, Default::default())
        .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?
        .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
        .map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
    Ok(())
}

/// Verifies that `path` is already a clone of `url` checked out at `rev`;
/// if not, clones or re-checks-out as needed.
pub fn fetch_and_update(
    url: &RemoteUrl,
    path: &Path,
    work_dir: &Path,
    flags: FetchFlags,
) -> Result<(), RemoteError> {
    ensure_within(work_dir, path)?;

    if url.kind == RemoteKind::Zip {
        return Err(RemoteError::CouldNotCloneRepository(url.url.clone()));
    }

    if !path.join(".git").exists() {
        return clone(url, path);
    }

    let repo = gix::open(path).map_err(|e| RemoteError::CouldNotCloneRepository(e.to_string()))?;
    let configured_url = repo
        .find_default_remote(gix::remote::Direction::Fetch)
        .and_then(|r| r.ok())
        .and_then(|r| r.url(gix::remote::Direction::Fetch).map(|u| u.to_bstring().to_string()));

    if let Some(configured) = &configured_url {
        if configured != &url.url {
            return Err(RemoteError::RemoteUrlMismatch);
        }
    }

    if flags.force_fetch {
        fetch(path)?;
    }
    if !url.rev.is_empty() {
        checkout_rev(path, &url.rev)?;
    }
    Ok(())
}

pub fn dest_path_for(root: &Path, url: &RemoteUrl) -> PathBuf {
    root.join("_hkdeps").join(url.directory_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_name_combines_stem_and_short_hash() {
        let url = RemoteUrl::git("https://example.com/foo.git", "main");
        let name = url.directory_name();
        assert!(name.starts_with("foo-"));
        assert_eq!(name.len(), "foo-".len() + 10);
    }

    #[test]
    fn same_kind_url_rev_hashes_identically() {
        let a = RemoteUrl::git("https://example.com/foo.git", "main");
        let b = RemoteUrl::git("https://example.com/foo.git", "main");
        assert_eq!(a.short_hash(), b.short_hash());
    }

    #[test]
    fn different_rev_changes_hash() {
        let a = RemoteUrl::git("https://example.com/foo.git", "main");
        let b = RemoteUrl::git("https://example.com/foo.git", "dev");
        assert_ne!(a.short_hash(), b.short_hash());
    }

    #[test]
    fn zip_urls_never_fetch() {
        let url = RemoteUrl::zip("https://example.com/foo.zip");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x");
        assert_eq!(
            fetch_and_update(&url, &dest, dir.path(), FetchFlags::default()),
            Err(RemoteError::CouldNotCloneRepository(url.url.clone()))
        );
    }
}
