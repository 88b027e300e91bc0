//! Git integration layer.
//!
//! This module wraps the actual backend implementation (`git2_backend`)
//! and re-exports only what the sync procedure needs: status listing,
//! remote registration, staging, committing and pushing.
//!
//! Outcomes that callers branch on are plain enums; failures the sync
//! procedure treats as fatal are [`SyncError`] variants wrapped in `anyhow`.

mod git2_backend;

use git2::Oid;
use thiserror::Error;

pub use git2_backend::{
    commit_staged, ensure_remote, open_repo, push_head, stage_all, status_lines, work_root,
};

/// One line of `git status --short` style output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Index column followed by worktree column, e.g. `"M "`, `" D"`, `"??"`.
    pub code: String,
    pub path: String,
}

/// Result of making sure the sync remote is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The remote was already present and was left untouched.
    Existing { url: String },
    /// The remote was missing and has been added.
    Added { url: String },
}

impl RemoteOutcome {
    pub fn url(&self) -> &str {
        match self {
            RemoteOutcome::Existing { url } | RemoteOutcome::Added { url } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Created(Oid),
    /// Staged tree matches `HEAD`; no commit was made.
    NothingToCommit,
    /// Commit could not be made. Reported as a warning, the push still runs.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pushed {
    pub local_ref: String,
    pub remote_ref: String,
    pub oid: Oid,
    /// Whether the local branch now tracks `<remote>/<branch>`.
    pub upstream: bool,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote {remote} is not configured and no url was given")]
    MissingRemoteUrl { remote: String },
    #[error("HEAD is detached; check out a branch before syncing")]
    DetachedHead,
    #[error("nothing to push: the current branch has no commits yet")]
    UnbornHead,
    #[error("push of {refname} rejected: {reason}")]
    Rejected { refname: String, reason: String },
}
