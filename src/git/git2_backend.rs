use anyhow::{Context, Result, anyhow};
use git2::{
    BranchType, Commit, Config, Cred, CredentialType, ErrorCode, IndexAddOption, PushOptions,
    RemoteCallbacks, Repository, Status, StatusOptions,
};
use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};

use super::{CommitOutcome, Pushed, RemoteOutcome, StatusLine, SyncError};

const MAX_AUTH_ATTEMPTS: usize = 3;

/// Build `RemoteCallbacks` that ask [`credential_for`] for credentials.
///
/// libgit2 keeps asking while credentials are rejected, so attempts are capped.
fn callbacks_with_creds<'a>(cfg: Option<Config>) -> RemoteCallbacks<'a> {
    let agent = env::var_os("SSH_AUTH_SOCK").is_some();
    let mut attempts = 0;
    let mut cb = RemoteCallbacks::new();
    cb.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_AUTH_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        credential_for(url, username_from_url, allowed, cfg.as_ref(), agent)
    });
    cb
}

/// Pick credentials for `url`: SSH agent, then the git credential helper,
/// then default credentials.
///
/// The agent is only tried when one is running (`agent`), and the helper only
/// when the remote accepts a username/password.
fn credential_for(
    url: &str,
    username_from_url: Option<&str>,
    allowed: CredentialType,
    cfg: Option<&Config>,
    agent: bool,
) -> std::result::Result<Cred, git2::Error> {
    let user = username_from_url.unwrap_or("git");
    let from_agent = if agent && allowed.contains(CredentialType::SSH_KEY) {
        Cred::ssh_key_from_agent(user)
    } else {
        Err(git2::Error::from_str("no ssh agent"))
    };
    from_agent
        .or_else(|_| match cfg {
            Some(cfg) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::credential_helper(cfg, url, username_from_url)
            }
            _ => Err(git2::Error::from_str("no credential helper")),
        })
        .or_else(|_| Cred::default())
}

/// Root of the working tree containing `dir`, or `dir` itself outside a repository.
pub fn work_root(dir: &Path) -> PathBuf {
    Repository::discover(dir)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| dir.to_path_buf())
}

/// Open the repository containing `dir`, searching parent directories.
///
/// # Errors
/// Returns an error if `dir` is not inside a git working tree.
pub fn open_repo(dir: &Path) -> Result<Repository> {
    let repo = Repository::discover(dir)
        .with_context(|| format!("not a git repository: {}", dir.display()))?;
    if repo.is_bare() {
        return Err(anyhow!("bare repository has no working tree: {}", dir.display()));
    }
    Ok(repo)
}

/// List changed paths the way `git status --short` does.
///
/// Untracked files are included (directories are recursed), ignored files are not.
pub fn status_lines(repo: &Repository) -> Result<Vec<StatusLine>> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);
    let statuses = repo.statuses(Some(&mut opts)).context("git status")?;
    Ok(statuses
        .iter()
        .map(|e| StatusLine {
            code: short_code(e.status()),
            path: String::from_utf8_lossy(e.path_bytes()).into_owned(),
        })
        .collect())
}

fn short_code(s: Status) -> String {
    if s.contains(Status::CONFLICTED) {
        return "UU".to_string();
    }
    if s.contains(Status::WT_NEW) {
        return "??".to_string();
    }
    let index = if s.contains(Status::INDEX_NEW) {
        'A'
    } else if s.contains(Status::INDEX_MODIFIED) {
        'M'
    } else if s.contains(Status::INDEX_DELETED) {
        'D'
    } else if s.contains(Status::INDEX_RENAMED) {
        'R'
    } else if s.contains(Status::INDEX_TYPECHANGE) {
        'T'
    } else {
        ' '
    };
    let worktree = if s.contains(Status::WT_MODIFIED) {
        'M'
    } else if s.contains(Status::WT_DELETED) {
        'D'
    } else if s.contains(Status::WT_RENAMED) {
        'R'
    } else if s.contains(Status::WT_TYPECHANGE) {
        'T'
    } else {
        ' '
    };
    format!("{}{}", index, worktree)
}

/// Make sure a remote called `name` exists.
///
/// - Present: left unchanged, even if its URL differs from `url`.
/// - Absent: added with exactly `url`.
///
/// # Errors
/// Returns [`SyncError::MissingRemoteUrl`] if the remote is absent and `url` is `None`.
pub fn ensure_remote(repo: &Repository, name: &str, url: Option<&str>) -> Result<RemoteOutcome> {
    match repo.find_remote(name) {
        Ok(remote) => {
            let existing = remote.url().unwrap_or_default().to_string();
            if let Some(want) = url
                && want != existing
            {
                tracing::warn!(remote = name, configured = want, %existing, "remote url differs; leaving it unchanged");
            }
            Ok(RemoteOutcome::Existing { url: existing })
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            let url = url.ok_or_else(|| SyncError::MissingRemoteUrl {
                remote: name.to_string(),
            })?;
            repo.remote(name, url)
                .with_context(|| format!("git remote add {} {}", name, url))?;
            tracing::debug!(remote = name, url, "remote added");
            Ok(RemoteOutcome::Added {
                url: url.to_string(),
            })
        }
        Err(e) => Err(e).with_context(|| format!("git remote get-url {}", name)),
    }
}

/// Stage every change in the working tree (`git add -A`).
///
/// Returns the number of paths that differ between `HEAD` and the index afterwards.
pub fn stage_all(repo: &Repository) -> Result<usize> {
    let mut index = repo.index()?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .context("git add -A")?;
    index.update_all(["*"].iter(), None).context("git add -A")?;
    index.write()?;

    let staged = status_lines(repo)?
        .iter()
        .filter(|l| !l.code.starts_with(' ') && l.code != "??")
        .count();
    Ok(staged)
}

/// Commit the index on top of `HEAD`.
///
/// An index identical to `HEAD` (or an empty index on an unborn branch) is
/// [`CommitOutcome::NothingToCommit`]. Failing to create the commit, e.g. when
/// no author identity is configured, is reported as [`CommitOutcome::Failed`]
/// rather than an error.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<CommitOutcome> {
    let mut index = repo.index()?;
    let tree_id = index.write_tree().context("git write-tree")?;
    let tree = repo.find_tree(tree_id)?;

    let parent: Option<Commit> = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(e).context("resolve HEAD"),
    };

    let unchanged = match &parent {
        Some(c) => c.tree_id() == tree_id,
        None => tree.len() == 0,
    };
    if unchanged {
        return Ok(CommitOutcome::NothingToCommit);
    }

    let sig = match repo.signature() {
        Ok(sig) => sig,
        Err(e) => {
            return Ok(CommitOutcome::Failed(format!(
                "no author identity: {}",
                e.message()
            )));
        }
    };
    let parents: Vec<&Commit> = parent.iter().collect();
    match repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents) {
        Ok(oid) => Ok(CommitOutcome::Created(oid)),
        Err(e) => Ok(CommitOutcome::Failed(e.message().to_string())),
    }
}

/// Push the current branch to `refs/heads/<branch>` on `remote_name`.
///
/// On success the local branch's upstream is set to `<remote>/<branch>`;
/// failing to do so is only logged.
///
/// # Errors
/// - [`SyncError::UnbornHead`] / [`SyncError::DetachedHead`] if there is no branch to push.
/// - [`SyncError::Rejected`] if the remote refuses the reference update.
/// - Any transport or authentication error.
pub fn push_head(repo: &Repository, remote_name: &str, branch: &str) -> Result<Pushed> {
    let head = match repo.head() {
        Ok(h) => h,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Err(SyncError::UnbornHead.into());
        }
        Err(e) => return Err(e).context("resolve HEAD"),
    };
    if !head.is_branch() {
        return Err(SyncError::DetachedHead.into());
    }
    let local_ref = head
        .name()
        .ok_or_else(|| anyhow!("invalid reference name"))?
        .to_string();
    let oid = head
        .target()
        .ok_or_else(|| anyhow!("HEAD has no target"))?;
    let remote_ref = format!("refs/heads/{}", branch);
    let refspec = format!("{}:{}", local_ref, remote_ref);

    let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
    {
        let mut cb = callbacks_with_creds(repo.config().ok());
        cb.push_update_reference(|refname, status| {
            if let Some(msg) = status {
                *rejection.borrow_mut() = Some((refname.to_string(), msg.to_string()));
            }
            Ok(())
        });
        let mut po = PushOptions::new();
        po.remote_callbacks(cb);

        let mut remote = repo
            .find_remote(remote_name)
            .with_context(|| format!("remote not found: {}", remote_name))?;
        remote
            .push(&[refspec.as_str()], Some(&mut po))
            .with_context(|| format!("git push {} {}", remote_name, refspec))?;
    }
    if let Some((refname, reason)) = rejection.into_inner() {
        return Err(SyncError::Rejected { refname, reason }.into());
    }

    let upstream = set_upstream(repo, &local_ref, remote_name, branch);
    Ok(Pushed {
        local_ref,
        remote_ref,
        oid,
        upstream,
    })
}

fn set_upstream(repo: &Repository, local_ref: &str, remote_name: &str, branch: &str) -> bool {
    let Some(short) = local_ref.strip_prefix("refs/heads/") else {
        return false;
    };
    let upstream = format!("{}/{}", remote_name, branch);
    let res = repo
        .find_branch(short, BranchType::Local)
        .and_then(|mut b| b.set_upstream(Some(&upstream)));
    match res {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(branch = short, %upstream, error = %e.message(), "could not set upstream");
            false
        }
    }
}
