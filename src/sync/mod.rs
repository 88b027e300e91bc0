mod follow_up;

use anyhow::{Result, anyhow};
use colored::Colorize;
use git2::Repository;
use std::path::PathBuf;

use crate::config::{Config, SyncSettings, load_config};
use crate::git::{
    CommitOutcome, Pushed, RemoteOutcome, commit_staged, ensure_remote, open_repo, push_head,
    stage_all,
};
use crate::progress::{Step, Steps};
use crate::status::print_status;

pub use follow_up::{FollowUp, follow_up};

/// Command-line overrides for `sp sync`.
#[derive(Debug, Default, Clone)]
pub struct SyncOptions {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    pub remote: Option<String>,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
}

impl SyncOptions {
    fn apply(&self, mut s: SyncSettings) -> SyncSettings {
        if let Some(v) = &self.remote {
            s.remote = v.clone();
        }
        if let Some(v) = &self.url {
            s.url = Some(v.clone());
        }
        if let Some(v) = &self.branch {
            s.branch = v.clone();
        }
        if let Some(v) = &self.message {
            s.message = v.clone();
        }
        s
    }
}

/// What a completed sync did.
#[derive(Debug)]
pub struct SyncReport {
    pub remote: RemoteOutcome,
    pub staged: usize,
    pub commit: CommitOutcome,
    pub pushed: Pushed,
}

/// Synchronize the working tree with the configured remote branch.
///
/// High-level flow:
/// 1. Print the working tree status.
/// 2. Ensure the remote is registered (see [`run_sync`]), stage, commit, push.
/// 3. Print the follow-up link and post-build commands.
///
/// A push failure aborts before the follow-up is printed and makes the
/// process exit non-zero.
pub fn cmd_sync(opts: &SyncOptions) -> Result<()> {
    let repo = open_repo(&opts.dir)?;
    let root = repo
        .workdir()
        .ok_or_else(|| anyhow!("repository has no working tree"))?
        .to_path_buf();
    let (cfg, source) = load_config(opts.config.as_deref(), &root)?;
    let settings = opts.apply(cfg.sync);
    Config {
        sync: settings.clone(),
        patches: Vec::new(),
    }
    .validate()?;
    tracing::info!(%source, remote = %settings.remote, branch = %settings.branch, "sync");

    print_status(&repo)?;
    println!();

    let report = run_sync(&repo, &settings, &Steps::new())?;

    let fu = follow_up(&settings, report.remote.url());
    print_follow_up(&fu);
    Ok(())
}

/// Run the remote → stage → commit → push sequence.
///
/// Each step gets its own spinner on `steps`. Steps run strictly in order and
/// the first fatal error is returned; a commit that could not be made is only
/// a warning and the push still runs.
pub fn run_sync(repo: &Repository, s: &SyncSettings, steps: &Steps) -> Result<SyncReport> {
    let step = steps.start(format!("checking remote {}", s.remote));
    let remote = finish(step, ensure_remote(repo, &s.remote, s.url.as_deref()), |r| {
        match r {
            RemoteOutcome::Existing { url } => format!("remote {} ({})", s.remote, url),
            RemoteOutcome::Added { url } => format!("added remote {} ({})", s.remote, url),
        }
    })?;

    let step = steps.start("staging changes");
    let staged = finish(step, stage_all(repo), |n| format!("staged {} path(s)", n))?;

    let step = steps.start("committing");
    let commit = match commit_staged(repo, &s.message) {
        Ok(CommitOutcome::Created(oid)) => {
            step.ok(format!("committed {} {}", short_oid(oid), s.message));
            CommitOutcome::Created(oid)
        }
        Ok(CommitOutcome::NothingToCommit) => {
            step.ok("nothing to commit");
            CommitOutcome::NothingToCommit
        }
        Ok(CommitOutcome::Failed(msg)) => {
            tracing::warn!(reason = %msg, "commit failed; pushing existing history");
            step.warn(format!("commit skipped (warning: {})", msg));
            CommitOutcome::Failed(msg)
        }
        Err(e) => {
            step.fail(format!("committing (error: {})", e));
            return Err(e);
        }
    };

    let step = steps.start(format!("pushing to {}/{}", s.remote, s.branch));
    let pushed = finish(step, push_head(repo, &s.remote, &s.branch), |p| {
        format!(
            "pushed {} to {}/{} ({})",
            p.local_ref.trim_start_matches("refs/heads/"),
            s.remote,
            s.branch,
            short_oid(p.oid)
        )
    })?;

    Ok(SyncReport {
        remote,
        staged,
        commit,
        pushed,
    })
}

/// Finish `step` according to `res`, passing the result through.
fn finish<T>(step: Step, res: Result<T>, ok_msg: impl FnOnce(&T) -> String) -> Result<T> {
    match res {
        Ok(v) => {
            step.ok(ok_msg(&v));
            Ok(v)
        }
        Err(e) => {
            step.fail(format!("{:#}", e));
            Err(e)
        }
    }
}

fn short_oid(oid: git2::Oid) -> String {
    let s = oid.to_string();
    s[..7].to_string()
}

fn print_follow_up(fu: &FollowUp) {
    println!();
    if let Some(link) = &fu.link {
        println!("{} {}", "check the build:".bold(), link.cyan().underline());
    }
    if !fu.commands.is_empty() {
        println!("{}", "after the build finishes, run:".bold());
        for c in &fu.commands {
            println!("  {}", c.green());
        }
    }
}
