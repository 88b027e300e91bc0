mod rules;
mod write;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Rule, load_config};
use crate::git::work_root;

pub use rules::{RuleReport, apply_rules};
pub use write::{ReplaceOutcome, atomic_replace, sha256_hex};

/// Command-line options for `sp patch`.
#[derive(Debug, Default, Clone)]
pub struct PatchOptions {
    pub dir: PathBuf,
    pub config: Option<PathBuf>,
    /// Patch this file instead of the configured one (single target only).
    pub file: Option<PathBuf>,
    /// Report what would change without writing.
    pub check: bool,
}

/// Result of patching one file.
#[derive(Debug, Clone)]
pub struct PatchReport {
    pub file: PathBuf,
    pub rules: Vec<RuleReport>,
    /// `None` in check mode.
    pub outcome: Option<ReplaceOutcome>,
    pub before: String,
    pub after: String,
}

/// CLI command: apply the configured text patches.
///
/// For each `[[patches]]` target the file is read, every rule is applied in
/// order and the result is written back atomically. Anchors that were not
/// found, or found more than once, are reported as warnings; neither makes
/// the command fail.
///
/// Config lookup and target paths are relative to the root of the working
/// tree containing `opts.dir` (or `opts.dir` itself outside a repository).
pub fn cmd_patch(opts: &PatchOptions) -> Result<()> {
    let root = work_root(&opts.dir);
    let (cfg, source) = load_config(opts.config.as_deref(), &root)?;
    let mut targets = cfg.patches;
    if let Some(file) = &opts.file {
        if targets.is_empty() {
            bail!("--file given but {} defines no [[patches]] rules", source);
        }
        if targets.len() != 1 {
            bail!(
                "--file needs exactly one configured patch target, found {}",
                targets.len()
            );
        }
        targets[0].file = file.clone();
    }
    if targets.is_empty() {
        eprintln!("no patches in {}", source);
        return Ok(());
    }

    for target in &targets {
        let path = root.join(&target.file);
        let report = patch_file(&path, &target.rules, opts.check)?;
        print_report(&report);
    }
    Ok(())
}

/// Apply `rules` to the file at `path`.
///
/// With `check` set the file is only read.
///
/// # Errors
/// Returns an error if the file cannot be read as UTF-8 or cannot be replaced.
pub fn patch_file(path: &Path, rules: &[Rule], check: bool) -> Result<PatchReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (patched, reports) = apply_rules(&text, rules);

    for r in &reports {
        match r.occurrences {
            0 => tracing::warn!(file = %path.display(), rule = %r.label, "anchor not found"),
            1 => tracing::debug!(file = %path.display(), rule = %r.label, "anchor replaced"),
            n => tracing::warn!(file = %path.display(), rule = %r.label, occurrences = n, "anchor matched more than once; all replaced"),
        }
    }

    let outcome = if check {
        None
    } else {
        Some(atomic_replace(path, &text, &patched)?)
    };

    let before = sha256_hex(text.as_bytes());
    let after = if patched == text {
        before.clone()
    } else {
        sha256_hex(patched.as_bytes())
    };
    Ok(PatchReport {
        file: path.to_path_buf(),
        rules: reports,
        outcome,
        before,
        after,
    })
}

fn print_report(report: &PatchReport) {
    let state = match report.outcome {
        Some(ReplaceOutcome::Replaced) => "patched".green(),
        Some(ReplaceOutcome::Unchanged) => "unchanged".dimmed(),
        None if report.before == report.after => "would not change".dimmed(),
        None => "would patch".yellow(),
    };
    println!(
        "{} {} ({} → {})",
        state,
        report.file.display(),
        &report.before[..8],
        &report.after[..8]
    );
    for r in &report.rules {
        let line = match r.occurrences {
            0 => format!("  {} {}: anchor not found", "!".yellow(), r.label),
            1 => format!("  {} {}: 1 replacement", "✔".green(), r.label),
            n => format!("  {} {}: {} replacements", "!".yellow(), r.label, n),
        };
        println!("{}", line);
    }
}
