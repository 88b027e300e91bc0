use anyhow::Result;
use colored::Colorize;
use git2::Repository;
use std::path::Path;

use crate::git::{StatusLine, open_repo, status_lines};

/// CLI command: print the working tree status of the repository at `dir`.
pub fn cmd_status(dir: &Path) -> Result<()> {
    let repo = open_repo(dir)?;
    print_status(&repo)
}

/// Print `git status --short` style lines, or a note that the tree is clean.
pub fn print_status(repo: &Repository) -> Result<()> {
    let lines = status_lines(repo)?;
    if lines.is_empty() {
        println!("{}", "working tree clean".dimmed());
        return Ok(());
    }
    for l in &lines {
        println!("{}", format_line(l));
    }
    Ok(())
}

fn format_line(l: &StatusLine) -> String {
    let code = match l.code.as_str() {
        "??" => l.code.red(),
        "UU" => l.code.red().bold(),
        c if !c.starts_with(' ') => l.code.green(),
        _ => l.code.yellow(),
    };
    format!("{} {}", code, l.path)
}
