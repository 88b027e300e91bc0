//! # sp
//!
//! **sp** syncs a firmware working tree to its remote and splices fixed
//! patches into source files.
//!
//! Features:
//! - `sp sync` ensures the remote exists, stages everything, commits, pushes
//!   and prints the follow-up link and post-build commands
//! - `sp patch` applies the configured anchor/replacement rules
//! - `sp status` prints the working tree status
//! - `sp init` prints the built-in configuration
//! - `sp config` opens `$(sp home)/config.toml` in `$EDITOR`
//! - `sp home` prints the sp home directory
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sp::{
    PatchOptions, SyncOptions, cmd_config, cmd_init, cmd_patch, cmd_status, cmd_sync,
    init_logger, sp_home,
};
use std::path::PathBuf;

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "sp",
    version,
    about = "sp - sync a working tree and patch its sources",
    arg_required_else_help = true
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Args, Debug)]
struct Common {
    /// Working directory (defaults to the current directory)
    #[arg(short = 'C', long, default_value = ".")]
    dir: PathBuf,
    /// Config file to use instead of .sp.toml / $(sp home)/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Available subcommands.
///
/// Each variant corresponds to a subcommand of `sp`.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Ensure the remote, commit all changes and push
    Sync {
        #[command(flatten)]
        common: Common,
        /// Remote name
        #[arg(long)]
        remote: Option<String>,
        /// URL used when the remote has to be added
        #[arg(long)]
        url: Option<String>,
        /// Branch to push to
        #[arg(long)]
        branch: Option<String>,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Apply the configured text patches
    Patch {
        #[command(flatten)]
        common: Common,
        /// Patch this file (relative to the repository root) instead of the configured target
        #[arg(long)]
        file: Option<PathBuf>,
        /// Report anchor matches without writing
        #[arg(long)]
        check: bool,
    },
    /// Print the working tree status
    Status {
        /// Working directory (defaults to the current directory)
        #[arg(short = 'C', long, default_value = ".")]
        dir: PathBuf,
    },
    /// Print the built-in configuration
    Init,
    /// Open the user config in $EDITOR
    Config,
    /// Print the sp home directory
    Home,
}

/// CLI entry point.
///
/// Parses arguments with `clap` and executes the selected subcommand.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let Some(cmd) = cli.cmd else {
        return Ok(());
    };

    match cmd {
        Cmd::Sync {
            common,
            remote,
            url,
            branch,
            message,
        } => cmd_sync(&SyncOptions {
            dir: common.dir,
            config: common.config,
            remote,
            url,
            branch,
            message,
        }),
        Cmd::Patch {
            common,
            file,
            check,
        } => cmd_patch(&PatchOptions {
            dir: common.dir,
            config: common.config,
            file,
            check,
        }),
        Cmd::Status { dir } => cmd_status(&dir),
        Cmd::Init => cmd_init(),
        Cmd::Config => cmd_config(),
        Cmd::Home => {
            println!("{}", sp_home()?.display());
            Ok(())
        }
    }
}
