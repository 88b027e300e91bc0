//! Crate entry point for **sp**.
//!
//! This library provides the internal implementation for the `sp` CLI.
//! Each submodule encapsulates one responsibility (config parsing, git operations, sync, patching, etc.).
//! The `pub use` re-exports make selected commands accessible directly from the crate root.
//!
//! This file is primarily intended for developers hacking on `sp`.

mod config;
mod git;
mod init;
mod logger;
mod patch;
mod paths;
mod progress;
mod status;
mod sync;

/// Re-export commonly used types and commands so they can be accessed from `sp::*`.
pub use config::{Config, ConfigSource, PatchTarget, Rule, SyncSettings, cmd_config, load_config};
pub use init::cmd_init;
pub use logger::init_logger;
pub use patch::{PatchOptions, PatchReport, cmd_patch, patch_file};
pub use paths::sp_home;
pub use status::cmd_status;
pub use sync::{SyncOptions, SyncReport, cmd_sync, run_sync};
