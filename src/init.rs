use anyhow::Result;
use std::io::{self, Write};

use crate::config::DEFAULT_CONFIG;

/// Print the built-in configuration.
///
/// The output is meant to be redirected into a starting config:
/// ```sh
/// sp init > .sp.toml
/// ```
/// so nothing but the TOML itself may be written to `stdout`.
///
/// # Errors
/// Returns an error if writing to `stdout` fails.
pub fn cmd_init() -> Result<()> {
    io::stdout().write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(())
}
