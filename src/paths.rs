use anyhow::Result;
use std::{env, path::PathBuf};

/// Per-user locations used by `sp`.
#[derive(Clone, Debug)]
pub struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
}

/// Name of the repository-local config file, looked up in the working tree root.
pub const LOCAL_CONFIG: &str = ".sp.toml";

pub fn sp_home() -> Result<PathBuf> {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    Ok(base.join(".sp"))
}

pub fn paths() -> Result<Paths> {
    let home = sp_home()?;
    Ok(Paths {
        config: home.join("config.toml"),
        home,
    })
}
