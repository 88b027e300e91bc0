use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use crate::paths::{LOCAL_CONFIG, paths};

/// Built-in configuration, used when no config file is found.
pub const DEFAULT_CONFIG: &str = include_str!("../../assets/default.toml");

static REF_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]+$").expect("static regex"));

/// Top-level configuration structure loaded from TOML.
///
/// Example TOML:
/// ```toml
/// [sync]
/// remote = "origin"
/// url    = "git@github.com:owner/firmware.git"
/// branch = "main"
///
/// [[patches]]
/// file = "modules/device_web_server.py"
///
/// [[patches.rules]]
/// name        = "files route"
/// anchor      = "# 404"
/// replacement = "# files\n# 404"
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub sync: SyncSettings,
    pub patches: Vec<PatchTarget>,
}

/// Settings for `sp sync`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncSettings {
    pub remote: String,
    pub url: Option<String>,
    pub branch: String,
    pub message: String,
    pub link: Option<String>,
    pub commands: Vec<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            url: None,
            branch: "main".to_string(),
            message: "Update firmware modules".to_string(),
            link: None,
            commands: Vec::new(),
        }
    }
}

/// One file to patch and the rules applied to it, in order.
#[derive(Debug, Deserialize, Clone)]
pub struct PatchTarget {
    pub file: PathBuf,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A literal anchor and the text that replaces it.
#[derive(Debug, Deserialize, Clone)]
pub struct Rule {
    #[serde(default)]
    pub name: Option<String>,
    pub anchor: String,
    pub replacement: String,
}

impl Rule {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.anchor)
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Local(PathBuf),
    Home(PathBuf),
    Builtin,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Local(p) | ConfigSource::Home(p) => {
                write!(f, "{}", p.display())
            }
            ConfigSource::Builtin => f.write_str("built-in defaults"),
        }
    }
}

impl Config {
    pub fn builtin() -> Result<Config> {
        parse_config(DEFAULT_CONFIG).context("failed to parse built-in config")
    }

    /// Reject names git would refuse and rules that can never match.
    pub fn validate(&self) -> Result<()> {
        if !REF_NAME.is_match(&self.sync.remote) {
            bail!("invalid remote name: {:?}", self.sync.remote);
        }
        if !REF_NAME.is_match(&self.sync.branch) {
            bail!("invalid branch name: {:?}", self.sync.branch);
        }
        for target in &self.patches {
            if target.file.as_os_str().is_empty() {
                bail!("patch target without a file");
            }
            for (idx, rule) in target.rules.iter().enumerate() {
                if rule.anchor.is_empty() {
                    bail!(
                        "rule #{} for {} has an empty anchor",
                        idx + 1,
                        target.file.display()
                    );
                }
            }
        }
        Ok(())
    }
}

pub fn parse_config(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)?;
    Ok(cfg)
}

/// Load the effective configuration.
///
/// Resolution order:
/// 1. `explicit` (from `--config`), which must exist
/// 2. `<root>/.sp.toml`
/// 3. `$(sp home)/config.toml`
/// 4. [`DEFAULT_CONFIG`]
///
/// The result is validated before it is returned.
pub fn load_config(explicit: Option<&Path>, root: &Path) -> Result<(Config, ConfigSource)> {
    let (cfg, source) = if let Some(p) = explicit {
        (read_config(p)?, ConfigSource::Explicit(p.to_path_buf()))
    } else {
        let local = root.join(LOCAL_CONFIG);
        let home = paths()?.config;
        if local.is_file() {
            (read_config(&local)?, ConfigSource::Local(local))
        } else if home.is_file() {
            (read_config(&home)?, ConfigSource::Home(home))
        } else {
            (Config::builtin()?, ConfigSource::Builtin)
        }
    };
    cfg.validate()
        .with_context(|| format!("invalid config: {}", source))?;
    tracing::debug!(%source, patches = cfg.patches.len(), "config loaded");
    Ok((cfg, source))
}

fn read_config(path: &Path) -> Result<Config> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("config not found: {}", path.display()))?;
    parse_config(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

/// Path of the user config, written from [`DEFAULT_CONFIG`] if it does not exist yet.
pub fn ensure_home_config(home: &Path) -> Result<PathBuf> {
    let path = home.join("config.toml");
    if !path.exists() {
        fs::create_dir_all(home)?;
        fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "seeded config from built-in defaults");
    }
    Ok(path)
}

/// CLI command: open the user config in `$EDITOR` (`vi` when unset).
///
/// Replaces the current process; only returns if the editor cannot be started.
pub fn cmd_config() -> Result<()> {
    let path = ensure_home_config(&paths()?.home)?;
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let err = Command::new(&editor).arg(&path).exec();
    Err(err).with_context(|| format!("failed to launch editor: {}", editor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builtin_config_parses_and_validates() {
        let cfg = Config::builtin().unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.sync.remote, "origin");
        assert_eq!(cfg.sync.branch, "main");
        assert!(cfg.sync.url.is_none());
        assert_eq!(cfg.patches.len(), 1);
        let rules = &cfg.patches[0].rules;
        assert_eq!(rules.len(), 2);
        assert!(rules[0].anchor.starts_with("try:\n    import ujson"));
        assert!(rules[0].replacement.ends_with(&rules[0].anchor));
        assert!(rules[1].replacement.ends_with(&rules[1].anchor));
        assert!(rules[1].replacement.contains(r"'\r\n\r\n'"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = parse_config("[sync]\nurl = \"https://example.com/r.git\"\n").unwrap();
        assert_eq!(cfg.sync.remote, "origin");
        assert_eq!(cfg.sync.url.as_deref(), Some("https://example.com/r.git"));
        assert!(cfg.patches.is_empty());
    }

    #[test]
    fn validate_rejects_bad_names_and_empty_anchor() {
        let mut cfg = Config::default();
        cfg.sync.remote = "bad remote".into();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.sync.branch = "feature/x".into();
        cfg.validate().unwrap();

        let cfg = parse_config(
            "[[patches]]\nfile = \"a.py\"\n[[patches.rules]]\nanchor = \"\"\nreplacement = \"x\"\n",
        )
        .unwrap();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("empty anchor"), "{err}");
    }

    #[test]
    fn rule_label_prefers_name() {
        let r = Rule {
            name: None,
            anchor: "# 404".into(),
            replacement: String::new(),
        };
        assert_eq!(r.label(), "# 404");
    }

    #[test]
    #[serial]
    fn resolution_prefers_explicit_then_local_then_home() {
        let td = tempdir().unwrap();
        let xdg = td.path().join("xdg");
        let root = td.path().join("repo");
        fs::create_dir_all(xdg.join(".sp")).unwrap();
        fs::create_dir_all(&root).unwrap();
        unsafe { env::set_var("XDG_CONFIG_HOME", &xdg) };

        let (_, src) = load_config(None, &root).unwrap();
        assert_eq!(src, ConfigSource::Builtin);

        let home_cfg = xdg.join(".sp").join("config.toml");
        fs::write(&home_cfg, "[sync]\nbranch = \"home\"\n").unwrap();
        let (cfg, src) = load_config(None, &root).unwrap();
        assert_eq!(src, ConfigSource::Home(home_cfg));
        assert_eq!(cfg.sync.branch, "home");

        let local_cfg = root.join(LOCAL_CONFIG);
        fs::write(&local_cfg, "[sync]\nbranch = \"local\"\n").unwrap();
        let (cfg, src) = load_config(None, &root).unwrap();
        assert_eq!(src, ConfigSource::Local(local_cfg));
        assert_eq!(cfg.sync.branch, "local");

        let explicit = td.path().join("other.toml");
        fs::write(&explicit, "[sync]\nbranch = \"explicit\"\n").unwrap();
        let (cfg, _) = load_config(Some(&explicit), &root).unwrap();
        assert_eq!(cfg.sync.branch, "explicit");

        unsafe { env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn ensure_home_config_seeds_once() {
        let td = tempdir().unwrap();
        let home = td.path().join(".sp");
        let path = ensure_home_config(&home).unwrap();
        assert_eq!(path, home.join("config.toml"));
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        fs::write(&path, "[sync]\nbranch = \"mine\"\n").unwrap();
        ensure_home_config(&home).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[sync]\nbranch = \"mine\"\n"
        );
    }

    #[test]
    fn explicit_config_must_exist() {
        let td = tempdir().unwrap();
        let err = load_config(Some(&td.path().join("nope.toml")), td.path()).unwrap_err();
        assert!(format!("{err:#}").contains("config not found"));
    }
}
