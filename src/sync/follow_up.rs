use regex::Regex;
use std::sync::LazyLock;

use crate::config::SyncSettings;

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://(?:[^@/]+@)?github\.com/|ssh://git@github\.com/|git@github\.com:)([^/]+)/([^/]+?)(?:\.git)?/?$",
    )
    .expect("static regex")
});

/// What to tell the user once the push went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub link: Option<String>,
    pub commands: Vec<String>,
}

/// Build the follow-up for a successful sync.
///
/// The configured `link` wins; otherwise a GitHub remote yields its Actions page.
pub fn follow_up(settings: &SyncSettings, remote_url: &str) -> FollowUp {
    let link = settings
        .link
        .clone()
        .or_else(|| actions_link(remote_url));
    FollowUp {
        link,
        commands: settings.commands.clone(),
    }
}

/// `https://github.com/<owner>/<repo>/actions` for a GitHub remote URL.
///
/// Accepts https (optionally with credentials), `ssh://` and scp-like
/// `git@github.com:owner/repo.git` forms.
pub fn actions_link(remote_url: &str) -> Option<String> {
    let caps = GITHUB_REMOTE.captures(remote_url.trim())?;
    Some(format!(
        "https://github.com/{}/{}/actions",
        &caps[1], &caps[2]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_link_from_github_urls() {
        for url in [
            "https://github.com/owner/firmware.git",
            "https://github.com/owner/firmware",
            "https://token@github.com/owner/firmware.git",
            "git@github.com:owner/firmware.git",
            "ssh://git@github.com/owner/firmware.git",
        ] {
            assert_eq!(
                actions_link(url).as_deref(),
                Some("https://github.com/owner/firmware/actions"),
                "{url}"
            );
        }
    }

    #[test]
    fn actions_link_none_for_other_hosts() {
        assert!(actions_link("https://gitlab.com/owner/firmware.git").is_none());
        assert!(actions_link("/srv/git/firmware.git").is_none());
    }

    #[test]
    fn configured_link_takes_precedence() {
        let settings = SyncSettings {
            link: Some("https://ci.example.com/firmware".into()),
            commands: vec!["mpremote reset".into()],
            ..SyncSettings::default()
        };
        let fu = follow_up(&settings, "git@github.com:owner/firmware.git");
        assert_eq!(fu.link.as_deref(), Some("https://ci.example.com/firmware"));
        assert_eq!(fu.commands, vec!["mpremote reset".to_string()]);
    }

    #[test]
    fn no_link_for_non_github_remote_without_config() {
        let fu = follow_up(&SyncSettings::default(), "/srv/git/firmware.git");
        assert_eq!(fu.link, None);
        assert!(fu.commands.is_empty());
    }
}
