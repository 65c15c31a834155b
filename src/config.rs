use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::{
    ClientOptions, RepositoryFilters, RetryPolicy, DEFAULT_API_URL, DEFAULT_MAX_CONCURRENT_REQUESTS,
};

/// Config file locations tried in order when no path is given.
const CANDIDATES: [&str; 5] = [
    ".github/config/profile.yml",
    "statsgen.toml",
    "statsgen.json",
    "statsgen.yaml",
    "statsgen.yml",
];

/// Configuration file structure for statsgen.
///
/// Every section is optional; missing keys fall back to their defaults.
/// Display and filter keys also accept snake_case, as written in
/// `.github/config/profile.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileConfig {
    /// GitHub login; `${VAR}` is read from the environment
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Theme names for renderers; not used by collection
    #[serde(default)]
    pub themes: Vec<String>,

    /// Languages shown in the summary; the JSON report keeps all of them
    #[serde(default = "default_max_languages", alias = "max_languages")]
    pub max_languages: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    #[serde(default, alias = "exclude_repos")]
    pub exclude_repos: Vec<String>,

    #[serde(default, alias = "exclude_languages")]
    pub exclude_languages: Vec<String>,

    /// Skip repositories the user contributed to but does not own
    #[serde(default, alias = "exclude_forks")]
    pub exclude_forks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            themes: Vec::new(),
            max_languages: default_max_languages(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_retries: default_max_retries(),
            max_polls: default_max_polls(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_max_languages() -> usize {
    8
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_polls() -> u32 {
    30
}

fn default_poll_interval_secs() -> u64 {
    2
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./.github/config/profile.yml
    /// 3. ./statsgen.toml
    /// 4. ./statsgen.json
    /// 5. ./statsgen.yaml
    /// 6. ./statsgen.yml
    ///
    /// A specified path that does not exist yields the defaults. When no
    /// candidate exists either, filters come from `EXCLUDED`, `EXCLUDED_LANGS`
    /// and `EXCLUDE_FORKED_REPOS`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_in(path, Path::new("."), |name| std::env::var(name).ok())
    }

    fn load_in<F>(path: Option<&Path>, base_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = path {
            if !path.exists() {
                warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let found: Option<PathBuf> = CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists());

        match found {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("No config file found, reading filters from the environment");
                Ok(Self::from_env(env))
            }
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        debug!("Loading config from {}", path.display());

        match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Builds a configuration from environment variables only.
    fn from_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |name: &str| -> Vec<String> {
            env(name)
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            filters: FilterConfig {
                exclude_repos: list("EXCLUDED"),
                exclude_languages: list("EXCLUDED_LANGS"),
                exclude_forks: env("EXCLUDE_FORKED_REPOS")
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case("true")),
            },
            ..Self::default()
        }
    }

    /// Picks the username to collect for.
    ///
    /// The explicit override wins, then the configured username (with `${VAR}`
    /// read from the environment), then `GITHUB_REPOSITORY_OWNER`, then
    /// `GITHUB_ACTOR`. Blank values are skipped.
    pub fn resolve_username(&self, explicit: Option<&str>) -> Option<String> {
        self.resolve_username_with(explicit, |name| std::env::var(name).ok())
    }

    fn resolve_username_with<F>(&self, explicit: Option<&str>, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = self.profile.username.as_deref().and_then(|username| {
            match username
                .trim()
                .strip_prefix("${")
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(variable) => env(variable.trim()),
                None => Some(username.to_string()),
            }
        });

        explicit
            .map(str::to_string)
            .into_iter()
            .chain(configured)
            .chain(env("GITHUB_REPOSITORY_OWNER"))
            .chain(env("GITHUB_ACTOR"))
            .map(|username| username.trim().to_string())
            .find(|username| !username.is_empty())
    }

    pub fn repository_filters(&self) -> RepositoryFilters {
        RepositoryFilters::new(&self.filters.exclude_repos, &self.filters.exclude_languages)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            max_concurrent_requests: self.client.max_concurrent_requests,
            retry: RetryPolicy {
                max_retries: self.client.max_retries,
                poll_interval: Duration::from_secs(self.client.poll_interval_secs),
                max_polls: self.client.max_polls,
                ..RetryPolicy::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.max_languages, 8);
        assert_eq!(config.client.api_url, "https://api.github.com/");
        assert_eq!(config.client.max_concurrent_requests, 10);
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.client.max_polls, 30);
        assert!(!config.filters.exclude_forks);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[profile]
username = "octocat"

[display]
max-languages = 5

[filters]
exclude-repos = ["octocat/secret", "dotfiles"]
exclude-languages = ["HTML"]
exclude-forks = true

[client]
max-concurrent-requests = 4
poll-interval-secs = 1
"#;
        write!(temp_file, "{toml_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.profile.username.as_deref(), Some("octocat"));
        assert_eq!(config.display.max_languages, 5);
        assert_eq!(config.filters.exclude_repos.len(), 2);
        assert!(config.filters.exclude_forks);
        assert_eq!(config.client.max_concurrent_requests, 4);
        assert_eq!(config.client.max_retries, 3);

        let options = config.client_options();
        assert_eq!(options.max_concurrent_requests, 4);
        assert_eq!(options.retry.poll_interval, Duration::from_secs(1));
        assert_eq!(options.retry.base_delay, Duration::from_secs(1));

        let filters = config.repository_filters();
        assert!(filters.is_repo_excluded("octocat/dotfiles"));
        assert!(filters.is_language_excluded("html"));
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        let yaml_content = r"
profile:
  username: ${PROFILE_USER}
display:
  themes: [dark, light]
filters:
  exclude-languages: [Jupyter Notebook]
";
        write!(temp_file, "{yaml_content}").unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.display.themes, vec!["dark", "light"]);
        assert_eq!(config.display.max_languages, 8);
        assert_eq!(config.filters.exclude_languages, vec!["Jupyter Notebook"]);

        let env = create_test_env(&[("PROFILE_USER", "hubot")]);
        assert_eq!(
            config.resolve_username_with(None, env).as_deref(),
            Some("hubot")
        );
    }

    #[test]
    fn test_load_snake_case_profile_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(".github/config")).unwrap();
        std::fs::write(
            temp_dir.path().join(".github/config/profile.yml"),
            r"
profile:
  username: octocat
display:
  max_languages: 4
filters:
  exclude_repos: [octocat/secret]
  exclude_languages: [HTML]
  exclude_forks: true
",
        )
        .unwrap();

        let config = Config::load_in(None, temp_dir.path(), create_test_env(&[])).unwrap();
        assert_eq!(config.display.max_languages, 4);
        assert_eq!(config.filters.exclude_repos, vec!["octocat/secret"]);
        assert_eq!(config.filters.exclude_languages, vec!["HTML"]);
        assert!(config.filters.exclude_forks);
        assert!(config.repository_filters().is_repo_excluded("octocat/secret"));
    }

    #[test]
    fn test_load_json_config_without_extension() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"filters": {{"exclude-repos": ["a/b"]}}, "client": {{"max-retries": 0}}}}"#
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.filters.exclude_repos, vec!["a/b"]);
        assert_eq!(config.client.max_retries, 0);
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "[display]\nmax-languages = \"many\"").unwrap();

        assert!(Config::load_from_path(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load(Some(Path::new("nonexistent.toml"))).unwrap();
        assert_eq!(config.display.max_languages, 8);
        assert!(config.filters.exclude_repos.is_empty());
    }

    #[test]
    fn test_load_from_candidate() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(".github/config")).unwrap();
        std::fs::write(
            temp_dir.path().join(".github/config/profile.yml"),
            "profile:\n  username: from-profile\n",
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("statsgen.toml"),
            "[profile]\nusername = \"from-toml\"\n",
        )
        .unwrap();

        let config = Config::load_in(None, temp_dir.path(), create_test_env(&[])).unwrap();
        assert_eq!(config.profile.username.as_deref(), Some("from-profile"));
    }

    #[test]
    fn test_falls_back_to_env_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env = create_test_env(&[
            ("EXCLUDED", "octocat/secret, dotfiles,,"),
            ("EXCLUDED_LANGS", "HTML,CSS"),
            ("EXCLUDE_FORKED_REPOS", "True"),
        ]);

        let config = Config::load_in(None, temp_dir.path(), env).unwrap();
        assert_eq!(config.filters.exclude_repos, vec!["octocat/secret", "dotfiles"]);
        assert_eq!(config.filters.exclude_languages, vec!["HTML", "CSS"]);
        assert!(config.filters.exclude_forks);
    }

    #[test]
    fn test_env_fallback_defaults() {
        let config = Config::from_env(create_test_env(&[("EXCLUDE_FORKED_REPOS", "yes")]));
        assert!(!config.filters.exclude_forks);
        assert!(config.filters.exclude_repos.is_empty());
        assert_eq!(config.client.max_polls, 30);
    }

    #[test]
    fn test_resolve_username_precedence() {
        let mut config = Config::default();
        config.profile.username = Some("configured".to_string());
        let env = create_test_env(&[("GITHUB_REPOSITORY_OWNER", "owner"), ("GITHUB_ACTOR", "actor")]);

        assert_eq!(
            config.resolve_username_with(Some("explicit"), &env).as_deref(),
            Some("explicit")
        );
        assert_eq!(
            config.resolve_username_with(None, &env).as_deref(),
            Some("configured")
        );

        config.profile.username = Some("  ".to_string());
        assert_eq!(
            config.resolve_username_with(None, &env).as_deref(),
            Some("owner")
        );
    }

    #[test]
    fn test_resolve_username_unset_variable() {
        let mut config = Config::default();
        config.profile.username = Some("${MISSING}".to_string());

        let env = create_test_env(&[("GITHUB_ACTOR", "actor")]);
        assert_eq!(
            config.resolve_username_with(None, &env).as_deref(),
            Some("actor")
        );
        assert_eq!(config.resolve_username_with(None, create_test_env(&[])), None);
    }
}
