//! Startup configuration.
//!
//! Plain settings come from flags or environment variables. Secrets live in
//! JSON files whose paths are passed the same way, so the process never holds
//! a secret in its argument list.

use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::policy::{Policy, SharedRepos};
use crate::references::Credentials;

/// Command-line and environment configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "about-gate", version, about = "Gates pull requests on a valid about.yaml")]
pub struct Config {
    /// Address the webhook server binds to.
    #[arg(long, env = "ABOUT_GATE_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// GitHub API base URI, for GitHub Enterprise installs.
    #[arg(long, env = "GITHUB_API")]
    pub github_api: Option<String>,

    /// JSON file with `webhook_secret`, `github_app_integration_id` and `github_app_pem_key`.
    #[arg(long, env = "SECRET_GITHUB_SECRET")]
    pub github_secrets: PathBuf,

    /// Jira project endpoint prefix; the project key is appended.
    #[arg(long, env = "JIRA_API")]
    pub jira_api: String,

    /// JSON file with the Jira `username` and `password`.
    #[arg(long, env = "SECRET_AD_USER")]
    pub jira_credentials: PathBuf,

    /// PagerDuty services endpoint prefix; the service id is appended.
    #[arg(long, env = "PAGERDUTY_URL")]
    pub pagerduty_url: String,

    /// JSON file with the PagerDuty `api_token`.
    #[arg(long, env = "SECRET_PAGERDUTY_API_TOKEN")]
    pub pagerduty_token: PathBuf,

    /// Organizations validated against the alternate schema.
    #[arg(long, env = "ABOUT_GATE_ALTERNATE_ORGS", value_delimiter = ',')]
    pub alternate_orgs: Vec<String>,

    /// JSON file mapping names to shared repository URLs (default profile).
    #[arg(long, env = "ABOUT_GATE_DEFAULT_SHARED_REPOS")]
    pub default_shared_repos: Option<PathBuf>,

    /// JSON file mapping names to shared repository URLs (alternate profile).
    #[arg(long, env = "ABOUT_GATE_ALTERNATE_SHARED_REPOS")]
    pub alternate_shared_repos: Option<PathBuf>,

    /// Name the check run is published under.
    #[arg(long, env = "ABOUT_GATE_CHECK_NAME", default_value = "about-gate")]
    pub check_name: String,
}

/// Startup failures. Each names the file or key at fault.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is missing key `{key}`")]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("{path} has an invalid `{key}`: {reason}")]
    InvalidKey {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },
}

/// GitHub App credentials and the webhook secret.
#[derive(Clone)]
pub struct GithubSecrets {
    pub webhook_secret: String,
    pub app_id: u64,
    pub pem_key: String,
}

impl fmt::Debug for GithubSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSecrets")
            .field("webhook_secret", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("pem_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct RawGithubSecrets {
    webhook_secret: Option<String>,
    github_app_integration_id: Option<IntegrationId>,
    github_app_pem_key: Option<String>,
}

/// The integration id appears both as a number and as a quoted string.
#[derive(Deserialize)]
#[serde(untagged)]
enum IntegrationId {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct RawJiraCredentials {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct RawPagerDutyToken {
    api_token: Option<String>,
}

impl Config {
    pub fn github_secrets(&self) -> Result<GithubSecrets, ConfigError> {
        let path = &self.github_secrets;
        let raw: RawGithubSecrets = read_json(path)?;

        let app_id = match require(path, "github_app_integration_id", raw.github_app_integration_id)? {
            IntegrationId::Number(id) => id,
            IntegrationId::Text(text) => {
                text.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidKey {
                    path: path.clone(),
                    key: "github_app_integration_id",
                    reason: e.to_string(),
                })?
            }
        };

        Ok(GithubSecrets {
            webhook_secret: require(path, "webhook_secret", raw.webhook_secret)?,
            app_id,
            pem_key: require(path, "github_app_pem_key", raw.github_app_pem_key)?,
        })
    }

    /// Loads the Jira and PagerDuty credentials.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let jira: RawJiraCredentials = read_json(&self.jira_credentials)?;
        let pagerduty: RawPagerDutyToken = read_json(&self.pagerduty_token)?;

        Ok(Credentials {
            jira_username: require(&self.jira_credentials, "username", jira.username)?,
            jira_password: require(&self.jira_credentials, "password", jira.password)?,
            pagerduty_token: require(&self.pagerduty_token, "api_token", pagerduty.api_token)?,
        })
    }

    /// Builds the classification policy. Absent shared-repo files mean no exemptions.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        Ok(Policy {
            alternate_orgs: self
                .alternate_orgs
                .iter()
                .map(|org| org.trim())
                .filter(|org| !org.is_empty())
                .map(str::to_string)
                .collect(),
            default_shared: load_shared(self.default_shared_repos.as_deref())?,
            alternate_shared: load_shared(self.alternate_shared_repos.as_deref())?,
        })
    }
}

fn load_shared(path: Option<&Path>) -> Result<SharedRepos, ConfigError> {
    let Some(path) = path else {
        return Ok(SharedRepos::default());
    };
    let text = read_text(path)?;
    SharedRepos::from_json(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn require<T>(path: &Path, key: &'static str, value: Option<T>) -> Result<T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingKey {
        path: path.to_path_buf(),
        key,
    })
}
