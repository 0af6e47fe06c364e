//! Organization policy: which profile applies, and which repositories are exempt.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Selects the schema and shared-repository list an evaluation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Default,
    /// Applies to organizations in the configured alternate-policy set.
    Alternate,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Default => "default",
            Profile::Alternate => "alternate",
        }
    }
}

/// Repositories excluded from the gate, keyed by normalized browser URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedRepos {
    urls: BTreeSet<String>,
}

impl SharedRepos {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SharedRepos {
            urls: urls
                .into_iter()
                .map(|u| normalize_repo_url(u.as_ref()).to_string())
                .collect(),
        }
    }

    /// Parses the on-disk format: a JSON object mapping a display name to a URL.
    ///
    /// ```
    /// use about_gate::policy::SharedRepos;
    ///
    /// let shared = SharedRepos::from_json(r#"{"tools": "https://github.com/acme/tools/"}"#).unwrap();
    /// assert!(shared.contains("https://github.com/acme/tools"));
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(SharedRepos::new(entries.values()))
    }

    /// Trailing-slash-insensitive membership test.
    pub fn contains(&self, html_url: &str) -> bool {
        self.urls.contains(normalize_repo_url(html_url))
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Strips trailing slashes so `.../repo` and `.../repo/` compare equal.
pub fn normalize_repo_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// The org-level policy applied during classification.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub alternate_orgs: BTreeSet<String>,
    pub default_shared: SharedRepos,
    pub alternate_shared: SharedRepos,
}

impl Policy {
    /// Returns the profile for an organization login.
    pub fn profile_for(&self, org: &str) -> Profile {
        if self.alternate_orgs.contains(org) {
            Profile::Alternate
        } else {
            Profile::Default
        }
    }

    /// Returns the shared-repository list for a profile.
    pub fn shared_repos(&self, profile: Profile) -> &SharedRepos {
        match profile {
            Profile::Default => &self.default_shared,
            Profile::Alternate => &self.alternate_shared,
        }
    }

    /// Returns true if the repository is exempt under the given profile.
    pub fn is_shared(&self, profile: Profile, html_url: &str) -> bool {
        self.shared_repos(profile).contains(html_url)
    }
}
