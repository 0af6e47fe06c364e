//! GitHub App authentication.
//!
//! The gate authenticates as a GitHub App and mints a short-lived installation
//! token for every evaluation. Tokens are not cached between evaluations.

use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use octocrab::models::{AppId, InstallationId as OctocrabInstallationId};
use octocrab::service::middleware::retry::RetryConfig;
use tracing::debug;

use crate::types::{InstallationId, RepoId};

use super::client::OctocrabClient;
use super::error::SourceControlError;

/// Selects aws-lc-rs as the process-wide rustls provider.
///
/// octocrab and reqwest each enable a different provider, so rustls cannot
/// pick one on its own. Must run before the first TLS client is built.
/// Later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// App-level credentials and the client that signs JWTs with them.
#[derive(Clone)]
pub struct GitHubApp {
    app: Octocrab,
    check_name: String,
}

impl GitHubApp {
    /// Builds an app client from the integration ID and PEM private key.
    ///
    /// `base_uri` overrides the API root for GitHub Enterprise. The client
    /// never retries: a failed request fails the step that issued it.
    pub fn new(
        app_id: u64,
        pem_key: &str,
        base_uri: Option<&str>,
        check_name: impl Into<String>,
    ) -> Result<Self, SourceControlError> {
        let key = EncodingKey::from_rsa_pem(pem_key.as_bytes())
            .map_err(|e| SourceControlError::other(format!("invalid GitHub App key: {}", e)))?;

        install_crypto_provider();
        let mut builder = Octocrab::builder()
            .add_retry_config(RetryConfig::None)
            .app(AppId(app_id), key);
        if let Some(uri) = base_uri {
            builder = builder
                .base_uri(uri)
                .map_err(SourceControlError::from_octocrab)?;
        }
        let app = builder.build().map_err(SourceControlError::from_octocrab)?;

        Ok(GitHubApp {
            app,
            check_name: check_name.into(),
        })
    }

    /// Mints an installation token and returns a client scoped to `repo`.
    pub async fn client_for(
        &self,
        installation: InstallationId,
        repo: RepoId,
    ) -> Result<OctocrabClient, SourceControlError> {
        let (client, _token) = self
            .app
            .installation_and_token(OctocrabInstallationId(installation.0))
            .await
            .map_err(SourceControlError::from_octocrab)?;

        debug!(installation = %installation, repo = %repo, "Minted installation token");
        Ok(OctocrabClient::new(client, repo, self.check_name.clone()))
    }
}

impl std::fmt::Debug for GitHubApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApp")
            .field("check_name", &self.check_name)
            .finish_non_exhaustive()
    }
}
