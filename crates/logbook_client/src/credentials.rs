//! OAuth2 credential handling: on-disk token storage, the provider's token
//! endpoint, and [`TokenManager`], the single writer of the live token pair.

use crate::config::Config;
use crate::utils::body_snippet;
use crate::{LogbookError, TokenSource};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Access/refresh token pair. Both fields are non-empty once loaded.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        let access: String = access_token.into();
        let refresh: String = refresh_token.into();
        Self {
            access_token: SecretString::new(access.into()),
            refresh_token: SecretString::new(refresh.into()),
        }
    }
}

#[derive(Default, Deserialize, Serialize)]
struct StoredTokens {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

/// Durable storage for the token pair.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing usable is stored (missing or corrupt).
    async fn load(&self) -> Result<Option<TokenPair>, LogbookError>;
    async fn save(&self, tokens: &TokenPair) -> Result<(), LogbookError>;
}

/// Provider token endpoint: refresh and authorization-code exchange.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn refresh(&self, tokens: &TokenPair) -> Result<TokenPair, LogbookError>;
    async fn exchange_code(&self, code: &SecretString) -> Result<TokenPair, LogbookError>;
}

/// Tokens stored as `{"access_token": .., "refresh_token": ..}` in a JSON file.
#[derive(Clone, Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<TokenPair>, LogbookError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "credential file does not exist");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read credential file: {e}");
                return Ok(None);
            }
        };
        let stored: StoredTokens = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to parse credential file: {e}");
                return Ok(None);
            }
        };
        if stored.access_token.is_empty() || stored.refresh_token.is_empty() {
            warn!(path = %self.path.display(), "no tokens stored in credential file");
            return Ok(None);
        }
        info!(path = %self.path.display(), "tokens loaded");
        Ok(Some(TokenPair::new(stored.access_token, stored.refresh_token)))
    }

    async fn save(&self, tokens: &TokenPair) -> Result<(), LogbookError> {
        let stored = StoredTokens {
            access_token: tokens.access_token.expose_secret().to_string(),
            refresh_token: tokens.refresh_token.expose_secret().to_string(),
        };
        let payload = serde_json::to_vec_pretty(&stored)
            .map_err(|e| LogbookError::Decode(format!("encoding tokens: {e}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, payload).await?;
        info!(path = %self.path.display(), "tokens saved");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Form-encoded client for `{base}/oauth/access_token`.
#[derive(Clone, Debug)]
pub struct OAuthClient {
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scope: String,
    client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        redirect_uri: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self, LogbookError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            scope: scope.into(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LogbookError> {
        Self::new(
            config.token_url(),
            &config.client_id,
            config.client_secret.clone(),
            &config.redirect_uri,
            &config.scope,
        )
    }

    async fn request_tokens(
        &self,
        params: &[(&str, &str)],
        previous_refresh: Option<&SecretString>,
    ) -> Result<TokenPair, LogbookError> {
        let resp = self.client.post(&self.token_url).form(params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LogbookError::Unauthorized(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body_snippet(&body)
            )));
        }
        let text = resp.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            LogbookError::Decode(format!("decoding token response: {e}"))
        })?;
        if parsed.access_token.is_empty() {
            return Err(LogbookError::Unauthorized(
                "token endpoint returned an empty access token".into(),
            ));
        }
        let refresh_token = match (parsed.refresh_token.filter(|r| !r.is_empty()), previous_refresh) {
            (Some(r), _) => SecretString::new(r.into()),
            (None, Some(prev)) => prev.clone(),
            (None, None) => {
                return Err(LogbookError::Unauthorized(
                    "token endpoint returned no refresh token".into(),
                ));
            }
        };
        Ok(TokenPair {
            access_token: SecretString::new(parsed.access_token.into()),
            refresh_token,
        })
    }
}

#[async_trait]
impl TokenEndpoint for OAuthClient {
    async fn refresh(&self, tokens: &TokenPair) -> Result<TokenPair, LogbookError> {
        info!("refreshing access token");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("grant_type", "refresh_token"),
            ("refresh_token", tokens.refresh_token.expose_secret()),
        ];
        self.request_tokens(&params, Some(&tokens.refresh_token)).await
    }

    async fn exchange_code(&self, code: &SecretString) -> Result<TokenPair, LogbookError> {
        info!("exchanging authorization code for tokens");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", code.expose_secret()),
            ("scope", self.scope.as_str()),
        ];
        self.request_tokens(&params, None).await
    }
}

/// Owns the live [`TokenPair`]. A refreshed pair is persisted before it
/// replaces the in-memory one.
pub struct TokenManager<S, E> {
    store: S,
    endpoint: E,
    tokens: TokenPair,
}

impl<S, E> TokenManager<S, E>
where
    S: CredentialStore,
    E: TokenEndpoint,
{
    pub fn new(store: S, endpoint: E, tokens: TokenPair) -> Self {
        Self {
            store,
            endpoint,
            tokens,
        }
    }

    /// Load stored tokens, or exchange `auth_code` for fresh ones when none
    /// are stored. Without either, fails with `CredentialMissing` and makes
    /// no network call.
    pub async fn bootstrap(
        store: S,
        endpoint: E,
        auth_code: Option<&SecretString>,
    ) -> Result<Self, LogbookError> {
        if let Some(tokens) = store.load().await? {
            return Ok(Self::new(store, endpoint, tokens));
        }
        let Some(code) = auth_code else {
            return Err(LogbookError::CredentialMissing(
                "no stored tokens and no authorization code configured (OAUTH_AUTH_CODE)".into(),
            ));
        };
        let tokens = endpoint.exchange_code(code).await?;
        store.save(&tokens).await?;
        info!("authorization successful, tokens obtained");
        Ok(Self::new(store, endpoint, tokens))
    }

    pub fn tokens(&self) -> &TokenPair {
        &self.tokens
    }
}

#[async_trait]
impl<S, E> TokenSource for TokenManager<S, E>
where
    S: CredentialStore,
    E: TokenEndpoint,
{
    fn access_token(&self) -> SecretString {
        self.tokens.access_token.clone()
    }

    async fn refresh(&mut self) -> Result<(), LogbookError> {
        let refreshed = self.endpoint.refresh(&self.tokens).await?;
        self.store.save(&refreshed).await?;
        self.tokens = refreshed;
        metrics::counter!("logbook_token_refresh_total").increment(1);
        info!("tokens refreshed");
        Ok(())
    }
}
