use crate::LogbookError;
use secrecy::SecretString;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://log.concept2.com";
pub const DEFAULT_RESULTS_PATH: &str = "/api/users/me/results";
pub const DEFAULT_ACCEPT: &str = "application/vnd.c2logbook.v1+json";
pub const DEFAULT_EXPIRED_TOKEN_MESSAGE: &str = "Invalid OAuth access token";

#[derive(Clone, Debug)]
pub struct Config {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Only consulted when no stored tokens exist.
    pub auth_code: Option<SecretString>,
    pub base_url: String,
    pub results_path: String,
    pub accept: String,
    /// 401 `message` value that means "access token expired, refresh me".
    pub expired_token_message: String,
    pub redirect_uri: String,
    pub scope: String,
    pub credentials_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, LogbookError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, LogbookError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = move |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let client_id =
            get("CLIENT_ID").ok_or_else(|| LogbookError::Config("CLIENT_ID missing".into()))?;
        let client_secret = get("CLIENT_SECRET")
            .ok_or_else(|| LogbookError::Config("CLIENT_SECRET missing".into()))?;
        let auth_code = get("OAUTH_AUTH_CODE").map(|c| SecretString::new(c.into()));
        let base_url = get("LOGBOOK_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        let results_path =
            get("LOGBOOK_RESULTS_PATH").unwrap_or_else(|| DEFAULT_RESULTS_PATH.into());
        let accept = get("LOGBOOK_ACCEPT").unwrap_or_else(|| DEFAULT_ACCEPT.into());
        let expired_token_message = get("LOGBOOK_EXPIRED_TOKEN_MESSAGE")
            .unwrap_or_else(|| DEFAULT_EXPIRED_TOKEN_MESSAGE.into());
        let redirect_uri =
            get("LOGBOOK_REDIRECT_URI").unwrap_or_else(|| "http://localhost/callback".into());
        let scope = get("LOGBOOK_SCOPE").unwrap_or_else(|| "user:read,results:read".into());
        let credentials_path = get("LOGBOOK_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("credentials.json"));

        Ok(Self {
            client_id,
            client_secret: SecretString::new(client_secret.into()),
            auth_code,
            base_url,
            results_path,
            accept,
            expired_token_message,
            redirect_uri,
            scope,
            credentials_path,
        })
    }

    /// URL of the first results page.
    pub fn start_url(&self) -> String {
        if self.results_path.starts_with("http://") || self.results_path.starts_with("https://") {
            return self.results_path.clone();
        }
        format!(
            "{}/{}",
            self.base_url,
            self.results_path.trim_start_matches('/')
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/access_token", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_env(k: &str) -> Option<String> {
        match k {
            "CLIENT_ID" => Some("cid".into()),
            "CLIENT_SECRET" => Some("csecret".into()),
            _ => None,
        }
    }

    #[test]
    fn from_env_missing_client_secret() {
        let get = |k: &str| match k {
            "CLIENT_ID" => Some("cid".into()),
            _ => None,
        };
        let res = Config::from_env_with(get);
        assert!(matches!(res, Err(LogbookError::Config(msg)) if msg.contains("CLIENT_SECRET")));
    }

    #[test]
    fn from_env_blank_client_id_counts_as_missing() {
        let get = |k: &str| match k {
            "CLIENT_ID" => Some("  ".into()),
            "CLIENT_SECRET" => Some("s".into()),
            _ => None,
        };
        assert!(Config::from_env_with(get).is_err());
    }

    #[test]
    fn from_env_applies_defaults() {
        let cfg = Config::from_env_with(base_env).expect("cfg");
        assert_eq!(cfg.client_id, "cid");
        assert_eq!(cfg.client_secret.expose_secret(), "csecret");
        assert!(cfg.auth_code.is_none());
        assert_eq!(cfg.accept, DEFAULT_ACCEPT);
        assert_eq!(cfg.expired_token_message, DEFAULT_EXPIRED_TOKEN_MESSAGE);
        assert_eq!(cfg.start_url(), "https://log.concept2.com/api/users/me/results");
        assert_eq!(cfg.token_url(), "https://log.concept2.com/oauth/access_token");
        assert_eq!(cfg.credentials_path, PathBuf::from("credentials.json"));
    }

    #[test]
    fn from_env_reads_overrides() {
        let get = |k: &str| match k {
            "LOGBOOK_BASE_URL" => Some("http://localhost:9000/".into()),
            "LOGBOOK_RESULTS_PATH" => Some("results".into()),
            "LOGBOOK_EXPIRED_TOKEN_MESSAGE" => Some("token expired".into()),
            "OAUTH_AUTH_CODE" => Some("abc".into()),
            other => base_env(other),
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.start_url(), "http://localhost:9000/results");
        assert_eq!(cfg.token_url(), "http://localhost:9000/oauth/access_token");
        assert_eq!(cfg.expired_token_message, "token expired");
        assert_eq!(cfg.auth_code.expect("code").expose_secret(), "abc");
    }

    #[test]
    fn absolute_results_url_is_used_verbatim() {
        let get = |k: &str| match k {
            "LOGBOOK_RESULTS_PATH" => Some("https://other.example/results?type=rower".into()),
            other => base_env(other),
        };
        let cfg = Config::from_env_with(get).expect("cfg");
        assert_eq!(cfg.start_url(), "https://other.example/results?type=rower");
    }
}
